//! Client configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Path of the JSON-RPC handler on every P1125
pub const API_PATH: &str = "/api/V1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    /// Consecutive transport faults after which calls stop reaching the network
    pub request_errors_max: u32,
    /// HTTP request timeout; `None` leaves the connection unbounded
    pub request_timeout_ms: Option<u64>,
    pub calibration: CalibrationPolicy,
    pub acquisition: AcquisitionPolicy,
    pub log_level: String,
}

/// Where requests go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// Full JSON-RPC URL, e.g. `http://p1125-a12b.local/api/V1`
    Url(String),
    /// No network at all: every call succeeds with an empty result.
    PassThrough,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibrationPolicy {
    /// Wait after starting calibration before the first status poll
    pub start_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcquisitionPolicy {
    pub poll_interval_ms: u64,
    pub retries: u32,
}

impl ClientConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.endpoint.validate()?;
        self.calibration.validate()?;
        self.acquisition.validate()?;

        if self.request_errors_max == 0 {
            return Err(Error::Validation(
                "Request error ceiling must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_ms == Some(0) {
            return Err(Error::Validation(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(Error::Validation(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.log_level,
                valid_log_levels.join(", ")
            )));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            request_errors_max: 4,
            request_timeout_ms: None,
            calibration: CalibrationPolicy::default(),
            acquisition: AcquisitionPolicy::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Endpoint {
    /// Build the endpoint for a hostname or IP address, e.g. `p1125-a12b.local` or `192.168.0.123`
    pub fn from_host(host: &str) -> Self {
        let host = host.trim().trim_end_matches('/');
        Endpoint::Url(format!("http://{}{}", host, API_PATH))
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Endpoint::Url(url) => Some(url),
            Endpoint::PassThrough => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Endpoint::PassThrough => Ok(()),
            Endpoint::Url(url) => {
                if url.trim().is_empty() {
                    return Err(Error::Validation("Endpoint URL cannot be empty".to_string()));
                }
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(Error::Validation(format!(
                        "Endpoint URL '{}' must start with http:// or https://",
                        url
                    )));
                }
                Ok(())
            }
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Url(format!("http://localhost{}", API_PATH))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Url(url) => f.write_str(url),
            Endpoint::PassThrough => f.write_str("<pass-through>"),
        }
    }
}

impl CalibrationPolicy {
    /// Validate calibration polling
    pub fn validate(&self) -> Result<()> {
        if self.retries == 0 {
            return Err(Error::Validation(
                "Calibration poll retries must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for CalibrationPolicy {
    fn default() -> Self {
        Self {
            start_delay_ms: 15_000,
            poll_interval_ms: 2_000,
            retries: 10,
        }
    }
}

impl AcquisitionPolicy {
    /// Validate acquisition polling
    pub fn validate(&self) -> Result<()> {
        if self.retries == 0 {
            return Err(Error::Validation(
                "Acquisition poll retries must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for AcquisitionPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            retries: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint.url(), Some("http://localhost/api/V1"));
        assert_eq!(config.request_errors_max, 4);
        assert!(config.request_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_policy_defaults() {
        let cal = CalibrationPolicy::default();
        assert_eq!(cal.start_delay(), Duration::from_secs(15));
        assert_eq!(cal.poll_interval(), Duration::from_secs(2));
        assert_eq!(cal.retries, 10);

        let acq = AcquisitionPolicy::default();
        assert_eq!(acq.poll_interval(), Duration::from_millis(500));
        assert_eq!(acq.retries, 10);
    }

    #[test]
    fn test_endpoint_from_host() {
        assert_eq!(
            Endpoint::from_host("p1125-a12b.local"),
            Endpoint::Url("http://p1125-a12b.local/api/V1".to_string())
        );
        assert_eq!(
            Endpoint::from_host(" 192.168.0.123/ ").url(),
            Some("http://192.168.0.123/api/V1")
        );
    }

    #[test]
    fn test_endpoint_validation() {
        assert!(Endpoint::PassThrough.validate().is_ok());
        assert!(Endpoint::Url("".to_string()).validate().is_err());
        assert!(Endpoint::Url("p1125.local/api/V1".to_string()).validate().is_err());
        assert!(Endpoint::Url("https://p1125.local/api/V1".to_string())
            .validate()
            .is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();

        config.request_errors_max = 0;
        assert!(config.validate().is_err());

        config.request_errors_max = 4;
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        config.log_level = "debug".to_string();
        config.request_timeout_ms = Some(0);
        assert!(config.validate().is_err());

        config.request_timeout_ms = Some(2500);
        assert!(config.validate().is_ok());

        config.acquisition.retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_serde() {
        let json = serde_json::to_string(&Endpoint::PassThrough).unwrap();
        assert_eq!(json, "\"pass_through\"");

        let endpoint: Endpoint =
            serde_json::from_str(r#"{"url":"http://10.0.0.5/api/V1"}"#).unwrap();
        assert_eq!(endpoint.url(), Some("http://10.0.0.5/api/V1"));
    }
}
