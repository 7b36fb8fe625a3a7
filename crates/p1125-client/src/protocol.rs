//! JSON-RPC wire format spoken by the P1125
//!
//! Requests always carry `id: 0`; the instrument answers one request per HTTP POST so there
//! is nothing to correlate. The `result` of a response is itself a JSON-encoded string.

use p1125_core::models::decode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::transport::TransportError;

/// RPC methods exposed by the instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Ping,
    Status,
    CalStatus,
    Cal,
    CalValues,
    Vout,
    Timebase,
    Trigger,
    CalLoad,
    AcquireStart,
    AcquireStop,
    AcquireIsTriggered,
    PlotData,
    IntcurrSet,
    IntcurrComplete,
    IntcurrData,
    ProbeConnect,
    ProbeStatus,
    Shutdown,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Ping => "V1.ping",
            Method::Status => "V1.status",
            Method::CalStatus => "V1.cal_status",
            Method::Cal => "V1.cal",
            Method::CalValues => "V1.cal_values",
            Method::Vout => "V1.vout",
            Method::Timebase => "V1.timebase",
            Method::Trigger => "V1.trigger",
            Method::CalLoad => "V1.cal_load",
            Method::AcquireStart => "V1.acquire_start",
            Method::AcquireStop => "V1.acquire_stop",
            Method::AcquireIsTriggered => "V1.acquire_is_triggered",
            Method::PlotData => "V1.plot_data",
            Method::IntcurrSet => "V1.intcurr_set",
            Method::IntcurrComplete => "V1.intcurr_complete",
            Method::IntcurrData => "V1.intcurr_data",
            Method::ProbeConnect => "V1.probe_connect",
            Method::ProbeStatus => "V1.probe_status",
            Method::Shutdown => "V1.shutdown",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    /// Create a new request
    pub fn new(method: Method, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: 0,
            method: method.as_str().to_string(),
            params,
        }
    }

    pub fn jsonrpc(&self) -> &str {
        &self.jsonrpc
    }
}

/// JSON-RPC response envelope as the P1125 sends it
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// What a well-formed response carried
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Decoded `result` mapping
    Result(Map<String, Value>),
    /// Decoded `error` payload
    Error(Map<String, Value>),
}

impl Response {
    /// Response carrying `result` the way the firmware encodes it: a JSON string.
    pub fn success(result: &Value) -> Self {
        Self {
            result: Some(Value::String(result.to_string())),
            error: None,
        }
    }

    pub fn error(error: &Value) -> Self {
        Self {
            result: None,
            error: Some(Value::String(error.to_string())),
        }
    }

    pub fn from_value(body: Value) -> Result<Self, TransportError> {
        Ok(serde_json::from_value(body)?)
    }

    /// Unwrap the envelope. A response without a usable `result` or `error` is a
    /// protocol fault.
    pub fn into_outcome(self) -> Result<Outcome, TransportError> {
        if let Some(error) = self.error {
            return Ok(Outcome::Error(error_payload(error)));
        }

        let result = self
            .result
            .ok_or_else(|| TransportError::Protocol("response has no result".to_string()))?;

        let decoded = match result {
            Value::String(encoded) => serde_json::from_str::<Value>(&encoded)?,
            other => other,
        };

        match decoded {
            Value::Object(map) => Ok(Outcome::Result(map)),
            other => Err(TransportError::Protocol(format!(
                "result is not a mapping: {}",
                other
            ))),
        }
    }
}

/// The `error` field is usually a JSON-encoded mapping, but anything else is kept
/// under an `error` key.
fn error_payload(error: Value) -> Map<String, Value> {
    let decoded = match error {
        Value::String(encoded) => {
            serde_json::from_str::<Value>(&encoded).unwrap_or(Value::String(encoded))
        }
        other => other,
    };

    match decoded {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("error".to_string(), other);
            map
        }
    }
}

/// Result of every client operation: a success flag and the result (or error) mapping.
///
/// `success` is the single status callers act on. For a decoded result it is the
/// instrument's own `success` field (false when missing); transport faults, instrument
/// errors and the error ceiling all report `false`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub success: bool,
    pub result: Map<String, Value>,
}

impl Reply {
    pub fn new(success: bool, result: Map<String, Value>) -> Self {
        Self { success, result }
    }

    /// Reply for a decoded result mapping, using its own `success` field.
    pub fn from_result(result: Map<String, Value>) -> Self {
        let success = result
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Self { success, result }
    }

    /// Successful reply with an empty mapping
    pub fn empty() -> Self {
        Self::new(true, Map::new())
    }

    /// Local failure described as `{"error": message}`
    pub fn fault(message: impl Into<String>) -> Self {
        let mut result = Map::new();
        result.insert("error".to_string(), Value::String(message.into()));
        Self::new(false, result)
    }

    /// The same mapping, reported as failed
    pub fn into_failure(self) -> Self {
        Self::new(false, self.result)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.result.get(key)
    }

    /// Boolean field of the result; missing or non-boolean reads as false.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.get("error").and_then(Value::as_str)
    }

    /// Decode the result mapping into a typed view from `p1125_core::models`.
    pub fn decode<T: DeserializeOwned>(&self) -> p1125_core::Result<T> {
        decode(&self.result)
    }

    pub fn into_parts(self) -> (bool, Map<String, Value>) {
        (self.success, self.result)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.result.clone())
    }
}
