//! P1125 instrument client

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use p1125_core::models::{
    AcquireMode, AcquisitionPolicy, CalLoad, CalibrationPolicy, ClientConfig, Endpoint,
    IntCurrData, Millivolts, TimebaseSpan, TriggerPosition, TriggerSlope, TriggerSource,
};
use serde_json::{json, Value};

use crate::error::Result;
use crate::logger::{InstrumentLogger, NullLogger};
use crate::poll::{PollState, Poller, Sleeper, ThreadSleeper};
use crate::protocol::{Method, Outcome, Reply, Request, Response};
use crate::transport::{HttpTransport, Transport};

/// Error text returned once the request error ceiling is reached
pub const TOO_MANY_REQUEST_ERRORS: &str = "too many request errors";

/// Parameters of `V1.trigger`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerSettings {
    pub source: TriggerSource,
    pub position: TriggerPosition,
    pub slope: TriggerSlope,
    /// mV for voltage sources, µA for current
    pub level: f64,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            source: TriggerSource::default(),
            position: TriggerPosition::default(),
            slope: TriggerSlope::default(),
            level: 1.0,
        }
    }
}

enum Link {
    PassThrough,
    Remote(Box<dyn Transport>),
}

/// Blocking JSON-RPC client for one P1125.
///
/// Every operation returns a [`Reply`]; nothing here panics or returns an error once the
/// client is built. Transport faults count towards a ceiling; once it is reached calls
/// fail locally until one round trip succeeds again.
pub struct InstrumentClient {
    endpoint: Endpoint,
    link: Link,
    logger: Box<dyn InstrumentLogger>,
    sleeper: Box<dyn Sleeper>,
    request_errors: AtomicU32,
    request_errors_max: u32,
    calibration: CalibrationPolicy,
    acquisition: AcquisitionPolicy,
}

impl InstrumentClient {
    /// Create a client for `endpoint` with default settings
    pub fn new(endpoint: Endpoint) -> Result<Self> {
        Self::from_config(&ClientConfig {
            endpoint,
            ..ClientConfig::default()
        })
    }

    /// Create a client from a full configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let link = match &config.endpoint {
            Endpoint::PassThrough => Link::PassThrough,
            Endpoint::Url(url) => Link::Remote(Box::new(HttpTransport::new(
                url.clone(),
                config.request_timeout(),
            )?)),
        };

        Ok(Self::build(config, link))
    }

    /// Create a client that sends through `transport` instead of HTTP. The configured
    /// endpoint is only used for logging, unless it is the pass-through sentinel.
    pub fn with_transport(config: &ClientConfig, transport: Box<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let link = match config.endpoint {
            Endpoint::PassThrough => Link::PassThrough,
            Endpoint::Url(_) => Link::Remote(transport),
        };

        Ok(Self::build(config, link))
    }

    fn build(config: &ClientConfig, link: Link) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            link,
            logger: Box::new(NullLogger),
            sleeper: Box::new(ThreadSleeper),
            request_errors: AtomicU32::new(0),
            request_errors_max: config.request_errors_max,
            calibration: config.calibration.clone(),
            acquisition: config.acquisition.clone(),
        }
    }

    pub fn with_logger(mut self, logger: impl InstrumentLogger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// True when no instrument is attached and every call succeeds locally
    pub fn is_pass_through(&self) -> bool {
        matches!(self.link, Link::PassThrough)
    }

    /// Consecutive transport faults so far
    pub fn request_errors(&self) -> u32 {
        self.request_errors.load(Ordering::Relaxed)
    }

    /// Clear the request error count. This is the only way out once the ceiling is
    /// reached, since no request goes out until then.
    pub fn reset_request_errors(&self) {
        self.request_errors.store(0, Ordering::Relaxed);
    }

    /// Send one request and unwrap the reply.
    pub fn call(&self, method: Method, params: Option<Value>) -> Reply {
        let transport = match &self.link {
            Link::PassThrough => return Reply::empty(),
            Link::Remote(transport) => transport,
        };

        if self.request_errors() >= self.request_errors_max {
            return Reply::fault(TOO_MANY_REQUEST_ERRORS);
        }

        let request = Request::new(method, params);
        let outcome = transport
            .send(&request)
            .and_then(Response::from_value)
            .and_then(Response::into_outcome);

        let outcome = match outcome {
            Ok(outcome) => {
                self.request_errors.store(0, Ordering::Relaxed);
                outcome
            }
            Err(e) => {
                self.request_errors.fetch_add(1, Ordering::Relaxed);
                self.logger.error(&format!("{}: {}", method, e));
                return Reply::fault(e.to_string());
            }
        };

        match outcome {
            Outcome::Result(result) => Reply::from_result(result),
            Outcome::Error(error) => {
                self.logger.error(&format!(
                    "{} -> {}",
                    request_summary(&request),
                    Value::Object(error.clone())
                ));
                Reply::new(false, error)
            }
        }
    }

    fn call_logged(&self, method: Method, params: Option<Value>) -> Reply {
        match &params {
            Some(params) => self.logger.info(&format!("{} params: {}", method, params)),
            None => self.logger.info(method.as_str()),
        }
        self.call(method, params)
    }

    /// Identification and version information
    pub fn ping(&self) -> Reply {
        self.logger.info(&format!("{} {}", Method::Ping, self.endpoint));
        self.call(Method::Ping, None)
    }

    pub fn status(&self) -> Reply {
        self.call_logged(Method::Status, None)
    }

    pub fn cal_status(&self) -> Reply {
        self.call_logged(Method::CalStatus, None)
    }

    /// Start calibration without waiting for it; see [`calibrate`](Self::calibrate).
    pub fn cal_start(&self) -> Reply {
        self.call_logged(Method::Cal, None)
    }

    pub fn cal_values(&self) -> Reply {
        self.call_logged(Method::CalValues, None)
    }

    /// Calibrate, blocking until done (typically 30-60 seconds).
    ///
    /// Returns at once if the instrument is already calibrated and `force` is not set.
    pub fn calibrate(&self, force: bool) -> Reply {
        if self.is_pass_through() {
            return Reply::empty();
        }

        let status = self.cal_status();
        if !status.success {
            return status;
        }

        if status.flag("cal_done") && !force {
            return status;
        }

        self.logger.info("Calibrating... this will take a minute...");
        let started = self.cal_start();
        if !started.success {
            return started;
        }

        self.sleeper.sleep(self.calibration.start_delay());

        let poller = Poller::new(self.calibration.retries, self.calibration.poll_interval());
        let outcome = poller.run(
            self.sleeper.as_ref(),
            || {
                let reply = self.call(Method::CalStatus, None);
                if reply.success {
                    self.logger.info(&format!(
                        "{} cal_done {}",
                        Method::CalStatus,
                        reply.flag("cal_done")
                    ));
                }
                reply
            },
            |reply| reply.flag("cal_done"),
        );

        match (outcome.state, outcome.reply) {
            (PollState::Succeeded, Some(reply)) => reply,
            (state, Some(reply)) => {
                self.logger
                    .error(&format!("calibration did not complete ({:?})", state));
                reply.into_failure()
            }
            (_, None) => Reply::fault("calibration poll budget is zero"),
        }
    }

    /// Set VOUT
    pub fn set_vout(&self, value: Millivolts) -> Reply {
        self.call_logged(Method::Vout, Some(json!({ "value": value.get() })))
    }

    pub fn set_timebase(&self, span: TimebaseSpan) -> Reply {
        self.call_logged(Method::Timebase, Some(json!({ "span": span })))
    }

    pub fn set_trigger(&self, trigger: TriggerSettings) -> Reply {
        self.call_logged(
            Method::Trigger,
            Some(json!({
                "source": trigger.source,
                "position": trigger.position,
                "slope": trigger.slope,
                "level": trigger.level,
            })),
        )
    }

    /// Connect demo/calibration loads; several loads are combined in parallel.
    /// `[CalLoad::None]` disconnects them all, and an empty slice is sent as that.
    pub fn set_cal_load(&self, loads: &[CalLoad]) -> Reply {
        let loads = if loads.is_empty() {
            &[CalLoad::None][..]
        } else {
            loads
        };
        self.call_logged(Method::CalLoad, Some(json!({ "loads": loads })))
    }

    pub fn acquisition_start(&self, mode: AcquireMode) -> Reply {
        self.call_logged(Method::AcquireStart, Some(json!({ "mode": mode })))
    }

    /// Stop/abort acquisition
    pub fn acquisition_stop(&self) -> Reply {
        self.call_logged(Method::AcquireStop, None)
    }

    pub fn acquisition_is_triggered(&self) -> Reply {
        self.call_logged(Method::AcquireIsTriggered, None)
    }

    /// Poll until the acquisition has triggered.
    ///
    /// `success` of the reply is the final `triggered` value: false on a failed poll or
    /// when `retries` polls pass without a trigger.
    pub fn acquisition_complete(&self, retries: u32) -> Reply {
        if self.is_pass_through() {
            return Reply::empty();
        }

        let poller = Poller::new(retries, self.acquisition.poll_interval());
        let outcome = poller.run(
            self.sleeper.as_ref(),
            || {
                let reply = self.call(Method::AcquireIsTriggered, None);
                if reply.success {
                    self.logger.info(&format!(
                        "{} triggered {}",
                        Method::AcquireIsTriggered,
                        reply.flag("triggered")
                    ));
                }
                reply
            },
            |reply| reply.flag("triggered"),
        );

        self.poll_result(Method::AcquireIsTriggered, outcome.state, outcome.reply)
    }

    /// [`acquisition_complete`](Self::acquisition_complete) with the configured retry budget
    pub fn acquisition_wait(&self) -> Reply {
        self.acquisition_complete(self.acquisition.retries)
    }

    /// Acquisition data: `t` (ms), `i` and `i_max` (µA)
    pub fn acquisition_get_data(&self) -> Reply {
        self.call_logged(Method::PlotData, None)
    }

    /// Set the integrated current stop time. The firmware also caps the number of
    /// samples, so collection may end earlier.
    pub fn intcurr_set(&self, time_stop_s: u64) -> Reply {
        self.call_logged(Method::IntcurrSet, Some(json!({ "time_stop_s": time_stop_s })))
    }

    pub fn intcurr_complete(&self) -> Reply {
        self.call_logged(Method::IntcurrComplete, None)
    }

    /// Poll `V1.intcurr_complete` until `complete` is set, at the acquisition poll interval.
    pub fn intcurr_wait_complete(&self, retries: u32) -> Reply {
        if self.is_pass_through() {
            return Reply::empty();
        }

        let poller = Poller::new(retries, self.acquisition.poll_interval());
        let outcome = poller.run(
            self.sleeper.as_ref(),
            || {
                let reply = self.call(Method::IntcurrComplete, None);
                if reply.success {
                    self.logger.info(&format!(
                        "{} time {} / {} ({})",
                        Method::IntcurrComplete,
                        reply.get("time_s").unwrap_or(&Value::Null),
                        reply.get("time_stop_s").unwrap_or(&Value::Null),
                        reply.flag("complete")
                    ));
                }
                reply
            },
            |reply| reply.flag("complete"),
        );

        self.poll_result(Method::IntcurrComplete, outcome.state, outcome.reply)
    }

    /// Integrated current data, see [`p1125_core::models::IntCurrData`]
    pub fn intcurr_data(&self) -> Reply {
        self.call_logged(Method::IntcurrData, None)
    }

    /// Wait out a running integrated current measurement of `time_stop_s` seconds, then
    /// poll `V1.intcurr_data` until the collected time reaches the stop time.
    ///
    /// Call after `intcurr_set` and a `RUN` acquisition start. The overrun budget is a
    /// tenth of the run (at least ten seconds) at the acquisition poll interval.
    pub fn intcurr_collect(&self, time_stop_s: u64) -> Reply {
        if self.is_pass_through() {
            return Reply::empty();
        }

        self.logger.info(&format!(
            "Time until data is ready... {} seconds",
            time_stop_s
        ));
        self.sleeper.sleep(Duration::from_secs(time_stop_s));

        let retries = overrun_retries(time_stop_s, self.acquisition.poll_interval_ms);
        let poller = Poller::new(retries, self.acquisition.poll_interval());
        let outcome = poller.run(
            self.sleeper.as_ref(),
            || {
                let reply = self.call(Method::IntcurrData, None);
                if reply.success {
                    self.logger.info(&format!(
                        "{} data collection time: {} / {}",
                        Method::IntcurrData,
                        reply.get("time_s").unwrap_or(&Value::Null),
                        reply.get("time_stop_s").unwrap_or(&Value::Null)
                    ));
                }
                reply
            },
            |reply| {
                reply
                    .decode::<IntCurrData>()
                    .map(|data| data.is_complete())
                    .unwrap_or(false)
            },
        );

        self.poll_result(Method::IntcurrData, outcome.state, outcome.reply)
    }

    /// Connect or disconnect the probe. `hard_connect` skips the soft start. Connecting
    /// fails when no probe is attached; see [`probe_status`](Self::probe_status).
    pub fn probe(&self, connect: bool, hard_connect: bool) -> Reply {
        self.call_logged(
            Method::ProbeConnect,
            Some(json!({ "value": connect, "hard_connect": hard_connect })),
        )
    }

    pub fn probe_status(&self) -> Reply {
        self.call_logged(Method::ProbeStatus, None)
    }

    /// Shut down the P1125, or reboot it when `restart` is set
    pub fn shutdown(&self, restart: bool) -> Reply {
        self.call_logged(Method::Shutdown, Some(json!({ "restart": restart })))
    }

    fn poll_result(&self, method: Method, state: PollState, reply: Option<Reply>) -> Reply {
        match (state, reply) {
            (PollState::Succeeded, Some(reply)) => Reply::new(true, reply.result),
            (state, Some(reply)) => {
                self.logger.error(&format!(
                    "{} {:?} {}",
                    method,
                    state,
                    reply.to_value()
                ));
                reply.into_failure()
            }
            (_, None) => Reply::fault(format!("{}: poll budget is zero", method)),
        }
    }
}

fn overrun_retries(time_stop_s: u64, poll_interval_ms: u64) -> u32 {
    let overrun_ms = (time_stop_s * 100).max(10_000);
    let retries = overrun_ms.div_ceil(poll_interval_ms.max(1));
    u32::try_from(retries).unwrap_or(u32::MAX)
}

fn request_summary(request: &Request) -> String {
    match &request.params {
        Some(params) => format!("{} {}", request.method, params),
        None => request.method.clone(),
    }
}
