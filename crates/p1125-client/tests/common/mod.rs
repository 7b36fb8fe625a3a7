//! In-process stand-in for a P1125 and helpers for driving the client without a network
//! or a clock.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use p1125_client::{
    InstrumentClient, InstrumentLogger, Request, Sleeper, Transport, TransportError,
};
use p1125_core::models::ClientConfig;
use serde_json::{json, Value};
use tracing::Level;

type Scripted = Result<Value, TransportError>;

/// Answers each method from its own queue; an empty queue answers `{"success": true}`.
#[derive(Clone, Default)]
pub struct FakeInstrument {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Scripted>>>>,
    sent: Arc<Mutex<Vec<Request>>>,
}

impl FakeInstrument {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: &str, response: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    /// Queue a result mapping, encoded as a JSON string like the firmware does
    pub fn respond(&self, method: &str, result: Value) -> &Self {
        self.push(method, Ok(json!({ "result": result.to_string() })));
        self
    }

    pub fn respond_times(&self, method: &str, result: Value, times: usize) -> &Self {
        for _ in 0..times {
            self.respond(method, result.clone());
        }
        self
    }

    pub fn respond_error(&self, method: &str, error: Value) -> &Self {
        self.push(method, Ok(json!({ "error": error.to_string() })));
        self
    }

    pub fn respond_raw(&self, method: &str, body: Value) -> &Self {
        self.push(method, Ok(body));
        self
    }

    pub fn fail_connection(&self, method: &str) -> &Self {
        self.push(
            method,
            Err(TransportError::Connection("connection refused".to_string())),
        );
        self
    }

    pub fn sent(&self) -> Vec<Request> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_methods(&self) -> Vec<String> {
        self.sent().into_iter().map(|r| r.method).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.sent().iter().filter(|r| r.method == method).count()
    }
}

impl Transport for FakeInstrument {
    fn send(&self, request: &Request) -> Result<Value, TransportError> {
        self.sent.lock().unwrap().push(request.clone());

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.method)
            .and_then(VecDeque::pop_front);

        next.unwrap_or_else(|| Ok(json!({ "result": "{\"success\": true}" })))
    }
}

#[derive(Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

#[derive(Clone, Default)]
pub struct RecordingLogger {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl RecordingLogger {
    pub fn errors(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(level, _)| *level == Level::ERROR)
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub fn infos(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(level, _)| *level == Level::INFO)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl InstrumentLogger for RecordingLogger {
    fn log(&self, level: Level, message: &str) {
        self.lines.lock().unwrap().push((level, message.to_string()));
    }
}

pub struct Harness {
    pub client: InstrumentClient,
    pub instrument: FakeInstrument,
    pub sleeper: RecordingSleeper,
    pub logger: RecordingLogger,
}

pub fn harness() -> Harness {
    harness_with(ClientConfig::default())
}

pub fn harness_with(config: ClientConfig) -> Harness {
    let instrument = FakeInstrument::new();
    let sleeper = RecordingSleeper::default();
    let logger = RecordingLogger::default();

    let client = InstrumentClient::with_transport(&config, Box::new(instrument.clone()))
        .unwrap()
        .with_sleeper(sleeper.clone())
        .with_logger(logger.clone());

    Harness {
        client,
        instrument,
        sleeper,
        logger,
    }
}
