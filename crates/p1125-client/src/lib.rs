//! P1125 Client Library
//!
//! Operates a P1125 power-measurement instrument over its JSON-RPC HTTP interface.
//!
//! ```no_run
//! use p1125_client::InstrumentClient;
//! use p1125_core::models::{AcquireMode, Endpoint};
//!
//! let client = InstrumentClient::new(Endpoint::from_host("p1125-a12b.local"))?;
//! let reply = client.calibrate(false);
//! if reply.success {
//!     client.acquisition_start(AcquireMode::Single);
//!     let data = client.acquisition_complete(10);
//!     println!("triggered: {}", data.success);
//! }
//! # Ok::<(), p1125_client::ClientError>(())
//! ```

pub mod client;
pub mod error;
pub mod logger;
pub mod poll;
pub mod protocol;
pub mod transport;

pub use client::{InstrumentClient, TriggerSettings, TOO_MANY_REQUEST_ERRORS};
pub use error::{ClientError, Result};
pub use logger::{InstrumentLogger, NullLogger, TracingLogger};
pub use poll::{PollOutcome, PollState, Poller, Sleeper, ThreadSleeper};
pub use protocol::{Method, Outcome, Reply, Request, Response};
pub use transport::{HttpTransport, Transport, TransportError};
