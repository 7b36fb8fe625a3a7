//! P1125 Core
//!
//! Parameter domains, result models and configuration shared by the P1125 client and CLI.

pub mod error;
pub mod models;
pub mod storage;

pub use error::{Error, Result};
