//! medrelay - authenticated relay for watsonx.ai
//!
//! This library provides the core functionality for the medrelay service:
//! configuration, IAM token exchange, feature extraction, and the chat and
//! prediction relays.

pub mod config;
pub mod error;
pub mod proxy;
pub mod watson;

pub use config::Config;
pub use error::{Error, Result};
