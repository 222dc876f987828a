//! Shared types for master-match

pub mod error;

pub use error::{GatewayError, Result};
