//! HTTP server for master-match

pub mod http;

pub use http::{run, serve, AppState};
