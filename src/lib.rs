//! master-match - nearby service providers with identity verification
//!
//! Requesters find providers ("masters") of a service category within a
//! radius, nearest first. Providers prove their identity through a
//! third-party verification vendor; signed vendor callbacks move them to
//! the Verified trust state.
//!
//! ## Components
//!
//! - **Geo**: haversine great-circle distance
//! - **Registry**: provider records (in-memory or MongoDB)
//! - **Services**: matching, request signing, vendor client, webhook
//!   verification, trust-state machine, onboarding
//! - **Routes/Server**: the HTTP surface over hyper

pub mod auth;
pub mod config;
pub mod db;
pub mod geo;
pub mod logging;
pub mod registry;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, serve, AppState};
pub use types::{GatewayError, Result};
