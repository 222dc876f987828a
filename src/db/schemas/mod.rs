//! Database schemas for master-match
//!
//! Providers live in `masters`; numeric ids come from the `counters`
//! collection.

mod counter;
mod metadata;
mod provider;

pub use counter::{CounterDoc, COUNTER_COLLECTION, PROVIDER_SEQUENCE};
pub use metadata::Metadata;
pub use provider::{ProviderDoc, PROVIDER_COLLECTION};
