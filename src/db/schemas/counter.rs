//! Monotonic sequence documents used to hand out numeric ids

use serde::{Deserialize, Serialize};

/// Collection name for sequences
pub const COUNTER_COLLECTION: &str = "counters";

/// Sequence name for provider ids
pub const PROVIDER_SEQUENCE: &str = "masters";

/// One named sequence; `seq` is the last value handed out
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CounterDoc {
    pub _id: String,
    pub seq: i64,
}
