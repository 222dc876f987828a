//! Creation and update timestamps shared by all documents

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Common metadata for all documents
///
/// Providers are never deleted by this service, so there is no soft-delete
/// marker.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}
