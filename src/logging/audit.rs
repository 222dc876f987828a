//! Audit trail for verification activity
//!
//! Appends one JSON object per line. With no file configured the logger only
//! emits the matching `tracing` event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::registry::{ProviderId, TrustState};

/// Audit event types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A provider's trust state changed
    TrustTransition,
    /// A webhook failed signature verification
    WebhookRejected,
    /// A client access token was obtained from the vendor
    ClientTokenIssued,
    /// A possession token did not match its record
    PossessionRejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Instance that handled the request
    pub node_id: String,
    pub provider_id: Option<ProviderId>,
    pub from_state: Option<TrustState>,
    pub to_state: Option<TrustState>,
    /// Vendor event type or other short reason
    pub detail: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, node_id: String) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            node_id,
            provider_id: None,
            from_state: None,
            to_state: None,
            detail: None,
        }
    }

    pub fn with_provider(mut self, provider_id: ProviderId) -> Self {
        self.provider_id = Some(provider_id);
        self
    }

    pub fn with_transition(mut self, from: TrustState, to: TrustState) -> Self {
        self.from_state = Some(from);
        self.to_state = Some(to);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Convert to JSONL line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Audit logger that writes events to a JSONL file
#[derive(Clone)]
pub struct AuditLogger {
    inner: Arc<Mutex<Option<BufWriter<File>>>>,
    node_id: String,
}

impl AuditLogger {
    pub fn new(node_id: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            node_id,
        }
    }

    /// Start appending to the file at `path`
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        *self.inner.lock().await = Some(BufWriter::new(file));

        info!("Audit logging initialized to {}", path.display());
        Ok(())
    }

    pub async fn log(&self, event: AuditEvent) {
        info!(
            event_type = ?event.event_type,
            provider_id = ?event.provider_id,
            from = ?event.from_state,
            to = ?event.to_state,
            detail = ?event.detail,
            "audit"
        );

        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;
        if let Some(ref mut writer) = *inner {
            if let Err(e) = writeln!(writer, "{}", jsonl) {
                error!("Failed to write audit event: {}", e);
            }
            if let Err(e) = writer.flush() {
                error!("Failed to flush audit log: {}", e);
            }
        }
    }

    pub async fn log_transition(&self, provider_id: ProviderId, from: TrustState, to: TrustState, cause: &str) {
        let event = AuditEvent::new(AuditEventType::TrustTransition, self.node_id.clone())
            .with_provider(provider_id)
            .with_transition(from, to)
            .with_detail(cause);
        self.log(event).await;
    }

    pub async fn log_webhook_rejected(&self, reason: &str) {
        let event = AuditEvent::new(AuditEventType::WebhookRejected, self.node_id.clone())
            .with_detail(reason);
        self.log(event).await;
    }

    pub async fn log_client_token_issued(&self, provider_id: ProviderId) {
        let event = AuditEvent::new(AuditEventType::ClientTokenIssued, self.node_id.clone())
            .with_provider(provider_id);
        self.log(event).await;
    }

    pub async fn log_possession_rejected(&self, provider_id: ProviderId) {
        let event = AuditEvent::new(AuditEventType::PossessionRejected, self.node_id.clone())
            .with_provider(provider_id);
        self.log(event).await;
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}
