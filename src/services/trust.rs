//! Provider verification state machine
//!
//! The only writer of [`TrustState`]. Vendor events are mapped to a
//! [`TrustSignal`], the next state is computed by the pure [`next_state`]
//! table, and the write is a compare-and-set against the state that was read.
//! Re-applying an event whose effect is already in place is a no-op, which is
//! what makes duplicate webhook delivery harmless.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::logging::AuditLogger;
use crate::registry::{CasOutcome, ProviderId, ProviderRegistry, TrustState};
use crate::types::{GatewayError, Result};

/// Prefix of the vendor-side user id for providers
pub const VENDOR_USER_PREFIX: &str = "master:";

/// Compare-and-set attempts before giving up on a contended record
pub const MAX_CAS_ATTEMPTS: usize = 4;

/// Vendor-side user id for a provider
pub fn vendor_user_id(id: ProviderId) -> String {
    format!("{}{}", VENDOR_USER_PREFIX, id)
}

/// Recover the provider id from a vendor user id
pub fn parse_vendor_user_id(user_id: &str) -> Result<ProviderId> {
    user_id
        .strip_prefix(VENDOR_USER_PREFIX)
        .and_then(|rest| rest.parse::<ProviderId>().ok())
        .ok_or_else(|| GatewayError::UnrecognizedEvent(format!("foreign user id '{}'", user_id)))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    pub review_answer: Option<String>,
    pub review_reject_type: Option<String>,
    #[serde(default)]
    pub reject_labels: Vec<String>,
}

/// Webhook payload, reduced to the fields acted on
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub review_result: Option<ReviewResult>,
    pub external_user_id: Option<String>,
    pub user_id: Option<String>,
    pub applicant_id: Option<String>,
    pub correlation_id: Option<String>,
}

impl VerificationEvent {
    /// Vendor user id, preferring a non-empty `externalUserId`
    pub fn subject(&self) -> Option<&str> {
        self.external_user_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.user_id.as_deref().filter(|s| !s.is_empty()))
    }

    /// Interpret the event type and review outcome
    pub fn signal(&self) -> Result<TrustSignal> {
        match self.event_type.as_str() {
            "applicantPending" => Ok(TrustSignal::ReviewPending),
            "applicantReviewed" => {
                let review = self.review_result.clone().unwrap_or_default();
                match review.review_answer.as_deref() {
                    Some("GREEN") => Ok(TrustSignal::Approved),
                    Some("RED") => match review.review_reject_type.as_deref() {
                        Some("FINAL") => Ok(TrustSignal::RejectedFinal),
                        _ => Ok(TrustSignal::RejectedRetry),
                    },
                    other => Err(GatewayError::UnrecognizedEvent(format!(
                        "review answer {:?}",
                        other
                    ))),
                }
            }
            other => Err(GatewayError::UnrecognizedEvent(format!("event type '{}'", other))),
        }
    }
}

/// What happened, independent of the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustSignal {
    /// A client access token was issued
    VerificationStarted,
    ReviewPending,
    Approved,
    RejectedFinal,
    /// Negative review the applicant may resubmit after
    RejectedRetry,
}

impl TrustSignal {
    fn as_str(&self) -> &'static str {
        match self {
            TrustSignal::VerificationStarted => "verification_started",
            TrustSignal::ReviewPending => "review_pending",
            TrustSignal::Approved => "approved",
            TrustSignal::RejectedFinal => "rejected_final",
            TrustSignal::RejectedRetry => "rejected_retry",
        }
    }
}

/// Transition table; `None` means the signal leaves the state alone
///
/// Verified and Rejected are terminal.
pub fn next_state(current: TrustState, signal: TrustSignal) -> Option<TrustState> {
    use TrustSignal::*;
    use TrustState::*;

    match (current, signal) {
        (Verified | Rejected, _) => None,
        (_, Approved) => Some(Verified),
        (_, RejectedFinal) => Some(Rejected),
        (Unverified, VerificationStarted | ReviewPending) => Some(PendingVerification),
        (PendingVerification, VerificationStarted | ReviewPending) => None,
        (_, RejectedRetry) => None,
    }
}

/// Result of applying one signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied { from: TrustState, to: TrustState },
    /// Nothing to do; the record already reflects the signal
    Unchanged(TrustState),
    UnknownProvider,
    /// The event was not one this core acts on
    Ignored(String),
}

#[derive(Clone)]
pub struct VerificationStateMachine {
    registry: Arc<dyn ProviderRegistry>,
    audit: AuditLogger,
}

impl VerificationStateMachine {
    pub fn new(registry: Arc<dyn ProviderRegistry>, audit: AuditLogger) -> Self {
        Self { registry, audit }
    }

    /// Record that the provider has started verification
    pub async fn begin_verification(&self, id: ProviderId) -> Result<TransitionOutcome> {
        self.apply_signal(id, TrustSignal::VerificationStarted).await
    }

    /// Apply an authenticated vendor event
    ///
    /// Unrecognized events and unknown providers are not errors; only
    /// registry failures are.
    pub async fn apply_event(&self, event: &VerificationEvent) -> Result<TransitionOutcome> {
        let reject_labels = event
            .review_result
            .as_ref()
            .map(|r| r.reject_labels.as_slice())
            .unwrap_or_default();
        debug!(
            event_type = %event.event_type,
            applicant_id = ?event.applicant_id,
            correlation_id = ?event.correlation_id,
            ?reject_labels,
            "Verification event received"
        );

        let interpreted = event.signal().and_then(|signal| {
            let subject = event.subject().ok_or_else(|| {
                GatewayError::UnrecognizedEvent("event carries no user id".to_string())
            })?;
            Ok((parse_vendor_user_id(subject)?, signal))
        });

        let (id, signal) = match interpreted {
            Ok(pair) => pair,
            Err(GatewayError::UnrecognizedEvent(reason)) => {
                info!(
                    event_type = %event.event_type,
                    applicant_id = ?event.applicant_id,
                    correlation_id = ?event.correlation_id,
                    reason = %reason,
                    "Ignoring unrecognized verification event"
                );
                return Ok(TransitionOutcome::Ignored(reason));
            }
            Err(e) => return Err(e),
        };

        self.apply_signal(id, signal).await
    }

    async fn apply_signal(&self, id: ProviderId, signal: TrustSignal) -> Result<TransitionOutcome> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some(record) = self.registry.get_by_id(id).await? else {
                warn!(provider_id = id, signal = signal.as_str(), "Verification event for unknown provider");
                return Ok(TransitionOutcome::UnknownProvider);
            };

            let current = record.trust_state;
            let Some(next) = next_state(current, signal) else {
                debug!(provider_id = id, state = %current, signal = signal.as_str(), "Trust state unchanged");
                return Ok(TransitionOutcome::Unchanged(current));
            };

            match self.registry.compare_and_set_trust(id, current, next).await? {
                CasOutcome::Applied => {
                    info!(provider_id = id, from = %current, to = %next, "Trust state changed");
                    self.audit.log_transition(id, current, next, signal.as_str()).await;
                    return Ok(TransitionOutcome::Applied { from: current, to: next });
                }
                CasOutcome::NotFound => return Ok(TransitionOutcome::UnknownProvider),
                CasOutcome::Conflict(found) => {
                    debug!(provider_id = id, attempt, found = %found, "Trust state moved underneath, retrying");
                }
            }
        }

        Err(GatewayError::Database(format!(
            "trust state for provider {} kept changing during update",
            id
        )))
    }
}
