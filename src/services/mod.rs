//! Services layer for master-match
//!
//! Business logic between the HTTP routes and the provider registry.
//!
//! ## Services
//!
//! - **Matching**: nearby providers by great-circle distance
//! - **Signer**: HMAC-SHA256 request signatures for the verification vendor
//! - **VendorClient**: signed calls to the vendor, client access tokens
//! - **Webhook**: constant-time authentication of vendor callbacks
//! - **Trust**: verification state machine, the only trust-state writer
//! - **Onboarding**: signup and possession-token-gated token issuance

pub mod matching;
pub mod onboarding;
pub mod signer;
pub mod trust;
pub mod vendor_client;
pub mod webhook;

pub use matching::{MatchResult, MatchingEngine, DEFAULT_RADIUS_KM, MAX_RESULTS};
pub use onboarding::{OnboardingService, SignupOutcome, SignupRequest};
pub use trust::{
    next_state, parse_vendor_user_id, vendor_user_id, TransitionOutcome, TrustSignal,
    VerificationEvent, VerificationStateMachine, VENDOR_USER_PREFIX,
};
pub use vendor_client::{ApplicantIdentifiers, VerificationClient};
pub use webhook::{DigestAlgorithm, WebhookVerifier};
