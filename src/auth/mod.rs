//! Authentication for provider-owned operations
//!
//! Providers prove control of their record with the possession token handed
//! out once at signup. Only an Argon2 hash of it is stored.

pub mod possession;

pub use possession::{
    generate_possession_token, hash_possession_token, verify_possession_token,
    POSSESSION_TOKEN_BYTES,
};
