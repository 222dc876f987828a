//! Configuration for master-match
//!
//! CLI arguments with environment-variable fallbacks, parsed once with clap.
//! Vendor credentials are turned into an explicit [`VendorConfig`] that is
//! handed to the services; nothing below `main` reads the environment.

use clap::Parser;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;
use zeroize::Zeroizing;

/// Default vendor API origin
pub const DEFAULT_VENDOR_BASE_URL: &str = "https://api.sumsub.com";

/// Default verification level configured on the vendor side
pub const DEFAULT_LEVEL_NAME: &str = "masters-kyc";

/// master-match - nearby providers with identity verification
#[derive(Parser, Debug, Clone)]
#[command(name = "master-match")]
#[command(about = "Match requesters with nearby verified service providers")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory fallback, relaxed vendor checks)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// MongoDB connection URI; the in-memory registry is used when unset
    #[arg(long, env = "MONGODB_URI")]
    pub mongodb_uri: Option<String>,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "masters")]
    pub mongodb_db: String,

    /// Insert sample providers into an empty registry (defaults to DEV_MODE)
    #[arg(long, env = "SEED_SAMPLES")]
    pub seed_samples: Option<bool>,

    /// Append trust-state audit events to this JSONL file
    #[arg(long, env = "AUDIT_LOG_PATH")]
    pub audit_log_path: Option<PathBuf>,

    /// Largest accepted request body in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "65536")]
    pub max_body_bytes: usize,

    /// Verification vendor configuration
    #[command(flatten)]
    pub vendor: VendorArgs,
}

/// Verification vendor (Sumsub) settings
#[derive(Parser, Debug, Clone)]
pub struct VendorArgs {
    /// App token sent as X-App-Token
    #[arg(long, env = "SUMSUB_APP_TOKEN", default_value = "")]
    pub sumsub_app_token: String,

    /// Secret key used to sign outbound requests
    #[arg(long, env = "SUMSUB_SECRET_KEY", default_value = "")]
    pub sumsub_secret_key: String,

    /// Verification level requested for providers
    #[arg(long, env = "SUMSUB_LEVEL_NAME", default_value = DEFAULT_LEVEL_NAME)]
    pub sumsub_level_name: String,

    /// Shared secret for webhook payload digests
    #[arg(long, env = "SUMSUB_WEBHOOK_SECRET", default_value = "")]
    pub sumsub_webhook_secret: String,

    /// Vendor API origin
    #[arg(long, env = "SUMSUB_BASE_URL", default_value = DEFAULT_VENDOR_BASE_URL)]
    pub sumsub_base_url: String,

    /// Lifetime of issued client access tokens
    #[arg(long, env = "SUMSUB_TOKEN_TTL_SECS", default_value = "600")]
    pub sumsub_token_ttl_secs: u64,

    /// Per-call timeout toward the vendor
    #[arg(long, env = "SUMSUB_TIMEOUT_SECS", default_value = "30")]
    pub sumsub_timeout_secs: u64,
}

impl VendorArgs {
    /// Build the explicit vendor configuration handed to services
    pub fn to_config(&self) -> VendorConfig {
        VendorConfig {
            base_url: self.sumsub_base_url.trim_end_matches('/').to_string(),
            app_token: Zeroizing::new(self.sumsub_app_token.clone()),
            secret_key: Zeroizing::new(self.sumsub_secret_key.clone()),
            webhook_secret: Zeroizing::new(self.sumsub_webhook_secret.clone()),
            level_name: self.sumsub_level_name.clone(),
            token_ttl_secs: self.sumsub_token_ttl_secs,
            timeout: Duration::from_secs(self.sumsub_timeout_secs),
        }
    }
}

/// Resolved vendor settings
#[derive(Clone)]
pub struct VendorConfig {
    pub base_url: String,
    pub app_token: Zeroizing<String>,
    pub secret_key: Zeroizing<String>,
    pub webhook_secret: Zeroizing<String>,
    pub level_name: String,
    pub token_ttl_secs: u64,
    pub timeout: Duration,
}

impl VendorConfig {
    /// Whether outbound calls can be signed
    pub fn has_api_credentials(&self) -> bool {
        !self.app_token.is_empty() && !self.secret_key.is_empty()
    }

    /// Whether inbound webhooks can be authenticated
    pub fn has_webhook_secret(&self) -> bool {
        !self.webhook_secret.is_empty()
    }
}

impl fmt::Debug for VendorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorConfig")
            .field("base_url", &self.base_url)
            .field("app_token", &redacted(&self.app_token))
            .field("secret_key", &redacted(&self.secret_key))
            .field("webhook_secret", &redacted(&self.webhook_secret))
            .field("level_name", &self.level_name)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl Args {
    /// Whether sample providers should be seeded
    pub fn should_seed(&self) -> bool {
        self.seed_samples.unwrap_or(self.dev_mode)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let vendor = &self.vendor;

        if !self.dev_mode {
            if vendor.sumsub_app_token.is_empty() || vendor.sumsub_secret_key.is_empty() {
                return Err(
                    "SUMSUB_APP_TOKEN and SUMSUB_SECRET_KEY are required in production mode"
                        .to_string(),
                );
            }
            if vendor.sumsub_webhook_secret.is_empty() {
                return Err("SUMSUB_WEBHOOK_SECRET is required in production mode".to_string());
            }
        }

        if vendor.sumsub_token_ttl_secs == 0 {
            return Err("SUMSUB_TOKEN_TTL_SECS must be greater than zero".to_string());
        }

        if vendor.sumsub_timeout_secs == 0 {
            return Err("SUMSUB_TIMEOUT_SECS must be greater than zero".to_string());
        }

        if !vendor.sumsub_base_url.starts_with("http://")
            && !vendor.sumsub_base_url.starts_with("https://")
        {
            return Err("SUMSUB_BASE_URL must be an http(s) URL".to_string());
        }

        if self.max_body_bytes == 0 {
            return Err("MAX_BODY_BYTES must be greater than zero".to_string());
        }

        Ok(())
    }
}
