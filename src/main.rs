//! master-match - nearby service providers with identity verification

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use master_match::{
    config::Args,
    db::MongoClient,
    logging::{self, AuditLogger},
    registry::{seed_samples, MemoryRegistry, MongoRegistry, ProviderRegistry},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init(&args.log_level, args.log_json);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let vendor = args.vendor.to_config();
    info!("======================================");
    info!("  master-match");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Vendor: {} (level {})", vendor.base_url, vendor.level_name);
    info!("Vendor API credentials: {}", if vendor.has_api_credentials() { "set" } else { "MISSING" });
    info!("Webhook secret: {}", if vendor.has_webhook_secret() { "set" } else { "MISSING" });
    info!("======================================");

    let registry = open_registry(&args).await;

    if args.should_seed() {
        if let Err(e) = seed_samples(registry.as_ref()).await {
            warn!("Sample seed failed: {}", e);
        }
    }

    let audit = AuditLogger::new(args.node_id.to_string());
    if let Some(ref path) = args.audit_log_path {
        if let Err(e) = audit.init_file(path.clone()).await {
            error!("Failed to open audit log {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }

    let state = Arc::new(AppState::new(args, registry, audit)?);
    server::run(state).await?;

    Ok(())
}

/// MongoDB when configured, otherwise (or on dev-mode failure) in-memory
async fn open_registry(args: &Args) -> Arc<dyn ProviderRegistry> {
    let Some(ref uri) = args.mongodb_uri else {
        info!("Registry: in-memory (MONGODB_URI not set)");
        return Arc::new(MemoryRegistry::new());
    };

    let connected = match MongoClient::new(uri, &args.mongodb_db).await {
        Ok(client) => MongoRegistry::new(&client).await,
        Err(e) => Err(e),
    };

    match connected {
        Ok(registry) => {
            info!("Registry: MongoDB database '{}'", args.mongodb_db);
            Arc::new(registry)
        }
        Err(e) if args.dev_mode => {
            warn!("MongoDB unavailable (dev mode, using in-memory registry): {}", e);
            Arc::new(MemoryRegistry::new())
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    }
}
