//! HTTP server implementation
//!
//! hyper http1 with TokioIo; one task per connection. Request bodies are
//! collected up to `max_body_bytes` before dispatch so handlers work on
//! plain byte slices (the webhook digest needs the exact raw body).

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Args;
use crate::logging::AuditLogger;
use crate::registry::ProviderRegistry;
use crate::routes;
use crate::services::{
    MatchingEngine, OnboardingService, VerificationClient, VerificationStateMachine,
    WebhookVerifier,
};
use crate::types::GatewayError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub registry: Arc<dyn ProviderRegistry>,
    pub matching: MatchingEngine,
    pub onboarding: OnboardingService,
    /// Verification state machine, the only trust-state writer
    pub trust: VerificationStateMachine,
    pub webhook: WebhookVerifier,
    pub audit: AuditLogger,
    pub started_at: Instant,
}

impl AppState {
    /// Wire the services around a registry
    pub fn new(args: Args, registry: Arc<dyn ProviderRegistry>, audit: AuditLogger) -> Result<Self, GatewayError> {
        let vendor_config = args.vendor.to_config();
        let webhook = WebhookVerifier::new(vendor_config.webhook_secret.clone());
        let vendor = VerificationClient::new(vendor_config)?;

        let matching = MatchingEngine::new(Arc::clone(&registry));
        let trust = VerificationStateMachine::new(Arc::clone(&registry), audit.clone());
        let onboarding = OnboardingService::new(Arc::clone(&registry), vendor, trust.clone(), audit.clone());

        Ok(Self {
            args,
            registry,
            matching,
            onboarding,
            trust,
            webhook,
            audit,
            started_at: Instant::now(),
        })
    }
}

/// Bind `args.listen` and serve until the process exits
pub async fn run(state: Arc<AppState>) -> Result<(), GatewayError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "master-match listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - vendor credentials are optional");
    }

    serve(listener, state).await
}

/// Accept loop over an already-bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), GatewayError> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    debug!("[{}] {} {}", addr, method, path);

    let (parts, body) = req.into_parts();
    let body = match Limited::new(body, state.args.max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("[{}] Rejected body for {} {}: {}", addr, method, path, e);
            return Ok(routes::bad_request_response("Request body too large or unreadable"));
        }
    };

    let response = match (method, path.as_str()) {
        (Method::OPTIONS, _) => routes::preflight_response(),

        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(&state),

        (Method::GET, "/version") => routes::version_info(),

        (Method::GET, "/api/masters") => routes::handle_match(&state, query.as_deref()).await,

        (Method::POST, "/api/masters/signup") => routes::handle_signup(&state, &body).await,

        (Method::POST, "/api/kyc/sumsub-token") => routes::handle_client_token(&state, &body).await,

        (Method::POST, "/api/sumsub/webhook") => {
            routes::handle_webhook(&state, &parts.headers, &body).await
        }

        _ => routes::not_found_response(&path),
    };

    info!("[{}] {} {} -> {}", addr, parts.method, path, response.status().as_u16());
    Ok(response)
}
