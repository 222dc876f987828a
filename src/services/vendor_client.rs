//! Verification vendor client
//!
//! Signed JSON calls to the Sumsub API. A single attempt per call, bounded by
//! the configured timeout; any status >= 400 surfaces as
//! [`GatewayError::Upstream`] carrying the vendor's body.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::signer;
use super::trust::vendor_user_id;
use crate::config::VendorConfig;
use crate::registry::ProviderId;
use crate::types::{GatewayError, Result};

/// Client access token endpoint
pub const TOKEN_PATH: &str = "/resources/accessTokens/sdk";

/// Contact details forwarded to the vendor with a token request
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplicantIdentifiers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientTokenRequest<'a> {
    ttl_in_secs: u64,
    user_id: String,
    level_name: &'a str,
    applicant_identifiers: &'a ApplicantIdentifiers,
}

/// Signed HTTP client for the verification vendor
#[derive(Clone)]
pub struct VerificationClient {
    config: VendorConfig,
    http: reqwest::Client,
}

impl VerificationClient {
    /// Build the client; the configured timeout bounds every call
    pub fn new(config: VendorConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("master-match/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Config(format!("vendor HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    pub fn is_configured(&self) -> bool {
        self.config.has_api_credentials()
    }

    pub fn config(&self) -> &VendorConfig {
        &self.config
    }

    /// Issue one signed call and return the decoded JSON response
    ///
    /// The body is serialized compactly and those exact bytes are both signed
    /// and sent. The query string, when present, is part of the signed path.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: Option<&[(&str, &str)]>,
    ) -> Result<Value> {
        if !self.is_configured() {
            return Err(GatewayError::Config(
                "vendor app token and secret key are not configured".to_string(),
            ));
        }

        let path_with_query = match query {
            Some(pairs) if !pairs.is_empty() => {
                let encoded = serde_urlencoded::to_string(pairs)
                    .map_err(|e| GatewayError::Internal(format!("query encoding failed: {}", e)))?;
                format!("{}?{}", path, encoded)
            }
            _ => path.to_string(),
        };

        let body_bytes = match body {
            Some(value) => serde_json::to_vec(value)
                .map_err(|e| GatewayError::Internal(format!("body encoding failed: {}", e)))?,
            None => Vec::new(),
        };

        let timestamp = chrono::Utc::now().timestamp();
        let signature = signer::sign(
            timestamp,
            method.as_str(),
            &path_with_query,
            &body_bytes,
            self.config.secret_key.as_bytes(),
        )?;

        let mut headers = HeaderMap::new();
        headers.insert("X-App-Token", header_value(&self.config.app_token)?);
        headers.insert("X-App-Access-Ts", header_value(&timestamp.to_string())?);
        headers.insert("X-App-Access-Sig", header_value(&signature)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let url = format!("{}{}", self.config.base_url, path_with_query);
        debug!(method = %method, path = %path_with_query, "Calling verification vendor");

        let response = self
            .http
            .request(method, &url)
            .headers(headers)
            .body(body_bytes)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.as_u16() >= 400 {
            warn!(status = status.as_u16(), path = %path_with_query, "Vendor returned error");
            return Err(GatewayError::upstream(Some(status.as_u16()), text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            GatewayError::upstream(
                Some(status.as_u16()),
                format!("vendor returned non-JSON body: {}", e),
            )
        })
    }

    /// Mint a client access token bound to a provider record
    pub async fn request_client_token(
        &self,
        provider_id: ProviderId,
        ttl_secs: u64,
        level_name: &str,
        identifiers: &ApplicantIdentifiers,
    ) -> Result<Value> {
        let request = ClientTokenRequest {
            ttl_in_secs: ttl_secs,
            user_id: vendor_user_id(provider_id),
            level_name,
            applicant_identifiers: identifiers,
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| GatewayError::Internal(format!("token request encoding failed: {}", e)))?;

        self.call(Method::POST, TOKEN_PATH, Some(&body), None).await
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| GatewayError::Config("vendor credential is not a valid header value".to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response, StatusCode};
    use hyper_util::rt::TokioIo;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use zeroize::Zeroizing;

    /// Request as seen by the fake vendor
    #[derive(Debug, Clone)]
    pub(crate) struct Captured {
        pub method: String,
        pub path_with_query: String,
        pub token: String,
        pub ts: String,
        pub sig: String,
        pub body: Vec<u8>,
    }

    /// Hyper server standing in for the vendor API
    pub(crate) async fn fake_vendor(
        status: StatusCode,
        reply: &'static str,
        delay: Duration,
    ) -> (SocketAddr, Arc<Mutex<Vec<Captured>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let sink = sink.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let sink = sink.clone();
                        async move {
                            let header = |name: &str| {
                                req.headers()
                                    .get(name)
                                    .and_then(|v| v.to_str().ok())
                                    .unwrap_or_default()
                                    .to_string()
                            };
                            let entry = Captured {
                                method: req.method().to_string(),
                                path_with_query: req
                                    .uri()
                                    .path_and_query()
                                    .map(|pq| pq.as_str().to_string())
                                    .unwrap_or_default(),
                                token: header("x-app-token"),
                                ts: header("x-app-access-ts"),
                                sig: header("x-app-access-sig"),
                                body: Vec::new(),
                            };
                            let body = req.into_body().collect().await?.to_bytes().to_vec();
                            sink.lock().unwrap().push(Captured { body, ..entry });

                            tokio::time::sleep(delay).await;
                            Ok::<_, hyper::Error>(
                                Response::builder()
                                    .status(status)
                                    .header("Content-Type", "application/json")
                                    .body(Full::new(Bytes::from_static(reply.as_bytes())))
                                    .unwrap(),
                            )
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        (addr, captured)
    }

    pub(crate) fn vendor_config(addr: SocketAddr, timeout: Duration) -> VendorConfig {
        VendorConfig {
            base_url: format!("http://{}", addr),
            app_token: Zeroizing::new("app-token".to_string()),
            secret_key: Zeroizing::new("sumsub-secret".to_string()),
            webhook_secret: Zeroizing::new("webhook-secret".to_string()),
            level_name: "masters-kyc".to_string(),
            token_ttl_secs: 600,
            timeout,
        }
    }

    #[tokio::test]
    async fn test_token_request_is_signed() {
        let (addr, captured) =
            fake_vendor(StatusCode::OK, r#"{"token":"tok-1","userId":"master:7"}"#, Duration::ZERO).await;
        let client = VerificationClient::new(vendor_config(addr, Duration::from_secs(5))).unwrap();

        let identifiers = ApplicantIdentifiers {
            email: None,
            phone: Some("+491234567".to_string()),
        };
        let reply = client
            .request_client_token(7, 600, "masters-kyc", &identifiers)
            .await
            .unwrap();
        assert_eq!(reply["token"], "tok-1");

        let seen = captured.lock().unwrap()[0].clone();
        assert_eq!(seen.method, "POST");
        assert_eq!(seen.path_with_query, TOKEN_PATH);
        assert_eq!(seen.token, "app-token");

        let ts: i64 = seen.ts.parse().unwrap();
        let expected = signer::sign(ts, "POST", TOKEN_PATH, &seen.body, b"sumsub-secret").unwrap();
        assert_eq!(seen.sig, expected);

        let body: Value = serde_json::from_slice(&seen.body).unwrap();
        assert_eq!(body["ttlInSecs"], 600);
        assert_eq!(body["userId"], "master:7");
        assert_eq!(body["levelName"], "masters-kyc");
        assert_eq!(body["applicantIdentifiers"]["phone"], "+491234567");
        assert!(body["applicantIdentifiers"].get("email").is_none());
    }

    #[tokio::test]
    async fn test_query_string_is_signed() {
        let (addr, captured) = fake_vendor(StatusCode::OK, "{}", Duration::ZERO).await;
        let client = VerificationClient::new(vendor_config(addr, Duration::from_secs(5))).unwrap();

        client
            .call(
                Method::GET,
                "/resources/applicants/-;externalUserId=master:7/one",
                None,
                Some(&[("fields", "info")]),
            )
            .await
            .unwrap();

        let seen = captured.lock().unwrap()[0].clone();
        assert!(seen.path_with_query.ends_with("?fields=info"));
        assert!(seen.body.is_empty());
        let ts: i64 = seen.ts.parse().unwrap();
        let expected = signer::sign(ts, "GET", &seen.path_with_query, b"", b"sumsub-secret").unwrap();
        assert_eq!(seen.sig, expected);
    }

    #[tokio::test]
    async fn test_error_status_is_upstream() {
        let (addr, _) = fake_vendor(
            StatusCode::UNAUTHORIZED,
            r#"{"description":"Request signature mismatch"}"#,
            Duration::ZERO,
        )
        .await;
        let client = VerificationClient::new(vendor_config(addr, Duration::from_secs(5))).unwrap();

        let err = client
            .request_client_token(1, 600, "masters-kyc", &ApplicantIdentifiers::default())
            .await
            .unwrap_err();
        match err {
            GatewayError::Upstream { status, ref body } => {
                assert_eq!(status, Some(401));
                assert!(body.contains("signature mismatch"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.status_code(), hyper::StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_timeout_is_upstream() {
        let (addr, _) = fake_vendor(StatusCode::OK, "{}", Duration::from_secs(2)).await;
        let client = VerificationClient::new(vendor_config(addr, Duration::from_millis(200))).unwrap();

        let err = client
            .request_client_token(1, 600, "masters-kyc", &ApplicantIdentifiers::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Upstream { .. }));
    }

    #[test]
    fn test_client_keeps_configured_timeout() {
        let client = VerificationClient::new(vendor_config("127.0.0.1:9".parse().unwrap(), Duration::from_millis(750)))
            .unwrap();
        assert_eq!(client.config().timeout, Duration::from_millis(750));
    }

    #[tokio::test]
    async fn test_unconfigured_client_refuses() {
        let mut config = vendor_config("127.0.0.1:9".parse().unwrap(), Duration::from_secs(1));
        config.secret_key = Zeroizing::new(String::new());
        let client = VerificationClient::new(config).unwrap();
        assert!(!client.is_configured());

        let err = client.call(Method::GET, "/x", None, None).await.unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }
}
