//! HTTP client for the bootstrap registration endpoints.

use std::time::Duration;

use bootstrap_core::wire::{
    ErrorResponse, NonceResponse, RegisterRequest, RegisterResponse, NONCE_PATH, REGISTER_PATH,
};
use bootstrap_core::{AccountInfo, ConfigurationError, MacCodec, RegistrationFields, SharedSecret};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8008";

/// Errors that can occur when talking to the bootstrap endpoints.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("nonce unavailable: {0}")]
    NonceUnavailable(String),
    #[error("registration rejected ({status}): {errcode}: {message}")]
    Rejected {
        status: StatusCode,
        errcode: String,
        message: String,
    },
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Everything a registration can carry besides the nonce and MAC.
#[derive(Clone)]
pub struct RegisterOptions {
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub admin: bool,
    pub user_type: Option<String>,
}

impl RegisterOptions {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            display_name: None,
            admin: true,
            user_type: None,
        }
    }
}

impl std::fmt::Debug for RegisterOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterOptions")
            .field("username", &self.username)
            .field("display_name", &self.display_name)
            .field("admin", &self.admin)
            .field("user_type", &self.user_type)
            .finish_non_exhaustive()
    }
}

/// Prover half of the protocol.
pub struct RegistrationClient {
    http: Client,
    base_url: String,
    codec: MacCodec,
}

impl RegistrationClient {
    pub fn new(base_url: impl Into<String>, secret: SharedSecret) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(2))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            codec: MacCodec::new(secret),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the server for a fresh nonce.
    ///
    /// Every failure on this leg, network errors included, is `NonceUnavailable`.
    pub async fn fetch_nonce(&self) -> Result<String, ClientError> {
        let unavailable = |e: reqwest::Error| ClientError::NonceUnavailable(e.to_string());

        let response = self
            .http
            .get(format!("{}{}", self.base_url, NONCE_PATH))
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::NonceUnavailable(format!("{status}: {body}")));
        }

        let NonceResponse { nonce } = response.json().await.map_err(unavailable)?;
        if nonce.is_empty() {
            return Err(ClientError::NonceUnavailable("empty nonce".into()));
        }
        Ok(nonce)
    }

    /// Sign `fields` and post them together with the optional display name.
    pub async fn submit(
        &self,
        fields: RegistrationFields,
        display_name: Option<String>,
    ) -> Result<AccountInfo, ClientError> {
        let mac = self.codec.sign_fields(&fields);
        let body = RegisterRequest {
            nonce: fields.nonce,
            username: fields.username,
            password: fields.password,
            admin: fields.admin,
            user_type: fields.user_type,
            displayname: display_name,
            mac,
        };

        let response = self
            .http
            .post(format!("{}{}", self.base_url, REGISTER_PATH))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let account: RegisterResponse = response.json().await?;
            return Ok(account);
        }

        let text = response.text().await.unwrap_or_default();
        let (errcode, message) = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(err) => (err.errcode, err.error),
            Err(_) => ("M_UNKNOWN".to_string(), text),
        };
        Err(ClientError::Rejected {
            status,
            errcode,
            message,
        })
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        display_name: Option<&str>,
        admin: bool,
    ) -> Result<AccountInfo, ClientError> {
        let mut options = RegisterOptions::new(username, password);
        options.display_name = display_name.map(str::to_string);
        options.admin = admin;
        self.register_with(&options).await
    }

    /// Fetch a nonce, sign and submit. Never reuses a nonce.
    pub async fn register_with(&self, options: &RegisterOptions) -> Result<AccountInfo, ClientError> {
        let nonce = self.fetch_nonce().await?;
        debug!(username = %options.username, admin = options.admin, "Submitting registration");

        let mut fields = RegistrationFields::new(
            nonce,
            options.username.clone(),
            options.password.clone(),
            options.admin,
        );
        if let Some(user_type) = &options.user_type {
            fields = fields.with_user_type(user_type.clone());
        }
        self.submit(fields, options.display_name.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::StatusCode as AxumStatus,
        routing::{get, post},
        Json, Router,
    };
    use std::sync::{Arc, Mutex};

    const NONCE: &str = "abc";

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn secret() -> SharedSecret {
        SharedSecret::new("test_shared_secret").unwrap()
    }

    fn account() -> serde_json::Value {
        serde_json::json!({
            "user_id": "@alice:localhost",
            "device_id": "ABCDEFGHIJ",
            "access_token": "tok",
            "expires_in": 3600
        })
    }

    #[tokio::test]
    async fn test_register_signs_canonical_message() {
        let seen: Arc<Mutex<Option<serde_json::Value>>> = Arc::default();
        let captured = Arc::clone(&seen);
        let router = Router::new()
            .route(
                NONCE_PATH,
                get(|| async { Json(serde_json::json!({ "nonce": NONCE })) }),
            )
            .route(
                REGISTER_PATH,
                post(move |Json(body): Json<serde_json::Value>| {
                    let captured = Arc::clone(&captured);
                    async move {
                        *captured.lock().unwrap() = Some(body);
                        Json(account())
                    }
                }),
            );
        let url = spawn(router).await;

        let client = RegistrationClient::new(url, secret()).unwrap();
        let info = client
            .register("alice", "S3cret!", Some("Alice"), true)
            .await
            .unwrap();
        assert_eq!(info.user_id, "@alice:localhost");

        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["nonce"], NONCE);
        assert_eq!(body["admin"], true);
        assert_eq!(body["displayname"], "Alice");
        assert_eq!(
            body["mac"],
            "a2a1e9935858fd8a8d811d98e5f6fee903a31ef262230a5373a2e4d6dc1e1927"
        );
    }

    #[tokio::test]
    async fn test_user_type_is_signed() {
        let seen: Arc<Mutex<Option<serde_json::Value>>> = Arc::default();
        let captured = Arc::clone(&seen);
        let router = Router::new()
            .route(
                NONCE_PATH,
                get(|| async { Json(serde_json::json!({ "nonce": NONCE })) }),
            )
            .route(
                REGISTER_PATH,
                post(move |Json(body): Json<serde_json::Value>| {
                    let captured = Arc::clone(&captured);
                    async move {
                        *captured.lock().unwrap() = Some(body);
                        Json(account())
                    }
                }),
            );
        let url = spawn(router).await;

        let client = RegistrationClient::new(url, secret()).unwrap();
        let mut options = RegisterOptions::new("alice", "S3cret!");
        options.admin = false;
        options.user_type = Some("bot".into());
        client.register_with(&options).await.unwrap();

        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["user_type"], "bot");
        assert_eq!(
            body["mac"],
            "97981070bf83f0e69e53b70bd054304bc5688610afb4ee460124bbffe2be3b00"
        );
    }

    #[tokio::test]
    async fn test_denial_maps_to_rejected() {
        let router = Router::new()
            .route(
                NONCE_PATH,
                get(|| async { Json(serde_json::json!({ "nonce": NONCE })) }),
            )
            .route(
                REGISTER_PATH,
                post(|| async {
                    (
                        AxumStatus::FORBIDDEN,
                        Json(serde_json::json!({
                            "errcode": "M_FORBIDDEN",
                            "error": "Registration denied"
                        })),
                    )
                }),
            );
        let url = spawn(router).await;

        let client = RegistrationClient::new(url, secret()).unwrap();
        match client.register("alice", "pw", None, true).await {
            Err(ClientError::Rejected {
                status, errcode, ..
            }) => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(errcode, "M_FORBIDDEN");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nonce_endpoint_failure() {
        let router = Router::new().route(
            NONCE_PATH,
            get(|| async { (AxumStatus::FORBIDDEN, "disabled") }),
        );
        let url = spawn(router).await;

        let client = RegistrationClient::new(url, secret()).unwrap();
        assert!(matches!(
            client.fetch_nonce().await,
            Err(ClientError::NonceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_issuer_is_nonce_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RegistrationClient::new(format!("http://{addr}"), secret()).unwrap();
        assert!(matches!(
            client.fetch_nonce().await,
            Err(ClientError::NonceUnavailable(_))
        ));
        assert!(matches!(
            client.register("alice", "pw", None, true).await,
            Err(ClientError::NonceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_undecodable_nonce_body_is_nonce_unavailable() {
        let router = Router::new().route(NONCE_PATH, get(|| async { "not json" }));
        let url = spawn(router).await;

        let client = RegistrationClient::new(url, secret()).unwrap();
        assert!(matches!(
            client.fetch_nonce().await,
            Err(ClientError::NonceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_on_submit_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RegistrationClient::new(format!("http://{addr}"), secret()).unwrap();
        let fields = RegistrationFields::new(NONCE, "alice", "pw", true);
        assert!(matches!(
            client.submit(fields, None).await,
            Err(ClientError::Transport(_))
        ));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = RegistrationClient::new("http://example.org/", secret()).unwrap();
        assert_eq!(client.base_url(), "http://example.org");
    }
}
