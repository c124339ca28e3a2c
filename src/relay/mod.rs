//! Token relay
//!
//! Minimal HTTP service that forwards a Google ID token to the tokeninfo
//! endpoint and checks its audience against the configured client id. Every
//! outcome is a 200 JSON body with a `success` flag so the sign-in page can
//! handle it uniformly.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

pub const MSG_INVALID_CLIENT: &str = "Invalid Client ID";
pub const MSG_VERIFICATION_FAILED: &str = "Verification failed";
pub const MSG_MISSING_TOKEN: &str = "Missing token";

/// Token relay - verifies Google sign-in tokens for the admin dashboard
#[derive(Parser, Debug, Clone)]
#[command(name = "token-relay")]
#[command(about = "Verifies Google ID tokens for the mangrove admin dashboard")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// OAuth client id tokens must be issued for
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Token introspection endpoint
    #[arg(long, env = "TOKENINFO_URL", default_value = DEFAULT_TOKENINFO_URL)]
    pub tokeninfo_url: String,

    /// Upstream request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match self.client_id.as_deref().map(str::trim) {
            None | Some("") => return Err("GOOGLE_CLIENT_ID is required".to_string()),
            Some(_) => {}
        }

        if reqwest::Url::parse(&self.tokeninfo_url).is_err() {
            return Err(format!("TOKENINFO_URL is not a valid URL: {}", self.tokeninfo_url));
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        Ok(())
    }
}

/// Relay errors
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid tokeninfo response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Incoming request body
#[derive(Debug, Default, Deserialize)]
pub struct VerifyTokenRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// Fields of the tokeninfo response the relay uses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyTokenResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<VerifiedUser>,
}

impl VerifyTokenResponse {
    pub fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: Some(message.to_string()),
            user: None,
        }
    }

    pub fn verified(user: VerifiedUser) -> Self {
        Self {
            success: true,
            message: None,
            user: Some(user),
        }
    }
}

/// Decide the outcome for a decoded tokeninfo body
pub fn interpret_tokeninfo(info: TokenInfo, client_id: &str) -> VerifyTokenResponse {
    if info.aud.as_deref() != Some(client_id) {
        return VerifyTokenResponse::failure(MSG_INVALID_CLIENT);
    }

    VerifyTokenResponse::verified(VerifiedUser {
        name: info.name,
        email: info.email,
        picture: info.picture,
    })
}

/// Relay state shared across handlers
pub struct RelayState {
    pub http: reqwest::Client,
    pub client_id: String,
    pub tokeninfo_url: String,
}

impl RelayState {
    pub fn from_args(args: &Args) -> Result<Self, RelayError> {
        let client_id = args
            .client_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| RelayError::Config("GOOGLE_CLIENT_ID is required".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(args.request_timeout_ms))
            .build()
            .map_err(|e| RelayError::Config(e.to_string()))?;

        Ok(Self {
            http,
            client_id,
            tokeninfo_url: args.tokeninfo_url.clone(),
        })
    }

    /// Fetch tokeninfo for `token`
    pub async fn fetch_tokeninfo(&self, token: &str) -> Result<TokenInfo, RelayError> {
        let response = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", token)])
            .send()
            .await
            .map_err(|e| RelayError::Network(e.to_string()))?;

        // Rejected tokens come back as a JSON error body without `aud`
        response
            .json::<TokenInfo>()
            .await
            .map_err(|e| RelayError::InvalidResponse(e.to_string()))
    }

    pub async fn verify_token(&self, token: &str) -> VerifyTokenResponse {
        match self.fetch_tokeninfo(token).await {
            Ok(info) => {
                let response = interpret_tokeninfo(info, &self.client_id);
                if response.success {
                    debug!("Token verified");
                } else {
                    warn!("Token issued for a different client id");
                }
                response
            }
            Err(e) => {
                warn!(error = %e, "Token verification failed");
                VerifyTokenResponse::failure(MSG_VERIFICATION_FAILED)
            }
        }
    }
}

pub type SharedRelayState = Arc<RelayState>;

/// Create the relay router
pub fn create_router(state: SharedRelayState) -> Router {
    Router::new()
        .route("/verify-token", post(verify_token).options(cors_preflight))
        .with_state(state)
}

/// Bind `listen` and serve until the process exits
pub async fn serve(args: &Args) -> anyhow::Result<()> {
    let state = Arc::new(RelayState::from_args(args)?);
    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!("Token relay listening on http://{}", args.listen);
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

/// POST /verify-token
async fn verify_token(State(state): State<SharedRelayState>, body: Bytes) -> impl IntoResponse {
    let token = serde_json::from_slice::<VerifyTokenRequest>(&body)
        .ok()
        .and_then(|req| req.token)
        .filter(|t| !t.is_empty());

    let response = match token {
        Some(token) => state.verify_token(&token).await,
        None => VerifyTokenResponse::failure(MSG_MISSING_TOKEN),
    };

    ([(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")], Json(response))
}

async fn cors_preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            (header::ACCESS_CONTROL_MAX_AGE, "86400"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(client_id: Option<&str>) -> Args {
        Args {
            listen: "127.0.0.1:0".parse().unwrap(),
            client_id: client_id.map(str::to_string),
            tokeninfo_url: DEFAULT_TOKENINFO_URL.to_string(),
            request_timeout_ms: 10_000,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_audience_must_match() {
        let info = TokenInfo {
            aud: Some("other.apps".into()),
            email: Some("a@b.c".into()),
            ..Default::default()
        };
        assert_eq!(
            interpret_tokeninfo(info, "mine.apps"),
            VerifyTokenResponse::failure(MSG_INVALID_CLIENT)
        );
    }

    #[test]
    fn test_missing_audience_is_rejected() {
        let response = interpret_tokeninfo(TokenInfo::default(), "mine.apps");
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some(MSG_INVALID_CLIENT));
    }

    #[test]
    fn test_matching_audience_returns_profile() {
        let info = TokenInfo {
            aud: Some("mine.apps".into()),
            name: Some("Ranger".into()),
            email: Some("ranger@example.org".into()),
            picture: None,
        };
        let response = interpret_tokeninfo(info, "mine.apps");
        assert!(response.success);
        assert_eq!(response.user.unwrap().name.as_deref(), Some("Ranger"));
    }

    #[test]
    fn test_failure_shape() {
        let json = serde_json::to_value(VerifyTokenResponse::failure(MSG_MISSING_TOKEN)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "message": "Missing token" })
        );
    }

    #[test]
    fn test_validate_requires_client_id() {
        assert!(args(None).validate().is_err());
        assert!(args(Some("  ")).validate().is_err());
        assert!(args(Some("id.apps")).validate().is_ok());

        let mut bad_url = args(Some("id.apps"));
        bad_url.tokeninfo_url = "not a url".into();
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_args_from_cli() {
        let parsed = Args::parse_from([
            "token-relay",
            "--client-id",
            "id.apps",
            "--listen",
            "127.0.0.1:5050",
        ]);
        assert_eq!(parsed.client_id.as_deref(), Some("id.apps"));
        assert_eq!(parsed.listen.port(), 5050);
        assert_eq!(parsed.request_timeout_ms, 10_000);
    }

    #[test]
    fn test_state_requires_client_id() {
        assert!(matches!(
            RelayState::from_args(&args(None)),
            Err(RelayError::Config(_))
        ));
    }
}
