//! Auth handshake
//!
//! One `POST` to the configured endpoint with `{socket_id, channel_name}`,
//! answered by `{auth}`. No retries.

use super::AuthError;
use async_trait::async_trait;
use fungi_common::AuthConfig;
use serde::{Deserialize, Serialize};

/// Body of the auth request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub socket_id: String,
    pub channel_name: String,
}

impl AuthRequest {
    #[must_use]
    pub fn new(socket_id: impl Into<String>, channel_name: impl Into<String>) -> Self {
        Self {
            socket_id: socket_id.into(),
            channel_name: channel_name.into(),
        }
    }
}

/// Body of a successful auth response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Token passed along with the subscribe request
    #[serde(default)]
    pub auth: String,
}

/// Obtains subscription tokens for private channels
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, request: &AuthRequest) -> Result<AuthResponse, AuthError>;
}

/// [`Authorizer`] calling an HTTP endpoint with `reqwest`
#[derive(Debug, Clone)]
pub struct HttpAuthorizer {
    client: reqwest::Client,
    endpoint: Option<String>,
    headers: Vec<(String, String)>,
}

impl HttpAuthorizer {
    /// Build an authorizer from the auth section of the client config
    ///
    /// A missing section is accepted here; every handshake then fails with
    /// [`AuthError::MissingEndpoint`].
    pub fn new(config: Option<&AuthConfig>) -> Result<Self, AuthError> {
        let mut builder = reqwest::Client::builder();
        if let Some(config) = config {
            builder = builder.timeout(config.timeout());
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config
                .map(|c| c.endpoint.clone())
                .filter(|endpoint| !endpoint.is_empty()),
            headers: config.map(|c| c.headers.clone()).unwrap_or_default(),
        })
    }

    /// Configured endpoint, if any
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

#[async_trait]
impl Authorizer for HttpAuthorizer {
    async fn authorize(&self, request: &AuthRequest) -> Result<AuthResponse, AuthError> {
        let endpoint = self.endpoint.as_deref().ok_or(AuthError::MissingEndpoint)?;
        if request.socket_id.is_empty() {
            return Err(AuthError::NotConnected);
        }

        let mut http_request = self.client.post(endpoint).json(request);
        for (name, value) in &self.headers {
            http_request = http_request.header(name.as_str(), value.as_str());
        }

        tracing::debug!(
            channel = %request.channel_name,
            endpoint = %endpoint,
            "Requesting channel authorization"
        );

        let response = http_request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }

        let body = response.text().await?;
        let parsed: AuthResponse = serde_json::from_str(&body)?;
        if parsed.auth.is_empty() {
            return Err(AuthError::MissingToken);
        }

        Ok(parsed)
    }
}
