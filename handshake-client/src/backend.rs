// handshake-client/src/backend.rs
use async_trait::async_trait;
use thiserror::Error;

use common::{ChallengeRequest, ChallengeResponse, ErrorBody, ProofRequest, SessionGrant};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
}

/// The auth server as seen from the handshake state machine.
///
/// Implementations must be cancel-safe: the machine may abandon a call's
/// result when a rotation or disconnect supersedes it.
#[async_trait]
pub trait HandshakeBackend: Send + Sync {
    /// Request a fresh one-time challenge
    async fn issue_challenge(&self, telegram_id: Option<i64>) -> Result<String, BackendError>;

    /// Submit a signed proof in exchange for a session
    async fn submit_proof(&self, request: ProofRequest) -> Result<SessionGrant, BackendError>;

    /// Best-effort server-side revocation of a session token
    async fn revoke_session(&self, token: &str) -> Result<(), BackendError>;
}

/// HTTP implementation against the auth server's `/api` routes
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn rejection(response: reqwest::Response) -> BackendError {
        let status = response.status();
        match response.json::<ErrorBody>().await {
            Ok(body) => BackendError::Rejected(body.error),
            Err(_) => BackendError::Rejected(format!("status {}", status)),
        }
    }
}

#[async_trait]
impl HandshakeBackend for HttpBackend {
    async fn issue_challenge(&self, telegram_id: Option<i64>) -> Result<String, BackendError> {
        let response = self
            .client
            .post(format!("{}/api/challenge", self.base_url))
            .json(&ChallengeRequest { telegram_id })
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: ChallengeResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(body.challenge)
    }

    async fn submit_proof(&self, request: ProofRequest) -> Result<SessionGrant, BackendError> {
        let response = self
            .client
            .post(format!("{}/api/proof", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))
    }

    async fn revoke_session(&self, token: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(format!("{}/api/session", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        Ok(())
    }
}
