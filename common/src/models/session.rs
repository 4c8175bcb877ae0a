// common/src/models/session.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::proof::VerifiedIdentity;

/// Classification attached to a session at issuance, consumed by the
/// downstream business endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    EarlyBacker,
    NeedInvite,
}

/// Server-side session record bound to a verified wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSession {
    /// Unique session record identifier
    pub session_id: Uuid,
    /// Opaque credential handed to the client
    pub token: String,
    /// Wallet address the proof was verified for
    pub wallet_address: String,
    /// Public key the signature was checked against
    pub public_key: String,
    /// Embedding-host user bound to this session, when known
    pub telegram_id: Option<i64>,
    pub status: AccountStatus,
    /// Timestamp when the session was created
    pub created_at: DateTime<Utc>,
    /// Timestamp of last client activity
    pub last_active: DateTime<Utc>,
}

impl WalletSession {
    pub fn new(
        token: String,
        identity: &VerifiedIdentity,
        telegram_id: Option<i64>,
        status: AccountStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            token,
            wallet_address: identity.address.clone(),
            public_key: identity.public_key.clone(),
            telegram_id,
            status,
            created_at: now,
            last_active: now,
        }
    }

    /// Update session activity timestamp
    pub fn update_activity(&mut self) {
        self.last_active = Utc::now();
    }

    /// Check if the session has expired based on TTL
    pub fn is_expired(&self, ttl_seconds: i64) -> bool {
        let age = Utc::now().signed_duration_since(self.last_active);
        age.num_seconds() > ttl_seconds
    }
}

/// Result of session lookups
#[derive(Debug, Clone)]
pub enum SessionResult {
    Success(WalletSession),
    NotFound,
    Expired,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to mint session token: {0}")]
    TokenMint(#[from] jsonwebtoken::errors::Error),
}
