// common/src/models/challenge.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One-time challenge value a wallet must sign to prove key possession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Random hex payload embedded into the wallet's connect request
    pub value: String,
    /// Timestamp when the challenge was issued
    pub issued_at: DateTime<Utc>,
    /// Timestamp after which the challenge is no longer accepted
    pub expires_at: DateTime<Utc>,
    /// Whether a consumption attempt has already spent this challenge
    pub consumed: bool,
    /// Embedding-host user the challenge was issued for, when known
    pub principal: Option<i64>,
}

impl Challenge {
    /// Create a fresh unconsumed challenge valid for `ttl_seconds`.
    pub fn new(value: String, ttl_seconds: i64, principal: Option<i64>) -> Self {
        let now = Utc::now();
        Self {
            value,
            issued_at: now,
            expires_at: now + Duration::seconds(ttl_seconds),
            consumed: false,
            principal,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Failure cases for consuming a challenge
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChallengeError {
    #[error("challenge not found")]
    NotFound,
    #[error("challenge expired")]
    Expired,
    #[error("challenge already used")]
    AlreadyUsed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_expiry() {
        let challenge = Challenge::new("abc123".to_string(), 540, None);
        assert!(!challenge.consumed);
        assert!(!challenge.is_expired(Utc::now()));
        assert!(challenge.is_expired(Utc::now() + Duration::seconds(541)));
    }

    #[test]
    fn test_challenge_carries_principal() {
        let challenge = Challenge::new("abc123".to_string(), 540, Some(42));
        assert_eq!(challenge.principal, Some(42));
    }
}
