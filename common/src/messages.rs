// common/src/messages.rs
use actix::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::proof::{ProofDomain, ProofPayload};
use crate::models::session::AccountStatus;

/// Wallet account reported by the external connector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletAccount {
    pub address: String,
    pub public_key: String,
    /// Contract init data for wallets not yet deployed on-chain
    pub wallet_state_init: Option<String>,
}

/// Proof fragment delivered alongside a first-time wallet connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorProof {
    pub domain: ProofDomain,
    pub timestamp: i64,
    pub payload: String,
    pub signature: String,
}

/// Connection-status callback from the wallet connector, delivered to the
/// handshake state machine as an actor message. `proof` is present only on
/// a first-time pairing; a reconnection reports the account alone.
#[derive(Debug, Clone, Serialize, Deserialize, Message)]
#[rtype(result = "()")]
pub struct ConnectorStatusUpdate {
    pub connected: bool,
    pub account: Option<WalletAccount>,
    pub proof: Option<ConnectorProof>,
}

/// Body of `POST /api/challenge`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChallengeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_id: Option<i64>,
}

/// Response of `POST /api/challenge`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub challenge: String,
}

/// Body of `POST /api/proof`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofRequest {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_id: Option<i64>,
    pub proof: ProofPayload,
}

/// Successful response of `POST /api/proof`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionGrant {
    pub token: String,
    pub status: AccountStatus,
}

/// Error body shared by all handshake endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
