// common/src/models/proof.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::challenge::ChallengeError;

/// Host name bound into the signed proof bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofDomain {
    #[serde(rename = "lengthBytes")]
    pub length_bytes: u32,
    pub value: String,
}

/// The wallet's signed assertion as submitted to the backend.
///
/// `address` is the raw-form TON address (`workchain:hex`), `public_key`
/// is hex, `signature` is base64, and `state_init` is an optional
/// base64-encoded bag of cells for wallets not yet deployed on-chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofPayload {
    pub address: String,
    pub public_key: String,
    pub domain: ProofDomain,
    pub timestamp: i64,
    pub payload: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_init: Option<String>,
}

/// Identity extracted from an accepted proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub address: String,
    pub public_key: String,
}

/// Reasons a proof is rejected.
///
/// The HTTP layer collapses all of these into one generic response body;
/// the specific variant only ever reaches the logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    #[error("challenge invalid: {0}")]
    ChallengeInvalid(#[from] ChallengeError),
    #[error("proof domain does not match this host")]
    DomainMismatch,
    #[error("proof timestamp outside the accepted window")]
    Stale,
    #[error("signature verification failed")]
    BadSignature,
    #[error("state init does not hash to the claimed address")]
    AddressMismatch,
    #[error("malformed proof field: {0}")]
    Malformed(String),
}
