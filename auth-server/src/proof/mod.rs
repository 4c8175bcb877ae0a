// auth-server/src/proof/mod.rs
//! TON Connect proof verification.
//!
//! Pure checks over an already-consumed challenge: domain binding,
//! timestamp freshness, Ed25519 signature over the reconstructed proof
//! bytes, and the state-init/address binding for undeployed wallets.
//! Challenge consumption itself happens in the challenge store, before
//! any of this runs.

pub mod address;
pub mod boc;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use common::models::proof::{ProofError, ProofPayload, VerifiedIdentity};

use crate::utils::token::sha256;
use address::TonAddress;

const TON_PROOF_PREFIX: &[u8] = b"ton-proof-item-v2/";
const TON_CONNECT_PREFIX: &[u8] = b"ton-connect";

/// Verify a proof against the canonical host list and the given clock.
///
/// The referenced challenge must have been consumed by the caller first;
/// this function performs the remaining checks in order: domain,
/// freshness, signature, state-init binding.
pub fn check_proof(
    proof: &ProofPayload,
    allowed_domains: &[String],
    now: i64,
    max_skew_secs: i64,
) -> Result<VerifiedIdentity, ProofError> {
    if proof.domain.length_bytes as usize != proof.domain.value.len() {
        return Err(ProofError::DomainMismatch);
    }
    if !allowed_domains.iter().any(|d| d == &proof.domain.value) {
        return Err(ProofError::DomainMismatch);
    }

    if (now - proof.timestamp).abs() > max_skew_secs {
        return Err(ProofError::Stale);
    }

    let address: TonAddress = proof.address.parse()?;

    let public_key_bytes = hex::decode(&proof.public_key)
        .map_err(|_| ProofError::Malformed("public key is not hex".into()))?;
    let public_key: [u8; 32] = public_key_bytes
        .try_into()
        .map_err(|_| ProofError::Malformed("public key must be 32 bytes".into()))?;

    let signature_bytes = base64::decode(&proof.signature)
        .map_err(|_| ProofError::Malformed("signature is not base64".into()))?;
    let signature: [u8; 64] = signature_bytes
        .try_into()
        .map_err(|_| ProofError::Malformed("signature must be 64 bytes".into()))?;

    let verifying_key = VerifyingKey::from_bytes(&public_key)
        .map_err(|_| ProofError::Malformed("public key is not a valid curve point".into()))?;

    let digest = proof_digest(&address, proof);
    verifying_key
        .verify(&digest, &Signature::from_bytes(&signature))
        .map_err(|_| ProofError::BadSignature)?;

    if let Some(state_init) = &proof.state_init {
        let boc_bytes = base64::decode(state_init)
            .map_err(|_| ProofError::Malformed("state init is not base64".into()))?;
        let state_init_hash = boc::root_hash(&boc_bytes)
            .map_err(|e| ProofError::Malformed(e.to_string()))?;
        if state_init_hash != address.hash {
            return Err(ProofError::AddressMismatch);
        }
    }

    Ok(VerifiedIdentity {
        address: proof.address.clone(),
        public_key: proof.public_key.clone(),
    })
}

/// The digest the wallet actually signs:
/// sha256(0xffff ++ "ton-connect" ++ sha256(proof message))
fn proof_digest(address: &TonAddress, proof: &ProofPayload) -> [u8; 32] {
    let message = proof_message(
        address,
        &proof.domain.value,
        proof.domain.length_bytes,
        proof.timestamp,
        &proof.payload,
    );
    let message_hash = sha256(&message);

    let mut full = Vec::with_capacity(2 + TON_CONNECT_PREFIX.len() + 32);
    full.extend_from_slice(&[0xff, 0xff]);
    full.extend_from_slice(TON_CONNECT_PREFIX);
    full.extend_from_slice(&message_hash);
    sha256(&full)
}

fn proof_message(
    address: &TonAddress,
    domain: &str,
    domain_length_bytes: u32,
    timestamp: i64,
    payload: &str,
) -> Vec<u8> {
    let mut message = Vec::with_capacity(
        TON_PROOF_PREFIX.len() + 4 + 32 + 4 + domain.len() + 8 + payload.len(),
    );
    message.extend_from_slice(TON_PROOF_PREFIX);
    message.extend_from_slice(&address.workchain.to_be_bytes());
    message.extend_from_slice(&address.hash);
    message.extend_from_slice(&domain_length_bytes.to_le_bytes());
    message.extend_from_slice(domain.as_bytes());
    message.extend_from_slice(&(timestamp as u64).to_le_bytes());
    message.extend_from_slice(payload.as_bytes());
    message
}
