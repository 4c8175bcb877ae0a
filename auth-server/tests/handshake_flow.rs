// auth-server/tests/handshake_flow.rs
//
// In-process round trip over the HTTP boundary: issue a challenge, sign
// it with a known key pair, exchange the proof for a session, then replay
// and revoke.
use actix::Actor;
use actix_web::{test, web, App};
use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};

use auth_server::api;
use auth_server::challenge_store::ChallengeStoreActor;
use auth_server::session_registry::SessionRegistryActor;
use common::models::proof::{ProofDomain, ProofPayload};
use common::models::session::AccountStatus;
use common::{ChallengeRequest, ChallengeResponse, Config, ProofRequest, SessionGrant};

const DOMAIN: &str = "example.com";
const TELEGRAM_ID: i64 = 4242;

fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.allowed_domains = vec![DOMAIN.to_string()];
    config
}

/// Assemble and sign the proof bytes the way a wallet application would
fn build_proof(key: &SigningKey, challenge: &str, timestamp: i64) -> ProofPayload {
    let account_hash = sha256(key.verifying_key().as_bytes());
    let address = format!("0:{}", hex::encode(account_hash));

    let mut message = Vec::new();
    message.extend_from_slice(b"ton-proof-item-v2/");
    message.extend_from_slice(&0i32.to_be_bytes());
    message.extend_from_slice(&account_hash);
    message.extend_from_slice(&(DOMAIN.len() as u32).to_le_bytes());
    message.extend_from_slice(DOMAIN.as_bytes());
    message.extend_from_slice(&(timestamp as u64).to_le_bytes());
    message.extend_from_slice(challenge.as_bytes());

    let mut full = vec![0xff, 0xff];
    full.extend_from_slice(b"ton-connect");
    full.extend_from_slice(&sha256(&message));
    let digest = sha256(&full);

    ProofPayload {
        address,
        public_key: hex::encode(key.verifying_key().as_bytes()),
        domain: ProofDomain {
            length_bytes: DOMAIN.len() as u32,
            value: DOMAIN.to_string(),
        },
        timestamp,
        payload: challenge.to_string(),
        signature: base64::encode(key.sign(&digest).to_bytes()),
        state_init: None,
    }
}

#[actix_web::test]
async fn test_full_handshake_round_trip() {
    let config = test_config();
    let challenge_store = ChallengeStoreActor::new(config.handshake.challenge_ttl_secs).start();
    let session_registry = SessionRegistryActor::new(config.jwt_secret.as_bytes())
        .with_ttl(config.handshake.session_ttl_secs)
        .start();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(config))
            .app_data(web::Data::new(challenge_store))
            .app_data(web::Data::new(session_registry))
            .configure(api::configure),
    )
    .await;

    // 1. Obtain a challenge scoped to our principal
    let req = test::TestRequest::post()
        .uri("/api/challenge")
        .set_json(ChallengeRequest {
            telegram_id: Some(TELEGRAM_ID),
        })
        .to_request();
    let challenge: ChallengeResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(challenge.challenge.len(), 64);

    // 2. Sign it as the wallet would and submit the proof
    let key = SigningKey::from_bytes(&[3u8; 32]);
    let proof = build_proof(&key, &challenge.challenge, chrono::Utc::now().timestamp());

    let req = test::TestRequest::post()
        .uri("/api/proof")
        .set_json(ProofRequest {
            address: proof.address.clone(),
            telegram_id: Some(TELEGRAM_ID),
            proof: proof.clone(),
        })
        .to_request();
    let grant: SessionGrant = test::call_and_read_body_json(&app, req).await;
    assert!(!grant.token.is_empty());
    assert_eq!(grant.status, AccountStatus::NeedInvite);

    // 3. The session resolves to the wallet that proved ownership
    let req = test::TestRequest::get()
        .uri("/api/session")
        .insert_header(("Authorization", format!("Bearer {}", grant.token)))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["wallet_address"], proof.address);
    assert_eq!(body["telegram_id"], TELEGRAM_ID);

    // 4. Replaying the same proof fails: the challenge was consumed
    let req = test::TestRequest::post()
        .uri("/api/proof")
        .set_json(ProofRequest {
            address: proof.address.clone(),
            telegram_id: Some(TELEGRAM_ID),
            proof: proof.clone(),
        })
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    // 5. Revocation is idempotent and kills the session
    let req = test::TestRequest::delete()
        .uri("/api/session")
        .insert_header(("Authorization", format!("Bearer {}", grant.token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::delete()
        .uri("/api/session")
        .insert_header(("Authorization", format!("Bearer {}", grant.token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::get()
        .uri("/api/session")
        .insert_header(("Authorization", format!("Bearer {}", grant.token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_proof_with_unknown_challenge_rejected() {
    let config = test_config();
    let challenge_store = ChallengeStoreActor::new(config.handshake.challenge_ttl_secs).start();
    let session_registry = SessionRegistryActor::new(config.jwt_secret.as_bytes()).start();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(config))
            .app_data(web::Data::new(challenge_store))
            .app_data(web::Data::new(session_registry))
            .configure(api::configure),
    )
    .await;

    let key = SigningKey::from_bytes(&[3u8; 32]);
    let proof = build_proof(&key, "abc123", chrono::Utc::now().timestamp());

    let req = test::TestRequest::post()
        .uri("/api/proof")
        .set_json(ProofRequest {
            address: proof.address.clone(),
            telegram_id: None,
            proof,
        })
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "proof verification failed");
}
