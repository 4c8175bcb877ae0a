// auth-server/src/api/handshake.rs
use actix::Addr;
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use common::models::proof::ProofError;
use common::models::session::SessionResult;
use common::{ChallengeRequest, ChallengeResponse, Config, ProofRequest, SessionGrant};

use crate::challenge_store::{ChallengeStoreActor, ConsumeChallenge, IssueChallenge};
use crate::proof::check_proof;
use crate::session_registry::{IssueSession, ResolveSession, RevokeSession, SessionRegistryActor};

// One body for every proof rejection so a forger learns nothing about
// which check tripped
const VERIFICATION_FAILED: &str = "proof verification failed";

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({
        "error": "Internal server error"
    }))
}

#[get("/")]
pub async fn api_index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "TON Handshake Platform API",
        "version": "0.1.0"
    }))
}

// Issue a fresh one-time challenge for the wallet to sign
#[post("/challenge")]
pub async fn issue_challenge(
    body: Option<web::Json<ChallengeRequest>>,
    store: web::Data<Addr<ChallengeStoreActor>>,
) -> impl Responder {
    let principal = body.and_then(|b| b.telegram_id);

    match store.send(IssueChallenge { principal }).await {
        Ok(challenge) => {
            tracing::debug!("Issued challenge (principal: {:?})", principal);
            HttpResponse::Ok().json(ChallengeResponse {
                challenge: challenge.value,
            })
        }
        Err(e) => {
            tracing::error!("Error issuing challenge: {}", e);
            internal_error()
        }
    }
}

// Verify a wallet proof and exchange it for a session
#[post("/proof")]
pub async fn submit_proof(
    body: web::Json<ProofRequest>,
    store: web::Data<Addr<ChallengeStoreActor>>,
    registry: web::Data<Addr<SessionRegistryActor>>,
    config: web::Data<Config>,
) -> impl Responder {
    let req = body.into_inner();

    if req.address != req.proof.address {
        tracing::warn!(
            "Proof rejected: top-level address {} does not match proof address {}",
            req.address,
            req.proof.address
        );
        return HttpResponse::Unauthorized().json(json!({ "error": VERIFICATION_FAILED }));
    }

    // Consume the referenced challenge first; a replayed or unknown
    // payload never reaches signature verification
    let consumed = match store
        .send(ConsumeChallenge {
            value: req.proof.payload.clone(),
            principal: req.telegram_id,
        })
        .await
    {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Error consuming challenge: {}", e);
            return internal_error();
        }
    };

    if let Err(e) = consumed {
        tracing::warn!(
            "Proof rejected for wallet {}: {}",
            req.address,
            ProofError::ChallengeInvalid(e)
        );
        return HttpResponse::Unauthorized().json(json!({ "error": VERIFICATION_FAILED }));
    }

    let now = Utc::now().timestamp();
    let identity = match check_proof(
        &req.proof,
        &config.allowed_domains,
        now,
        config.handshake.max_skew_secs,
    ) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!("Proof rejected for wallet {}: {}", req.address, e);
            return HttpResponse::Unauthorized().json(json!({ "error": VERIFICATION_FAILED }));
        }
    };

    match registry
        .send(IssueSession {
            identity,
            telegram_id: req.telegram_id,
        })
        .await
    {
        Ok(Ok(session)) => {
            tracing::info!("Wallet {} authenticated", session.wallet_address);
            HttpResponse::Ok().json(SessionGrant {
                token: session.token,
                status: session.status,
            })
        }
        Ok(Err(e)) => {
            tracing::error!("Error minting session: {}", e);
            internal_error()
        }
        Err(e) => {
            tracing::error!("Error issuing session: {}", e);
            internal_error()
        }
    }
}

// Resolve the bearer token for downstream services
#[get("/session")]
pub async fn resolve_session(
    req: HttpRequest,
    registry: web::Data<Addr<SessionRegistryActor>>,
) -> impl Responder {
    let token = match bearer_token(&req) {
        Some(token) => token,
        None => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Missing bearer token"
            }));
        }
    };

    match registry.send(ResolveSession { token }).await {
        Ok(SessionResult::Success(session)) => HttpResponse::Ok().json(json!({
            "wallet_address": session.wallet_address,
            "telegram_id": session.telegram_id,
            "status": session.status,
        })),
        Ok(_) => HttpResponse::Unauthorized().json(json!({
            "error": "Invalid session"
        })),
        Err(e) => {
            tracing::error!("Error resolving session: {}", e);
            internal_error()
        }
    }
}

// Revoke the bearer token; succeeds whether or not it was still live
#[delete("/session")]
pub async fn revoke_session(
    req: HttpRequest,
    registry: web::Data<Addr<SessionRegistryActor>>,
) -> impl Responder {
    let token = match bearer_token(&req) {
        Some(token) => token,
        None => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Missing bearer token"
            }));
        }
    };

    match registry.send(RevokeSession { token }).await {
        Ok(revoked) => {
            if !revoked {
                tracing::debug!("Revoke of unknown session token");
            }
            HttpResponse::Ok().json(json!({
                "status": "success"
            }))
        }
        Err(e) => {
            tracing::error!("Error revoking session: {}", e);
            internal_error()
        }
    }
}
