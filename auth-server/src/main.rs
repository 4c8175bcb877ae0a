// auth-server/src/main.rs
use actix::Actor;
use actix_web::{web, App, HttpServer};
use std::collections::HashSet;

use common::{setup_tracing, Config};

use auth_server::api;
use auth_server::challenge_store::ChallengeStoreActor;
use auth_server::middleware::rate_limiter::RateLimiter;
use auth_server::session_registry::SessionRegistryActor;

/// One wallet address per line; blank lines and `#` comments skipped
fn load_early_backers(path: &str) -> HashSet<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to read early backers file {}: {}", path, e);
            HashSet::new()
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Setup tracing
    setup_tracing();

    // Load configuration
    let config = Config::from_env();

    let server_addr = config.auth_server_addr.clone();

    let early_backers = config
        .early_backers_path
        .as_deref()
        .map(load_early_backers)
        .unwrap_or_default();

    // Start the store actors
    let challenge_store = ChallengeStoreActor::new(config.handshake.challenge_ttl_secs).start();
    let session_registry = SessionRegistryActor::new(config.jwt_secret.as_bytes())
        .with_ttl(config.handshake.session_ttl_secs)
        .with_early_backers(early_backers)
        .start();

    tracing::info!("Starting Auth Server on {}", server_addr);

    let config_data = web::Data::new(config);
    let challenge_store_data = web::Data::new(challenge_store);
    let session_registry_data = web::Data::new(session_registry);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(challenge_store_data.clone())
            .app_data(session_registry_data.clone())
            .wrap(RateLimiter::new(vec![
                "/api/challenge".to_string(),
                "/api/proof".to_string(),
            ]))
            .configure(api::configure)
    })
    .bind(&server_addr)?
    .run()
    .await
}
