// auth-server/src/api/mod.rs
pub mod handshake;

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        actix_web::web::scope("/api")
            .service(handshake::api_index)
            .service(handshake::issue_challenge)
            .service(handshake::submit_proof)
            .service(handshake::resolve_session)
            .service(handshake::revoke_session),
    );
}
