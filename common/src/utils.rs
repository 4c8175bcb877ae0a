// common/src/utils.rs
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Setup tracing for consistent logging across services
pub fn setup_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

// Session token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,          // wallet address
    pub tg: Option<i64>,      // embedding-host user id
    pub exp: usize,           // expiration time
    pub iat: usize,           // issued at time
}

fn unix_now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as usize
}

// Mint a session token bound to a wallet address
pub fn generate_session_token(
    wallet_address: &str,
    telegram_id: Option<i64>,
    secret: &[u8],
    ttl_seconds: usize,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = unix_now();

    let claims = SessionClaims {
        sub: wallet_address.to_string(),
        tg: telegram_id,
        iat: now,
        exp: now + ttl_seconds,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

// Validate a session token and extract the wallet binding
pub fn validate_session_token(
    token: &str,
    secret: &[u8],
) -> Result<(String, Option<i64>), jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &validation,
    )?;

    Ok((token_data.claims.sub, token_data.claims.tg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_round_trip() {
        let token = generate_session_token("0:abcdef", Some(99), b"secret", 3600).unwrap();
        let (address, tg) = validate_session_token(&token, b"secret").unwrap();
        assert_eq!(address, "0:abcdef");
        assert_eq!(tg, Some(99));
    }

    #[test]
    fn test_session_token_rejects_wrong_secret() {
        let token = generate_session_token("0:abcdef", None, b"secret", 3600).unwrap();
        assert!(validate_session_token(&token, b"other").is_err());
    }
}
