// auth-server/src/utils/token.rs
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a fresh challenge value: 32 random bytes, hex-encoded
pub fn generate_challenge_value() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 digest of a byte slice
pub fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_challenge_value() {
        let value = generate_challenge_value();
        assert_eq!(value.len(), 64); // 32 bytes as hex
        assert!(hex::decode(&value).is_ok());

        // Values should be unique
        let value2 = generate_challenge_value();
        assert_ne!(value, value2);
    }

    #[test]
    fn test_sha256() {
        let digest = sha256(b"test string");
        assert_eq!(
            hex::encode(digest),
            "d5579c46dfcc7f18207013e65b44e4cb4e2c2298f4ac457ba8f82743f31e930b"
        );
    }
}
