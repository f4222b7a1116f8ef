use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use rand::rngs::OsRng;

// Session token entropy, 256 bits
const SESSION_TOKEN_BYTES: usize = 32;

pub struct CryptoUtils;

impl CryptoUtils {
    // Hashes a password with bcrypt at the default cost
    pub fn hash_password(password: &str) -> Result<String> {
        bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| anyhow!("Failed to hash password: {}", e))
    }

    // Checks a password against a stored bcrypt hash ($2a$, $2b$ and $2y$ all verify)
    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        bcrypt::verify(password, hash)
            .map_err(|e| anyhow!("Failed to verify password: {}", e))
    }

    // Generates an opaque session token, URL-safe and cookie-safe
    pub fn generate_session_token() -> String {
        let mut bytes = [0u8; SESSION_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }
}
