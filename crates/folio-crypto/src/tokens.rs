use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Length in characters of a conversation token (32 random bytes, hex encoded).
pub const CONVERSATION_TOKEN_LEN: usize = 64;

fn random_bytes() -> [u8; 32] {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

/// Generate a conversation token: 256 bits from a CSPRNG, lowercase hex.
/// Holding the token is the only thing that grants access to a thread.
pub fn generate_conversation_token() -> String {
    hex::encode(random_bytes())
}

/// Generate an opaque session id for the session cookie.
pub fn generate_session_id() -> String {
    URL_SAFE_NO_PAD.encode(random_bytes())
}

/// SHA-256 of a session id, hex encoded. Persisted session stores key on this
/// so a leaked sessions table cannot be replayed as cookies.
pub fn hash_session_id(session_id: &str) -> String {
    hex::encode(Sha256::digest(session_id.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn conversation_token_is_64_hex_chars() {
        let token = generate_conversation_token();
        assert_eq!(token.len(), CONVERSATION_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_conversation_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn session_id_is_url_safe() {
        let sid = generate_session_id();
        assert_eq!(sid.len(), 43);
        assert!(sid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn session_hash_is_stable() {
        let sid = generate_session_id();
        assert_eq!(hash_session_id(&sid), hash_session_id(&sid));
        assert_ne!(hash_session_id(&sid), hash_session_id("other"));
        assert_eq!(hash_session_id(&sid).len(), 64);
    }
}
