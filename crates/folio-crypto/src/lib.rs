/// Folio Crypto Library
///
/// Capability tokens for anonymous conversation access, opaque session ids,
/// and Argon2id hashing for the admin password.

pub mod password;
pub mod tokens;
