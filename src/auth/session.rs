//! Session token generation.

use base64::{engine::general_purpose, Engine as _};
use rand::Rng;

/// Generate a cryptographically random session token.
///
/// Returns an unpadded URL-safe base64 string (43 characters) from 32 random
/// bytes. The alphabet is valid both in a cookie value and as a file name.
pub fn generate_session_token() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
