//! Key derivation with PBKDF2-HMAC-SHA256.
//!
//! The iteration count travels inside every token, so raising
//! [`DEFAULT_ITERATIONS`] later never breaks decryption of older entries.

use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Salt length (bytes)
pub const SALT_LEN: usize = 16;

/// Key length (bytes) - 256 bits for AES-256
pub const KEY_LEN: usize = 32;

/// Work factor used for new tokens
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Derive an AES-256 key from a password.
///
/// # Arguments
/// * `password` - The journal password
/// * `salt` - 16 random bytes, unique per token
/// * `iterations` - PBKDF2 rounds, must be at least 1
pub fn derive_key(password: &str, salt: &[u8; SALT_LEN], iterations: u32) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key[..]);
    key
}

/// Generate a random salt
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}
