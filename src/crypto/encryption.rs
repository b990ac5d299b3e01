//! Password-based AES-256-GCM tokens.
//!
//! AES-GCM is an AEAD cipher: a wrong password or a flipped bit makes the tag check
//! fail instead of yielding garbage plaintext.
//!
//! Token layout before base64url encoding:
//!
//! ```text
//! salt (16) | iterations (4, big-endian) | nonce (12) | ciphertext | tag (16)
//! ```
//!
//! Everything needed to decrypt, except the password, is inside the token.

use super::key_derivation::{derive_key, generate_salt, SALT_LEN};
use crate::error::{Error, Result};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE, Engine};
use rand::{rngs::OsRng, RngCore};
use std::fmt;

/// Nonce length (bytes) - 96 bits
pub const NONCE_LEN: usize = 12;

/// Authentication tag length (bytes) - 128 bits
pub const TAG_LEN: usize = 16;

/// Iteration count length (bytes)
const ITERATIONS_LEN: usize = 4;

/// Fixed header: salt + iteration count
pub const HEADER_LEN: usize = SALT_LEN + ITERATIONS_LEN;

/// Encoded ciphertext token, as stored in an entry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherToken(String);

impl CipherToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CipherToken {
    fn from(s: String) -> Self {
        Self(s.trim().to_string())
    }
}

impl From<&str> for CipherToken {
    fn from(s: &str) -> Self {
        Self(s.trim().to_string())
    }
}

impl fmt::Display for CipherToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded token, split into its parts.
#[derive(Debug, Clone)]
pub struct TokenHeader {
    pub salt: [u8; SALT_LEN],
    pub iterations: u32,
    /// nonce || ciphertext || tag
    pub ciphertext: Vec<u8>,
}

impl TokenHeader {
    /// Decode a token and split off the header.
    pub fn parse(token: &CipherToken) -> Result<Self> {
        let raw = URL_SAFE
            .decode(token.as_str().as_bytes())
            .map_err(|e| Error::format(format!("token is not valid base64: {}", e)))?;

        if raw.len() < HEADER_LEN {
            return Err(Error::format(format!(
                "token too short: {} bytes, header needs {}",
                raw.len(),
                HEADER_LEN
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&raw[..SALT_LEN]);

        let mut iter_bytes = [0u8; ITERATIONS_LEN];
        iter_bytes.copy_from_slice(&raw[SALT_LEN..HEADER_LEN]);
        let iterations = u32::from_be_bytes(iter_bytes);
        if iterations == 0 {
            return Err(Error::format("token declares zero iterations"));
        }

        let ciphertext = raw[HEADER_LEN..].to_vec();
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::format("token ciphertext region truncated"));
        }

        Ok(Self {
            salt,
            iterations,
            ciphertext,
        })
    }
}

/// Encrypt `plaintext` under a key derived from `password`.
pub fn encrypt(plaintext: &[u8], password: &str, iterations: u32) -> Result<CipherToken> {
    if iterations == 0 {
        return Err(Error::format("iteration count must be at least 1"));
    }

    let salt = generate_salt();
    let key = derive_key(password, &salt, iterations);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| Error::format("encryption failed"))?;

    // salt || iterations || nonce || ciphertext
    let mut raw = Vec::with_capacity(HEADER_LEN + NONCE_LEN + ciphertext.len());
    raw.extend_from_slice(&salt);
    raw.extend_from_slice(&iterations.to_be_bytes());
    raw.extend_from_slice(&nonce_bytes);
    raw.extend_from_slice(&ciphertext);

    Ok(CipherToken(URL_SAFE.encode(raw)))
}

/// Decrypt a token produced by [`encrypt`].
pub fn decrypt(token: &CipherToken, password: &str) -> Result<Vec<u8>> {
    let header = TokenHeader::parse(token)?;
    let key = derive_key(password, &header.salt, header.iterations);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));

    let (nonce, ciphertext) = header.ciphertext.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| Error::Authentication)
}
