//! Crypto module - password-based encryption of journal entries.
//!
//! This module contains:
//! - PBKDF2-HMAC-SHA256 key derivation from the journal password
//! - AES-256-GCM encryption into self-describing tokens

pub mod encryption;
pub mod key_derivation;

pub use encryption::{decrypt, encrypt, CipherToken, TokenHeader};
pub use key_derivation::{DEFAULT_ITERATIONS, KEY_LEN, SALT_LEN};
