// Cryptography module: tiered key protection for secrets at rest

pub mod cbc;
pub mod cipher;
#[cfg(feature = "aead")]
pub mod gcm;
pub mod service;
pub mod stream;

pub use cipher::{cipher_for, Cipher, Scheme};
pub use service::{sha256_hex, KeyProtectionService};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}
