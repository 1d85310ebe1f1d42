// Cipher capability — one implementation per security tier
//
// Every ciphertext leaves the service as base64(scheme ‖ body). The scheme
// byte names the algorithm that produced the body, so a payload sealed by
// one tier is rejected by another instead of being mis-decoded.

use super::CryptoError;
use crate::level::SecurityLevel;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Algorithm identifier carried in front of every ciphertext body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// ChaCha20 keystream, hashed passphrase, no authentication
    Stream = 0x01,
    /// AES-256-CBC + PKCS7, SHA-256 of the passphrase as key
    Cbc = 0x02,
    /// AES-256-GCM, PBKDF2-derived key
    Gcm = 0x03,
}

impl Scheme {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Scheme::Stream),
            0x02 => Some(Scheme::Cbc),
            0x03 => Some(Scheme::Gcm),
            _ => None,
        }
    }
}

/// Symmetric primitive keyed by a passphrase.
pub trait Cipher: Send + Sync {
    fn scheme(&self) -> Scheme;

    /// Encrypt `plaintext`, returning the body (everything after the scheme byte)
    fn seal(&self, plaintext: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError>;

    /// Reverse of [`Cipher::seal`]
    fn open(&self, body: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError>;
}

/// Pick the cipher for a tier.
///
/// `High` uses AES-GCM when the `aead` feature is compiled in and the CBC
/// path otherwise.
pub fn cipher_for(level: SecurityLevel) -> Box<dyn Cipher> {
    match level {
        SecurityLevel::Basic => Box::new(super::stream::StreamCipher),
        SecurityLevel::Standard => Box::new(super::cbc::CbcCipher),
        SecurityLevel::High => high_cipher(),
    }
}

#[cfg(feature = "aead")]
fn high_cipher() -> Box<dyn Cipher> {
    Box::new(super::gcm::GcmCipher::default())
}

#[cfg(not(feature = "aead"))]
fn high_cipher() -> Box<dyn Cipher> {
    tracing::warn!("AES-GCM not compiled in; high tier falls back to AES-CBC");
    Box::new(super::cbc::CbcCipher)
}

/// Seal and wrap into the text envelope
pub fn seal_envelope(cipher: &dyn Cipher, plaintext: &[u8], passphrase: &str) -> Result<String, CryptoError> {
    let body = cipher.seal(plaintext, passphrase)?;
    let mut framed = Vec::with_capacity(body.len() + 1);
    framed.push(cipher.scheme() as u8);
    framed.extend_from_slice(&body);
    Ok(STANDARD.encode(framed))
}

/// Unwrap the text envelope and open it with `cipher`
pub fn open_envelope(cipher: &dyn Cipher, envelope: &str, passphrase: &str) -> Result<Vec<u8>, CryptoError> {
    let framed = STANDARD
        .decode(envelope.trim())
        .map_err(|e| CryptoError::DecryptionFailed(format!("invalid base64: {}", e)))?;

    let (&scheme_byte, body) = framed
        .split_first()
        .ok_or_else(|| CryptoError::DecryptionFailed("empty ciphertext".to_string()))?;

    match Scheme::from_byte(scheme_byte) {
        Some(scheme) if scheme == cipher.scheme() => cipher.open(body, passphrase),
        Some(scheme) => Err(CryptoError::DecryptionFailed(format!(
            "ciphertext was produced by {:?}, expected {:?}",
            scheme,
            cipher.scheme()
        ))),
        None => Err(CryptoError::DecryptionFailed(format!(
            "unknown cipher scheme 0x{:02x}",
            scheme_byte
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_byte_roundtrip() {
        for scheme in [Scheme::Stream, Scheme::Cbc, Scheme::Gcm] {
            assert_eq!(Scheme::from_byte(scheme as u8), Some(scheme));
        }
        assert_eq!(Scheme::from_byte(0x7f), None);
    }

    #[test]
    fn test_cipher_for_tiers() {
        assert_eq!(cipher_for(SecurityLevel::Basic).scheme(), Scheme::Stream);
        assert_eq!(cipher_for(SecurityLevel::Standard).scheme(), Scheme::Cbc);
        #[cfg(feature = "aead")]
        assert_eq!(cipher_for(SecurityLevel::High).scheme(), Scheme::Gcm);
        #[cfg(not(feature = "aead"))]
        assert_eq!(cipher_for(SecurityLevel::High).scheme(), Scheme::Cbc);
    }

    #[test]
    fn test_envelope_rejects_foreign_scheme() {
        let basic = cipher_for(SecurityLevel::Basic);
        let standard = cipher_for(SecurityLevel::Standard);
        let sealed = seal_envelope(basic.as_ref(), b"payload", "pw").unwrap();
        let err = open_envelope(standard.as_ref(), &sealed, "pw").unwrap_err();
        assert!(matches!(err, CryptoError::DecryptionFailed(_)));
    }

    #[test]
    fn test_envelope_rejects_garbage() {
        let standard = cipher_for(SecurityLevel::Standard);
        assert!(open_envelope(standard.as_ref(), "", "pw").is_err());
        assert!(open_envelope(standard.as_ref(), "%%%not base64", "pw").is_err());
        assert!(open_envelope(standard.as_ref(), &STANDARD.encode([0x7fu8, 1, 2]), "pw").is_err());
    }
}
