// Key protection service — tiered encrypt/decrypt/hash for keys at rest

use super::cipher::{cipher_for, open_envelope, seal_envelope, Cipher, Scheme};
use super::CryptoError;
use crate::level::SecurityLevel;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

const MASTER_KEY_BYTES: usize = 32;

/// Encrypts secrets under a passphrase with the cipher chosen by the tier.
///
/// Calls that pass no key (or an empty one) use the service's master key:
/// either supplied at construction or 32 random bytes drawn once from the OS
/// random source.
pub struct KeyProtectionService {
    level: SecurityLevel,
    cipher: Box<dyn Cipher>,
    master_key: Zeroizing<String>,
}

impl KeyProtectionService {
    /// Create a service with a freshly generated master key
    pub fn new(level: SecurityLevel) -> Self {
        let master_key = Zeroizing::new(random_hex(MASTER_KEY_BYTES));
        Self {
            level,
            cipher: cipher_for(level),
            master_key,
        }
    }

    /// Create a service around an externally supplied master key
    pub fn with_master_key(level: SecurityLevel, master_key: impl Into<String>) -> Result<Self, CryptoError> {
        let master_key = Zeroizing::new(master_key.into());
        if master_key.is_empty() {
            return Err(CryptoError::InvalidKey(
                "master key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            level,
            cipher: cipher_for(level),
            master_key,
        })
    }

    pub fn level(&self) -> SecurityLevel {
        self.level
    }

    /// Algorithm actually in use (differs from the tier's nominal one when
    /// the high tier has fallen back to CBC)
    pub fn scheme(&self) -> Scheme {
        self.cipher.scheme()
    }

    fn passphrase<'a>(&'a self, key: Option<&'a str>) -> &'a str {
        match key {
            Some(k) if !k.is_empty() => k,
            _ => self.master_key.as_str(),
        }
    }

    /// Encrypt a UTF-8 string into the base64 envelope
    pub fn encrypt(&self, plaintext: &str, key: Option<&str>) -> Result<String, CryptoError> {
        seal_envelope(self.cipher.as_ref(), plaintext.as_bytes(), self.passphrase(key)).map_err(|e| {
            tracing::warn!(level = %self.level, "encryption failed");
            e
        })
    }

    /// Decrypt an envelope produced by [`KeyProtectionService::encrypt`]
    pub fn decrypt(&self, ciphertext: &str, key: Option<&str>) -> Result<String, CryptoError> {
        let plaintext = open_envelope(self.cipher.as_ref(), ciphertext, self.passphrase(key))
            .map_err(|e| {
                tracing::debug!(level = %self.level, error = %e, "decryption failed");
                e
            })?;
        String::from_utf8(plaintext).map_err(|e| {
            let mut bytes = e.into_bytes();
            zeroize::Zeroize::zeroize(&mut bytes);
            CryptoError::DecryptionFailed("plaintext is not valid UTF-8".to_string())
        })
    }

    /// SHA-256 digest, lowercase hex
    pub fn hash(&self, data: &str) -> String {
        sha256_hex(data.as_bytes())
    }

    /// `len` bytes from the OS random source, hex encoded
    pub fn random_bytes(&self, len: usize) -> String {
        random_hex(len)
    }
}

impl std::fmt::Debug for KeyProtectionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyProtectionService")
            .field("level", &self.level)
            .field("scheme", &self.cipher.scheme())
            .finish_non_exhaustive()
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn random_hex(len: usize) -> String {
    let mut bytes = Zeroizing::new(vec![0u8; len]);
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_roundtrip_all_tiers_with_master_key() {
        for level in SecurityLevel::ALL {
            let service = KeyProtectionService::new(level);
            let sealed = service.encrypt("private key material", None).unwrap();
            assert_ne!(sealed, "private key material");
            assert_eq!(service.decrypt(&sealed, None).unwrap(), "private key material");
        }
    }

    #[test]
    fn test_explicit_key_overrides_master() {
        let service = KeyProtectionService::new(SecurityLevel::Standard);
        let sealed = service.encrypt("secret", Some("user passphrase")).unwrap();
        assert!(service.decrypt(&sealed, None).is_err());
        assert_eq!(service.decrypt(&sealed, Some("user passphrase")).unwrap(), "secret");
    }

    #[test]
    fn test_empty_key_means_master() {
        let service = KeyProtectionService::new(SecurityLevel::Basic);
        let sealed = service.encrypt("secret", Some("")).unwrap();
        assert_eq!(service.decrypt(&sealed, None).unwrap(), "secret");
    }

    #[test]
    fn test_master_keys_are_independent() {
        let a = KeyProtectionService::new(SecurityLevel::Standard);
        let b = KeyProtectionService::new(SecurityLevel::Standard);
        let sealed = a.encrypt("secret", None).unwrap();
        assert!(matches!(
            b.decrypt(&sealed, None),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_supplied_master_key() {
        let a = KeyProtectionService::with_master_key(SecurityLevel::Basic, "shared").unwrap();
        let b = KeyProtectionService::with_master_key(SecurityLevel::Basic, "shared").unwrap();
        let sealed = a.encrypt("secret", None).unwrap();
        assert_eq!(b.decrypt(&sealed, None).unwrap(), "secret");

        assert!(matches!(
            KeyProtectionService::with_master_key(SecurityLevel::Basic, ""),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[cfg(feature = "aead")]
    #[test]
    fn test_high_ciphertext_fails_under_standard() {
        let high = KeyProtectionService::with_master_key(SecurityLevel::High, "k").unwrap();
        let standard = KeyProtectionService::with_master_key(SecurityLevel::Standard, "k").unwrap();
        let sealed = high.encrypt("cross tier", None).unwrap();
        assert!(matches!(
            standard.decrypt(&sealed, None),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        let service = KeyProtectionService::new(SecurityLevel::Basic);
        assert_eq!(
            service.hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_random_bytes_length_and_uniqueness() {
        let service = KeyProtectionService::new(SecurityLevel::Basic);
        let a = service.random_bytes(16);
        let b = service.random_bytes(16);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert_eq!(service.random_bytes(0), "");
    }

    proptest! {
        #[test]
        fn prop_roundtrip_basic_and_standard(plaintext in "[ -~]{0,128}") {
            for level in [SecurityLevel::Basic, SecurityLevel::Standard] {
                let service = KeyProtectionService::with_master_key(level, "prop key").unwrap();
                let sealed = service.encrypt(&plaintext, None).unwrap();
                prop_assert_eq!(service.decrypt(&sealed, None).unwrap(), plaintext.clone());
            }
        }
    }

    proptest! {
        // PBKDF2 at full strength per case; keep the case count small
        #![proptest_config(ProptestConfig::with_cases(4))]
        #[test]
        fn prop_roundtrip_high(plaintext in "[ -~]{0,64}") {
            let service = KeyProtectionService::with_master_key(SecurityLevel::High, "prop key").unwrap();
            let sealed = service.encrypt(&plaintext, None).unwrap();
            prop_assert_eq!(service.decrypt(&sealed, None).unwrap(), plaintext);
        }
    }
}
