// High tier — AES-256-GCM with a PBKDF2-derived key
//
// Key = PBKDF2-HMAC-SHA256(passphrase, fixed salt, 100 000 rounds).
// A fresh 12-byte nonce is drawn for every encryption.
// Body layout: nonce (12) ‖ ciphertext ‖ tag (16)

use super::cipher::{Cipher, Scheme};
use super::CryptoError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Fixed KDF salt. Changing it makes every existing high-tier ciphertext unreadable.
pub const KDF_SALT: &[u8] = b"hidden-wallet-salt";
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct GcmCipher {
    iterations: u32,
}

impl Default for GcmCipher {
    fn default() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
        }
    }
}

impl GcmCipher {
    fn derive_key(&self, passphrase: &str) -> Zeroizing<[u8; 32]> {
        let mut key = Zeroizing::new([0u8; 32]);
        pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), KDF_SALT, self.iterations, key.as_mut());
        key
    }

    fn cipher(&self, passphrase: &str) -> Result<Aes256Gcm, String> {
        let key = self.derive_key(passphrase);
        Aes256Gcm::new_from_slice(key.as_ref()).map_err(|e| e.to_string())
    }
}

impl Cipher for GcmCipher {
    fn scheme(&self) -> Scheme {
        Scheme::Gcm
    }

    fn seal(&self, plaintext: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
        let cipher = self.cipher(passphrase).map_err(CryptoError::EncryptionFailed)?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut body = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        body.extend_from_slice(&nonce);
        body.extend_from_slice(&ciphertext);
        Ok(body)
    }

    fn open(&self, body: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
        if body.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::DecryptionFailed(
                "ciphertext shorter than nonce and tag".to_string(),
            ));
        }
        let (nonce, ciphertext) = body.split_at(NONCE_LEN);
        let cipher = self.cipher(passphrase).map_err(CryptoError::DecryptionFailed)?;

        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                CryptoError::DecryptionFailed(
                    "authentication failed: wrong key or tampered ciphertext".to_string(),
                )
            })
    }
}
