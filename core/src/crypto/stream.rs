// Basic tier — ChaCha20 keystream over a salted passphrase hash
//
// Minimal protection: no padding, no authentication tag. A short key-check
// value lets a wrong passphrase be reported as an error instead of yielding
// scrambled plaintext; it does not protect against tampering.
//
// Body layout: salt (8) ‖ nonce (12) ‖ key-check (4) ‖ ciphertext

use super::cipher::{Cipher, Scheme};
use super::CryptoError;
use chacha20::cipher::{KeyIvInit, StreamCipher as _};
use chacha20::ChaCha20;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

const SALT_LEN: usize = 8;
const NONCE_LEN: usize = 12;
const CHECK_LEN: usize = 4;
const HEADER_LEN: usize = SALT_LEN + NONCE_LEN + CHECK_LEN;

#[derive(Debug, Clone, Copy, Default)]
pub struct StreamCipher;

fn derive_key(passphrase: &str, salt: &[u8]) -> Zeroizing<[u8; 32]> {
    let digest = Sha256::new()
        .chain_update(passphrase.as_bytes())
        .chain_update(salt)
        .finalize();
    Zeroizing::new(digest.into())
}

fn key_check(key: &[u8; 32]) -> [u8; CHECK_LEN] {
    let digest = Sha256::new()
        .chain_update(key)
        .chain_update(b"key-check")
        .finalize();
    let mut check = [0u8; CHECK_LEN];
    check.copy_from_slice(&digest[..CHECK_LEN]);
    check
}

fn apply_keystream(key: &[u8; 32], nonce: &[u8], buf: &mut [u8]) -> Result<(), String> {
    let mut cipher = ChaCha20::new_from_slices(key, nonce).map_err(|e| e.to_string())?;
    cipher.apply_keystream(buf);
    Ok(())
}

impl Cipher for StreamCipher {
    fn scheme(&self) -> Scheme {
        Scheme::Stream
    }

    fn seal(&self, plaintext: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
        let mut rng = rand::rngs::OsRng;
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let key = derive_key(passphrase, &salt);
        let mut body = Vec::with_capacity(HEADER_LEN + plaintext.len());
        body.extend_from_slice(&salt);
        body.extend_from_slice(&nonce);
        body.extend_from_slice(&key_check(&key));
        body.extend_from_slice(plaintext);

        apply_keystream(&key, &nonce, &mut body[HEADER_LEN..]).map_err(CryptoError::EncryptionFailed)?;
        Ok(body)
    }

    fn open(&self, body: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
        if body.len() < HEADER_LEN {
            return Err(CryptoError::DecryptionFailed(
                "ciphertext shorter than stream header".to_string(),
            ));
        }
        let (salt, rest) = body.split_at(SALT_LEN);
        let (nonce, rest) = rest.split_at(NONCE_LEN);
        let (check, ciphertext) = rest.split_at(CHECK_LEN);

        let key = derive_key(passphrase, salt);
        if key_check(&key) != check {
            return Err(CryptoError::DecryptionFailed("wrong key".to_string()));
        }

        let mut plaintext = ciphertext.to_vec();
        apply_keystream(&key, nonce, &mut plaintext).map_err(CryptoError::DecryptionFailed)?;
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_roundtrip() {
        let cipher = StreamCipher;
        let body = cipher.seal(b"hello hidden wallet", "passphrase").unwrap();
        assert_eq!(body.len(), HEADER_LEN + 19);
        let plaintext = cipher.open(&body, "passphrase").unwrap();
        assert_eq!(plaintext, b"hello hidden wallet");
    }

    #[test]
    fn test_stream_salts_differ() {
        let cipher = StreamCipher;
        let a = cipher.seal(b"same", "pw").unwrap();
        let b = cipher.seal(b"same", "pw").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_stream_wrong_key() {
        let cipher = StreamCipher;
        let body = cipher.seal(b"secret", "right").unwrap();
        assert!(matches!(
            cipher.open(&body, "wrong"),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_stream_truncated() {
        let cipher = StreamCipher;
        assert!(cipher.open(&[0u8; 5], "pw").is_err());
    }
}
