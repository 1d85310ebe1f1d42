// Standard tier — AES-256-CBC with PKCS7 padding
//
// Key = SHA-256(passphrase). Body layout: iv (16) ‖ ciphertext

use super::cipher::{Cipher, Scheme};
use super::CryptoError;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;

#[derive(Debug, Clone, Copy, Default)]
pub struct CbcCipher;

fn derive_key(passphrase: &str) -> Zeroizing<[u8; 32]> {
    Zeroizing::new(Sha256::digest(passphrase.as_bytes()).into())
}

impl Cipher for CbcCipher {
    fn scheme(&self) -> Scheme {
        Scheme::Cbc
    }

    fn seal(&self, plaintext: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
        let key = derive_key(passphrase);
        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let encryptor = Aes256CbcEnc::new_from_slices(key.as_ref(), &iv)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut body = Vec::with_capacity(IV_LEN + ciphertext.len());
        body.extend_from_slice(&iv);
        body.extend_from_slice(&ciphertext);
        Ok(body)
    }

    fn open(&self, body: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
        if body.len() < IV_LEN + BLOCK_LEN || (body.len() - IV_LEN) % BLOCK_LEN != 0 {
            return Err(CryptoError::DecryptionFailed(
                "ciphertext is not a whole number of blocks".to_string(),
            ));
        }
        let (iv, ciphertext) = body.split_at(IV_LEN);
        let key = derive_key(passphrase);

        let decryptor = Aes256CbcDec::new_from_slices(key.as_ref(), iv)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed("bad padding or wrong key".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cbc_roundtrip() {
        let cipher = CbcCipher;
        for plaintext in [&b""[..], b"a", b"exactly16bytes!!", b"a somewhat longer secret message"] {
            let body = cipher.seal(plaintext, "passphrase").unwrap();
            assert_eq!((body.len() - IV_LEN) % BLOCK_LEN, 0);
            assert_eq!(cipher.open(&body, "passphrase").unwrap(), plaintext);
        }
    }

    #[test]
    fn test_cbc_random_iv() {
        let cipher = CbcCipher;
        let a = cipher.seal(b"same", "pw").unwrap();
        let b = cipher.seal(b"same", "pw").unwrap();
        assert_ne!(a[..IV_LEN], b[..IV_LEN]);
    }

    #[test]
    fn test_cbc_rejects_partial_block() {
        let cipher = CbcCipher;
        let mut body = cipher.seal(b"secret", "pw").unwrap();
        body.pop();
        assert!(matches!(
            cipher.open(&body, "pw"),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }
}
