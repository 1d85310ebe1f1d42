// Local keypair signer

use super::{SigningError, SigningIdentity};
use crate::ledger::{Address, Keypair, SignedTransaction, Transaction};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use zeroize::Zeroizing;

/// Signs with a keypair held in process memory.
///
/// Keypair files use the common JSON layout: an array of the 64 bytes
/// `secret ‖ public`.
pub struct LocalSigner {
    keypair: Keypair,
    connected: AtomicBool,
}

impl LocalSigner {
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair,
            connected: AtomicBool::new(false),
        }
    }

    pub fn generate() -> Self {
        Self::from_keypair(Keypair::generate())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SigningError> {
        let path = path.as_ref();
        let text = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            SigningError::Unavailable(format!("cannot read {}: {}", path.display(), e))
        })?);
        let bytes: Zeroizing<Vec<u8>> = Zeroizing::new(serde_json::from_str(&text).map_err(|e| {
            SigningError::Unavailable(format!("{} is not a keypair file: {}", path.display(), e))
        })?);
        let keypair = Keypair::from_bytes(&bytes)
            .map_err(|e| SigningError::Unavailable(e.to_string()))?;
        Ok(Self::from_keypair(keypair))
    }

    /// Write the keypair in the JSON array layout read by [`LocalSigner::from_file`]
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = self.keypair.to_bytes();
        let json = Zeroizing::new(serde_json::to_string(&bytes.to_vec())?);
        std::fs::write(path, json.as_bytes())?;
        Ok(())
    }

    pub fn address(&self) -> Address {
        self.keypair.address()
    }
}

#[async_trait]
impl SigningIdentity for LocalSigner {
    fn is_available(&self) -> bool {
        true
    }

    async fn connect(&self) -> Result<Address, SigningError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.keypair.address())
    }

    async fn disconnect(&self) -> Result<(), SigningError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_transaction(&self, transaction: Transaction) -> Result<SignedTransaction, SigningError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SigningError::NotConnected);
        }
        self.keypair
            .sign_transaction(transaction)
            .map_err(|e| SigningError::Rejected(e.to_string()))
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.keypair.address())
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Anchor, TransferStep};

    fn transfer_from(from: Address) -> Transaction {
        let mut transaction = Transaction::new(from, Anchor::new("anchor"));
        transaction.add_transfer_step(TransferStep::new(from, Keypair::generate().address(), 0.5));
        transaction
    }

    #[tokio::test]
    async fn test_sign_requires_connection() {
        let signer = LocalSigner::generate();
        let transaction = transfer_from(signer.address());
        assert_eq!(
            signer.sign_transaction(transaction.clone()).await.unwrap_err(),
            SigningError::NotConnected
        );

        assert_eq!(signer.connect().await.unwrap(), signer.address());
        let signed = signer.sign_transaction(transaction.clone()).await.unwrap();
        assert!(signed.is_fully_signed());
        assert!(signed.verify().unwrap());

        signer.disconnect().await.unwrap();
        assert!(signer.sign_transaction(transaction).await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_foreign_transaction() {
        let signer = LocalSigner::generate();
        signer.connect().await.unwrap();
        let transaction = transfer_from(Keypair::generate().address());
        assert!(matches!(
            signer.sign_transaction(transaction).await,
            Err(SigningError::Rejected(_))
        ));
    }

    #[test]
    fn test_keypair_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("id.json");
        let signer = LocalSigner::generate();
        signer.save_to_file(&path).unwrap();

        let loaded = LocalSigner::from_file(&path).unwrap();
        assert_eq!(loaded.address(), signer.address());
    }

    #[test]
    fn test_bad_keypair_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(LocalSigner::from_file(&path), Err(SigningError::Unavailable(_))));
        assert!(LocalSigner::from_file(dir.path().join("missing.json")).is_err());
    }
}
