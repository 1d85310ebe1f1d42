// Hidden address book for the hwallet CLI
//
// Stores sealed hidden addresses keyed by public key (base58), with an
// optional label. Private keys stay encrypted; unlocking goes through the
// wallet's key-protection service.

use anyhow::{Context, Result};
use hiddenwallet_core::HiddenAddress;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAddress {
    #[serde(flatten)]
    pub address: HiddenAddress,

    /// User-friendly label
    pub label: Option<String>,
}

impl StoredAddress {
    pub fn new(address: HiddenAddress) -> Self {
        Self {
            address,
            label: None,
        }
    }

    pub fn with_label(mut self, label: String) -> Self {
        self.label = Some(label);
        self
    }

    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.address.public_key)
    }
}

pub struct AddressBook {
    db: Db,
}

impl AddressBook {
    /// Open or create the address database
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path).context("Failed to open address database")?;
        Ok(Self { db })
    }

    pub fn add(&self, entry: &StoredAddress) -> Result<()> {
        let value = serde_json::to_vec(entry).context("Failed to serialize address")?;
        self.db
            .insert(entry.address.public_key.as_bytes(), value)
            .context("Failed to insert address")?;
        self.db.flush().context("Failed to flush address database")?;
        Ok(())
    }

    pub fn get(&self, public_key: &str) -> Result<Option<StoredAddress>> {
        match self.db.get(public_key.as_bytes())? {
            Some(bytes) => {
                let entry = serde_json::from_slice(&bytes).context("Failed to deserialize address")?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Look up by public key, falling back to an exact label match
    pub fn find(&self, key_or_label: &str) -> Result<Option<StoredAddress>> {
        if let Some(entry) = self.get(key_or_label)? {
            return Ok(Some(entry));
        }
        Ok(self
            .list()?
            .into_iter()
            .find(|entry| entry.label.as_deref() == Some(key_or_label)))
    }

    pub fn remove(&self, public_key: &str) -> Result<bool> {
        let removed = self
            .db
            .remove(public_key.as_bytes())
            .context("Failed to remove address")?;
        Ok(removed.is_some())
    }

    /// All addresses, oldest first
    pub fn list(&self) -> Result<Vec<StoredAddress>> {
        let mut entries = Vec::new();
        for item in self.db.iter() {
            let (_key, value) = item?;
            let entry: StoredAddress =
                serde_json::from_slice(&value).context("Failed to deserialize address")?;
            entries.push(entry);
        }
        entries.sort_by(|a, b| {
            a.address
                .created_at
                .cmp(&b.address.created_at)
                .then_with(|| a.address.public_key.cmp(&b.address.public_key))
        });
        Ok(entries)
    }

    pub fn count(&self) -> usize {
        self.db.len()
    }
}
