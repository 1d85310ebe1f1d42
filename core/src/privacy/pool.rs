// Mixing pool and intermediate key store
//
// The pool is the candidate set for multi-hop intermediates. Members the
// builder generated itself have their keypair in the key store, indexed by
// the member's base58 address and looked up by that address only.

use crate::ledger::{Address, Keypair};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MixingPool {
    members: Vec<Address>,
}

impl MixingPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member. Returns `false` if it was already present.
    pub fn insert(&mut self, address: Address) -> bool {
        if self.members.contains(&address) {
            return false;
        }
        self.members.push(address);
        true
    }

    /// Remove every entry equal to `address`, returning how many were dropped
    pub fn remove(&mut self, address: &Address) -> usize {
        let before = self.members.len();
        self.members.retain(|member| member != address);
        before - self.members.len()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.members.contains(address)
    }

    pub fn members(&self) -> &[Address] {
        &self.members
    }

    /// Members usable as hops for a transfer between `from` and `to`
    pub fn candidates(&self, from: &Address, to: &Address) -> Vec<Address> {
        self.members
            .iter()
            .filter(|member| *member != from && *member != to)
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Keypairs of builder-generated intermediates
#[derive(Default)]
pub struct IntermediateKeyStore {
    keys: HashMap<String, Keypair>,
}

impl IntermediateKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `keypair` under its own address and return that address
    pub fn retain(&mut self, keypair: Keypair) -> Address {
        let address = keypair.address();
        self.keys.insert(address.to_string(), keypair);
        address
    }

    pub fn get(&self, address: &Address) -> Option<&Keypair> {
        self.keys.get(&address.to_string())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl std::fmt::Debug for IntermediateKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntermediateKeyStore")
            .field("len", &self.keys.len())
            .finish()
    }
}
