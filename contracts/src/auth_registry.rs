//! # Authorization Registry
//!
//! Maps each principal to at most one alternate-auth public key. Registration
//! is an unconditional upsert: the last key wins and no history is kept. The
//! key type already guarantees the 33-byte length; nothing else is checked
//! here.

use std::collections::HashMap;

use lockbox_protocol::crypto::AuthPublicKey;
use lockbox_protocol::identity::Principal;

/// Principal → alternate-auth key.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationRegistry {
    keys: HashMap<Principal, AuthPublicKey>,
}

impl AuthorizationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) `caller`'s key. Returns the key it replaced.
    pub fn register(&mut self, caller: &Principal, key: AuthPublicKey) -> Option<AuthPublicKey> {
        self.keys.insert(caller.clone(), key)
    }

    pub fn has_key(&self, principal: &Principal) -> bool {
        self.keys.contains_key(principal)
    }

    pub fn key_of(&self, principal: &Principal) -> Option<&AuthPublicKey> {
        self.keys.get(principal)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Entries sorted by principal, for deterministic persistence.
    pub fn entries(&self) -> Vec<(Principal, AuthPublicKey)> {
        let mut entries: Vec<_> = self
            .keys
            .iter()
            .map(|(p, k)| (p.clone(), *k))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl FromIterator<(Principal, AuthPublicKey)> for AuthorizationRegistry {
    fn from_iter<I: IntoIterator<Item = (Principal, AuthPublicKey)>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}
