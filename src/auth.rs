//! Session directory: opaque bearer token to user identity.
//!
//! Session issuance lives outside this process; the relay only resolves
//! tokens it is handed. Static sessions can be seeded from `[[sessions]]`
//! config blocks, which is a development convenience rather than an
//! authentication scheme.

use dashmap::DashMap;
use parley_proto::UserId;

/// Token-to-identity map, validated on every incoming connection and HTTP
/// request.
#[derive(Default)]
pub struct SessionDirectory {
    tokens: DashMap<String, UserId>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for a user.
    pub fn grant(&self, token: &str, user_id: UserId) {
        self.tokens.insert(token.to_string(), user_id);
    }

    /// Invalidate a token. Returns whether it existed.
    #[allow(dead_code)] // driven by the embedding auth layer, not the relay
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    /// Resolve a token to the identity it authenticates, if any.
    pub fn resolve(&self, token: &str) -> Option<UserId> {
        self.tokens.get(token).map(|entry| *entry.value())
    }
}
