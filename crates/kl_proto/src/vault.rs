//! Vault record — the access-controlled container.
//!
//! The `keys` history is append-only: one entry per key-epoch, oldest
//! first. Rotation appends, nothing ever shrinks or reorders it. A public
//! vault carries no keys at all; every encryption path is a pass-through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keys::EncryptedKeyRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    pub id: String,
    pub name: Option<String>,
    /// Public vaults skip encryption entirely.
    pub public: bool,
    pub status: VaultStatus,
    /// Key-epoch history, oldest first. Empty for public vaults.
    #[serde(default)]
    pub keys: Vec<EncryptedKeyRecord>,
    /// Current raw X25519 public key (base64url). When present it wraps new
    /// key material directly; when absent the last `keys` entry is current.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultStatus {
    Active,
    Archived,
    Deleted,
}

impl Vault {
    /// The public key new key material must be wrapped with: the explicit
    /// current key if the vault carries one, otherwise the public half of
    /// the last key-epoch.
    pub fn current_public_key(&self) -> Option<&str> {
        self.public_key
            .as_deref()
            .or_else(|| self.keys.last().map(|k| k.public_key.as_str()))
    }
}
