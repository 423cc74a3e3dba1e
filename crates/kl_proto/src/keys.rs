//! Per-member wrapped key records.
//!
//! One record exists per (member × key-epoch). The vault's own `keys`
//! history holds the owner-wrapped records; each membership additionally
//! carries the records wrapped for that member.

use serde::{Deserialize, Serialize};

use kl_crypto::seal::WrappedKey;

/// One key-epoch sealed for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeyRecord {
    /// The epoch's X25519 secret, sealed to the recipient.
    pub encrypted_private_key: WrappedKey,
    /// The epoch's X25519 public key (base64url) — identifies the epoch and
    /// wraps that epoch's per-payload data keys.
    pub public_key: String,
    /// Recipient's own public key. Only populated while a record is being
    /// assembled locally; stripped before the record travels (it only needs
    /// to go one direction).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_public_key: Option<String>,
}

impl EncryptedKeyRecord {
    /// Remove the recipient public key before upload.
    pub fn stripped(mut self) -> Self {
        self.member_public_key = None;
        self
    }
}
