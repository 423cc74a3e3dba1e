//! Encrypted payload shapes — what the backing store sees.
//!
//! The store is append-only and content-addressed; it only sees:
//!   - ciphertext       (opaque, base64)
//!   - encrypted_key    (per-payload data key, sealed to the key-epoch)
//!   - public_address   (signer stamp — binds the blob to who wrote it)
//!   - nonce            (only when the cipher does not prefix it)
//!
//! The epoch public key is stripped before upload; decryption selects the
//! epoch by attempting the unwrap against the held epoch secrets (the AEAD
//! tag rejects every wrong epoch).

use serde::{Deserialize, Serialize};

use kl_crypto::seal::WrappedKey;

/// An encrypted write payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Protocol version for forward compatibility.
    pub version: u8,
    /// Base64url ciphertext. Nonce-prefixed unless `nonce` is set.
    pub ciphertext: String,
    /// Per-payload data key, sealed to the vault's current key-epoch.
    pub encrypted_key: WrappedKey,
    /// Detached nonce (base64url), present only when the caller carries the
    /// IV out of band as a side-channel tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Key-epoch public key. Populated while the payload is assembled,
    /// stripped before re-encoding for upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Address of the signer that produced this payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_address: Option<String>,
}

pub const PAYLOAD_VERSION: u8 = 1;

impl EncryptedPayload {
    /// Stamp the signer address and strip the embedded public key, binding
    /// the blob to the key-epoch and signer that produced it.
    pub fn stamped(mut self, signer_address: &str) -> Self {
        self.public_address = Some(signer_address.to_string());
        self.public_key = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kl_crypto::seal::{wrap_for, EncryptionKeyPair};

    #[test]
    fn stamping_strips_public_key() {
        let epoch = EncryptionKeyPair::generate();
        let payload = EncryptedPayload {
            version: PAYLOAD_VERSION,
            ciphertext: "YmxvYg".into(),
            encrypted_key: wrap_for(epoch.public(), b"datakeydatakeydatakeydatakey!!32").unwrap(),
            nonce: None,
            public_key: Some(epoch.public_b64()),
            public_address: None,
        };

        let stamped = payload.stamped("signer-addr");
        assert_eq!(stamped.public_address.as_deref(), Some("signer-addr"));
        assert!(stamped.public_key.is_none());

        let json = serde_json::to_string(&stamped).unwrap();
        assert!(!json.contains("\"public_key\""));
    }
}
