//! Per-entity encryption context.
//!
//! Holds the decrypted key-epoch secrets of one vault (or one membership's
//! narrower view of it), the wallet identity that unwrapped them, and the
//! raw public key that wraps new material. Rebuilt every time vault context
//! is established.
//!
//! Data path: every payload gets a fresh random 32-byte data key, sealed to
//! the current epoch's public key. Decryption attempts the unwrap against
//! held epochs newest-first; the AEAD tag rejects every wrong epoch, so no
//! epoch identifier needs to travel with the blob.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use x25519_dalek::StaticSecret;
use zeroize::ZeroizeOnDrop;

use kl_crypto::{aead, seal};
use kl_proto::envelope::{EncryptedPayload, PAYLOAD_VERSION};
use kl_proto::EncryptedKeyRecord;

use crate::error::{Error, Result};
use crate::wallet::Wallet;

const DATA_AAD: &[u8] = b"kl-vault-data-v1";

/// One decrypted key-epoch.
#[derive(Clone, ZeroizeOnDrop)]
struct EpochKey {
    #[zeroize(skip)]
    public: String,
    secret: [u8; 32],
}

#[derive(Default, Clone, Copy)]
pub struct EncryptOptions {
    /// Carry the nonce out of band instead of prefixing it into the
    /// ciphertext (callers then emit it as a side-channel tag).
    pub detached_nonce: bool,
}

#[derive(Clone)]
pub struct EncryptionContext {
    wallet: Arc<dyn Wallet>,
    /// Oldest first, matching the vault's key history.
    epochs: Vec<EpochKey>,
    /// Explicit current wrap key; falls back to the newest epoch.
    raw_public_key: Option<String>,
}

impl EncryptionContext {
    pub fn new(wallet: Arc<dyn Wallet>) -> Self {
        Self { wallet, epochs: Vec::new(), raw_public_key: None }
    }

    /// Context over the wallet's own keypair — used for independently
    /// encrypted objects like the profile.
    pub fn for_owner(wallet: Arc<dyn Wallet>) -> Self {
        let secret = wallet.encryption_secret().to_bytes();
        let public = wallet.encryption_public_key();
        Self {
            wallet,
            epochs: vec![EpochKey { public, secret }],
            raw_public_key: None,
        }
    }

    /// Drop all epoch material (entering a public vault, or re-establishing).
    pub fn clear(&mut self) {
        self.epochs.clear();
        self.raw_public_key = None;
    }

    /// Unwrap the given records with the wallet identity and hold the epoch
    /// secrets. Any failed unwrap aborts with `IncorrectEncryptionKey`.
    pub fn set_keys(&mut self, records: &[EncryptedKeyRecord]) -> Result<()> {
        let unwrap_secret = self.wallet.encryption_secret();
        let mut epochs = Vec::with_capacity(records.len());
        for record in records {
            let opened = seal::unwrap_with(&unwrap_secret, &record.encrypted_private_key)
                .map_err(|_| Error::IncorrectEncryptionKey)?;
            let secret: [u8; 32] = opened[..]
                .try_into()
                .map_err(|_| Error::IncorrectEncryptionKey)?;
            epochs.push(EpochKey { public: record.public_key.clone(), secret });
        }
        self.epochs = epochs;
        Ok(())
    }

    pub fn set_raw_public_key(&mut self, public_key_b64: &str) {
        self.raw_public_key = Some(public_key_b64.to_string());
    }

    /// The key new material is wrapped with: the explicit current key if
    /// set, otherwise the newest held epoch.
    pub fn current_public_key(&self) -> Option<&str> {
        self.raw_public_key
            .as_deref()
            .or_else(|| self.epochs.last().map(|e| e.public.as_str()))
    }

    pub fn has_keys(&self) -> bool {
        !self.epochs.is_empty() || self.raw_public_key.is_some()
    }

    /// Seal every held epoch secret for `recipient` — the record set a new
    /// member needs to read the vault's full history.
    pub fn wrap_epochs_for(&self, recipient_pub_b64: &str) -> Result<Vec<EncryptedKeyRecord>> {
        let recipient = seal::public_key_from_b64(recipient_pub_b64)?;
        self.epochs
            .iter()
            .map(|epoch| {
                let wrapped = seal::wrap_for(&recipient, &epoch.secret)?;
                Ok(EncryptedKeyRecord {
                    encrypted_private_key: wrapped,
                    public_key: epoch.public.clone(),
                    member_public_key: None,
                })
            })
            .collect()
    }

    pub fn encrypt_raw(&self, data: &[u8], options: EncryptOptions) -> Result<EncryptedPayload> {
        let current = self
            .current_public_key()
            .ok_or(Error::IncorrectEncryptionKey)?
            .to_string();
        let epoch_pub = seal::public_key_from_b64(&current)?;

        let data_key = aead::generate_key();
        let encrypted_key = seal::wrap_for(&epoch_pub, &data_key)?;

        let (ciphertext, nonce) = if options.detached_nonce {
            let (nonce, ct) = aead::encrypt_detached(&data_key, data, DATA_AAD)?;
            (URL_SAFE_NO_PAD.encode(&ct), Some(URL_SAFE_NO_PAD.encode(nonce)))
        } else {
            (URL_SAFE_NO_PAD.encode(aead::encrypt(&data_key, data, DATA_AAD)?), None)
        };

        Ok(EncryptedPayload {
            version: PAYLOAD_VERSION,
            ciphertext,
            encrypted_key,
            nonce,
            public_key: Some(current),
            public_address: None,
        })
    }

    pub fn decrypt_raw(&self, payload: &EncryptedPayload) -> Result<Vec<u8>> {
        let ciphertext = URL_SAFE_NO_PAD
            .decode(&payload.ciphertext)
            .map_err(|_| Error::IncorrectEncryptionKey)?;

        let data_key = self.unwrap_data_key(payload)?;

        let plaintext = match &payload.nonce {
            Some(nonce_b64) => {
                let nonce_bytes = URL_SAFE_NO_PAD
                    .decode(nonce_b64)
                    .map_err(|_| Error::IncorrectEncryptionKey)?;
                let nonce: [u8; aead::NONCE_LEN] = nonce_bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::IncorrectEncryptionKey)?;
                aead::decrypt_detached(&data_key, &nonce, &ciphertext, DATA_AAD)?
            }
            None => aead::decrypt(&data_key, &ciphertext, DATA_AAD)?,
        };
        Ok(plaintext.to_vec())
    }

    /// Unwrap the per-payload data key. When the payload still carries its
    /// epoch public key only that epoch is tried; otherwise epochs are
    /// attempted newest-first.
    fn unwrap_data_key(&self, payload: &EncryptedPayload) -> Result<[u8; 32]> {
        let candidates: Vec<&EpochKey> = match &payload.public_key {
            Some(epoch_pub) => self.epochs.iter().filter(|e| &e.public == epoch_pub).collect(),
            None => self.epochs.iter().rev().collect(),
        };

        for epoch in candidates {
            let secret = StaticSecret::from(epoch.secret);
            if let Ok(opened) = seal::unwrap_with(&secret, &payload.encrypted_key) {
                if let Ok(key) = <[u8; 32]>::try_from(&opened[..]) {
                    return Ok(key);
                }
            }
        }
        Err(Error::IncorrectEncryptionKey)
    }

    pub fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.wallet
    }
}
