//! Vault context service.
//!
//! Binds an encryption context, a vault identity, and the API collaborator
//! together; every higher-level operation goes through its encode/decode
//! primitives and its tag builder. Cloning the context preserves the
//! "construct from an existing service" behaviour — all collaborators are
//! shared handles.
//!
//! `set_vault_context` is the only setter that touches the network; every
//! other setter mutates service-local state.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use tracing::debug;

use kl_proto::envelope::EncryptedPayload;
use kl_proto::tags::{protocol, Tag, Tags};
use kl_proto::Vault;

use crate::api::Api;
use crate::cache::{Cache, CacheFamily};
use crate::encryption::{EncryptOptions, EncryptionContext};
use crate::error::{Error, Result};
use crate::wallet::Wallet;

#[derive(Default, Clone, Copy)]
pub struct WriteOptions {
    /// Prefix the nonce into the ciphertext instead of emitting it as an
    /// Initialization-Vector tag.
    pub prefix_nonce: bool,
}

#[derive(Default, Clone, Copy)]
pub struct ReadOptions {
    /// Skip decryption and return the stored bytes — used by listing
    /// operations that only need metadata.
    pub skip_decrypt: bool,
}

#[derive(Clone)]
pub struct VaultContext {
    api: Arc<dyn Api>,
    wallet: Arc<dyn Wallet>,
    cache: Cache,
    encryption: EncryptionContext,

    vault_id: Option<String>,
    object_id: Option<String>,
    object_type: Option<String>,
    function: Option<String>,
    group_ref: Option<String>,
    action_ref: Option<String>,
    topic_labels: Vec<String>,
    is_public: bool,
}

impl VaultContext {
    pub fn new(api: Arc<dyn Api>, wallet: Arc<dyn Wallet>, cache: Cache) -> Self {
        let encryption = EncryptionContext::new(wallet.clone());
        Self {
            api,
            wallet,
            cache,
            encryption,
            vault_id: None,
            object_id: None,
            object_type: None,
            function: None,
            group_ref: None,
            action_ref: None,
            topic_labels: Vec::new(),
            is_public: true,
        }
    }

    // ── Local setters ────────────────────────────────────────────────────────

    pub fn set_vault_id(&mut self, vault_id: impl Into<String>) {
        self.vault_id = Some(vault_id.into());
    }

    pub fn set_object_id(&mut self, object_id: impl Into<String>) {
        self.object_id = Some(object_id.into());
    }

    pub fn set_object_type(&mut self, object_type: impl Into<String>) {
        self.object_type = Some(object_type.into());
    }

    pub fn set_function(&mut self, function: impl Into<String>) {
        self.function = Some(function.into());
    }

    pub fn set_group_ref(&mut self, group_ref: Option<String>) {
        self.group_ref = group_ref;
    }

    pub fn set_action_ref(&mut self, action_ref: Option<String>) {
        self.action_ref = action_ref;
    }

    pub fn set_topics(&mut self, labels: Vec<String>) {
        self.topic_labels = labels;
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn vault_id(&self) -> Option<&str> {
        self.vault_id.as_deref()
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    pub fn api(&self) -> &Arc<dyn Api> {
        &self.api
    }

    pub fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.wallet
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn encryption(&self) -> &EncryptionContext {
        &self.encryption
    }

    pub fn encryption_mut(&mut self) -> &mut EncryptionContext {
        &mut self.encryption
    }

    // ── Context establishment ────────────────────────────────────────────────

    /// Load the vault, record its visibility, and — if private — establish
    /// the encryption context from the vault's wrapped keys.
    pub async fn set_vault_context(&mut self, vault_id: &str) -> Result<Vault> {
        let cache_key = format!("vault-context:{vault_id}");
        let vault: Vault = match self.cache.get(CacheFamily::VaultContext, &cache_key) {
            Some(cached) => {
                debug!(vault_id, "vault context served from cache");
                serde_json::from_value(cached)?
            }
            None => {
                let vault = self.api.get_vault(vault_id).await?;
                self.cache
                    .set(CacheFamily::VaultContext, &cache_key, serde_json::to_value(&vault)?);
                vault
            }
        };

        self.vault_id = Some(vault.id.clone());
        self.is_public = vault.public;
        self.encryption.clear();

        if !vault.public {
            self.encryption.set_keys(&vault.keys)?;
            if let Some(public_key) = &vault.public_key {
                self.encryption.set_raw_public_key(public_key);
            }
        }
        debug!(vault_id, public = vault.public, "vault context established");
        Ok(vault)
    }

    // ── Encode / decode primitives ───────────────────────────────────────────

    /// Encrypt a string payload and stamp it with the signer's current
    /// address; pass-through for public vaults.
    pub fn process_write_string(&self, plaintext: &str) -> Result<String> {
        if self.is_public {
            return Ok(plaintext.to_string());
        }
        let payload = self
            .encryption
            .encrypt_raw(plaintext.as_bytes(), EncryptOptions::default())?
            .stamped(&self.wallet.address());
        Ok(serde_json::to_string(&payload)?)
    }

    /// Inverse of [`Self::process_write_string`].
    pub fn process_read_string(&self, data: &str) -> Result<String> {
        if self.is_public {
            return Ok(data.to_string());
        }
        let payload: EncryptedPayload =
            serde_json::from_str(data).map_err(|_| Error::IncorrectEncryptionKey)?;
        let plaintext = self.encryption.decrypt_raw(&payload)?;
        String::from_utf8(plaintext).map_err(|_| Error::IncorrectEncryptionKey)
    }

    /// Encrypt a binary payload. Returns the processed bytes plus the
    /// side-channel encryption tags (sealed data key, signer address, and
    /// the IV unless the nonce is prefixed into the ciphertext).
    pub fn process_write_raw(&self, data: &[u8], options: WriteOptions) -> Result<(Vec<u8>, Tags)> {
        if self.is_public {
            return Ok((data.to_vec(), Tags::new()));
        }
        let payload = self.encryption.encrypt_raw(
            data,
            EncryptOptions { detached_nonce: !options.prefix_nonce },
        )?;

        let mut tags = Tags::new();
        tags.push(Tag::new(protocol::ENCRYPTED_KEY, payload.encrypted_key.to_compact()));
        tags.push(Tag::new(protocol::PUBLIC_ADDRESS, self.wallet.address()));
        if let Some(nonce) = &payload.nonce {
            tags.push(Tag::new(protocol::INITIALIZATION_VECTOR, nonce.clone()));
        }

        let processed = URL_SAFE_NO_PAD
            .decode(&payload.ciphertext)
            .map_err(|_| Error::IncorrectEncryptionKey)?;
        Ok((processed, tags))
    }

    /// Inverse of [`Self::process_write_raw`]; the encryption tags emitted
    /// at write time carry the sealed data key and optional IV.
    pub fn process_read_raw(&self, data: &[u8], tags: &Tags, options: ReadOptions) -> Result<Vec<u8>> {
        if self.is_public || options.skip_decrypt {
            return Ok(data.to_vec());
        }
        let compact = tags
            .value_of(protocol::ENCRYPTED_KEY)
            .ok_or(Error::IncorrectEncryptionKey)?;
        let payload = EncryptedPayload {
            version: kl_proto::envelope::PAYLOAD_VERSION,
            ciphertext: URL_SAFE_NO_PAD.encode(data),
            encrypted_key: kl_crypto::seal::WrappedKey::from_compact(compact)?,
            nonce: tags.value_of(protocol::INITIALIZATION_VECTOR).map(str::to_string),
            public_key: None,
            public_address: tags.value_of(protocol::PUBLIC_ADDRESS).map(str::to_string),
        };
        self.encryption.decrypt_raw(&payload)
    }

    // ── Tag protocol ─────────────────────────────────────────────────────────

    /// The ordered tag set attached to every write. Deterministic for
    /// identical service state and a fixed timestamp.
    pub fn tx_tags_at(&self, timestamp_ms: i64) -> Result<Tags> {
        let function = self
            .function
            .as_deref()
            .ok_or_else(|| Error::BadRequest("Function name not set on context".into()))?;
        let vault_id = self
            .vault_id
            .as_deref()
            .ok_or_else(|| Error::BadRequest("Vault id not set on context".into()))?;

        let mut tags = Tags::new();
        tags.push(Tag::new(protocol::FUNCTION_NAME, function));
        tags.push(Tag::new(protocol::SIGNER_ADDRESS, self.wallet.address()));
        tags.push(Tag::new(protocol::VAULT_ID, vault_id));
        tags.push(Tag::new(protocol::TIMESTAMP, timestamp_ms.to_string()));
        if let Some(object_type) = &self.object_type {
            tags.push(Tag::new(protocol::OBJECT_TYPE, object_type.clone()));
        }
        tags.push(Tag::new(protocol::PUBLIC, self.is_public.to_string()));
        if let Some(group_ref) = &self.group_ref {
            tags.push(Tag::new(protocol::GROUP_REF, group_ref.clone()));
        }
        if let Some(action_ref) = &self.action_ref {
            tags.push(Tag::new(protocol::ACTION_REF, action_ref.clone()));
        }
        for label in &self.topic_labels {
            tags.push_topics(label);
        }
        Ok(tags)
    }

    /// [`Self::tx_tags_at`] stamped with the current millisecond timestamp.
    pub fn tx_tags(&self) -> Result<Tags> {
        self.tx_tags_at(Utc::now().timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{private_vault_for, MemoryApi};
    use crate::wallet::LocalWallet;
    use kl_proto::vault::VaultStatus;

    fn public_vault(id: &str) -> Vault {
        Vault {
            id: id.into(),
            name: Some("open vault".into()),
            public: true,
            status: VaultStatus::Active,
            keys: Vec::new(),
            public_key: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn private_context() -> VaultContext {
        let wallet = Arc::new(LocalWallet::generate());
        let api = Arc::new(MemoryApi::new());
        let (vault, _epoch) = private_vault_for(wallet.as_ref(), "v1");
        api.insert_vault(vault);

        let mut ctx = VaultContext::new(api, wallet, Cache::default());
        ctx.set_vault_context("v1").await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn string_round_trip() {
        let ctx = private_context().await;
        let written = ctx.process_write_string("vault secrets").unwrap();
        assert_ne!(written, "vault secrets");
        assert_eq!(ctx.process_read_string(&written).unwrap(), "vault secrets");
    }

    #[tokio::test]
    async fn write_string_stamps_signer_and_strips_epoch_key() {
        let ctx = private_context().await;
        let written = ctx.process_write_string("stamped").unwrap();
        let payload: EncryptedPayload = serde_json::from_str(&written).unwrap();
        assert_eq!(payload.public_address.as_deref(), Some(ctx.wallet().address().as_str()));
        assert!(payload.public_key.is_none());
    }

    #[tokio::test]
    async fn public_vault_is_passthrough() {
        let api = Arc::new(MemoryApi::new());
        api.insert_vault(public_vault("open"));
        let mut ctx = VaultContext::new(
            api,
            Arc::new(LocalWallet::generate()),
            Cache::default(),
        );
        ctx.set_vault_context("open").await.unwrap();

        assert_eq!(ctx.process_write_string("plain").unwrap(), "plain");
        assert_eq!(ctx.process_read_string("plain").unwrap(), "plain");
        let (data, tags) = ctx.process_write_raw(b"bytes", WriteOptions::default()).unwrap();
        assert_eq!(data, b"bytes");
        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn raw_round_trip_via_encryption_tags() {
        let ctx = private_context().await;
        let (data, tags) = ctx.process_write_raw(b"chunk", WriteOptions::default()).unwrap();
        assert_ne!(data, b"chunk");
        assert!(tags.value_of(protocol::ENCRYPTED_KEY).is_some());
        assert!(tags.value_of(protocol::INITIALIZATION_VECTOR).is_some());

        let read = ctx.process_read_raw(&data, &tags, ReadOptions::default()).unwrap();
        assert_eq!(read, b"chunk");
    }

    #[tokio::test]
    async fn prefixed_nonce_emits_no_iv_tag() {
        let ctx = private_context().await;
        let (data, tags) = ctx
            .process_write_raw(b"chunk", WriteOptions { prefix_nonce: true })
            .unwrap();
        assert!(tags.value_of(protocol::INITIALIZATION_VECTOR).is_none());
        let read = ctx.process_read_raw(&data, &tags, ReadOptions::default()).unwrap();
        assert_eq!(read, b"chunk");
    }

    #[tokio::test]
    async fn skip_decrypt_returns_stored_bytes() {
        let ctx = private_context().await;
        let (data, tags) = ctx.process_write_raw(b"chunk", WriteOptions::default()).unwrap();
        let read = ctx
            .process_read_raw(&data, &tags, ReadOptions { skip_decrypt: true })
            .unwrap();
        assert_eq!(read, data);
    }

    #[tokio::test]
    async fn tx_tags_deterministic_and_nonempty() {
        let mut ctx = private_context().await;
        ctx.set_function("vault:update");
        ctx.set_object_type("Vault");
        ctx.set_topics(vec!["Finance.Reports Q3".into(), "  ".into()]);

        let a = ctx.tx_tags_at(1_700_000_000_000).unwrap();
        let b = ctx.tx_tags_at(1_700_000_000_000).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|t| !t.name.trim().is_empty() && !t.value.trim().is_empty()));
        assert_eq!(a.value_of(protocol::FUNCTION_NAME), Some("vault:update"));
        assert_eq!(a.value_of(protocol::PUBLIC), Some("false"));
    }

    #[tokio::test]
    async fn tx_tags_require_function_and_vault() {
        let ctx = private_context().await;
        // vault id is set, function is not
        assert!(matches!(ctx.tx_tags(), Err(Error::BadRequest(_))));
    }

    #[tokio::test]
    async fn vault_context_uses_cache_until_bust() {
        let wallet = Arc::new(LocalWallet::generate());
        let api = Arc::new(MemoryApi::new());
        let (vault, _epoch) = private_vault_for(wallet.as_ref(), "v1");
        api.insert_vault(vault);

        let cache = Cache::new(true);
        let mut ctx = VaultContext::new(api.clone(), wallet, cache.clone());

        ctx.set_vault_context("v1").await.unwrap();
        ctx.set_vault_context("v1").await.unwrap();
        assert_eq!(api.vault_calls(), 1);

        cache.invalidate(CacheFamily::VaultContext);
        ctx.set_vault_context("v1").await.unwrap();
        assert_eq!(api.vault_calls(), 2);
    }

    #[tokio::test]
    async fn disabled_cache_always_refetches() {
        let wallet = Arc::new(LocalWallet::generate());
        let api = Arc::new(MemoryApi::new());
        let (vault, _epoch) = private_vault_for(wallet.as_ref(), "v1");
        api.insert_vault(vault);

        let mut ctx = VaultContext::new(api.clone(), wallet, Cache::default());
        ctx.set_vault_context("v1").await.unwrap();
        ctx.set_vault_context("v1").await.unwrap();
        assert_eq!(api.vault_calls(), 2);
    }
}
