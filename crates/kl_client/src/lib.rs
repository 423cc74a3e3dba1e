//! kl_client — Vault context and key-rotation core for Keeplock Shared Vaults
//!
//! End-to-end encrypted shared vaults over an append-only backing store.
//! Vault contents are encrypted under per-vault key-epochs; every member
//! holds the epoch secrets wrapped to their own keypair, and revoking a
//! member issues a fresh epoch for everyone who remains. The store and
//! transport sit behind the [`api::Api`] trait; signing identity behind
//! [`wallet::Wallet`].
//!
//! Entry points:
//! - [`Client`]            — profile operations and context construction
//! - [`VaultContext`]      — per-vault encode/decode and the write-tag protocol
//! - [`MembershipContext`] — invite/accept/revoke lifecycle and key rotation

pub mod api;
pub mod cache;
pub mod context;
pub mod encryption;
pub mod error;
pub mod membership;
pub mod paginate;
pub mod profile;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

pub use cache::{Cache, CacheFamily};
pub use context::{ReadOptions, VaultContext, WriteOptions};
pub use encryption::{EncryptOptions, EncryptionContext};
pub use error::{Error, Result};
pub use membership::{MembershipContext, Rotation};
pub use profile::Profile;
pub use wallet::{LocalWallet, Wallet};

#[derive(Debug, Clone, Copy, Default)]
pub struct ClientConfig {
    /// Memoize idempotent reads. Off by default.
    pub cache_enabled: bool,
}

/// Client facade: owns the shared collaborators and hands out contexts.
pub struct Client {
    pub(crate) api: Arc<dyn api::Api>,
    pub(crate) wallet: Arc<dyn Wallet>,
    pub(crate) cache: Cache,
}

impl Client {
    pub fn new(api: Arc<dyn api::Api>, wallet: Arc<dyn Wallet>, config: ClientConfig) -> Self {
        Self::from_parts(api, wallet, Cache::new(config.cache_enabled))
    }

    /// Assemble from pre-built collaborators, sharing an existing cache.
    pub fn from_parts(api: Arc<dyn api::Api>, wallet: Arc<dyn Wallet>, cache: Cache) -> Self {
        Self { api, wallet, cache }
    }

    pub fn vault_context(&self) -> VaultContext {
        VaultContext::new(self.api.clone(), self.wallet.clone(), self.cache.clone())
    }

    pub fn membership_context(&self) -> MembershipContext {
        MembershipContext::new(self.api.clone(), self.wallet.clone(), self.cache.clone())
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.wallet
    }
}
