//! Wallet/signer boundary.
//!
//! The core uses the wallet for address derivation, tag stamping, and the
//! X25519 secret that unwraps key-epoch records. Signing adapters (hardware
//! wallets, remote signers) implement this trait; [`LocalWallet`] wraps an
//! in-memory Ed25519 keypair.

use x25519_dalek::StaticSecret;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use kl_crypto::identity::SigningKeyPair;

pub trait Wallet: Send + Sync {
    /// Stable signer address (base64url BLAKE3 of the signing public key).
    fn address(&self) -> String;

    /// Base64url Ed25519 signing public key.
    fn signing_public_key(&self) -> String;

    /// Base64url X25519 encryption public key.
    fn encryption_public_key(&self) -> String;

    /// X25519 secret used to unwrap key-epoch records sealed to this wallet.
    fn encryption_secret(&self) -> StaticSecret;

    /// Raw Ed25519 signature over `msg`.
    fn sign(&self, msg: &[u8]) -> Vec<u8>;
}

/// Wallet backed by an in-memory signing keypair.
pub struct LocalWallet {
    identity: SigningKeyPair,
}

impl LocalWallet {
    pub fn generate() -> Self {
        Self { identity: SigningKeyPair::generate() }
    }

    pub fn from_signing_key(identity: SigningKeyPair) -> Self {
        Self { identity }
    }
}

impl Wallet for LocalWallet {
    fn address(&self) -> String {
        self.identity.address()
    }

    fn signing_public_key(&self) -> String {
        self.identity.public_b64()
    }

    fn encryption_public_key(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.identity.encryption_public_key().as_bytes())
    }

    fn encryption_secret(&self) -> StaticSecret {
        self.identity.encryption_secret()
    }

    fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.identity.sign(msg)
    }
}
