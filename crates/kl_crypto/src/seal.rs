//! X25519 sealed-box key wrapping.
//!
//! A *wrap* transports one key-epoch secret to exactly one recipient:
//!
//!   eph        = fresh X25519 keypair (one per wrap)
//!   shared     = DH(eph_secret, recipient_pub)
//!   aead_key   = HKDF-SHA256(shared, salt="kl-seal-v1", info=eph_pub||recipient_pub)
//!   ciphertext = XChaCha20-Poly1305(aead_key, secret, aad="kl-key-wrap")
//!
//! The wrapped record carries only the ephemeral public key and the
//! ciphertext; the recipient's public key never needs to travel with it.
//! Unwrapping with the wrong recipient secret fails authentication.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroizing;

use crate::{aead, error::CryptoError, kdf};

const WRAP_AAD: &[u8] = b"kl-key-wrap";

// ── Epoch keypair ─────────────────────────────────────────────────────────────

/// One key-epoch: an X25519 keypair. The secret is what gets wrapped per
/// member; the public half wraps the per-payload data keys of that epoch.
pub struct EncryptionKeyPair {
    secret: StaticSecret,
    public: X25519Public,
}

impl EncryptionKeyPair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519Public::from(&secret);
        Self { secret, public }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("Epoch secret must be 32 bytes".into()))?;
        let secret = StaticSecret::from(arr);
        let public = X25519Public::from(&secret);
        Ok(Self { secret, public })
    }

    pub fn secret(&self) -> &StaticSecret {
        &self.secret
    }

    pub fn public(&self) -> &X25519Public {
        &self.public
    }

    pub fn public_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.public.as_bytes())
    }
}

// ── Wrapped key record ────────────────────────────────────────────────────────

/// A secret sealed to one recipient. Base64url fields on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    /// Ephemeral X25519 public key used for this wrap.
    pub ephemeral_public_key: String,
    /// AEAD ciphertext of the wrapped secret.
    pub ciphertext: String,
}

impl WrappedKey {
    /// Compact single-string form for tag values: `eph_pub.ciphertext`.
    /// Base64url never contains '.', so the join is unambiguous.
    pub fn to_compact(&self) -> String {
        format!("{}.{}", self.ephemeral_public_key, self.ciphertext)
    }

    pub fn from_compact(s: &str) -> Result<Self, CryptoError> {
        let (eph, ct) = s
            .split_once('.')
            .ok_or_else(|| CryptoError::InvalidKey("Malformed compact wrapped key".into()))?;
        Ok(Self { ephemeral_public_key: eph.to_string(), ciphertext: ct.to_string() })
    }
}

/// Seal `secret` for the holder of `recipient_pub`.
pub fn wrap_for(recipient_pub: &X25519Public, secret: &[u8]) -> Result<WrappedKey, CryptoError> {
    let eph_secret = StaticSecret::random_from_rng(OsRng);
    let eph_public = X25519Public::from(&eph_secret);

    let shared = eph_secret.diffie_hellman(recipient_pub);
    let key = kdf::derive_seal_key(shared.as_bytes(), eph_public.as_bytes(), recipient_pub.as_bytes())?;

    let ciphertext = aead::encrypt(&key, secret, WRAP_AAD)?;

    Ok(WrappedKey {
        ephemeral_public_key: URL_SAFE_NO_PAD.encode(eph_public.as_bytes()),
        ciphertext: URL_SAFE_NO_PAD.encode(&ciphertext),
    })
}

/// Open a sealed record with the recipient's secret.
pub fn unwrap_with(
    recipient_secret: &StaticSecret,
    wrapped: &WrappedKey,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let eph_bytes = URL_SAFE_NO_PAD.decode(&wrapped.ephemeral_public_key)?;
    let eph_arr: [u8; 32] = eph_bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidKey("Ephemeral key must be 32 bytes".into()))?;
    let eph_public = X25519Public::from(eph_arr);

    let recipient_pub = X25519Public::from(recipient_secret);
    let shared = recipient_secret.diffie_hellman(&eph_public);
    let key = kdf::derive_seal_key(shared.as_bytes(), eph_public.as_bytes(), recipient_pub.as_bytes())?;

    let ciphertext = URL_SAFE_NO_PAD.decode(&wrapped.ciphertext)?;
    aead::decrypt(&key, &ciphertext, WRAP_AAD).map_err(|_| CryptoError::KeyUnwrap)
}

/// Decode a base64url X25519 public key.
pub fn public_key_from_b64(b64: &str) -> Result<X25519Public, CryptoError> {
    let bytes = URL_SAFE_NO_PAD.decode(b64)?;
    let arr: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidKey("X25519 public key must be 32 bytes".into()))?;
    Ok(X25519Public::from(arr))
}
