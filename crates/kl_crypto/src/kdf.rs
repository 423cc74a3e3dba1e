//! Key derivation functions
//!
//! `hkdf_expand` — HKDF-SHA256, the single KDF used in this crate.
//! `derive_seal_key` — derives the AEAD key for a sealed box from the
//!   X25519 shared secret, binding both public halves into the info.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::CryptoError;

const SEAL_SALT: &[u8] = b"kl-seal-v1";

/// Expand `ikm` + `info` into `output.len()` bytes of key material.
///
/// `salt` may be empty (HKDF will use a zeroed salt).
pub fn hkdf_expand(
    ikm: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    output: &mut [u8],
) -> Result<(), CryptoError> {
    let hk = Hkdf::<Sha256>::new(salt, ikm);
    hk.expand(info, output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
}

/// Derive the 32-byte sealed-box AEAD key.
///
/// info = ephemeral_pub || recipient_pub so a wrap for one recipient can
/// never authenticate under another recipient's derivation.
pub fn derive_seal_key(
    shared_secret: &[u8],
    ephemeral_pub: &[u8; 32],
    recipient_pub: &[u8; 32],
) -> Result<[u8; 32], CryptoError> {
    let mut info = Vec::with_capacity(64);
    info.extend_from_slice(ephemeral_pub);
    info.extend_from_slice(recipient_pub);

    let mut key = [0u8; 32];
    hkdf_expand(shared_secret, Some(SEAL_SALT), &info, &mut key)?;
    Ok(key)
}
