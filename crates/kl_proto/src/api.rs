//! Request/response types shared with the API collaborator.
//! These map directly to JSON bodies on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options for list calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ListOptions {
    pub fn with_token(token: Option<String>) -> Self {
        Self { next_token: token, limit: None }
    }
}

/// One page of a list call. A `next_token` of the literal string "null" is
/// a backend quirk meaning "no more pages" — use [`Page::continuation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// The continuation token, with the `"null"` sentinel and empty strings
    /// normalised to absence.
    pub fn continuation(&self) -> Option<String> {
        normalize_token(self.next_token.as_deref())
    }
}

/// Normalise a backend continuation token.
pub fn normalize_token(token: Option<&str>) -> Option<String> {
    match token {
        None => None,
        Some("null") | Some("") => None,
        Some(t) => Some(t.to_string()),
    }
}

/// Publicly resolvable user data, looked up by email at invite time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublicData {
    pub address: String,
    /// Base64url Ed25519 signing public key.
    pub signing_public_key: String,
    /// Base64url X25519 encryption public key.
    pub encryption_public_key: String,
}

/// Result of posting a contract transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractTx {
    pub id: String,
    /// The object state as the contract sees it after the write.
    pub object: Value,
}
