//! kl_proto — Wire types and serialisation for Keeplock Shared Vaults
//!
//! All on-wire types are serialised to JSON and versioned to allow future
//! format changes without breaking compatibility. The backing store is
//! append-only: records are never edited in place, every mutation is a new
//! tagged write.
//!
//! # Modules
//! - `vault`      — Vault record with its key-epoch history
//! - `membership` — Membership record, roles, and the status state machine
//! - `keys`       — Per-member wrapped key records
//! - `envelope`   — Encrypted payload shapes (what the store sees)
//! - `tags`       — Write-protocol tag set
//! - `merge`      — Deep state merge with array concatenation
//! - `api`        — List/page types shared with the API collaborator

pub mod api;
pub mod envelope;
pub mod keys;
pub mod membership;
pub mod merge;
pub mod tags;
pub mod vault;

pub use envelope::EncryptedPayload;
pub use keys::EncryptedKeyRecord;
pub use membership::{Membership, MembershipStatus, Role};
pub use merge::merge_state;
pub use tags::{Tag, Tags};
pub use vault::Vault;
