//! Membership record and its status state machine.
//!
//! A membership is a principal's relationship to one vault: role, status,
//! and the key-epoch records wrapped for that member. Status transitions
//! are monotonic and realised as new appended writes — never in-place
//! edits. Terminal states (Rejected, Revoked, Left) admit no further
//! transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::EncryptedKeyRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: String,
    pub vault_id: String,
    /// Member address derived from their public signing key.
    pub address: String,
    pub role: Role,
    pub status: MembershipStatus,
    /// Key-epoch records wrapped for this member. None for public vaults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<EncryptedKeyRecord>>,
    /// Member's X25519 encryption public key (base64url), recorded at invite
    /// time so rotation can re-wrap without a directory lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_public_key: Option<String>,
    /// Encrypted copy of the member's signing public key, used during
    /// confirmation to check the member is who the inviter thinks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_signing_public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Contributor,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    Pending,
    Invited,
    Accepted,
    Rejected,
    Revoked,
    Left,
}

impl MembershipStatus {
    /// Active members hold (and on rotation receive) the current key-epoch:
    /// accepted members plus invitees who have not yet answered.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Invited | Self::Accepted)
    }

    /// Terminal states admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Revoked | Self::Left)
    }

    /// Whether `self → next` is a legal appended transition.
    pub fn can_transition_to(self, next: Self) -> bool {
        use MembershipStatus::*;
        match (self, next) {
            (Pending | Invited, Accepted) => true,
            (Pending | Invited, Rejected) => true,
            (Accepted, Revoked) => true,
            (Accepted, Left) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid membership transition {from:?} -> {to:?}")]
    Invalid { from: MembershipStatus, to: MembershipStatus },

    #[error("Cannot resend an invite for a membership in status {status:?}")]
    NotResendable { status: MembershipStatus },
}

impl Membership {
    /// Guard a status change; the change itself is a new write.
    pub fn ensure_can_transition_to(&self, next: MembershipStatus) -> Result<(), TransitionError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(TransitionError::Invalid { from: self.status, to: next })
        }
    }

    /// Resending an invite is only valid while the invite is still open.
    pub fn ensure_resendable(&self) -> Result<(), TransitionError> {
        match self.status {
            MembershipStatus::Pending | MembershipStatus::Invited => Ok(()),
            status => Err(TransitionError::NotResendable { status }),
        }
    }
}
