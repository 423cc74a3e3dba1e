//! Membership context service.
//!
//! Specialises the vault context with membership key preparation and the
//! multi-member key-rotation algorithm. Rotation is the security-critical
//! path: it MUST run on every access revocation, so the removed member
//! cannot decrypt anything written after it, while every remaining active
//! member receives a usable wrapped copy of the new epoch.
//!
//! Status transitions are appended writes, never in-place edits; the
//! guards live on the `Membership` record itself.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use kl_crypto::seal::{self, EncryptionKeyPair};
use kl_proto::api::{ContractTx, ListOptions};
use kl_proto::merge::merge_state;
use kl_proto::tags::{protocol, Tag, Tags};
use kl_proto::{EncryptedKeyRecord, Membership, MembershipStatus, Role};

use crate::api::Api;
use crate::cache::{Cache, CacheFamily};
use crate::context::VaultContext;
use crate::error::{Error, Result};
use crate::paginate::paginate;
use crate::wallet::Wallet;

/// Contract function names for membership writes.
pub mod functions {
    pub const INVITE: &str = "membership:invite";
    pub const INVITE_RESEND: &str = "membership:invite-resend";
    pub const ACCEPT: &str = "membership:accept";
    pub const CONFIRM: &str = "membership:confirm";
    pub const REJECT: &str = "membership:reject";
    pub const LEAVE: &str = "membership:leave";
    pub const REVOKE: &str = "membership:revoke";
    pub const CHANGE_ROLE: &str = "membership:change-role";
    pub const PROFILE_UPDATE: &str = "membership:profile-update";
}

const OBJECT_TYPE: &str = "Membership";

/// Result of a key rotation: one record set per surviving member, plus the
/// new epoch keypair so the caller can extend the vault's own key history.
pub struct Rotation {
    pub member_keys: HashMap<String, Vec<EncryptedKeyRecord>>,
    pub keypair: EncryptionKeyPair,
}

pub struct MembershipContext {
    inner: VaultContext,
    membership_id: Option<String>,
}

impl MembershipContext {
    pub fn new(api: Arc<dyn Api>, wallet: Arc<dyn Wallet>, cache: Cache) -> Self {
        Self { inner: VaultContext::new(api, wallet, cache), membership_id: None }
    }

    /// Construct from an existing context, sharing its collaborators and
    /// copying its established state.
    pub fn from_vault_context(ctx: &VaultContext) -> Self {
        Self { inner: ctx.clone(), membership_id: None }
    }

    pub fn vault(&self) -> &VaultContext {
        &self.inner
    }

    pub fn vault_mut(&mut self) -> &mut VaultContext {
        &mut self.inner
    }

    pub fn set_membership_id(&mut self, membership_id: impl Into<String>) {
        self.membership_id = Some(membership_id.into());
    }

    pub fn membership_id(&self) -> Option<&str> {
        self.membership_id.as_deref()
    }

    pub async fn set_vault_context(&mut self, vault_id: &str) -> Result<()> {
        self.inner.set_vault_context(vault_id).await?;
        Ok(())
    }

    /// Resolve a membership to its owning vault, establish that vault's
    /// context, then narrow the encryption context to the membership's own
    /// recorded keys — a membership may hold an earlier key-epoch set than
    /// the vault's aggregate.
    pub async fn set_vault_context_from_membership_id(
        &mut self,
        membership_id: &str,
        vault_id: Option<&str>,
    ) -> Result<Membership> {
        let membership = self.load_membership(membership_id, vault_id).await?;
        self.inner.set_vault_context(&membership.vault_id).await?;

        if !self.inner.is_public() {
            if let Some(keys) = &membership.keys {
                self.inner.encryption_mut().set_keys(keys)?;
            }
        }
        self.membership_id = Some(membership.id.clone());
        debug!(membership_id, vault_id = %membership.vault_id, "membership context established");
        Ok(membership)
    }

    /// Base tags extended with the membership id.
    pub fn tx_tags(&self) -> Result<Tags> {
        let mut tags = self.inner.tx_tags()?;
        if let Some(membership_id) = &self.membership_id {
            tags.push(Tag::new(protocol::MEMBERSHIP_ID, membership_id.clone()));
        }
        Ok(tags)
    }

    // ── Key preparation & rotation ───────────────────────────────────────────

    /// Wrap the held key-epochs for a new recipient. None for public vaults;
    /// the recipient's own public key is stripped from the records (they
    /// only travel one direction).
    pub fn prepare_member_keys(
        &self,
        member_public_key_b64: &str,
    ) -> Result<Option<Vec<EncryptedKeyRecord>>> {
        if self.inner.is_public() {
            return Ok(None);
        }
        let records = self
            .inner
            .encryption()
            .wrap_epochs_for(member_public_key_b64)?
            .into_iter()
            .map(EncryptedKeyRecord::stripped)
            .collect();
        Ok(Some(records))
    }

    /// Issue a new key-epoch and wrap it for every member in the map.
    /// The caller supplies only the members that remain active — the
    /// member being removed must not appear. Iteration order does not
    /// affect correctness, only tag ordering.
    pub async fn rotate_member_keys(
        &self,
        member_public_keys: &HashMap<String, String>,
    ) -> Result<Rotation> {
        let keypair = EncryptionKeyPair::generate();
        let epoch_public = keypair.public_b64();
        let epoch_secret = keypair.secret().to_bytes();

        let wraps = member_public_keys.iter().map(|(member_id, public_key_b64)| {
            let epoch_public = epoch_public.clone();
            async move {
                let recipient = seal::public_key_from_b64(public_key_b64)?;
                let wrapped = seal::wrap_for(&recipient, &epoch_secret)?;
                Ok::<_, Error>((
                    member_id.clone(),
                    vec![EncryptedKeyRecord {
                        encrypted_private_key: wrapped,
                        public_key: epoch_public,
                        member_public_key: None,
                    }],
                ))
            }
        });

        let member_keys: HashMap<_, _> = try_join_all(wraps).await?.into_iter().collect();
        info!(members = member_keys.len(), "issued new vault key-epoch");
        Ok(Rotation { member_keys, keypair })
    }

    // ── Membership operations ────────────────────────────────────────────────

    /// Invite a user (resolved by email) to the current vault.
    pub async fn invite(&mut self, vault_id: &str, email: &str, role: Role) -> Result<ContractTx> {
        self.set_vault_context(vault_id).await?;
        let user = self.inner.api().get_user_public_data(email).await?;
        let keys = self.prepare_member_keys(&user.encryption_public_key)?;
        // Recorded on the membership so rotation can re-wrap without a
        // directory lookup, and so confirmation can check the signing key
        // against the address.
        let encrypted_signing_public_key =
            self.inner.process_write_string(&user.signing_public_key)?;

        self.inner.set_function(functions::INVITE);
        self.inner.set_object_type(OBJECT_TYPE);
        let tags = self.tx_tags()?;

        let input = json!({
            "function": functions::INVITE,
            "address": user.address,
            "role": role,
            "keys": keys,
            "memberPublicKey": user.encryption_public_key,
            "encryptedSigningPublicKey": encrypted_signing_public_key,
            "email": email,
        });
        let tx = self.inner.api().post_contract_transaction(vault_id, input, &tags).await?;
        self.inner.cache().invalidate(CacheFamily::Membership);
        Ok(tx)
    }

    /// Resend a pending invite. Only valid while the invite is still open.
    pub async fn resend_invite(&mut self, membership_id: &str) -> Result<ContractTx> {
        let membership = self.load_membership(membership_id, None).await?;
        if let Err(err) = membership.ensure_resendable() {
            warn!(membership_id, status = ?membership.status, "invite resend rejected");
            return Err(err.into());
        }
        self.inner.set_vault_context(&membership.vault_id).await?;
        self.membership_id = Some(membership.id.clone());
        self.inner.set_function(functions::INVITE_RESEND);
        self.inner.set_object_type(OBJECT_TYPE);
        let tags = self.tx_tags()?;

        let input = json!({
            "function": functions::INVITE_RESEND,
            "membershipId": membership_id,
        });
        let tx = self
            .inner
            .api()
            .post_contract_transaction(&membership.vault_id, input, &tags)
            .await?;
        self.inner.cache().invalidate(CacheFamily::Membership);
        Ok(tx)
    }

    /// Accept an open invite.
    pub async fn accept(&mut self, membership_id: &str) -> Result<ContractTx> {
        let membership = self
            .set_vault_context_from_membership_id(membership_id, None)
            .await?;
        membership.ensure_can_transition_to(MembershipStatus::Accepted)?;
        self.post_membership_update(
            &membership,
            functions::ACCEPT,
            json!({"status": MembershipStatus::Accepted}),
        )
        .await
    }

    /// Confirm an accepted member: decrypt the stored copy of their signing
    /// key and check it derives the recorded address.
    pub async fn confirm(&mut self, membership_id: &str) -> Result<ContractTx> {
        let membership = self
            .set_vault_context_from_membership_id(membership_id, None)
            .await?;
        let encrypted = membership
            .encrypted_signing_public_key
            .as_deref()
            .ok_or_else(|| Error::NotFound(format!("No signing key recorded on {membership_id}")))?;

        let signing_key_b64 = self.inner.process_read_string(encrypted)?;
        let derived = kl_crypto::identity::address_from_b64(&signing_key_b64)?;
        if derived != membership.address {
            return Err(Error::BadRequest(
                "Member signing key does not match the recorded address".into(),
            ));
        }
        self.post_membership_update(&membership, functions::CONFIRM, json!({}))
            .await
    }

    /// Reject an open invite.
    pub async fn reject(&mut self, membership_id: &str) -> Result<ContractTx> {
        let membership = self
            .set_vault_context_from_membership_id(membership_id, None)
            .await?;
        membership.ensure_can_transition_to(MembershipStatus::Rejected)?;
        self.post_membership_update(
            &membership,
            functions::REJECT,
            json!({"status": MembershipStatus::Rejected}),
        )
        .await
    }

    /// Leave a vault voluntarily. No rotation: the leaver keeps the history
    /// they could already read, and writes nothing new.
    pub async fn leave(&mut self, membership_id: &str) -> Result<ContractTx> {
        let membership = self
            .set_vault_context_from_membership_id(membership_id, None)
            .await?;
        membership.ensure_can_transition_to(MembershipStatus::Left)?;
        self.post_membership_update(
            &membership,
            functions::LEAVE,
            json!({"status": MembershipStatus::Left}),
        )
        .await
    }

    /// Change an active member's role.
    pub async fn change_role(&mut self, membership_id: &str, role: Role) -> Result<ContractTx> {
        let membership = self
            .set_vault_context_from_membership_id(membership_id, None)
            .await?;
        if membership.status.is_terminal() {
            return Err(Error::BadRequest(format!(
                "Cannot change role of a membership in status {:?}",
                membership.status
            )));
        }
        self.post_membership_update(&membership, functions::CHANGE_ROLE, json!({"role": role}))
            .await
    }

    /// Revoke a member's access. For private vaults this rotates the vault
    /// key: a fresh epoch is wrapped for every remaining active member, so
    /// nothing written afterwards is readable by the revoked member.
    pub async fn revoke(&mut self, membership_id: &str) -> Result<ContractTx> {
        let membership = self.load_membership(membership_id, None).await?;
        membership.ensure_can_transition_to(MembershipStatus::Revoked)?;

        let vault_id = membership.vault_id.clone();
        self.inner.set_vault_context(&vault_id).await?;
        self.membership_id = Some(membership.id.clone());

        let mut input = json!({
            "function": functions::REVOKE,
            "membershipId": membership_id,
        });

        if !self.inner.is_public() {
            let api = self.inner.api().clone();
            let list_vault_id = vault_id.clone();
            let all = paginate(
                move |opts| {
                    let api = api.clone();
                    let vault_id = list_vault_id.clone();
                    async move { api.get_memberships_by_vault_id(&vault_id, &opts).await }
                },
                ListOptions::default(),
            )
            .await?;

            let mut member_public_keys = HashMap::new();
            for m in all
                .iter()
                .filter(|m| m.status.is_active() && m.id != membership_id)
            {
                let public_key = m.member_public_key.clone().ok_or_else(|| {
                    Error::NotFound(format!("No encryption key recorded on membership {}", m.id))
                })?;
                member_public_keys.insert(m.id.clone(), public_key);
            }

            let rotation = self.rotate_member_keys(&member_public_keys).await?;
            input["keys"] = serde_json::to_value(&rotation.member_keys)?;
            input["publicKey"] = Value::String(rotation.keypair.public_b64());
        }

        self.inner.set_function(functions::REVOKE);
        self.inner.set_object_type(OBJECT_TYPE);
        let tags = self.tx_tags()?;

        let tx = self
            .inner
            .api()
            .post_contract_transaction(&vault_id, input, &tags)
            .await?;
        // The vault's key history changed along with the membership set.
        self.inner.cache().invalidate(CacheFamily::Membership);
        self.inner.cache().invalidate(CacheFamily::VaultContext);
        Ok(tx)
    }

    // ── Internals ────────────────────────────────────────────────────────────

    async fn load_membership(
        &self,
        membership_id: &str,
        vault_id: Option<&str>,
    ) -> Result<Membership> {
        let cache_key = format!("membership:{membership_id}");
        if let Some(cached) = self.inner.cache().get(CacheFamily::Membership, &cache_key) {
            return Ok(serde_json::from_value(cached)?);
        }
        let membership = self.inner.api().get_membership(membership_id, vault_id).await?;
        self.inner
            .cache()
            .set(CacheFamily::Membership, &cache_key, serde_json::to_value(&membership)?);
        Ok(membership)
    }

    /// Merge a partial update over the last known state, re-encrypt the
    /// whole object, upload it, and post the contract write.
    async fn post_membership_update(
        &mut self,
        membership: &Membership,
        function: &str,
        updates: Value,
    ) -> Result<ContractTx> {
        self.inner.set_function(function);
        self.inner.set_object_type(OBJECT_TYPE);
        self.inner.set_object_id(membership.id.clone());
        let tags = self.tx_tags()?;

        let current = serde_json::to_value(membership)?;
        let merged = merge_state(&current, &updates);
        let state = self.inner.process_write_string(&serde_json::to_string(&merged)?)?;
        let data_ref = self
            .inner
            .api()
            .upload_state(Value::String(state), &tags)
            .await?;

        let input = json!({
            "function": function,
            "membershipId": membership.id,
            "data": data_ref,
        });
        let tx = self
            .inner
            .api()
            .post_contract_transaction(&membership.vault_id, input, &tags)
            .await?;
        self.inner.cache().invalidate(CacheFamily::Membership);
        Ok(tx)
    }
}
