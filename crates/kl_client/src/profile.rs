//! User profile operations.
//!
//! The profile is encrypted independently of any vault, under the wallet's
//! own keypair. Updates fan out a reference write to every active
//! membership the signer holds, so vault views can render the profile
//! without a separate lookup.

use chrono::Utc;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use kl_proto::api::ListOptions;
use kl_proto::envelope::EncryptedPayload;
use kl_proto::tags::{protocol, Tag, Tags};

use crate::cache::CacheFamily;
use crate::encryption::{EncryptOptions, EncryptionContext};
use crate::error::Result;
use crate::membership::functions;
use crate::paginate::paginate;
use crate::Client;

pub const PROFILE_UPDATE_FN: &str = "profile:update";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Reference to a previously uploaded avatar blob.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_ref: Option<String>,
}

impl Client {
    /// The signer's decrypted profile, if one is stored.
    pub async fn get_profile(&self) -> Result<Option<Profile>> {
        let address = self.wallet.address();
        let cache_key = format!("profile:{address}");
        if let Some(cached) = self.cache.get(CacheFamily::Profile, &cache_key) {
            return Ok(Some(serde_json::from_value(cached)?));
        }

        let Some(stored) = self.api.get_profile(&address).await? else {
            return Ok(None);
        };
        let payload: EncryptedPayload = serde_json::from_value(stored)?;
        let owner = EncryptionContext::for_owner(self.wallet.clone());
        let plaintext = owner.decrypt_raw(&payload)?;
        let profile: Profile = serde_json::from_slice(&plaintext)?;

        self.cache
            .set(CacheFamily::Profile, &cache_key, serde_json::to_value(&profile)?);
        Ok(Some(profile))
    }

    /// Encrypt and store the profile, then propagate its reference to every
    /// active membership. Returns the uploaded profile's transaction id.
    pub async fn update_profile(&self, profile: &Profile) -> Result<String> {
        let address = self.wallet.address();
        let owner = EncryptionContext::for_owner(self.wallet.clone());
        let payload = owner
            .encrypt_raw(&serde_json::to_vec(profile)?, EncryptOptions::default())?
            .stamped(&address);

        let mut tags = Tags::new();
        tags.push(Tag::new(protocol::FUNCTION_NAME, PROFILE_UPDATE_FN));
        tags.push(Tag::new(protocol::SIGNER_ADDRESS, address.clone()));
        tags.push(Tag::new(
            protocol::TIMESTAMP,
            Utc::now().timestamp_millis().to_string(),
        ));
        tags.push(Tag::new(protocol::OBJECT_TYPE, "Profile"));

        let data_ref = self
            .api
            .upload_state(serde_json::to_value(&payload)?, &tags)
            .await?;

        let api = self.api.clone();
        let memberships = paginate(
            move |opts| {
                let api = api.clone();
                async move { api.get_memberships(&opts).await }
            },
            ListOptions::default(),
        )
        .await?;

        let fan_out = memberships
            .into_iter()
            .filter(|m| m.status.is_active())
            .map(|m| {
                let api = self.api.clone();
                let data_ref = data_ref.clone();
                let address = address.clone();
                async move {
                    let mut tags = Tags::new();
                    tags.push(Tag::new(protocol::FUNCTION_NAME, functions::PROFILE_UPDATE));
                    tags.push(Tag::new(protocol::SIGNER_ADDRESS, address));
                    tags.push(Tag::new(
                        protocol::TIMESTAMP,
                        Utc::now().timestamp_millis().to_string(),
                    ));
                    tags.push(Tag::new(protocol::OBJECT_TYPE, "Membership"));
                    tags.push(Tag::new(protocol::VAULT_ID, m.vault_id.clone()));
                    tags.push(Tag::new(protocol::MEMBERSHIP_ID, m.id.clone()));
                    let input = json!({
                        "function": functions::PROFILE_UPDATE,
                        "membershipId": m.id,
                        "data": data_ref,
                    });
                    api.post_contract_transaction(&m.vault_id, input, &tags).await
                }
            });
        let posted = try_join_all(fan_out).await?;
        debug!(memberships = posted.len(), "profile reference propagated");

        self.cache.invalidate(CacheFamily::Profile);
        Ok(data_ref)
    }
}
