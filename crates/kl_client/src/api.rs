//! API collaborator boundary.
//!
//! The transport behind this trait is out of scope; the core only relies
//! on the contract below. List calls return [`Page`]s whose `next_token`
//! may be the literal string `"null"` — callers must go through
//! [`Page::continuation`] (the pagination helper does).

use async_trait::async_trait;
use serde_json::Value;

use kl_proto::api::{ContractTx, ListOptions, Page, UserPublicData};
use kl_proto::{Membership, Tags, Vault};

use crate::error::Result;

#[async_trait]
pub trait Api: Send + Sync {
    async fn get_vault(&self, id: &str) -> Result<Vault>;

    async fn get_membership(&self, id: &str, vault_id: Option<&str>) -> Result<Membership>;

    async fn get_memberships_by_vault_id(
        &self,
        vault_id: &str,
        options: &ListOptions,
    ) -> Result<Page<Membership>>;

    /// All memberships of the calling principal, across vaults.
    async fn get_memberships(&self, options: &ListOptions) -> Result<Page<Membership>>;

    async fn get_user_public_data(&self, email: &str) -> Result<UserPublicData>;

    /// Stored profile blob for an address, if any.
    async fn get_profile(&self, address: &str) -> Result<Option<Value>>;

    /// Submit a tagged contract write. The backing store is append-only;
    /// the returned object is the post-write state.
    async fn post_contract_transaction(
        &self,
        vault_id: &str,
        input: Value,
        tags: &Tags,
    ) -> Result<ContractTx>;

    /// Upload a state object, returning its transaction id.
    async fn upload_state(&self, state: Value, tags: &Tags) -> Result<String>;

    /// Upload opaque bytes, returning their transaction id.
    async fn upload_data(&self, data: Vec<u8>, tags: &Tags) -> Result<String>;

    /// Resolve a data reference to its stored state.
    async fn get_node_state(&self, data_ref: &str) -> Result<Value>;
}
