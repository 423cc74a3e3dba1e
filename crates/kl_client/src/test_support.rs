//! Shared test fixtures: an in-memory [`Api`] and record builders.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use kl_crypto::seal::{self, EncryptionKeyPair};
use kl_proto::api::{ContractTx, ListOptions, Page, UserPublicData};
use kl_proto::vault::VaultStatus;
use kl_proto::{EncryptedKeyRecord, Membership, MembershipStatus, Role, Tags, Vault};

use crate::api::Api;
use crate::error::{Error, Result};
use crate::wallet::{LocalWallet, Wallet};

/// A private vault whose single key-epoch is wrapped for `wallet`.
pub fn private_vault_for(wallet: &LocalWallet, id: &str) -> (Vault, EncryptionKeyPair) {
    let epoch = EncryptionKeyPair::generate();
    let recipient = seal::public_key_from_b64(&wallet.encryption_public_key()).unwrap();
    let vault = Vault {
        id: id.into(),
        name: Some("test vault".into()),
        public: false,
        status: VaultStatus::Active,
        keys: vec![EncryptedKeyRecord {
            encrypted_private_key: seal::wrap_for(&recipient, epoch.secret().as_bytes()).unwrap(),
            public_key: epoch.public_b64(),
            member_public_key: None,
        }],
        public_key: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    (vault, epoch)
}

pub fn membership_record(id: &str, vault_id: &str, status: MembershipStatus) -> Membership {
    Membership {
        id: id.into(),
        vault_id: vault_id.into(),
        address: format!("addr-{id}"),
        role: Role::Contributor,
        status,
        keys: None,
        member_public_key: None,
        encrypted_signing_public_key: None,
        email: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// In-memory API collaborator recording every write.
pub struct MemoryApi {
    vaults: Mutex<HashMap<String, Vault>>,
    memberships: Mutex<HashMap<String, Membership>>,
    users: Mutex<HashMap<String, UserPublicData>>,
    profiles: Mutex<HashMap<String, Value>>,
    uploaded: Mutex<Vec<Value>>,
    posted: Mutex<Vec<(String, Value, Tags)>>,
    vault_calls: AtomicUsize,
    profile_calls: AtomicUsize,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self {
            vaults: Mutex::new(HashMap::new()),
            memberships: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            uploaded: Mutex::new(Vec::new()),
            posted: Mutex::new(Vec::new()),
            vault_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
        }
    }

    pub fn insert_vault(&self, vault: Vault) {
        self.vaults.lock().unwrap().insert(vault.id.clone(), vault);
    }

    pub fn insert_public_vault(&self, id: &str) {
        self.insert_vault(Vault {
            id: id.into(),
            name: Some("public vault".into()),
            public: true,
            status: VaultStatus::Active,
            keys: Vec::new(),
            public_key: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
    }

    pub fn insert_membership(&self, membership: Membership) {
        self.memberships
            .lock()
            .unwrap()
            .insert(membership.id.clone(), membership);
    }

    pub fn insert_user(&self, email: &str, user: UserPublicData) {
        self.users.lock().unwrap().insert(email.into(), user);
    }

    pub fn set_profile(&self, address: &str, value: Value) {
        self.profiles.lock().unwrap().insert(address.into(), value);
    }

    pub fn vault_calls(&self) -> usize {
        self.vault_calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn posted_count(&self) -> usize {
        self.posted.lock().unwrap().len()
    }

    pub fn last_posted(&self) -> Option<(String, Value, Tags)> {
        self.posted.lock().unwrap().last().cloned()
    }

    pub fn last_uploaded(&self) -> Option<Value> {
        self.uploaded.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Api for MemoryApi {
    async fn get_vault(&self, id: &str) -> Result<Vault> {
        self.vault_calls.fetch_add(1, Ordering::SeqCst);
        self.vaults
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Vault {id}")))
    }

    async fn get_membership(&self, id: &str, _vault_id: Option<&str>) -> Result<Membership> {
        self.memberships
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Membership {id}")))
    }

    async fn get_memberships_by_vault_id(
        &self,
        vault_id: &str,
        _options: &ListOptions,
    ) -> Result<Page<Membership>> {
        let mut items: Vec<Membership> = self
            .memberships
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.vault_id == vault_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Page { items, next_token: None })
    }

    async fn get_memberships(&self, _options: &ListOptions) -> Result<Page<Membership>> {
        let mut items: Vec<Membership> =
            self.memberships.lock().unwrap().values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Page { items, next_token: None })
    }

    async fn get_user_public_data(&self, email: &str) -> Result<UserPublicData> {
        self.users
            .lock()
            .unwrap()
            .get(email)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("User {email}")))
    }

    async fn get_profile(&self, address: &str) -> Result<Option<Value>> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.profiles.lock().unwrap().get(address).cloned())
    }

    async fn post_contract_transaction(
        &self,
        vault_id: &str,
        input: Value,
        tags: &Tags,
    ) -> Result<ContractTx> {
        let mut posted = self.posted.lock().unwrap();
        posted.push((vault_id.to_string(), input.clone(), tags.clone()));
        Ok(ContractTx { id: uuid::Uuid::new_v4().to_string(), object: input })
    }

    async fn upload_state(&self, state: Value, _tags: &Tags) -> Result<String> {
        let mut uploaded = self.uploaded.lock().unwrap();
        let id = format!("data-{}", uploaded.len());
        uploaded.push(state);
        Ok(id)
    }

    async fn upload_data(&self, data: Vec<u8>, _tags: &Tags) -> Result<String> {
        let mut uploaded = self.uploaded.lock().unwrap();
        let id = format!("data-{}", uploaded.len());
        uploaded.push(Value::String(base64_bytes(&data)));
        Ok(id)
    }

    async fn get_node_state(&self, data_ref: &str) -> Result<Value> {
        let index: usize = data_ref
            .strip_prefix("data-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| Error::NotFound(format!("Data ref {data_ref}")))?;
        self.uploaded
            .lock()
            .unwrap()
            .get(index)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Data ref {data_ref}")))
    }
}

fn base64_bytes(data: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    URL_SAFE_NO_PAD.encode(data)
}
