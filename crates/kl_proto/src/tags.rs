//! Write-protocol tags.
//!
//! Every mutating write carries an ordered tag set used by the backing
//! store for indexing and search. The set must be deterministic for
//! identical context state (some backends de-duplicate or index by tag
//! content) and free of empty entries.
//!
//! Duplicate handling: pushing a tag whose value already exists removes
//! the earlier entry — last write per distinct value wins.

use serde::{Deserialize, Serialize};

/// Protocol tag names.
pub mod protocol {
    pub const FUNCTION_NAME: &str = "Function-Name";
    pub const SIGNER_ADDRESS: &str = "Signer-Address";
    pub const VAULT_ID: &str = "Vault-Id";
    pub const MEMBERSHIP_ID: &str = "Membership-Id";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const OBJECT_TYPE: &str = "Object-Type";
    pub const PUBLIC: &str = "Public";
    pub const GROUP_REF: &str = "Group-Ref";
    pub const ACTION_REF: &str = "Action-Ref";
    pub const TOPIC: &str = "Topic";
    pub const ENCRYPTED_KEY: &str = "Encrypted-Key";
    pub const PUBLIC_ADDRESS: &str = "Public-Address";
    pub const INITIALIZATION_VECTOR: &str = "Initialization-Vector";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Ordered tag sequence with value-identity de-duplication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags(Vec<Tag>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag. Empty names or values are dropped; an existing tag
    /// with the same value is removed first, so the last insert wins.
    pub fn push(&mut self, tag: Tag) {
        if tag.name.trim().is_empty() || tag.value.trim().is_empty() {
            return;
        }
        self.0.retain(|t| t.value != tag.value);
        self.0.push(tag);
    }

    pub fn extend<I: IntoIterator<Item = Tag>>(&mut self, tags: I) {
        for tag in tags {
            self.push(tag);
        }
    }

    /// Topic tags from a free-text label: split on spaces and dots,
    /// lower-cased, empties dropped.
    pub fn push_topics(&mut self, label: &str) {
        for part in label.split([' ', '.']) {
            let topic = part.trim().to_lowercase();
            if !topic.is_empty() {
                self.push(Tag::new(protocol::TOPIC, topic));
            }
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Tag> {
        self.0
    }

    pub fn as_slice(&self) -> &[Tag] {
        &self.0
    }

    /// Value of the first tag with the given name.
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|t| t.name == name).map(|t| t.value.as_str())
    }
}

impl IntoIterator for Tags {
    type Item = Tag;
    type IntoIter = std::vec::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_values_keep_last_insert() {
        let mut tags = Tags::new();
        tags.push(Tag::new("Vault-Id", "v1"));
        tags.push(Tag::new("Object-Type", "Membership"));
        tags.push(Tag::new("Group-Ref", "v1"));

        assert_eq!(tags.len(), 2);
        assert_eq!(tags.as_slice()[0], Tag::new("Object-Type", "Membership"));
        assert_eq!(tags.as_slice()[1], Tag::new("Group-Ref", "v1"));
    }

    #[test]
    fn empty_entries_never_become_tags() {
        let mut tags = Tags::new();
        tags.push(Tag::new("", "value"));
        tags.push(Tag::new("Name", ""));
        tags.push(Tag::new("Name", "   "));
        assert!(tags.is_empty());
    }

    #[test]
    fn topics_split_and_lowercase() {
        let mut tags = Tags::new();
        tags.push_topics("Finance.Reports  Q3");
        let topics: Vec<_> = tags.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(topics, vec!["finance", "reports", "q3"]);
    }
}
