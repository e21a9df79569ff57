use std::collections::BTreeMap;

use crate::opencast::bridge::error::{BridgeError, Result};
use crate::opencast::bridge::model::AclEntry;
use crate::opencast::bridge::template;

/// Action granting playback access.
pub const READ_ACTION: &str = "read";

/// Access control list of an event.
///
/// Entries are keyed by `(action, role)`; adding a grant for an existing key
/// replaces its allow flag. The wire form is an array serialized in key
/// order, so two documents holding the same grants always serialize
/// identically regardless of how the remote platform ordered them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclDocument {
    grants: BTreeMap<AclKey, bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct AclKey {
    action: String,
    role: String,
}

impl AclDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the JSON array returned by the platform. A later entry for a
    /// key already seen wins.
    pub fn parse(json: &str) -> Result<Self> {
        let entries: Vec<AclEntry> = serde_json::from_str(json)
            .map_err(|err| BridgeError::InvalidAcl(err.to_string()))?;
        Ok(entries.into_iter().collect())
    }

    /// Grants or denies `action` to `role`.
    pub fn add(&mut self, allow: bool, action: impl Into<String>, role: impl Into<String>) {
        let key = AclKey {
            action: action.into(),
            role: role.into(),
        };
        self.grants.insert(key, allow);
    }

    /// Removes the entry for `action` and `role`. Returns whether one existed.
    pub fn remove(&mut self, action: &str, role: &str) -> bool {
        let key = AclKey {
            action: action.to_string(),
            role: role.to_string(),
        };
        self.grants.remove(&key).is_some()
    }

    /// Returns the allow flag stored for `action` and `role`.
    pub fn get(&self, action: &str, role: &str) -> Option<bool> {
        let key = AclKey {
            action: action.to_string(),
            role: role.to_string(),
        };
        self.grants.get(&key).copied()
    }

    /// Number of distinct `(action, role)` grants.
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Whether the document grants or denies nothing.
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Entries in canonical order.
    pub fn entries(&self) -> Vec<AclEntry> {
        self.grants
            .iter()
            .map(|(key, allow)| AclEntry {
                allow: *allow,
                action: key.action.clone(),
                role: key.role.clone(),
            })
            .collect()
    }

    /// Serialises the document into the array form sent to the platform.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.entries())?)
    }

    /// Finds another course still granted read access, judged by roles that
    /// match `course_role_template`. The course `excluding` is ignored.
    pub fn next_course_id(&self, course_role_template: &str, excluding: i64) -> Option<i64> {
        self.grants
            .iter()
            .filter(|(key, allow)| **allow && key.action == READ_ACTION)
            .filter_map(|(key, _)| template::match_course_id(course_role_template, &key.role))
            .find(|course_id| *course_id != excluding)
    }
}

impl FromIterator<AclEntry> for AclDocument {
    fn from_iter<I: IntoIterator<Item = AclEntry>>(iter: I) -> Self {
        let mut document = AclDocument::new();
        for entry in iter {
            document.add(entry.allow, entry.action, entry.role);
        }
        document
    }
}
