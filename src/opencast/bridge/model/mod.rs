use std::path::PathBuf;

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier assigned by the remote platform to groups, series and events.
pub type RemoteId = String;

/// Processing state reported for events whose encoding finished.
pub const PROCESSING_SUCCEEDED: &str = "SUCCEEDED";

/// Entities returned by the remote platform that carry an identifier.
///
/// An entity whose identifier is empty is treated as absent.
pub trait RemoteEntity: DeserializeOwned {
    fn identifier(&self) -> &str;
}

/// Decodes a single entity, failing closed on malformed or partial JSON.
pub fn parse_entity<T: RemoteEntity>(body: &str) -> Option<T> {
    serde_json::from_str::<T>(body)
        .ok()
        .filter(|entity| !entity.identifier().is_empty())
}

/// Entities decoded from a JSON array.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityList<T> {
    pub entities: Vec<T>,
    /// Number of array elements the platform sent, decodable or not.
    pub received: usize,
}

/// Decodes a JSON array of entities. Returns `None` when the body is not an
/// array; entries without an identifier are skipped.
pub fn parse_entity_list<T: RemoteEntity>(body: &str) -> Option<EntityList<T>> {
    let Value::Array(items) = serde_json::from_str::<Value>(body).ok()? else {
        return None;
    };

    let received = items.len();
    let entities = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<T>(item).ok())
        .filter(|entity| !entity.identifier().is_empty())
        .collect();
    Some(EntityList { entities, received })
}

/// Remote access-control principal representing the members of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub identifier: RemoteId,
    /// Display name rendered from the group name template.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Free text naming the course the group was created for.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Roles granted to the group. The platform reports these either as a
    /// comma separated string or as an array.
    #[serde(default, deserialize_with = "string_or_list")]
    pub roles: Vec<String>,
}

impl RemoteEntity for Group {
    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Remote container associating the events of one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub identifier: RemoteId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

impl RemoteEntity for Series {
    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// A single grant of an action to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub allow: bool,
    pub action: String,
    pub role: String,
}

/// Remote record representing one uploaded media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub identifier: RemoteId,
    /// Title given at upload time; the stored file name for bridge uploads.
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Series the event belongs to. Empty or absent for ownerless events.
    #[serde(default)]
    pub is_part_of: Option<RemoteId>,
    #[serde(default)]
    pub processing_state: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub acl: Vec<AclEntry>,
    /// Raw metadata catalogs, present when requested with `withmetadata`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl RemoteEntity for Event {
    fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl Event {
    /// Whether encoding finished, which makes it safe to revoke access.
    pub fn processing_succeeded(&self) -> bool {
        self.processing_state.as_deref() == Some(PROCESSING_SUCCEEDED)
    }
}

/// Locally configured permission every course-scoped principal receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    #[serde(alias = "actionname")]
    pub action_name: String,
    /// Role name template, expanded per course before use.
    #[serde(alias = "rolename")]
    pub role_name: String,
}

impl RoleDefinition {
    pub fn new(action_name: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            role_name: role_name.into(),
        }
    }
}

/// Local upload job whose stored file becomes an event's presentation track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub course_id: i64,
    pub file: PathBuf,
}

impl UploadJob {
    pub fn new(course_id: i64, file: impl Into<PathBuf>) -> Self {
        Self {
            course_id,
            file: file.into(),
        }
    }

    /// File name of the stored media, used as the event title.
    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Outcome of [`crate::sync::ApiBridge::ensure_event_exists`].
#[derive(Debug, Clone, PartialEq)]
pub struct EnsuredEvent {
    pub event: Event,
    /// `false` when one of the candidate identifiers already resolved.
    pub newly_created: bool,
}

/// Events visible to a course.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseVideos {
    pub videos: Vec<Event>,
    /// More events exist than the configured display limit.
    pub more: bool,
    /// HTTP status of a failed listing.
    pub error: Option<u16>,
}

impl CourseVideos {
    pub fn count(&self) -> usize {
        self.videos.len()
    }
}

/// A single event looked up in the context of a course.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseVideo {
    pub video: Option<Event>,
    pub error: Option<u16>,
}

/// Reads an explicit `null` as the field's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Roles {
        Joined(String),
        List(Vec<String>),
        Missing(()),
    }

    Ok(match Roles::deserialize(deserializer)? {
        Roles::Joined(value) => value
            .split(',')
            .map(str::trim)
            .filter(|role| !role.is_empty())
            .map(str::to_string)
            .collect(),
        Roles::List(values) => values,
        Roles::Missing(()) => Vec::new(),
    })
}
