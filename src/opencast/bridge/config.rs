use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::opencast::bridge::directory::RoleTable;
use crate::opencast::bridge::error::{BridgeError, Result};
use crate::opencast::bridge::model::RoleDefinition;

pub const DEFAULT_GROUP_NAME: &str = "Moodle_course_[COURSEID]";
pub const DEFAULT_SERIES_NAME: &str = "Course_Series_[COURSEID]";
pub const DEFAULT_COURSE_ROLE: &str = "ROLE_GROUP_MOODLE_COURSE_[COURSEID]";
pub const DEFAULT_UPLOAD_WORKFLOW: &str = "ng-schedule-and-upload";
pub const DEFAULT_LIMIT_VIDEOS: u32 = 5;

/// Connection settings and naming conventions used by the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Base URL of the platform, without the `/api` suffix.
    #[serde(default)]
    pub api_url: String,
    /// Account used for basic authentication.
    #[serde(default)]
    pub api_username: String,
    #[serde(default)]
    pub api_password: String,
    /// Connect timeout in seconds; `0` leaves the transport default.
    #[serde(default)]
    pub connect_timeout_secs: u64,
    /// Template of the course group name; the group identifier is derived
    /// from the rendered name.
    #[serde(default = "default_group_name")]
    pub group_name: String,
    /// Template of the course series title.
    #[serde(default = "default_series_name")]
    pub series_name: String,
    /// Template of the role held by every member of a course.
    #[serde(default = "default_course_role")]
    pub course_role_template: String,
    /// Workflow started for uploaded media.
    #[serde(default = "default_upload_workflow")]
    pub upload_workflow: String,
    /// Number of videos shown per course block.
    #[serde(default = "default_limit_videos")]
    pub limit_videos: u32,
    /// Permissions granted to every course on the events it owns.
    #[serde(default)]
    pub roles: Vec<RoleDefinition>,
}

impl BridgeConfig {
    /// Creates a configuration with the given connection settings and
    /// default naming conventions.
    pub fn new(
        api_url: impl Into<String>,
        api_username: impl Into<String>,
        api_password: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_username: api_username.into(),
            api_password: api_password.into(),
            connect_timeout_secs: 0,
            group_name: default_group_name(),
            series_name: default_series_name(),
            course_role_template: default_course_role(),
            upload_workflow: default_upload_workflow(),
            limit_videos: default_limit_videos(),
            roles: Vec::new(),
        }
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BridgeError::MissingInput(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        let config: BridgeConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the connection settings are present.
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(BridgeError::MissingSetting("api_url"));
        }
        if self.api_username.is_empty() {
            return Err(BridgeError::MissingSetting("api_username"));
        }
        if self.api_password.is_empty() {
            return Err(BridgeError::MissingSetting("api_password"));
        }
        if self.course_role_template.is_empty() {
            return Err(BridgeError::Configuration(
                "course_role_template must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Connect timeout for the transport, if one is configured.
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }

    /// Role mapping backed by the configured `roles`.
    pub fn role_table(&self) -> RoleTable {
        RoleTable::new(self.roles.clone())
    }
}

fn default_group_name() -> String {
    DEFAULT_GROUP_NAME.to_string()
}

fn default_series_name() -> String {
    DEFAULT_SERIES_NAME.to_string()
}

fn default_course_role() -> String {
    DEFAULT_COURSE_ROLE.to_string()
}

fn default_upload_workflow() -> String {
    DEFAULT_UPLOAD_WORKFLOW.to_string()
}

fn default_limit_videos() -> u32 {
    DEFAULT_LIMIT_VIDEOS
}
