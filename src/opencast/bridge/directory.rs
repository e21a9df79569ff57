use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::opencast::bridge::error::{BridgeError, Result};
use crate::opencast::bridge::model::RoleDefinition;

/// Course metadata lookup.
pub trait CourseDirectory {
    /// Returns the full name of the course or [`BridgeError::UnknownCourse`].
    fn course_name(&self, course_id: i64) -> Result<String>;
}

/// Source of the role grants every course-scoped principal receives.
pub trait RoleMapping {
    /// Action and role-name templates, in grant order.
    fn roles(&self) -> Result<Vec<RoleDefinition>>;
}

/// Course directory backed by an in-memory map.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct CourseCatalog {
    courses: BTreeMap<i64, String>,
}

impl CourseCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON object mapping course identifiers to full names.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BridgeError::MissingInput(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Adds or replaces the full name of a course.
    pub fn insert(&mut self, course_id: i64, full_name: impl Into<String>) {
        self.courses.insert(course_id, full_name.into());
    }

    /// Builder form of [`CourseCatalog::insert`].
    pub fn with_course(mut self, course_id: i64, full_name: impl Into<String>) -> Self {
        self.insert(course_id, full_name);
        self
    }
}

impl CourseDirectory for CourseCatalog {
    fn course_name(&self, course_id: i64) -> Result<String> {
        self.courses
            .get(&course_id)
            .cloned()
            .ok_or(BridgeError::UnknownCourse(course_id))
    }
}

/// Fixed role mapping, typically read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleTable {
    roles: Vec<RoleDefinition>,
}

impl RoleTable {
    pub fn new(roles: Vec<RoleDefinition>) -> Self {
        Self { roles }
    }
}

impl RoleMapping for RoleTable {
    fn roles(&self) -> Result<Vec<RoleDefinition>> {
        Ok(self.roles.clone())
    }
}
