use std::path::{Path, PathBuf};

use crate::opencast::bridge::error::Result;

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_NO_CONTENT: u16 = 204;

/// Query string parameters as name/value pairs.
pub type Query<'a> = [(&'a str, String)];

/// Status code and body of a remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
}

impl RemoteResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Value of a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    /// Local file uploaded as a multipart part.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

/// Ordered form body of a POST or PUT request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    fields: Vec<FormField>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            value: FormValue::Text(value.into()),
        });
        self
    }

    pub fn file(mut self, name: impl Into<String>, path: &Path) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            value: FormValue::File(path.to_path_buf()),
        });
        self
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// Returns the first text field named `name`.
    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|field| match &field.value {
            FormValue::Text(value) if field.name == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Whether the form must be sent as `multipart/form-data`.
    pub fn has_files(&self) -> bool {
        self.fields
            .iter()
            .any(|field| matches!(field.value, FormValue::File(_)))
    }
}

/// Transport used to reach the remote platform.
///
/// Paths are relative to the configured API URL, e.g. `/api/events/abc`.
/// Any status code is a successful call at this level; only transport
/// failures are errors.
pub trait ResourceClient {
    /// Performs a GET. `run_as_roles` scopes the read to the given roles.
    fn get(
        &self,
        path: &str,
        query: &Query<'_>,
        run_as_roles: &[String],
    ) -> Result<RemoteResponse>;

    fn post(&self, path: &str, form: &Form) -> Result<RemoteResponse>;

    fn put(&self, path: &str, query: &Query<'_>, form: &Form) -> Result<RemoteResponse>;
}
