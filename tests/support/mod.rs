//! In-memory Opencast platform for integration testing.
//!
//! Keeps groups, series, events and ACLs between calls and records every
//! request so tests can assert on the exact writes the engine issued.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;

use opencast_bridge::Result;
use opencast_bridge::config::BridgeConfig;
use opencast_bridge::directory::{CourseCatalog, RoleTable};
use opencast_bridge::io::client::{Form, FormValue, Query, RemoteResponse, ResourceClient};
use opencast_bridge::model::RoleDefinition;
use opencast_bridge::template;
use serde_json::{Value, json};

/// A recorded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub run_as_roles: Vec<String>,
    pub form: Form,
}

impl Call {
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Default)]
struct State {
    groups: BTreeMap<String, Value>,
    series: Vec<Value>,
    events: BTreeMap<String, Value>,
    acls: BTreeMap<String, String>,
    calls: Vec<Call>,
    next_id: u64,
}

/// Stateful fake of the platform's REST surface.
pub struct FakeOpencast {
    state: RefCell<State>,
    /// Series creation is accepted but never becomes visible.
    pub series_never_persist: bool,
    /// Group creation is accepted but never becomes visible.
    pub groups_never_persist: bool,
    pub event_post_status: u16,
    pub acl_put_status: u16,
    pub metadata_put_status: u16,
    pub events_list_status: u16,
}

impl Default for FakeOpencast {
    fn default() -> Self {
        Self {
            state: RefCell::new(State::default()),
            series_never_persist: false,
            groups_never_persist: false,
            event_post_status: 201,
            acl_put_status: 204,
            metadata_put_status: 204,
            events_list_status: 200,
        }
    }
}

impl FakeOpencast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_group(&self, identifier: &str, name: &str) {
        self.state.borrow_mut().groups.insert(
            identifier.to_string(),
            json!({ "identifier": identifier, "name": name, "roles": "ROLE_API_SERIES_VIEW" }),
        );
    }

    pub fn insert_series(&self, identifier: &str, title: &str) {
        self.state
            .borrow_mut()
            .series
            .push(json!({ "identifier": identifier, "title": title }));
    }

    pub fn insert_event(&self, event: Value) {
        let identifier = event["identifier"]
            .as_str()
            .expect("event identifier")
            .to_string();
        self.state.borrow_mut().events.insert(identifier, event);
    }

    pub fn set_acl(&self, event_identifier: &str, acl: Value) {
        self.state
            .borrow_mut()
            .acls
            .insert(event_identifier.to_string(), acl.to_string());
    }

    pub fn acl(&self, event_identifier: &str) -> Option<Value> {
        self.state
            .borrow()
            .acls
            .get(event_identifier)
            .map(|acl| serde_json::from_str(acl).expect("stored ACL is JSON"))
    }

    pub fn series_count(&self) -> usize {
        self.state.borrow().series.len()
    }

    pub fn group_count(&self) -> usize {
        self.state.borrow().groups.len()
    }

    pub fn event_count(&self) -> usize {
        self.state.borrow().events.len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .collect()
    }

    pub fn last_put(&self) -> Option<Call> {
        self.calls_to("PUT").pop()
    }

    fn record(
        &self,
        method: &'static str,
        path: &str,
        query: &Query<'_>,
        run_as_roles: &[String],
        form: &Form,
    ) {
        self.state.borrow_mut().calls.push(Call {
            method,
            path: path.to_string(),
            query: query
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
            run_as_roles: run_as_roles.to_vec(),
            form: form.clone(),
        });
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        format!("{prefix}-{}", state.next_id)
    }
}

fn found(value: Option<&Value>) -> RemoteResponse {
    match value {
        Some(value) => RemoteResponse::new(200, value.to_string()),
        None => RemoteResponse::new(404, ""),
    }
}

fn metadata_field(form: &Form, field_id: &str) -> Option<String> {
    let metadata: Value = serde_json::from_str(form.text_value("metadata")?).ok()?;
    metadata
        .as_array()?
        .iter()
        .flat_map(|catalog| catalog["fields"].as_array().cloned().unwrap_or_default())
        .find(|field| field["id"] == field_id)
        .and_then(|field| field["value"].as_str().map(str::to_string))
}

impl ResourceClient for FakeOpencast {
    fn get(
        &self,
        path: &str,
        query: &Query<'_>,
        run_as_roles: &[String],
    ) -> Result<RemoteResponse> {
        self.record("GET", path, query, run_as_roles, &Form::new());
        let state = self.state.borrow();

        if let Some(identifier) = path.strip_prefix("/api/groups/") {
            return Ok(found(state.groups.get(identifier)));
        }

        if path == "/api/series" {
            let title = query
                .iter()
                .find(|(key, _)| *key == "filter")
                .and_then(|(_, value)| value.strip_prefix("title:"))
                .unwrap_or_default();
            let matching: Vec<&Value> = state
                .series
                .iter()
                .filter(|series| series["title"] == title)
                .collect();
            return Ok(RemoteResponse::new(200, json!(matching).to_string()));
        }

        if let Some(identifier) = path.strip_prefix("/api/series/") {
            let series = state
                .series
                .iter()
                .find(|series| series["identifier"] == identifier);
            return Ok(found(series));
        }

        if path == "/api/events" {
            if self.events_list_status != 200 {
                return Ok(RemoteResponse::new(self.events_list_status, ""));
            }
            let events: Vec<&Value> = state.events.values().collect();
            let limited: Vec<&Value> = match query.iter().find(|(key, _)| *key == "limit") {
                Some((_, limit)) => {
                    let limit: usize = limit.parse().expect("numeric limit");
                    events.into_iter().take(limit).collect()
                }
                None => events,
            };
            return Ok(RemoteResponse::new(200, json!(limited).to_string()));
        }

        if let Some(rest) = path.strip_prefix("/api/events/") {
            if let Some(identifier) = rest.strip_suffix("/acl") {
                return Ok(match state.acls.get(identifier) {
                    Some(acl) => RemoteResponse::new(200, acl.clone()),
                    None => RemoteResponse::new(404, ""),
                });
            }
            return Ok(found(state.events.get(rest)));
        }

        Ok(RemoteResponse::new(404, ""))
    }

    fn post(&self, path: &str, form: &Form) -> Result<RemoteResponse> {
        self.record("POST", path, &[], &[], form);

        match path {
            "/api/groups/" => {
                let name = form.text_value("name").unwrap_or_default().to_string();
                let identifier = template::group_identifier(&name);
                if !self.groups_never_persist {
                    self.state.borrow_mut().groups.insert(
                        identifier.clone(),
                        json!({
                            "identifier": identifier,
                            "name": name,
                            "description": form.text_value("description"),
                            "roles": form.text_value("roles"),
                        }),
                    );
                }
                Ok(RemoteResponse::new(201, ""))
            }
            "/api/series/" => {
                let title = metadata_field(form, "title").unwrap_or_default();
                let identifier = self.next_id("series");
                if !self.series_never_persist {
                    self.insert_series(&identifier, &title);
                }
                Ok(RemoteResponse::new(
                    201,
                    json!({ "identifier": identifier }).to_string(),
                ))
            }
            "/api/events/" => {
                if self.event_post_status != 201 {
                    return Ok(RemoteResponse::new(self.event_post_status, ""));
                }
                let identifier = self.next_id("event");
                let title = metadata_field(form, "title").unwrap_or_default();
                let series = metadata_field(form, "isPartOf");
                self.insert_event(json!({
                    "identifier": identifier,
                    "title": title,
                    "is_part_of": series,
                    "processing_state": "RUNNING",
                }));
                if let Some(acl) = form.text_value("acl") {
                    self.state
                        .borrow_mut()
                        .acls
                        .insert(identifier.clone(), acl.to_string());
                }
                Ok(RemoteResponse::new(
                    201,
                    json!({ "identifier": identifier }).to_string(),
                ))
            }
            _ => Ok(RemoteResponse::new(404, "")),
        }
    }

    fn put(&self, path: &str, query: &Query<'_>, form: &Form) -> Result<RemoteResponse> {
        self.record("PUT", path, query, &[], form);

        let Some(rest) = path.strip_prefix("/api/events/") else {
            return Ok(RemoteResponse::new(404, ""));
        };

        if let Some(identifier) = rest.strip_suffix("/acl") {
            if self.acl_put_status == 204 {
                let acl = form.text_value("acl").unwrap_or("[]").to_string();
                self.state
                    .borrow_mut()
                    .acls
                    .insert(identifier.to_string(), acl);
            }
            return Ok(RemoteResponse::new(self.acl_put_status, ""));
        }

        if let Some(identifier) = rest.strip_suffix("/metadata") {
            if self.metadata_put_status == 204 {
                let series = form
                    .text_value("metadata")
                    .and_then(|metadata| serde_json::from_str::<Value>(metadata).ok())
                    .and_then(|metadata| metadata[0]["value"].as_str().map(str::to_string));
                if let Some(event) = self.state.borrow_mut().events.get_mut(identifier) {
                    event["is_part_of"] = json!(series);
                }
            }
            return Ok(RemoteResponse::new(self.metadata_put_status, ""));
        }

        Ok(RemoteResponse::new(404, ""))
    }
}

/// Path of the file part `name` of a recorded request.
pub fn uploaded_file(call: &Call, name: &str) -> Option<std::path::PathBuf> {
    call.form.fields().iter().find_map(|field| match &field.value {
        FormValue::File(path) if field.name == name => Some(path.clone()),
        _ => None,
    })
}

pub fn test_config() -> BridgeConfig {
    BridgeConfig::new("https://opencast.example.com", "admin", "opencast")
}

pub fn course_catalog() -> CourseCatalog {
    CourseCatalog::new()
        .with_course(42, "Introduction to Rust")
        .with_course(7, "Systems Programming")
}

/// Course members may read, the course role may additionally write.
pub fn default_roles() -> RoleTable {
    RoleTable::new(vec![
        RoleDefinition::new("read", "ROLE_GROUP_MOODLE_COURSE_[COURSEID]"),
        RoleDefinition::new("write", "ROLE_COURSE_[COURSEID]"),
    ])
}
