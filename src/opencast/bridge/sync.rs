//! Reconciliation of course-scoped groups, series, events and ACLs.
//!
//! [`ApiBridge`] drives every remote call through a [`ResourceClient`]. All
//! `ensure_*` operations are check-then-create and safe to repeat, but the
//! remote platform offers no atomic create-if-absent: callers must serialise
//! reconciliation per course.

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::opencast::bridge::acl::{AclDocument, READ_ACTION};
use crate::opencast::bridge::config::BridgeConfig;
use crate::opencast::bridge::directory::{CourseDirectory, RoleMapping};
use crate::opencast::bridge::error::{BridgeError, Result};
use crate::opencast::bridge::io::client::{
    Form, RemoteResponse, ResourceClient, STATUS_CREATED, STATUS_NO_CONTENT,
};
use crate::opencast::bridge::model::{
    CourseVideo, CourseVideos, EnsuredEvent, EntityList, Event, Group, Series, UploadJob,
    parse_entity, parse_entity_list,
};
use crate::opencast::bridge::template;

/// Roles granted to every course group.
pub const GROUP_ROLES: &str = "ROLE_API_SERIES_VIEW,ROLE_API_EVENTS_VIEW";
/// Series identifier assigned to events no course owns any more.
pub const EMPTY_SERIES: &str = "";

const EPISODE_FLAVOR: &str = "dublincore/episode";
const SERIES_FLAVOR: &str = "dublincore/series";
const BLOCK_SORT: &str = "start_date:DESC";

/// Whether access to the event may be revoked. Events still encoding, or
/// whose encoding failed, keep their grants.
pub fn can_delete_acl_group_assignment(event: &Event) -> bool {
    event.processing_succeeded()
}

/// Reconciliation engine bound to one configuration and its collaborators.
///
/// The engine keeps no state between calls; construct one per request or
/// batch.
pub struct ApiBridge<'a> {
    config: BridgeConfig,
    client: &'a dyn ResourceClient,
    courses: &'a dyn CourseDirectory,
    roles: &'a dyn RoleMapping,
}

impl<'a> ApiBridge<'a> {
    /// Validates `config` and binds the collaborators.
    pub fn new(
        config: BridgeConfig,
        client: &'a dyn ResourceClient,
        courses: &'a dyn CourseDirectory,
        roles: &'a dyn RoleMapping,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            client,
            courses,
            roles,
        })
    }

    fn render(&self, name_template: &str, course_id: i64) -> Result<String> {
        template::render(name_template, course_id, self.courses)
    }

    /// Role held by the members of the course.
    pub fn course_role(&self, course_id: i64) -> Result<String> {
        self.render(&self.config.course_role_template, course_id)
    }

    // ── Groups ────────────────────────────────────────────────────────

    fn acl_group(&self, identifier: &str) -> Result<Option<Group>> {
        let response = self.client.get(&format!("/api/groups/{identifier}"), &[], &[])?;
        if !response.is_ok() {
            return Ok(None);
        }
        Ok(parse_entity(&response.body))
    }

    fn create_acl_group(&self, course_id: i64, name: &str) -> Result<RemoteResponse> {
        let form = Form::new()
            .text("name", name)
            .text(
                "description",
                format!("ACL for users in Course with id {course_id} from site \"Moodle\""),
            )
            .text("roles", GROUP_ROLES)
            .text("members", "");
        self.client.post("/api/groups/", &form)
    }

    /// Returns the course group, creating it when absent.
    #[instrument(level = "info", skip(self))]
    pub fn ensure_group_exists(&self, course_id: i64) -> Result<Group> {
        let name = self.render(&self.config.group_name, course_id)?;
        let identifier = template::group_identifier(&name);

        if let Some(group) = self.acl_group(&identifier)? {
            debug!(%identifier, "group already exists");
            return Ok(group);
        }

        let response = self.create_acl_group(course_id, &name)?;
        info!(%identifier, status = response.status, "requested group creation");

        self.acl_group(&identifier)?
            .ok_or(BridgeError::MissingGroup { identifier })
    }

    // ── Series ────────────────────────────────────────────────────────

    fn series_titled(&self, title: &str) -> Result<Option<Vec<Series>>> {
        let query = [("filter", format!("title:{title}"))];
        let response = self.client.get("/api/series", &query, &[])?;
        if !response.is_ok() {
            return Ok(None);
        }
        Ok(parse_entity_list(&response.body).map(|list| list.entities))
    }

    fn create_course_series(&self, title: &str) -> Result<RemoteResponse> {
        let metadata = json!([{
            "label": "Opencast Series Dublincore",
            "flavor": SERIES_FLAVOR,
            "fields": [{ "id": "title", "value": title }],
        }]);
        let form = Form::new()
            .text("metadata", metadata.to_string())
            .text("acl", "[]")
            .text("theme", "");
        self.client.post("/api/series/", &form)
    }

    /// Returns the course series, creating it when absent.
    #[instrument(level = "info", skip(self))]
    pub fn ensure_series_exists(&self, course_id: i64) -> Result<Series> {
        let title = self.render(&self.config.series_name, course_id)?;

        let found = self.series_titled(&title)?.unwrap_or_default();
        if let Some(series) = found.into_iter().next() {
            debug!(identifier = %series.identifier, "series already exists");
            return Ok(series);
        }

        let response = self.create_course_series(&title)?;
        info!(%title, status = response.status, "requested series creation");

        self.series_titled(&title)?
            .and_then(|series| series.into_iter().next())
            .ok_or(BridgeError::MissingSeries { title })
    }

    /// Looks up a series by identifier, e.g. to validate an operator override.
    pub fn series_by_identifier(&self, identifier: &str) -> Result<Option<Series>> {
        let response = self.client.get(&format!("/api/series/{identifier}"), &[], &[])?;
        if !response.is_ok() {
            return Ok(None);
        }
        Ok(parse_entity(&response.body))
    }

    // ── Events ────────────────────────────────────────────────────────

    fn event(&self, identifier: &str, run_as_roles: &[String]) -> Result<RemoteResponse> {
        self.client
            .get(&format!("/api/events/{identifier}"), &[], run_as_roles)
    }

    /// First candidate that already exists remotely.
    fn existing_event(&self, candidates: &[String]) -> Result<Option<Event>> {
        for candidate in candidates {
            let response = self.event(candidate, &[])?;
            if !response.is_ok() {
                continue;
            }
            if let Some(event) = parse_entity::<Event>(&response.body) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    fn course_acl(&self, course_id: i64) -> Result<AclDocument> {
        let mut acl = AclDocument::new();
        self.grant_course_roles(&mut acl, course_id)?;
        Ok(acl)
    }

    fn grant_course_roles(&self, acl: &mut AclDocument, course_id: i64) -> Result<()> {
        for role in self.roles.roles()? {
            let role_name = self.render(&role.role_name, course_id)?;
            acl.add(true, role.action_name, role_name);
        }
        Ok(())
    }

    fn create_event(&self, job: &UploadJob, series_identifier: &str) -> Result<RemoteResponse> {
        if !job.file.exists() {
            return Err(BridgeError::MissingInput(job.file.clone()));
        }

        let acl = self.course_acl(job.course_id)?;
        let metadata = json!([{
            "flavor": EPISODE_FLAVOR,
            "fields": [
                { "id": "title", "value": job.file_name() },
                { "id": "isPartOf", "value": series_identifier },
            ],
        }]);
        let processing = json!({
            "workflow": self.config.upload_workflow,
            "configuration": {},
        });

        let form = Form::new()
            .text("acl", acl.to_json()?)
            .text("metadata", metadata.to_string())
            .text("processing", processing.to_string())
            .file("presentation", &job.file);
        self.client.post("/api/events/", &form)
    }

    /// Returns the event of an upload job, creating it only when none of the
    /// `candidates` identifiers exists remotely.
    #[instrument(
        level = "info",
        skip_all,
        fields(course_id = job.course_id, file = %job.file.display(), series = series_identifier)
    )]
    pub fn ensure_event_exists(
        &self,
        job: &UploadJob,
        candidates: &[String],
        series_identifier: &str,
    ) -> Result<EnsuredEvent> {
        if let Some(event) = self.existing_event(candidates)? {
            debug!(identifier = %event.identifier, "event already uploaded");
            return Ok(EnsuredEvent {
                event,
                newly_created: false,
            });
        }

        let response = self.create_event(job, series_identifier)?;
        if response.status != STATUS_CREATED {
            warn!(status = response.status, "event upload rejected");
            return Err(BridgeError::UploadFailed {
                status: response.status,
            });
        }

        let event = parse_entity::<Event>(&response.body).ok_or_else(|| {
            BridgeError::MalformedResponse("created event carries no identifier".into())
        })?;
        info!(identifier = %event.identifier, "event created");
        Ok(EnsuredEvent {
            event,
            newly_created: true,
        })
    }

    // ── ACLs ──────────────────────────────────────────────────────────

    fn acl_path(event_identifier: &str) -> String {
        format!("/api/events/{event_identifier}/acl")
    }

    /// Current ACL of the event, or `None` when it could not be read.
    fn event_acl(&self, event_identifier: &str) -> Result<Option<AclDocument>> {
        let response = self.client.get(&Self::acl_path(event_identifier), &[], &[])?;
        if !response.is_ok() {
            warn!(status = response.status, "reading event ACL failed");
            return Ok(None);
        }
        match AclDocument::parse(&response.body) {
            Ok(acl) => Ok(Some(acl)),
            Err(err) => {
                warn!(error = %err, "event ACL unreadable");
                Ok(None)
            }
        }
    }

    fn write_acl(&self, event_identifier: &str, acl: &AclDocument) -> Result<bool> {
        let form = Form::new().text("acl", acl.to_json()?);
        let response = self.client.put(&Self::acl_path(event_identifier), &[], &form)?;
        if response.status != STATUS_NO_CONTENT {
            warn!(status = response.status, "ACL update rejected");
            return Ok(false);
        }
        Ok(true)
    }

    /// Grants every configured course role on the event. Unrelated grants
    /// are kept; nothing is written when the ACL already matches.
    #[instrument(level = "info", skip(self))]
    pub fn ensure_acl_assigned(&self, event_identifier: &str, course_id: i64) -> Result<bool> {
        let Some(current) = self.event_acl(event_identifier)? else {
            return Ok(false);
        };

        let mut desired = current.clone();
        self.grant_course_roles(&mut desired, course_id)?;

        if desired == current {
            debug!("ACL unchanged");
            return Ok(true);
        }

        info!(entries = desired.len(), "updating event ACL");
        self.write_acl(event_identifier, &desired)
    }

    /// Revokes the course's read access and moves the event to the series of
    /// the next course still granted access, or to no series at all.
    #[instrument(level = "info", skip(self))]
    pub fn ensure_acl_removed(&self, event_identifier: &str, course_id: i64) -> Result<bool> {
        let Some(mut acl) = self.event_acl(event_identifier)? else {
            return Ok(false);
        };

        self.grant_course_roles(&mut acl, course_id)?;
        let course_role = self.course_role(course_id)?;
        acl.remove(READ_ACTION, &course_role);

        if !self.write_acl(event_identifier, &acl)? {
            return Ok(false);
        }

        match acl.next_course_id(&self.config.course_role_template, course_id) {
            Some(next_course) => {
                info!(next_course, "reassigning event to next owning course");
                let series = self.ensure_series_exists(next_course)?;
                self.ensure_series_assigned(event_identifier, &series.identifier)
            }
            None => {
                info!("event has no owning course left");
                self.ensure_series_assigned(event_identifier, EMPTY_SERIES)
            }
        }
    }

    /// Points the event at `series_identifier`.
    #[instrument(level = "info", skip(self))]
    pub fn ensure_series_assigned(
        &self,
        event_identifier: &str,
        series_identifier: &str,
    ) -> Result<bool> {
        let metadata = json!([{ "id": "isPartOf", "value": series_identifier }]);
        let form = Form::new().text("metadata", metadata.to_string());
        let query = [("type", EPISODE_FLAVOR.to_string())];
        let response = self.client.put(
            &format!("/api/events/{event_identifier}/metadata"),
            &query,
            &form,
        )?;
        if response.status != STATUS_NO_CONTENT {
            warn!(status = response.status, "series assignment rejected");
            return Ok(false);
        }
        Ok(true)
    }

    // ── Listings ──────────────────────────────────────────────────────

    fn listing_query(sort: Option<&str>, limit: Option<u32>) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("sign", "1".to_string()),
            ("withacl", "1".to_string()),
            ("withmetadata", "1".to_string()),
            ("withpublications", "1".to_string()),
        ];
        if let Some(sort) = sort {
            query.push(("sort", sort.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }

    /// Events visible to the course together with the number of entries the
    /// platform returned, counting those that failed to decode.
    fn list_events(
        &self,
        course_id: i64,
        sort: Option<&str>,
        limit: Option<u32>,
    ) -> Result<(CourseVideos, usize)> {
        let roles = [self.course_role(course_id)?];
        let query = Self::listing_query(sort, limit);
        let response = self.client.get("/api/events", &query, &roles)?;

        if !response.is_ok() {
            let failed = CourseVideos {
                error: Some(response.status),
                ..CourseVideos::default()
            };
            return Ok((failed, 0));
        }

        let list = parse_entity_list(&response.body).unwrap_or(EntityList {
            entities: Vec::new(),
            received: 0,
        });
        let videos = CourseVideos {
            videos: list.entities,
            ..CourseVideos::default()
        };
        Ok((videos, list.received))
    }

    /// Newest videos of a course, limited to the configured block size.
    #[instrument(level = "debug", skip(self))]
    pub fn block_videos(&self, course_id: i64) -> Result<CourseVideos> {
        let display_limit = self.config.limit_videos;
        // One extra entry tells whether more videos exist.
        let fetch_limit = (display_limit > 0).then(|| display_limit + 1);

        let (mut result, received) = self.list_events(course_id, Some(BLOCK_SORT), fetch_limit)?;
        if display_limit > 0 && received > display_limit as usize {
            result.more = true;
            result.videos.truncate(display_limit as usize);
        }
        Ok(result)
    }

    /// All videos visible to a course, optionally sorted (e.g. `title:ASC`).
    #[instrument(level = "debug", skip(self))]
    pub fn course_videos(&self, course_id: i64, sort: Option<&str>) -> Result<CourseVideos> {
        self.list_events(course_id, sort, None)
            .map(|(videos, _)| videos)
    }

    /// A single video read with the course's role.
    #[instrument(level = "debug", skip(self))]
    pub fn course_video(&self, course_id: i64, identifier: &str) -> Result<CourseVideo> {
        let roles = [self.course_role(course_id)?];
        let response = self.event(identifier, &roles)?;
        if !response.is_ok() {
            return Ok(CourseVideo {
                video: None,
                error: Some(response.status),
            });
        }
        Ok(CourseVideo {
            video: parse_entity(&response.body),
            error: None,
        })
    }
}
