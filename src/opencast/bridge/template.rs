//! Placeholder substitution for course-scoped names.
//!
//! Group names, series titles and role names are configured as templates
//! containing `[COURSENAME]` and `[COURSEID]`.

use crate::opencast::bridge::directory::CourseDirectory;
use crate::opencast::bridge::error::Result;

/// Placeholder replaced with the full course name.
pub const COURSE_NAME: &str = "[COURSENAME]";
/// Placeholder replaced with the numeric course identifier.
pub const COURSE_ID: &str = "[COURSEID]";

/// Renders `template` for the given course. The directory is only consulted
/// when the template references the course name.
pub fn render(template: &str, course_id: i64, directory: &dyn CourseDirectory) -> Result<String> {
    let named = if template.contains(COURSE_NAME) {
        let course_name = directory.course_name(course_id)?;
        template.replace(COURSE_NAME, &course_name)
    } else {
        template.to_string()
    };

    Ok(named.replace(COURSE_ID, &course_id.to_string()))
}

/// Derives the remote group identifier from a rendered group name.
pub fn group_identifier(group_name: &str) -> String {
    group_name
        .to_lowercase()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Recovers the course identifier from a value rendered with `template`.
///
/// Only templates whose single placeholder is `[COURSEID]` can be inverted;
/// anything else yields `None`.
pub fn match_course_id(template: &str, rendered: &str) -> Option<i64> {
    if template.contains(COURSE_NAME) {
        return None;
    }

    let (prefix, suffix) = template.split_once(COURSE_ID)?;
    if suffix.contains(COURSE_ID) {
        return None;
    }

    let digits = rendered.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
