//! Drive targeting: which (college, student group, batch) audiences a drive is open to.

use serde::{Deserialize, Serialize};

/// Shown when a target references a college that has since been deleted.
pub const UNKNOWN_COLLEGE: &str = "Unknown College";
/// Shown when a target references a student group that has since been deleted.
pub const UNKNOWN_GROUP: &str = "Unknown Group";

/// One audience specification supplied by a company.
///
/// Either the reference id or the custom name is expected per axis; a custom name that
/// is not yet in the registry is added to it unapproved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    #[serde(default)]
    pub college_id: Option<i64>,
    #[serde(default)]
    pub custom_college_name: Option<String>,
    #[serde(default)]
    pub student_group_id: Option<i64>,
    #[serde(default)]
    pub custom_student_group_name: Option<String>,
    #[serde(default)]
    pub batch_year: Option<String>,
}

impl TargetSpec {
    /// Trims free-text fields and turns blank strings into `None`.
    pub fn normalized(&self) -> Self {
        Self {
            college_id: self.college_id,
            custom_college_name: non_blank(&self.custom_college_name),
            student_group_id: self.student_group_id,
            custom_student_group_name: non_blank(&self.custom_student_group_name),
            batch_year: non_blank(&self.batch_year),
        }
    }
}

/// Request body for replacing a drive's targets.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceTargetsRequest {
    pub targets: Vec<TargetSpec>,
}

/// A persisted target with display names resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveTarget {
    pub id: i64,
    pub college_id: Option<i64>,
    pub custom_college_name: Option<String>,
    pub college_name: Option<String>,
    pub student_group_id: Option<i64>,
    pub custom_student_group_name: Option<String>,
    pub student_group_name: Option<String>,
    pub batch_year: Option<String>,
}

/// Resolves the name to display for one targeting axis.
///
/// The custom name wins; otherwise the registry name found for the reference id is used.
/// A reference id with no registry row resolves to `placeholder` rather than failing.
pub fn resolve_display_name(
    custom_name: Option<&str>,
    reference_id: Option<i64>,
    registry_name: Option<&str>,
    placeholder: &str,
) -> Option<String> {
    if let Some(custom) = custom_name.filter(|name| !name.is_empty()) {
        return Some(custom.to_string());
    }
    reference_id?;
    Some(registry_name.unwrap_or(placeholder).to_string())
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
