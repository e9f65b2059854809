//! Drive model: an exam event owned by a company, with its lifecycle status.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DriveTarget, TargetSpec};

/// Title suffix given to a duplicated drive.
pub const DUPLICATE_TITLE_SUFFIX: &str = " (Copy)";

/// Lifecycle status of a drive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriveStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Upcoming,
    Live,
    Ongoing,
    Completed,
}

impl DriveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveStatus::Draft => "draft",
            DriveStatus::Submitted => "submitted",
            DriveStatus::Approved => "approved",
            DriveStatus::Rejected => "rejected",
            DriveStatus::Upcoming => "upcoming",
            DriveStatus::Live => "live",
            DriveStatus::Ongoing => "ongoing",
            DriveStatus::Completed => "completed",
        }
    }

    /// Parses a stored status. Older rows carry the upper-case enum names.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Some(DriveStatus::Draft),
            "submitted" => Some(DriveStatus::Submitted),
            "approved" => Some(DriveStatus::Approved),
            "rejected" => Some(DriveStatus::Rejected),
            "upcoming" => Some(DriveStatus::Upcoming),
            "live" => Some(DriveStatus::Live),
            "ongoing" => Some(DriveStatus::Ongoing),
            "completed" => Some(DriveStatus::Completed),
            _ => None,
        }
    }
}

/// Kind of questions a drive contains.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Aptitude,
    Coding,
    Technical,
    Hr,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Aptitude => "aptitude",
            QuestionType::Coding => "coding",
            QuestionType::Technical => "technical",
            QuestionType::Hr => "hr",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aptitude" => Some(QuestionType::Aptitude),
            "coding" => Some(QuestionType::Coding),
            "technical" => Some(QuestionType::Technical),
            "hr" => Some(QuestionType::Hr),
            _ => None,
        }
    }
}

/// Which drives an admin list shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DriveReviewFilter {
    /// Submitted and awaiting review
    #[default]
    Pending,
    Approved,
    Rejected,
    All,
}

impl DriveReviewFilter {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DriveReviewFilter::Pending),
            "approved" => Some(DriveReviewFilter::Approved),
            "rejected" => Some(DriveReviewFilter::Rejected),
            "all" => Some(DriveReviewFilter::All),
            _ => None,
        }
    }

    /// SQL condition over the `drives d` alias.
    pub fn condition(&self) -> &'static str {
        match self {
            DriveReviewFilter::Pending => "LOWER(d.status) = 'submitted' AND d.is_approved = 0",
            DriveReviewFilter::Approved => "d.is_approved = 1",
            DriveReviewFilter::Rejected => "LOWER(d.status) = 'rejected'",
            DriveReviewFilter::All => "1 = 1",
        }
    }
}

/// A drive with its resolved targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drive {
    pub id: i64,
    pub company_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub question_type: QuestionType,
    pub targets: Vec<DriveTarget>,
    pub duration_minutes: i64,
    pub scheduled_start: Option<String>,
    pub status: DriveStatus,
    pub is_approved: bool,
    pub admin_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_count: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a drive.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDriveRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub question_type: QuestionType,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub scheduled_start: Option<String>,
}

/// Request body for updating a drive. Omitted fields keep their value;
/// `targets`, when present, replaces the whole target set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDriveRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub targets: Option<Vec<TargetSpec>>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub scheduled_start: Option<String>,
}

/// Request body for a company-driven status change.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveStatusUpdate {
    pub status: DriveStatus,
}

/// Admin review decision for a drive or a company.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDecision {
    pub is_approved: bool,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

/// Normalizes a schedule timestamp to RFC 3339.
///
/// Accepts full RFC 3339 as well as the zone-less `YYYY-MM-DDTHH:MM[:SS]` form sent by
/// `datetime-local` inputs, which is taken as UTC.
pub fn normalize_schedule(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc).to_rfc3339());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().to_rfc3339())
}
