//! Company model: a recruiter organisation that registers and runs drives.

use serde::{Deserialize, Serialize};

/// Value once stored in `logo_url` to mark a rejected company.
pub const LEGACY_REJECTED_LOGO_SENTINEL: &str = "REJECTED";

/// Review status of a company account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Pending => "pending",
            CompanyStatus::Approved => "approved",
            CompanyStatus::Rejected => "rejected",
            CompanyStatus::Suspended => "suspended",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Some(CompanyStatus::Pending),
            "approved" => Some(CompanyStatus::Approved),
            "rejected" => Some(CompanyStatus::Rejected),
            "suspended" => Some(CompanyStatus::Suspended),
            _ => None,
        }
    }

    /// Value of the legacy `is_approved` column for this status.
    pub fn is_approved(&self) -> bool {
        matches!(self, CompanyStatus::Approved)
    }
}

/// A registered company. The password hash never leaves the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub logo_url: Option<String>,
    pub is_approved: bool,
    pub status: CompanyStatus,
    pub admin_notes: Option<String>,
    pub reviewed_at: Option<String>,
    pub reviewed_by: Option<String>,
    pub created_at: String,
}

/// Request body for company self-registration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterCompanyRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// Request body for suspending a company.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuspendCompanyRequest {
    #[serde(default)]
    pub admin_notes: Option<String>,
}

/// Per-status company count, reported after the status backfill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}
