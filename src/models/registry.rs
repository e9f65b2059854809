//! College and student-group registries.
//!
//! Both registries hold the same shape of row, so a single entry type is shared and the
//! [`Registry`] selector picks the table.

use serde::{Deserialize, Serialize};

/// Which reference registry an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registry {
    College,
    StudentGroup,
}

impl Registry {
    pub fn table(&self) -> &'static str {
        match self {
            Registry::College => "colleges",
            Registry::StudentGroup => "student_groups",
        }
    }

    /// Human-readable label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Registry::College => "College",
            Registry::StudentGroup => "Student group",
        }
    }
}

/// A named reference entity (college or student group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: i64,
    pub name: String,
    pub is_approved: bool,
    pub created_at: String,
}

/// Request body for creating a registry entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRegistryEntryRequest {
    pub name: String,
}

/// Request body for renaming or (un)approving a registry entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRegistryEntryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_approved: Option<bool>,
}

pub const SEED_COLLEGES: &[&str] = &[
    "IIT Delhi",
    "IIT Bombay",
    "IIT Madras",
    "IIT Kanpur",
    "IIT Kharagpur",
    "NIT Trichy",
    "NIT Warangal",
    "NIT Surathkal",
    "NIT Calicut",
    "BITS Pilani",
    "VIT Vellore",
    "Manipal Institute of Technology",
    "Delhi University",
    "Mumbai University",
    "Pune University",
    "Anna University",
    "Jadavpur University",
    "Osmania University",
];

pub const SEED_STUDENT_GROUPS: &[&str] = &[
    "Computer Science Engineering",
    "Information Technology",
    "Electronics & Communication",
    "Mechanical Engineering",
    "Civil Engineering",
    "Electrical Engineering",
    "MBA Students",
    "MCA Students",
    "B.Tech Final Year",
    "M.Tech Students",
    "PhD Scholars",
    "Diploma Students",
    "Data Science Students",
    "AI/ML Students",
    "Cybersecurity Students",
];
