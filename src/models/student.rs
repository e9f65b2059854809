//! Student model: an exam participant registered against a drive.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub drive_id: i64,
    pub company_id: i64,
    pub roll_number: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudentRequest {
    pub roll_number: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterStudentsRequest {
    pub students: Vec<CreateStudentRequest>,
}
