//! Question model: one exam question belonging to a drive.

use serde::{Deserialize, Serialize};

/// A stored question. Questions are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub drive_id: i64,
    pub question_text: String,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub correct_answer: Option<String>,
    pub difficulty: Option<String>,
    pub points: i64,
    pub created_at: String,
}

/// Request body for adding a question.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuestionRequest {
    pub question_text: String,
    #[serde(default)]
    pub option_a: Option<String>,
    #[serde(default)]
    pub option_b: Option<String>,
    #[serde(default)]
    pub option_c: Option<String>,
    #[serde(default)]
    pub option_d: Option<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default = "default_points")]
    pub points: Option<i64>,
}

fn default_points() -> Option<i64> {
    Some(1)
}

impl CreateQuestionRequest {
    /// Points to store; an explicit `null` also means the default of 1.
    pub fn points_or_default(&self) -> i64 {
        self.points.unwrap_or(1)
    }
}

/// Request body for bulk question upload.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkQuestionsRequest {
    pub questions: Vec<CreateQuestionRequest>,
}

/// Result of a bulk upload.
#[derive(Debug, Clone, Serialize)]
pub struct BulkUploadResult {
    pub message: String,
    pub count: usize,
}
