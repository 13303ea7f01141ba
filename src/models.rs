use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status string the grader reports for an assignment that has been
/// copied into the local lesson directory.
pub const STATUS_FETCHED: &str = "fetched";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Lesson {
    pub course_id: String,
    pub assignment_id: String,
    /// State as reported by the grader ("released", "fetched",
    /// "submitted", ...). Only "fetched" is special-cased here.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>, // relative to LESSON_DIR after normalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepend: Option<String>,
    #[serde(default)]
    pub notebooks: Vec<Notebook>,
    /// Submission time; present only for submitted lessons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Anything else the grader emits is passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Notebook {
    pub notebook_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
