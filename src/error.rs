use axum::response::{IntoResponse, Response};
use http::StatusCode;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, LessonError>;

/// Failures the manager can report. None of these are recovered from
/// locally; they propagate to the HTTP layer as typed values.
#[derive(thiserror::Error, Debug)]
pub enum LessonError {
    /// The grader command could not be started at all (missing binary,
    /// permission denied). Distinct from a run that completed non-zero.
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The grader exited 0 but its output is not the JSON we expect.
    #[error("grader produced unparseable output: {0}")]
    MalformedOutput(#[from] serde_json::Error),

    /// The grader exited non-zero; `output` is the captured diagnostic
    /// text (stderr, or merged stdout+stderr for fetch/submit).
    #[error("grader exited with code {exit_code}")]
    ToolFailure { exit_code: i32, output: String },

    #[error("grader did not finish within {limit:?}")]
    Timeout { limit: Duration },
}

impl IntoResponse for LessonError {
    fn into_response(self) -> Response {
        let status = match &self {
            LessonError::Launch { .. } | LessonError::MalformedOutput(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            LessonError::ToolFailure { .. } => StatusCode::BAD_GATEWAY,
            LessonError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        };
        tracing::error!(error = %self, "lesson operation failed");
        let body = match self {
            LessonError::ToolFailure { exit_code, output } => {
                format!("grader exited with code {}\n{}", exit_code, output)
            }
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}
