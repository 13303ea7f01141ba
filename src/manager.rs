use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{LessonError, Result};
use crate::invoker::{CaptureMode, Invoker};
use crate::models::Lesson;
use crate::normalize::{normalize, SortOrder};

const NOTEBOOK_EXTENSION: &str = "ipynb";

/// Orchestrates the external grading tool. Configured once at startup,
/// stateless across requests; every listing is recomputed from the
/// tool's current output.
pub struct LessonManager {
    invoker: Box<dyn Invoker>,
    grader: String,
    lesson_dir: PathBuf,
}

impl LessonManager {
    pub fn new(config: &Config, invoker: Box<dyn Invoker>) -> Self {
        LessonManager {
            invoker,
            grader: config.grader_command.clone(),
            lesson_dir: config.lesson_dir.clone(),
        }
    }

    /// Lessons released for this user, including ones already fetched
    /// locally, sorted by `(course_id, assignment_id)`.
    pub async fn list_released(&self) -> Result<Vec<Lesson>> {
        self.list(&["list", "--json"], SortOrder::CourseAssignment).await
    }

    /// Cached submissions, most recent first.
    pub async fn list_submitted(&self) -> Result<Vec<Lesson>> {
        self.list(&["list", "--json", "--cached"], SortOrder::TimestampDesc).await
    }

    /// Released then submitted, concatenated in that order. No re-sort
    /// across the groups and no dedup: an assignment that is both
    /// released and submitted appears twice. Fails if either half does.
    pub async fn list_all(&self) -> Result<Vec<Lesson>> {
        let mut lessons = self.list_released().await?;
        lessons.extend(self.list_submitted().await?);
        Ok(lessons)
    }

    pub async fn fetch(&self, course_id: &str, assignment_id: &str) -> Result<()> {
        self.run_action("fetch", course_id, assignment_id).await
    }

    pub async fn submit(&self, course_id: &str, assignment_id: &str) -> Result<()> {
        self.run_action("submit", course_id, assignment_id).await
    }

    /// Validate one notebook of a fetched assignment. The tool's stdout
    /// is returned verbatim; it is the tool's own JSON report and we do
    /// not reinterpret it.
    pub async fn validate(&self, assignment_id: &str, notebook_id: &str) -> Result<String> {
        let target = Path::new(assignment_id)
            .join(format!("{}.{}", notebook_id, NOTEBOOK_EXTENSION))
            .to_string_lossy()
            .into_owned();
        let out = self
            .invoker
            .run(&self.grader, &["validate", "--json", &target], &self.lesson_dir, CaptureMode::Split)
            .await?;
        if !out.success() {
            return Err(LessonError::ToolFailure {
                exit_code: out.exit_code,
                output: out.stderr_text(),
            });
        }
        Ok(out.stdout_text())
    }

    async fn list(&self, args: &[&str], order: SortOrder) -> Result<Vec<Lesson>> {
        let out = self
            .invoker
            .run(&self.grader, args, &self.lesson_dir, CaptureMode::Split)
            .await?;
        if !out.success() {
            return Err(LessonError::ToolFailure {
                exit_code: out.exit_code,
                output: out.stderr_text(),
            });
        }
        normalize(&out.stdout, &self.lesson_dir, order)
    }

    async fn run_action(&self, verb: &str, course_id: &str, assignment_id: &str) -> Result<()> {
        let out = self
            .invoker
            .run(
                &self.grader,
                &[verb, "--course", course_id, assignment_id],
                &self.lesson_dir,
                CaptureMode::Merged,
            )
            .await?;
        if !out.success() {
            // Merged capture: everything the tool printed is in stdout.
            let output = out.stdout_text();
            tracing::error!(verb, course_id, assignment_id, %output, "grader action failed");
            return Err(LessonError::ToolFailure {
                exit_code: out.exit_code,
                output,
            });
        }
        Ok(())
    }
}
