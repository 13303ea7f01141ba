use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{Lesson, STATUS_FETCHED};

/// Which key the caller wants the listing ordered by. This is a property
/// of the operation (released vs. submitted listing), not of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// `(course_id, assignment_id)` ascending.
    CourseAssignment,
    /// `timestamp` descending, most recent first.
    TimestampDesc,
}

/// Parse raw grader output into lessons, rewrite every path relative to
/// `lesson_dir`, join `prepend` into the assignment id for fetched
/// records, and sort. Parse failure is `MalformedOutput`.
pub fn normalize(raw: &[u8], lesson_dir: &Path, order: SortOrder) -> Result<Vec<Lesson>> {
    let mut lessons: Vec<Lesson> = serde_json::from_slice(raw)?;

    for lesson in &mut lessons {
        // Path-join, not string concat, so separators stay correct.
        if lesson.status == STATUS_FETCHED {
            if let Some(prepend) = lesson.prepend.as_deref().filter(|p| !p.is_empty()) {
                lesson.assignment_id = Path::new(prepend)
                    .join(&lesson.assignment_id)
                    .to_string_lossy()
                    .into_owned();
            }
        }
        // The relative rewrite is unconditional; only the prepend join
        // above depends on status.
        if let Some(path) = lesson.path.take() {
            lesson.path = Some(relative_to(&path, lesson_dir));
        }
        for notebook in &mut lesson.notebooks {
            if let Some(path) = notebook.path.take() {
                notebook.path = Some(relative_to(&path, lesson_dir));
            }
        }
    }

    match order {
        SortOrder::CourseAssignment => lessons.sort_by(|a, b| {
            (a.course_id.as_str(), a.assignment_id.as_str())
                .cmp(&(b.course_id.as_str(), b.assignment_id.as_str()))
        }),
        // Option ordering puts records without a timestamp last.
        SortOrder::TimestampDesc => lessons.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
    }

    Ok(lessons)
}

/// Express `path` relative to `base`. Absolute paths outside `base` get
/// `..` components; paths that are already relative are left alone. A
/// relative base (the default `.`) is anchored at the working directory
/// first, so absolute grader paths still come out relative.
fn relative_to(path: &str, base: &Path) -> String {
    let p = Path::new(path);
    if !p.is_absolute() {
        return path.to_string();
    }
    let anchored;
    let base = if base.is_absolute() {
        base
    } else {
        match std::env::current_dir() {
            Ok(cwd) => {
                anchored = cwd.join(base);
                anchored.as_path()
            }
            // Nothing to anchor against; leave the path as reported.
            Err(_) => return path.to_string(),
        }
    };
    if let Ok(rel) = p.strip_prefix(base) {
        return if rel.as_os_str().is_empty() {
            ".".to_string()
        } else {
            rel.to_string_lossy().into_owned()
        };
    }
    let base_parts: Vec<_> = base.components().collect();
    let path_parts: Vec<_> = p.components().collect();
    let shared = base_parts
        .iter()
        .zip(&path_parts)
        .take_while(|(a, b)| a == b)
        .count();
    let mut rel = PathBuf::new();
    for _ in shared..base_parts.len() {
        rel.push("..");
    }
    for part in &path_parts[shared..] {
        rel.push(part);
    }
    if rel.as_os_str().is_empty() {
        ".".to_string()
    } else {
        rel.to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LessonError;
    use serde_json::json;

    fn bytes(v: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&v).unwrap()
    }

    #[test]
    fn fetched_lesson_joins_prepend_and_relativizes() {
        let raw = bytes(json!([{
            "course_id": "course101",
            "assignment_id": "hw1",
            "status": "fetched",
            "prepend": "extra",
            "path": "/home/user/extra/hw1",
            "notebooks": [
                {"notebook_id": "problem1", "path": "/home/user/extra/hw1/problem1.ipynb"}
            ]
        }]));

        let lessons =
            normalize(&raw, Path::new("/home/user"), SortOrder::CourseAssignment).unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].assignment_id, "extra/hw1");
        assert_eq!(lessons[0].path.as_deref(), Some("extra/hw1"));
        assert_eq!(
            lessons[0].notebooks[0].path.as_deref(),
            Some("extra/hw1/problem1.ipynb")
        );
    }

    #[test]
    fn non_fetched_lesson_is_relativized_but_prepend_is_ignored() {
        let raw = bytes(json!([{
            "course_id": "course101",
            "assignment_id": "hw2",
            "status": "released",
            "prepend": "extra",
            "path": "/srv/lessons/hw2",
            "notebooks": []
        }]));

        let lessons =
            normalize(&raw, Path::new("/srv/lessons"), SortOrder::CourseAssignment).unwrap();
        assert_eq!(lessons[0].assignment_id, "hw2");
        assert_eq!(lessons[0].path.as_deref(), Some("hw2"));
    }

    #[test]
    fn absolute_inputs_under_base_never_stay_absolute() {
        let raw = bytes(json!([{
            "course_id": "c",
            "assignment_id": "a",
            "status": "fetched",
            "path": "/data/lessons/a",
            "notebooks": [{"notebook_id": "n", "path": "/data/lessons/a/n.ipynb"}]
        }]));

        let lessons =
            normalize(&raw, Path::new("/data/lessons"), SortOrder::CourseAssignment).unwrap();
        assert!(!lessons[0].path.as_deref().unwrap().starts_with('/'));
        assert!(!lessons[0].notebooks[0].path.as_deref().unwrap().starts_with('/'));
    }

    #[test]
    fn default_relative_base_still_relativizes_absolute_paths() {
        let cwd = std::env::current_dir().unwrap();
        let raw = bytes(json!([{
            "course_id": "c",
            "assignment_id": "hw1",
            "status": "fetched",
            "path": cwd.join("hw1").to_string_lossy(),
            "notebooks": [
                {"notebook_id": "n", "path": cwd.join("hw1/n.ipynb").to_string_lossy()}
            ]
        }]));

        // The out-of-the-box lesson dir is `.`; absolute grader paths
        // must still come back relative.
        let lessons = normalize(&raw, Path::new("."), SortOrder::CourseAssignment).unwrap();
        assert_eq!(lessons[0].path.as_deref(), Some("hw1"));
        assert_eq!(lessons[0].notebooks[0].path.as_deref(), Some("hw1/n.ipynb"));
    }

    #[test]
    fn relative_base_never_leaks_an_absolute_path() {
        let rel = relative_to("/definitely/elsewhere/hw1", Path::new("."));
        assert!(!rel.starts_with('/'), "absolute path leaked: {rel}");
    }

    #[test]
    fn path_outside_base_gets_parent_components() {
        assert_eq!(relative_to("/data/other/a", Path::new("/data/lessons")), "../other/a");
        assert_eq!(relative_to("/data/lessons", Path::new("/data/lessons")), ".");
    }

    #[test]
    fn released_listing_sorts_by_course_then_assignment() {
        let raw = bytes(json!([
            {"course_id": "b", "assignment_id": "hw1", "status": "released", "notebooks": []},
            {"course_id": "a", "assignment_id": "hw2", "status": "released", "notebooks": []},
            {"course_id": "a", "assignment_id": "hw1", "status": "released", "notebooks": []}
        ]));

        let lessons = normalize(&raw, Path::new("/x"), SortOrder::CourseAssignment).unwrap();
        let keys: Vec<_> = lessons
            .iter()
            .map(|l| (l.course_id.as_str(), l.assignment_id.as_str()))
            .collect();
        assert_eq!(keys, vec![("a", "hw1"), ("a", "hw2"), ("b", "hw1")]);
    }

    #[test]
    fn submitted_listing_sorts_most_recent_first() {
        let raw = bytes(json!([
            {"course_id": "c", "assignment_id": "hw1", "status": "submitted",
             "timestamp": "2026-01-02 10:00:00.000000 UTC", "notebooks": []},
            {"course_id": "c", "assignment_id": "hw2", "status": "submitted",
             "timestamp": "2026-03-01 09:00:00.000000 UTC", "notebooks": []},
            {"course_id": "c", "assignment_id": "hw3", "status": "submitted",
             "timestamp": "2026-02-15 23:59:59.000000 UTC", "notebooks": []}
        ]));

        let lessons = normalize(&raw, Path::new("/x"), SortOrder::TimestampDesc).unwrap();
        let ids: Vec<_> = lessons.iter().map(|l| l.assignment_id.as_str()).collect();
        assert_eq!(ids, vec!["hw2", "hw3", "hw1"]);
    }

    #[test]
    fn invalid_json_is_malformed_output() {
        let err = normalize(b"not json at all", Path::new("/x"), SortOrder::CourseAssignment)
            .unwrap_err();
        assert!(matches!(err, LessonError::MalformedOutput(_)));
    }

    #[test]
    fn wrong_shape_is_malformed_output() {
        let raw = bytes(json!({"course_id": "not-an-array"}));
        let err = normalize(&raw, Path::new("/x"), SortOrder::CourseAssignment).unwrap_err();
        assert!(matches!(err, LessonError::MalformedOutput(_)));
    }

    #[test]
    fn unknown_grader_fields_round_trip() {
        let raw = bytes(json!([{
            "course_id": "c",
            "assignment_id": "a",
            "status": "released",
            "notebooks": [],
            "student_id": "alice"
        }]));

        let lessons = normalize(&raw, Path::new("/x"), SortOrder::CourseAssignment).unwrap();
        let back = serde_json::to_value(&lessons).unwrap();
        assert_eq!(back[0]["student_id"], "alice");
    }
}
