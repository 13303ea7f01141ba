use axum::{
    extract::{Path, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use http::StatusCode;
use serde::Deserialize;
use std::sync::Arc;

use crate::manager::LessonManager;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<LessonManager>,
    pub api_token: Option<String>,
}

/// Form fields for `POST /lessons/{action}`. All optional at the serde
/// level; each handler rejects what it actually requires with a 400.
#[derive(Deserialize, Debug, Clone)]
pub struct LessonActionParams {
    pub course_id: Option<String>,
    pub assignment_id: Option<String>,
    pub notebook_id: Option<String>,
}

/// Closed set of actions; the path segment deserializes straight into
/// this, so an unknown action is rejected before any handler runs.
#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LessonAction {
    Fetch,
    Submit,
    Validate,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/lessons", get(list_lessons))
        .route("/lessons/:action", post(lesson_action))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

/// Static bearer-token check. With no token configured the routes are
/// open and authentication is the deployment's concern.
async fn require_token(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(expected) = &state.api_token {
        let presented = auth.as_ref().map(|TypedHeader(Authorization(bearer))| bearer.token());
        if presented != Some(expected.as_str()) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }
    next.run(request).await
}

async fn list_lessons(State(state): State<AppState>) -> Response {
    match state.manager.list_all().await {
        Ok(lessons) => Json(lessons).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn lesson_action(
    State(state): State<AppState>,
    Path(action): Path<LessonAction>,
    Form(params): Form<LessonActionParams>,
) -> Response {
    let assignment_id = match params.assignment_id.as_deref() {
        Some(a) => a,
        None => return e400("assignment_id is required"),
    };
    match action {
        LessonAction::Fetch | LessonAction::Submit => {
            let course_id = match params.course_id.as_deref() {
                Some(c) => c,
                None => return e400("course_id is required"),
            };
            let outcome = match action {
                LessonAction::Fetch => state.manager.fetch(course_id, assignment_id).await,
                _ => state.manager.submit(course_id, assignment_id).await,
            };
            if let Err(e) = outcome {
                return e.into_response();
            }
            // Always a fresh listing, never a pre-action snapshot.
            match state.manager.list_all().await {
                Ok(lessons) => Json(lessons).into_response(),
                Err(e) => e.into_response(),
            }
        }
        LessonAction::Validate => {
            let notebook_id = match params.notebook_id.as_deref() {
                Some(n) => n,
                None => return e400("notebook_id is required"),
            };
            match state.manager.validate(assignment_id, notebook_id).await {
                // The report is already JSON; encode it once more as a
                // plain string, exactly as the tool printed it.
                Ok(report) => Json(report).into_response(),
                Err(e) => e.into_response(),
            }
        }
    }
}

fn e400(msg: &str) -> Response {
    (StatusCode::BAD_REQUEST, msg.to_string()).into_response()
}
