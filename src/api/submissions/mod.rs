mod instructor;
mod shared;
mod student;

use axum::{routing::get, routing::post, routing::put, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        // Student endpoints
        .route("/", post(student::start_attempt))
        .route("/:submission_id/submit", post(student::submit))
        // Instructor endpoints
        .route("/assessment/:assessment_id", get(instructor::list_by_assessment))
        .route("/assessment/:assessment_id/summary", get(instructor::assessment_summary))
        .route("/assessment/:assessment_id/overview", get(instructor::assessment_overview))
        .route("/course/:course_id", get(instructor::list_by_course))
        .route("/course/:course_id/summary", get(instructor::course_summary))
        .route("/:submission_id/grade", put(instructor::grade))
        .route("/:submission_id/suggested-grade", get(instructor::suggested_grade))
        // Owner or instructor
        .route("/:submission_id", get(shared::get_submission).put(student::save_draft))
}
