use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentActor;
use crate::core::state::AppState;
use crate::schemas::assessment::AssessmentResponse;
use crate::schemas::ApiResponse;
use crate::services::workflow;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:assessment_id", get(get_assessment))
        .route("/courses/:course_id", get(list_course_assessments))
}

async fn get_assessment(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(assessment_id): Path<String>,
) -> Result<Json<ApiResponse<AssessmentResponse>>, ApiError> {
    let assessment = workflow::get_assessment(&state, &actor, &assessment_id).await?;
    Ok(Json(ApiResponse::ok(AssessmentResponse::for_role(assessment, actor.role))))
}

async fn list_course_assessments(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(course_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<AssessmentResponse>>>, ApiError> {
    let assessments = workflow::course_assessments(&state, &actor, &course_id).await?;
    let data = assessments
        .into_iter()
        .map(|assessment| AssessmentResponse::for_role(assessment, actor.role))
        .collect();

    Ok(Json(ApiResponse::ok(data)))
}
