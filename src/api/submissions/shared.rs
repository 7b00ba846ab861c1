use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentActor;
use crate::core::state::AppState;
use crate::schemas::submission::SubmissionResponse;
use crate::schemas::ApiResponse;
use crate::services::workflow;

pub(super) async fn get_submission(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(submission_id): Path<String>,
) -> Result<Json<ApiResponse<SubmissionResponse>>, ApiError> {
    let view = workflow::view(&state, &actor, &submission_id).await?;
    Ok(Json(ApiResponse::ok(SubmissionResponse::detail(view, actor.role))))
}
