use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use time::OffsetDateTime;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentActor;
use crate::core::state::AppState;
use crate::schemas::submission::{SaveDraftRequest, StartAttemptRequest, SubmissionResponse};
use crate::schemas::ApiResponse;
use crate::services::workflow;

pub(super) async fn start_attempt(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubmissionResponse>>), ApiError> {
    let submission = workflow::start_attempt(
        &state,
        &actor,
        &payload.assessment_id,
        OffsetDateTime::now_utc(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(SubmissionResponse::from(submission)))))
}

pub(super) async fn save_draft(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(submission_id): Path<String>,
    Json(payload): Json<SaveDraftRequest>,
) -> Result<Json<ApiResponse<SubmissionResponse>>, ApiError> {
    payload.validate().map_err(ApiError::invalid_payload)?;

    let submission = workflow::save_draft(
        &state,
        &actor,
        &submission_id,
        payload.answers,
        payload.attachments,
        OffsetDateTime::now_utc(),
    )
    .await?;

    Ok(Json(ApiResponse::ok(SubmissionResponse::from(submission))))
}

pub(super) async fn submit(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(submission_id): Path<String>,
) -> Result<Json<ApiResponse<SubmissionResponse>>, ApiError> {
    let submission =
        workflow::submit(&state, &actor, &submission_id, OffsetDateTime::now_utc()).await?;

    Ok(Json(ApiResponse::ok(SubmissionResponse::from(submission))))
}
