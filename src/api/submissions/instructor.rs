use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use time::OffsetDateTime;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentActor;
use crate::api::pagination::PagedResponse;
use crate::core::state::AppState;
use crate::schemas::submission::{
    GradeRequest, ListSubmissionsQuery, SubmissionResponse, SuggestedGradeResponse,
    SummaryResponse,
};
use crate::schemas::ApiResponse;
use crate::services::workflow::{self, ListParams, ScopeKind};

#[derive(Debug, Serialize)]
pub(super) struct OverviewResponse {
    #[serde(flatten)]
    list: PagedResponse<SubmissionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<SummaryResponse>,
}

impl From<ListSubmissionsQuery> for ListParams {
    fn from(query: ListSubmissionsQuery) -> Self {
        Self { page: query.page, limit: query.limit, status: query.status }
    }
}

pub(super) async fn list_by_assessment(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(assessment_id): Path<String>,
    Query(query): Query<ListSubmissionsQuery>,
) -> Result<Json<PagedResponse<SubmissionResponse>>, ApiError> {
    let params = ListParams::from(query);
    let page =
        workflow::list(&state, &actor, ScopeKind::Assessment, &assessment_id, &params).await?;

    Ok(Json(PagedResponse::from_page(page, SubmissionResponse::from)))
}

pub(super) async fn list_by_course(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(course_id): Path<String>,
    Query(query): Query<ListSubmissionsQuery>,
) -> Result<Json<PagedResponse<SubmissionResponse>>, ApiError> {
    let params = ListParams::from(query);
    let page = workflow::list(&state, &actor, ScopeKind::Course, &course_id, &params).await?;

    Ok(Json(PagedResponse::from_page(page, SubmissionResponse::from)))
}

pub(super) async fn assessment_summary(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(assessment_id): Path<String>,
) -> Result<Json<ApiResponse<SummaryResponse>>, ApiError> {
    let summary =
        workflow::summarize(&state, &actor, ScopeKind::Assessment, &assessment_id).await?;
    Ok(Json(ApiResponse::ok(SummaryResponse::from(summary))))
}

pub(super) async fn course_summary(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(course_id): Path<String>,
) -> Result<Json<ApiResponse<SummaryResponse>>, ApiError> {
    let summary = workflow::summarize(&state, &actor, ScopeKind::Course, &course_id).await?;
    Ok(Json(ApiResponse::ok(SummaryResponse::from(summary))))
}

pub(super) async fn assessment_overview(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(assessment_id): Path<String>,
    Query(query): Query<ListSubmissionsQuery>,
) -> Result<Json<OverviewResponse>, ApiError> {
    let params = ListParams::from(query);
    let overview = workflow::overview(&state, &actor, &assessment_id, &params).await?;

    Ok(Json(OverviewResponse {
        list: PagedResponse::from_page(overview.page, SubmissionResponse::from),
        summary: overview.summary.map(SummaryResponse::from),
    }))
}

pub(super) async fn suggested_grade(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(submission_id): Path<String>,
) -> Result<Json<ApiResponse<SuggestedGradeResponse>>, ApiError> {
    let (view, evaluation) = workflow::suggest_grade(&state, &actor, &submission_id).await?;
    Ok(Json(ApiResponse::ok(SuggestedGradeResponse::new(view, evaluation))))
}

pub(super) async fn grade(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(submission_id): Path<String>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<ApiResponse<SubmissionResponse>>, ApiError> {
    payload.validate().map_err(ApiError::invalid_payload)?;

    let view = workflow::grade(
        &state,
        &actor,
        &submission_id,
        &payload.score,
        payload.feedback,
        OffsetDateTime::now_utc(),
    )
    .await?;

    Ok(Json(ApiResponse::ok(SubmissionResponse::detail(view, actor.role))))
}
