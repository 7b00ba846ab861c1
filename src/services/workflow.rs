use std::collections::HashSet;

use serde_json::Value;
use time::OffsetDateTime;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::to_primitive_utc;
use crate::db::models::{Answer, Assessment, Submission};
use crate::db::types::{ActorRole, SubmissionStatus};
use crate::repositories::{
    DraftUpdate, NewSubmission, StoreError, SubmissionFilter, SubmissionScope, SubmitUpdate,
};
use crate::services::access::{authorize, ensure_can_view, ensure_owner, Action, Actor};
use crate::services::catalog::CatalogError;
use crate::services::errors::ServiceError;
use crate::services::grading::{self, Evaluation};
use crate::services::identifiers::{generate_id, validate_id};
use crate::services::listing::{self, Page, PageRequest};
use crate::services::single_flight::{FlightAction, FlightKey};
use crate::services::state_machine::{is_late, next_status, Transition};
use crate::services::summary::{self, Summary};

/// A submission together with the assessment it answers.
#[derive(Debug, Clone)]
pub(crate) struct SubmissionView {
    pub(crate) submission: Submission,
    pub(crate) assessment: Assessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    Assessment,
    Course,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ListParams {
    pub(crate) page: Option<String>,
    pub(crate) limit: Option<String>,
    pub(crate) status: Option<String>,
}

#[derive(Debug)]
pub(crate) struct Overview {
    pub(crate) page: Page<Submission>,
    pub(crate) summary: Option<Summary>,
}

pub(crate) async fn get_assessment(
    state: &AppState,
    actor: &Actor,
    raw_id: &str,
) -> Result<Assessment, ServiceError> {
    let id = authorize(actor, Action::ViewAssessment, "assessmentId", raw_id)?;
    let assessment = load_assessment(state, &id).await?;

    if actor.role == ActorRole::Student && !assessment.is_published {
        return Err(ServiceError::NotFound("assessment"));
    }

    Ok(assessment)
}

pub(crate) async fn course_assessments(
    state: &AppState,
    actor: &Actor,
    raw_course_id: &str,
) -> Result<Vec<Assessment>, ServiceError> {
    let course_id = authorize(actor, Action::ViewAssessment, "courseId", raw_course_id)?;

    let mut assessments =
        state.catalog().course_assessments(&course_id).await.map_err(|err| match err {
            CatalogError::NotFound => ServiceError::NotFound("course"),
            other => ServiceError::Catalog(other),
        })?;

    if actor.role == ActorRole::Student {
        assessments.retain(|assessment| assessment.is_published);
    }
    assessments.sort_by_key(|assessment| assessment.order);

    Ok(assessments)
}

/// Opens the next attempt as a draft. Attempt numbers continue from the highest
/// existing one for this student and assessment.
pub(crate) async fn start_attempt(
    state: &AppState,
    actor: &Actor,
    raw_assessment_id: &str,
    now: OffsetDateTime,
) -> Result<Submission, ServiceError> {
    let assessment_id = authorize(actor, Action::StartAttempt, "assessmentId", raw_assessment_id)?;
    let assessment = load_assessment(state, &assessment_id).await?;

    if !assessment.is_published {
        return Err(ServiceError::NotFound("assessment"));
    }
    if assessment.start_date.is_some_and(|start| now < start) {
        return Err(ServiceError::validation("assessmentId", "Assessment is not open yet"));
    }

    let course_id = validate_id("courseId", &assessment.course_id)?;
    let latest = state.store().latest_attempt_number(&assessment_id, &actor.id).await?;

    let params = NewSubmission {
        id: generate_id(),
        assessment_id: assessment_id.clone(),
        course_id,
        student_id: actor.id.clone(),
        attempt_number: latest + 1,
        created_at: to_primitive_utc(now),
    };

    let submission = state.store().insert(params).await.map_err(|err| match err {
        StoreError::DuplicateAttempt { attempt_number } => ServiceError::validation(
            "attemptNumber",
            format!("Attempt {attempt_number} already exists for this assessment"),
        ),
        other => ServiceError::Store(other),
    })?;

    metrics::submission_transitioned(submission.status);
    tracing::info!(
        submission_id = %submission.id,
        assessment_id = %assessment_id,
        student_id = %actor.id,
        attempt_number = submission.attempt_number,
        "Submission attempt started"
    );

    Ok(submission)
}

pub(crate) async fn save_draft(
    state: &AppState,
    actor: &Actor,
    raw_id: &str,
    answers: Option<Vec<Answer>>,
    attachments: Option<Vec<String>>,
    now: OffsetDateTime,
) -> Result<Submission, ServiceError> {
    let id = authorize(actor, Action::SaveDraft, "submissionId", raw_id)?;
    let submission = load_submission(state, &id).await?;
    ensure_owner(actor, &submission)?;
    next_status(submission.status, Transition::SaveDraft)?;

    let answers = match answers {
        Some(answers) => {
            let assessment = load_assessment(state, &submission.assessment_id).await?;
            Some(sanitize_answers(&assessment, answers)?)
        }
        None => None,
    };
    let attachments = attachments.map(sanitize_attachments);

    let update = DraftUpdate { answers, attachments, updated_at: to_primitive_utc(now) };
    match state.store().save_draft(&id, update).await? {
        Some(saved) => Ok(saved),
        None => Err(rejected_by_guard(state, &id, Transition::SaveDraft).await),
    }
}

/// Moves a draft to `submitted`, or `late` when `now` is past the deadline. The
/// outcome is fixed here and never recomputed.
pub(crate) async fn submit(
    state: &AppState,
    actor: &Actor,
    raw_id: &str,
    now: OffsetDateTime,
) -> Result<Submission, ServiceError> {
    let id = authorize(actor, Action::Submit, "submissionId", raw_id)?;
    let key = FlightKey::new(FlightAction::Submit, &actor.id, &id);

    state
        .flights()
        .run_exclusive(key, || async move {
            let submission = load_submission(state, &id).await?;
            ensure_owner(actor, &submission)?;

            let assessment = load_assessment(state, &submission.assessment_id).await?;
            let transition = Transition::Submit { late: is_late(assessment.end_date, now) };
            let status = next_status(submission.status, transition)?;

            // Attempt uniqueness is enforced by the store at insert.
            ensure_required_answered(&assessment, &submission.answers)?;

            let update = SubmitUpdate {
                status,
                submitted_at: to_primitive_utc(now),
                validated_at: submission.updated_at,
            };
            let Some(saved) = state.store().mark_submitted(&id, update).await? else {
                return Err(rejected_by_guard(state, &id, transition).await);
            };

            metrics::submission_transitioned(saved.status);
            tracing::info!(
                submission_id = %saved.id,
                assessment_id = %saved.assessment_id,
                status = saved.status.as_str(),
                "Submission submitted"
            );

            Ok(saved)
        })
        .await
}

/// Commits an instructor grade. Re-grading a graded submission overwrites score and
/// feedback and refreshes `gradedAt`; status stays `graded`.
pub(crate) async fn grade(
    state: &AppState,
    actor: &Actor,
    raw_id: &str,
    raw_score: &Value,
    feedback: Option<String>,
    now: OffsetDateTime,
) -> Result<SubmissionView, ServiceError> {
    let id = authorize(actor, Action::Grade, "submissionId", raw_id)?;
    let key = FlightKey::new(FlightAction::Grade, &actor.id, &id);

    state
        .flights()
        .run_exclusive(key, || async move {
            let submission = load_submission(state, &id).await?;
            let assessment = load_assessment(state, &submission.assessment_id).await?;
            let previous = submission.status;

            let update =
                grading::grade(&assessment, &submission, raw_score, feedback, &actor.id, now)?;
            let Some(saved) = state.store().record_grade(&id, update).await? else {
                return Err(rejected_by_guard(state, &id, Transition::Grade).await);
            };

            metrics::submission_transitioned(saved.status);
            tracing::info!(
                submission_id = %saved.id,
                grader_id = %actor.id,
                score = saved.score,
                percentage = saved.percentage,
                regrade = previous == SubmissionStatus::Graded,
                "Submission graded"
            );

            Ok(SubmissionView { submission: saved, assessment })
        })
        .await
}

pub(crate) async fn suggest_grade(
    state: &AppState,
    actor: &Actor,
    raw_id: &str,
) -> Result<(SubmissionView, Evaluation), ServiceError> {
    let id = authorize(actor, Action::SuggestGrade, "submissionId", raw_id)?;
    let submission = load_submission(state, &id).await?;
    let assessment = load_assessment(state, &submission.assessment_id).await?;

    let evaluation = grading::evaluate(&assessment, &submission.answers);
    Ok((SubmissionView { submission, assessment }, evaluation))
}

pub(crate) async fn view(
    state: &AppState,
    actor: &Actor,
    raw_id: &str,
) -> Result<SubmissionView, ServiceError> {
    let id = authorize(actor, Action::ViewSubmission, "submissionId", raw_id)?;
    let submission = load_submission(state, &id).await?;
    ensure_can_view(actor, &submission)?;

    let assessment = load_assessment(state, &submission.assessment_id).await?;
    Ok(SubmissionView { submission, assessment })
}

pub(crate) async fn list(
    state: &AppState,
    actor: &Actor,
    kind: ScopeKind,
    raw_id: &str,
    params: &ListParams,
) -> Result<Page<Submission>, ServiceError> {
    let scope = resolve_scope(actor, Action::List, kind, raw_id)?;
    let request = PageRequest::parse(
        params.page.as_deref(),
        params.limit.as_deref(),
        state.settings().grading(),
    )?;
    let status = listing::parse_status_filter(params.status.as_deref())?;

    listing::list(state.store(), &SubmissionFilter::new(scope, status), request).await
}

pub(crate) async fn summarize(
    state: &AppState,
    actor: &Actor,
    kind: ScopeKind,
    raw_id: &str,
) -> Result<Summary, ServiceError> {
    let scope = resolve_scope(actor, Action::Summarize, kind, raw_id)?;
    Ok(summary::summarize(state.store(), &scope).await)
}

/// Listing plus best-effort summary. The list is primary and its failures surface;
/// the summary is dropped when none of its fields could be computed.
pub(crate) async fn overview(
    state: &AppState,
    actor: &Actor,
    raw_assessment_id: &str,
    params: &ListParams,
) -> Result<Overview, ServiceError> {
    let (page, summary) = tokio::join!(
        list(state, actor, ScopeKind::Assessment, raw_assessment_id, params),
        summarize(state, actor, ScopeKind::Assessment, raw_assessment_id),
    );

    let page = page?;
    let summary = match summary {
        Ok(summary) if !summary.is_entirely_unavailable() => Some(summary),
        Ok(_) => {
            tracing::warn!(assessment_id = %raw_assessment_id, "Summary omitted from overview");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "Summary omitted from overview");
            None
        }
    };

    Ok(Overview { page, summary })
}

fn resolve_scope(
    actor: &Actor,
    action: Action,
    kind: ScopeKind,
    raw_id: &str,
) -> Result<SubmissionScope, ServiceError> {
    match kind {
        ScopeKind::Assessment => {
            authorize(actor, action, "assessmentId", raw_id).map(SubmissionScope::Assessment)
        }
        ScopeKind::Course => authorize(actor, action, "courseId", raw_id).map(SubmissionScope::Course),
    }
}

async fn load_submission(state: &AppState, id: &str) -> Result<Submission, ServiceError> {
    state.store().find_by_id(id).await?.ok_or(ServiceError::NotFound("submission"))
}

async fn load_assessment(state: &AppState, id: &str) -> Result<Assessment, ServiceError> {
    state.catalog().assessment(id).await.map_err(|err| match err {
        CatalogError::NotFound => ServiceError::NotFound("assessment"),
        other => ServiceError::Catalog(other),
    })
}

/// A guarded write matched no row: the record vanished, its status moved on, or it was
/// edited between the read and the write.
async fn rejected_by_guard(state: &AppState, id: &str, transition: Transition) -> ServiceError {
    match state.store().find_by_id(id).await {
        Ok(Some(current)) => match next_status(current.status, transition) {
            Err(err) => err,
            Ok(_) => ServiceError::Stale { action: transition.as_str() },
        },
        Ok(None) => ServiceError::NotFound("submission"),
        Err(err) => err.into(),
    }
}

fn sanitize_answers(
    assessment: &Assessment,
    mut answers: Vec<Answer>,
) -> Result<Vec<Answer>, ServiceError> {
    let mut seen = HashSet::new();

    for answer in &mut answers {
        if answer.question_index >= assessment.questions.len() {
            return Err(ServiceError::validation(
                "answers",
                format!("Question {} does not exist", answer.question_index),
            ));
        }
        if !seen.insert(answer.question_index) {
            return Err(ServiceError::validation(
                "answers",
                format!("Question {} is answered more than once", answer.question_index),
            ));
        }
        answer.is_correct = None;
        answer.points_earned = None;
    }

    answers.sort_by_key(|answer| answer.question_index);
    Ok(answers)
}

fn sanitize_attachments(attachments: Vec<String>) -> Vec<String> {
    attachments
        .into_iter()
        .map(|reference| reference.trim().to_string())
        .filter(|reference| !reference.is_empty())
        .collect()
}

fn ensure_required_answered(assessment: &Assessment, answers: &[Answer]) -> Result<(), ServiceError> {
    let answered: HashSet<usize> = answers
        .iter()
        .filter(|answer| answer.is_answered())
        .map(|answer| answer.question_index)
        .collect();

    let missing: Vec<String> = assessment
        .questions
        .iter()
        .enumerate()
        .filter(|(index, question)| question.required && !answered.contains(index))
        .map(|(index, _)| (index + 1).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::validation(
            "answers",
            format!("Required questions are unanswered: {}", missing.join(", ")),
        ))
    }
}
