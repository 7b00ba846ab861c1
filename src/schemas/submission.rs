use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Answer, Submission};
use crate::db::types::{ActorRole, SubmissionStatus};
use crate::services::grading::{self, Evaluation};
use crate::services::navigation::{back_target, NavigationTarget};
use crate::services::summary::{Availability, Summary};
use crate::services::workflow::SubmissionView;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartAttemptRequest {
    #[serde(default)]
    pub(crate) assessment_id: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaveDraftRequest {
    #[serde(default)]
    pub(crate) answers: Option<Vec<Answer>>,
    #[serde(default)]
    #[validate(length(max = 20, message = "At most 20 attachments are allowed"))]
    pub(crate) attachments: Option<Vec<String>>,
}

/// `score` stays raw JSON so a non-number is reported as a validation error instead of
/// a body rejection.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GradeRequest {
    #[serde(default)]
    pub(crate) score: Value,
    #[serde(default)]
    #[validate(length(max = 10000, message = "Feedback is too long"))]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListSubmissionsQuery {
    #[serde(default)]
    pub(crate) page: Option<String>,
    #[serde(default)]
    pub(crate) limit: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) assessment_id: String,
    pub(crate) course_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) status: SubmissionStatus,
    pub(crate) answers: Vec<Answer>,
    pub(crate) score: Option<f64>,
    pub(crate) percentage: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) passed: Option<bool>,
    pub(crate) feedback: Option<String>,
    pub(crate) submitted_at: Option<String>,
    pub(crate) graded_at: Option<String>,
    pub(crate) graded_by: Option<String>,
    pub(crate) attachments: Vec<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) back: Option<NavigationTarget>,
}

impl From<Submission> for SubmissionResponse {
    fn from(submission: Submission) -> Self {
        Self {
            id: submission.id,
            assessment_id: submission.assessment_id,
            course_id: submission.course_id,
            student_id: submission.student_id,
            attempt_number: submission.attempt_number,
            status: submission.status,
            answers: submission.answers.0,
            score: submission.score,
            percentage: submission.percentage,
            passed: None,
            feedback: submission.feedback,
            submitted_at: submission.submitted_at.map(format_primitive),
            graded_at: submission.graded_at.map(format_primitive),
            graded_by: submission.graded_by,
            attachments: submission.attachments.0,
            created_at: format_primitive(submission.created_at),
            updated_at: format_primitive(submission.updated_at),
            back: None,
        }
    }
}

impl SubmissionResponse {
    /// Detail shape: `passed` is derived from the assessment once graded, and the
    /// canonical back link depends on who is looking.
    pub(crate) fn detail(view: SubmissionView, role: ActorRole) -> Self {
        let passing_score = view.assessment.passing_score;
        let back = back_target(role, &view.submission);
        let mut response = Self::from(view.submission);

        response.passed = match (response.status, response.percentage) {
            (SubmissionStatus::Graded, Some(percentage)) => {
                Some(grading::passed(percentage, passing_score))
            }
            _ => None,
        };
        response.back = Some(back);
        response
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SuggestedGradeResponse {
    pub(crate) submission_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) total_points: f64,
    pub(crate) suggested_score: f64,
    pub(crate) suggested_percentage: i32,
    pub(crate) suggested_passed: bool,
    pub(crate) needs_manual_review: usize,
    pub(crate) answers: Vec<Answer>,
}

impl SuggestedGradeResponse {
    pub(crate) fn new(view: SubmissionView, evaluation: Evaluation) -> Self {
        Self {
            submission_id: view.submission.id,
            status: view.submission.status,
            total_points: view.assessment.total_points(),
            suggested_score: evaluation.suggested_score,
            suggested_percentage: evaluation.suggested_percentage,
            suggested_passed: grading::passed(
                evaluation.suggested_percentage,
                view.assessment.passing_score,
            ),
            needs_manual_review: evaluation.needs_manual_review,
            answers: evaluation.answers,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SummaryResponse {
    pub(crate) total: Availability<i64>,
    pub(crate) submitted: Availability<i64>,
    pub(crate) graded: Availability<i64>,
    pub(crate) late: Availability<i64>,
    pub(crate) last_submitted_at: Availability<Option<String>>,
    /// Fields that could not be computed; their values are `null`, not zero.
    pub(crate) unavailable: Vec<&'static str>,
}

impl From<Summary> for SummaryResponse {
    fn from(summary: Summary) -> Self {
        let unavailable = summary.unavailable_fields();
        let last_submitted_at =
            summary.last_submitted_at.map(|value| value.map(format_primitive));

        Self {
            total: summary.total,
            submitted: summary.submitted,
            graded: summary.graded,
            late: summary.late,
            last_submitted_at,
            unavailable,
        }
    }
}
