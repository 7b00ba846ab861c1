use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Answer;
use crate::db::types::SubmissionStatus;

pub(crate) const COLUMNS: &str = "\
    id, assessment_id, course_id, student_id, attempt_number, status, answers, score, \
    percentage, feedback, submitted_at, graded_at, graded_by, attachments, created_at, \
    updated_at";

/// Statuses a grade may be recorded from. `graded` is the re-grade self-loop.
pub(crate) const GRADABLE: [SubmissionStatus; 3] =
    [SubmissionStatus::Submitted, SubmissionStatus::Late, SubmissionStatus::Graded];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SubmissionScope {
    Assessment(String),
    Course(String),
}

impl SubmissionScope {
    pub(crate) fn id(&self) -> &str {
        match self {
            Self::Assessment(id) | Self::Course(id) => id,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Assessment(_) => "assessment",
            Self::Course(_) => "course",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SubmissionFilter {
    pub(crate) scope: SubmissionScope,
    pub(crate) status: Option<SubmissionStatus>,
}

impl SubmissionFilter {
    pub(crate) fn new(scope: SubmissionScope, status: Option<SubmissionStatus>) -> Self {
        Self { scope, status }
    }

    pub(crate) fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        match &self.scope {
            SubmissionScope::Assessment(id) => {
                builder.push(" WHERE assessment_id = ");
                builder.push_bind(id.clone());
            }
            SubmissionScope::Course(id) => {
                builder.push(" WHERE course_id = ");
                builder.push_bind(id.clone());
            }
        }

        if let Some(status) = self.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NewSubmission {
    pub(crate) id: String,
    pub(crate) assessment_id: String,
    pub(crate) course_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct DraftUpdate {
    pub(crate) answers: Option<Vec<Answer>>,
    pub(crate) attachments: Option<Vec<String>>,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct SubmitUpdate {
    pub(crate) status: SubmissionStatus,
    pub(crate) submitted_at: PrimitiveDateTime,
    /// `updated_at` of the row the submit was validated against. A draft save that
    /// lands in between moves it, and the write then matches nothing.
    pub(crate) validated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct GradeUpdate {
    pub(crate) score: f64,
    pub(crate) percentage: i32,
    pub(crate) feedback: Option<String>,
    pub(crate) answers: Vec<Answer>,
    pub(crate) graded_by: String,
    pub(crate) graded_at: PrimitiveDateTime,
}
