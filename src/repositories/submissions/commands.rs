use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::{Answer, Submission};
use crate::db::types::SubmissionStatus;

use super::types::{DraftUpdate, GradeUpdate, NewSubmission, SubmitUpdate, COLUMNS, GRADABLE};

pub(crate) async fn insert(pool: &PgPool, params: NewSubmission) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (
            id, assessment_id, course_id, student_id, attempt_number, status,
            answers, attachments, created_at, updated_at
         )
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.assessment_id)
    .bind(params.course_id)
    .bind(params.student_id)
    .bind(params.attempt_number)
    .bind(SubmissionStatus::Draft)
    .bind(Json(Vec::<Answer>::new()))
    .bind(Json(Vec::<String>::new()))
    .bind(params.created_at)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

/// Only touches rows still in `draft`; `None` means the guard did not match.
pub(crate) async fn save_draft(
    pool: &PgPool,
    id: &str,
    params: DraftUpdate,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET answers = COALESCE($1, answers),
             attachments = COALESCE($2, attachments),
             updated_at = $3
         WHERE id = $4 AND status = $5
         RETURNING {COLUMNS}"
    ))
    .bind(params.answers.map(Json))
    .bind(params.attachments.map(Json))
    .bind(params.updated_at)
    .bind(id)
    .bind(SubmissionStatus::Draft)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn mark_submitted(
    pool: &PgPool,
    id: &str,
    params: SubmitUpdate,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET status = $1,
             submitted_at = $2,
             updated_at = $2
         WHERE id = $3 AND status = $4 AND updated_at = $5
         RETURNING {COLUMNS}"
    ))
    .bind(params.status)
    .bind(params.submitted_at)
    .bind(id)
    .bind(SubmissionStatus::Draft)
    .bind(params.validated_at)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn record_grade(
    pool: &PgPool,
    id: &str,
    params: GradeUpdate,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET status = $1,
             score = $2,
             percentage = $3,
             feedback = $4,
             answers = $5,
             graded_by = $6,
             graded_at = $7,
             updated_at = $7
         WHERE id = $8 AND status IN ($9, $10, $11)
         RETURNING {COLUMNS}"
    ))
    .bind(SubmissionStatus::Graded)
    .bind(params.score)
    .bind(params.percentage)
    .bind(params.feedback)
    .bind(Json(params.answers))
    .bind(params.graded_by)
    .bind(params.graded_at)
    .bind(id)
    .bind(GRADABLE[0])
    .bind(GRADABLE[1])
    .bind(GRADABLE[2])
    .fetch_optional(pool)
    .await
}
