use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::models::Submission;

use super::submissions;

pub(crate) use super::submissions::{
    DraftUpdate, GradeUpdate, NewSubmission, SubmissionFilter, SubmissionScope, SubmitUpdate,
};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("attempt {attempt_number} already exists for this student and assessment")]
    DuplicateAttempt { attempt_number: i32 },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[cfg(test)]
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Source of truth for submission records.
///
/// The conditional writes (`save_draft`, `mark_submitted`, `record_grade`) carry their
/// status guard into the store and return `None` when the row is not in a status the
/// write is legal from. `mark_submitted` also requires the row to be unchanged since
/// the submit was validated.
#[async_trait]
pub(crate) trait SubmissionStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Submission>, StoreError>;

    /// Highest attempt number for the pair, 0 when none exist.
    async fn latest_attempt_number(
        &self,
        assessment_id: &str,
        student_id: &str,
    ) -> Result<i32, StoreError>;

    async fn insert(&self, params: NewSubmission) -> Result<Submission, StoreError>;

    async fn save_draft(
        &self,
        id: &str,
        params: DraftUpdate,
    ) -> Result<Option<Submission>, StoreError>;

    async fn mark_submitted(
        &self,
        id: &str,
        params: SubmitUpdate,
    ) -> Result<Option<Submission>, StoreError>;

    async fn record_grade(
        &self,
        id: &str,
        params: GradeUpdate,
    ) -> Result<Option<Submission>, StoreError>;

    async fn list(
        &self,
        filter: &SubmissionFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Submission>, StoreError>;

    async fn count(&self, filter: &SubmissionFilter) -> Result<i64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub(crate) struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Submission>, StoreError> {
        Ok(submissions::find_by_id(&self.pool, id).await?)
    }

    async fn latest_attempt_number(
        &self,
        assessment_id: &str,
        student_id: &str,
    ) -> Result<i32, StoreError> {
        Ok(submissions::latest_attempt_number(&self.pool, assessment_id, student_id).await?)
    }

    async fn insert(&self, params: NewSubmission) -> Result<Submission, StoreError> {
        let attempt_number = params.attempt_number;
        match submissions::insert(&self.pool, params).await {
            Ok(row) => Ok(row),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::DuplicateAttempt { attempt_number })
            }
            Err(err) => Err(StoreError::Database(err)),
        }
    }

    async fn save_draft(
        &self,
        id: &str,
        params: DraftUpdate,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(submissions::save_draft(&self.pool, id, params).await?)
    }

    async fn mark_submitted(
        &self,
        id: &str,
        params: SubmitUpdate,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(submissions::mark_submitted(&self.pool, id, params).await?)
    }

    async fn record_grade(
        &self,
        id: &str,
        params: GradeUpdate,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(submissions::record_grade(&self.pool, id, params).await?)
    }

    async fn list(
        &self,
        filter: &SubmissionFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Submission>, StoreError> {
        Ok(submissions::list(&self.pool, filter, offset, limit).await?)
    }

    async fn count(&self, filter: &SubmissionFilter) -> Result<i64, StoreError> {
        Ok(submissions::count(&self.pool, filter).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
    )
}
