use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::types::Json;

use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;

use super::store::{
    DraftUpdate, GradeUpdate, NewSubmission, StoreError, SubmissionFilter, SubmissionScope,
    SubmissionStore, SubmitUpdate,
};
use super::submissions::GRADABLE;

/// In-process store for tests. Count queries can be made to fail per status filter.
#[derive(Default)]
pub(crate) struct MemorySubmissionStore {
    rows: Mutex<Vec<Submission>>,
    failing_counts: Mutex<HashSet<Option<SubmissionStatus>>>,
    failing_lists: Mutex<bool>,
    edit_during_submit: Mutex<Option<DraftUpdate>>,
}

impl MemorySubmissionStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn seed(&self, submission: Submission) {
        self.rows.lock().unwrap().push(submission);
    }

    pub(crate) fn fail_count_for(&self, status: Option<SubmissionStatus>) {
        self.failing_counts.lock().unwrap().insert(status);
    }

    pub(crate) fn fail_lists(&self) {
        *self.failing_lists.lock().unwrap() = true;
    }

    /// Applies `update` as a concurrent draft save just before the next submit write.
    pub(crate) fn edit_during_next_submit(&self, update: DraftUpdate) {
        *self.edit_during_submit.lock().unwrap() = Some(update);
    }

    pub(crate) fn snapshot(&self, id: &str) -> Option<Submission> {
        self.rows.lock().unwrap().iter().find(|row| row.id == id).cloned()
    }

    fn matching(&self, filter: &SubmissionFilter) -> Vec<Submission> {
        let rows = self.rows.lock().unwrap();
        rows.iter()
            .filter(|row| match &filter.scope {
                SubmissionScope::Assessment(id) => &row.assessment_id == id,
                SubmissionScope::Course(id) => &row.course_id == id,
            })
            .filter(|row| filter.status.map_or(true, |status| row.status == status))
            .cloned()
            .collect()
    }

    fn update_where<F>(
        &self,
        id: &str,
        allowed: &[SubmissionStatus],
        apply: F,
    ) -> Option<Submission>
    where
        F: FnOnce(&mut Submission),
    {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.iter_mut().find(|row| row.id == id && allowed.contains(&row.status))?;
        apply(row);
        Some(row.clone())
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Submission>, StoreError> {
        Ok(self.snapshot(id))
    }

    async fn latest_attempt_number(
        &self,
        assessment_id: &str,
        student_id: &str,
    ) -> Result<i32, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|row| row.assessment_id == assessment_id && row.student_id == student_id)
            .map(|row| row.attempt_number)
            .max()
            .unwrap_or(0))
    }

    async fn insert(&self, params: NewSubmission) -> Result<Submission, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let duplicate = rows.iter().any(|row| {
            row.assessment_id == params.assessment_id
                && row.student_id == params.student_id
                && row.attempt_number == params.attempt_number
        });
        if duplicate {
            return Err(StoreError::DuplicateAttempt { attempt_number: params.attempt_number });
        }

        let row = Submission {
            id: params.id,
            assessment_id: params.assessment_id,
            course_id: params.course_id,
            student_id: params.student_id,
            attempt_number: params.attempt_number,
            status: SubmissionStatus::Draft,
            answers: Json(Vec::new()),
            score: None,
            percentage: None,
            feedback: None,
            submitted_at: None,
            graded_at: None,
            graded_by: None,
            attachments: Json(Vec::new()),
            created_at: params.created_at,
            updated_at: params.created_at,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn save_draft(
        &self,
        id: &str,
        params: DraftUpdate,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(self.update_where(id, &[SubmissionStatus::Draft], |row| {
            if let Some(answers) = params.answers {
                row.answers = Json(answers);
            }
            if let Some(attachments) = params.attachments {
                row.attachments = Json(attachments);
            }
            row.updated_at = params.updated_at;
        }))
    }

    async fn mark_submitted(
        &self,
        id: &str,
        params: SubmitUpdate,
    ) -> Result<Option<Submission>, StoreError> {
        let concurrent_edit = self.edit_during_submit.lock().unwrap().take();
        if let Some(edit) = concurrent_edit {
            self.save_draft(id, edit).await?;
        }

        let mut rows = self.rows.lock().unwrap();
        let row = rows.iter_mut().find(|row| {
            row.id == id
                && row.status == SubmissionStatus::Draft
                && row.updated_at == params.validated_at
        });
        Ok(row.map(|row| {
            row.status = params.status;
            row.submitted_at = Some(params.submitted_at);
            row.updated_at = params.submitted_at;
            row.clone()
        }))
    }

    async fn record_grade(
        &self,
        id: &str,
        params: GradeUpdate,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(self.update_where(id, &GRADABLE, |row| {
            row.status = SubmissionStatus::Graded;
            row.score = Some(params.score);
            row.percentage = Some(params.percentage);
            row.feedback = params.feedback;
            row.answers = Json(params.answers);
            row.graded_by = Some(params.graded_by);
            row.graded_at = Some(params.graded_at);
            row.updated_at = params.graded_at;
        }))
    }

    async fn list(
        &self,
        filter: &SubmissionFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Submission>, StoreError> {
        if *self.failing_lists.lock().unwrap() {
            return Err(StoreError::Unavailable("list".to_string()));
        }

        let mut rows = self.matching(filter);
        rows.sort_by(|left, right| {
            right.submitted_at.cmp(&left.submitted_at).then_with(|| left.id.cmp(&right.id))
        });

        Ok(rows.into_iter().skip(offset.max(0) as usize).take(limit.max(1) as usize).collect())
    }

    async fn count(&self, filter: &SubmissionFilter) -> Result<i64, StoreError> {
        if self.failing_counts.lock().unwrap().contains(&filter.status) {
            return Err(StoreError::Unavailable("count".to_string()));
        }

        Ok(self.matching(filter).len() as i64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
