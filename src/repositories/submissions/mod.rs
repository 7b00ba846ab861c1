mod commands;
mod queries;
mod types;

pub(crate) use commands::{insert, mark_submitted, record_grade, save_draft};
pub(crate) use queries::{count, find_by_id, latest_attempt_number, list};
pub(crate) use types::{
    DraftUpdate, GradeUpdate, NewSubmission, SubmissionFilter, SubmissionScope, SubmitUpdate,
};

#[cfg(test)]
pub(crate) use types::GRADABLE;
