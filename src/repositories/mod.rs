#[cfg(test)]
pub(crate) mod memory;
pub(crate) mod store;
pub(crate) mod submissions;

pub(crate) use store::{
    DraftUpdate, GradeUpdate, NewSubmission, PgSubmissionStore, StoreError, SubmissionFilter,
    SubmissionScope, SubmissionStore, SubmitUpdate,
};
