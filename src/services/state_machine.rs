use time::OffsetDateTime;

use crate::db::types::SubmissionStatus;
use crate::services::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    SaveDraft,
    Submit { late: bool },
    Grade,
}

impl Transition {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::SaveDraft => "save",
            Self::Submit { .. } => "submit",
            Self::Grade => "grade",
        }
    }
}

/// `draft -> {submitted, late} -> graded -> graded`. Draft saves loop on `draft`.
pub(crate) fn next_status(
    from: SubmissionStatus,
    transition: Transition,
) -> Result<SubmissionStatus, ServiceError> {
    use SubmissionStatus::{Draft, Graded, Late, Submitted};

    let next = match (from, transition) {
        (Draft, Transition::SaveDraft) => Some(Draft),
        (Draft, Transition::Submit { late: false }) => Some(Submitted),
        (Draft, Transition::Submit { late: true }) => Some(Late),
        (Draft, Transition::Grade) => None,
        (Submitted | Late | Graded, Transition::SaveDraft) => None,
        (Submitted | Late | Graded, Transition::Submit { .. }) => None,
        (Submitted | Late | Graded, Transition::Grade) => Some(Graded),
    };

    next.ok_or_else(|| {
        tracing::warn!(
            status = from.as_str(),
            action = transition.as_str(),
            "Rejected submission transition"
        );
        ServiceError::InvalidState { action: transition.as_str(), status: from }
    })
}

/// Decided once at submission time and never re-evaluated.
pub(crate) fn is_late(end_date: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
    end_date.is_some_and(|end| now > end)
}
