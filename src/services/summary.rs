use serde::{Serialize, Serializer};
use time::PrimitiveDateTime;

use crate::core::metrics;
use crate::db::types::SubmissionStatus;
use crate::repositories::{StoreError, SubmissionFilter, SubmissionScope, SubmissionStore};

/// Outcome of one independently-fetched summary field. An unavailable field is
/// reported as such, never as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Availability<T> {
    Available(T),
    Unavailable,
}

impl<T> Availability<T> {
    fn from_result(field: &'static str, scope: &SubmissionScope, result: Result<T, StoreError>) -> Self {
        match result {
            Ok(value) => Self::Available(value),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    field,
                    scope = scope.kind(),
                    scope_id = scope.id(),
                    "Summary field unavailable"
                );
                metrics::summary_field_unavailable(field);
                Self::Unavailable
            }
        }
    }

    pub(crate) fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub(crate) fn map<U>(self, apply: impl FnOnce(T) -> U) -> Availability<U> {
        match self {
            Self::Available(value) => Availability::Available(apply(value)),
            Self::Unavailable => Availability::Unavailable,
        }
    }
}

impl<T: Serialize> Serialize for Availability<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Available(value) => value.serialize(serializer),
            Self::Unavailable => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Summary {
    pub(crate) total: Availability<i64>,
    pub(crate) submitted: Availability<i64>,
    pub(crate) graded: Availability<i64>,
    pub(crate) late: Availability<i64>,
    pub(crate) last_submitted_at: Availability<Option<PrimitiveDateTime>>,
}

impl Summary {
    pub(crate) fn unavailable_fields(&self) -> Vec<&'static str> {
        [
            ("total", self.total.is_available()),
            ("submitted", self.submitted.is_available()),
            ("graded", self.graded.is_available()),
            ("late", self.late.is_available()),
            ("lastSubmittedAt", self.last_submitted_at.is_available()),
        ]
        .into_iter()
        .filter_map(|(field, available)| (!available).then_some(field))
        .collect()
    }

    pub(crate) fn is_entirely_unavailable(&self) -> bool {
        self.unavailable_fields().len() == 5
    }
}

/// Four filtered counts and the newest row of the unfiltered listing, fetched
/// concurrently. Any subset may fail without affecting the others.
pub(crate) async fn summarize(store: &dyn SubmissionStore, scope: &SubmissionScope) -> Summary {
    let all = SubmissionFilter::new(scope.clone(), None);
    let submitted = SubmissionFilter::new(scope.clone(), Some(SubmissionStatus::Submitted));
    let graded = SubmissionFilter::new(scope.clone(), Some(SubmissionStatus::Graded));
    let late = SubmissionFilter::new(scope.clone(), Some(SubmissionStatus::Late));

    let (total, submitted, graded, late, newest) = tokio::join!(
        store.count(&all),
        store.count(&submitted),
        store.count(&graded),
        store.count(&late),
        store.list(&all, 0, 1),
    );

    let newest = newest.map(|rows| rows.first().and_then(|row| row.submitted_at));

    Summary {
        total: Availability::from_result("total", scope, total),
        submitted: Availability::from_result("submitted", scope, submitted),
        graded: Availability::from_result("graded", scope, graded),
        late: Availability::from_result("late", scope, late),
        last_submitted_at: Availability::from_result("lastSubmittedAt", scope, newest),
    }
}
