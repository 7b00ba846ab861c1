use serde::Serialize;

use crate::db::models::Submission;
use crate::db::types::ActorRole;

/// Canonical "back" destination for a submission view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct NavigationTarget {
    pub(crate) label: &'static str,
    pub(crate) path: String,
}

pub(crate) fn back_target(role: ActorRole, submission: &Submission) -> NavigationTarget {
    match role {
        ActorRole::Student => NavigationTarget {
            label: "Back to assessment",
            path: format!(
                "/courses/{}/assessments/{}",
                submission.course_id, submission.assessment_id
            ),
        },
        ActorRole::Instructor => NavigationTarget {
            label: "Back to submissions",
            path: format!("/instructor/assessments/{}/submissions", submission.assessment_id),
        },
    }
}
