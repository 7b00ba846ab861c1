use crate::db::models::Submission;
use crate::db::types::ActorRole;
use crate::services::errors::ServiceError;
use crate::services::identifiers::validate_id;

/// Authenticated caller as asserted by the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Actor {
    pub(crate) id: String,
    pub(crate) role: ActorRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    ViewAssessment,
    StartAttempt,
    SaveDraft,
    Submit,
    ViewSubmission,
    SuggestGrade,
    Grade,
    List,
    Summarize,
}

impl Action {
    fn permits(self, role: ActorRole) -> bool {
        match (self, role) {
            (Self::ViewAssessment | Self::ViewSubmission, _) => true,
            (Self::StartAttempt | Self::SaveDraft | Self::Submit, ActorRole::Student) => true,
            (Self::StartAttempt | Self::SaveDraft | Self::Submit, ActorRole::Instructor) => false,
            (Self::SuggestGrade | Self::Grade | Self::List | Self::Summarize, ActorRole::Instructor) => {
                true
            }
            (Self::SuggestGrade | Self::Grade | Self::List | Self::Summarize, ActorRole::Student) => {
                false
            }
        }
    }
}

/// Identifier shape first, then role. Ownership needs the record and is checked
/// separately once it is loaded.
pub(crate) fn authorize(
    actor: &Actor,
    action: Action,
    field: &'static str,
    raw_id: &str,
) -> Result<String, ServiceError> {
    let id = validate_id(field, raw_id)?;

    if !action.permits(actor.role) {
        tracing::debug!(
            actor_id = %actor.id,
            role = actor.role.as_str(),
            action = ?action,
            "Role not permitted for action"
        );
        return Err(ServiceError::Unauthorized);
    }

    Ok(id)
}

/// Student mutations are only allowed on the student's own submission.
pub(crate) fn ensure_owner(actor: &Actor, submission: &Submission) -> Result<(), ServiceError> {
    if actor.role == ActorRole::Student && submission.student_id == actor.id {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized)
    }
}

pub(crate) fn ensure_can_view(actor: &Actor, submission: &Submission) -> Result<(), ServiceError> {
    match actor.role {
        ActorRole::Instructor => Ok(()),
        ActorRole::Student => ensure_owner(actor, submission),
    }
}
