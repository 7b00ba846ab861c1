use serde::Serialize;

use crate::core::time::format_offset;
use crate::db::models::{Assessment, Question};
use crate::db::types::{ActorRole, AssessmentType};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssessmentResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) module_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) lesson_id: Option<String>,
    pub(crate) title: String,
    #[serde(rename = "type")]
    pub(crate) kind: AssessmentType,
    pub(crate) questions: Vec<Question>,
    pub(crate) total_points: f64,
    pub(crate) passing_score: f64,
    pub(crate) duration: Option<i32>,
    pub(crate) start_date: Option<String>,
    pub(crate) end_date: Option<String>,
    pub(crate) is_published: bool,
    pub(crate) order: i32,
}

impl AssessmentResponse {
    /// Students never see correct answers or explanations.
    pub(crate) fn for_role(assessment: Assessment, role: ActorRole) -> Self {
        let total_points = assessment.total_points();
        let questions = match role {
            ActorRole::Instructor => assessment.questions,
            ActorRole::Student => assessment
                .questions
                .into_iter()
                .map(|question| Question { correct_answer: None, explanation: None, ..question })
                .collect(),
        };

        Self {
            id: assessment.id,
            course_id: assessment.course_id,
            module_id: assessment.module_id,
            lesson_id: assessment.lesson_id,
            title: assessment.title,
            kind: assessment.kind,
            questions,
            total_points,
            passing_score: assessment.passing_score,
            duration: assessment.duration,
            start_date: assessment.start_date.map(format_offset),
            end_date: assessment.end_date.map(format_offset),
            is_published: assessment.is_published,
            order: assessment.order,
        }
    }
}
