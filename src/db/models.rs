use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::db::types::{AssessmentType, QuestionType, SubmissionStatus};

/// One scalar of an answer or a correct answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum AnswerScalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AnswerScalar {
    /// Canonical form used for exact-match comparison.
    pub(crate) fn normalized(&self) -> String {
        match self {
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => {
                if value.fract() == 0.0 && value.abs() < 1e15 {
                    format!("{}", *value as i64)
                } else {
                    value.to_string()
                }
            }
            Self::Text(value) => {
                value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
            }
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(value) if value.trim().is_empty())
    }
}

/// Raw answer: a scalar, or a set for multi-select questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum AnswerValue {
    Set(Vec<AnswerScalar>),
    Scalar(AnswerScalar),
}

impl AnswerValue {
    pub(crate) fn is_blank(&self) -> bool {
        match self {
            Self::Set(items) => items.iter().all(AnswerScalar::is_blank),
            Self::Scalar(value) => value.is_blank(),
        }
    }
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Question {
    pub(crate) text: String,
    pub(crate) question_type: QuestionType,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    #[serde(default)]
    pub(crate) correct_answer: Option<AnswerValue>,
    #[serde(default)]
    pub(crate) points: f64,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
    #[serde(default = "default_required")]
    pub(crate) required: bool,
}

/// Assessment definition as served by the catalog. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Assessment {
    #[serde(alias = "_id")]
    pub(crate) id: String,
    #[serde(alias = "course")]
    pub(crate) course_id: String,
    #[serde(default, alias = "module")]
    pub(crate) module_id: Option<String>,
    #[serde(default, alias = "lesson")]
    pub(crate) lesson_id: Option<String>,
    #[serde(default)]
    pub(crate) title: String,
    #[serde(rename = "type")]
    pub(crate) kind: AssessmentType,
    #[serde(default)]
    pub(crate) questions: Vec<Question>,
    #[serde(default, rename = "totalPoints")]
    pub(crate) declared_total_points: Option<f64>,
    #[serde(default)]
    pub(crate) passing_score: f64,
    #[serde(default)]
    pub(crate) duration: Option<i32>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub(crate) start_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub(crate) end_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub(crate) is_published: bool,
    #[serde(default)]
    pub(crate) order: i32,
}

impl Assessment {
    /// Declared total wins; otherwise the sum of question points.
    pub(crate) fn total_points(&self) -> f64 {
        self.declared_total_points
            .unwrap_or_else(|| self.questions.iter().map(|question| question.points).sum())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Answer {
    pub(crate) question_index: usize,
    #[serde(default)]
    pub(crate) value: Option<AnswerValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) is_correct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) points_earned: Option<f64>,
}

impl Answer {
    pub(crate) fn is_answered(&self) -> bool {
        self.value.as_ref().is_some_and(|value| !value.is_blank())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) assessment_id: String,
    pub(crate) course_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) status: SubmissionStatus,
    pub(crate) answers: Json<Vec<Answer>>,
    pub(crate) score: Option<f64>,
    pub(crate) percentage: Option<i32>,
    pub(crate) feedback: Option<String>,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
    pub(crate) graded_by: Option<String>,
    pub(crate) attachments: Json<Vec<String>>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
