use std::collections::BTreeSet;

use serde_json::Value;
use time::OffsetDateTime;

use crate::core::time::to_primitive_utc;
use crate::db::models::{Answer, AnswerValue, Assessment, Submission};
use crate::repositories::GradeUpdate;
use crate::services::errors::ServiceError;
use crate::services::state_machine::{next_status, Transition};

/// Machine evaluation of a submission's answers. Informational only; the committed
/// score is always the instructor's.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Evaluation {
    pub(crate) answers: Vec<Answer>,
    pub(crate) suggested_score: f64,
    pub(crate) suggested_percentage: i32,
    pub(crate) needs_manual_review: usize,
}

pub(crate) fn evaluate(assessment: &Assessment, answers: &[Answer]) -> Evaluation {
    let mut needs_manual_review = 0;
    let mut suggested_score = 0.0;

    let answers = answers
        .iter()
        .map(|answer| {
            let question = assessment.questions.get(answer.question_index);
            let expected = question
                .filter(|question| question.question_type.is_auto_gradable())
                .and_then(|question| question.correct_answer.as_ref().map(|value| (question, value)));

            match (expected, answer.value.as_ref()) {
                (Some((question, expected)), given) => {
                    let correct = given.is_some_and(|given| answers_match(expected, given));
                    let points = if correct { question.points } else { 0.0 };
                    suggested_score += points;
                    Answer { is_correct: Some(correct), points_earned: Some(points), ..answer.clone() }
                }
                (None, _) => {
                    if question.is_some() && answer.is_answered() {
                        needs_manual_review += 1;
                    }
                    Answer { is_correct: None, points_earned: None, ..answer.clone() }
                }
            }
        })
        .collect();

    let total = assessment.total_points();
    let suggested_score = suggested_score.min(total.max(0.0));

    Evaluation {
        answers,
        suggested_score,
        suggested_percentage: percentage(suggested_score, total),
        needs_manual_review,
    }
}

/// Sets compare as sets, scalars by their normalized form.
pub(crate) fn answers_match(expected: &AnswerValue, given: &AnswerValue) -> bool {
    normalized_set(expected) == normalized_set(given)
}

fn normalized_set(value: &AnswerValue) -> BTreeSet<String> {
    match value {
        AnswerValue::Set(items) => items.iter().map(|item| item.normalized()).collect(),
        AnswerValue::Scalar(item) => BTreeSet::from([item.normalized()]),
    }
}

pub(crate) fn percentage(score: f64, total_points: f64) -> i32 {
    if total_points <= 0.0 {
        return 0;
    }
    (score / total_points * 100.0).round() as i32
}

pub(crate) fn passed(percentage: i32, passing_score: f64) -> bool {
    f64::from(percentage) >= passing_score
}

/// The score must be a JSON number in `[0, total_points]`. Nothing is coerced.
pub(crate) fn validate_score(raw: &Value, total_points: f64) -> Result<f64, ServiceError> {
    let score = match raw {
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
    .filter(|score| score.is_finite())
    .ok_or_else(|| ServiceError::validation("score", "Score must be a number"))?;

    if score < 0.0 || score > total_points {
        return Err(ServiceError::validation(
            "score",
            format!("Score must be between 0 and {total_points}"),
        ));
    }

    Ok(score)
}

pub(crate) fn normalize_feedback(feedback: Option<String>) -> Option<String> {
    feedback.map(|text| text.trim().to_string()).filter(|text| !text.is_empty())
}

/// Builds the grade write for a submission. Fails without side effects on an illegal
/// status or an invalid score.
pub(crate) fn grade(
    assessment: &Assessment,
    submission: &Submission,
    raw_score: &Value,
    feedback: Option<String>,
    grader_id: &str,
    now: OffsetDateTime,
) -> Result<GradeUpdate, ServiceError> {
    next_status(submission.status, Transition::Grade)?;

    let total_points = assessment.total_points();
    let score = validate_score(raw_score, total_points)?;
    let evaluation = evaluate(assessment, &submission.answers);

    Ok(GradeUpdate {
        score,
        percentage: percentage(score, total_points),
        feedback: normalize_feedback(feedback),
        answers: evaluation.answers,
        graded_by: grader_id.to_string(),
        graded_at: to_primitive_utc(now),
    })
}
