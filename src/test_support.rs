use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use serde_json::Value;
use sqlx::types::Json;
use time::macros::datetime;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::api;
use crate::core::config::{GradingSettings, Settings};
use crate::core::{redis::RedisHandle, security, state::AppState};
use crate::db::models::{Answer, Assessment, Question, Submission};
use crate::db::types::{ActorRole, AssessmentType, QuestionType, SubmissionStatus};
use crate::repositories::memory::MemorySubmissionStore;
use crate::services::access::Actor;
use crate::services::catalog::memory::MemoryCatalog;

const TEST_SECRET_KEY: &str = "test-secret";

pub(crate) const STUDENT_ID: &str = "65f0000000000000000000a1";
pub(crate) const OTHER_STUDENT_ID: &str = "65f0000000000000000000a2";
pub(crate) const INSTRUCTOR_ID: &str = "65f0000000000000000000b1";
pub(crate) const COURSE_ID: &str = "65f0000000000000000000c1";
pub(crate) const ASSESSMENT_ID: &str = "65f0000000000000000000d1";
pub(crate) const OTHER_ASSESSMENT_ID: &str = "65f0000000000000000000d2";
pub(crate) const UNPUBLISHED_ASSESSMENT_ID: &str = "65f0000000000000000000d3";
pub(crate) const ZERO_POINT_ASSESSMENT_ID: &str = "65f0000000000000000000d4";
pub(crate) const SUBMISSION_ID: &str = "65f0000000000000000000e1";

pub(crate) const START_DATE: OffsetDateTime = datetime!(2026-02-01 00:00 UTC);
pub(crate) const END_DATE: OffsetDateTime = datetime!(2026-03-01 23:59:59 UTC);

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) store: Arc<MemorySubmissionStore>,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("GRADEFLOW_ENV", "test");
    std::env::set_var("GRADEFLOW_STRICT_CONFIG", "0");
    std::env::set_var("SECRET_KEY", TEST_SECRET_KEY);
    std::env::set_var("ALGORITHM", "HS256");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::remove_var("API_V1_STR");
    std::env::remove_var("DEFAULT_PAGE_LIMIT");
    std::env::remove_var("MAX_PAGE_LIMIT");
    std::env::remove_var("GRADE_LOCK_TTL_SECONDS");
}

/// In-memory store and catalog behind the real router. Redis is never connected, so
/// leases stay process-local.
pub(crate) async fn setup_test_context() -> TestContext {
    let guard = env_lock().await;
    set_test_env();

    let settings = Settings::load().expect("settings");
    let store = Arc::new(MemorySubmissionStore::new());
    let catalog = Arc::new(MemoryCatalog::with(catalog_assessments()));
    let redis = RedisHandle::new(settings.redis().redis_url());

    let state = AppState::new(settings, store.clone(), catalog, redis);
    let app = api::router::router(state.clone());

    TestContext { state, app, store, _guard: guard }
}

pub(crate) fn grading_settings() -> GradingSettings {
    GradingSettings {
        lock_ttl_seconds: 30,
        lock_sweep_interval_seconds: 15,
        default_page_limit: 10,
        max_page_limit: 100,
    }
}

pub(crate) fn student() -> Actor {
    Actor { id: STUDENT_ID.to_string(), role: ActorRole::Student }
}

pub(crate) fn other_student() -> Actor {
    Actor { id: OTHER_STUDENT_ID.to_string(), role: ActorRole::Student }
}

pub(crate) fn instructor() -> Actor {
    Actor { id: INSTRUCTOR_ID.to_string(), role: ActorRole::Instructor }
}

pub(crate) fn primitive(value: OffsetDateTime) -> PrimitiveDateTime {
    crate::core::time::to_primitive_utc(value)
}

fn question(text: &str, question_type: QuestionType, correct: Option<Value>, points: f64) -> Question {
    Question {
        text: text.to_string(),
        question_type,
        options: Vec::new(),
        correct_answer: correct.map(|value| serde_json::from_value(value).expect("answer value")),
        points,
        explanation: None,
        required: true,
    }
}

/// 100 points, 70% to pass, closes at `END_DATE`.
pub(crate) fn sample_assessment() -> Assessment {
    Assessment {
        id: ASSESSMENT_ID.to_string(),
        course_id: COURSE_ID.to_string(),
        module_id: None,
        lesson_id: None,
        title: "Cell biology".to_string(),
        kind: AssessmentType::Quiz,
        questions: vec![
            question("Which organelle?", QuestionType::MultipleChoice, Some(Value::from("B")), 40.0),
            question("Cells are alive", QuestionType::TrueFalse, Some(Value::from(true)), 10.0),
            question(
                "Name the process",
                QuestionType::ShortAnswer,
                Some(Value::from("Photosynthesis")),
                10.0,
            ),
            question("Describe a cell", QuestionType::Essay, None, 40.0),
        ],
        declared_total_points: None,
        passing_score: 70.0,
        duration: Some(30),
        start_date: Some(START_DATE),
        end_date: Some(END_DATE),
        is_published: true,
        order: 1,
    }
}

fn catalog_assessments() -> Vec<Assessment> {
    let open_ended = Assessment {
        id: OTHER_ASSESSMENT_ID.to_string(),
        title: "Open project".to_string(),
        kind: AssessmentType::Project,
        questions: vec![question("Upload your work", QuestionType::Coding, None, 50.0)],
        end_date: None,
        order: 2,
        ..sample_assessment()
    };
    let unpublished = Assessment {
        id: UNPUBLISHED_ASSESSMENT_ID.to_string(),
        is_published: false,
        order: 3,
        ..sample_assessment()
    };
    let zero_points = Assessment {
        id: ZERO_POINT_ASSESSMENT_ID.to_string(),
        questions: vec![Question {
            required: false,
            ..question("Reflection", QuestionType::Essay, None, 0.0)
        }],
        end_date: None,
        order: 4,
        ..sample_assessment()
    };

    vec![sample_assessment(), open_ended, unpublished, zero_points]
}

pub(crate) fn answer(question_index: usize, value: Value) -> Answer {
    Answer {
        question_index,
        value: Some(serde_json::from_value(value).expect("answer value")),
        is_correct: None,
        points_earned: None,
    }
}

pub(crate) fn full_answers() -> Vec<Answer> {
    vec![
        answer(0, Value::from("B")),
        answer(1, Value::from(true)),
        answer(2, Value::from("photosynthesis")),
        answer(3, Value::from("A cell has a membrane.")),
    ]
}

/// Draft attempt 1 by `STUDENT_ID` on `ASSESSMENT_ID` with every question answered.
pub(crate) fn sample_submission() -> Submission {
    let created = primitive(START_DATE + Duration::days(1));
    Submission {
        id: SUBMISSION_ID.to_string(),
        assessment_id: ASSESSMENT_ID.to_string(),
        course_id: COURSE_ID.to_string(),
        student_id: STUDENT_ID.to_string(),
        attempt_number: 1,
        status: SubmissionStatus::Draft,
        answers: Json(full_answers()),
        score: None,
        percentage: None,
        feedback: None,
        submitted_at: None,
        graded_at: None,
        graded_by: None,
        attachments: Json(Vec::new()),
        created_at: created,
        updated_at: created,
    }
}

pub(crate) fn submitted_submission(status: SubmissionStatus) -> Submission {
    Submission {
        status,
        submitted_at: Some(primitive(END_DATE - Duration::hours(1))),
        ..sample_submission()
    }
}

/// Seeds `count` rows cycling draft, submitted, late, graded, each by a distinct
/// student, with strictly increasing submission times.
pub(crate) fn seed_submissions(
    store: &MemorySubmissionStore,
    assessment_id: &str,
    count: usize,
) -> Vec<Submission> {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    let base = START_DATE + Duration::days(2);

    (0..count)
        .map(|index| {
            let serial = NEXT.fetch_add(1, Ordering::Relaxed);
            let status = match index % 4 {
                0 => SubmissionStatus::Draft,
                1 => SubmissionStatus::Submitted,
                2 => SubmissionStatus::Late,
                _ => SubmissionStatus::Graded,
            };
            let submitted_at = (status != SubmissionStatus::Draft)
                .then(|| primitive(base + Duration::minutes(index as i64)));

            let row = Submission {
                id: format!("{:024x}", 0x5eed_0000_0000_u64 + serial),
                assessment_id: assessment_id.to_string(),
                student_id: format!("{:024x}", 0xa11c_0000_0000_u64 + serial),
                status,
                submitted_at,
                score: (status == SubmissionStatus::Graded).then_some(80.0),
                percentage: (status == SubmissionStatus::Graded).then_some(80),
                ..sample_submission()
            };
            store.seed(row.clone());
            row
        })
        .collect()
}

pub(crate) fn bearer_token(actor: &Actor, settings: &Settings) -> String {
    security::create_access_token(&actor.id, actor.role, settings, Duration::hours(1))
        .expect("token")
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
