use sqlx::PgPool;
use sqlx::{Postgres, QueryBuilder};

use crate::db::models::Submission;

use super::types::{SubmissionFilter, COLUMNS};

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn latest_attempt_number(
    pool: &PgPool,
    assessment_id: &str,
    student_id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(attempt_number), 0)
         FROM submissions
         WHERE assessment_id = $1 AND student_id = $2",
    )
    .bind(assessment_id)
    .bind(student_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &SubmissionFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<Submission>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM submissions"));
    filter.push_where(&mut builder);

    builder.push(" ORDER BY submitted_at DESC NULLS LAST, id ASC OFFSET ");
    builder.push_bind(offset.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.max(1));

    builder.build_query_as::<Submission>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &SubmissionFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM submissions");
    filter.push_where(&mut builder);

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}
