use crate::core::config::GradingSettings;
use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;
use crate::repositories::{SubmissionFilter, SubmissionStore};
use crate::services::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageRequest {
    pub(crate) page: i64,
    pub(crate) limit: i64,
}

impl PageRequest {
    /// Pages are 1-based. A missing page is 1, a missing limit takes the configured
    /// default, and limits are clamped to `[1, max_page_limit]`.
    pub(crate) fn new(
        page: Option<i64>,
        limit: Option<i64>,
        settings: &GradingSettings,
    ) -> Result<Self, ServiceError> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(ServiceError::validation("page", "Page must be 1 or greater"));
        }

        let limit =
            limit.unwrap_or(settings.default_page_limit).clamp(1, settings.max_page_limit.max(1));

        Ok(Self { page, limit })
    }

    /// Same as `new` for raw query-string values; non-integers are validation errors.
    pub(crate) fn parse(
        page: Option<&str>,
        limit: Option<&str>,
        settings: &GradingSettings,
    ) -> Result<Self, ServiceError> {
        Self::new(parse_integer("page", page)?, parse_integer("limit", limit)?, settings)
    }

    pub(crate) fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Page<T> {
    pub(crate) rows: Vec<T>,
    pub(crate) total: i64,
    pub(crate) page: i64,
    pub(crate) pages: i64,
}

fn parse_integer(field: &'static str, raw: Option<&str>) -> Result<Option<i64>, ServiceError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ServiceError::validation(field, format!("{field} must be an integer"))),
    }
}

pub(crate) fn page_count(total: i64, limit: i64) -> i64 {
    let limit = limit.max(1);
    let total = total.max(0);
    ((total + limit - 1) / limit).max(1)
}

/// `None`, empty and `all` mean no status filter.
pub(crate) fn parse_status_filter(
    raw: Option<&str>,
) -> Result<Option<SubmissionStatus>, ServiceError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
        Some(value) => SubmissionStatus::parse(value).map(Some).ok_or_else(|| {
            ServiceError::validation(
                "status",
                "Status must be one of draft, submitted, late, graded or all",
            )
        }),
    }
}

/// One page of submissions plus the total for the same filter. Either query failing
/// fails the listing.
pub(crate) async fn list(
    store: &dyn SubmissionStore,
    filter: &SubmissionFilter,
    request: PageRequest,
) -> Result<Page<Submission>, ServiceError> {
    let (rows, total) = tokio::try_join!(
        store.list(filter, request.offset(), request.limit),
        store.count(filter),
    )?;

    Ok(Page { rows, total, page: request.page, pages: page_count(total, request.limit) })
}
