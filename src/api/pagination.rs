use serde::Serialize;

use crate::services::listing::Page;

/// `{ success, data, total, page, pages }` list envelope.
#[derive(Debug, Serialize)]
pub(crate) struct PagedResponse<T> {
    pub(crate) success: bool,
    pub(crate) data: Vec<T>,
    pub(crate) total: i64,
    pub(crate) page: i64,
    pub(crate) pages: i64,
}

impl<T> PagedResponse<T> {
    pub(crate) fn from_page<R>(page: Page<R>, convert: impl FnMut(R) -> T) -> Self {
        Self {
            success: true,
            data: page.rows.into_iter().map(convert).collect(),
            total: page.total,
            page: page.page,
            pages: page.pages,
        }
    }
}
