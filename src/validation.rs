use crate::error::{AppError, AppResult};

// =============================================================================
// Validation Constants
// =============================================================================

/// Page used when the `page` query parameter is absent or empty.
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when the `limit` query parameter is absent or empty.
pub const DEFAULT_LIMIT: u64 = 10;

/// Resolved pagination window for a list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page number
    pub page: u64,
    /// Maximum number of items on the page
    pub limit: u64,
    /// Number of items to skip, `(page - 1) * limit`
    pub skip: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            skip: 0,
        }
    }
}

/// Validate the text of a joke.
///
/// The text is required: an empty string (including a missing field, which
/// decodes to empty) is rejected.
pub fn validate_joke_text(text: &str) -> AppResult<()> {
    if text.is_empty() {
        return Err(AppError::BadRequest(
            "validation failed: joke is required".to_string(),
        ));
    }
    Ok(())
}

/// Validate a path identifier and return it unchanged.
///
/// Only presence is checked here; hex decoding happens further down.
pub fn validate_id(id: &str) -> AppResult<&str> {
    if id.is_empty() {
        return Err(AppError::BadRequest("id is required".to_string()));
    }
    Ok(id)
}

/// Parse the raw `page` and `limit` query parameters.
///
/// Absent or empty values fall back to [`DEFAULT_PAGE`] and
/// [`DEFAULT_LIMIT`]. Anything else must be a positive integer. A page whose
/// skip offset overflows is reported as an invalid page.
pub fn parse_pagination(page: Option<&str>, limit: Option<&str>) -> AppResult<Pagination> {
    let page = parse_positive(page, DEFAULT_PAGE)
        .ok_or_else(|| AppError::BadRequest("invalid page number".to_string()))?;
    let limit = parse_positive(limit, DEFAULT_LIMIT)
        .ok_or_else(|| AppError::BadRequest("invalid limit number".to_string()))?;

    let skip = (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| AppError::BadRequest("invalid page number".to_string()))?;

    Ok(Pagination { page, limit, skip })
}

fn parse_positive(raw: Option<&str>, default: u64) -> Option<u64> {
    match raw {
        None | Some("") => Some(default),
        Some(s) => s.parse::<i64>().ok().filter(|n| *n > 0).map(i64::unsigned_abs),
    }
}
