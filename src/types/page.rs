//! Cursor pagination types
//!
//! Pages are addressed by sequence number rather than offset, so a client
//! walking forward with `nextCursor` sees a stable sequence of pages even
//! while new items are appended behind it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of items per page
pub const DEFAULT_LIMIT: usize = 100;

/// Maximum allowed items per page
pub const MAX_LIMIT: usize = 1000;

/// Invalid `limit`/`cursor` query parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("limit must be a positive integer")]
    InvalidLimit,
    #[error("limit cannot exceed {}", MAX_LIMIT)]
    LimitTooLarge,
    #[error("cursor must be a non-negative integer")]
    InvalidCursor,
}

/// Page request: how many items, and the exclusive lower bound on sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub limit: usize,
    pub cursor: Option<u64>,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            cursor: None,
        }
    }
}

impl PageParams {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: u64) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Parse and validate raw query-string values.
    ///
    /// Absent values fall back to the defaults; present values must be
    /// integers (`limit` in `1..=MAX_LIMIT`, `cursor` non-negative).
    pub fn from_query(limit: Option<&str>, cursor: Option<&str>) -> Result<Self, PaginationError> {
        let mut params = Self::default();

        if let Some(raw) = limit {
            let parsed: i64 = raw
                .trim()
                .parse()
                .map_err(|_| PaginationError::InvalidLimit)?;
            if parsed < 1 {
                return Err(PaginationError::InvalidLimit);
            }
            if parsed > MAX_LIMIT as i64 {
                return Err(PaginationError::LimitTooLarge);
            }
            params.limit = parsed as usize;
        }

        if let Some(raw) = cursor {
            params.cursor = Some(parse_cursor(raw)?);
        }

        Ok(params)
    }
}

/// Parse a `cursor` query value
pub fn parse_cursor(raw: &str) -> Result<u64, PaginationError> {
    let parsed: i64 = raw
        .trim()
        .parse()
        .map_err(|_| PaginationError::InvalidCursor)?;
    if parsed < 0 {
        return Err(PaginationError::InvalidCursor);
    }
    Ok(parsed as u64)
}

/// A paginated list response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// The items in this page
    pub items: Vec<T>,
    /// Number of items matching the query across all pages
    pub total: usize,
    /// Whether more items exist beyond this page
    pub has_more: bool,
    /// Cursor for the next page; only present when `has_more` is true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<u64>,
}

impl<T> Page<T> {
    /// Project every item while keeping the page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            has_more: self.has_more,
            next_cursor: self.next_cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        let params = PageParams::from_query(None, None).unwrap();
        assert_eq!(params, PageParams::default());
        assert_eq!(params.limit, 100);
        assert_eq!(params.cursor, None);
    }

    #[test]
    fn test_valid_limit_and_cursor() {
        let params = PageParams::from_query(Some("50"), Some("51")).unwrap();
        assert_eq!(params.limit, 50);
        assert_eq!(params.cursor, Some(51));

        let params = PageParams::from_query(Some("1000"), Some("0")).unwrap();
        assert_eq!(params.limit, 1000);
        assert_eq!(params.cursor, Some(0));
    }

    #[test]
    fn test_limit_validation() {
        assert_eq!(
            PageParams::from_query(Some("0"), None),
            Err(PaginationError::InvalidLimit)
        );
        assert_eq!(
            PageParams::from_query(Some("-3"), None),
            Err(PaginationError::InvalidLimit)
        );
        assert_eq!(
            PageParams::from_query(Some("ten"), None),
            Err(PaginationError::InvalidLimit)
        );
        assert_eq!(
            PageParams::from_query(Some("1001"), None),
            Err(PaginationError::LimitTooLarge)
        );
    }

    #[test]
    fn test_cursor_validation() {
        assert_eq!(
            PageParams::from_query(None, Some("-1")),
            Err(PaginationError::InvalidCursor)
        );
        assert_eq!(
            PageParams::from_query(None, Some("abc")),
            Err(PaginationError::InvalidCursor)
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(PaginationError::LimitTooLarge.to_string(), "limit cannot exceed 1000");
        assert_eq!(
            PaginationError::InvalidCursor.to_string(),
            "cursor must be a non-negative integer"
        );
    }

    #[test]
    fn test_next_cursor_omitted_when_absent() {
        let page: Page<u32> = Page {
            items: vec![1],
            total: 1,
            has_more: false,
            next_cursor: None,
        };
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["hasMore"], false);
        assert!(value.get("nextCursor").is_none());
    }
}
