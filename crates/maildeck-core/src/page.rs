//! Cursor pagination primitives.
//!
//! All list surfaces page the same way: fetch `limit + 1` rows keyed
//! strictly after the cursor, keep `limit`, and expose the key of the
//! last kept row as the next cursor. Sort keys always tie-break on
//! the message ID, so pages stay stable and gap-free while rows
//! mutate underneath.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::Result;

/// Opaque continuation token for list endpoints.
///
/// Internally the ID of the message backing the last row of the
/// previous page. Callers must treat it as opaque and pass it back
/// unchanged; on the wire it travels as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Cursor(pub i64);

impl Cursor {
    /// Create a cursor from a raw message ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.0.to_string()
    }
}

impl TryFrom<String> for Cursor {
    type Error = std::num::ParseIntError;

    fn try_from(raw: String) -> std::result::Result<Self, Self::Error> {
        raw.parse()
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Cursor {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}

/// A window request: where to resume and how many items to return.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    /// Resume strictly after this cursor, `None` for the first page.
    pub cursor: Option<Cursor>,
    /// Maximum number of items to return.
    pub limit: usize,
}

impl PageRequest {
    /// Request the first page.
    #[must_use]
    pub const fn first(limit: usize) -> Self {
        Self {
            cursor: None,
            limit,
        }
    }

    /// Request the page after `cursor`.
    #[must_use]
    pub const fn after(cursor: Cursor, limit: usize) -> Self {
        Self {
            cursor: Some(cursor),
            limit,
        }
    }

    /// Apply the server-side cap to the requested limit.
    ///
    /// Oversized limits clamp silently; the cap wins regardless of
    /// what the client asked for.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the requested limit is zero.
    pub fn clamped(self, max: usize) -> Result<Self> {
        if self.limit == 0 {
            return Err(Error::validation("limit", "must be at least 1"));
        }
        Ok(Self {
            cursor: self.cursor,
            limit: self.limit.min(max),
        })
    }
}

/// One page of results plus its continuation state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items in presentation order, at most the requested limit.
    pub items: Vec<T>,
    /// Token resuming after the last item, `None` on the final page.
    pub next_cursor: Option<Cursor>,
    /// Whether another page exists.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// An empty final page, also used for unresolvable cursors.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }

    /// Assemble a page from an overfetched row set.
    ///
    /// `rows` holds at most `limit + 1` items; the extra row only
    /// proves another page exists and is dropped. The next cursor is
    /// the key of the last kept row.
    pub fn from_rows(mut rows: Vec<T>, limit: usize, cursor_of: impl Fn(&T) -> Cursor) -> Self {
        let has_more = rows.len() > limit;
        rows.truncate(limit);
        let next_cursor = if has_more {
            rows.last().map(cursor_of)
        } else {
            None
        };
        Self {
            items: rows,
            next_cursor,
            has_more,
        }
    }

    /// Map items while keeping the continuation state.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(page: &Page<i64>) -> Vec<i64> {
        page.items.clone()
    }

    #[test]
    fn partial_fetch_is_the_final_page() {
        let page = Page::from_rows(vec![3, 2], 5, |&id| Cursor::new(id));
        assert_eq!(ids(&page), vec![3, 2]);
        assert!(!page.has_more);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn exact_fetch_without_extra_row_is_final() {
        let page = Page::from_rows(vec![3, 2], 2, |&id| Cursor::new(id));
        assert_eq!(ids(&page), vec![3, 2]);
        assert!(!page.has_more);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn overfetched_row_becomes_continuation() {
        let page = Page::from_rows(vec![5, 4, 3], 2, |&id| Cursor::new(id));
        assert_eq!(ids(&page), vec![5, 4]);
        assert!(page.has_more);
        assert_eq!(page.next_cursor, Some(Cursor::new(4)));
    }

    #[test]
    fn empty_page_has_no_continuation() {
        let page = Page::<i64>::empty();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn clamp_rejects_zero_limit() {
        let err = PageRequest::first(0).clamped(100).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "limit", .. }));
    }

    #[test]
    fn clamp_caps_oversized_limit() {
        let request = PageRequest::first(5000).clamped(100).unwrap();
        assert_eq!(request.limit, 100);

        let request = PageRequest::first(10).clamped(100).unwrap();
        assert_eq!(request.limit, 10);
    }

    #[test]
    fn cursor_parses_from_string() {
        let cursor: Cursor = "42".parse().unwrap();
        assert_eq!(cursor, Cursor::new(42));
        assert!("nope".parse::<Cursor>().is_err());
    }

    #[test]
    fn cursor_travels_as_a_string() {
        let json = serde_json::to_string(&Cursor::new(42)).unwrap();
        assert_eq!(json, r#""42""#);
        let back: Cursor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Cursor::new(42));
    }

    #[test]
    fn map_keeps_continuation_state() {
        let page = Page::from_rows(vec![5, 4, 3], 2, |&id| Cursor::new(id)).map(|id| id * 10);
        assert_eq!(page.items, vec![50, 40]);
        assert!(page.has_more);
        assert_eq!(page.next_cursor, Some(Cursor::new(4)));
    }
}
