//! Cursor-based pagination for list endpoints.

use serde::{Deserialize, Serialize};

/// Default page size when `count` is not specified.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Maximum allowed page size.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Query parameters accepted by list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    /// Opaque cursor from a previous response.
    pub cursor: Option<String>,
    /// Number of items per page (default 100, max 1000).
    pub count: Option<u32>,
}

impl PaginationParams {
    /// Effective page size, clamped to `[1, MAX_PAGE_SIZE]`.
    pub fn effective_count(&self) -> u32 {
        self.count
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Offset the cursor points at; absent or unreadable cursors start at 0.
    pub fn decode_offset(&self) -> u64 {
        self.cursor
            .as_deref()
            .and_then(decode_cursor)
            .unwrap_or(0)
    }
}

/// One page of a list response.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor for the next page; absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl<T> Page<T> {
    /// Wrap `items` fetched at `offset` with a page size of `page_size`.
    pub fn new(items: Vec<T>, offset: u64, page_size: u32) -> Self {
        let cursor = next_cursor(offset, items.len(), page_size);
        Self { items, cursor }
    }
}

/// Cursors are the hex of the big-endian offset.
pub fn encode_cursor(offset: u64) -> String {
    hex::encode(offset.to_be_bytes())
}

pub fn decode_cursor(cursor: &str) -> Option<u64> {
    let mut bytes = [0u8; 8];
    hex::decode_to_slice(cursor, &mut bytes).ok()?;
    Some(u64::from_be_bytes(bytes))
}

/// The next-page cursor, or `None` when fewer than `page_size` items came
/// back.
pub fn next_cursor(current_offset: u64, returned: usize, page_size: u32) -> Option<String> {
    if (returned as u64) < u64::from(page_size) {
        None
    } else {
        Some(encode_cursor(current_offset.saturating_add(returned as u64)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_decodes_to_its_offset() {
        assert_eq!(decode_cursor(&encode_cursor(123_456_789)), Some(123_456_789));
        assert_eq!(decode_cursor("not-hex"), None);
        assert_eq!(decode_cursor("00ff"), None);
    }

    #[test]
    fn last_page_has_no_cursor() {
        let page = Page::new(vec![1, 2, 3], 0, 10);
        assert!(page.cursor.is_none());
    }

    #[test]
    fn full_page_points_past_itself() {
        let page = Page::new(vec![0u8; 100], 200, 100);
        let next = PaginationParams {
            cursor: page.cursor,
            count: None,
        };
        assert_eq!(next.decode_offset(), 300);
    }

    #[test]
    fn effective_count_clamps() {
        assert_eq!(PaginationParams::default().effective_count(), 100);
        let p = PaginationParams {
            cursor: None,
            count: Some(5000),
        };
        assert_eq!(p.effective_count(), 1000);
        let p = PaginationParams {
            cursor: None,
            count: Some(0),
        };
        assert_eq!(p.effective_count(), 1);
    }
}
