//! Graph cursor pagination
//!
//! Graph wraps every collection response in an envelope:
//!
//! ```json
//! {
//!   "data": [ ... ],
//!   "paging": {
//!     "cursors": { "before": "...", "after": "..." },
//!     "next": "https://graph.facebook.com/..."
//!   }
//! }
//! ```
//!
//! The next page is requested by repeating the query with
//! `after=<cursor>`. Pagination stops when a page is empty, when no
//! cursor can be found, or when the cursor stops advancing.

use super::types::{NextPage, PaginationState, Paginator};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;
use url::Url;

/// Query parameter Graph uses for the page cursor
pub const CURSOR_PARAM: &str = "after";

/// Cursor paginator for Graph collection responses
#[derive(Debug, Clone, Default)]
pub struct GraphCursorPaginator;

impl GraphCursorPaginator {
    /// Create a new Graph cursor paginator
    pub fn new() -> Self {
        Self
    }
}

impl Paginator for GraphCursorPaginator {
    fn initial_params(&self, state: &PaginationState) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if let Some(cursor) = &state.cursor {
            params.insert(CURSOR_PARAM.to_string(), cursor.clone());
        }
        params
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_page();
        state.add_fetched(records_count as u64);

        if records_count == 0 {
            state.mark_done();
            return NextPage::Done;
        }

        let Some(cursor) = extract_cursor(body) else {
            state.mark_done();
            return NextPage::Done;
        };

        // A cursor that does not advance would refetch the same page forever
        if state.cursor.as_deref() == Some(cursor.as_str()) {
            warn!(cursor, "Pagination cursor did not advance, stopping");
            state.mark_done();
            return NextPage::Done;
        }

        state.set_cursor(cursor.clone());
        NextPage::with_param(CURSOR_PARAM, cursor)
    }
}

/// Pull the next-page cursor out of the paging envelope
///
/// Prefers `paging.cursors.after`. Some edges omit the cursors block but
/// still carry a full `paging.next` URL, so the `after` parameter is
/// recovered from there as a fallback.
fn extract_cursor(body: &Value) -> Option<String> {
    if let Some(after) = body
        .pointer("/paging/cursors/after")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    {
        return Some(after.to_string());
    }

    let next = body.pointer("/paging/next").and_then(Value::as_str)?;
    let url = Url::parse(next).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == CURSOR_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|s| !s.is_empty())
}
