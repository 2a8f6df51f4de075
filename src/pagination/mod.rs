//! Pagination module
//!
//! All Graph collection edges paginate with opaque cursors. The
//! `Paginator` trait keeps the strategy composable with the sync engine
//! instead of baking it into request building.

mod cursor;
mod types;

pub use cursor::{GraphCursorPaginator, CURSOR_PARAM};
pub use types::{NextPage, PaginationState, Paginator};
