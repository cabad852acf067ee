//! Query-string parameter parsers.

mod filter;
mod page;

pub use filter::parse_filter;
pub use page::{Page, PageOptions, SizeOptions, parse_page};
