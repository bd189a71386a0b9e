//! Public browse listing: option catalogs, the filter engine and the
//! browse page's URL parameters.

pub mod browse;
pub mod catalog;
pub mod filter;

pub use browse::BrowseQuery;
pub use filter::{ItemFilter, Tab};
