pub mod constants;
mod errors;

pub use errors::{ScrapeError, SearchError};
