//! Page metadata extraction from the document head

mod metadata;

pub use metadata::{PageMetadata, extract_metadata};
