//! Disposable Chrome instances for the rendering tier
//!
//! Every instance owns its own profile directory and is closed and removed
//! after a single page load. Nothing here is shared between scrapes.

mod wrapper;

pub use wrapper::{BrowserWrapper, create_blank_page};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Countermeasure {name} failed: {reason}")]
    Countermeasure { name: &'static str, reason: String },

    #[error("Failed to read rendered content: {0}")]
    ContentFailed(String),

    #[error("Browser tier is disabled")]
    Disabled,

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::NavigationFailed(err.to_string())
    }
}

impl From<std::io::Error> for BrowserError {
    fn from(err: std::io::Error) -> Self {
        BrowserError::IoError(err.to_string())
    }
}

pub type BrowserResult<T> = Result<T, BrowserError>;
