use thiserror::Error;

use crate::core::robots::RobotsError;

/// Error type for HTTP handler operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HandlerError {
    /// Rendering the document for this request failed
    #[error("Failed to render document: {0}")]
    Render(#[from] RobotsError),
}
