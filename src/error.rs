use axum::http::response::Parts;

use crate::body_wrapper::BodyCaptureError;

/// A body could not be buffered for logging.
///
/// This is a failure of the logging layer, not of the HTTP exchange. When it happens on the
/// request side nothing was sent. When it happens on the response side the exchange already
/// completed; the response status and headers are kept in [`CopyBodyError::Response`] but the
/// body is gone.
#[derive(Debug, thiserror::Error)]
pub enum CopyBodyError {
    #[error("copy request body error: {source}")]
    Request { source: BodyCaptureError },

    #[error("copy response body error: {source}")]
    Response {
        source: BodyCaptureError,
        parts: Box<Parts>,
    },
}

impl CopyBodyError {
    /// Status line and headers of the response whose body could not be read.
    pub fn response_parts(&self) -> Option<&Parts> {
        match self {
            CopyBodyError::Request { .. } => None,
            CopyBodyError::Response { parts, .. } => Some(parts),
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, CopyBodyError::Request { .. })
    }
}
