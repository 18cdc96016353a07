//! Body capture utilities.
//!
//! HTTP bodies are single-consume streams. This module reads a request or response body to
//! the end for logging and puts an equivalent, fresh body back into the message so the rest
//! of the pipeline can read it again from the start.

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{Request, Response};
use http_body_util::{BodyExt, Full};
use std::convert::Infallible;

/// Error type for body capture operations
#[derive(Debug, thiserror::Error)]
pub enum BodyCaptureError {
    #[error("body stream error: {0}")]
    Stream(#[from] axum::Error),
}

/// A message that owns a replaceable [`Body`] slot.
///
/// Implemented for both [`Request<Body>`] and [`Response<Body>`] so that a single capture
/// routine serves both sides of an exchange.
pub trait BodySlot {
    /// Mutable access to the message body.
    fn body_slot(&mut self) -> &mut Body;
}

impl BodySlot for Request<Body> {
    fn body_slot(&mut self) -> &mut Body {
        self.body_mut()
    }
}

impl BodySlot for Response<Body> {
    fn body_slot(&mut self) -> &mut Body {
        self.body_mut()
    }
}

/// Reads the full body of `message` and restores it so it can be consumed again.
///
/// A body that is already at end of stream (for example [`Body::empty()`]) counts as absent:
/// empty bytes are returned and the slot is not touched.
///
/// On success the slot holds a new body over the captured bytes, followed by the original
/// trailers if there were any. Only the data frames are returned. If reading fails the
/// original stream has already been dropped and the slot is left holding an empty body.
///
/// # Examples
///
/// ```rust
/// use axum::body::Body;
/// use axum::http::Request;
/// use http_body_util::BodyExt;
/// use httplog::body_wrapper::capture_body;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut request = Request::new(Body::from("Hello, World!"));
///
/// let captured = capture_body(&mut request).await?;
/// assert_eq!(captured, "Hello, World!");
///
/// // The body is still there for whoever sends the request
/// let body = request.into_body().collect().await?.to_bytes();
/// assert_eq!(body, "Hello, World!");
/// # Ok(())
/// # }
/// ```
pub async fn capture_body<M>(message: &mut M) -> Result<Bytes, BodyCaptureError>
where
    M: BodySlot + ?Sized,
{
    let slot = message.body_slot();
    if slot.is_end_stream() {
        return Ok(Bytes::new());
    }

    let body = std::mem::take(slot);
    let collected = body.collect().await?;
    let trailers = collected.trailers().cloned();
    let captured = collected.to_bytes();

    *slot = match trailers {
        None => Body::from(captured.clone()),
        Some(trailers) => Body::new(
            Full::new(captured.clone())
                .with_trailers(async move { Some(Ok::<_, Infallible>(trailers)) }),
        ),
    };
    Ok(captured)
}
