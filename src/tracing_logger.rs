//! Default [`Logger`] backed by the `tracing` crate.
//!
//! Records are emitted as `tracing` events under the `httplog` target, so they go wherever the
//! process-wide subscriber sends them.

use axum::http::Extensions;
use tracing::{error, info};

use crate::types::{CorrelationId, Field, Fields};
use crate::Logger;

/// [`Logger`] that forwards records to the current `tracing` subscriber.
///
/// Each event carries:
/// - the record message
/// - `fields`: the record fields as a JSON object, in record order
/// - `correlation_id`, when the request extensions hold a [`CorrelationId`]
///
/// # Examples
///
/// ```rust
/// use httplog::{LoggingLayer, TracingLogger};
/// use std::sync::Arc;
///
/// let layer = LoggingLayer::new(Arc::new(TracingLogger));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, context: &Extensions, message: &str, fields: &[Field]) {
        info!(
            target: "httplog",
            correlation_id = context.get::<CorrelationId>().map(CorrelationId::get),
            fields = %Fields(fields),
            "{message}"
        );
    }

    fn error(&self, context: &Extensions, message: &str, fields: &[Field]) {
        error!(
            target: "httplog",
            correlation_id = context.get::<CorrelationId>().map(CorrelationId::get),
            fields = %Fields(fields),
            "{message}"
        );
    }
}
