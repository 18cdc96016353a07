//! # httplog
//!
//! A transparent logging decorator for outbound HTTP. [`LoggingTransport`] wraps any tower
//! transport (`Service<Request<Body>, Response = Response<Body>>`), logs every request before
//! it is sent and every response or error after it comes back, and hands both through
//! unchanged.
//!
//! ## Features
//!
//! - **Body-aware**: request and response bodies are buffered for the log record and then
//!   restored, so the transport and the caller still read them from the start
//! - **Leveled records**: successful exchanges log at info, transport errors and HTTP statuses
//!   of 400 and above log at error
//! - **Pluggable sinks**: implement [`Logger`] or use the `tracing`-backed [`TracingLogger`]
//! - **Tower native**: use [`LoggingLayer`] with `ServiceBuilder`, or [`LoggingTransport::new`]
//!   with the bundled [`DefaultTransport`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::body::Body;
//! use axum::http::Request;
//! use httplog::{LoggingConfig, LoggingTransport};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), tower::BoxError> {
//! tracing_subscriber::fmt::init();
//!
//! // Plain HTTP client transport, records go to `tracing`
//! let transport: LoggingTransport = LoggingTransport::new(LoggingConfig::default());
//!
//! let request = Request::get("http://localhost:3000/v1/items?x=1").body(Body::empty())?;
//! let response = transport.execute(request).await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Loggers
//!
//! ```rust
//! use axum::http::Extensions;
//! use httplog::{Field, Logger};
//!
//! #[derive(Debug)]
//! struct StderrLogger;
//!
//! impl Logger for StderrLogger {
//!     fn info(&self, _context: &Extensions, message: &str, fields: &[Field]) {
//!         eprintln!("INFO {message} ({} fields)", fields.len());
//!     }
//!
//!     fn error(&self, _context: &Extensions, message: &str, fields: &[Field]) {
//!         eprintln!("ERROR {message} ({} fields)", fields.len());
//!     }
//! }
//! ```

use axum::{
    body::Body,
    http::{Extensions, Method, Request, Response, Uri},
};
use futures::future::BoxFuture;
use std::{
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tokio::time::Instant;
use tower::{BoxError, Layer, Service, ServiceExt};
use tracing::debug;

pub mod body_wrapper;
pub use body_wrapper::{capture_body, BodyCaptureError, BodySlot};

pub mod client;
pub use client::DefaultTransport;

mod error;
pub use error::CopyBodyError;

pub mod multi_logger;
pub use multi_logger::MultiLogger;

pub mod tracing_logger;
pub use tracing_logger::TracingLogger;

pub mod types;
pub use types::{format_latency, CorrelationId, Field, FieldValue, LogLevel, LogRecord};
use types::{decoded_path, header_map, query_map};

/// Sink for the records produced by [`LoggingTransport`].
///
/// `context` is the extension map of the request being logged. It is only meant for
/// correlating records (see [`CorrelationId`]); nothing a logger does with it affects the
/// exchange.
pub trait Logger: Send + Sync + 'static {
    /// Log an info-level record.
    fn info(&self, context: &Extensions, message: &str, fields: &[Field]);

    /// Log an error-level record.
    fn error(&self, context: &Extensions, message: &str, fields: &[Field]);
}

/// Construction options for [`LoggingTransport`].
///
/// Every field is optional. Missing ones are filled in once, when the transport is built: the
/// transport with `T::default()` and the logger with [`TracingLogger`].
///
/// # Examples
///
/// ```rust
/// use httplog::{DefaultTransport, LoggingConfig, LoggingTransport, TracingLogger};
/// use std::sync::Arc;
///
/// let config = LoggingConfig::default()
///     .with_transport(DefaultTransport::new())
///     .with_logger(Arc::new(TracingLogger));
/// let transport = LoggingTransport::new(config);
/// ```
pub struct LoggingConfig<T = DefaultTransport> {
    /// Transport performing the real exchange
    pub transport: Option<T>,
    /// Where request and response records are sent
    pub logger: Option<Arc<dyn Logger>>,
}

impl<T> Default for LoggingConfig<T> {
    fn default() -> Self {
        Self {
            transport: None,
            logger: None,
        }
    }
}

impl<T> LoggingConfig<T> {
    pub fn with_transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }
}

/// Tower layer wrapping a transport in a [`LoggingTransport`].
///
/// # Examples
///
/// ```rust
/// use httplog::{DefaultTransport, LoggingLayer, TracingLogger};
/// use std::sync::Arc;
/// use tower::ServiceBuilder;
///
/// let transport = ServiceBuilder::new()
///     .layer(LoggingLayer::new(Arc::new(TracingLogger)))
///     .service(DefaultTransport::new());
/// ```
#[derive(Clone)]
pub struct LoggingLayer {
    logger: Arc<dyn Logger>,
}

impl LoggingLayer {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl Default for LoggingLayer {
    fn default() -> Self {
        Self::new(Arc::new(TracingLogger))
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingTransport<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingTransport::wrap(inner, self.logger.clone())
    }
}

/// Transport decorator that logs each request and its response or error.
///
/// For every call:
/// 1. the request body is buffered and an info record `Request-> METHOD /path` is logged;
///    if the body cannot be read the call stops here and the inner transport is never used
/// 2. the inner transport is called and its latency measured
/// 3. a `Response<- METHOD /path` record is logged: error level for transport errors and
///    statuses of 400 and above, info otherwise
///
/// The response is returned as the inner transport produced it, body intact. Transport errors
/// are returned as they came. The only errors the decorator adds are [`CopyBodyError`]s.
///
/// Cloning is cheap when the inner transport is; clones share the logger.
#[derive(Clone)]
pub struct LoggingTransport<S = DefaultTransport> {
    inner: S,
    logger: Arc<dyn Logger>,
}

impl<S: Default> LoggingTransport<S> {
    /// Build a transport from `config`, filling in defaults for missing collaborators.
    pub fn new(config: LoggingConfig<S>) -> Self {
        Self::from_config(config, S::default)
    }
}

impl<S> LoggingTransport<S> {
    /// Build a transport from `config`. `default_transport` is only called when the config
    /// carries no transport, so transports without a `Default` impl can be configured too.
    pub fn from_config(config: LoggingConfig<S>, default_transport: impl FnOnce() -> S) -> Self {
        let logger = config
            .logger
            .unwrap_or_else(|| Arc::new(TracingLogger) as Arc<dyn Logger>);
        Self::wrap(config.transport.unwrap_or_else(default_transport), logger)
    }

    /// Wrap `inner`, sending records to `logger`.
    pub fn wrap(inner: S, logger: Arc<dyn Logger>) -> Self {
        Self { inner, logger }
    }
}

impl<S> LoggingTransport<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
{
    /// Send `request` through a clone of this transport.
    ///
    /// Takes `&self`, so a single instance can be shared between tasks.
    pub async fn execute(&self, request: Request<Body>) -> Result<Response<Body>, BoxError> {
        self.clone().oneshot(request).await
    }
}

impl<S> Service<Request<Body>> for LoggingTransport<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
{
    type Response = Response<Body>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        // The clone goes back in `self`; the instance that was polled ready serves this call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let logger = self.logger.clone();

        Box::pin(async move {
            log_request(logger.as_ref(), &mut request).await?;

            let head = RequestHead {
                method: request.method().clone(),
                uri: request.uri().clone(),
                extensions: request.extensions().clone(),
            };

            debug!(method = %head.method, uri = %head.uri, "Sending request to inner transport");
            let start = Instant::now();
            let result = inner.call(request).await.map_err(Into::into);
            let latency = start.elapsed();
            debug!(latency = ?latency, ok = result.is_ok(), "Inner transport finished");

            log_response(logger.as_ref(), &head, result, latency).await
        })
    }
}

/// What the response record needs from the request after the request was handed off.
struct RequestHead {
    method: Method,
    uri: Uri,
    extensions: Extensions,
}

async fn log_request(logger: &dyn Logger, request: &mut Request<Body>) -> Result<(), BoxError> {
    let body = match capture_body(request).await {
        Ok(body) => body,
        Err(source) => {
            debug!(error = %source, "Failed to capture request body");
            return Err(CopyBodyError::Request { source }.into());
        }
    };

    let uri = request.uri();
    let mut fields = vec![
        Field::new("headers", header_map(request.headers())),
        Field::new("method", request.method().as_str()),
        Field::new("url", uri.to_string()),
        Field::new("body", String::from_utf8_lossy(&body).into_owned()),
    ];

    let query = query_map(uri);
    if !query.is_empty() {
        fields.push(Field::new("query", query));
    }

    let message = format!("Request-> {} {}", request.method(), decoded_path(uri));
    LogRecord::new(LogLevel::Info, message, fields).emit(logger, request.extensions());

    Ok(())
}

async fn log_response(
    logger: &dyn Logger,
    head: &RequestHead,
    result: Result<Response<Body>, BoxError>,
    latency: Duration,
) -> Result<Response<Body>, BoxError> {
    let message = format!("Response<- {} {}", head.method, decoded_path(&head.uri));
    let mut fields = vec![
        Field::new("latency", format_latency(latency)),
        Field::new("method", head.method.as_str()),
        Field::new("url", head.uri.to_string()),
    ];

    let mut response = match result {
        Ok(response) => response,
        Err(err) => {
            fields.push(Field::new("error", err.to_string()));
            LogRecord::new(LogLevel::Error, message, fields).emit(logger, &head.extensions);
            return Err(err);
        }
    };

    let body = match capture_body(&mut response).await {
        Ok(body) => body,
        Err(source) => {
            debug!(error = %source, status = %response.status(), "Failed to capture response body");
            let (parts, _) = response.into_parts();
            return Err(CopyBodyError::Response {
                source,
                parts: Box::new(parts),
            }
            .into());
        }
    };

    let status = response.status().as_u16();
    fields.push(Field::new("status", status));
    fields.push(Field::new("headers", header_map(response.headers())));
    fields.push(Field::new("body", String::from_utf8_lossy(&body).into_owned()));

    let level = if status >= 400 {
        fields.push(Field::new("error", format!("http status: {status}")));
        LogLevel::Error
    } else {
        LogLevel::Info
    };
    LogRecord::new(level, message, fields).emit(logger, &head.extensions);

    Ok(response)
}
