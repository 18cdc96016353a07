use axum::{
    body::{Body, Bytes},
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use httplog::{CorrelationId, LoggingConfig, LoggingTransport, MultiLogger, TracingLogger};
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, time::sleep};
use tower::BoxError;
use tracing::info;

// Handlers for the local server the demo talks to
async fn items_handler() -> impl IntoResponse {
    sleep(Duration::from_millis(12)).await; // Simulate some work
    r#"{"ok":true}"#
}

async fn echo_handler(body: Bytes) -> impl IntoResponse {
    format!("Echo: {}", String::from_utf8_lossy(&body))
}

async fn broken_handler() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "httplog=info".into()),
        )
        .init();

    let app = Router::new()
        .route("/v1/items", get(items_handler))
        .route("/echo", post(echo_handler))
        .route("/broken", get(broken_handler));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, app).await });
    info!("Demo server listening on http://{addr}");

    let logger = MultiLogger::new().with(TracingLogger);
    let transport: LoggingTransport =
        LoggingTransport::new(LoggingConfig::default().with_logger(Arc::new(logger)));

    let mut request = Request::get(format!("http://{addr}/v1/items?x=1")).body(Body::empty())?;
    request.extensions_mut().insert(CorrelationId::generate());
    transport.execute(request).await?;

    let request = Request::post(format!("http://{addr}/echo"))
        .header("content-type", "application/json")
        .body(Body::from(r#"{"a":1}"#))?;
    transport.execute(request).await?;

    // Logged at error level, still returned as a normal response
    let request = Request::get(format!("http://{addr}/broken")).body(Body::empty())?;
    let response = transport.execute(request).await?;
    info!(status = %response.status(), "Server error came back as a response");

    // Nothing listens on port 9; the transport error is logged and returned
    let request = Request::get("http://127.0.0.1:9/v1/items").body(Body::empty())?;
    if let Err(err) = transport.execute(request).await {
        info!(error = %err, "Transport error came back as an error");
    }

    Ok(())
}
