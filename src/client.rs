//! The transport used when none is configured.

use axum::body::Body;
use axum::http::{Request, Response};
use futures::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client, Error},
    rt::TokioExecutor,
};
use std::task::{Context, Poll};
use tower::Service;

/// Plain HTTP/1 client transport built on `hyper_util`'s pooled client.
///
/// Response bodies are exposed as [`Body`] so the transport fits the same
/// `Service<Request<Body>, Response = Response<Body>>` contract as any other transport
/// wrapped by [`LoggingTransport`](crate::LoggingTransport).
#[derive(Clone)]
pub struct DefaultTransport {
    client: Client<HttpConnector, Body>,
}

impl DefaultTransport {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }
}

impl Default for DefaultTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DefaultTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultTransport").finish_non_exhaustive()
    }
}

impl Service<Request<Body>> for DefaultTransport {
    type Response = Response<Body>;
    type Error = Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let response = self.client.request(request);
        Box::pin(async move { Ok(response.await?.map(Body::new)) })
    }
}
