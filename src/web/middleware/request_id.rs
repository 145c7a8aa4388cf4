//! Per-request tracing spans with caller-supplied or generated request IDs.
//!
//! Honors an incoming `X-Request-Id` header so logs correlate with an
//! upstream proxy; otherwise generates a ULID. The resolved ID is always
//! echoed back in the `X-Request-Id` response header.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::response::Response;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;

static REQUEST_ID: &str = "x-request-id";

/// Longest incoming ID we accept before generating our own.
const MAX_INCOMING_LEN: usize = 128;

#[derive(Clone)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response<B>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let req_id = resolve_request_id(req.headers().get(REQUEST_ID));

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let span = tracing::info_span!("request", req_id = %req_id);
        let start = Instant::now();

        let future = self.inner.call(req);
        let header_value = HeaderValue::from_str(&req_id).ok();

        Box::pin(
            async move {
                let mut result = future.await;

                let duration_ms = start.elapsed().as_millis() as u64;

                match &result {
                    Ok(response) => {
                        let status = response.status().as_u16();
                        match status {
                            200..=399 => {
                                tracing::debug!(method = %method, path = %path, status, duration_ms, "Response");
                            }
                            400..=499 => {
                                tracing::info!(method = %method, path = %path, status, duration_ms, "Response");
                            }
                            _ => {
                                tracing::warn!(method = %method, path = %path, status, duration_ms, "Response");
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(method = %method, path = %path, error = ?e, duration_ms, "Request failed");
                    }
                }

                if let Ok(ref mut response) = result
                    && let Some(value) = header_value
                {
                    response.headers_mut().insert(REQUEST_ID, value);
                }

                result
            }
            .instrument(span),
        )
    }
}

/// Use the caller's ID when it is short, visible ASCII; otherwise mint a ULID.
fn resolve_request_id(incoming: Option<&HeaderValue>) -> String {
    incoming
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_INCOMING_LEN)
        .map(String::from)
        .unwrap_or_else(|| ulid::Ulid::new().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_id_is_reused() {
        let value = HeaderValue::from_static("edge-123");
        assert_eq!(resolve_request_id(Some(&value)), "edge-123");
    }

    #[test]
    fn missing_or_oversized_id_generates_ulid() {
        let generated = resolve_request_id(None);
        assert_eq!(generated.len(), 26);

        let long = HeaderValue::from_str(&"x".repeat(MAX_INCOMING_LEN + 1)).unwrap();
        assert_eq!(resolve_request_id(Some(&long)).len(), 26);
    }
}
