use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError};
use std::error::Error as _;
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::ServerError;

pub static X_TRACE_ID: &str = "x-trace-id";

/// JSON bodies smaller than this are logged verbatim at `debug`.
const BODY_LOG_LIMIT: usize = 1024;

/// Tag every request with a trace id, log it, and echo the id back.
///
/// An incoming `x-trace-id` that parses as a UUID is reused; otherwise a new
/// one is generated. A request body that cannot be read in full never reaches
/// the handlers: it is answered with 413 when it hit the size limit and 400
/// otherwise.
pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();

        let (parts, body) = req.into_parts();
        let mut response = match buffer_and_log("request", &parts.headers, body).await {
            Ok(req_bytes) => {
                let mut req = Request::from_parts(parts, Body::from(req_bytes));
                if let Some(value) = &header_value {
                    req.headers_mut().insert(X_TRACE_ID, value.clone());
                }
                let response = next.run(req).await;

                let (parts, body) = response.into_parts();
                match buffer_and_log("response", &parts.headers, body).await {
                    Ok(res_bytes) => Response::from_parts(parts, Body::from(res_bytes)),
                    Err(e) => ServerError::Internal(format!("unreadable response body: {e}"))
                        .into_response(),
                }
            }
            Err(e) => request_body_error(&e).into_response(),
        };

        if let Some(value) = header_value {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );

        response
    }
    .instrument(span)
    .await
}

/// Collect `body`, logging it when it is small JSON.
async fn buffer_and_log(
    direction: &str,
    headers: &HeaderMap,
    body: Body,
) -> Result<Bytes, axum::Error> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let bytes = body
        .collect()
        .await
        .inspect_err(|e| warn!(error = %e, direction, "failed to buffer body"))?
        .to_bytes();

    if content_type.contains("application/json") && bytes.len() < BODY_LOG_LIMIT {
        if let Ok(text) = std::str::from_utf8(&bytes) {
            debug!(direction, body = text, "body");
        }
    } else if !bytes.is_empty() {
        debug!(direction, content_type, size = bytes.len(), "body skipped");
    }

    Ok(bytes)
}

/// Map a failed read of the request body to the error the caller sees.
fn request_body_error(err: &axum::Error) -> ServerError {
    let mut source = err.source();
    while let Some(cause) = source {
        if cause.is::<LengthLimitError>() {
            return ServerError::PayloadTooLarge;
        }
        source = cause.source();
    }
    ServerError::BadRequest(format!("unreadable request body: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{Full, Limited};

    #[tokio::test]
    async fn length_limit_is_too_large() {
        let body = Limited::new(Full::new(Bytes::from_static(b"more than four")), 4);
        let err = axum::Error::new(body.collect().await.err().expect("limit exceeded"));
        assert!(matches!(request_body_error(&err), ServerError::PayloadTooLarge));
    }

    #[test]
    fn other_read_failures_are_bad_requests() {
        let err = axum::Error::new(std::io::Error::other("connection reset"));
        assert!(matches!(request_body_error(&err), ServerError::BadRequest(_)));
    }
}
