use std::collections::BTreeMap;
use std::future::{ready, Ready};
use std::time::Instant;

use actix_web::body::{BodySize, MessageBody};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::HeaderMap;
use actix_web::{Error as ActixError, HttpMessage};
use futures_util::future::LocalBoxFuture;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};

use super::request_id::RequestIdValue;

const REDACTED: &str = "[redacted]";
const SENSITIVE_HEADERS: [&str; 3] = ["authorization", "cookie", "set-cookie"];

/// One log event per request: request id, timing span, request summary and
/// response summary. Responses with status 400 or above log at `warn`.
pub struct StructuredLogger;

impl<S, B> Transform<S, ServiceRequest> for StructuredLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type InitError = ();
    type Transform = StructuredLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(StructuredLoggerMiddleware { service }))
    }
}

pub struct StructuredLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for StructuredLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started_at = OffsetDateTime::now_utc();
        let start = Instant::now();

        let address = req
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_default();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let query = req.query_string().to_string();
        let request_headers = headers_json(req.headers());
        let request_id_of_error = req
            .extensions()
            .get::<RequestIdValue>()
            .map(|v| v.0.clone());

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;

            let (status, bytes, response_headers, request_id) = match &result {
                Ok(res) => (
                    res.status(),
                    body_bytes(res.response().body().size()),
                    headers_json(res.headers()),
                    res.request()
                        .extensions()
                        .get::<RequestIdValue>()
                        .map(|v| v.0.clone()),
                ),
                // Rendering the error here would consume a prebuilt response.
                Err(err) => (
                    err.as_response_error().status_code(),
                    0,
                    String::from("{}"),
                    request_id_of_error,
                ),
            };

            let request_id = request_id.unwrap_or_else(|| "unknown".to_string());
            let span_start = rfc3339(started_at);
            let span_end = rfc3339(OffsetDateTime::now_utc());
            let duration_us = start.elapsed().as_micros() as u64;
            let status_code = status.as_u16();

            if status_code >= 400 {
                warn!(
                    request_id = %request_id,
                    span.start = %span_start,
                    span.end = %span_end,
                    span.duration_us = duration_us,
                    request.address = %address,
                    request.path = %path,
                    request.method = %method,
                    request.headers = %request_headers,
                    request.query = %query,
                    response.status = status_code,
                    response.bytes = bytes,
                    response.headers = %response_headers,
                    "HTTP message logging"
                );
            } else {
                info!(
                    request_id = %request_id,
                    span.start = %span_start,
                    span.end = %span_end,
                    span.duration_us = duration_us,
                    request.address = %address,
                    request.path = %path,
                    request.method = %method,
                    request.headers = %request_headers,
                    request.query = %query,
                    response.status = status_code,
                    response.bytes = bytes,
                    response.headers = %response_headers,
                    "HTTP message logging"
                );
            }

            result
        })
    }
}

fn body_bytes(size: BodySize) -> u64 {
    match size {
        BodySize::Sized(n) => n,
        BodySize::None | BodySize::Stream => 0,
    }
}

fn headers_json(headers: &HeaderMap) -> String {
    let mut map: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, value) in headers.iter() {
        let name = name.as_str();
        let value = if SENSITIVE_HEADERS.contains(&name) {
            REDACTED
        } else {
            value.to_str().unwrap_or("<binary>")
        };
        map.entry(name).or_default().push(value);
    }
    serde_json::to_string(&map).unwrap_or_default()
}

fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use actix_web::http::header::{HeaderName, HeaderValue};

    use super::*;

    #[test]
    fn test_headers_json_redacts_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_static("Bearer abc"),
        );
        headers.insert(
            HeaderName::from_static("accept"),
            HeaderValue::from_static("application/json"),
        );

        let out = headers_json(&headers);
        assert_eq!(
            out,
            r#"{"accept":["application/json"],"authorization":["[redacted]"]}"#
        );
    }

    #[test]
    fn test_body_bytes() {
        assert_eq!(body_bytes(BodySize::Sized(12)), 12);
        assert_eq!(body_bytes(BodySize::Stream), 0);
        assert_eq!(body_bytes(BodySize::None), 0);
    }
}
