//! JSON envelope responses.
//!
//! Every helper tags the response with the request id assigned by
//! [`RequestId`](crate::middleware::RequestId) and, when
//! [`ServiceHeader`](crate::middleware::ServiceHeader) is mounted, the service
//! name and version.

use actix_web::http::StatusCode;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, HttpResponseBuilder};
use serde::Serialize;
use serde_json::json;

use crate::middleware::request_id::RequestIdValue;
use crate::middleware::service_info::ServiceInfo;
use crate::{REQUEST_ID_HEADER, SERVICE_NAME_HEADER, SERVICE_VERSION_HEADER};

/// `{"status":"success"}`
pub fn success_response(req: &HttpRequest, status: StatusCode) -> HttpResponse {
    respond(req, status).json(json!({ "status": "success" }))
}

/// `{"status":"success","data":{..}}`
pub fn data_response<T: Serialize>(req: &HttpRequest, status: StatusCode, data: T) -> HttpResponse {
    respond(req, status).json(json!({ "status": "success", "data": data }))
}

/// `{"status":"failed","data":[..]}`
pub fn failed_response<T: Serialize>(
    req: &HttpRequest,
    status: StatusCode,
    data: &[T],
) -> HttpResponse {
    respond(req, status).json(json!({ "status": "failed", "data": data }))
}

/// `{"status":"error","message":".."}`
pub fn error_response(req: &HttpRequest, status: StatusCode, message: &str) -> HttpResponse {
    respond(req, status).json(json!({ "status": "error", "message": message }))
}

fn respond(req: &HttpRequest, status: StatusCode) -> HttpResponseBuilder {
    let mut builder = HttpResponse::build(status);
    let extensions = req.extensions();

    if let Some(RequestIdValue(id)) = extensions.get::<RequestIdValue>() {
        builder.insert_header((REQUEST_ID_HEADER, id.as_str()));
    }
    if let Some(info) = extensions.get::<ServiceInfo>() {
        builder.insert_header((SERVICE_NAME_HEADER, info.name.as_str()));
        builder.insert_header((SERVICE_VERSION_HEADER, info.version.as_str()));
    }

    builder
}

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;
    use actix_web::test::TestRequest;
    use serde_json::Value;

    use super::*;

    async fn body_json(res: HttpResponse) -> Value {
        let bytes = to_bytes(res.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_web::test]
    async fn test_success_envelope_without_context() {
        let req = TestRequest::default().to_http_request();
        let res = success_response(&req, StatusCode::OK);

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(REQUEST_ID_HEADER).is_none());
        assert!(res.headers().get(SERVICE_NAME_HEADER).is_none());
        assert_eq!(body_json(res).await, json!({ "status": "success" }));
    }

    #[actix_web::test]
    async fn test_context_headers_are_copied() {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut()
            .insert(RequestIdValue("req-42".to_string()));
        req.extensions_mut().insert(ServiceInfo::new("orders", "1.4.0"));

        let res = data_response(&req, StatusCode::CREATED, json!({ "id": 7 }));

        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers().get(REQUEST_ID_HEADER).unwrap(), "req-42");
        assert_eq!(res.headers().get(SERVICE_NAME_HEADER).unwrap(), "orders");
        assert_eq!(res.headers().get(SERVICE_VERSION_HEADER).unwrap(), "1.4.0");
        assert_eq!(
            body_json(res).await,
            json!({ "status": "success", "data": { "id": 7 } })
        );
    }

    #[actix_web::test]
    async fn test_failed_and_error_envelopes() {
        let req = TestRequest::default().to_http_request();

        let res = failed_response(
            &req,
            StatusCode::UNPROCESSABLE_ENTITY,
            &[json!({ "field": "email", "message": "is required" })],
        );
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(res).await,
            json!({
                "status": "failed",
                "data": [{ "field": "email", "message": "is required" }]
            })
        );

        let res = error_response(&req, StatusCode::INTERNAL_SERVER_ERROR, "db unavailable");
        assert_eq!(
            body_json(res).await,
            json!({ "status": "error", "message": "db unavailable" })
        );
    }
}
