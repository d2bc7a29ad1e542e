//! Content-Type guards
//!
//! Requests whose trimmed, lowercased `Content-Type` does not contain the
//! required token are rejected with 415 and a failed envelope. The rejection
//! is an ordinary response, so outer middleware still decorates it.

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{header, StatusCode};
use actix_web::Error as ActixError;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use serde_json::json;
use tracing::debug;

use crate::json::failed_response;

#[derive(Debug, Clone, Copy)]
struct Requirement {
    token: &'static str,
    message: &'static str,
}

const JSON: Requirement = Requirement {
    token: "application/json",
    message: "Content-Type is empty or not application/json",
};

const UTF8: Requirement = Requirement {
    token: "charset=utf-8",
    message: "Content-Type is empty or not charset=utf-8",
};

/// Requires `application/json`.
pub struct ContentTypeJson;

/// Requires `charset=utf-8`.
pub struct ContentTypeUtf8;

macro_rules! content_type_transform {
    ($guard:ty, $requirement:expr) => {
        impl<S, B> Transform<S, ServiceRequest> for $guard
        where
            S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
            S::Future: 'static,
            B: 'static,
        {
            type Response = ServiceResponse<EitherBody<B>>;
            type Error = ActixError;
            type InitError = ();
            type Transform = ContentTypeMiddleware<S>;
            type Future = Ready<Result<Self::Transform, Self::InitError>>;

            fn new_transform(&self, service: S) -> Self::Future {
                ready(Ok(ContentTypeMiddleware {
                    service,
                    requirement: $requirement,
                }))
            }
        }
    };
}

content_type_transform!(ContentTypeJson, JSON);
content_type_transform!(ContentTypeUtf8, UTF8);

pub struct ContentTypeMiddleware<S> {
    service: S,
    requirement: Requirement,
}

impl<S, B> Service<ServiceRequest> for ContentTypeMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if satisfies(content_type, self.requirement.token) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        debug!(
            content_type = "rejected",
            required = self.requirement.token,
            received = %content_type,
            path = %req.path()
        );

        let response = failed_response(
            req.request(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            &[json!({ "message": self.requirement.message })],
        );
        let res = req.into_response(response).map_into_right_body();
        Box::pin(async move { Ok(res) })
    }
}

fn satisfies(content_type: &str, token: &str) -> bool {
    content_type.trim().to_lowercase().contains(token)
}
