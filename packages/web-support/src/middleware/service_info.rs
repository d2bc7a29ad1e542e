use std::rc::Rc;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error as ActixError, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use serde::Deserialize;

/// Name and version of the running service, made available to response
/// helpers through request extensions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
}

impl ServiceInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Stores a [`ServiceInfo`] in every request's extensions.
pub struct ServiceHeader {
    info: Rc<ServiceInfo>,
}

impl ServiceHeader {
    pub fn new(info: ServiceInfo) -> Self {
        Self {
            info: Rc::new(info),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ServiceHeader
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type InitError = ();
    type Transform = ServiceHeaderMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ServiceHeaderMiddleware {
            service,
            info: Rc::clone(&self.info),
        }))
    }
}

pub struct ServiceHeaderMiddleware<S> {
    service: S,
    info: Rc<ServiceInfo>,
}

impl<S, B> Service<ServiceRequest> for ServiceHeaderMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        req.extensions_mut().insert(ServiceInfo::clone(&self.info));
        Box::pin(self.service.call(req))
    }
}
