//! HTTP glue shared by actix-web services: JSON envelope responses and the
//! middleware stack that feeds them.

pub mod json;
pub mod middleware;

pub use json::{data_response, error_response, failed_response, success_response};
pub use middleware::{
    ContentTypeJson, ContentTypeUtf8, RequestId, SecurityHeaders, ServiceHeader, ServiceInfo,
    StructuredLogger,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const SERVICE_NAME_HEADER: &str = "x-service-name";
pub const SERVICE_VERSION_HEADER: &str = "x-service-version";
