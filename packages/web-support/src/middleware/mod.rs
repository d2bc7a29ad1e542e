pub mod content_type;
pub mod request_id;
pub mod security_headers;
pub mod service_info;
pub mod structured_logger;

pub use content_type::{ContentTypeJson, ContentTypeUtf8};
pub use request_id::{RequestId, RequestIdValue};
pub use security_headers::SecurityHeaders;
pub use service_info::{ServiceHeader, ServiceInfo};
pub use structured_logger::StructuredLogger;
