pub mod request_id;
pub mod timing;

pub use request_id::{REQUEST_ID_HEADER, assign_request_id};
pub use timing::TimingMiddleware;
