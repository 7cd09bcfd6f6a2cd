//! Service layer for business logic
//!
//! HTTP handlers call into these services; they never touch storage or cache directly.

mod allocator;
mod url_service;

pub use allocator::{CodeAllocator, CodeGenerator, CodeRegistry};
pub use url_service::*;
