pub mod error;
pub mod middleware;
pub mod services;

use actix_web::web;

pub use error::{ErrorBody, json_config};

/// 注册全部路由
///
/// 通配的重定向路由必须最后注册。
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(services::health_routes())
        .service(services::link_routes())
        .service(services::redirect_routes());
}
