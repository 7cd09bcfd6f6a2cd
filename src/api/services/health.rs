//! 存活检查

use actix_web::{HttpResponse, Responder, web};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    time: String,
}

pub struct HealthService;

impl HealthService {
    /// 只表示进程存活，不探测数据库与缓存
    pub async fn health_check() -> impl Responder {
        HttpResponse::Ok().json(HealthBody {
            status: "healthy",
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }
}

pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
}
