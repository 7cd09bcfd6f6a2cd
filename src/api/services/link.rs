//! 短链接 JSON API：创建、统计、列表

use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::SnaplinkError;
use crate::services::UrlService;
use crate::storage::UrlRecord;

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub short_url: String,
    pub short_code: String,
    pub long_url: String,
    pub created_at: DateTime<Utc>,
}

/// `limit` 按字符串接收，非数字时回落到默认值
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub urls: Vec<UrlRecord>,
    pub count: usize,
}

pub struct LinkService;

impl LinkService {
    pub async fn shorten(
        service: web::Data<UrlService>,
        body: web::Json<ShortenRequest>,
    ) -> Result<HttpResponse, SnaplinkError> {
        // 原样使用请求中的字符串，幂等判断是精确匹配
        let long_url = body
            .into_inner()
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| SnaplinkError::invalid_input("URL is required"))?;

        let record = service.shorten(&long_url).await?;
        info!("Shortened {} -> {}", record.long_url, record.short_code);

        Ok(HttpResponse::Ok().json(ShortenResponse {
            short_url: service.short_url(&record.short_code),
            short_code: record.short_code,
            long_url: record.long_url,
            created_at: record.created_at,
        }))
    }

    pub async fn stats(
        service: web::Data<UrlService>,
        path: web::Path<String>,
    ) -> Result<HttpResponse, SnaplinkError> {
        let stats = service.stats(&path.into_inner()).await?;
        Ok(HttpResponse::Ok().json(stats))
    }

    pub async fn list(
        service: web::Data<UrlService>,
        query: web::Query<ListQuery>,
    ) -> Result<HttpResponse, SnaplinkError> {
        let limit = query
            .into_inner()
            .limit
            .and_then(|raw| raw.trim().parse::<i64>().ok());
        let urls = service.list(limit).await?;

        Ok(HttpResponse::Ok().json(ListResponse {
            count: urls.len(),
            urls,
        }))
    }
}

pub fn link_routes() -> actix_web::Scope {
    web::scope("/api")
        .route("/shorten", web::post().to(LinkService::shorten))
        .route("/stats/{short_code}", web::get().to(LinkService::stats))
        .route("/list", web::get().to(LinkService::list))
}
