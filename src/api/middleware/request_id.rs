//! 请求 ID
//!
//! 上游代理已带合法 `X-Request-ID` 时沿用，否则生成 UUID v4。
//! ID 挂在本次请求的 tracing span 上，并回写到响应头。

use actix_web::{
    Error,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue},
    middleware::Next,
};
use tracing::{Instrument, info_span};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 上游 ID 的最大长度
const MAX_UPSTREAM_ID_LEN: usize = 128;

fn upstream_request_id(req: &ServiceRequest) -> Option<String> {
    let raw = req.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let accepted = !raw.is_empty()
        && raw.len() <= MAX_UPSTREAM_ID_LEN
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    accepted.then(|| raw.to_string())
}

/// 用法：`App::new().wrap(actix_web::middleware::from_fn(assign_request_id))`
pub async fn assign_request_id(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let request_id = upstream_request_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.path(),
    );

    let mut response = next.call(req).instrument(span).await?;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::middleware::from_fn;
    use actix_web::test::{self, TestRequest};
    use actix_web::{App, HttpResponse, web};

    async fn response_id(req: TestRequest) -> String {
        let app = test::init_service(
            App::new()
                .wrap(from_fn(assign_request_id))
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;
        let resp = test::call_service(&app, req.uri("/").to_request()).await;
        resp.headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[actix_rt::test]
    async fn test_generates_uuid_when_absent() {
        let id = response_id(TestRequest::get()).await;
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[actix_rt::test]
    async fn test_keeps_upstream_id() {
        let id = response_id(TestRequest::get().insert_header((REQUEST_ID_HEADER, "lb-7f3a.01")))
            .await;
        assert_eq!(id, "lb-7f3a.01");
    }

    #[actix_rt::test]
    async fn test_replaces_unsafe_upstream_id() {
        let id = response_id(
            TestRequest::get().insert_header((REQUEST_ID_HEADER, "evil id; drop")),
        )
        .await;
        assert!(Uuid::parse_str(&id).is_ok());

        let long = "a".repeat(MAX_UPSTREAM_ID_LEN + 1);
        let id = response_id(TestRequest::get().insert_header((REQUEST_ID_HEADER, long))).await;
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
