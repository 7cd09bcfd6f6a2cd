//! HTTP 错误映射
//!
//! 内部错误只记录日志，客户端只看到通用信息。

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, error::JsonPayloadError, web};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::SnaplinkError;

/// 错误响应体
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub error: String,
    pub message: String,
}

impl ResponseError for SnaplinkError {
    fn status_code(&self) -> StatusCode {
        match self {
            SnaplinkError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SnaplinkError::NotFound(_) => StatusCode::NOT_FOUND,
            SnaplinkError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.is_internal() {
            error!("Request failed with {}: {}", self.code(), self);
            "Internal Server Error".to_string()
        } else {
            self.message().to_string()
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            code: self.code().to_string(),
            error: self.error_type().to_string(),
            message,
        })
    }
}

/// JSON 解析失败统一返回 400
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err: JsonPayloadError, _req| {
            let message = match &err {
                JsonPayloadError::Deserialize(e) if e.is_data() => {
                    format!("Invalid JSON: {}", e)
                }
                _ => "Invalid JSON".to_string(),
            };
            SnaplinkError::invalid_input(message).into()
        })
}
