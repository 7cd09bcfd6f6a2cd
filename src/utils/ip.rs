//! 客户端 IP 提取
//!
//! 规则：`X-Forwarded-For` 存在时取第一个条目，否则使用连接的对端地址。

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;

/// 从 HttpRequest 提取客户端 IP
pub fn extract_client_ip(req: &HttpRequest) -> Option<String> {
    extract_forwarded_ip_from_headers(req.headers())
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
}

/// 从 HeaderMap 提取转发的 IP（取第一个，即原始客户端 IP）
pub fn extract_forwarded_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 提取 User-Agent
pub fn extract_user_agent(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(actix_web::http::header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.7, 10.0.0.1"))
            .peer_addr("10.0.0.1:4000".parse().unwrap())
            .to_http_request();
        assert_eq!(extract_client_ip(&req).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_falls_back_to_peer_addr() {
        let req = TestRequest::default()
            .peer_addr("198.51.100.2:5555".parse().unwrap())
            .to_http_request();
        assert_eq!(extract_client_ip(&req).as_deref(), Some("198.51.100.2"));
    }

    #[test]
    fn test_empty_forwarded_header_is_ignored() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", ""))
            .peer_addr("198.51.100.2:5555".parse().unwrap())
            .to_http_request();
        assert_eq!(extract_client_ip(&req).as_deref(), Some("198.51.100.2"));
    }

    #[test]
    fn test_user_agent() {
        let req = TestRequest::default()
            .insert_header(("User-Agent", "curl/8.0"))
            .to_http_request();
        assert_eq!(extract_user_agent(&req).as_deref(), Some("curl/8.0"));
        assert_eq!(extract_user_agent(&TestRequest::default().to_http_request()), None);
    }
}
