//! 短码重定向

use actix_web::http::header::LOCATION;
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::trace;

use crate::errors::SnaplinkError;
use crate::services::{ClickContext, UrlService};
use crate::utils::ip::{extract_client_ip, extract_user_agent};

pub struct RedirectService;

impl RedirectService {
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        service: web::Data<UrlService>,
    ) -> Result<HttpResponse, SnaplinkError> {
        let short_code = path.into_inner();
        let click = ClickContext {
            ip_address: extract_client_ip(&req),
            user_agent: extract_user_agent(&req),
        };

        let record = service.resolve(&short_code, click).await?;
        trace!("Redirecting {} -> {}", short_code, record.long_url);

        Ok(HttpResponse::MovedPermanently()
            .insert_header((LOCATION, record.long_url))
            .finish())
    }
}

/// 只接受 GET：每次重定向都会计入点击，HEAD 探测返回 405
pub fn redirect_routes() -> actix_web::Resource {
    web::resource("/{short_code}").route(web::get().to(RedirectService::handle_redirect))
}
