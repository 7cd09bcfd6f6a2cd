pub mod health;
pub mod link;
pub mod redirect;

pub use health::{HealthService, health_routes};
pub use link::{LinkService, link_routes};
pub use redirect::{RedirectService, redirect_routes};
