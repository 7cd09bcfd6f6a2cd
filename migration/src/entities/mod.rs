pub mod analytics;
pub mod url;

pub use analytics::Entity as AnalyticsEntity;
pub use url::Entity as UrlEntity;
