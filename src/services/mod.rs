pub mod auth_service;
pub mod dashboard_service;
pub mod health_service;
pub mod items_service;

pub use auth_service::AuthServiceImpl;
pub use dashboard_service::DashboardServiceImpl;
pub use health_service::HealthServiceImpl;
pub use items_service::ItemsServiceImpl;
