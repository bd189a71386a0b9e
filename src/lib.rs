pub mod auth;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod listing;
pub mod middleware;
pub mod models;
pub mod proto;
pub mod reports;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
