pub mod app_user;
pub mod item;

pub use app_user::*;
pub use item::*;
