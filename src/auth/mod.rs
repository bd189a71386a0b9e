pub mod session;
pub mod signup;

pub use session::{Claims, Session, SessionKeys};
pub use signup::{hash_password, is_valid_email, normalize_email, verify_password, SignUpPolicy};
