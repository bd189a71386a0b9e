use std::sync::LazyLock;

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use regex::Regex;

use crate::error::{AppError, AppResult};

static RE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Loose structural check; deliverability is the mail provider's problem.
pub fn is_valid_email(email: &str) -> bool {
    RE_EMAIL.is_match(email)
}

/// Lowercased and trimmed form used for storage and ownership checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Rules applied before an account is created.
#[derive(Clone, Debug)]
pub struct SignUpPolicy {
    domain: String,
    min_password_length: usize,
}

impl SignUpPolicy {
    pub fn new(domain: &str, min_password_length: usize) -> Self {
        Self {
            domain: domain.trim_start_matches('@').to_lowercase(),
            min_password_length,
        }
    }

    /// True when the host part is the allowed domain or one of its subdomains.
    pub fn email_in_domain(&self, email: &str) -> bool {
        match email.rsplit_once('@') {
            Some((local, host)) if !local.is_empty() => {
                let host = host.to_lowercase();
                host == self.domain || host.ends_with(&format!(".{}", self.domain))
            }
            _ => false,
        }
    }

    /// Checks run in the same order the sign-up form reports them.
    pub fn validate(&self, email: &str, password: &str, confirm_password: &str) -> AppResult<()> {
        if !is_valid_email(email) || !self.email_in_domain(email) {
            return Err(AppError::InvalidInput(format!(
                "Please use a valid {} email address",
                self.domain
            )));
        }
        if password != confirm_password {
            return Err(AppError::InvalidInput("Passwords do not match".into()));
        }
        if password.chars().count() < self.min_password_length {
            return Err(AppError::InvalidInput(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }
        Ok(())
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash in database".into()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SignUpPolicy {
        SignUpPolicy::new("cuny.edu", 6)
    }

    #[test]
    fn test_accepts_domain_and_subdomains() {
        let p = policy();
        assert!(p.email_in_domain("jane@cuny.edu"));
        assert!(p.email_in_domain("jane.doe@myhunter.cuny.edu"));
        assert!(!p.email_in_domain("jane@notcuny.edu"));
        assert!(!p.email_in_domain("jane@gmail.com"));
        assert!(!p.email_in_domain("@cuny.edu"));
    }

    #[test]
    fn test_validation_messages() {
        let p = policy();
        let err = p.validate("jane@gmail.com", "secret1", "secret1").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: Please use a valid cuny.edu email address");

        let err = p.validate("jane@cuny.edu", "secret1", "secret2").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: Passwords do not match");

        let err = p.validate("jane@cuny.edu", "abc", "abc").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: Password must be at least 6 characters");

        assert!(p.validate("jane@cuny.edu", "secret1", "secret1").is_ok());
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("hunter2!").unwrap();
        assert!(verify_password("hunter2!", &hash).unwrap());
        assert!(!verify_password("hunter3!", &hash).unwrap());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane@CUNY.edu "), "jane@cuny.edu");
    }
}
