//! Login and registration payloads.

use serde::{Deserialize, Serialize};

use crate::user::User;
use crate::validate::{ValidationError, require_email, require_min, require_text};

/// Minimum username length in characters.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length in characters.
pub const MAX_USERNAME_LENGTH: usize = 255;

/// Minimum password length in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Plain-text password (sent over TLS).
    pub password: String,
}

impl LoginRequest {
    /// Validates the login form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a malformed email or empty password.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::Empty { field: "password" });
        }
        Ok(())
    }
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Display name.
    pub username: String,
    /// Account email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

impl RegisterRequest {
    /// Validates the registration form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the username is too short or too
    /// long, the email is malformed, or the password is too short.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("username", &self.username, MAX_USERNAME_LENGTH)?;
        require_min("username", self.username.trim(), MIN_USERNAME_LENGTH)?;
        require_email(&self.email)?;
        require_min("password", &self.password, MIN_PASSWORD_LENGTH)
    }
}

/// Response of both login and register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The authenticated account.
    pub user: User,
}
