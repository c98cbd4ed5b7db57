//! Account DTOs: registration, login, profile and password change.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Minimum length of a new password accepted by the password change endpoint.
pub const MIN_PASSWORD_LEN: usize = 6;

/// The signed-in user as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub is_active: bool,
}

impl User {
    /// "First Last", or "Not provided" when both are blank.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            "Not provided".to_string()
        } else {
            name.to_string()
        }
    }
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Result<Self, ValidationError> {
        let email = email.into();
        let password = password.into();
        if email.trim().is_empty() {
            return Err(ValidationError::EmailRequired);
        }
        if password.is_empty() {
            return Err(ValidationError::PasswordRequired);
        }
        Ok(Self { email, password })
    }
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone_number: String,
}

/// Input of the registration form, including the password confirmation that
/// never leaves the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
    pub phone_number: String,
}

impl RegisterForm {
    pub fn into_request(self) -> Result<RegisterRequest, ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::EmailRequired);
        }
        if self.password.is_empty() {
            return Err(ValidationError::PasswordRequired);
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(RegisterRequest {
            email: self.email.trim().to_string(),
            password: self.password,
            full_name: self.full_name.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
        })
    }
}

/// Response of both login and register.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: User,
}

/// Body of `PUT /users/me`. Only present fields are changed on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl ProfileUpdate {
    /// Build an update from the profile edit form: blank fields are left out
    /// rather than clearing the stored value.
    pub fn from_form(first_name: &str, last_name: &str, phone_number: &str) -> Self {
        fn non_blank(s: &str) -> Option<String> {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Self {
            first_name: non_blank(first_name),
            last_name: non_blank(last_name),
            phone_number: non_blank(phone_number),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone_number.is_none()
    }
}

/// Body of `PUT /users/user/password`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordChange {
    pub password: String,
    pub new_password: String,
}

impl PasswordChange {
    pub fn new(password: impl Into<String>, new_password: impl Into<String>) -> Result<Self, ValidationError> {
        let password = password.into();
        let new_password = new_password.into();
        if password.is_empty() {
            return Err(ValidationError::PasswordRequired);
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        Ok(Self {
            password,
            new_password,
        })
    }
}
