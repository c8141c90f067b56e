//! User profile model.
//!
//! # Responsibility
//! - Define the profile mirrored between the identity provider, the `users`
//!   document-store collection and the local cache.
//! - Validate registration input (email and optional RUT format).
//!
//! # Invariants
//! - `email` is the identity key and is stored trimmed and lower-cased.
//! - `password` is only meaningful for the legacy direct-auth path.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static RUT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}\.?\d{3}\.?\d{3}-[\dkK]$").expect("valid rut regex"));

/// Role granted to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "USER" => Some(Self::User),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Client profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub name: String,
    pub surname: String,
    /// Legacy direct-auth credential. Never sent to the document store.
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub rut: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: UserRole,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Validation failures for profile writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    InvalidEmail(String),
    BlankName,
    InvalidRut(String),
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEmail(value) => write!(f, "invalid email `{value}`"),
            Self::BlankName => write!(f, "name must not be blank"),
            Self::InvalidRut(value) => write!(f, "invalid rut `{value}`"),
        }
    }
}

impl Error for UserValidationError {}

impl User {
    /// Creates a `USER` profile with empty optional fields.
    pub fn new(email: &str, name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            email: normalize_email(email),
            name: name.into(),
            surname: surname.into(),
            password: String::new(),
            rut: None,
            address: String::new(),
            phone: String::new(),
            role: UserRole::User,
            created_at: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.name.trim(), self.surname.trim())
            .trim()
            .to_string()
    }

    /// Checks registration/profile invariants.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if !is_valid_email(&self.email) {
            return Err(UserValidationError::InvalidEmail(self.email.clone()));
        }
        if self.name.trim().is_empty() {
            return Err(UserValidationError::BlankName);
        }
        if let Some(rut) = self.rut.as_deref() {
            if !RUT_RE.is_match(rut.trim()) {
                return Err(UserValidationError::InvalidRut(rut.to_string()));
            }
        }
        Ok(())
    }
}

/// Normalizes an email for use as a key.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}
