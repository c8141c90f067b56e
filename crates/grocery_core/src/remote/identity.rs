//! Identity-provider port and error classification.
//!
//! # Responsibility
//! - Describe the external identity provider (email/password sign-in,
//!   sign-up, password reset) as an async trait.
//! - Classify raw provider error messages into user-facing failures.
//!
//! # Invariants
//! - Classification is a case-insensitive substring match; the first matching
//!   rule wins and unknown messages map to `AuthFailure::Unknown`.

use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Account returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityAccount {
    pub uid: String,
    pub email: String,
    /// Short-lived token exchanged with the REST API.
    pub id_token: String,
}

/// Raw provider error carrying the provider's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityError {
    pub message: String,
}

impl IdentityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn classify(&self) -> AuthFailure {
        AuthFailure::from_provider_message(&self.message)
    }
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "identity provider error: {}", self.message)
    }
}

impl Error for IdentityError {}

/// External identity authority.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityAccount, IdentityError>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentityAccount, IdentityError>;
    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError>;
    async fn sign_out(&self);
}

/// Classified authentication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    InvalidCredentials,
    UserNotFound,
    EmailAlreadyInUse,
    InvalidEmail,
    WeakPassword,
    TooManyAttempts,
    Network,
    Unknown,
}

const PROVIDER_RULES: &[(&str, AuthFailure)] = &[
    ("invalid_login_credentials", AuthFailure::InvalidCredentials),
    ("password is invalid", AuthFailure::InvalidCredentials),
    ("credential is incorrect", AuthFailure::InvalidCredentials),
    ("no user record", AuthFailure::UserNotFound),
    ("user may have been deleted", AuthFailure::UserNotFound),
    ("already in use", AuthFailure::EmailAlreadyInUse),
    ("badly formatted", AuthFailure::InvalidEmail),
    ("at least 6 characters", AuthFailure::WeakPassword),
    ("weak_password", AuthFailure::WeakPassword),
    ("blocked all requests", AuthFailure::TooManyAttempts),
    ("too many", AuthFailure::TooManyAttempts),
    ("network error", AuthFailure::Network),
    ("timeout", AuthFailure::Network),
    ("unreachable host", AuthFailure::Network),
];

impl AuthFailure {
    /// Classifies a raw identity-provider message.
    pub fn from_provider_message(message: &str) -> Self {
        let normalized = message.to_lowercase();
        PROVIDER_RULES
            .iter()
            .find(|(needle, _)| normalized.contains(needle))
            .map_or(Self::Unknown, |(_, failure)| *failure)
    }

    /// Localized message shown inline in the UI.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Correo o contraseña incorrectos.",
            Self::UserNotFound => "No existe una cuenta con este correo.",
            Self::EmailAlreadyInUse => "Este correo ya está registrado.",
            Self::InvalidEmail => "El formato del correo no es válido.",
            Self::WeakPassword => "La contraseña debe tener al menos 6 caracteres.",
            Self::TooManyAttempts => "Demasiados intentos. Intenta nuevamente más tarde.",
            Self::Network => "Error de conexión. Revisa tu internet.",
            Self::Unknown => "No se pudo completar la autenticación.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AuthFailure;

    #[test]
    fn classifies_known_provider_messages() {
        let cases = [
            (
                "The password is invalid or the user does not have a password.",
                AuthFailure::InvalidCredentials,
            ),
            (
                "There is no user record corresponding to this identifier.",
                AuthFailure::UserNotFound,
            ),
            (
                "The email address is already in use by another account.",
                AuthFailure::EmailAlreadyInUse,
            ),
            ("The email address is badly formatted.", AuthFailure::InvalidEmail),
            (
                "We have blocked all requests from this device due to unusual activity.",
                AuthFailure::TooManyAttempts,
            ),
            (
                "A network error (such as timeout, interrupted connection) has occurred.",
                AuthFailure::Network,
            ),
            ("INVALID_LOGIN_CREDENTIALS", AuthFailure::InvalidCredentials),
        ];

        for (message, expected) in cases {
            assert_eq!(AuthFailure::from_provider_message(message), expected, "{message}");
        }
    }

    #[test]
    fn unknown_messages_fall_back_to_generic_failure() {
        let failure = AuthFailure::from_provider_message("internal error 0x42");
        assert_eq!(failure, AuthFailure::Unknown);
        assert!(!failure.user_message().is_empty());
    }
}
