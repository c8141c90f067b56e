//! Authentication state container.
//!
//! # Responsibility
//! - Drive sign-in, registration, password reset and sign-out through the
//!   identity provider and the REST API.
//! - Own the current session as a value; callers pass the container where a
//!   bearer token is needed.
//!
//! # Invariants
//! - `Loading` is published before any remote call and always replaced by
//!   `SignedIn` or `Failed`.
//! - Signed-in profiles are cached locally; the cache write never blocks the
//!   sign-in from succeeding.
//! - Only registration writes the profile to the `users` collection.

use crate::model::user::{is_valid_email, normalize_email, User, UserValidationError};
use crate::remote::api::{ApiClient, AuthSession, RegisterRequest};
use crate::remote::identity::{AuthFailure, IdentityProvider};
use crate::service::user_service::UserService;
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::watch;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthStatus {
    #[default]
    SignedOut,
    Loading,
    SignedIn(AuthSession),
    /// Localized message shown inline.
    Failed(String),
}

impl AuthStatus {
    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            Self::SignedIn(session) => Some(session),
            _ => None,
        }
    }
}

pub struct AuthState {
    identity: Arc<dyn IdentityProvider>,
    api: Arc<dyn ApiClient>,
    users: UserService,
    status: watch::Sender<AuthStatus>,
}

impl AuthState {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        api: Arc<dyn ApiClient>,
        users: UserService,
    ) -> Self {
        let (status, _) = watch::channel(AuthStatus::SignedOut);
        Self {
            identity,
            api,
            users,
            status,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> AuthStatus {
        self.status.borrow().clone()
    }

    pub fn current_session(&self) -> Option<AuthSession> {
        self.status.borrow().session().cloned()
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.status
            .borrow()
            .session()
            .map(|session| session.token.clone())
    }

    /// Signs in through the identity provider and exchanges its token with
    /// the API, falling back to the legacy login endpoint.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthStatus {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return self.fail(AuthFailure::InvalidEmail.user_message());
        }
        if password.is_empty() {
            return self.fail(AuthFailure::InvalidCredentials.user_message());
        }
        self.status.send_replace(AuthStatus::Loading);

        let account = match self.identity.sign_in(&email, password).await {
            Ok(account) => account,
            Err(err) => {
                let failure = err.classify();
                warn!(
                    "event=auth_sign_in module=state status=error stage=identity failure={:?}",
                    failure
                );
                return self.fail(failure.user_message());
            }
        };

        let session = match self.api.exchange_identity_token(&account.id_token).await {
            Ok(session) => session,
            Err(exchange_err) => {
                warn!(
                    "event=auth_sign_in module=state status=error stage=token_exchange error={}",
                    exchange_err
                );
                match self.api.login(&email, password).await {
                    Ok(session) => session,
                    Err(err) => {
                        warn!(
                            "event=auth_sign_in module=state status=error stage=legacy_login error={}",
                            err
                        );
                        return self.fail(err.user_message());
                    }
                }
            }
        };

        if let Err(err) = self.users.cache_signed_in(&session.user) {
            warn!(
                "event=profile_cache module=state status=error error={}",
                err
            );
        }
        info!(
            "event=auth_sign_in module=state status=ok admin={}",
            session.user.is_admin()
        );
        self.status.send_replace(AuthStatus::SignedIn(session.clone()));
        AuthStatus::SignedIn(session)
    }

    /// Creates the provider account, registers the profile with the API and
    /// mirrors it into the `users` collection.
    pub async fn register(&self, profile: &User, password: &str) -> AuthStatus {
        let mut profile = profile.clone();
        profile.email = normalize_email(&profile.email);
        profile.password.clear();
        if let Err(err) = profile.validate() {
            return self.fail(&validation_message(&err));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return self.fail(AuthFailure::WeakPassword.user_message());
        }
        self.status.send_replace(AuthStatus::Loading);

        let account = match self.identity.sign_up(&profile.email, password).await {
            Ok(account) => account,
            Err(err) => {
                let failure = err.classify();
                warn!(
                    "event=auth_register module=state status=error stage=identity failure={:?}",
                    failure
                );
                return self.fail(failure.user_message());
            }
        };

        let request = RegisterRequest::from_user(&profile, password);
        let token = match self.api.register(&request).await {
            Ok(session) => session.token,
            Err(err) => {
                warn!(
                    "event=auth_register module=state status=error stage=api error={}",
                    err
                );
                account.id_token
            }
        };

        self.save_profile(&profile).await;
        info!("event=auth_register module=state status=ok");
        let session = AuthSession {
            token,
            user: profile,
        };
        self.status.send_replace(AuthStatus::SignedIn(session.clone()));
        AuthStatus::SignedIn(session)
    }

    /// Sends a reset email. Returns a localized message on failure.
    pub async fn reset_password(&self, email: &str) -> Result<(), String> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AuthFailure::InvalidEmail.user_message().to_string());
        }
        self.identity
            .send_password_reset(&email)
            .await
            .map_err(|err| err.classify().user_message().to_string())
    }

    pub async fn sign_out(&self) {
        self.identity.sign_out().await;
        self.status.send_replace(AuthStatus::SignedOut);
        info!("event=auth_sign_out module=state status=ok");
    }

    fn fail(&self, message: &str) -> AuthStatus {
        let status = AuthStatus::Failed(message.to_string());
        self.status.send_replace(status.clone());
        status
    }

    async fn save_profile(&self, user: &User) {
        if let Err(err) = self.users.save_profile(user).await {
            warn!(
                "event=profile_cache module=state status=error error={}",
                err
            );
        }
    }
}

fn validation_message(err: &UserValidationError) -> String {
    match err {
        UserValidationError::InvalidEmail(_) => {
            AuthFailure::InvalidEmail.user_message().to_string()
        }
        UserValidationError::BlankName => "El nombre es obligatorio.".to_string(),
        UserValidationError::InvalidRut(_) => "El RUT no es válido.".to_string(),
    }
}
