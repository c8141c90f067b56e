//! REST API port, wire types and error taxonomy.
//!
//! # Responsibility
//! - Describe the companion REST API as an async trait.
//! - Own the JSON wire shapes (Spanish field names on the wire).
//! - Map HTTP failures to a handful of user-facing messages.
//!
//! # Invariants
//! - Order line items are keyed by product `code`, never by numeric id.
//! - Failures are distinguished only by HTTP status code.

use crate::model::product::Product;
use crate::model::user::{normalize_email, User, UserRole};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ApiResult<T> = Result<T, ApiError>;

/// REST call failure.
#[derive(Debug)]
pub enum ApiError {
    /// Connection, TLS or timeout failure before a status was received.
    Http(reqwest::Error),
    /// Non-success HTTP status.
    Status { code: u16, body: String },
    /// Response body did not match the expected shape.
    Decode(String),
    /// Configured base URL or endpoint path is invalid.
    InvalidUrl(String),
}

impl ApiError {
    /// Localized message shown inline in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Status { code: 400, .. } => "Los datos enviados no son válidos.",
            Self::Status { code: 401, .. } => "Correo o contraseña incorrectos.",
            Self::Status { code: 403, .. } => "No tienes permisos para realizar esta acción.",
            Self::Status { code: 404, .. } => "El recurso solicitado no existe.",
            Self::Status { code: 409, .. } => "El usuario ya se encuentra registrado.",
            Self::Status { code, .. } if *code >= 500 => {
                "El servidor no está disponible. Intenta más tarde."
            }
            Self::Http(_) => "No hay conexión con el servidor.",
            Self::Status { .. } | Self::Decode(_) | Self::InvalidUrl(_) => {
                "Ocurrió un error inesperado."
            }
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            Self::Http(err) => err.status().map(|status| status.as_u16()),
            Self::Decode(_) | Self::InvalidUrl(_) => None,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "HTTP error: {err}"),
            Self::Status { code, body } => write!(f, "API returned status {code}: {body}"),
            Self::Decode(message) => write!(f, "invalid API response: {message}"),
            Self::InvalidUrl(message) => write!(f, "invalid API url: {message}"),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            Self::Status { .. } | Self::Decode(_) | Self::InvalidUrl(_) => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// Product as returned by `GET /productos` and stored in the seed asset.
///
/// Accepts both the Spanish backend names and English names.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiProduct {
    pub id: i64,
    #[serde(alias = "codigo")]
    pub code: String,
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(default, alias = "descripcion")]
    pub description: Option<String>,
    #[serde(alias = "categoria")]
    pub category: String,
    #[serde(alias = "precio")]
    pub price: Decimal,
    #[serde(default)]
    pub stock: i64,
    #[serde(default, alias = "imagen", alias = "imageUrl", alias = "imagenUrl")]
    pub image_url: Option<String>,
    #[serde(default, alias = "fechaCreacion", alias = "createdAt")]
    pub created_at: Option<i64>,
}

impl From<ApiProduct> for Product {
    fn from(value: ApiProduct) -> Self {
        Self {
            id: value.id,
            code: value.code.trim().to_string(),
            name: value.name,
            description: value.description.unwrap_or_default(),
            category: value.category,
            price: value.price,
            stock: value.stock,
            image_url: value.image_url.filter(|url| !url.trim().is_empty()),
            created_at: value.created_at,
        }
    }
}

/// Profile as returned by the auth endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub email: String,
    #[serde(default, alias = "nombre")]
    pub name: String,
    #[serde(default, alias = "apellido")]
    pub surname: String,
    #[serde(default)]
    pub rut: Option<String>,
    #[serde(default, alias = "direccion")]
    pub address: String,
    #[serde(default, alias = "telefono")]
    pub phone: String,
    #[serde(default, alias = "rol")]
    pub role: Option<String>,
}

impl From<ApiUser> for User {
    fn from(value: ApiUser) -> Self {
        Self {
            email: normalize_email(&value.email),
            name: value.name,
            surname: value.surname,
            password: String::new(),
            rut: value.rut.filter(|rut| !rut.trim().is_empty()),
            address: value.address,
            phone: value.phone,
            role: value
                .role
                .as_deref()
                .and_then(UserRole::parse)
                .unwrap_or_default(),
            created_at: None,
        }
    }
}

/// Authenticated API session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Bearer token for subsequent calls.
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub token: String,
    #[serde(alias = "usuario")]
    pub user: ApiUser,
}

impl From<AuthResponse> for AuthSession {
    fn from(value: AuthResponse) -> Self {
        Self {
            token: value.token,
            user: value.user.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct IdentityTokenRequest<'a> {
    #[serde(rename = "idToken")]
    pub id_token: &'a str,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "apellido")]
    pub surname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rut: Option<String>,
    #[serde(rename = "direccion")]
    pub address: String,
    #[serde(rename = "telefono")]
    pub phone: String,
}

impl RegisterRequest {
    pub fn from_user(user: &User, password: &str) -> Self {
        Self {
            email: normalize_email(&user.email),
            password: password.to_string(),
            name: user.name.clone(),
            surname: user.surname.clone(),
            rut: user.rut.clone(),
            address: user.address.clone(),
            phone: user.phone.clone(),
        }
    }
}

/// One order line keyed by product code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineRequest {
    #[serde(rename = "codigo")]
    pub product_code: String,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
}

/// Body of the order-creation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOrderRequest {
    #[serde(rename = "direccionEntrega")]
    pub delivery_address: String,
    #[serde(rename = "fechaEntrega", skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comuna: Option<String>,
    #[serde(rename = "comentarios", skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub items: Vec<OrderLineRequest>,
}

/// Server acknowledgement for a created order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreatedOrder {
    #[serde(default)]
    pub id: Option<i64>,
}

/// Companion REST API.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// `GET /productos`
    async fn fetch_products(&self) -> ApiResult<Vec<Product>>;
    /// `POST /auth/login` (legacy direct-auth path)
    async fn login(&self, email: &str, password: &str) -> ApiResult<AuthSession>;
    /// `POST /auth/register`
    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthSession>;
    /// `POST /auth/firebase-sync`: exchanges an identity-provider token.
    async fn exchange_identity_token(&self, id_token: &str) -> ApiResult<AuthSession>;
    /// `POST /pedidos`
    async fn create_order(
        &self,
        request: &CreateOrderRequest,
        bearer_token: Option<&str>,
    ) -> ApiResult<CreatedOrder>;
}
