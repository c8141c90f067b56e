//! `reqwest` adapter for the companion REST API.
//!
//! # Invariants
//! - Endpoints are resolved relative to the configured base URL.
//! - No request timeout is applied unless configured.
//! - Response bodies are decoded only after a success status.

use crate::model::product::Product;
use crate::remote::api::{
    ApiClient, ApiError, ApiProduct, ApiResult, AuthResponse, AuthSession, CreateOrderRequest,
    CreatedOrder, IdentityTokenRequest, LoginRequest, RegisterRequest,
};
use async_trait::async_trait;
use log::{info, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};
use url::Url;

const PRODUCTS_PATH: &str = "productos";
const LOGIN_PATH: &str = "auth/login";
const REGISTER_PATH: &str = "auth/register";
const IDENTITY_SYNC_PATH: &str = "auth/firebase-sync";
const ORDERS_PATH: &str = "pedidos";
const MAX_ERROR_BODY_CHARS: usize = 200;

/// REST client over `reqwest`.
#[derive(Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpApiClient {
    /// Builds a client for `base_url`.
    ///
    /// # Errors
    /// - `InvalidUrl` when `base_url` is not an absolute http(s) URL.
    /// - `Http` when the underlying client cannot be built.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> ApiResult<Self> {
        let mut base_url = Url::parse(base_url.trim())
            .map_err(|err| ApiError::InvalidUrl(format!("`{base_url}`: {err}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "unsupported scheme `{}`",
                base_url.scheme()
            )));
        }
        // Url::join drops the last segment unless the path ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|err| ApiError::InvalidUrl(format!("`{path}`: {err}")))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, bearer: Option<&str>) -> ApiResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let mut request = self.client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        decode_response(path, response).await
    }
}

async fn decode_response<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> ApiResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        warn!(
            "event=api_call module=remote status=error path={} http_status={}",
            path,
            status.as_u16()
        );
        return Err(ApiError::Status {
            code: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    // An empty success body decodes as JSON `null`.
    let body = if body.trim().is_empty() { "null" } else { body.as_str() };
    serde_json::from_str(body).map_err(|err| {
        warn!("event=api_decode module=remote status=error path={path} error={err}");
        ApiError::Decode(err.to_string())
    })
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn fetch_products(&self) -> ApiResult<Vec<Product>> {
        let started_at = Instant::now();
        let url = self.endpoint(PRODUCTS_PATH)?;
        let response = self.client.get(url).send().await?;
        let products: Vec<ApiProduct> = decode_response(PRODUCTS_PATH, response).await?;

        info!(
            "event=api_call module=remote status=ok path={} count={} duration_ms={}",
            PRODUCTS_PATH,
            products.len(),
            started_at.elapsed().as_millis()
        );
        Ok(products.into_iter().map(Product::from).collect())
    }

    async fn login(&self, email: &str, password: &str) -> ApiResult<AuthSession> {
        let response: AuthResponse = self
            .post_json(LOGIN_PATH, &LoginRequest { email, password }, None)
            .await?;
        Ok(response.into())
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthSession> {
        let response: AuthResponse = self.post_json(REGISTER_PATH, request, None).await?;
        Ok(response.into())
    }

    async fn exchange_identity_token(&self, id_token: &str) -> ApiResult<AuthSession> {
        let response: AuthResponse = self
            .post_json(IDENTITY_SYNC_PATH, &IdentityTokenRequest { id_token }, None)
            .await?;
        Ok(response.into())
    }

    async fn create_order(
        &self,
        request: &CreateOrderRequest,
        bearer_token: Option<&str>,
    ) -> ApiResult<CreatedOrder> {
        let created: Option<CreatedOrder> =
            self.post_json(ORDERS_PATH, request, bearer_token).await?;
        info!(
            "event=api_call module=remote status=ok path={} items={}",
            ORDERS_PATH,
            request.items.len()
        );
        Ok(created.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::HttpApiClient;
    use crate::remote::api::ApiError;

    #[test]
    fn new_rejects_non_http_base_url() {
        let err = HttpApiClient::new("ftp://example.com", None)
            .err()
            .expect("ftp scheme should be rejected");
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn endpoints_keep_base_path_prefix() {
        let client = HttpApiClient::new("https://api.example.cl/v1", None).unwrap();
        let url = client.endpoint("productos").unwrap();
        assert_eq!(url.as_str(), "https://api.example.cl/v1/productos");
    }
}
