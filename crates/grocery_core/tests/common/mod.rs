#![allow(dead_code)]

use async_trait::async_trait;
use grocery_core::model::product::Product;
use grocery_core::model::user::User;
use grocery_core::remote::api::{
    ApiClient, ApiError, ApiResult, AuthSession, CreateOrderRequest, CreatedOrder,
    RegisterRequest,
};
use grocery_core::remote::identity::{IdentityAccount, IdentityError, IdentityProvider};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn product(id: i64, code: &str, name: &str, category: &str, price: i64) -> Product {
    let mut product = Product::new(id, code, name, category, Decimal::from(price));
    product.stock = 10;
    product
}

fn unavailable() -> ApiError {
    ApiError::Status {
        code: 503,
        body: "down".to_string(),
    }
}

/// Scriptable REST API.
#[derive(Default)]
pub struct StubApi {
    /// `None` makes `fetch_products` fail with 503.
    pub products: Mutex<Option<Vec<Product>>>,
    pub created_order_id: Mutex<Option<i64>>,
    pub reject_orders: AtomicBool,
    pub orders: Mutex<Vec<(CreateOrderRequest, Option<String>)>>,
    pub reject_token_exchange: AtomicBool,
    pub reject_register: AtomicBool,
    pub login_calls: AtomicUsize,
}

impl StubApi {
    pub fn with_products(products: Vec<Product>) -> Self {
        let api = Self::default();
        *api.products.lock().unwrap() = Some(products);
        api
    }

    fn session(email: &str, token: &str) -> AuthSession {
        AuthSession {
            token: token.to_string(),
            user: User::new(email, "Ana", "Pérez"),
        }
    }
}

#[async_trait]
impl ApiClient for StubApi {
    async fn fetch_products(&self) -> ApiResult<Vec<Product>> {
        self.products.lock().unwrap().clone().ok_or_else(unavailable)
    }

    async fn login(&self, email: &str, _password: &str) -> ApiResult<AuthSession> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::session(email, "legacy-token"))
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthSession> {
        if self.reject_register.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                code: 409,
                body: String::new(),
            });
        }
        Ok(Self::session(&request.email, "api-token"))
    }

    async fn exchange_identity_token(&self, id_token: &str) -> ApiResult<AuthSession> {
        if self.reject_token_exchange.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(Self::session("ana@example.cl", &format!("api-{id_token}")))
    }

    async fn create_order(
        &self,
        request: &CreateOrderRequest,
        bearer_token: Option<&str>,
    ) -> ApiResult<CreatedOrder> {
        if self.reject_orders.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.orders
            .lock()
            .unwrap()
            .push((request.clone(), bearer_token.map(str::to_string)));
        Ok(CreatedOrder {
            id: *self.created_order_id.lock().unwrap(),
        })
    }
}

/// Identity provider accepting a single password.
pub struct StubIdentity {
    pub password: String,
    pub signed_out: AtomicBool,
}

impl StubIdentity {
    pub fn accepting(password: &str) -> Self {
        Self {
            password: password.to_string(),
            signed_out: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityAccount, IdentityError> {
        if password != self.password {
            return Err(IdentityError::new(
                "The password is invalid or the user does not have a password.",
            ));
        }
        Ok(IdentityAccount {
            uid: "uid-1".to_string(),
            email: email.to_string(),
            id_token: "id-token".to_string(),
        })
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<IdentityAccount, IdentityError> {
        if email == "taken@example.cl" {
            return Err(IdentityError::new(
                "The email address is already in use by another account.",
            ));
        }
        Ok(IdentityAccount {
            uid: "uid-2".to_string(),
            email: email.to_string(),
            id_token: "fresh-id-token".to_string(),
        })
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        if email.ends_with("@unknown.cl") {
            return Err(IdentityError::new(
                "There is no user record corresponding to this identifier.",
            ));
        }
        Ok(())
    }

    async fn sign_out(&self) {
        self.signed_out.store(true, Ordering::SeqCst);
    }
}
