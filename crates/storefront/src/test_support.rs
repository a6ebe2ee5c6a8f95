//! Test doubles shared by unit tests and the integration-test crate.
//!
//! Enabled under `cfg(test)` and by the `test-support` feature.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use dvd_shop_core::Email;

use crate::config::{DEFAULT_PAYMENT_API_BASE, PaymentConfig, StorefrontConfig};
use crate::middleware::csrf::CSRF_HEADER;
use crate::routes;
use crate::services::payment::{Charge, Customer, PaymentError, PaymentGateway};
use crate::state::AppState;

pub use crate::db::memory::MemoryStore;

/// Publishable key reported by [`test_config`].
pub const TEST_PUBLISHABLE_KEY: &str = "pk_test_storefront";

/// Scripted payment gateway that records what it was asked to do.
#[derive(Debug, Default)]
pub struct FakeGateway {
    decline: bool,
    customers: Mutex<Vec<String>>,
    charges: Mutex<Vec<i64>>,
}

impl FakeGateway {
    /// A gateway that accepts every token and charge.
    #[must_use]
    pub fn approving() -> Self {
        Self::default()
    }

    /// A gateway that declines every card token.
    #[must_use]
    pub fn declining() -> Self {
        Self {
            decline: true,
            ..Self::default()
        }
    }

    /// Emails of customers created so far.
    #[must_use]
    pub fn customers(&self) -> Vec<String> {
        self.customers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Amounts (in cents) of successful charges so far.
    #[must_use]
    pub fn charges(&self) -> Vec<i64> {
        self.charges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_customer(
        &self,
        email: &Email,
        _token: &str,
    ) -> Result<Customer, PaymentError> {
        if self.decline {
            return Err(PaymentError::Declined("Your card was declined.".to_string()));
        }
        let mut customers = self
            .customers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        customers.push(email.as_str().to_string());
        Ok(Customer {
            id: format!("cus_test_{}", customers.len()),
        })
    }

    async fn create_charge(
        &self,
        _customer: &Customer,
        amount_cents: i64,
        _description: &str,
    ) -> Result<Charge, PaymentError> {
        let mut charges = self.charges.lock().unwrap_or_else(PoisonError::into_inner);
        charges.push(amount_cents);
        Ok(Charge {
            id: format!("ch_test_{}", charges.len()),
            amount_cents,
        })
    }
}

/// Configuration suitable for in-process router tests.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/dvd_shop_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("kQ7vR2xN9pL4mW8sT1yB6hJ3fD5gC0aZ"),
        payment: PaymentConfig {
            publishable_key: TEST_PUBLISHABLE_KEY.to_string(),
            secret_key: SecretString::from("sk_test_unused"),
            api_base: DEFAULT_PAYMENT_API_BASE.to_string(),
        },
        sentry_dsn: None,
        sentry_environment: "test".to_string(),
    }
}

/// The full storefront router over in-memory adapters.
#[must_use]
pub fn test_app(store: Arc<MemoryStore>, gateway: Arc<FakeGateway>) -> Router {
    let state = AppState::new(test_config(), store, gateway);
    routes::app(state, tower_sessions::MemoryStore::default())
}

/// Drives a router like one browser: carries the session cookie and the
/// anti-forgery token from response to request.
pub struct TestClient {
    app: Router,
    cookie: Option<String>,
    token: Option<String>,
}

impl TestClient {
    /// A client with no session yet.
    #[must_use]
    pub const fn new(app: Router) -> Self {
        Self {
            app,
            cookie: None,
            token: None,
        }
    }

    /// The router this client drives.
    #[must_use]
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// The anti-forgery token last issued to this client.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Send a request with the session cookie attached.
    ///
    /// # Panics
    ///
    /// Panics if the router fails, which it never does for axum routers.
    #[allow(clippy::unwrap_used)]
    pub async fn send(&mut self, mut request: Request<Body>) -> Response {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        let response = self.app.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            let pair = set_cookie.split(';').next().unwrap_or_default();
            let expired = set_cookie.contains("Max-Age=0") || pair.ends_with('=');
            self.cookie = (!expired).then(|| pair.to_string());
            if expired {
                self.token = None;
            }
        }
        if let Some(token) = response
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            self.token = Some(token.to_string());
        }
        response
    }

    /// `GET` a path.
    ///
    /// # Panics
    ///
    /// Panics if `uri` is not a valid URI.
    #[allow(clippy::unwrap_used)]
    pub async fn get(&mut self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    /// `GET` a path and decode the JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON.
    pub async fn get_json(&mut self, uri: &str) -> (StatusCode, Value) {
        let response = self.get(uri).await;
        let status = response.status();
        (status, json_body(response).await)
    }

    /// `POST` a urlencoded form with the anti-forgery header.
    ///
    /// Visits `/shop` first if no token has been issued yet.
    ///
    /// # Panics
    ///
    /// Panics if `uri` is not a valid URI.
    #[allow(clippy::unwrap_used)]
    pub async fn post_form(&mut self, uri: &str, body: &str) -> Response {
        if self.token.is_none() {
            self.get("/shop").await;
        }
        let token = self.token.clone().unwrap_or_default();
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(CSRF_HEADER, token)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// `POST` a urlencoded form without any anti-forgery token.
    ///
    /// # Panics
    ///
    /// Panics if `uri` is not a valid URI.
    #[allow(clippy::unwrap_used)]
    pub async fn post_form_without_token(&mut self, uri: &str, body: &str) -> Response {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

/// Decode a response body as JSON.
///
/// # Panics
///
/// Panics if the body cannot be read or is not JSON.
#[allow(clippy::unwrap_used)]
pub async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
