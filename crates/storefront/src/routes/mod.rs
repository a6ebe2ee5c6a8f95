//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Store connectivity check
//!
//! # Catalog
//! GET  /shop                            - Category list
//! GET  /shop/browse?category=           - Products in a category
//! GET  /shop/productdetails?product=    - Product detail
//!
//! # Cart (any visitor)
//! POST /shop/addtocart                  - Add or merge a line (form: Quantity, ProductId)
//! GET  /shop/cart                       - Cart lines and total
//! GET  /shop/removefromcart?id=         - Remove a line
//! POST /shop/removefromcart?id=         - Remove a line
//!
//! # Checkout (requires auth except the payment summary)
//! GET  /shop/checkout                   - Shipping form model
//! POST /shop/checkout                   - Store the order draft
//! GET  /shop/payment                    - Draft total and publishable key
//! POST /shop/payment                    - Charge and commit (form: email, token)
//! GET  /shop/orders/{id}                - Order confirmation
//!
//! # Account
//! POST /account/register                - Create an account and sign in
//! POST /account/login                   - Sign in, merging the guest cart
//! POST /account/logout                  - Sign out
//! ```
//!
//! Every state-changing route is wrapped in [`require_csrf`].

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

use std::time::Duration;

use axum::{
    Router,
    extract::State,
    handler::Handler,
    http::{Request, Response, StatusCode},
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::SessionStore;
use tracing::Span;

use crate::db::HealthRepository;
use crate::middleware::{
    create_session_layer, csrf_token_middleware, request_id_middleware, require_csrf,
    security_headers_middleware,
};
use crate::state::AppState;

/// Create the shop routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .route("/browse", get(catalog::browse))
        .route("/productdetails", get(catalog::product_details))
        .route("/addtocart", post(cart::add.layer(from_fn(require_csrf))))
        .route("/cart", get(cart::show))
        .route(
            "/removefromcart",
            get(cart::remove.layer(from_fn(require_csrf)))
                .post(cart::remove.layer(from_fn(require_csrf))),
        )
        .route(
            "/checkout",
            get(checkout::show).post(checkout::submit.layer(from_fn(require_csrf))),
        )
        .route(
            "/payment",
            get(checkout::payment_page).post(checkout::pay.layer(from_fn(require_csrf))),
        )
        .route("/orders/{id}", get(orders::show))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register.layer(from_fn(require_csrf))))
        .route("/login", post(auth::login.layer(from_fn(require_csrf))))
        .route("/logout", post(auth::logout.layer(from_fn(require_csrf))))
}

/// Build the complete application over the given session store.
///
/// Production passes the `PostgreSQL` session store; tests pass
/// `tower_sessions::MemoryStore`. Sentry layers are added by the binary.
pub fn app<S: SessionStore + Clone>(state: AppState, session_store: S) -> Router {
    let session_layer = create_session_layer(session_store, state.config());

    let shop = Router::new()
        .nest("/shop", shop_routes())
        .nest("/account", account_routes())
        .layer(from_fn(csrf_token_middleware))
        .layer(session_layer);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(shop)
        .with_state(state)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use tower::ServiceExt;

    use super::*;
    use crate::test_support::{FakeGateway, MemoryStore, test_app};

    fn app() -> Router {
        test_app(Arc::new(MemoryStore::new()), Arc::new(FakeGateway::approving()))
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app()
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_has_no_session_cookie() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().get("set-cookie").is_none());
        assert!(response.headers().get("x-request-id").is_some());
    }

    #[tokio::test]
    async fn test_shop_issues_csrf_header_and_session() {
        let response = app()
            .oneshot(Request::get("/shop").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-csrf-token").is_some());
        assert!(response.headers().get("set-cookie").is_some());
        assert_eq!(
            response.headers().get("x-frame-options").unwrap(),
            "DENY"
        );
    }

    #[tokio::test]
    async fn test_post_without_token_is_forbidden() {
        let response = app()
            .oneshot(
                Request::post("/shop/addtocart")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("Quantity=1&ProductId=1"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
