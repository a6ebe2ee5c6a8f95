//! Account route handlers.
//!
//! Signing in rotates the session ID, folds the guest cart into the
//! username's cart and rebinds the session's cart owner to the username.

use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    response::Redirect,
};
use serde::Deserialize;
use tracing::{Span, instrument};

use dvd_shop_core::OwnerId;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::models::{CurrentUser, ShopContext, ShopSession, User};
use crate::services::auth::AuthService;
use crate::services::cart::CartService;
use crate::state::AppState;

/// Where account actions land.
const SHOP_PATH: &str = "/shop";

/// Login and registration form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

/// Create an account and sign it in.
#[instrument(skip(state, session, form), fields(username = tracing::field::Empty))]
pub async fn register(
    State(state): State<AppState>,
    ctx: ShopContext,
    session: ShopSession,
    form: std::result::Result<Form<CredentialsForm>, FormRejection>,
) -> Result<Redirect> {
    let Form(form) = form?;
    Span::current().record("username", form.username.as_str());
    let user = AuthService::new(state.store())
        .register(&form.username, &form.password)
        .await?;
    sign_in(&state, &ctx, &session, &user).await?;
    Ok(Redirect::to(SHOP_PATH))
}

/// Sign in with username and password.
#[instrument(skip(state, session, form), fields(username = tracing::field::Empty))]
pub async fn login(
    State(state): State<AppState>,
    ctx: ShopContext,
    session: ShopSession,
    form: std::result::Result<Form<CredentialsForm>, FormRejection>,
) -> Result<Redirect> {
    let Form(form) = form?;
    Span::current().record("username", form.username.as_str());
    let user = AuthService::new(state.store())
        .login(&form.username, &form.password)
        .await?;
    sign_in(&state, &ctx, &session, &user).await?;
    Ok(Redirect::to(SHOP_PATH))
}

/// Sign out and discard the session, guest cart binding included.
#[instrument(skip_all)]
pub async fn logout(session: ShopSession) -> Result<Redirect> {
    session.flush().await?;
    clear_sentry_user();
    Ok(Redirect::to(SHOP_PATH))
}

async fn sign_in(
    state: &AppState,
    ctx: &ShopContext,
    session: &ShopSession,
    user: &User,
) -> Result<()> {
    let owner = OwnerId::parse(&user.username)
        .map_err(|e| AppError::Internal(format!("username is not a valid owner: {e}")))?;

    // Only a guest cart moves; an already signed-in session keeps its owner.
    if ctx.user.is_none() {
        CartService::new(state.store())
            .merge_into(&ctx.owner, &owner)
            .await?;
    }

    session
        .sign_in(&CurrentUser {
            id: user.id,
            username: user.username.clone(),
        })
        .await?;
    session.bind_owner(&owner).await?;

    set_sentry_user(&user.id, &user.username);
    tracing::info!(user_id = %user.id, "User signed in");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };

    use crate::test_support::{FakeGateway, MemoryStore, TestClient, json_body, test_app};

    async fn client() -> (TestClient, i32) {
        let store = MemoryStore::new();
        let c = store.add_category("Drama").await;
        let a = store.add_product("Casablanca", 999, c.id).await;
        let app = test_app(Arc::new(store), Arc::new(FakeGateway::approving()));
        (TestClient::new(app), a.id.as_i32())
    }

    #[tokio::test]
    async fn test_register_signs_in_and_keeps_guest_cart() {
        let (mut client, a) = client().await;
        client
            .post_form("/shop/addtocart", &format!("Quantity=2&ProductId={a}"))
            .await;

        let response = client
            .post_form("/account/register", "username=ada&password=correct+horse")
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let (_, cart) = client.get_json("/shop/cart").await;
        assert_eq!(cart["item_count"], 2);
        let (status, _) = client.get_json("/shop/checkout").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let (mut client, _) = client().await;
        client
            .post_form("/account/register", "username=ada&password=correct+horse")
            .await;

        let mut other = TestClient::new(client.app());
        let response = other
            .post_form("/account/register", "username=ada&password=another+secret")
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_bad_login_is_unauthorized() {
        let (mut client, _) = client().await;
        client
            .post_form("/account/register", "username=ada&password=correct+horse")
            .await;
        client.post_form("/account/logout", "").await;
        client.get("/shop").await;

        let response = client
            .post_form("/account/login", "username=ada&password=wrong+horse")
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn test_logout_forgets_user_and_cart() {
        let (mut client, a) = client().await;
        client
            .post_form("/account/register", "username=ada&password=correct+horse")
            .await;
        client
            .post_form("/shop/addtocart", &format!("Quantity=1&ProductId={a}"))
            .await;

        let response = client.post_form("/account/logout", "").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let (status, _) = client.get_json("/shop/checkout").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (_, cart) = client.get_json("/shop/cart").await;
        assert_eq!(cart["item_count"], 0);

        client.get("/shop").await;
        client
            .post_form("/account/login", "username=ada&password=correct+horse")
            .await;
        let (_, cart) = client.get_json("/shop/cart").await;
        assert_eq!(cart["item_count"], 1);
    }

    #[tokio::test]
    async fn test_logout_requires_token() {
        let (mut client, _) = client().await;
        client.get("/shop").await;
        let response = client.post_form_without_token("/account/logout", "").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_json_login_is_json_bad_request() {
        let (mut client, _) = client().await;
        client.get("/shop").await;
        let token = client.token().unwrap().to_string();

        let response = client
            .send(
                Request::post("/account/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header("x-csrf-token", token)
                    .body(Body::from(r#"{"username":"ada","password":"x"}"#))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }
}
