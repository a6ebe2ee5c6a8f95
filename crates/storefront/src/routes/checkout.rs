//! Checkout and payment route handlers.
//!
//! `POST /shop/checkout` stores an order draft in the session;
//! `POST /shop/payment` charges for it and commits the order.

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    response::Redirect,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use dvd_shop_core::Price;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{CsrfToken, RequireAuth};
use crate::models::{CartSummary, ShippingDetails, ShopContext, ShopSession};
use crate::services::cart::CartService;
use crate::services::checkout::CheckoutService;
use crate::services::orders::{OrderService, PaymentDetails};
use crate::state::AppState;

/// Shipping form model.
#[derive(Debug, Serialize)]
pub struct CheckoutView {
    /// Previously submitted shipping details, or blanks.
    pub shipping: ShippingDetails,
    pub cart: CartSummary,
    pub csrf_token: String,
}

/// Payment step model.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    /// Total captured at checkout; absent when no checkout is in progress.
    pub total: Option<Price>,
    /// Key for the gateway's browser-side tokenization library.
    pub publishable_key: String,
    pub csrf_token: String,
}

/// Payment form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PaymentForm {
    pub email: String,
    pub token: String,
}

/// Show the shipping form.
#[instrument(skip(state, _user, session, csrf), fields(owner = %ctx.owner))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    ctx: ShopContext,
    session: ShopSession,
    csrf: CsrfToken,
) -> Result<Json<CheckoutView>> {
    let cart = CartService::new(state.store()).summary(&ctx.owner).await?;
    let shipping = session
        .draft()
        .await?
        .filter(|draft| draft.owner == ctx.owner)
        .map(|draft| draft.shipping)
        .unwrap_or_default();

    Ok(Json(CheckoutView {
        shipping,
        cart,
        csrf_token: csrf.0,
    }))
}

/// Validate shipping details and store the draft.
#[instrument(skip(state, _user, session, form), fields(owner = %ctx.owner))]
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    ctx: ShopContext,
    session: ShopSession,
    form: std::result::Result<Form<ShippingDetails>, FormRejection>,
) -> Result<Redirect> {
    let Form(form) = form?;
    let draft = CheckoutService::new(state.store())
        .begin_checkout(&ctx, &session, &form)
        .await?;

    add_breadcrumb(
        "checkout",
        "Checkout submitted",
        Some(&[("total", &draft.total.to_string())]),
    );

    Ok(Redirect::to("/shop/payment"))
}

/// Show the amount due and the gateway's publishable key.
#[instrument(skip_all)]
pub async fn payment_page(
    State(state): State<AppState>,
    session: ShopSession,
    csrf: CsrfToken,
) -> Result<Json<PaymentView>> {
    Ok(Json(PaymentView {
        total: session.checkout_total().await?,
        publishable_key: state.config().payment.publishable_key.clone(),
        csrf_token: csrf.0,
    }))
}

/// Charge for the draft and commit the order.
#[instrument(skip(state, _user, session, form), fields(owner = %ctx.owner))]
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    ctx: ShopContext,
    session: ShopSession,
    form: std::result::Result<Form<PaymentForm>, FormRejection>,
) -> Result<Redirect> {
    let Form(form) = form?;
    let payment = PaymentDetails {
        email: form.email,
        token: form.token,
    };
    let (order, _details) = OrderService::new(state.store(), state.payments())
        .place_order(&ctx, &session, &payment)
        .await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_id", &order.id.to_string())]),
    );

    Ok(Redirect::to(&format!("/shop/orders/{}", order.id)))
}
