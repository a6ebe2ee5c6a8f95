//! Order confirmation handler.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use dvd_shop_core::OrderId;

use crate::error::Result;
use crate::middleware::{CsrfToken, RequireAuth};
use crate::models::{Order, OrderDetail, ShopContext};
use crate::services::orders::OrderService;
use crate::state::AppState;

/// Order header and lines.
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub order: Order,
    pub details: Vec<OrderDetail>,
    pub csrf_token: String,
}

/// Show one of the signed-in user's orders.
#[instrument(skip(state, _user, csrf), fields(owner = %ctx.owner))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    ctx: ShopContext,
    csrf: CsrfToken,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let (order, details) = OrderService::new(state.store(), state.payments())
        .order(&ctx, id)
        .await?;
    Ok(Json(OrderView {
        order,
        details,
        csrf_token: csrf.0,
    }))
}
