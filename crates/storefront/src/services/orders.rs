//! Order commit and lookup.
//!
//! `place_order` drives the payment step: draft from session, cart recheck,
//! charge, then one transaction that writes the order and empties the cart.

use chrono::Utc;
use tracing::{error, info, instrument};

use dvd_shop_core::{Email, OrderId};

use crate::db::ShopStore;
use crate::models::{NewOrder, Order, OrderDetail, ShopContext, ShopSession};

use super::ShopError;
use super::cart::CartService;
use super::payment::{PaymentGateway, PaymentProcessor};

/// Payment form fields.
#[derive(Debug, Clone)]
pub struct PaymentDetails {
    pub email: String,
    /// Single-use card token issued by the gateway's client library.
    pub token: String,
}

/// Places and reads orders.
pub struct OrderService<'a> {
    store: &'a dyn ShopStore,
    gateway: &'a dyn PaymentGateway,
}

impl<'a> OrderService<'a> {
    /// Create an order service.
    #[must_use]
    pub const fn new(store: &'a dyn ShopStore, gateway: &'a dyn PaymentGateway) -> Self {
        Self { store, gateway }
    }

    /// Charge for the session's draft and persist the order.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Unauthorized` if nobody is signed in.
    /// Returns `ShopError::Validation` if there is no draft, the draft belongs
    /// to another identity, the email is malformed, the card token is blank,
    /// or the cart changed since checkout. No charge is attempted in these cases.
    /// Returns `ShopError::PaymentFailed` if the gateway fails; nothing is
    /// written and the cart is untouched.
    /// Returns `ShopError::Persistence` if the commit fails after the charge.
    #[instrument(skip(self, session, payment), fields(owner = %ctx.owner))]
    pub async fn place_order(
        &self,
        ctx: &ShopContext,
        session: &ShopSession,
        payment: &PaymentDetails,
    ) -> Result<(Order, Vec<OrderDetail>), ShopError> {
        if !ctx.is_authenticated() {
            return Err(ShopError::Unauthorized);
        }

        let draft = session
            .draft()
            .await?
            .ok_or_else(|| ShopError::Validation("no checkout in progress".to_string()))?;
        if draft.owner != ctx.owner {
            return Err(ShopError::Validation(
                "checkout belongs to a different cart".to_string(),
            ));
        }

        let email =
            Email::parse(&payment.email).map_err(|e| ShopError::Validation(e.to_string()))?;
        if payment.token.trim().is_empty() {
            return Err(ShopError::Validation("card token is required".to_string()));
        }

        let (total, lines) = CartService::new(self.store).total(&ctx.owner).await?;
        if lines.is_empty() || total != draft.total {
            return Err(ShopError::Validation(
                "cart changed since checkout".to_string(),
            ));
        }

        let charge = PaymentProcessor::new(self.gateway)
            .charge(&email, &payment.token, draft.total)
            .await?;

        let new_order = NewOrder {
            owner: ctx.owner.clone(),
            shipping: draft.shipping,
            email,
            charge_id: charge.id.clone(),
            total: draft.total,
            created_at: Utc::now(),
            lines,
        };

        let (order, details) = self.store.commit_order(new_order).await.map_err(|e| {
            error!(
                charge_id = %charge.id,
                amount_cents = charge.amount_cents,
                error = %e,
                "Order commit failed after successful charge; reconcile manually"
            );
            ShopError::Persistence(e)
        })?;

        session.clear_draft().await?;

        info!(order_id = %order.id, total = %order.total, "Order placed");
        Ok((order, details))
    }

    /// An order and its lines, visible only to the owner who placed it.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the order does not exist or belongs to
    /// another owner.
    pub async fn order(
        &self,
        ctx: &ShopContext,
        id: OrderId,
    ) -> Result<(Order, Vec<OrderDetail>), ShopError> {
        self.store
            .order_for_owner(&ctx.owner, id)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("order {id}")))
    }
}
