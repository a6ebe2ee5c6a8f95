//! Checkout assembly.
//!
//! Turns the shipping form and the current cart into an [`OrderDraft`] held
//! in session state until payment.

use chrono::Utc;
use tracing::{info, instrument};

use crate::db::ShopStore;
use crate::models::{OrderDraft, ShippingDetails, ShopContext, ShopSession};

use super::ShopError;
use super::cart::CartService;

/// Builds and stashes checkout drafts.
pub struct CheckoutService<'a> {
    store: &'a dyn ShopStore,
}

impl<'a> CheckoutService<'a> {
    /// Create a checkout service.
    #[must_use]
    pub const fn new(store: &'a dyn ShopStore) -> Self {
        Self { store }
    }

    /// Validate shipping details, price the cart and store the draft.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Unauthorized` if nobody is signed in.
    /// Returns `ShopError::Validation` for bad shipping fields or an empty cart.
    #[instrument(skip(self, session, shipping), fields(owner = %ctx.owner))]
    pub async fn begin_checkout(
        &self,
        ctx: &ShopContext,
        session: &ShopSession,
        shipping: &ShippingDetails,
    ) -> Result<OrderDraft, ShopError> {
        if !ctx.is_authenticated() {
            return Err(ShopError::Unauthorized);
        }

        let shipping = shipping.normalized().map_err(ShopError::Validation)?;

        let (total, items) = CartService::new(self.store).total(&ctx.owner).await?;
        if items.is_empty() {
            return Err(ShopError::Validation("cart is empty".to_string()));
        }

        let draft = OrderDraft {
            owner: ctx.owner.clone(),
            shipping,
            total,
            created_at: Utc::now(),
        };
        session.store_draft(&draft).await?;

        info!(total = %draft.total, lines = items.len(), "Checkout draft created");
        Ok(draft)
    }
}
