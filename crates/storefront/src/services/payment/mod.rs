//! Payment processor adapter.
//!
//! The commit sequence only runs after [`PaymentProcessor::charge`] succeeds.
//! The gateway itself is an injected [`PaymentGateway`] so the HTTP adapter
//! can be replaced in tests.

mod stripe;

pub use stripe::StripeGateway;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, instrument};

use dvd_shop_core::{Email, Price};

/// ISO currency code for every charge.
pub const CURRENCY: &str = "usd";

/// Errors that can occur when talking to the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("gateway request failed: {0}")]
    Request(String),

    /// Failed to parse the gateway response.
    #[error("gateway response error: {0}")]
    Response(String),

    /// The gateway refused the token or the charge.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The amount is zero, negative, or not representable in cents.
    #[error("invalid charge amount: {0}")]
    InvalidAmount(String),
}

/// A customer record held by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    /// Gateway customer reference.
    pub id: String,
}

/// A captured charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charge {
    /// Gateway charge reference, stored on the order.
    pub id: String,
    /// Amount captured in cents.
    pub amount_cents: i64,
}

/// The two gateway operations the shop consumes.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register a customer from an email address and a card token.
    async fn create_customer(&self, email: &Email, token: &str)
    -> Result<Customer, PaymentError>;

    /// Charge a customer `amount_cents` in [`CURRENCY`].
    async fn create_charge(
        &self,
        customer: &Customer,
        amount_cents: i64,
        description: &str,
    ) -> Result<Charge, PaymentError>;
}

/// Runs the customer-then-charge sequence against a gateway.
pub struct PaymentProcessor<'a> {
    gateway: &'a dyn PaymentGateway,
}

impl<'a> PaymentProcessor<'a> {
    /// Create a processor over the given gateway.
    #[must_use]
    pub const fn new(gateway: &'a dyn PaymentGateway) -> Self {
        Self { gateway }
    }

    /// Register the customer and charge `amount`.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` if `amount` is not positive, or
    /// whatever the gateway reports.
    #[instrument(skip(self, token), fields(email = %email, amount = %amount))]
    pub async fn charge(
        &self,
        email: &Email,
        token: &str,
        amount: Price,
    ) -> Result<Charge, PaymentError> {
        let amount_cents = amount
            .to_cents()
            .map_err(|e| PaymentError::InvalidAmount(e.to_string()))?;
        if amount_cents <= 0 {
            return Err(PaymentError::InvalidAmount(amount.to_string()));
        }

        let customer = self.gateway.create_customer(email, token).await?;
        let charge = self
            .gateway
            .create_charge(&customer, amount_cents, &format!("DVD shop order for {email}"))
            .await?;

        info!(charge_id = %charge.id, amount_cents, "Payment captured");
        Ok(charge)
    }
}
