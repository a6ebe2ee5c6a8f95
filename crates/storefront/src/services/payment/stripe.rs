//! Stripe-compatible REST gateway.
//!
//! Speaks the form-encoded `/v1/customers` and `/v1/charges` endpoints with
//! the secret key as bearer auth.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument, warn};

use dvd_shop_core::Email;

use super::{CURRENCY, Charge, Customer, PaymentError, PaymentGateway};

#[derive(Debug, Deserialize)]
struct CustomerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    id: String,
    amount: i64,
    #[serde(default)]
    paid: bool,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Payment gateway backed by the Stripe HTTP API.
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    api_base: String,
    secret_key: SecretString,
}

impl std::fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeGateway")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl StripeGateway {
    /// Create a gateway client.
    ///
    /// `api_base` is the scheme and host, e.g. `https://api.stripe.com`.
    #[must_use]
    pub fn new(api_base: &str, secret_key: SecretString) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, PaymentError> {
        let response = self
            .client
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .form(params)
            .send()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, PaymentError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| PaymentError::Response(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify_error(status, &body))
}

/// Map a non-success gateway reply to a [`PaymentError`].
fn classify_error(status: StatusCode, body: &str) -> PaymentError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|e| e.error.message.clone())
        .unwrap_or_else(|| format!("gateway returned {status}"));
    let is_card_error = parsed
        .as_ref()
        .and_then(|e| e.error.kind.as_deref())
        .is_some_and(|kind| kind == "card_error");

    if status == StatusCode::PAYMENT_REQUIRED || is_card_error {
        warn!(%status, %message, "Gateway declined request");
        PaymentError::Declined(message)
    } else {
        error!(%status, %message, "Gateway error");
        PaymentError::Response(message)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, token), fields(email = %email))]
    async fn create_customer(
        &self,
        email: &Email,
        token: &str,
    ) -> Result<Customer, PaymentError> {
        let created: CustomerResponse = self
            .post_form("/v1/customers", &[("email", email.as_str()), ("source", token)])
            .await?;

        debug!(customer_id = %created.id, "Gateway customer created");
        Ok(Customer { id: created.id })
    }

    #[instrument(skip(self, description), fields(customer_id = %customer.id))]
    async fn create_charge(
        &self,
        customer: &Customer,
        amount_cents: i64,
        description: &str,
    ) -> Result<Charge, PaymentError> {
        let amount = amount_cents.to_string();
        let charge: ChargeResponse = self
            .post_form(
                "/v1/charges",
                &[
                    ("amount", amount.as_str()),
                    ("currency", CURRENCY),
                    ("customer", customer.id.as_str()),
                    ("description", description),
                ],
            )
            .await?;

        if !charge.paid {
            return Err(PaymentError::Declined(format!(
                "charge {} not paid (status: {})",
                charge.id,
                charge.status.as_deref().unwrap_or("unknown")
            )));
        }
        if charge.amount != amount_cents {
            return Err(PaymentError::Response(format!(
                "charge {} captured {} cents, expected {amount_cents}",
                charge.id, charge.amount
            )));
        }

        Ok(Charge {
            id: charge.id,
            amount_cents: charge.amount,
        })
    }
}
