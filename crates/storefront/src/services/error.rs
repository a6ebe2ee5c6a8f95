//! Service-layer error types.

use thiserror::Error;
use tower_sessions::session::Error as SessionError;

use crate::db::RepositoryError;

use super::payment::PaymentError;

/// Errors surfaced by the cart, checkout and order services.
///
/// `NotFound`, `Unauthorized` and `Validation` are raised before anything is
/// written. `PaymentFailed` aborts before the commit sequence runs.
#[derive(Debug, Error)]
pub enum ShopError {
    /// A referenced product, cart line or order does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// The operation requires a signed-in user.
    #[error("authentication required")]
    Unauthorized,

    /// The payment gateway rejected or failed the charge.
    #[error("payment failed: {0}")]
    PaymentFailed(#[from] PaymentError),

    /// The store failed; any transaction in flight was rolled back.
    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),

    /// Session state could not be read or written.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}
