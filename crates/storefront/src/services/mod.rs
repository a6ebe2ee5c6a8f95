//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Local username/password accounts
//! - `catalog` - Category and product reads
//! - `cart` - Owner-scoped cart operations
//! - `checkout` - Order draft assembly
//! - `payment` - Payment gateway adapter
//! - `orders` - Charge-then-commit and order lookup
//!
//! Services borrow the store (and gateway) for the duration of a call and
//! receive the shopper identity as an explicit [`ShopContext`](crate::models::ShopContext).

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
mod error;
pub mod orders;
pub mod payment;

pub use error::ShopError;
