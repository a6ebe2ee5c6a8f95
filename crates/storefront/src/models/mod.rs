//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the row types the
//! `PostgreSQL` adapter decodes into.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod session;
pub mod user;

pub use cart::{CartItem, CartLine, CartSummary};
pub use catalog::{Category, Product};
pub use order::{NewOrder, Order, OrderDetail, OrderDraft, ShippingDetails};
pub use session::{CurrentUser, ShopContext, ShopSession, keys as session_keys};
pub use user::User;
