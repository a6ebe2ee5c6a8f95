//! Core types for the DVD shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod owner;
pub mod price;

pub use email::{Email, EmailError};
pub use id::*;
pub use owner::{OwnerId, OwnerIdError};
pub use price::{Price, PriceError};
