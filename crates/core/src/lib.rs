//! DVD Shop Core - Shared types library.
//!
//! This crate provides the domain types used across all DVD shop components:
//! - `storefront` - Public-facing shop (catalog, cart, checkout, payment)
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails and cart owners

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
