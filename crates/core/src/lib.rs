//! Boba Core - Shared types library.
//!
//! This crate provides the cart domain types used by the storefront and its
//! tests:
//! - `storefront` - Cart service and JSON API in front of the commerce platform
//! - `integration-tests` - End-to-end tests against a mocked platform
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Carts, cart actions, money, IDs, and the deployment market

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
