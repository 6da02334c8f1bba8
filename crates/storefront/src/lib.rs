//! Boba Shop storefront library.
//!
//! Keeps each visitor's cart consistent with the commerce platform and serves
//! it to the browser as a JSON API. Exposed as a library so the binary and the
//! integration tests share one router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod commerce;
pub mod config;
pub mod error;
pub mod middleware;
pub mod registry;
pub mod routes;
pub mod state;
