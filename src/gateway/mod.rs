//! Auth backend gateway.
//!
//! This module provides the `AuthGateway` interface the keeper depends on
//! (session lookup, refresh-token exchange, credential installation) and
//! `HttpAuthGateway`, the reqwest-backed implementation speaking to a
//! bearer-token auth backend.
//!
//! All three operations are network-bound and fallible; the keeper never
//! issues more than one of them concurrently.

pub mod client;
pub mod error;

pub use client::{AuthGateway, HttpAuthGateway};
pub use error::GatewayError;
