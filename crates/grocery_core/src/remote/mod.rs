//! Remote sources: REST API, document store and identity provider.
//!
//! # Responsibility
//! - Define the ports the sync and state layers call across the network.
//! - Provide the `reqwest` REST adapter and typed document-store mirrors.
//!
//! # Invariants
//! - Nothing in this module retries; every failure is returned to the caller.
//! - Remote errors keep their original cause.

pub mod api;
pub mod http;
pub mod identity;
pub mod mirror;
pub mod store;
