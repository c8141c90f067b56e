//! FFI surface of the grocery client core.

pub mod api;
