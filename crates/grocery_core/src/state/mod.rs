//! Presentation state containers.
//!
//! # Responsibility
//! - Turn user intents and upstream streams into immutable view snapshots.
//! - Publish snapshots on replay-latest `watch` channels.
//!
//! # Invariants
//! - Each container is the single writer of its snapshot.
//! - Background tasks owned by a container are aborted when it is dropped.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod chat;
pub mod weather;
