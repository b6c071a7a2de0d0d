//! Deployment engine for berth.
//!
//! Walks a parsed manifest in dependency order and drives an external
//! container runtime (`docker` or `podman`) through the [`invoker`]
//! seam. One service failing to start never blocks services that do
//! not depend on it.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod engine;
pub mod invoker;
