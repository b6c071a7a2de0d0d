//! # berth-manifest
//!
//! Loader for compose-style deployment manifests.
//!
//! Handles:
//! - **Parser**: decoding the YAML document into the typed service model,
//!   with key-path errors for malformed input.
//! - **Environment / Interpolate**: `${VAR-default}` placeholder resolution
//!   from an injected environment map.
//! - **Graph**: dependency graph construction and deterministic topological
//!   ordering.
//! - **Render**: canonical re-serialization of a resolved manifest.
//!
//! The manifest is parsed once, immutable afterwards, and everything the
//! external container runtime owns (scheduling, health polling, volume
//! lifecycle) stays out of this crate.

pub mod environment;
pub mod graph;
pub mod interpolate;
pub mod model;
pub mod parser;
pub mod render;
