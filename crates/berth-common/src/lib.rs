//! # berth-common
//!
//! Foundation crate for the berth workspace: the error taxonomy shared by
//! every stage of the manifest pipeline, container and service primitives,
//! naming helpers, and the invocation configuration assembled at the CLI
//! boundary.
//!
//! Depends on no other berth crate; everything else builds on it.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
