//! # Garnet Core
//!
//! Core types and primitives for the Garnet engine.
//!
//! This crate provides the foundational building blocks shared across all Garnet components:
//!
//! - **Value System**: Tagged union representation of engine values with NaN-boxing,
//!   including the canonical int32 box the JIT's integer fast paths speculate on

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod value;

pub use value::Value;

/// Garnet engine version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
