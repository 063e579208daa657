//! Inline-cache stub generation for Garnet's binary arithmetic.
//!
//! Arithmetic fast paths with:
//! - Type-guarded int32 recipes for all eleven binary operators
//! - Exact overflow, negative-zero, and division edge-case detection
//! - A portable macro-assembler backend and stub executor
//! - A general evaluator stubs are verified against
//! - Compile-once stub caching keyed by operator and result policy
#![deny(unsafe_op_in_unsafe_fn)]
pub mod cache;
pub mod ic;
pub mod masm;
pub mod stub;
