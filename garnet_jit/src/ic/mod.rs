//! Inline Caching (IC) for binary arithmetic.
//!
//! When a call site has observed both operands as int32 boxes, the engine
//! attaches a specialized stub that redoes the int32 fast path with explicit
//! edge-case detection instead of dispatching through the general evaluator.
//!
//! # Architecture
//!
//! Each stub is monomorphic in its operator and follows one shape:
//!
//! ```text
//! guard(lhs is int32) ──┐
//! guard(rhs is int32) ──┤
//! operator recipe     ──┼──> bail-out (fallback path owns the operation)
//! box result            │
//! shared return <───────┘
//! ```
//!
//! ## Components
//!
//! - **BinaryArithOp**: The closed operator set stubs can be built for
//! - **BinaryArithCompiler**: Emits one stub body per (operator, policy)
//! - **fallback**: The general evaluator; the semantics stubs must agree with
//!
//! ## Bail-out conditions
//!
//! | Operator    | Bails on                                              |
//! |-------------|-------------------------------------------------------|
//! | Add, Sub    | signed overflow                                       |
//! | Mul         | signed overflow; zero product with mixed signs (-0)   |
//! | Div         | 0/-n (-0); b == 0; INT_MIN/-1; non-zero remainder     |
//! | Mod         | b == 0; INT_MIN/-1; zero remainder, negative dividend |
//! | BitOr/Xor/And, Lsh, Rsh | never                                    |
//! | Ursh        | result above int32 range when doubles are disallowed  |
//!
//! A bail-out is designed control flow, not an error: the caller's fallback
//! path produces the correct answer and the stub remains a pure optimization.

use std::fmt;

pub mod binary_arith;
pub mod fallback;

pub use binary_arith::BinaryArithCompiler;

// =============================================================================
// Operators
// =============================================================================

/// Binary operators an arithmetic stub can be compiled for.
///
/// The set is closed; stub generation dispatches over it exhaustively, so an
/// unrecognized operator cannot reach the generator at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BinaryArithOp {
    /// `a + b`
    Add = 0,
    /// `a - b`
    Sub = 1,
    /// `a * b`
    Mul = 2,
    /// Truncating `a / b`
    Div = 3,
    /// Truncating remainder `a % b`
    Mod = 4,
    /// `a | b`
    BitOr = 5,
    /// `a ^ b`
    BitXor = 6,
    /// `a & b`
    BitAnd = 7,
    /// `a << (b & 0x1f)`
    Lsh = 8,
    /// `a >> (b & 0x1f)`, sign-extending
    Rsh = 9,
    /// `a >>> (b & 0x1f)`, zero-filling
    Ursh = 10,
}

impl BinaryArithOp {
    /// Every operator, in discriminant order.
    pub const ALL: [Self; 11] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::BitOr,
        Self::BitXor,
        Self::BitAnd,
        Self::Lsh,
        Self::Rsh,
        Self::Ursh,
    ];

    /// Get a human-readable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Sub => "Sub",
            Self::Mul => "Mul",
            Self::Div => "Div",
            Self::Mod => "Mod",
            Self::BitOr => "BitOr",
            Self::BitXor => "BitXor",
            Self::BitAnd => "BitAnd",
            Self::Lsh => "Lsh",
            Self::Rsh => "Rsh",
            Self::Ursh => "Ursh",
        }
    }
}

impl fmt::Display for BinaryArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_lists_every_operator_once() {
        assert_eq!(BinaryArithOp::ALL.len(), 11);
        for (i, op) in BinaryArithOp::ALL.iter().enumerate() {
            assert_eq!(*op as usize, i);
        }
    }

    #[test]
    fn test_as_str_names_are_unique() {
        for a in BinaryArithOp::ALL {
            for b in BinaryArithOp::ALL {
                assert_eq!(a.as_str() == b.as_str(), a == b);
            }
            assert_eq!(a.to_string(), a.as_str());
        }
    }
}
