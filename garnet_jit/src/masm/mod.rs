//! Macro-assembler abstraction for arithmetic stub generation.
//!
//! Stub recipes are written against the [`MacroAssembler`] trait, which
//! exposes exactly the primitive capabilities the recipes need: a type
//! guard, box/unbox, overflow-checked arithmetic, a checked divide-with-
//! remainder, masked shifts, a handful of edge-detection branches, and the
//! shared return/bail-out terminators. The recipes themselves stay
//! architecture-independent; a backend decides what each primitive lowers
//! to. The backend shipped here is [`portable::PortableAssembler`], which
//! lowers to an interpretable operation stream.

use thiserror::Error;

pub mod portable;

pub use portable::PortableAssembler;

// =============================================================================
// Registers
// =============================================================================

/// Register file of a generated stub.
///
/// `Lhs` and `Rhs` hold the two boxed operands on entry; `Lhs` doubles as the
/// result slot on the success path. The scratch registers hold unboxed
/// payloads and intermediates. Bail-out paths must leave `Lhs`/`Rhs` exactly
/// as received, so recipes only overwrite `Lhs` once no bail-out edge
/// remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg {
    /// Left operand (boxed); also the result slot.
    Lhs = 0,
    /// Right operand (boxed).
    Rhs = 1,
    /// Scratch slot, conventionally the unboxed left payload.
    Scratch0 = 2,
    /// Scratch slot, conventionally the unboxed right payload.
    Scratch1 = 3,
    /// Scratch slot for computed results.
    Scratch2 = 4,
}

impl Reg {
    /// Number of slots in a stub's register file.
    pub const COUNT: usize = 5;

    /// Slot index in the register file.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

// =============================================================================
// Labels
// =============================================================================

/// A label representing a position in the generated operation stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

impl Label {
    /// Create a label with an explicit id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Label(id)
    }

    /// The label's id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors surfaced while finalizing generated stub code.
///
/// These are generator bugs, not runtime conditions: a correctly written
/// recipe binds every label it branches to and ends every path in `ret` or
/// `bail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodegenError {
    /// A branch referenced a label that was never bound.
    #[error("unbound label {0:?} referenced by stub code")]
    UnboundLabel(Label),
    /// The operation stream does not end in a terminator.
    #[error("stub code does not end in ret or bail")]
    MissingTerminator,
}

// =============================================================================
// MacroAssembler
// =============================================================================

/// Emission interface for arithmetic stub code.
///
/// All 32-bit operations read and write register slots as zero-extended low
/// 32-bit payloads; full-word operations (`*_boxed_words`) act on whole boxed
/// values. Inputs are read in full before outputs are written, so an output
/// register may reuse an input register whose value is dead.
pub trait MacroAssembler {
    /// Create a new unbound label.
    fn create_label(&mut self) -> Label;

    /// Bind a label to the current position.
    fn bind_label(&mut self, label: Label);

    /// Whether int32 boxes under this backend's value encoding keep their tag
    /// bits intact under OR/AND of whole boxed words. When `false`, callers
    /// must emit the generic unbox/op/rebox form instead of
    /// [`or_boxed_words`](Self::or_boxed_words)/[`and_boxed_words`](Self::and_boxed_words).
    fn supports_boxed_word_bitwise(&self) -> bool;

    /// Branch to `target` unless `src` holds an int32 box.
    fn branch_if_not_int32(&mut self, src: Reg, target: Label);

    /// Extract the int32 payload of the box in `src` into `dst`.
    fn unbox_int32(&mut self, src: Reg, dst: Reg);

    /// Box the int32 payload in `src` into a tagged value in `dst`.
    fn box_int32(&mut self, src: Reg, dst: Reg);

    /// Convert the payload in `src`, taken as an unsigned 32-bit integer, to
    /// a double and box it into `dst`.
    fn box_uint32_as_double(&mut self, src: Reg, dst: Reg);

    /// `dst = lhs + rhs`, branching to `overflow` on signed overflow.
    fn add32_branch_overflow(&mut self, lhs: Reg, rhs: Reg, dst: Reg, overflow: Label);

    /// `dst = lhs - rhs`, branching to `overflow` on signed overflow.
    fn sub32_branch_overflow(&mut self, lhs: Reg, rhs: Reg, dst: Reg, overflow: Label);

    /// `dst = lhs * rhs`, branching to `overflow` on signed overflow.
    fn mul32_branch_overflow(&mut self, lhs: Reg, rhs: Reg, dst: Reg, overflow: Label);

    /// Truncating divide with remainder: `quot = lhs / rhs`,
    /// `rem = lhs % rhs`. Branches to `overflow` when the machine operation
    /// has no defined result: division by zero, or the minimum value divided
    /// by -1. `quot` is written before `rem`.
    fn divmod32_branch_overflow(&mut self, lhs: Reg, rhs: Reg, quot: Reg, rem: Reg, overflow: Label);

    /// OR of two whole boxed words. Only valid when
    /// [`supports_boxed_word_bitwise`](Self::supports_boxed_word_bitwise) is `true`.
    fn or_boxed_words(&mut self, lhs: Reg, rhs: Reg, dst: Reg);

    /// AND of two whole boxed words. Only valid when
    /// [`supports_boxed_word_bitwise`](Self::supports_boxed_word_bitwise) is `true`.
    fn and_boxed_words(&mut self, lhs: Reg, rhs: Reg, dst: Reg);

    /// `dst = lhs | rhs` on payloads.
    fn or32(&mut self, lhs: Reg, rhs: Reg, dst: Reg);

    /// `dst = lhs & rhs` on payloads.
    fn and32(&mut self, lhs: Reg, rhs: Reg, dst: Reg);

    /// `dst = lhs ^ rhs` on payloads.
    fn xor32(&mut self, lhs: Reg, rhs: Reg, dst: Reg);

    /// `dst = lhs << (rhs & 0x1f)`.
    fn lsh32_masked(&mut self, lhs: Reg, rhs: Reg, dst: Reg);

    /// `dst = lhs >> (rhs & 0x1f)`, arithmetic (sign-extending).
    fn rsh32_masked(&mut self, lhs: Reg, rhs: Reg, dst: Reg);

    /// `dst = lhs >>> (rhs & 0x1f)`, logical (zero-filling).
    fn ursh32_masked(&mut self, lhs: Reg, rhs: Reg, dst: Reg);

    /// Branch to `target` if the payload in `src` is non-zero.
    fn branch_if_nonzero32(&mut self, src: Reg, target: Label);

    /// Branch to `target` if the payload in `src` is negative.
    fn branch_if_negative32(&mut self, src: Reg, target: Label);

    /// Branch to `target` if the payloads in `lhs` and `rhs` have opposite
    /// signs.
    fn branch_if_signs_differ32(&mut self, lhs: Reg, rhs: Reg, target: Label);

    /// Return from the stub with the boxed result in [`Reg::Lhs`].
    fn ret(&mut self);

    /// Take the stub's bail-out exit.
    fn bail(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reg_indices_are_dense() {
        let regs = [Reg::Lhs, Reg::Rhs, Reg::Scratch0, Reg::Scratch1, Reg::Scratch2];
        assert_eq!(regs.len(), Reg::COUNT);
        for (i, r) in regs.iter().enumerate() {
            assert_eq!(r.index(), i);
        }
    }

    #[test]
    fn test_label_id_roundtrip() {
        let label = Label::new(7);
        assert_eq!(label.id(), 7);
        assert_eq!(label, Label::new(7));
        assert_ne!(label, Label::new(8));
    }

    #[test]
    fn test_codegen_error_display() {
        let err = CodegenError::UnboundLabel(Label::new(3));
        assert!(err.to_string().contains("unbound label"));
        assert!(CodegenError::MissingTerminator.to_string().contains("ret or bail"));
    }
}
