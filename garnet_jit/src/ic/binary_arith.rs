//! Stub compiler for binary arithmetic over int32 operands.
//!
//! [`BinaryArithCompiler`] emits the body of one inline-cache stub: a type
//! guard over both operands, the operator's recipe with its edge-case
//! checks, and a boxed result placed in the left operand's slot. Every
//! failed check funnels into one shared bail-out, and every success path
//! reaches one shared return.
//!
//! The emitted body carries the soundness contract: for int32-boxed inputs
//! it either returns exactly the value [`fallback::evaluate`] would produce,
//! bit for bit, or it bails. All checks run before the result slot is
//! written, so a bailing execution leaves the operands as received.
//!
//! [`fallback::evaluate`]: super::fallback::evaluate

use crate::masm::{CodegenError, Label, MacroAssembler, PortableAssembler, Reg};
use crate::stub::GeneratedStub;

use super::BinaryArithOp;

// =============================================================================
// Compiler
// =============================================================================

/// Compiles one arithmetic stub for a fixed operator and double-result
/// policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryArithCompiler {
    op: BinaryArithOp,
    allow_double: bool,
}

impl BinaryArithCompiler {
    /// Create a compiler for `op`.
    ///
    /// `allow_double` is the double-result policy. It only means something
    /// for [`BinaryArithOp::Ursh`], the one recipe whose true result can
    /// exceed int32 range, and is stored as `false` for every other
    /// operator.
    #[must_use]
    pub const fn new(op: BinaryArithOp, allow_double: bool) -> Self {
        BinaryArithCompiler {
            op,
            allow_double: allow_double && matches!(op, BinaryArithOp::Ursh),
        }
    }

    /// The operator this compiler emits a recipe for.
    #[inline]
    #[must_use]
    pub const fn op(&self) -> BinaryArithOp {
        self.op
    }

    /// The effective double-result policy.
    #[inline]
    #[must_use]
    pub const fn allow_double(&self) -> bool {
        self.allow_double
    }

    /// Compile the stub against the portable backend.
    pub fn compile(&self) -> Result<GeneratedStub, CodegenError> {
        let mut masm = PortableAssembler::new();
        self.emit(&mut masm);
        Ok(GeneratedStub::new(masm.finalize()?, self.op, self.allow_double))
    }

    /// Emit the stub body into `masm`.
    ///
    /// Layout: guard both operands as int32 boxes, run the operator recipe
    /// with its edge-case checks branching to a shared failure label, box
    /// the result into [`Reg::Lhs`], and end the success path in one shared
    /// return. The failure label binds to a single bail-out terminator.
    pub fn emit<M: MacroAssembler>(&self, masm: &mut M) {
        let failure = masm.create_label();

        masm.branch_if_not_int32(Reg::Lhs, failure);
        masm.branch_if_not_int32(Reg::Rhs, failure);

        match self.op {
            BinaryArithOp::Add => {
                Self::unbox_operands(masm);
                masm.add32_branch_overflow(Reg::Scratch0, Reg::Scratch1, Reg::Scratch2, failure);
                masm.box_int32(Reg::Scratch2, Reg::Lhs);
            }
            BinaryArithOp::Sub => {
                Self::unbox_operands(masm);
                masm.sub32_branch_overflow(Reg::Scratch0, Reg::Scratch1, Reg::Scratch2, failure);
                masm.box_int32(Reg::Scratch2, Reg::Lhs);
            }
            BinaryArithOp::Mul => Self::emit_mul(masm, failure),
            BinaryArithOp::Div => Self::emit_div(masm, failure),
            BinaryArithOp::Mod => Self::emit_mod(masm, failure),
            BinaryArithOp::BitOr => {
                if masm.supports_boxed_word_bitwise() {
                    // Int32 boxes share their entire upper half, which OR
                    // preserves, so the boxed words combine directly.
                    masm.or_boxed_words(Reg::Lhs, Reg::Rhs, Reg::Lhs);
                } else {
                    Self::unbox_operands(masm);
                    masm.or32(Reg::Scratch0, Reg::Scratch1, Reg::Scratch2);
                    masm.box_int32(Reg::Scratch2, Reg::Lhs);
                }
            }
            BinaryArithOp::BitXor => {
                // XOR of two boxed words would clear the shared tag bits;
                // this one always unboxes.
                Self::unbox_operands(masm);
                masm.xor32(Reg::Scratch0, Reg::Scratch1, Reg::Scratch2);
                masm.box_int32(Reg::Scratch2, Reg::Lhs);
            }
            BinaryArithOp::BitAnd => {
                if masm.supports_boxed_word_bitwise() {
                    masm.and_boxed_words(Reg::Lhs, Reg::Rhs, Reg::Lhs);
                } else {
                    Self::unbox_operands(masm);
                    masm.and32(Reg::Scratch0, Reg::Scratch1, Reg::Scratch2);
                    masm.box_int32(Reg::Scratch2, Reg::Lhs);
                }
            }
            BinaryArithOp::Lsh => {
                Self::unbox_operands(masm);
                masm.lsh32_masked(Reg::Scratch0, Reg::Scratch1, Reg::Scratch2);
                masm.box_int32(Reg::Scratch2, Reg::Lhs);
            }
            BinaryArithOp::Rsh => {
                Self::unbox_operands(masm);
                masm.rsh32_masked(Reg::Scratch0, Reg::Scratch1, Reg::Scratch2);
                masm.box_int32(Reg::Scratch2, Reg::Lhs);
            }
            BinaryArithOp::Ursh => self.emit_ursh(masm, failure),
        }

        masm.ret();

        masm.bind_label(failure);
        masm.bail();
    }

    /// Unbox the guarded operands into the scratch pair the generic recipes
    /// consume.
    fn unbox_operands<M: MacroAssembler>(masm: &mut M) {
        masm.unbox_int32(Reg::Lhs, Reg::Scratch0);
        masm.unbox_int32(Reg::Rhs, Reg::Scratch1);
    }

    fn emit_mul<M: MacroAssembler>(masm: &mut M, failure: Label) {
        Self::unbox_operands(masm);
        masm.mul32_branch_overflow(Reg::Scratch0, Reg::Scratch1, Reg::Scratch2, failure);
        // A zero product from mixed-sign operands stands for -0, which no
        // int32 carries.
        let nonzero = masm.create_label();
        masm.branch_if_nonzero32(Reg::Scratch2, nonzero);
        masm.branch_if_signs_differ32(Reg::Scratch0, Reg::Scratch1, failure);
        masm.bind_label(nonzero);
        masm.box_int32(Reg::Scratch2, Reg::Lhs);
    }

    fn emit_div<M: MacroAssembler>(masm: &mut M, failure: Label) {
        Self::unbox_operands(masm);
        // Zero divided by a negative is -0, but the machine division would
        // materialize +0; catch it before dividing. The division's own
        // branch covers b == 0 and INT_MIN / -1.
        let dividend_nonzero = masm.create_label();
        masm.branch_if_nonzero32(Reg::Scratch0, dividend_nonzero);
        masm.branch_if_negative32(Reg::Scratch1, failure);
        masm.bind_label(dividend_nonzero);
        // The remainder reuses the dead dividend slot; it must be zero for
        // the quotient to be the exact result.
        masm.divmod32_branch_overflow(
            Reg::Scratch0,
            Reg::Scratch1,
            Reg::Scratch2,
            Reg::Scratch0,
            failure,
        );
        masm.branch_if_nonzero32(Reg::Scratch0, failure);
        masm.box_int32(Reg::Scratch2, Reg::Lhs);
    }

    fn emit_mod<M: MacroAssembler>(masm: &mut M, failure: Label) {
        Self::unbox_operands(masm);
        // The remainder reuses the dead divisor slot; the dividend stays
        // live for the sign check below.
        masm.divmod32_branch_overflow(
            Reg::Scratch0,
            Reg::Scratch1,
            Reg::Scratch2,
            Reg::Scratch1,
            failure,
        );
        // The truncating remainder takes the dividend's sign, so a zero
        // remainder from a negative dividend stands for -0. Nonzero
        // remainders already carry their sign and box directly.
        let remainder_nonzero = masm.create_label();
        masm.branch_if_nonzero32(Reg::Scratch1, remainder_nonzero);
        masm.branch_if_negative32(Reg::Scratch0, failure);
        masm.bind_label(remainder_nonzero);
        masm.box_int32(Reg::Scratch1, Reg::Lhs);
    }

    fn emit_ursh<M: MacroAssembler>(&self, masm: &mut M, failure: Label) {
        Self::unbox_operands(masm);
        masm.ursh32_masked(Reg::Scratch0, Reg::Scratch1, Reg::Scratch2);
        if self.allow_double {
            // A result with the high bit set exceeds int32 range and boxes
            // as a double; in-range results return directly.
            let wide_result = masm.create_label();
            masm.branch_if_negative32(Reg::Scratch2, wide_result);
            masm.box_int32(Reg::Scratch2, Reg::Lhs);
            masm.ret();
            masm.bind_label(wide_result);
            masm.box_uint32_as_double(Reg::Scratch2, Reg::Lhs);
        } else {
            masm.branch_if_negative32(Reg::Scratch2, failure);
            masm.box_int32(Reg::Scratch2, Reg::Lhs);
        }
    }
}
