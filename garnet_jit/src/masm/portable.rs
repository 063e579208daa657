//! Portable stub backend.
//!
//! Lowers each [`MacroAssembler`](super::MacroAssembler) primitive to one
//! architecture-neutral [`StubOp`] and resolves forward branches the same way
//! a native assembler would: branches are emitted with a placeholder target
//! and a relocation entry, and [`PortableAssembler::finalize`] patches every
//! relocation to the bound label's position. The finalized stream is executed
//! by the interpreter in [`crate::stub`].

use smallvec::SmallVec;

use super::{CodegenError, Label, MacroAssembler, Reg};

// =============================================================================
// Stub Operations
// =============================================================================

/// One architecture-neutral stub operation.
///
/// Branch targets are operation indices after finalization (placeholders
/// before). 32-bit operations treat register slots as zero-extended low
/// 32-bit payloads; the `*Words` operations act on whole boxed words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StubOp {
    BranchIfNotInt32 { src: Reg, target: u32 },
    UnboxInt32 { src: Reg, dst: Reg },
    BoxInt32 { src: Reg, dst: Reg },
    BoxUint32AsDouble { src: Reg, dst: Reg },
    Add32Overflow { lhs: Reg, rhs: Reg, dst: Reg, target: u32 },
    Sub32Overflow { lhs: Reg, rhs: Reg, dst: Reg, target: u32 },
    Mul32Overflow { lhs: Reg, rhs: Reg, dst: Reg, target: u32 },
    DivMod32Overflow { lhs: Reg, rhs: Reg, quot: Reg, rem: Reg, target: u32 },
    OrWords { lhs: Reg, rhs: Reg, dst: Reg },
    AndWords { lhs: Reg, rhs: Reg, dst: Reg },
    Or32 { lhs: Reg, rhs: Reg, dst: Reg },
    And32 { lhs: Reg, rhs: Reg, dst: Reg },
    Xor32 { lhs: Reg, rhs: Reg, dst: Reg },
    Lsh32Masked { lhs: Reg, rhs: Reg, dst: Reg },
    Rsh32Masked { lhs: Reg, rhs: Reg, dst: Reg },
    Ursh32Masked { lhs: Reg, rhs: Reg, dst: Reg },
    BranchIfNonZero32 { src: Reg, target: u32 },
    BranchIfNegative32 { src: Reg, target: u32 },
    BranchIfSignsDiffer32 { lhs: Reg, rhs: Reg, target: u32 },
    Ret,
    Bail,
}

impl StubOp {
    /// Mutable access to the branch-target slot, if this op is a branch.
    fn branch_target_mut(&mut self) -> Option<&mut u32> {
        match self {
            StubOp::BranchIfNotInt32 { target, .. }
            | StubOp::Add32Overflow { target, .. }
            | StubOp::Sub32Overflow { target, .. }
            | StubOp::Mul32Overflow { target, .. }
            | StubOp::DivMod32Overflow { target, .. }
            | StubOp::BranchIfNonZero32 { target, .. }
            | StubOp::BranchIfNegative32 { target, .. }
            | StubOp::BranchIfSignsDiffer32 { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Whether this op ends a control-flow path.
    const fn is_terminator(self) -> bool {
        matches!(self, StubOp::Ret | StubOp::Bail)
    }
}

/// A relocation entry: a branch op awaiting its label's position.
#[derive(Debug, Clone, Copy)]
struct Relocation {
    /// Index of the branch op in the stream.
    op_index: u32,
    /// The label this relocation refers to.
    label: Label,
}

// =============================================================================
// Assembler
// =============================================================================

/// The portable backend: collects stub operations and patches branches.
pub struct PortableAssembler {
    ops: Vec<StubOp>,
    labels: SmallVec<[Option<u32>; 8]>,
    relocations: SmallVec<[Relocation; 8]>,
    next_label: u32,
    boxed_word_bitwise: bool,
}

impl PortableAssembler {
    /// Create a new assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boxed_word_bitwise(true)
    }

    /// Create a new assembler with the boxed-word bitwise capability set
    /// explicitly. The canonical int32 encoding supports it; disabling it
    /// forces the generic unbox/op/rebox form, which tests compare against.
    #[must_use]
    pub fn with_boxed_word_bitwise(enabled: bool) -> Self {
        PortableAssembler {
            ops: Vec::with_capacity(16),
            labels: SmallVec::new(),
            relocations: SmallVec::new(),
            next_label: 0,
            boxed_word_bitwise: enabled,
        }
    }

    /// Current position in the operation stream.
    #[inline]
    #[must_use]
    pub fn position(&self) -> u32 {
        self.ops.len() as u32
    }

    fn emit(&mut self, op: StubOp) {
        self.ops.push(op);
    }

    /// Emit a branch op (with a placeholder target) and record a relocation
    /// against `label`.
    fn emit_branch(&mut self, op: StubOp, label: Label) {
        let op_index = self.position();
        self.relocations.push(Relocation { op_index, label });
        self.emit(op);
    }

    /// Patch every relocation and hand back the finished stream.
    ///
    /// Fails if a branch references a label that was never bound, or if the
    /// stream does not end in a terminator (either would leave the executor
    /// running off the end of the stub).
    pub(crate) fn finalize(mut self) -> Result<Box<[StubOp]>, CodegenError> {
        for reloc in &self.relocations {
            let target = self.labels[reloc.label.id() as usize]
                .ok_or(CodegenError::UnboundLabel(reloc.label))?;
            if let Some(slot) = self.ops[reloc.op_index as usize].branch_target_mut() {
                *slot = target;
            }
        }
        match self.ops.last() {
            Some(op) if op.is_terminator() => Ok(self.ops.into_boxed_slice()),
            _ => Err(CodegenError::MissingTerminator),
        }
    }
}

impl Default for PortableAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroAssembler for PortableAssembler {
    fn create_label(&mut self) -> Label {
        let id = self.next_label;
        self.next_label += 1;
        self.labels.push(None);
        Label::new(id)
    }

    fn bind_label(&mut self, label: Label) {
        debug_assert!(
            self.labels[label.id() as usize].is_none(),
            "label bound twice"
        );
        let pos = self.position();
        self.labels[label.id() as usize] = Some(pos);
    }

    fn supports_boxed_word_bitwise(&self) -> bool {
        self.boxed_word_bitwise
    }

    fn branch_if_not_int32(&mut self, src: Reg, target: Label) {
        self.emit_branch(StubOp::BranchIfNotInt32 { src, target: 0 }, target);
    }

    fn unbox_int32(&mut self, src: Reg, dst: Reg) {
        self.emit(StubOp::UnboxInt32 { src, dst });
    }

    fn box_int32(&mut self, src: Reg, dst: Reg) {
        self.emit(StubOp::BoxInt32 { src, dst });
    }

    fn box_uint32_as_double(&mut self, src: Reg, dst: Reg) {
        self.emit(StubOp::BoxUint32AsDouble { src, dst });
    }

    fn add32_branch_overflow(&mut self, lhs: Reg, rhs: Reg, dst: Reg, overflow: Label) {
        self.emit_branch(StubOp::Add32Overflow { lhs, rhs, dst, target: 0 }, overflow);
    }

    fn sub32_branch_overflow(&mut self, lhs: Reg, rhs: Reg, dst: Reg, overflow: Label) {
        self.emit_branch(StubOp::Sub32Overflow { lhs, rhs, dst, target: 0 }, overflow);
    }

    fn mul32_branch_overflow(&mut self, lhs: Reg, rhs: Reg, dst: Reg, overflow: Label) {
        self.emit_branch(StubOp::Mul32Overflow { lhs, rhs, dst, target: 0 }, overflow);
    }

    fn divmod32_branch_overflow(&mut self, lhs: Reg, rhs: Reg, quot: Reg, rem: Reg, overflow: Label) {
        self.emit_branch(
            StubOp::DivMod32Overflow { lhs, rhs, quot, rem, target: 0 },
            overflow,
        );
    }

    fn or_boxed_words(&mut self, lhs: Reg, rhs: Reg, dst: Reg) {
        debug_assert!(self.boxed_word_bitwise);
        self.emit(StubOp::OrWords { lhs, rhs, dst });
    }

    fn and_boxed_words(&mut self, lhs: Reg, rhs: Reg, dst: Reg) {
        debug_assert!(self.boxed_word_bitwise);
        self.emit(StubOp::AndWords { lhs, rhs, dst });
    }

    fn or32(&mut self, lhs: Reg, rhs: Reg, dst: Reg) {
        self.emit(StubOp::Or32 { lhs, rhs, dst });
    }

    fn and32(&mut self, lhs: Reg, rhs: Reg, dst: Reg) {
        self.emit(StubOp::And32 { lhs, rhs, dst });
    }

    fn xor32(&mut self, lhs: Reg, rhs: Reg, dst: Reg) {
        self.emit(StubOp::Xor32 { lhs, rhs, dst });
    }

    fn lsh32_masked(&mut self, lhs: Reg, rhs: Reg, dst: Reg) {
        self.emit(StubOp::Lsh32Masked { lhs, rhs, dst });
    }

    fn rsh32_masked(&mut self, lhs: Reg, rhs: Reg, dst: Reg) {
        self.emit(StubOp::Rsh32Masked { lhs, rhs, dst });
    }

    fn ursh32_masked(&mut self, lhs: Reg, rhs: Reg, dst: Reg) {
        self.emit(StubOp::Ursh32Masked { lhs, rhs, dst });
    }

    fn branch_if_nonzero32(&mut self, src: Reg, target: Label) {
        self.emit_branch(StubOp::BranchIfNonZero32 { src, target: 0 }, target);
    }

    fn branch_if_negative32(&mut self, src: Reg, target: Label) {
        self.emit_branch(StubOp::BranchIfNegative32 { src, target: 0 }, target);
    }

    fn branch_if_signs_differ32(&mut self, lhs: Reg, rhs: Reg, target: Label) {
        self.emit_branch(StubOp::BranchIfSignsDiffer32 { lhs, rhs, target: 0 }, target);
    }

    fn ret(&mut self) {
        self.emit(StubOp::Ret);
    }

    fn bail(&mut self) {
        self.emit(StubOp::Bail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_branch_is_patched() {
        let mut asm = PortableAssembler::new();
        let skip = asm.create_label();
        asm.branch_if_nonzero32(Reg::Scratch0, skip);
        asm.box_int32(Reg::Scratch0, Reg::Lhs);
        asm.bind_label(skip);
        asm.ret();

        let ops = asm.finalize().unwrap();
        assert_eq!(
            ops[0],
            StubOp::BranchIfNonZero32 { src: Reg::Scratch0, target: 2 }
        );
        assert_eq!(ops[2], StubOp::Ret);
    }

    #[test]
    fn test_unbound_label_is_an_error() {
        let mut asm = PortableAssembler::new();
        let nowhere = asm.create_label();
        asm.branch_if_negative32(Reg::Scratch1, nowhere);
        asm.ret();

        assert_eq!(
            asm.finalize(),
            Err(CodegenError::UnboundLabel(Label::new(0)))
        );
    }

    #[test]
    fn test_missing_terminator_is_an_error() {
        let mut asm = PortableAssembler::new();
        asm.unbox_int32(Reg::Lhs, Reg::Scratch0);
        assert_eq!(asm.finalize(), Err(CodegenError::MissingTerminator));

        let empty = PortableAssembler::new();
        assert_eq!(empty.finalize(), Err(CodegenError::MissingTerminator));
    }

    #[test]
    fn test_label_bound_at_end_of_stream() {
        let mut asm = PortableAssembler::new();
        let failure = asm.create_label();
        asm.branch_if_not_int32(Reg::Lhs, failure);
        asm.ret();
        asm.bind_label(failure);
        asm.bail();

        let ops = asm.finalize().unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(
            ops[0],
            StubOp::BranchIfNotInt32 { src: Reg::Lhs, target: 2 }
        );
        assert_eq!(ops[2], StubOp::Bail);
    }

    #[test]
    fn test_capability_flag() {
        assert!(PortableAssembler::new().supports_boxed_word_bitwise());
        assert!(!PortableAssembler::with_boxed_word_bitwise(false).supports_boxed_word_bitwise());
    }

    #[test]
    fn test_position_tracks_ops() {
        let mut asm = PortableAssembler::new();
        assert_eq!(asm.position(), 0);
        asm.or32(Reg::Scratch0, Reg::Scratch1, Reg::Scratch2);
        assert_eq!(asm.position(), 1);
        asm.ret();
        assert_eq!(asm.position(), 2);
    }
}
