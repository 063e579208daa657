//! Generated arithmetic stubs and their executor.
//!
//! A [`GeneratedStub`] is the finalized artifact of one stub compilation: an
//! immutable operation stream with exactly one success return and one
//! bail-out exit. Execution interprets the stream over a small register file
//! seeded with the two boxed operands; it allocates nothing, touches no
//! shared state, and is a pure function of its inputs, so one stub can run on
//! any number of threads concurrently.

use garnet_core::Value;

use crate::ic::BinaryArithOp;
use crate::masm::portable::StubOp;
use crate::masm::Reg;

/// Bit-level helpers for the canonical int32 box, shared by the executor and
/// generated guards (matching the NaN-boxing in `garnet_core`).
pub(crate) mod value_bits {
    use garnet_core::value::{INT32_PAYLOAD_MASK, INT32_TAG_PATTERN};

    /// Tag check value for int32 boxes (upper 16 bits of the boxed word).
    pub(crate) const INT32_TAG_CHECK: u16 = (INT32_TAG_PATTERN >> 48) as u16;

    /// Box a zero-extended int32 payload into a canonical int32 word.
    #[inline]
    pub(crate) const fn box_int32(payload: u32) -> u64 {
        INT32_TAG_PATTERN | payload as u64
    }

    /// Extract the low 32-bit payload of a boxed word.
    #[inline]
    pub(crate) const fn unbox_int32(bits: u64) -> u64 {
        bits & INT32_PAYLOAD_MASK
    }
}

// =============================================================================
// Execution Outcome
// =============================================================================

/// The result of executing a stub against two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubOutcome {
    /// The fast path held; the boxed result is exactly what the general
    /// evaluator would have produced.
    Done(Value),
    /// A guard or edge-case check failed; the caller's fallback path owns the
    /// operation. Operands are untouched.
    Bailout,
}

// =============================================================================
// Generated Stub
// =============================================================================

/// A compiled arithmetic stub.
///
/// Immutable once built: the owning cache publishes it behind an `Arc` and
/// never patches it in place.
#[derive(Debug)]
pub struct GeneratedStub {
    ops: Box<[StubOp]>,
    op: BinaryArithOp,
    allow_double: bool,
}

impl GeneratedStub {
    pub(crate) fn new(ops: Box<[StubOp]>, op: BinaryArithOp, allow_double: bool) -> Self {
        GeneratedStub { ops, op, allow_double }
    }

    /// The operator this stub was compiled for.
    #[inline]
    #[must_use]
    pub fn op(&self) -> BinaryArithOp {
        self.op
    }

    /// Whether this stub may materialize a double result (Ursh only).
    #[inline]
    #[must_use]
    pub fn allow_double(&self) -> bool {
        self.allow_double
    }

    /// Number of operations in the stub body.
    #[must_use]
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// The raw operation stream, for structural assertions.
    #[cfg(test)]
    pub(crate) fn ops(&self) -> &[StubOp] {
        &self.ops
    }

    /// Execute the stub against two boxed operands.
    ///
    /// The register file is local to this call and the operation stream is
    /// straight-line with forward branches only, so execution is bounded and
    /// pure.
    #[must_use]
    pub fn execute(&self, lhs: Value, rhs: Value) -> StubOutcome {
        let mut regs = [0u64; Reg::COUNT];
        regs[Reg::Lhs.index()] = lhs.raw_bits();
        regs[Reg::Rhs.index()] = rhs.raw_bits();

        let mut pc = 0usize;
        loop {
            let op = self.ops[pc];
            pc += 1;
            match op {
                StubOp::BranchIfNotInt32 { src, target } => {
                    if (regs[src.index()] >> 48) as u16 != value_bits::INT32_TAG_CHECK {
                        pc = target as usize;
                    }
                }
                StubOp::UnboxInt32 { src, dst } => {
                    regs[dst.index()] = value_bits::unbox_int32(regs[src.index()]);
                }
                StubOp::BoxInt32 { src, dst } => {
                    regs[dst.index()] = value_bits::box_int32(regs[src.index()] as u32);
                }
                StubOp::BoxUint32AsDouble { src, dst } => {
                    let u = regs[src.index()] as u32;
                    regs[dst.index()] = Value::double(f64::from(u)).raw_bits();
                }
                StubOp::Add32Overflow { lhs, rhs, dst, target } => {
                    match read32(&regs, lhs).checked_add(read32(&regs, rhs)) {
                        Some(sum) => write32(&mut regs, dst, sum),
                        None => pc = target as usize,
                    }
                }
                StubOp::Sub32Overflow { lhs, rhs, dst, target } => {
                    match read32(&regs, lhs).checked_sub(read32(&regs, rhs)) {
                        Some(diff) => write32(&mut regs, dst, diff),
                        None => pc = target as usize,
                    }
                }
                StubOp::Mul32Overflow { lhs, rhs, dst, target } => {
                    match read32(&regs, lhs).checked_mul(read32(&regs, rhs)) {
                        Some(prod) => write32(&mut regs, dst, prod),
                        None => pc = target as usize,
                    }
                }
                StubOp::DivMod32Overflow { lhs, rhs, quot, rem, target } => {
                    let a = read32(&regs, lhs);
                    let b = read32(&regs, rhs);
                    if b == 0 || (a == i32::MIN && b == -1) {
                        pc = target as usize;
                    } else {
                        write32(&mut regs, quot, a / b);
                        write32(&mut regs, rem, a % b);
                    }
                }
                StubOp::OrWords { lhs, rhs, dst } => {
                    regs[dst.index()] = regs[lhs.index()] | regs[rhs.index()];
                }
                StubOp::AndWords { lhs, rhs, dst } => {
                    regs[dst.index()] = regs[lhs.index()] & regs[rhs.index()];
                }
                StubOp::Or32 { lhs, rhs, dst } => {
                    let v = read32(&regs, lhs) | read32(&regs, rhs);
                    write32(&mut regs, dst, v);
                }
                StubOp::And32 { lhs, rhs, dst } => {
                    let v = read32(&regs, lhs) & read32(&regs, rhs);
                    write32(&mut regs, dst, v);
                }
                StubOp::Xor32 { lhs, rhs, dst } => {
                    let v = read32(&regs, lhs) ^ read32(&regs, rhs);
                    write32(&mut regs, dst, v);
                }
                StubOp::Lsh32Masked { lhs, rhs, dst } => {
                    let shift = regs[rhs.index()] as u32 & 0x1f;
                    let v = read32(&regs, lhs) << shift;
                    write32(&mut regs, dst, v);
                }
                StubOp::Rsh32Masked { lhs, rhs, dst } => {
                    let shift = regs[rhs.index()] as u32 & 0x1f;
                    let v = read32(&regs, lhs) >> shift;
                    write32(&mut regs, dst, v);
                }
                StubOp::Ursh32Masked { lhs, rhs, dst } => {
                    let shift = regs[rhs.index()] as u32 & 0x1f;
                    let v = (read32(&regs, lhs) as u32) >> shift;
                    write32(&mut regs, dst, v as i32);
                }
                StubOp::BranchIfNonZero32 { src, target } => {
                    if read32(&regs, src) != 0 {
                        pc = target as usize;
                    }
                }
                StubOp::BranchIfNegative32 { src, target } => {
                    if read32(&regs, src) < 0 {
                        pc = target as usize;
                    }
                }
                StubOp::BranchIfSignsDiffer32 { lhs, rhs, target } => {
                    if (read32(&regs, lhs) ^ read32(&regs, rhs)) < 0 {
                        pc = target as usize;
                    }
                }
                StubOp::Ret => return StubOutcome::Done(Value::from_bits(regs[Reg::Lhs.index()])),
                StubOp::Bail => return StubOutcome::Bailout,
            }
        }
    }
}

/// Read a register slot as a signed 32-bit payload.
#[inline]
fn read32(regs: &[u64; Reg::COUNT], r: Reg) -> i32 {
    regs[r.index()] as u32 as i32
}

/// Write a signed 32-bit payload into a register slot, zero-extended.
#[inline]
fn write32(regs: &mut [u64; Reg::COUNT], r: Reg, v: i32) {
    regs[r.index()] = v as u32 as u64;
}
