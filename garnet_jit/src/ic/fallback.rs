//! General (slow-path) evaluation of binary arithmetic.
//!
//! This is the reference semantics a stub must agree with bit-for-bit
//! whenever it produces a result. Arithmetic evaluates in double precision
//! (the language's numbers are doubles; the int32 box is an engine internal)
//! and canonicalizes through [`Value::number`], so negative zero, overflow
//! past int32 range, and fractional quotients fall out of the arithmetic
//! itself. The bitwise family goes through the language's ToInt32/ToUint32
//! conversions.
//!
//! Deliberately no int32 fast paths here: the evaluator shares no edge-case
//! logic with the stub recipes it validates.

use garnet_core::Value;

use super::BinaryArithOp;

/// Evaluate `op` over two numeric values.
///
/// Returns `None` when either operand is not numeric; coercion of booleans,
/// strings, and objects belongs to the runtime's generic dispatch, not to
/// this layer.
#[must_use]
pub fn evaluate(op: BinaryArithOp, lhs: Value, rhs: Value) -> Option<Value> {
    let a = lhs.as_number()?;
    let b = rhs.as_number()?;
    Some(match op {
        BinaryArithOp::Add => Value::number(a + b),
        BinaryArithOp::Sub => Value::number(a - b),
        BinaryArithOp::Mul => Value::number(a * b),
        BinaryArithOp::Div => Value::number(a / b),
        // f64's % is the truncating remainder, sign following the dividend.
        BinaryArithOp::Mod => Value::number(a % b),
        BinaryArithOp::BitOr => Value::int32(to_int32(a) | to_int32(b)),
        BinaryArithOp::BitXor => Value::int32(to_int32(a) ^ to_int32(b)),
        BinaryArithOp::BitAnd => Value::int32(to_int32(a) & to_int32(b)),
        BinaryArithOp::Lsh => Value::int32(to_int32(a) << (to_uint32(b) & 0x1f)),
        BinaryArithOp::Rsh => Value::int32(to_int32(a) >> (to_uint32(b) & 0x1f)),
        BinaryArithOp::Ursh => Value::number(f64::from(to_uint32(a) >> (to_uint32(b) & 0x1f))),
    })
}

/// The language's ToInt32 conversion: truncate toward zero, wrap modulo 2^32,
/// reinterpret as signed. NaN and infinities map to 0.
fn to_int32(f: f64) -> i32 {
    const TWO_POW_32: f64 = 4_294_967_296.0;
    if !f.is_finite() {
        return 0;
    }
    let t = f.trunc();
    let m = t % TWO_POW_32;
    let wrapped = if m < 0.0 { m + TWO_POW_32 } else { m };
    wrapped as u32 as i32
}

/// The language's ToUint32 conversion (same wrap, unsigned view).
fn to_uint32(f: f64) -> u32 {
    to_int32(f) as u32
}
