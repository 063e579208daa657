//! Garnet value representation using NaN-boxing.
//!
//! Every Garnet value fits in a single 64-bit word. Doubles are stored in
//! their native IEEE 754 encoding; everything else hides inside the unused
//! quiet-NaN bit patterns.
//!
//! ## NaN-Boxing Scheme
//!
//! IEEE 754 double-precision NaN: sign(1) + exponent(11, all 1s) + mantissa(52, non-zero)
//!
//! We use the following encoding:
//! - Doubles: standard IEEE 754 encoding (unboxed)
//! - Tagged values: exponent=0x7FF (NaN), bit 51=1 (quiet NaN), bits 48-50=tag, bits 0-47=payload
//!
//! | Tag  | Type      | Payload                              |
//! |------|-----------|--------------------------------------|
//! | 0x0  | Undefined | unused                               |
//! | 0x1  | Null      | unused                               |
//! | 0x2  | Bool      | 0=false, 1=true                      |
//! | 0x3  | Int32     | 32-bit signed integer, zero-extended |
//! | 0x4+ | Reserved  | future use                           |
//!
//! An `Int32` payload occupies bits 0-31 with bits 32-47 always clear; this
//! canonical form is what makes bit-equality and the JIT's boxed-word tricks
//! sound. A double whose own bits would fall inside the tagged range (only
//! possible for NaNs) is rewritten to a canonical non-colliding NaN on
//! construction, so the tagged range is unambiguous.

use std::fmt;

/// Quiet NaN bit pattern: exponent all 1s + quiet NaN bit (bit 51).
/// NOTE: We use 0x7FF8 NOT 0x7FFC to leave bits 48-50 free for tag encoding.
const QNAN: u64 = 0x7FF8_0000_0000_0000;

/// Tag bits position (bits 48-50).
const TAG_SHIFT: u64 = 48;
const TAG_MASK: u64 = 0x0007_0000_0000_0000;

/// Payload mask (bits 0-47).
const PAYLOAD_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

/// Tag values
const TAG_UNDEFINED: u64 = 0;
const TAG_NULL: u64 = 1;
const TAG_BOOL: u64 = 2;
const TAG_INT32: u64 = 3;

// =============================================================================
// Public Tag Patterns (for branchless speculation)
// =============================================================================

/// Combined QNAN + TAG pattern for int32 values.
/// Use with `value.raw_bits() & TYPE_TAG_MASK == INT32_TAG_PATTERN`, or
/// compare the top 16 bits directly: `(value.raw_bits() >> 48) ==
/// (INT32_TAG_PATTERN >> 48)`. Generated code guards on exactly this.
pub const INT32_TAG_PATTERN: u64 = QNAN | (TAG_INT32 << TAG_SHIFT);

/// Mask for extracting the type tag portion (QNAN + tag bits).
pub const TYPE_TAG_MASK: u64 = QNAN | TAG_MASK;

/// Payload mask for the low 32 bits of a canonical int32 box.
pub const INT32_PAYLOAD_MASK: u64 = 0x0000_0000_FFFF_FFFF;

/// A Garnet value using NaN-boxing for efficient storage.
///
/// This type is exactly 8 bytes and can represent:
/// - Double-precision numbers (unboxed)
/// - Undefined and null
/// - Booleans
/// - 32-bit signed integers (the engine's integer fast path)
///
/// Equality is *bit* equality of the boxed word. Because int32 boxes are
/// canonical, two values compare equal exactly when the engine considers them
/// the same specialized value; in particular `Int32(0)`, `Double(0.0)` and
/// `Double(-0.0)` are three distinct words. Language-level `==` lives in the
/// runtime, not here.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Value {
    bits: u64,
}

impl Value {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// The undefined value.
    #[inline]
    #[must_use]
    pub const fn undefined() -> Self {
        Self {
            bits: QNAN | (TAG_UNDEFINED << TAG_SHIFT),
        }
    }

    /// The null value.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self {
            bits: QNAN | (TAG_NULL << TAG_SHIFT),
        }
    }

    /// Create a boolean value.
    #[inline]
    #[must_use]
    pub const fn boolean(b: bool) -> Self {
        Self {
            bits: QNAN | (TAG_BOOL << TAG_SHIFT) | b as u64,
        }
    }

    /// Create a canonical int32 box.
    ///
    /// The payload is the integer zero-extended into bits 0-31; bits 32-47
    /// are clear. Every `i32` is representable, so this is total.
    #[inline]
    #[must_use]
    pub const fn int32(i: i32) -> Self {
        Self {
            bits: INT32_TAG_PATTERN | i as u32 as u64,
        }
    }

    /// Create a double value.
    #[inline]
    #[must_use]
    pub fn double(f: f64) -> Self {
        let bits = f.to_bits();
        // Check if it's a NaN that would collide with our tagged values.
        // Any NaN where (bits & QNAN) == QNAN would be misidentified as tagged.
        if bits & QNAN == QNAN {
            // Use a safe NaN representation: exponent all 1s, mantissa = 1,
            // quiet/tag bits clear (valid NaN, but doesn't collide).
            Self {
                bits: 0x7FF0_0000_0000_0001,
            }
        } else {
            Self { bits }
        }
    }

    /// Create the canonical box for a numeric result.
    ///
    /// An integral double in int32 range becomes the canonical int32 box;
    /// everything else (fractions, out-of-range magnitudes, NaN, infinities,
    /// and negative zero, whose sign an integer cannot carry) stays a double.
    /// The general evaluator produces all of its results through this
    /// constructor, so specialized code can be checked against it
    /// bit-for-bit.
    #[inline]
    #[must_use]
    pub fn number(f: f64) -> Self {
        let in_range = f >= i32::MIN as f64 && f <= i32::MAX as f64;
        if f.trunc() == f && in_range && !(f == 0.0 && f.is_sign_negative()) {
            Self::int32(f as i32)
        } else {
            Self::double(f)
        }
    }

    // =========================================================================
    // Type Checking
    // =========================================================================

    /// Check if this is a tagged value (not a double).
    #[inline]
    #[must_use]
    pub const fn is_tagged(&self) -> bool {
        (self.bits & QNAN) == QNAN
    }

    /// Check if this is a double.
    #[inline]
    #[must_use]
    pub const fn is_double(&self) -> bool {
        (self.bits & QNAN) != QNAN
    }

    /// Check if this is undefined.
    #[inline]
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        self.is_tagged() && self.tag() == TAG_UNDEFINED
    }

    /// Check if this is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.is_tagged() && self.tag() == TAG_NULL
    }

    /// Check if this is a boolean.
    #[inline]
    #[must_use]
    pub const fn is_boolean(&self) -> bool {
        self.is_tagged() && self.tag() == TAG_BOOL
    }

    /// Check if this is an int32 box.
    #[inline]
    #[must_use]
    pub const fn is_int32(&self) -> bool {
        self.is_tagged() && self.tag() == TAG_INT32
    }

    /// Check if this is any numeric value (int32 box or double).
    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        self.is_double() || self.is_int32()
    }

    /// Get the tag (for tagged values).
    #[inline]
    const fn tag(&self) -> u64 {
        (self.bits & TAG_MASK) >> TAG_SHIFT
    }

    /// Get the payload (for tagged values).
    #[inline]
    const fn payload(&self) -> u64 {
        self.bits & PAYLOAD_MASK
    }

    // =========================================================================
    // Value Extraction
    // =========================================================================

    /// Try to extract as a boolean.
    #[inline]
    #[must_use]
    pub const fn as_boolean(&self) -> Option<bool> {
        if self.is_boolean() {
            Some(self.payload() != 0)
        } else {
            None
        }
    }

    /// Try to extract as an int32.
    #[inline]
    #[must_use]
    pub const fn as_int32(&self) -> Option<i32> {
        if self.is_int32() {
            Some(self.bits as u32 as i32)
        } else {
            None
        }
    }

    /// Try to extract as a double.
    #[inline]
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        if self.is_double() {
            Some(f64::from_bits(self.bits))
        } else {
            None
        }
    }

    /// Try to extract as a double, coercing int32 boxes.
    ///
    /// This is the numeric view the general evaluator works in. Returns
    /// `None` for non-numeric values.
    #[inline]
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        if let Some(f) = self.as_double() {
            Some(f)
        } else if let Some(i) = self.as_int32() {
            Some(f64::from(i))
        } else {
            None
        }
    }

    // =========================================================================
    // Raw Bits
    // =========================================================================

    /// Get raw bits (for speculation optimizations).
    ///
    /// Enables branchless type checking in generated code:
    /// ```ignore
    /// let is_int32 = (value.raw_bits() >> 48) == (INT32_TAG_PATTERN >> 48);
    /// ```
    #[inline(always)]
    #[must_use]
    pub const fn raw_bits(&self) -> u64 {
        self.bits
    }

    /// Create from raw bits.
    ///
    /// The bits must come from a `Value` (generated code hands boxed words
    /// around as `u64`); arbitrary bit patterns may violate the canonical
    /// int32 form this module guarantees.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self { bits }
    }

    /// Get the engine-level type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        if self.is_double() {
            "double"
        } else if self.is_undefined() {
            "undefined"
        } else if self.is_null() {
            "null"
        } else if self.is_boolean() {
            "boolean"
        } else if self.is_int32() {
            "int32"
        } else {
            "unknown"
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(i) = self.as_int32() {
            write!(f, "Int32({i})")
        } else if let Some(d) = self.as_double() {
            write!(f, "Double({d})")
        } else if let Some(b) = self.as_boolean() {
            write!(f, "Bool({b})")
        } else if self.is_null() {
            write!(f, "Null")
        } else if self.is_undefined() {
            write!(f, "Undefined")
        } else {
            write!(f, "Value(raw: {:#018x})", self.bits)
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::undefined()
    }
}
