//! Lossless transport for 64-bit integers.
//!
//! The dynamic side's numbers are doubles and stop being exact above 2^53.
//! [`WideInt`] carries a sign and a full 64-bit magnitude, which covers both
//! `i64` and `u64` exactly, and converts to and from [`BigInt`] for callers
//! that hold arbitrary-precision integers.

use std::fmt;

use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;

/// Largest integer a double represents exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Sign-magnitude 64-bit integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WideInt {
    negative: bool,
    magnitude: u64,
}

impl WideInt {
    pub const ZERO: WideInt = WideInt {
        negative: false,
        magnitude: 0,
    };

    /// Build from sign and magnitude. Negative zero is normalized.
    pub fn new(negative: bool, magnitude: u64) -> Self {
        Self {
            negative: negative && magnitude != 0,
            magnitude,
        }
    }

    /// Build from the split representation used by the `Int64` value binding.
    pub fn from_parts(lo: u32, hi: u32, negative: bool) -> Self {
        Self::new(negative, (u64::from(hi) << 32) | u64::from(lo))
    }

    pub fn from_i64(value: i64) -> Self {
        Self::new(value < 0, value.unsigned_abs())
    }

    pub fn from_u64(value: u64) -> Self {
        Self::new(false, value)
    }

    /// Convert an integral double. Returns `None` for fractions, NaN, or values
    /// beyond the 64-bit magnitude.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value.fract() != 0.0 {
            return None;
        }
        let magnitude = value.abs();
        // 2^64 is the first double that does not fit
        if magnitude >= 18_446_744_073_709_551_616.0 {
            return None;
        }
        Some(Self::new(value < 0.0, magnitude as u64))
    }

    /// Convert a big integer; `None` when the magnitude exceeds 64 bits.
    pub fn from_bigint(value: &BigInt) -> Option<Self> {
        let magnitude = value.magnitude().to_u64()?;
        Some(Self::new(value.sign() == Sign::Minus, magnitude))
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn magnitude(&self) -> u64 {
        self.magnitude
    }

    /// Low 32 bits of the magnitude.
    pub fn lo(&self) -> u32 {
        (self.magnitude & 0xffff_ffff) as u32
    }

    /// High 32 bits of the magnitude.
    pub fn hi(&self) -> u32 {
        (self.magnitude >> 32) as u32
    }

    pub fn to_i64(&self) -> Option<i64> {
        if self.negative {
            if self.magnitude <= i64::MAX as u64 + 1 {
                Some((self.magnitude as i64).wrapping_neg())
            } else {
                None
            }
        } else {
            i64::try_from(self.magnitude).ok()
        }
    }

    pub fn to_u64(&self) -> Option<u64> {
        if self.negative { None } else { Some(self.magnitude) }
    }

    pub fn to_bigint(&self) -> BigInt {
        let sign = if self.negative { Sign::Minus } else { Sign::Plus };
        BigInt::from_biguint(sign, self.magnitude.into())
    }

    /// Nearest double; exact within the safe-integer range.
    pub fn to_f64(&self) -> f64 {
        let magnitude = self.magnitude as f64;
        if self.negative { -magnitude } else { magnitude }
    }

    /// Whether a double represents this value exactly and unambiguously.
    pub fn is_safe(&self) -> bool {
        self.magnitude <= MAX_SAFE_INTEGER
    }
}

impl fmt::Display for WideInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "{}", self.magnitude)
        }
    }
}

impl From<i64> for WideInt {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl From<u64> for WideInt {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn powers_of_two_round_trip_with_sign() {
        let mut n: i64 = 2;
        for _ in 1..63 {
            let pos = WideInt::from_i64(n);
            let neg = WideInt::from_i64(-n);
            assert_eq!(pos.to_i64(), Some(n));
            assert_eq!(neg.to_i64(), Some(-n));
            assert_eq!(WideInt::from_bigint(&neg.to_bigint()), Some(neg));
            assert_eq!(neg.to_string(), format!("-{}", n));
            n = n.wrapping_mul(2);
        }
    }

    #[test]
    fn extremes() {
        assert_eq!(WideInt::from_i64(i64::MIN).to_i64(), Some(i64::MIN));
        assert_eq!(WideInt::from_i64(i64::MIN).to_string(), "-9223372036854775808");
        assert_eq!(WideInt::from_u64(u64::MAX).to_u64(), Some(u64::MAX));
        assert_eq!(WideInt::from_u64(u64::MAX).to_i64(), None);
        assert_eq!(WideInt::from_u64(u64::MAX).to_string(), "18446744073709551615");
    }

    #[test]
    fn split_parts() {
        let w = WideInt::from_u64(0x0000_0001_0000_0002);
        assert_eq!((w.lo(), w.hi()), (2, 1));
        assert_eq!(WideInt::from_parts(w.lo(), w.hi(), true).to_i64(), Some(-0x1_0000_0002));
    }

    #[test]
    fn negative_zero_normalizes() {
        assert_eq!(WideInt::new(true, 0), WideInt::ZERO);
        assert!(!WideInt::from_parts(0, 0, true).is_negative());
    }

    #[test]
    fn from_f64_rejects_fractions_and_overflow() {
        assert_eq!(WideInt::from_f64(42.0), Some(WideInt::from_i64(42)));
        assert_eq!(WideInt::from_f64(-42.0), Some(WideInt::from_i64(-42)));
        assert_eq!(WideInt::from_f64(0.5), None);
        assert_eq!(WideInt::from_f64(f64::NAN), None);
        assert_eq!(WideInt::from_f64(1e20), None);
    }

    #[test]
    fn bigint_beyond_64_bits_is_rejected() {
        let big = BigInt::from(u64::MAX) * 4;
        assert_eq!(WideInt::from_bigint(&big), None);
    }

    #[test]
    fn safe_range() {
        assert!(WideInt::from_u64(MAX_SAFE_INTEGER).is_safe());
        assert!(!WideInt::from_u64(MAX_SAFE_INTEGER + 1).is_safe());
    }
}
