//! Packed four-state bit vectors: the payload of constant operations.

use crate::logic::{decode, Logic};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed-width vector of [`Logic`] values, bit 0 being the LSB.
///
/// Serialized as a binary string, most significant bit first, so a 4-bit
/// constant `0b0101` appears as `"0101"` in circuit documents. A zero-width
/// vector serializes as the empty string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicVec {
    width: u32,
    /// Two bits per value, 32 values per word.
    data: Vec<u64>,
}

const VALUES_PER_WORD: u32 = 32;

impl LogicVec {
    /// Creates an all-zero vector of the given width.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            data: vec![0; width.div_ceil(VALUES_PER_WORD) as usize],
        }
    }

    /// Returns the number of bits.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Gets bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> Logic {
        assert!(
            index < self.width,
            "bit {index} out of range for width {}",
            self.width
        );
        let word = self.data[(index / VALUES_PER_WORD) as usize];
        decode(word >> ((index % VALUES_PER_WORD) * 2))
    }

    /// Sets bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: Logic) {
        assert!(
            index < self.width,
            "bit {index} out of range for width {}",
            self.width
        );
        let word = &mut self.data[(index / VALUES_PER_WORD) as usize];
        let shift = (index % VALUES_PER_WORD) * 2;
        *word = (*word & !(0b11u64 << shift)) | ((value as u64) << shift);
    }

    /// All bits zero.
    pub fn all_zero(width: u32) -> Self {
        Self::new(width)
    }

    /// All bits one.
    pub fn all_one(width: u32) -> Self {
        Self::filled(width, Logic::One)
    }

    /// All bits unknown.
    pub fn all_x(width: u32) -> Self {
        Self::filled(width, Logic::X)
    }

    fn filled(width: u32, value: Logic) -> Self {
        let mut v = Self::new(width);
        for i in 0..width {
            v.set(i, value);
        }
        v
    }

    /// Builds a vector from the low `width` bits of `value`.
    ///
    /// Bits above 64 are zero.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::new(width);
        for i in 0..width.min(64) {
            if (value >> i) & 1 != 0 {
                v.set(i, Logic::One);
            }
        }
        v
    }

    /// Builds a vector from a two's complement value, sign-filling above 64.
    pub fn from_i64(value: i64, width: u32) -> Self {
        let mut v = Self::from_u64(value as u64, width);
        if value < 0 {
            for i in 64..width {
                v.set(i, Logic::One);
            }
        }
        v
    }

    /// Returns the unsigned value if every bit is known and the width fits.
    pub fn to_u64(&self) -> Option<u64> {
        let mut result = 0u64;
        for i in 0..self.width {
            match self.get(i) {
                Logic::Zero => {}
                Logic::One if i < 64 => result |= 1 << i,
                _ => return None,
            }
        }
        Some(result)
    }

    /// Returns `true` if every bit is `Zero`.
    pub fn is_all_zero(&self) -> bool {
        (0..self.width).all(|i| self.get(i) == Logic::Zero)
    }

    /// Returns `true` if every bit is `One`.
    pub fn is_all_one(&self) -> bool {
        (0..self.width).all(|i| self.get(i) == Logic::One)
    }

    /// Returns `true` if every bit is `X` (and the vector is not empty).
    pub fn is_all_x(&self) -> bool {
        self.width > 0 && (0..self.width).all(|i| self.get(i) == Logic::X)
    }

    /// Copies the value into a vector of `width` bits, truncating or
    /// extending. Extension repeats the top bit when `signed`.
    pub fn resize(&self, width: u32, signed: bool) -> Self {
        let fill = if signed && self.width > 0 {
            self.get(self.width - 1)
        } else {
            Logic::Zero
        };
        let mut v = Self::new(width);
        for i in 0..width {
            v.set(i, if i < self.width { self.get(i) } else { fill });
        }
        v
    }

    /// Parses a binary string, most significant bit first.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let mut v = Self::new(s.chars().count() as u32);
        for (i, c) in s.chars().rev().enumerate() {
            v.set(i as u32, Logic::from_char(c)?);
        }
        Some(v)
    }

    /// Renders the value as a sized Verilog literal, e.g. `4'b0101`.
    pub fn to_verilog(&self) -> String {
        format!("{}'b{self}", self.width)
    }
}

impl fmt::Display for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", self.get(i))?;
        }
        Ok(())
    }
}

impl fmt::Debug for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicVec({})", self.to_verilog())
    }
}

impl From<LogicVec> for String {
    fn from(v: LogicVec) -> Self {
        v.to_string()
    }
}

impl TryFrom<String> for LogicVec {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        LogicVec::from_binary_str(&s).ok_or_else(|| format!("invalid bit string '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_u64_and_back() {
        let v = LogicVec::from_u64(0b1010, 4);
        assert_eq!(v.to_string(), "1010");
        assert_eq!(v.to_u64(), Some(10));
    }

    #[test]
    fn wide_values_keep_high_zero_bits() {
        let v = LogicVec::from_u64(0x8000_0002, 96);
        assert_eq!(v.width(), 96);
        assert_eq!(v.to_u64(), Some(0x8000_0002));
    }

    #[test]
    fn negative_values_sign_fill() {
        let v = LogicVec::from_i64(-1, 70);
        assert!(v.is_all_one());
        assert_eq!(v.to_u64(), None);
    }

    #[test]
    fn x_constant() {
        let v = LogicVec::all_x(3);
        assert!(v.is_all_x());
        assert_eq!(v.to_verilog(), "3'bxxx");
        assert!(!LogicVec::all_x(0).is_all_x());
    }

    #[test]
    fn resize_follows_signedness() {
        let v = LogicVec::from_binary_str("1111").unwrap();
        assert_eq!(v.resize(8, true).to_string(), "11111111");
        assert_eq!(v.resize(8, false).to_string(), "00001111");
        assert_eq!(v.resize(2, true).to_string(), "11");
    }

    #[test]
    fn serializes_as_bit_string() {
        let v = LogicVec::from_u64(5, 4);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"0101\"");
        let back: LogicVec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
        assert!(serde_json::from_str::<LogicVec>("\"01a\"").is_err());
    }

    #[test]
    fn zero_width_is_empty_string() {
        let v: LogicVec = serde_json::from_str("\"\"").unwrap();
        assert_eq!(v.width(), 0);
        assert!(v.is_all_zero());
    }
}
