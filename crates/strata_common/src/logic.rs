//! Four-state bit values used in constant payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single four-state bit.
///
/// Lowered constants are usually two-state; `X` appears in the cached
/// "don't care" constant and `Z` is accepted for completeness when parsing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Logic {
    /// Logic low.
    Zero = 0,
    /// Logic high.
    One = 1,
    /// Unknown.
    X = 2,
    /// High impedance.
    Z = 3,
}

impl Logic {
    /// Converts a character to a [`Logic`] value.
    ///
    /// Accepts '0', '1', 'x'/'X', and 'z'/'Z'.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Logic::Zero),
            '1' => Some(Logic::One),
            'x' | 'X' => Some(Logic::X),
            'z' | 'Z' => Some(Logic::Z),
            _ => None,
        }
    }

    /// Returns the lowercase Verilog digit for this value.
    pub fn to_char(self) -> char {
        match self {
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::X => 'x',
            Logic::Z => 'z',
        }
    }

    /// Returns `true` for `Zero` and `One`.
    pub fn is_known(self) -> bool {
        matches!(self, Logic::Zero | Logic::One)
    }

    fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            0 => Logic::Zero,
            1 => Logic::One,
            2 => Logic::X,
            _ => Logic::Z,
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

pub(crate) fn decode(bits: u64) -> Logic {
    Logic::from_bits(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_roundtrip() {
        for c in ['0', '1', 'x', 'z'] {
            assert_eq!(Logic::from_char(c).unwrap().to_char(), c);
        }
        assert_eq!(Logic::from_char('X'), Some(Logic::X));
        assert_eq!(Logic::from_char('2'), None);
    }

    #[test]
    fn known_values() {
        assert!(Logic::One.is_known());
        assert!(!Logic::X.is_known());
        assert!(!Logic::Z.is_known());
    }

    #[test]
    fn decode_masks_high_bits() {
        assert_eq!(decode(0b101), Logic::One);
        assert_eq!(decode(0b10), Logic::X);
    }
}
