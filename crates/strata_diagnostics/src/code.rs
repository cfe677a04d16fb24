//! Stable diagnostic codes.
//!
//! Codes are `E` plus three digits. The hundreds digit names the pass that
//! reports the problem: `E1xx` for type lowering, `E2xx` for structural
//! lowering. In JSON a code is its display string.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The pass a diagnostic code belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Pass {
    /// Aggregate type lowering (`E1xx`).
    TypeLowering,
    /// Structural lowering (`E2xx`).
    StructuralLowering,
}

impl Pass {
    /// Human-readable pass name, as shown in rendered diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Pass::TypeLowering => "type lowering",
            Pass::StructuralLowering => "structural lowering",
        }
    }
}

/// A code such as `E205`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DiagnosticCode(u16);

impl DiagnosticCode {
    /// The code `E<number>`.
    pub const fn new(number: u16) -> Self {
        Self(number)
    }

    /// The numeric part of the code.
    pub fn number(self) -> u16 {
        self.0
    }

    /// The pass owning this code, if its hundreds digit names one.
    pub fn pass(self) -> Option<Pass> {
        match self.0 / 100 {
            1 => Some(Pass::TypeLowering),
            2 => Some(Pass::StructuralLowering),
            _ => None,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:03}", self.0)
    }
}

impl From<DiagnosticCode> for String {
    fn from(code: DiagnosticCode) -> Self {
        code.to_string()
    }
}

impl TryFrom<String> for DiagnosticCode {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.strip_prefix('E')
            .filter(|digits| digits.len() == 3)
            .and_then(|digits| digits.parse().ok())
            .map(DiagnosticCode)
            .ok_or_else(|| format!("invalid diagnostic code '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pads_to_three_digits() {
        assert_eq!(DiagnosticCode::new(205).to_string(), "E205");
        assert_eq!(DiagnosticCode::new(7).to_string(), "E007");
    }

    #[test]
    fn pass_from_hundreds_digit() {
        assert_eq!(DiagnosticCode::new(104).pass(), Some(Pass::TypeLowering));
        assert_eq!(DiagnosticCode::new(210).pass(), Some(Pass::StructuralLowering));
        assert_eq!(DiagnosticCode::new(3).pass(), None);
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&DiagnosticCode::new(101)).unwrap();
        assert_eq!(json, r#""E101""#);
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DiagnosticCode::new(101));
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(serde_json::from_str::<DiagnosticCode>(r#""W101""#).is_err());
        assert!(serde_json::from_str::<DiagnosticCode>(r#""E1""#).is_err());
    }
}
