//! Structural types.
//!
//! Every value of the structural form is a fixed-width integer, a packed
//! array, a packed struct, or a net (`InOut`) holding one of those.

use serde::{Deserialize, Serialize};
use strata_common::{Ident, Interner};

/// One field of a [`HwType::Struct`].
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct HwField {
    /// Field name.
    pub name: Ident,
    /// Field type.
    pub ty: HwType,
}

/// A structural type.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HwType {
    /// A `w`-bit integer. Signedness lives in the operations.
    Int(u32),
    /// A packed array; element 0 holds the least significant bits.
    Array(Box<HwType>, u32),
    /// A packed struct; the first field holds the most significant bits.
    Struct(Vec<HwField>),
    /// A net or variable holding a value of the inner type.
    #[serde(rename = "inout")]
    InOut(Box<HwType>),
}

impl HwType {
    /// An `n`-element array of `elem`.
    pub fn array(elem: HwType, len: u32) -> Self {
        HwType::Array(Box::new(elem), len)
    }

    /// A net holding `inner`.
    pub fn inout(inner: HwType) -> Self {
        HwType::InOut(Box::new(inner))
    }

    /// Returns `true` for net types.
    pub fn is_inout(&self) -> bool {
        matches!(self, HwType::InOut(_))
    }

    /// The value type held by a net, or the type itself.
    pub fn element(&self) -> &HwType {
        match self {
            HwType::InOut(inner) => inner,
            other => other,
        }
    }

    /// The width of an integer type.
    pub fn int_width(&self) -> Option<u32> {
        match self {
            HwType::Int(w) => Some(*w),
            _ => None,
        }
    }

    /// Total number of bits, saturating at `u32::MAX`.
    pub fn bit_width(&self) -> u32 {
        match self {
            HwType::Int(w) => *w,
            HwType::Array(elem, n) => elem.bit_width().saturating_mul(*n),
            HwType::Struct(fields) => fields
                .iter()
                .fold(0u32, |acc, f| acc.saturating_add(f.ty.bit_width())),
            HwType::InOut(inner) => inner.bit_width(),
        }
    }

    /// Array element type and length.
    pub fn as_array(&self) -> Option<(&HwType, u32)> {
        match self {
            HwType::Array(elem, n) => Some((elem, *n)),
            _ => None,
        }
    }

    /// Struct field `index`.
    pub fn struct_field(&self, index: usize) -> Option<&HwField> {
        match self {
            HwType::Struct(fields) => fields.get(index),
            _ => None,
        }
    }

    /// Renders the type for dumps, e.g. `i2[4]` or `struct{a: i1}`.
    pub fn display(&self, interner: &Interner) -> String {
        match self {
            HwType::Int(w) => format!("i{w}"),
            HwType::Array(elem, n) => format!("{}[{n}]", elem.display(interner)),
            HwType::Struct(fields) => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}: {}", interner.resolve(f.name), f.ty.display(interner)))
                    .collect();
                format!("struct{{{}}}", fields.join(", "))
            }
            HwType::InOut(inner) => format!("inout {}", inner.display(interner)),
        }
    }
}
