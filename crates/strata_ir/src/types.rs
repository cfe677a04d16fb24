//! Types of the high-level circuit IR and the bit-width oracle.
//!
//! Field IDs number every node of an aggregate type in pre-order: the whole
//! value is 0, a bundle's first field is 1, and each child owns the
//! contiguous range `[field_id(i), field_id(i) + max_field_id(child)]`.

use serde::{Deserialize, Serialize};
use strata_common::{Ident, Interner};

/// A type of the high-level circuit IR.
///
/// Widths are `None` when they have not been inferred yet.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FType {
    /// Unsigned integer.
    UInt(Option<u32>),
    /// Two's-complement signed integer.
    SInt(Option<u32>),
    /// Clock signal.
    Clock,
    /// Reset whose style has not been inferred.
    Reset,
    /// Asynchronous reset.
    AsyncReset,
    /// Bidirectional analog net.
    Analog(Option<u32>),
    /// Named, ordered fields, each of which may be flipped.
    Bundle(Vec<BundleField>),
    /// Fixed-length homogeneous array.
    Vector(Box<FType>, u32),
    /// A probe of a hardware value.
    Ref(Box<FType>),
}

/// One field of a [`FType::Bundle`].
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct BundleField {
    /// Field name.
    pub name: Ident,
    /// Whether the field flows against the bundle.
    #[serde(default)]
    pub flip: bool,
    /// Field type.
    pub ty: FType,
}

impl BundleField {
    /// Creates a non-flipped field.
    pub fn new(name: Ident, ty: FType) -> Self {
        Self { name, flip: false, ty }
    }

    /// Creates a flipped field.
    pub fn flipped(name: Ident, ty: FType) -> Self {
        Self { name, flip: true, ty }
    }
}

impl FType {
    /// Shorthand for a known-width `UInt`.
    pub fn uint(width: u32) -> Self {
        FType::UInt(Some(width))
    }

    /// Shorthand for a known-width `SInt`.
    pub fn sint(width: u32) -> Self {
        FType::SInt(Some(width))
    }

    /// Shorthand for a vector.
    pub fn vector(elem: FType, len: u32) -> Self {
        FType::Vector(Box::new(elem), len)
    }

    /// Returns `true` for types that are not bundles, vectors or references.
    pub fn is_ground(&self) -> bool {
        !matches!(self, FType::Bundle(_) | FType::Vector(..) | FType::Ref(_))
    }

    /// Returns `true` for `UInt` and `SInt`.
    pub fn is_integer(&self) -> bool {
        matches!(self, FType::UInt(_) | FType::SInt(_))
    }

    /// Returns `true` for `SInt`.
    pub fn is_signed(&self) -> bool {
        matches!(self, FType::SInt(_))
    }

    /// Returns `true` for `Ref`.
    pub fn is_ref(&self) -> bool {
        matches!(self, FType::Ref(_))
    }

    /// The width of a ground type, `None` for aggregates and unknown widths.
    pub fn ground_width(&self) -> Option<u32> {
        match self {
            FType::UInt(w) | FType::SInt(w) | FType::Analog(w) => *w,
            FType::Clock | FType::Reset | FType::AsyncReset => Some(1),
            FType::Bundle(_) | FType::Vector(..) | FType::Ref(_) => None,
        }
    }

    /// Total width of all leaves.
    ///
    /// `None` if any leaf width is unknown or the total does not fit a `u32`.
    pub fn bit_width(&self) -> Option<u32> {
        u32::try_from(self.wide_bit_width()?).ok()
    }

    fn wide_bit_width(&self) -> Option<u64> {
        match self {
            FType::Bundle(fields) => fields
                .iter()
                .try_fold(0u64, |acc, f| Some(acc.saturating_add(f.ty.wide_bit_width()?))),
            FType::Vector(elem, n) => Some(elem.wide_bit_width()?.saturating_mul(u64::from(*n))),
            FType::Ref(inner) => inner.wide_bit_width(),
            ground => ground.ground_width().map(u64::from),
        }
    }

    /// Returns `true` if the leaf count, the field IDs and any known total
    /// width of the type all fit a `u32`.
    ///
    /// The accessors below saturate instead of overflowing, so their results
    /// are only exact for types that pass this check.
    pub fn fits_u32(&self) -> bool {
        let limit = u64::from(u32::MAX);
        self.wide_leaf_count() <= limit
            && self.wide_max_field_id() <= limit
            && self.wide_bit_width().map_or(true, |w| w <= limit)
    }

    /// Returns `true` if any part of the type carries no bits.
    ///
    /// Empty aggregates, zero-width leaves and leaves of unknown width all
    /// count. This is the test that forbids preserving an aggregate.
    pub fn has_zero_bit_width(&self) -> bool {
        match self {
            FType::Bundle(fields) => {
                fields.is_empty() || fields.iter().any(|f| f.ty.has_zero_bit_width())
            }
            FType::Vector(elem, n) => *n == 0 || elem.has_zero_bit_width(),
            FType::Ref(inner) => inner.has_zero_bit_width(),
            ground => ground.ground_width().unwrap_or(0) == 0,
        }
    }

    /// Returns `true` if no field anywhere in the type is flipped.
    pub fn is_passive(&self) -> bool {
        match self {
            FType::Bundle(fields) => fields.iter().all(|f| !f.flip && f.ty.is_passive()),
            FType::Vector(elem, _) => elem.is_passive(),
            FType::Ref(inner) => inner.is_passive(),
            _ => true,
        }
    }

    /// The same type with every flip removed.
    pub fn passive(&self) -> FType {
        match self {
            FType::Bundle(fields) => FType::Bundle(
                fields
                    .iter()
                    .map(|f| BundleField::new(f.name, f.ty.passive()))
                    .collect(),
            ),
            FType::Vector(elem, n) => FType::Vector(Box::new(elem.passive()), *n),
            FType::Ref(inner) => FType::Ref(Box::new(inner.passive())),
            ground => ground.clone(),
        }
    }

    /// Returns `true` if any leaf is `Analog`.
    pub fn contains_analog(&self) -> bool {
        match self {
            FType::Analog(_) => true,
            FType::Bundle(fields) => fields.iter().any(|f| f.ty.contains_analog()),
            FType::Vector(elem, _) | FType::Ref(elem) => elem.contains_analog(),
            _ => false,
        }
    }

    /// Returns `true` if the type is or contains a bundle.
    pub fn contains_bundle(&self) -> bool {
        match self {
            FType::Bundle(_) => true,
            FType::Vector(elem, _) | FType::Ref(elem) => elem.contains_bundle(),
            _ => false,
        }
    }

    /// Returns `true` for ground types and vectors of more than one ground
    /// element.
    pub fn is_one_dim_vector(&self) -> bool {
        match self {
            FType::Bundle(_) => false,
            FType::Vector(elem, n) => elem.is_ground() && *n > 1,
            FType::Ref(inner) => inner.is_one_dim_vector(),
            _ => true,
        }
    }

    /// Number of ground leaves.
    pub fn leaf_count(&self) -> u32 {
        saturate(self.wide_leaf_count())
    }

    fn wide_leaf_count(&self) -> u64 {
        match self {
            FType::Bundle(fields) => fields
                .iter()
                .fold(0u64, |acc, f| acc.saturating_add(f.ty.wide_leaf_count())),
            FType::Vector(elem, n) => elem.wide_leaf_count().saturating_mul(u64::from(*n)),
            FType::Ref(inner) => inner.wide_leaf_count(),
            _ => 1,
        }
    }

    /// The write-mask type: the same shape with every leaf a `UInt<1>`.
    pub fn mask_type(&self) -> FType {
        match self {
            FType::Bundle(fields) => FType::Bundle(
                fields
                    .iter()
                    .map(|f| BundleField::new(f.name, f.ty.mask_type()))
                    .collect(),
            ),
            FType::Vector(elem, n) => FType::Vector(Box::new(elem.mask_type()), *n),
            _ => FType::uint(1),
        }
    }

    /// Deepest aggregate nesting; ground types are depth 0.
    pub fn depth(&self) -> u32 {
        match self {
            FType::Bundle(fields) => 1 + fields.iter().map(|f| f.ty.depth()).max().unwrap_or(0),
            FType::Vector(elem, _) => 1 + elem.depth(),
            FType::Ref(inner) => inner.depth(),
            _ => 0,
        }
    }

    /// The largest field ID inside this type.
    pub fn max_field_id(&self) -> u32 {
        saturate(self.wide_max_field_id())
    }

    fn wide_max_field_id(&self) -> u64 {
        match self {
            FType::Bundle(fields) => fields
                .iter()
                .map(|f| f.ty.wide_max_field_id().saturating_add(1))
                .fold(0u64, u64::saturating_add),
            FType::Vector(elem, n) => {
                u64::from(*n).saturating_mul(elem.wide_max_field_id().saturating_add(1))
            }
            FType::Ref(inner) => inner.wide_max_field_id(),
            _ => 0,
        }
    }

    /// Field ID of bundle field or vector element `index`.
    ///
    /// Ground types have no children and return 0.
    pub fn field_id(&self, index: usize) -> u32 {
        match self {
            FType::Bundle(fields) => saturate(
                fields[..index.min(fields.len())]
                    .iter()
                    .map(|f| f.ty.wide_max_field_id().saturating_add(1))
                    .fold(1u64, u64::saturating_add),
            ),
            FType::Vector(elem, _) => saturate(
                (index as u64)
                    .saturating_mul(elem.wide_max_field_id().saturating_add(1))
                    .saturating_add(1),
            ),
            FType::Ref(inner) => inner.field_id(index),
            _ => 0,
        }
    }

    /// The child that owns `field_id` and the ID relative to that child.
    ///
    /// Returns `None` for field ID 0, for ground types, and for IDs past
    /// [`max_field_id`](Self::max_field_id).
    pub fn index_for_field_id(&self, field_id: u32) -> Option<(usize, u32)> {
        if field_id == 0 || field_id > self.max_field_id() {
            return None;
        }
        match self {
            FType::Bundle(fields) => {
                let mut base = 1u32;
                for (i, f) in fields.iter().enumerate() {
                    let span = f.ty.max_field_id().saturating_add(1);
                    if field_id < base.saturating_add(span) {
                        return Some((i, field_id - base));
                    }
                    base = base.saturating_add(span);
                }
                None
            }
            FType::Vector(elem, _) => {
                let stride = elem.max_field_id().saturating_add(1);
                let index = (field_id - 1) / stride;
                Some((index as usize, field_id - 1 - index * stride))
            }
            FType::Ref(inner) => inner.index_for_field_id(field_id),
            _ => None,
        }
    }

    /// The type of the node named by `field_id`.
    pub fn sub_type_by_field_id(&self, field_id: u32) -> Option<&FType> {
        if field_id == 0 {
            return Some(self);
        }
        let (index, rest) = self.index_for_field_id(field_id)?;
        self.child(index)?.sub_type_by_field_id(rest)
    }

    /// The type of bundle field or vector element `index`.
    pub fn child(&self, index: usize) -> Option<&FType> {
        match self {
            FType::Bundle(fields) => fields.get(index).map(|f| &f.ty),
            FType::Vector(elem, n) if (index as u32) < *n => Some(elem),
            FType::Ref(inner) => inner.child(index),
            _ => None,
        }
    }

    /// Index of the bundle field called `name`.
    pub fn field_index(&self, name: Ident) -> Option<usize> {
        match self {
            FType::Bundle(fields) => fields.iter().position(|f| f.name == name),
            FType::Ref(inner) => inner.field_index(name),
            _ => None,
        }
    }

    /// Renders the type in the usual textual syntax.
    pub fn display(&self, interner: &Interner) -> String {
        fn width(w: &Option<u32>) -> String {
            w.map(|w| format!("<{w}>")).unwrap_or_default()
        }
        match self {
            FType::UInt(w) => format!("UInt{}", width(w)),
            FType::SInt(w) => format!("SInt{}", width(w)),
            FType::Clock => "Clock".to_string(),
            FType::Reset => "Reset".to_string(),
            FType::AsyncReset => "AsyncReset".to_string(),
            FType::Analog(w) => format!("Analog{}", width(w)),
            FType::Bundle(fields) => {
                let inner: Vec<String> = fields
                    .iter()
                    .map(|f| {
                        format!(
                            "{}{}: {}",
                            if f.flip { "flip " } else { "" },
                            interner.resolve(f.name),
                            f.ty.display(interner)
                        )
                    })
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            FType::Vector(elem, n) => format!("{}[{n}]", elem.display(interner)),
            FType::Ref(inner) => format!("Probe<{}>", inner.display(interner)),
        }
    }
}

fn saturate(wide: u64) -> u32 {
    u32::try_from(wide).unwrap_or(u32::MAX)
}

/// Returns the wider of two integer types, keeping `a` on a tie.
pub fn widest<'a>(a: &'a FType, b: &'a FType) -> &'a FType {
    if b.ground_width().unwrap_or(0) > a.ground_width().unwrap_or(0) {
        b
    } else {
        a
    }
}

/// `ceil(log2(n))`, with 0 for `n <= 1`.
pub fn ceil_log2(n: u64) -> u32 {
    if n <= 1 {
        0
    } else {
        64 - (n - 1).leading_zeros()
    }
}

/// Width of an index into a vector of `len` elements; never below 1.
pub fn index_width(len: u64) -> u32 {
    ceil_log2(len).max(1)
}
