//! The field-peeling engine.
//!
//! [`peel`] removes one layer of aggregate structure from a type and
//! describes each child; [`flatten`] applies it recursively down to the
//! leaves a value of that type decomposes into.

use strata_common::Interner;
use strata_config::{LoweringOptions, PreserveAggregate};
use strata_ir::{FType, Module};

/// One child of a peeled aggregate.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FlatField {
    /// Type of the child. Children of a reference are references.
    pub ty: FType,
    /// Position of the child in its parent.
    pub index: usize,
    /// Field ID of the child relative to the parent.
    pub field_id: u32,
    /// Name suffix: `_<field>` for bundles, `_<index>` for vectors.
    pub suffix: String,
    /// Whether the child flows against its parent.
    pub flip: bool,
}

impl FlatField {
    /// The suffix without its leading underscore.
    pub fn label(&self) -> &str {
        self.suffix.strip_prefix('_').unwrap_or(&self.suffix)
    }
}

/// A leaf reached by peeling repeatedly.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FlatLeaf {
    /// Type of the leaf.
    pub ty: FType,
    /// Child indices from the root down to the leaf.
    pub path: Vec<usize>,
    /// Field ID of the leaf relative to the root.
    pub field_id: u32,
    /// Concatenated suffixes, empty for the root itself.
    pub suffix: String,
    /// Accumulated flip from the root.
    pub flip: bool,
}

/// Returns `true` if `mode` keeps values of type `ty` whole.
///
/// Non-passive types, types holding analog values and types with a
/// zero-width part are never kept whole.
pub fn is_preservable(ty: &FType, mode: PreserveAggregate) -> bool {
    if mode == PreserveAggregate::None {
        return false;
    }
    let base = match ty {
        FType::Ref(inner) => inner.as_ref(),
        other => other,
    };
    if !base.is_passive() || base.contains_analog() || base.has_zero_bit_width() {
        return false;
    }
    match mode {
        PreserveAggregate::None => false,
        PreserveAggregate::OneDimVec => base.is_one_dim_vector(),
        PreserveAggregate::Vec => !base.contains_bundle(),
        PreserveAggregate::All => true,
    }
}

/// Peels one layer off `ty`.
///
/// Returns `None` for ground types and for aggregates `mode` preserves.
/// Empty bundles and vectors peel into no children.
pub fn peel(ty: &FType, mode: PreserveAggregate, interner: &Interner) -> Option<Vec<FlatField>> {
    if is_preservable(ty, mode) {
        return None;
    }
    let (base, is_ref) = match ty {
        FType::Ref(inner) => (inner.as_ref(), true),
        other => (other, false),
    };
    let wrap = |t: &FType| {
        if is_ref {
            FType::Ref(Box::new(t.clone()))
        } else {
            t.clone()
        }
    };
    match base {
        FType::Bundle(fields) => Some(
            fields
                .iter()
                .enumerate()
                .map(|(index, f)| FlatField {
                    ty: wrap(&f.ty),
                    index,
                    field_id: base.field_id(index),
                    suffix: format!("_{}", interner.resolve(f.name)),
                    flip: f.flip,
                })
                .collect(),
        ),
        FType::Vector(elem, len) => Some(
            (0..*len as usize)
                .map(|index| FlatField {
                    ty: wrap(elem),
                    index,
                    field_id: base.field_id(index),
                    suffix: format!("_{index}"),
                    flip: false,
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Every leaf of `ty` under `mode`, in declaration order.
///
/// A type that does not peel is its own single leaf.
pub fn flatten(ty: &FType, mode: PreserveAggregate, interner: &Interner) -> Vec<FlatLeaf> {
    let mut out = Vec::new();
    let root = FlatLeaf {
        ty: ty.clone(),
        path: Vec::new(),
        field_id: 0,
        suffix: String::new(),
        flip: false,
    };
    flatten_into(root, mode, interner, &mut out);
    out
}

fn flatten_into(node: FlatLeaf, mode: PreserveAggregate, interner: &Interner, out: &mut Vec<FlatLeaf>) {
    let Some(fields) = peel(&node.ty, mode, interner) else {
        out.push(node);
        return;
    };
    for f in fields {
        let mut path = node.path.clone();
        path.push(f.index);
        let child = FlatLeaf {
            path,
            field_id: node.field_id + f.field_id,
            suffix: format!("{}{}", node.suffix, f.suffix),
            flip: node.flip ^ f.flip,
            ty: f.ty,
        };
        flatten_into(child, mode, interner, out);
    }
}

/// The preservation mode used for the ports of `module`.
///
/// External modules always decompose fully; so do public modules when
/// `preserve_public_types` is set.
pub fn module_mode(module: &Module, options: &LoweringOptions) -> PreserveAggregate {
    if module.is_external() {
        return PreserveAggregate::None;
    }
    if options.preserve_aggregate != PreserveAggregate::None
        && options.preserve_public_types
        && module.is_public()
    {
        return PreserveAggregate::None;
    }
    options.preserve_aggregate
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ir::{BundleField, Visibility};

    fn bundle(i: &Interner) -> FType {
        FType::Bundle(vec![
            BundleField::new(i.get_or_intern("a"), FType::uint(2)),
            BundleField::flipped(i.get_or_intern("b"), FType::vector(FType::uint(3), 2)),
        ])
    }

    #[test]
    fn peels_bundle_fields() {
        let i = Interner::new();
        let fields = peel(&bundle(&i), PreserveAggregate::None, &i).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].suffix, "_a");
        assert_eq!(fields[0].field_id, 1);
        assert!(!fields[0].flip);
        assert_eq!(fields[1].suffix, "_b");
        assert_eq!(fields[1].field_id, 2);
        assert!(fields[1].flip);
        assert_eq!(fields[1].label(), "b");
    }

    #[test]
    fn peels_vector_elements() {
        let i = Interner::new();
        let ty = FType::vector(FType::uint(3), 3);
        let fields = peel(&ty, PreserveAggregate::None, &i).unwrap();
        let suffixes: Vec<&str> = fields.iter().map(|f| f.suffix.as_str()).collect();
        assert_eq!(suffixes, vec!["_0", "_1", "_2"]);
        assert!(fields.iter().all(|f| !f.flip && f.ty == FType::uint(3)));
    }

    #[test]
    fn ground_and_empty_types() {
        let i = Interner::new();
        assert_eq!(peel(&FType::uint(4), PreserveAggregate::None, &i), None);
        assert_eq!(
            peel(&FType::vector(FType::uint(4), 0), PreserveAggregate::All, &i),
            Some(vec![])
        );
        assert_eq!(peel(&FType::Bundle(vec![]), PreserveAggregate::None, &i), Some(vec![]));
    }

    #[test]
    fn references_peel_into_references() {
        let i = Interner::new();
        let ty = FType::Ref(Box::new(FType::vector(FType::uint(3), 2)));
        let fields = peel(&ty, PreserveAggregate::None, &i).unwrap();
        assert_eq!(fields[1].ty, FType::Ref(Box::new(FType::uint(3))));
    }

    #[test]
    fn preservation_modes() {
        let i = Interner::new();
        let vec1 = FType::vector(FType::uint(3), 4);
        let vec2 = FType::vector(vec1.clone(), 2);
        let passive = FType::Bundle(vec![BundleField::new(i.get_or_intern("a"), vec1.clone())]);
        assert!(is_preservable(&vec1, PreserveAggregate::OneDimVec));
        assert!(!is_preservable(&vec2, PreserveAggregate::OneDimVec));
        assert!(is_preservable(&vec2, PreserveAggregate::Vec));
        assert!(!is_preservable(&passive, PreserveAggregate::Vec));
        assert!(is_preservable(&passive, PreserveAggregate::All));
        // Flips, zero widths and analog force decomposition.
        assert!(!is_preservable(&bundle(&i), PreserveAggregate::All));
        assert!(!is_preservable(&FType::vector(FType::uint(0), 2), PreserveAggregate::All));
        assert!(!is_preservable(&FType::vector(FType::Analog(Some(1)), 2), PreserveAggregate::All));
        assert!(!is_preservable(&vec1, PreserveAggregate::None));
    }

    #[test]
    fn flatten_tracks_paths_ids_and_flips() {
        let i = Interner::new();
        let leaves = flatten(&bundle(&i), PreserveAggregate::None, &i);
        let suffixes: Vec<&str> = leaves.iter().map(|l| l.suffix.as_str()).collect();
        assert_eq!(suffixes, vec!["_a", "_b_0", "_b_1"]);
        assert_eq!(leaves[2].path, vec![1, 1]);
        assert!(leaves[2].flip);
        let ids: Vec<u32> = leaves.iter().map(|l| l.field_id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn leaf_field_ids_increase_and_name_their_paths() {
        let i = Interner::new();
        let inner = FType::Bundle(vec![
            BundleField::new(i.get_or_intern("x"), FType::uint(1)),
            BundleField::new(i.get_or_intern("y"), FType::vector(FType::sint(2), 3)),
        ]);
        let ty = FType::Bundle(vec![
            BundleField::new(i.get_or_intern("p"), FType::vector(inner, 2)),
            BundleField::flipped(i.get_or_intern("q"), FType::Clock),
        ]);
        let leaves = flatten(&ty, PreserveAggregate::None, &i);
        assert_eq!(leaves.len() as u32, ty.leaf_count());
        for pair in leaves.windows(2) {
            assert!(pair[0].field_id < pair[1].field_id);
        }
        for leaf in &leaves {
            assert_eq!(ty.sub_type_by_field_id(leaf.field_id), Some(&leaf.ty));
        }
    }

    #[test]
    fn public_modules_keep_flat_signatures() {
        let i = Interner::new();
        let mut module = Module::new(i.get_or_intern("M"), vec![]);
        let options = LoweringOptions {
            preserve_aggregate: PreserveAggregate::Vec,
            ..LoweringOptions::default()
        };
        assert_eq!(module_mode(&module, &options), PreserveAggregate::None);
        module.visibility = Visibility::Private;
        assert_eq!(module_mode(&module, &options), PreserveAggregate::Vec);
        let external = Module::external(i.get_or_intern("E"), vec![]);
        assert_eq!(module_mode(&external, &options), PreserveAggregate::None);
    }
}
