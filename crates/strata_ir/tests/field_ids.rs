//! Field-ID numbering over nested aggregates.

use pretty_assertions::assert_eq;
use strata_common::Interner;
use strata_ir::{BundleField, FType};

/// Pre-order list of `(field_id, leaf_type)` for every leaf.
fn leaves(ty: &FType, base: u32, out: &mut Vec<(u32, FType)>) {
    let children = match ty {
        FType::Bundle(fields) => fields.len(),
        FType::Vector(_, n) => *n as usize,
        _ => {
            out.push((base, ty.clone()));
            return;
        }
    };
    for i in 0..children {
        let child = ty.child(i).unwrap();
        leaves(child, base + ty.field_id(i), out);
    }
}

fn sample(i: &Interner) -> FType {
    FType::Bundle(vec![
        BundleField::new(i.get_or_intern("valid"), FType::uint(1)),
        BundleField::flipped(i.get_or_intern("ready"), FType::uint(1)),
        BundleField::new(
            i.get_or_intern("bits"),
            FType::vector(
                FType::Bundle(vec![
                    BundleField::new(i.get_or_intern("data"), FType::uint(8)),
                    BundleField::new(i.get_or_intern("tag"), FType::sint(3)),
                ]),
                2,
            ),
        ),
    ])
}

#[test]
fn leaf_field_ids_strictly_increase() {
    let i = Interner::new();
    let ty = sample(&i);
    let mut out = Vec::new();
    leaves(&ty, 0, &mut out);
    let ids: Vec<u32> = out.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![1, 2, 5, 6, 8, 9]);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(*ids.last().unwrap(), ty.max_field_id());
}

#[test]
fn every_field_id_names_its_path() {
    let i = Interner::new();
    let ty = sample(&i);
    let mut out = Vec::new();
    leaves(&ty, 0, &mut out);
    for (id, leaf) in &out {
        assert_eq!(ty.sub_type_by_field_id(*id), Some(leaf));
    }
    // Interior nodes resolve to their aggregate.
    assert_eq!(ty.sub_type_by_field_id(3).map(|t| t.leaf_count()), Some(4));
    assert_eq!(ty.sub_type_by_field_id(4).map(|t| t.bit_width()), Some(Some(11)));
}

#[test]
fn leaf_widths_sum_to_total() {
    let i = Interner::new();
    let ty = sample(&i);
    let mut out = Vec::new();
    leaves(&ty, 0, &mut out);
    let sum: u32 = out.iter().map(|(_, t)| t.bit_width().unwrap()).sum();
    assert_eq!(Some(sum), ty.bit_width());
}
