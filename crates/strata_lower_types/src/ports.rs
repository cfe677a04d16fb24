//! Flattening of module signatures.
//!
//! Module ports and instance results go through the same function so an
//! instance keeps lining up with the ports of the module it instantiates.

use crate::peel::peel;
use crate::tree::Tree;
use strata_common::Interner;
use strata_config::PreserveAggregate;
use strata_ir::annotations::filter_for_field;
use strata_ir::{Annotation, Direction, FType};

/// One port of a flattened signature.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FlatPort {
    /// Original name plus suffixes.
    pub name: String,
    /// Direction after applying the flips on the way down.
    pub direction: Direction,
    /// Leaf type.
    pub ty: FType,
    /// Annotations that apply to this leaf.
    pub annotations: Vec<Annotation>,
    /// Dotted source name, `io.a.b`.
    pub dotted: String,
}

/// Flattens one port of type `ty` under `mode`.
///
/// New ports are appended to `out`; the returned tree maps the original
/// port onto their positions.
pub fn flatten_port(
    name: &str,
    direction: Direction,
    ty: &FType,
    annotations: &[Annotation],
    mode: PreserveAggregate,
    interner: &Interner,
    out: &mut Vec<FlatPort>,
) -> Tree<usize> {
    flatten_rec(
        name.to_string(),
        name.to_string(),
        direction,
        ty,
        annotations.to_vec(),
        mode,
        interner,
        out,
    )
}

#[allow(clippy::too_many_arguments)]
fn flatten_rec(
    name: String,
    dotted: String,
    direction: Direction,
    ty: &FType,
    annotations: Vec<Annotation>,
    mode: PreserveAggregate,
    interner: &Interner,
    out: &mut Vec<FlatPort>,
) -> Tree<usize> {
    let Some(fields) = peel(ty, mode, interner) else {
        out.push(FlatPort {
            name,
            direction,
            ty: ty.clone(),
            annotations,
            dotted,
        });
        return Tree::Leaf(out.len() - 1);
    };
    let children = fields
        .into_iter()
        .map(|f| {
            let annos = filter_for_field(&annotations, f.field_id, f.ty.max_field_id());
            flatten_rec(
                format!("{name}{}", f.suffix),
                format!("{dotted}.{}", f.label()),
                direction.flip_if(f.flip),
                &f.ty,
                annos,
                mode,
                interner,
                out,
            )
        })
        .collect();
    Tree::Fields(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ir::BundleField;

    #[test]
    fn flattens_with_flips_and_annotations() {
        let i = Interner::new();
        let ty = FType::Bundle(vec![
            BundleField::new(i.get_or_intern("valid"), FType::uint(1)),
            BundleField::flipped(i.get_or_intern("ready"), FType::uint(1)),
            BundleField::new(i.get_or_intern("bits"), FType::vector(FType::uint(8), 2)),
        ]);
        let annos = vec![Annotation::dont_touch(), Annotation::new("pin").on_field(4)];
        let mut out = Vec::new();
        let shape = flatten_port(
            "io",
            Direction::Out,
            &ty,
            &annos,
            PreserveAggregate::None,
            &i,
            &mut out,
        );
        let names: Vec<&str> = out.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["io_valid", "io_ready", "io_bits_0", "io_bits_1"]);
        assert_eq!(out[1].direction, Direction::In);
        assert_eq!(out[3].dotted, "io.bits.1");
        // Field 4 is `bits[0]`.
        assert_eq!(out[2].annotations.len(), 2);
        assert_eq!(out[3].annotations, vec![Annotation::dont_touch()]);
        assert_eq!(
            shape,
            Tree::Fields(vec![
                Tree::Leaf(0),
                Tree::Leaf(1),
                Tree::Fields(vec![Tree::Leaf(2), Tree::Leaf(3)]),
            ])
        );
    }

    #[test]
    fn preserved_port_stays_whole() {
        let i = Interner::new();
        let ty = FType::vector(FType::uint(8), 4);
        let mut out = Vec::new();
        let shape = flatten_port(
            "v",
            Direction::In,
            &ty,
            &[],
            PreserveAggregate::OneDimVec,
            &i,
            &mut out,
        );
        assert_eq!(shape, Tree::Leaf(0));
        assert_eq!(out[0].ty, ty);
        assert_eq!(out[0].dotted, "v");
    }
}
