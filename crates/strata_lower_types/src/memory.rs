//! Splitting memories with aggregate data.
//!
//! A memory whose word is a vector becomes one memory per ground leaf of the
//! word. Users keep seeing the original port bundles: each port is re-created
//! as a wire `<mem>_<port>`, and the wires are hooked up to the ports of every
//! split memory.

use crate::errors;
use crate::lower::{type_at, LowerResult, ModuleLowering, Naming};
use crate::peel::{flatten, FlatLeaf};
use crate::tree::Tree;
use log::trace;
use strata_common::InternalError;
use strata_config::PreserveAggregate;
use strata_ir::{
    Annotation, FType, MemDecl, MemPortDecl, MemPortKind, NameKind, OpAttrs, OpKind, Operation,
};

/// Port fields that carry one word or its mask.
const DATA_FIELDS: [&str; 5] = ["data", "mask", "rdata", "wdata", "wmask"];

/// Rebases annotations on an old port of type `old_port` onto the port of
/// type `new_port` of the memory holding `leaf`.
///
/// Annotations on a whole field stay on that field; annotations inside a
/// data or mask field survive only on the leaf they point into.
pub(crate) fn remap_port_annotations(
    annos: &[Annotation],
    old_port: &FType,
    new_port: &FType,
    leaf: &FlatLeaf,
) -> Vec<Annotation> {
    let mut out = Vec::new();
    for anno in annos {
        let Some(target) = anno.target_field.filter(|&t| t != 0) else {
            out.push(anno.clone());
            continue;
        };
        let Some((index, rest)) = old_port.index_for_field_id(target) else {
            continue;
        };
        let base = new_port.field_id(index);
        let target = if rest == 0 {
            base
        } else if rest >= leaf.field_id && rest <= leaf.field_id + leaf.ty.max_field_id() {
            base + rest - leaf.field_id
        } else {
            continue;
        };
        out.push(Annotation {
            target_field: Some(target),
            ..anno.clone()
        });
    }
    out
}

impl<'a> ModuleLowering<'a> {
    pub(crate) fn lower_mem(&mut self, op: &'a Operation, decl: &'a MemDecl) -> LowerResult<()> {
        if decl.data_type.is_ground() {
            return self.clone_op(op);
        }
        let interner = self.interner();
        let name = self.name_of(op).unwrap_or_default();
        if decl.data_type.contains_bundle() {
            return Err(self.report(errors::error_bundle_memory(name, op.loc)));
        }
        if let Some(port) = decl.ports.iter().find(|p| p.kind == MemPortKind::Debug) {
            let diag = errors::error_debug_port(name, interner.resolve(port.name), op.loc);
            return Err(self.report(diag));
        }
        let leaves = flatten(&decl.data_type, PreserveAggregate::None, interner);
        trace!("splitting memory {name} into {} memories", leaves.len());

        let old_types: Vec<FType> = op.results.iter().map(|&r| self.old.value_type(r).clone()).collect();
        let mut wires = Vec::with_capacity(old_types.len());
        for (port, ty) in decl.ports.iter().zip(&old_types) {
            let naming = Naming {
                name: Some(format!("{name}_{}", interner.resolve(port.name))),
                debug: None,
                kind: NameKind::Droppable,
            };
            wires.push(self.build_tree(ty, &naming, Vec::new(), &mut Vec::new(), &mut |this, ty, _, attrs| {
                Ok(Tree::Leaf(this.builder().typed_with(OpKind::Wire, vec![], ty.clone(), attrs)))
            })?);
        }

        let mut split = Vec::with_capacity(leaves.len());
        for leaf in &leaves {
            let mut new_decl = MemDecl {
                depth: decl.depth,
                read_latency: decl.read_latency,
                write_latency: decl.write_latency,
                ruw: decl.ruw,
                data_type: leaf.ty.clone(),
                ports: Vec::with_capacity(decl.ports.len()),
            };
            for port in &decl.ports {
                new_decl.ports.push(MemPortDecl {
                    name: port.name,
                    kind: port.kind,
                    annotations: Vec::new(),
                });
            }
            let types: Vec<FType> = (0..decl.ports.len())
                .map(|i| new_decl.port_type(i, interner))
                .collect();
            for (i, port) in decl.ports.iter().enumerate() {
                new_decl.ports[i].annotations =
                    remap_port_annotations(&port.annotations, &old_types[i], &types[i], leaf);
            }
            let attrs = OpAttrs {
                name: Some(interner.get_or_intern(&format!("{name}{}", leaf.suffix))),
                name_kind: op.attrs.name_kind,
                annotations: op.attrs.annotations.clone(),
                sym: op
                    .attrs
                    .sym
                    .map(|s| interner.suffixed(s, &leaf.suffix)),
                debug_name: None,
            };
            let new_op = self.builder().push(OpKind::Mem(new_decl), vec![], types, attrs);
            split.push(self.new.ops[new_op].results.clone());
        }

        for (i, ty) in old_types.iter().enumerate() {
            let FType::Bundle(fields) = ty else {
                return Err(InternalError::new(format!("memory port {i} is not a bundle")).into());
            };
            for (fi, field) in fields.iter().enumerate() {
                let old_field = self.sub(&wires[i], fi)?;
                let is_data = DATA_FIELDS.contains(&interner.resolve(field.name));
                for (leaf, results) in leaves.iter().zip(&split) {
                    let new_field = self.builder().subfield(results[i], fi as u32)?;
                    let old_value = if is_data {
                        let node = self.sub_path(&old_field, &leaf.path)?;
                        let node_ty = type_at(&field.ty, &leaf.path).ok_or_else(|| {
                            InternalError::new(format!("no leaf at {:?} of a memory word", leaf.path))
                        })?;
                        self.materialize(&node, &node_ty)?
                    } else {
                        self.materialize(&old_field, &field.ty)?
                    };
                    let mut b = self.builder();
                    if field.flip {
                        b.connect(old_value, new_field);
                    } else {
                        b.connect(new_field, old_value);
                    }
                }
            }
        }
        for (&result, wire) in op.results.iter().zip(wires) {
            self.set(result, wire)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::Interner;
    use strata_ir::ReadUnderWrite;

    fn decl(data: FType) -> MemDecl {
        MemDecl {
            depth: 4,
            read_latency: 0,
            write_latency: 1,
            ruw: ReadUnderWrite::Undefined,
            data_type: data,
            ports: Vec::new(),
        }
    }

    #[test]
    fn remaps_data_annotations_to_their_leaf() {
        let i = Interner::new();
        let data = FType::vector(FType::uint(8), 2);
        let mut old = decl(data.clone());
        old.ports.push(MemPortDecl {
            name: i.get_or_intern("r"),
            kind: MemPortKind::Read,
            annotations: Vec::new(),
        });
        let old_port = old.port_type(0, &i);
        let leaves = flatten(&data, PreserveAggregate::None, &i);
        let mut new = old.clone();
        new.data_type = leaves[1].ty.clone();
        let new_port = new.port_type(0, &i);

        // Field 4 is `data`; 6 is `data[1]`.
        let data_id = old_port.field_id(3);
        let annos = vec![
            Annotation::dont_touch(),
            Annotation::new("whole").on_field(data_id),
            Annotation::new("elem0").on_field(data_id + 1),
            Annotation::new("elem1").on_field(data_id + 2),
        ];
        let out = remap_port_annotations(&annos, &old_port, &new_port, &leaves[1]);
        let classes: Vec<&str> = out.iter().map(|a| a.class.as_str()).collect();
        assert_eq!(classes, vec![strata_ir::annotations::DONT_TOUCH_CLASS, "whole", "elem1"]);
        assert_eq!(out[1].target_field, Some(new_port.field_id(3)));
        assert_eq!(out[2].target_field, Some(new_port.field_id(3)));
    }
}
