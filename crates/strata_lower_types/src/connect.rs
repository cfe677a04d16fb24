//! Connects between decomposed values.
//!
//! A connect of aggregates becomes one connect per leaf, with source and
//! destination swapped under an odd number of flips. A connect whose
//! destination goes through a dynamic vector index is unrolled into one
//! guarded connect per element.

use crate::lower::{constant_index, LowerResult, ModuleLowering};
use crate::peel::{is_preservable, peel};
use crate::tree::{Lowered, Tree};
use strata_common::InternalError;
use strata_config::PreserveAggregate;
use strata_ir::types::index_width;
use strata_ir::{BinaryOp, Body, FType, OpId, OpKind, Operation, ValueId};

/// One step of a write path.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Access {
    /// A field or an in-range constant element.
    Static(usize),
    /// An element selected at run time.
    Dynamic(ValueId),
}

/// The path from the connect destination `dest` up to the value it writes
/// into, if it goes through a dynamic index.
///
/// Returns the written base and the accessor operations from the top-most
/// dynamic access down to `dest`. Static accesses above it belong to the
/// base.
pub(crate) fn dynamic_write_path(body: &Body, dest: ValueId) -> Option<(ValueId, Vec<(OpId, Access)>)> {
    let mut chain = Vec::new();
    let mut cur = dest;
    while let Some(id) = body.defining_op(cur) {
        let op = &body.ops[id];
        let access = match &op.kind {
            OpKind::Subfield(i) | OpKind::Subindex(i) => Access::Static(*i as usize),
            OpKind::Subaccess => {
                let len = match body.value_type(op.operands[0]) {
                    FType::Vector(_, len) => u64::from(*len),
                    _ => 0,
                };
                match constant_index(body, op.operands[1]) {
                    Some(c) if c < len => Access::Static(c as usize),
                    _ => Access::Dynamic(op.operands[1]),
                }
            }
            _ => break,
        };
        chain.push((id, access));
        cur = op.operands[0];
    }
    chain.reverse();
    let first = chain
        .iter()
        .position(|(_, a)| matches!(a, Access::Dynamic(_)))?;
    let base = body.ops[chain[first].0].operands[0];
    Some((base, chain.split_off(first)))
}

impl<'a> ModuleLowering<'a> {
    pub(crate) fn lower_connect(&mut self, op: &'a Operation) -> LowerResult<()> {
        let strict = op.kind == OpKind::StrictConnect;
        let (dest, src) = (op.operands[0], op.operands[1]);
        let old = self.old;
        let ty = old.value_type(dest);
        if ty.is_ref() && is_preservable(ty, self.mode()) {
            return self.clone_op(op);
        }
        if let Some((base, path)) = dynamic_write_path(old, dest) {
            let lowered = self.get(base)?;
            return self.write_through(&lowered, old.value_type(base), &path, src, strict);
        }
        let d = self.get(dest)?;
        let s = self.get(src)?;
        if ty.is_ground() {
            let d = self.materialize(&d, ty)?;
            let s = self.materialize(&s, ty)?;
            let mut attrs = op.attrs.clone();
            if self.ctx.options.insert_debug_info && attrs.debug_name.is_none() {
                attrs.debug_name = self.dest_name(dest);
            }
            let kind = if strict {
                OpKind::StrictConnect
            } else {
                OpKind::Connect
            };
            self.builder().push(kind, vec![d, s], vec![], attrs);
            return Ok(());
        }
        self.connect_fields(strict, &d, &s, ty, false)
    }

    /// Connects `src` to `dest` leaf by leaf.
    ///
    /// Two undecomposed values of the same type are connected whole.
    pub(crate) fn connect_fields(
        &mut self,
        strict: bool,
        dest: &Lowered,
        src: &Lowered,
        ty: &FType,
        flipped: bool,
    ) -> LowerResult<()> {
        let fields = match (dest, src) {
            (Tree::Leaf(_), Tree::Leaf(_)) => None,
            _ => peel(ty, PreserveAggregate::None, self.interner()),
        };
        let Some(fields) = fields else {
            let d = self.materialize(dest, ty)?;
            let s = self.materialize(src, ty)?;
            let (d, s) = if flipped { (s, d) } else { (d, s) };
            let mut b = self.builder();
            if strict {
                b.strict_connect(d, s);
            } else {
                b.connect(d, s);
            }
            return Ok(());
        };
        for f in fields {
            let d = self.sub(dest, f.index)?;
            let s = self.sub(src, f.index)?;
            self.connect_fields(strict, &d, &s, &f.ty, flipped ^ f.flip)?;
        }
        Ok(())
    }

    /// Writes old value `src` into the node `path` leads to from `base`.
    ///
    /// Each dynamic step becomes one `when` per element comparing the index
    /// against the element's position.
    pub(crate) fn write_through(
        &mut self,
        base: &Lowered,
        ty: &FType,
        path: &[(OpId, Access)],
        src: ValueId,
        strict: bool,
    ) -> LowerResult<()> {
        let Some(((_, access), rest)) = path.split_first() else {
            let s = self.get(src)?;
            return self.connect_fields(strict, base, &s, ty, false);
        };
        match *access {
            Access::Static(index) => {
                let child_ty = ty
                    .child(index)
                    .ok_or_else(|| InternalError::new(format!("write path has no child {index}")))?;
                let child = self.sub(base, index)?;
                self.write_through(&child, child_ty, rest, src, strict)
            }
            Access::Dynamic(index) => {
                let FType::Vector(elem, len) = ty else {
                    let shown = ty.display(self.interner());
                    return Err(InternalError::new(format!("dynamic write into `{shown}`")).into());
                };
                let sel = self.value(index)?;
                let width = index_width(u64::from(*len));
                for i in 0..*len {
                    let child = self.sub(base, i as usize)?;
                    let mut b = self.builder();
                    let position = b.uint(width, u64::from(i));
                    let cond = b.binary(BinaryOp::Eq, sel, position)?;
                    let (_, then_block, _) = b.when(cond, false);
                    let saved = std::mem::replace(&mut self.block, then_block);
                    let result = self.write_through(&child, elem, rest, src, strict);
                    self.block = saved;
                    result?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::Interner;
    use strata_ir::{BodyBuilder, BundleField};

    #[test]
    fn static_paths_are_not_write_paths() {
        let mut body = Body::new([FType::vector(FType::uint(4), 3)]);
        let v = body.args[0];
        let mut b = BodyBuilder::new(&mut body);
        let two = b.uint(2, 2);
        let e = b.subaccess(v, two).unwrap();
        let x = b.subindex(v, 1).unwrap();
        assert_eq!(dynamic_write_path(&body, e), None);
        assert_eq!(dynamic_write_path(&body, x), None);
        assert_eq!(dynamic_write_path(&body, v), None);
    }

    #[test]
    fn path_starts_at_first_dynamic_access() {
        let i = Interner::new();
        let elem = FType::Bundle(vec![BundleField::new(i.get_or_intern("a"), FType::uint(1))]);
        let outer = FType::Bundle(vec![BundleField::new(i.get_or_intern("v"), FType::vector(elem, 2))]);
        let mut body = Body::new([outer, FType::uint(1)]);
        let (w, idx) = (body.args[0], body.args[1]);
        let mut b = BodyBuilder::new(&mut body);
        let v = b.subfield(w, 0).unwrap();
        let e = b.subaccess(v, idx).unwrap();
        let a = b.subfield(e, 0).unwrap();
        let (base, path) = dynamic_write_path(&body, a).unwrap();
        assert_eq!(base, v);
        let accesses: Vec<Access> = path.iter().map(|&(_, a)| a).collect();
        assert_eq!(accesses, vec![Access::Dynamic(idx), Access::Static(0)]);
        assert_eq!(path[0].0, body.defining_op(e).unwrap());
    }

    #[test]
    fn out_of_range_constant_is_dynamic() {
        let mut body = Body::new([FType::vector(FType::uint(4), 2)]);
        let v = body.args[0];
        let mut b = BodyBuilder::new(&mut body);
        let three = b.uint(2, 3);
        let e = b.subaccess(v, three).unwrap();
        let (base, path) = dynamic_write_path(&body, e).unwrap();
        assert_eq!(base, v);
        assert_eq!(path[0].1, Access::Dynamic(three));
    }
}
