//! Structural module bodies.
//!
//! Like circuit bodies, a structural body owns arenas of values, operations
//! and blocks. Operations are removed by unlinking them from their block;
//! anything not reachable from the entry block is dead.

use crate::ids::{HwBlockId, HwOpId, HwValueId};
use crate::ops::{HwOp, HwOpAttrs, HwOpKind};
use crate::types::HwType;
use serde::{Deserialize, Serialize};
use strata_ir::Arena;
use strata_source::Location;

/// Where a value comes from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HwValueDef {
    /// Input argument `i` of the module.
    Arg(u32),
    /// Result `index` of operation `op`.
    Result {
        /// Defining operation.
        op: HwOpId,
        /// Result position.
        index: u32,
    },
    /// A stand-in for a value that is not available yet. A finished body
    /// never uses one.
    Placeholder,
}

/// A structural value.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct HwValue {
    /// Type of the value.
    pub ty: HwType,
    /// Definition.
    pub def: HwValueDef,
}

/// An ordered list of operations.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct HwBlock {
    /// Operations in program order.
    pub ops: Vec<HwOpId>,
    /// Operation owning this block; `None` for the entry block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<HwOpId>,
}

/// Where new operations go.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InsertPoint {
    /// At the front of a block.
    Start(HwBlockId),
    /// At the end of a block.
    End(HwBlockId),
    /// Right before an operation.
    Before(HwOpId),
    /// Right after an operation.
    After(HwOpId),
}

impl InsertPoint {
    /// The point that keeps later insertions after `inserted`.
    pub fn advance(self, inserted: HwOpId) -> Self {
        match self {
            InsertPoint::Start(_) | InsertPoint::After(_) => InsertPoint::After(inserted),
            other => other,
        }
    }
}

/// A structural module body.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct HwBody {
    /// Every value.
    pub values: Arena<HwValueId, HwValue>,
    /// Every operation, live or unlinked.
    pub ops: Arena<HwOpId, HwOp>,
    /// Every block.
    pub blocks: Arena<HwBlockId, HwBlock>,
    /// The top-level block.
    pub entry: HwBlockId,
    /// One value per input or inout port, in argument order.
    pub args: Vec<HwValueId>,
    /// One value per output port, in result order.
    pub outputs: Vec<HwValueId>,
}

impl HwBody {
    /// Creates a body with an empty entry block and one argument per type.
    pub fn new(arg_types: impl IntoIterator<Item = HwType>) -> Self {
        let mut values = Arena::new();
        let args = arg_types
            .into_iter()
            .enumerate()
            .map(|(i, ty)| {
                values.alloc(HwValue {
                    ty,
                    def: HwValueDef::Arg(i as u32),
                })
            })
            .collect();
        let mut blocks = Arena::new();
        let entry = blocks.alloc(HwBlock::default());
        Self {
            values,
            ops: Arena::new(),
            blocks,
            entry,
            args,
            outputs: Vec::new(),
        }
    }

    /// Type of `value`.
    pub fn value_type(&self, value: HwValueId) -> &HwType {
        &self.values[value].ty
    }

    /// The operation producing `value`.
    pub fn defining_op(&self, value: HwValueId) -> Option<HwOpId> {
        match self.values[value].def {
            HwValueDef::Result { op, .. } => Some(op),
            _ => None,
        }
    }

    /// Returns `true` if `value` is a placeholder.
    pub fn is_placeholder(&self, value: HwValueId) -> bool {
        self.values[value].def == HwValueDef::Placeholder
    }

    /// Allocates a placeholder of type `ty`.
    pub fn placeholder(&mut self, ty: HwType) -> HwValueId {
        self.values.alloc(HwValue {
            ty,
            def: HwValueDef::Placeholder,
        })
    }

    /// The operation with id `op`.
    pub fn op(&self, op: HwOpId) -> &HwOp {
        &self.ops[op]
    }

    /// Mutable access to operation `op`.
    pub fn op_mut(&mut self, op: HwOpId) -> &mut HwOp {
        &mut self.ops[op]
    }

    /// Operations of `block` in program order.
    pub fn block_ops(&self, block: HwBlockId) -> &[HwOpId] {
        &self.blocks[block].ops
    }

    /// The block holding `op` and its position there.
    pub fn position(&self, op: HwOpId) -> Option<(HwBlockId, usize)> {
        let block = self.ops[op].parent;
        let index = self.blocks[block].ops.iter().position(|&o| o == op)?;
        Some((block, index))
    }

    /// Returns `true` if `op` is still linked into a block.
    pub fn is_linked(&self, op: HwOpId) -> bool {
        self.position(op).is_some()
    }

    fn resolve(&self, at: InsertPoint) -> (HwBlockId, usize) {
        let linked = |op: HwOpId| {
            self.position(op)
                .unwrap_or((self.ops[op].parent, self.blocks[self.ops[op].parent].ops.len()))
        };
        match at {
            InsertPoint::Start(block) => (block, 0),
            InsertPoint::End(block) => (block, self.blocks[block].ops.len()),
            InsertPoint::Before(op) => linked(op),
            InsertPoint::After(op) => {
                let (block, index) = linked(op);
                (block, (index + 1).min(self.blocks[block].ops.len()))
            }
        }
    }

    /// Creates an operation at `at`.
    pub fn insert(
        &mut self,
        at: InsertPoint,
        kind: HwOpKind,
        operands: Vec<HwValueId>,
        result_types: Vec<HwType>,
        attrs: HwOpAttrs,
        loc: Location,
    ) -> HwOpId {
        let (block, index) = self.resolve(at);
        let op = self.ops.next_id();
        let results = result_types
            .into_iter()
            .enumerate()
            .map(|(index, ty)| {
                self.values.alloc(HwValue {
                    ty,
                    def: HwValueDef::Result {
                        op,
                        index: index as u32,
                    },
                })
            })
            .collect();
        self.ops.alloc(HwOp {
            kind,
            operands,
            results,
            regions: Vec::new(),
            attrs,
            loc,
            parent: block,
        });
        self.blocks[block].ops.insert(index, op);
        op
    }

    /// Adds an empty region to `op`.
    pub fn add_region(&mut self, op: HwOpId) -> HwBlockId {
        let block = self.blocks.alloc(HwBlock {
            ops: Vec::new(),
            parent: Some(op),
        });
        self.ops[op].regions.push(block);
        block
    }

    /// Unlinks `op` (and everything nested in it) from the body.
    pub fn erase(&mut self, op: HwOpId) {
        if let Some((block, index)) = self.position(op) {
            self.blocks[block].ops.remove(index);
        }
    }

    /// Moves `op` to `at`.
    pub fn move_op(&mut self, op: HwOpId, at: InsertPoint) {
        if at == InsertPoint::Before(op) || at == InsertPoint::After(op) {
            return;
        }
        self.erase(op);
        let (block, index) = self.resolve(at);
        self.blocks[block].ops.insert(index, op);
        self.ops[op].parent = block;
    }

    /// Returns `true` if `a` comes before `b` in their common block.
    pub fn is_before_in_block(&self, a: HwOpId, b: HwOpId) -> bool {
        match (self.position(a), self.position(b)) {
            (Some((ba, ia)), Some((bb, ib))) => ba == bb && ia < ib,
            _ => false,
        }
    }

    /// Every live operation in pre-order.
    pub fn walk(&self) -> Vec<HwOpId> {
        let mut out = Vec::with_capacity(self.ops.len());
        self.walk_block(self.entry, &mut out);
        out
    }

    fn walk_block(&self, block: HwBlockId, out: &mut Vec<HwOpId>) {
        for &op in &self.blocks[block].ops {
            out.push(op);
            for &region in &self.ops[op].regions {
                self.walk_block(region, out);
            }
        }
    }

    /// Live operations using `value` as an operand.
    pub fn users(&self, value: HwValueId) -> Vec<HwOpId> {
        self.walk()
            .into_iter()
            .filter(|&op| self.ops[op].operands.contains(&value))
            .collect()
    }

    /// Rewrites every use of `from`, including module outputs, to `to`.
    /// Returns the number of rewritten operands.
    pub fn replace_all_uses(&mut self, from: HwValueId, to: HwValueId) -> usize {
        let mut count = 0;
        for op in self.walk() {
            for operand in &mut self.ops[op].operands {
                if *operand == from {
                    *operand = to;
                    count += 1;
                }
            }
        }
        for output in &mut self.outputs {
            if *output == from {
                *output = to;
                count += 1;
            }
        }
        count
    }

    /// Placeholders still used by a live operation or an output.
    pub fn used_placeholders(&self) -> Vec<HwValueId> {
        let mut out: Vec<HwValueId> = self
            .walk()
            .into_iter()
            .flat_map(|op| self.ops[op].operands.iter().copied())
            .chain(self.outputs.iter().copied())
            .filter(|&v| self.is_placeholder(v))
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(body: &mut HwBody, at: InsertPoint, value: u64) -> HwOpId {
        body.insert(
            at,
            HwOpKind::Constant(strata_common::LogicVec::from_u64(value, 4)),
            vec![],
            vec![HwType::Int(4)],
            HwOpAttrs::default(),
            Location::UNKNOWN,
        )
    }

    #[test]
    fn insertion_points() {
        let mut body = HwBody::new([]);
        let entry = body.entry;
        let a = constant(&mut body, InsertPoint::End(entry), 1);
        let b = constant(&mut body, InsertPoint::Start(entry), 2);
        let c = constant(&mut body, InsertPoint::Before(a), 3);
        let d = constant(&mut body, InsertPoint::After(b), 4);
        assert_eq!(body.block_ops(entry), &[b, d, c, a]);
        assert!(body.is_before_in_block(d, a));
        assert!(!body.is_before_in_block(a, d));
    }

    #[test]
    fn erase_and_move() {
        let mut body = HwBody::new([]);
        let entry = body.entry;
        let a = constant(&mut body, InsertPoint::End(entry), 1);
        let b = constant(&mut body, InsertPoint::End(entry), 2);
        body.move_op(b, InsertPoint::Before(a));
        assert_eq!(body.block_ops(entry), &[b, a]);
        body.erase(a);
        assert!(!body.is_linked(a));
        assert_eq!(body.walk(), vec![b]);
    }

    #[test]
    fn placeholders_and_replacement() {
        let mut body = HwBody::new([HwType::Int(4)]);
        let entry = body.entry;
        let arg = body.args[0];
        let hole = body.placeholder(HwType::Int(4));
        let add = body.insert(
            InsertPoint::End(entry),
            HwOpKind::Comb(crate::ops::CombOp::Add),
            vec![arg, hole],
            vec![HwType::Int(4)],
            HwOpAttrs::default(),
            Location::UNKNOWN,
        );
        body.outputs.push(hole);
        assert_eq!(body.used_placeholders(), vec![hole]);
        assert_eq!(body.users(hole), vec![add]);
        assert_eq!(body.replace_all_uses(hole, arg), 2);
        assert!(body.used_placeholders().is_empty());
        assert_eq!(body.op(add).operands, vec![arg, arg]);
    }
}
