//! Module bodies: values, operations and blocks.
//!
//! A body owns three arenas. Blocks list their operations in program order;
//! the entry block is the module's top level and every other block is a
//! region of a `when`.

use crate::arena::Arena;
use crate::ids::{BlockId, OpId, ValueId};
use crate::ops::Operation;
use crate::types::FType;
use serde::{Deserialize, Serialize};

/// Where a value comes from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueDef {
    /// Port argument `i` of the module.
    Arg(u32),
    /// Result `index` of operation `op`.
    Result {
        /// Defining operation.
        op: OpId,
        /// Result position.
        index: u32,
    },
}

/// An SSA value.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Value {
    /// Type of the value.
    pub ty: FType,
    /// Definition.
    pub def: ValueDef,
}

/// An ordered list of operations.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Block {
    /// Operations in program order.
    pub ops: Vec<OpId>,
    /// The `when` owning this block; `None` for the entry block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<OpId>,
}

/// A module body.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Body {
    /// Every value.
    pub values: Arena<ValueId, Value>,
    /// Every operation, including ones nested in regions.
    pub ops: Arena<OpId, Operation>,
    /// Every block.
    pub blocks: Arena<BlockId, Block>,
    /// The top-level block.
    pub entry: BlockId,
    /// One value per module port.
    pub args: Vec<ValueId>,
}

impl Body {
    /// Creates a body with an empty entry block and one argument per type.
    pub fn new(port_types: impl IntoIterator<Item = FType>) -> Self {
        let mut values = Arena::new();
        let args = port_types
            .into_iter()
            .enumerate()
            .map(|(i, ty)| {
                values.alloc(Value {
                    ty,
                    def: ValueDef::Arg(i as u32),
                })
            })
            .collect();
        let mut blocks = Arena::new();
        let entry = blocks.alloc(Block::default());
        Self {
            values,
            ops: Arena::new(),
            blocks,
            entry,
            args,
        }
    }

    /// Type of `value`.
    pub fn value_type(&self, value: ValueId) -> &FType {
        &self.values[value].ty
    }

    /// The operation producing `value`, `None` for port arguments.
    pub fn defining_op(&self, value: ValueId) -> Option<OpId> {
        match self.values[value].def {
            ValueDef::Arg(_) => None,
            ValueDef::Result { op, .. } => Some(op),
        }
    }

    /// The operation with id `op`.
    pub fn op(&self, op: OpId) -> &Operation {
        &self.ops[op]
    }

    /// Operations of `block` in program order.
    pub fn block_ops(&self, block: BlockId) -> &[OpId] {
        &self.blocks[block].ops
    }

    /// Every operation reachable from the entry block, in pre-order.
    pub fn walk(&self) -> Vec<OpId> {
        let mut out = Vec::with_capacity(self.ops.len());
        self.walk_block(self.entry, &mut out);
        out
    }

    fn walk_block(&self, block: BlockId, out: &mut Vec<OpId>) {
        for &op in &self.blocks[block].ops {
            out.push(op);
            for &region in &self.ops[op].regions {
                self.walk_block(region, out);
            }
        }
    }

    /// Returns `true` if `op` sits directly in the entry block.
    pub fn is_top_level(&self, op: OpId) -> bool {
        self.ops[op].parent == self.entry
    }
}
