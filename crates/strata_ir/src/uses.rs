//! Operand-use index of a module body.

use crate::body::Body;
use crate::ids::{OpId, ValueId};
use crate::ops::OpKind;
use std::collections::HashMap;

/// One use of a value: operand `operand` of `op`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Use {
    /// The using operation.
    pub op: OpId,
    /// Operand position.
    pub operand: u32,
}

/// Every use of every value of a body.
#[derive(Debug, Default)]
pub struct UseMap {
    uses: HashMap<ValueId, Vec<Use>>,
}

impl UseMap {
    /// Indexes every operation reachable from the entry block.
    pub fn build(body: &Body) -> Self {
        let mut uses: HashMap<ValueId, Vec<Use>> = HashMap::new();
        for op in body.walk() {
            for (i, &value) in body.ops[op].operands.iter().enumerate() {
                uses.entry(value).or_default().push(Use {
                    op,
                    operand: i as u32,
                });
            }
        }
        Self { uses }
    }

    /// The uses of `value` in program order.
    pub fn uses(&self, value: ValueId) -> &[Use] {
        self.uses.get(&value).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns `true` if nothing uses `value`.
    pub fn is_unused(&self, value: ValueId) -> bool {
        self.uses(value).is_empty()
    }

    /// The one strict connect driving `value`.
    ///
    /// Fails when `value` is attached or accessed field-wise, when any other
    /// kind of connect drives it, when more than one strict connect does, or
    /// when the connect sits in a different block than the value's
    /// definition.
    pub fn single_connect_user(&self, body: &Body, value: ValueId) -> Option<OpId> {
        let mut found = None;
        for u in self.uses(value) {
            let op = &body.ops[u.op];
            match op.kind {
                OpKind::Attach | OpKind::Subfield(_) | OpKind::Subindex(_) | OpKind::Subaccess => {
                    return None
                }
                OpKind::Connect if u.operand == 0 => return None,
                OpKind::StrictConnect if u.operand == 0 => {
                    if found.is_some() {
                        return None;
                    }
                    found = Some(u.op);
                }
                _ => {}
            }
        }
        let connect = found?;
        let home = body
            .defining_op(value)
            .map(|def| body.ops[def].parent)
            .unwrap_or(body.entry);
        (body.ops[connect].parent == home).then_some(connect)
    }
}
