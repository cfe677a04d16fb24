//! Insertion-point builder for module bodies.

use crate::body::{Block, Body, Value, ValueDef};
use crate::ids::{BlockId, OpId, ValueId};
use crate::ops::{BinaryOp, InstanceDecl, MemDecl, OpAttrs, OpKind, Operation};
use crate::types::FType;
use strata_common::{Ident, InternalError, Interner, LogicVec, StrataResult};
use strata_source::Location;

/// Appends operations to a block of a [`Body`].
pub struct BodyBuilder<'a> {
    body: &'a mut Body,
    block: BlockId,
    loc: Location,
}

impl<'a> BodyBuilder<'a> {
    /// A builder appending to the entry block.
    pub fn new(body: &'a mut Body) -> Self {
        let block = body.entry;
        Self {
            body,
            block,
            loc: Location::UNKNOWN,
        }
    }

    /// The body being built.
    pub fn body(&self) -> &Body {
        self.body
    }

    /// The block new operations are appended to.
    pub fn block(&self) -> BlockId {
        self.block
    }

    /// Moves the insertion point to the end of `block`.
    pub fn set_block(&mut self, block: BlockId) {
        self.block = block;
    }

    /// Sets the location given to new operations.
    pub fn set_loc(&mut self, loc: Location) {
        self.loc = loc;
    }

    /// Type of `value`.
    pub fn ty(&self, value: ValueId) -> &FType {
        self.body.value_type(value)
    }

    /// Appends an operation with explicitly typed results.
    pub fn push(
        &mut self,
        kind: OpKind,
        operands: Vec<ValueId>,
        result_types: Vec<FType>,
        attrs: OpAttrs,
    ) -> OpId {
        let op = self.body.ops.next_id();
        let results = result_types
            .into_iter()
            .enumerate()
            .map(|(index, ty)| {
                self.body.values.alloc(Value {
                    ty,
                    def: ValueDef::Result {
                        op,
                        index: index as u32,
                    },
                })
            })
            .collect();
        self.body.ops.alloc(Operation {
            kind,
            operands,
            results,
            regions: Vec::new(),
            attrs,
            loc: self.loc,
            parent: self.block,
        });
        self.body.blocks[self.block].ops.push(op);
        op
    }

    /// Appends a single-result operation of type `ty`.
    pub fn typed(&mut self, kind: OpKind, operands: Vec<ValueId>, ty: FType) -> ValueId {
        self.typed_with(kind, operands, ty, OpAttrs::default())
    }

    /// Appends a single-result operation of type `ty` with attributes.
    pub fn typed_with(
        &mut self,
        kind: OpKind,
        operands: Vec<ValueId>,
        ty: FType,
        attrs: OpAttrs,
    ) -> ValueId {
        let op = self.push(kind, operands, vec![ty], attrs);
        self.body.ops[op].results[0]
    }

    /// Appends an expression whose type follows from its operands.
    pub fn expr(&mut self, kind: OpKind, operands: Vec<ValueId>) -> StrataResult<ValueId> {
        let ty = {
            let types: Vec<&FType> = operands.iter().map(|&v| self.body.value_type(v)).collect();
            kind.infer_type(&types)
        };
        let ty = ty.ok_or_else(|| {
            InternalError::new(format!("cannot infer the result type of '{}'", kind.mnemonic()))
        })?;
        Ok(self.typed(kind, operands, ty))
    }

    /// Declares a wire.
    pub fn wire(&mut self, name: Ident, ty: FType) -> ValueId {
        self.typed_with(OpKind::Wire, vec![], ty, OpAttrs::named(name))
    }

    /// Declares a node holding `input`.
    pub fn node(&mut self, name: Ident, input: ValueId) -> ValueId {
        let ty = self.ty(input).clone();
        self.typed_with(OpKind::Node, vec![input], ty, OpAttrs::named(name))
    }

    /// Declares a register without reset.
    pub fn reg(&mut self, name: Ident, ty: FType, clock: ValueId) -> ValueId {
        self.typed_with(OpKind::Reg, vec![clock], ty, OpAttrs::named(name))
    }

    /// Declares a register with reset.
    pub fn reg_reset(
        &mut self,
        name: Ident,
        ty: FType,
        clock: ValueId,
        reset: ValueId,
        init: ValueId,
    ) -> ValueId {
        self.typed_with(OpKind::RegReset, vec![clock, reset, init], ty, OpAttrs::named(name))
    }

    /// A literal of type `ty`.
    pub fn constant(&mut self, ty: FType, value: LogicVec) -> ValueId {
        self.typed(OpKind::Constant(value), vec![], ty)
    }

    /// An unsigned literal.
    pub fn uint(&mut self, width: u32, value: u64) -> ValueId {
        self.constant(FType::uint(width), LogicVec::from_u64(value, width))
    }

    /// A signed literal.
    pub fn sint(&mut self, width: u32, value: i64) -> ValueId {
        self.constant(FType::sint(width), LogicVec::from_i64(value, width))
    }

    /// An undriven value of type `ty`.
    pub fn invalid(&mut self, ty: FType) -> ValueId {
        self.typed(OpKind::Invalid, vec![], ty)
    }

    /// Bundle field `index` of `input`.
    pub fn subfield(&mut self, input: ValueId, index: u32) -> StrataResult<ValueId> {
        self.expr(OpKind::Subfield(index), vec![input])
    }

    /// Vector element `index` of `input`.
    pub fn subindex(&mut self, input: ValueId, index: u32) -> StrataResult<ValueId> {
        self.expr(OpKind::Subindex(index), vec![input])
    }

    /// Dynamic vector element of `input`.
    pub fn subaccess(&mut self, input: ValueId, index: ValueId) -> StrataResult<ValueId> {
        self.expr(OpKind::Subaccess, vec![input, index])
    }

    /// `cat(high, low)`.
    pub fn cat(&mut self, high: ValueId, low: ValueId) -> StrataResult<ValueId> {
        self.expr(OpKind::Cat, vec![high, low])
    }

    /// `bits(input, hi, lo)`.
    pub fn bits(&mut self, input: ValueId, hi: u32, lo: u32) -> StrataResult<ValueId> {
        self.expr(OpKind::Bits { hi, lo }, vec![input])
    }

    /// `asUInt(input)`.
    pub fn as_uint(&mut self, input: ValueId) -> StrataResult<ValueId> {
        self.expr(OpKind::AsUInt, vec![input])
    }

    /// Reinterprets `input` as `ty`.
    pub fn bitcast(&mut self, input: ValueId, ty: FType) -> ValueId {
        self.typed(OpKind::BitCast, vec![input], ty)
    }

    /// A binary primitive.
    pub fn binary(&mut self, op: BinaryOp, lhs: ValueId, rhs: ValueId) -> StrataResult<ValueId> {
        self.expr(OpKind::Binary(op), vec![lhs, rhs])
    }

    /// `mux(sel, high, low)`.
    pub fn mux(&mut self, sel: ValueId, high: ValueId, low: ValueId) -> StrataResult<ValueId> {
        self.expr(OpKind::Mux, vec![sel, high, low])
    }

    /// `dest <= src`.
    pub fn connect(&mut self, dest: ValueId, src: ValueId) -> OpId {
        self.push(OpKind::Connect, vec![dest, src], vec![], OpAttrs::default())
    }

    /// `dest <= src` with identical types.
    pub fn strict_connect(&mut self, dest: ValueId, src: ValueId) -> OpId {
        self.push(OpKind::StrictConnect, vec![dest, src], vec![], OpAttrs::default())
    }

    /// Keeps `values` observable.
    pub fn probe(&mut self, values: Vec<ValueId>) -> OpId {
        self.push(OpKind::Probe, values, vec![], OpAttrs::default())
    }

    /// A `when` with a then block and optionally an else block.
    ///
    /// The insertion point is left unchanged.
    pub fn when(&mut self, cond: ValueId, with_else: bool) -> (OpId, BlockId, Option<BlockId>) {
        let op = self.push(OpKind::When, vec![cond], vec![], OpAttrs::default());
        let then_block = self.body.blocks.alloc(Block {
            ops: Vec::new(),
            parent: Some(op),
        });
        let mut regions = vec![then_block];
        let else_block = with_else.then(|| {
            let block = self.body.blocks.alloc(Block {
                ops: Vec::new(),
                parent: Some(op),
            });
            regions.push(block);
            block
        });
        self.body.ops[op].regions = regions;
        (op, then_block, else_block)
    }

    /// Instantiates a module; `result_types` follow the callee's ports.
    pub fn instance(
        &mut self,
        name: Ident,
        decl: InstanceDecl,
        result_types: Vec<FType>,
    ) -> Vec<ValueId> {
        let op = self.push(OpKind::Instance(decl), vec![], result_types, OpAttrs::named(name));
        self.body.ops[op].results.clone()
    }

    /// Declares a memory; one result per port.
    pub fn mem(&mut self, name: Ident, decl: MemDecl, interner: &Interner) -> Vec<ValueId> {
        let types = (0..decl.ports.len())
            .map(|i| decl.port_type(i, interner))
            .collect();
        let op = self.push(OpKind::Mem(decl), vec![], types, OpAttrs::named(name));
        self.body.ops[op].results.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_typed_expressions() {
        let i = Interner::new();
        let mut body = Body::new([FType::uint(4)]);
        let arg = body.args[0];
        let mut b = BodyBuilder::new(&mut body);
        let c = b.uint(2, 1);
        let cat = b.cat(arg, c).unwrap();
        assert_eq!(b.ty(cat), &FType::uint(6));
        let w = b.wire(i.get_or_intern("w"), FType::uint(6));
        b.connect(w, cat);
        assert_eq!(body.walk().len(), 4);
        assert_eq!(body.defining_op(cat), Some(OpId::from_raw(1)));
    }

    #[test]
    fn infer_failure_is_internal_error() {
        let mut body = Body::new([FType::uint(4)]);
        let arg = body.args[0];
        let mut b = BodyBuilder::new(&mut body);
        assert!(b.subfield(arg, 0).is_err());
    }

    #[test]
    fn when_regions_nest() {
        let mut body = Body::new([FType::uint(1)]);
        let cond = body.args[0];
        let mut b = BodyBuilder::new(&mut body);
        let (when, then_block, else_block) = b.when(cond, true);
        b.set_block(then_block);
        b.uint(1, 0);
        assert!(else_block.is_some());
        assert_eq!(body.blocks[then_block].parent, Some(when));
        let order = body.walk();
        assert_eq!(order.len(), 2);
        assert!(!body.is_top_level(order[1]));
    }
}
