//! Insertion-point builder for structural bodies.

use crate::body::{HwBody, InsertPoint};
use crate::ids::{HwBlockId, HwOpId, HwValueId};
use crate::ops::{CombOp, HwOpAttrs, HwOpKind, ICmpPredicate};
use crate::types::HwType;
use strata_common::{Ident, LogicVec};
use strata_ir::EventControl;
use strata_source::Location;

/// Creates operations at a moving insertion point of an [`HwBody`].
pub struct HwBuilder<'a> {
    body: &'a mut HwBody,
    at: InsertPoint,
    loc: Location,
}

impl<'a> HwBuilder<'a> {
    /// A builder inserting at `at`.
    pub fn new(body: &'a mut HwBody, at: InsertPoint) -> Self {
        Self {
            body,
            at,
            loc: Location::UNKNOWN,
        }
    }

    /// A builder appending to the entry block.
    pub fn at_end(body: &'a mut HwBody) -> Self {
        let entry = body.entry;
        Self::new(body, InsertPoint::End(entry))
    }

    /// The body being built.
    pub fn body(&mut self) -> &mut HwBody {
        &mut *self.body
    }

    /// The current insertion point.
    pub fn insertion_point(&self) -> InsertPoint {
        self.at
    }

    /// Moves the insertion point.
    pub fn set_insertion_point(&mut self, at: InsertPoint) {
        self.at = at;
    }

    /// Sets the location given to new operations.
    pub fn set_loc(&mut self, loc: Location) {
        self.loc = loc;
    }

    /// Type of `value`.
    pub fn ty(&self, value: HwValueId) -> &HwType {
        self.body.value_type(value)
    }

    /// Width of an integer value, 0 for anything else.
    pub fn width(&self, value: HwValueId) -> u32 {
        self.ty(value).int_width().unwrap_or(0)
    }

    /// Creates an operation with explicit result types.
    pub fn op(
        &mut self,
        kind: HwOpKind,
        operands: Vec<HwValueId>,
        result_types: Vec<HwType>,
        attrs: HwOpAttrs,
    ) -> HwOpId {
        let op = self
            .body
            .insert(self.at, kind, operands, result_types, attrs, self.loc);
        self.at = self.at.advance(op);
        op
    }

    /// Creates a single-result operation.
    pub fn value(&mut self, kind: HwOpKind, operands: Vec<HwValueId>, ty: HwType) -> HwValueId {
        self.value_with(kind, operands, ty, HwOpAttrs::default())
    }

    /// Creates a single-result operation with attributes.
    pub fn value_with(
        &mut self,
        kind: HwOpKind,
        operands: Vec<HwValueId>,
        ty: HwType,
        attrs: HwOpAttrs,
    ) -> HwValueId {
        let op = self.op(kind, operands, vec![ty], attrs);
        self.body.ops[op].results[0]
    }

    /// Creates a result-less operation.
    pub fn stmt(&mut self, kind: HwOpKind, operands: Vec<HwValueId>) -> HwOpId {
        self.op(kind, operands, vec![], HwOpAttrs::default())
    }

    /// An integer literal.
    pub fn constant(&mut self, value: LogicVec) -> HwValueId {
        let ty = HwType::Int(value.width());
        self.value(HwOpKind::Constant(value), vec![], ty)
    }

    /// A `width`-bit literal holding `value`.
    pub fn int(&mut self, width: u32, value: u64) -> HwValueId {
        self.constant(LogicVec::from_u64(value, width))
    }

    /// A net of type `ty`; returns the `InOut` value.
    pub fn wire(&mut self, ty: HwType, attrs: HwOpAttrs) -> HwValueId {
        self.value_with(HwOpKind::Wire, vec![], HwType::inout(ty), attrs)
    }

    /// A named net.
    pub fn named_wire(&mut self, ty: HwType, name: Ident) -> HwValueId {
        self.wire(ty, HwOpAttrs::named(name))
    }

    /// The current value of a net.
    pub fn read(&mut self, net: HwValueId) -> HwValueId {
        let ty = self.ty(net).element().clone();
        self.value(HwOpKind::ReadInOut, vec![net], ty)
    }

    /// `assign dest = src`.
    pub fn assign(&mut self, dest: HwValueId, src: HwValueId) -> HwOpId {
        self.stmt(HwOpKind::Assign, vec![dest, src])
    }

    /// `dest <= src`.
    pub fn passign(&mut self, dest: HwValueId, src: HwValueId) -> HwOpId {
        self.stmt(HwOpKind::PAssign, vec![dest, src])
    }

    /// A two-operand combinational operation.
    pub fn comb(&mut self, op: CombOp, lhs: HwValueId, rhs: HwValueId) -> HwValueId {
        let ty = self.ty(lhs).clone();
        self.value(HwOpKind::Comb(op), vec![lhs, rhs], ty)
    }

    /// A comparison.
    pub fn icmp(&mut self, pred: ICmpPredicate, lhs: HwValueId, rhs: HwValueId) -> HwValueId {
        self.value(HwOpKind::ICmp(pred), vec![lhs, rhs], HwType::Int(1))
    }

    /// Concatenation, most significant operand first.
    pub fn concat(&mut self, operands: Vec<HwValueId>) -> HwValueId {
        let width = operands.iter().map(|&v| self.width(v)).sum();
        self.value(HwOpKind::Concat, operands, HwType::Int(width))
    }

    /// `width` bits of `input` starting at `low`.
    pub fn extract(&mut self, input: HwValueId, low: u32, width: u32) -> HwValueId {
        self.value(HwOpKind::Extract { low }, vec![input], HwType::Int(width))
    }

    /// `cond ? high : low`.
    pub fn mux(&mut self, cond: HwValueId, high: HwValueId, low: HwValueId) -> HwValueId {
        let ty = self.ty(high).clone();
        self.value(HwOpKind::Mux, vec![cond, high, low], ty)
    }

    /// `value ^ all-ones`.
    pub fn not(&mut self, value: HwValueId) -> HwValueId {
        let width = self.width(value);
        let ones = self.constant(LogicVec::all_one(width));
        self.comb(CombOp::Xor, value, ones)
    }

    /// The value of a macro as a `width`-bit integer.
    pub fn macro_ref(&mut self, name: &str, width: u32) -> HwValueId {
        self.value(HwOpKind::MacroRef(name.to_string()), vec![], HwType::Int(width))
    }

    /// An array from elements given highest index first.
    pub fn array_create(&mut self, elements: Vec<HwValueId>) -> HwValueId {
        let elem = elements
            .first()
            .map(|&v| self.ty(v).clone())
            .unwrap_or(HwType::Int(0));
        let len = elements.len() as u32;
        self.value(HwOpKind::ArrayCreate, elements, HwType::array(elem, len))
    }

    /// Element `index` of `array`.
    pub fn array_get(&mut self, array: HwValueId, index: HwValueId) -> HwValueId {
        let elem = self
            .ty(array)
            .as_array()
            .map(|(elem, _)| elem.clone())
            .unwrap_or(HwType::Int(0));
        self.value(HwOpKind::ArrayGet, vec![array, index], elem)
    }

    /// An `always` block triggered by `events`; returns the op and its body.
    pub fn always(&mut self, events: Vec<(EventControl, HwValueId)>) -> (HwOpId, HwBlockId) {
        let (edges, signals): (Vec<EventControl>, Vec<HwValueId>) = events.into_iter().unzip();
        let op = self.stmt(HwOpKind::Always { events: edges }, signals);
        let block = self.body.add_region(op);
        (op, block)
    }

    /// An `ifdef` with then and else blocks.
    pub fn ifdef(&mut self, macro_name: &str) -> (HwOpId, HwBlockId, HwBlockId) {
        let op = self.stmt(
            HwOpKind::IfDef {
                macro_name: macro_name.to_string(),
            },
            vec![],
        );
        let then_block = self.body.add_region(op);
        let else_block = self.body.add_region(op);
        (op, then_block, else_block)
    }

    /// An `initial` block.
    pub fn initial(&mut self) -> (HwOpId, HwBlockId) {
        let op = self.stmt(HwOpKind::Initial, vec![]);
        let block = self.body.add_region(op);
        (op, block)
    }

    /// A procedural `if`, optionally with an else block.
    pub fn if_(&mut self, cond: HwValueId, with_else: bool) -> (HwOpId, HwBlockId, Option<HwBlockId>) {
        let op = self.stmt(HwOpKind::If, vec![cond]);
        let then_block = self.body.add_region(op);
        let else_block = with_else.then(|| self.body.add_region(op));
        (op, then_block, else_block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_in_program_order() {
        let mut body = HwBody::new([HwType::Int(4)]);
        let arg = body.args[0];
        let mut b = HwBuilder::at_end(&mut body);
        let zero = b.int(4, 0);
        let cat = b.concat(vec![zero, arg]);
        assert_eq!(b.ty(cat), &HwType::Int(8));
        let low = b.extract(cat, 0, 3);
        assert_eq!(b.width(low), 3);
        let ops = body.walk();
        assert_eq!(ops.len(), 3);
        assert_eq!(body.op(ops[1]).kind, HwOpKind::Concat);
    }

    #[test]
    fn start_insertion_keeps_order() {
        let mut body = HwBody::new([]);
        let entry = body.entry;
        let mut b = HwBuilder::at_end(&mut body);
        let late = b.int(1, 1);
        b.set_insertion_point(InsertPoint::Start(entry));
        let first = b.int(2, 0);
        let second = b.int(2, 1);
        let order: Vec<_> = body
            .walk()
            .into_iter()
            .filter_map(|op| body.op(op).result())
            .collect();
        assert_eq!(order, vec![first, second, late]);
    }

    #[test]
    fn nets_and_regions() {
        let mut body = HwBody::new([HwType::Int(1)]);
        let clk = body.args[0];
        let mut b = HwBuilder::at_end(&mut body);
        let w = b.wire(HwType::Int(8), HwOpAttrs::default());
        assert_eq!(b.ty(w), &HwType::inout(HwType::Int(8)));
        let (always, block) = b.always(vec![(EventControl::Posedge, clk)]);
        b.set_insertion_point(InsertPoint::End(block));
        let v = b.read(w);
        b.passign(w, v);
        assert_eq!(body.op(always).operands, vec![clk]);
        assert_eq!(body.block_ops(block).len(), 2);
        assert_eq!(body.blocks[block].parent, Some(always));
    }
}
