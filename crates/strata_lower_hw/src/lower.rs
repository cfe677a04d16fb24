//! The per-module structural lowering walk.
//!
//! Every operation of the entry block is visited once, in order, and its
//! results are mapped to structural values. A result of zero width maps to
//! "no value"; whoever consumes it substitutes a zero constant of the width
//! it needs. Values that are needed before they are defined (instance
//! inputs) go through placeholders resolved once the walk is done.

use crate::backedge::Backedges;
use crate::context::HwLoweringContext;
use crate::errors;
use crate::ports::{lower_type, LoweredPorts};
use log::trace;
use std::collections::{HashMap, HashSet};
use strata_common::{Ident, Interner, InternalError, LogicVec};
use strata_diagnostics::Diagnostic;
use strata_hw::{
    CombOp, HwBlockId, HwBody, HwBuilder, HwOpId, HwOpKind, HwType, HwValueId, InsertPoint,
    PortDirection,
};
use strata_ir::annotations::has_dont_touch;
use strata_ir::types::index_width;
use strata_ir::uses::UseMap;
use strata_ir::{Body, EventControl, FType, Module, NameKind, OpId, OpKind, Operation, ValueId};
use strata_source::Location;

/// Why lowering a module stopped.
#[derive(Debug)]
pub(crate) enum LowerError {
    /// A diagnostic was emitted.
    Reported,
    /// A bug in the pass.
    Internal(InternalError),
}

impl From<InternalError> for LowerError {
    fn from(err: InternalError) -> Self {
        LowerError::Internal(err)
    }
}

pub(crate) type LowerResult<T> = Result<T, LowerError>;

/// How a register reacts to its reset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum ResetStyle {
    Sync,
    Async,
}

/// Identifies one `always` block per enclosing block, clock and reset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct AlwaysKey {
    block: HwBlockId,
    clock_edge: EventControl,
    clock: HwValueId,
    reset: Option<(ResetStyle, EventControl, HwValueId)>,
}

/// A register declared in the body, waiting for its update logic.
///
/// Connects to the register rewrite `next` in place, so no placeholder
/// stands in for the next value. `finish_registers` emits the single
/// `passign` once the body is done.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RegState {
    pub reg: HwValueId,
    pub clock: HwValueId,
    /// Style, signal and value of the reset.
    pub reset: Option<(ResetStyle, HwValueId, HwValueId)>,
    /// The value taken on the next clock edge.
    pub next: HwValueId,
    /// The current value; `next` starts out as this.
    pub hold: HwValueId,
}

/// Where the value of an output port comes from.
enum OutputSource {
    /// The source of the one connect driving the port.
    Driver(ValueId, FType),
    /// A temporary wire standing in for the port.
    Net(HwValueId),
}

/// Lowers one module body.
pub(crate) struct BodyLowering<'a> {
    pub(crate) ctx: &'a HwLoweringContext<'a>,
    pub(crate) module: &'a Module,
    pub(crate) module_name: &'a str,
    pub(crate) old: &'a Body,
    pub(crate) body: HwBody,
    pub(crate) at: InsertPoint,
    pub(crate) loc: Location,
    current: &'static str,
    pub(crate) uses: UseMap,
    lowered: HashMap<ValueId, Option<HwValueId>>,
    skip: HashSet<OpId>,
    constants: HashMap<LogicVec, HwValueId>,
    reads: HashMap<HwValueId, HwValueId>,
    always_blocks: HashMap<AlwaysKey, (HwOpId, HwBlockId, Option<HwBlockId>)>,
    ifdef_blocks: HashMap<(HwBlockId, String), (HwOpId, HwBlockId, HwBlockId)>,
    initial_blocks: HashMap<HwBlockId, (HwOpId, HwBlockId)>,
    pub(crate) tmp_wires: Vec<HwValueId>,
    pub(crate) backedges: Backedges,
    pub(crate) regs: Vec<RegState>,
    pub(crate) reg_index: HashMap<ValueId, usize>,
    syms: HashSet<String>,
}

impl<'a> BodyLowering<'a> {
    /// Lowers `old`, the body of `module`, against its lowered `ports`.
    pub(crate) fn run(
        ctx: &'a HwLoweringContext<'a>,
        module: &'a Module,
        name: &'a str,
        ports: &'a LoweredPorts,
        old: &'a Body,
    ) -> LowerResult<HwBody> {
        if old.args.len() != ports.index.len() {
            return Err(InternalError::new(format!(
                "module `{name}` has {} ports but {} body arguments",
                ports.index.len(),
                old.args.len()
            ))
            .into());
        }
        let body = HwBody::new(ports.argument_types());
        let entry = body.entry;
        let mut this = BodyLowering {
            ctx,
            module,
            module_name: name,
            old,
            body,
            at: InsertPoint::End(entry),
            loc: module.loc,
            current: "module",
            uses: UseMap::build(old),
            lowered: HashMap::new(),
            skip: HashSet::new(),
            constants: HashMap::new(),
            reads: HashMap::new(),
            always_blocks: HashMap::new(),
            ifdef_blocks: HashMap::new(),
            initial_blocks: HashMap::new(),
            tmp_wires: Vec::new(),
            backedges: Backedges::default(),
            regs: Vec::new(),
            reg_index: HashMap::new(),
            syms: HashSet::new(),
        };
        let outputs = this.setup_ports(ports)?;
        for &op in old.block_ops(old.entry) {
            this.lower_op(op)?;
        }
        this.at = InsertPoint::End(entry);
        this.finish_registers()?;
        this.finish_outputs(outputs, ports.num_outputs())?;
        let backedges = std::mem::take(&mut this.backedges);
        backedges.resolve(&mut this.body, ctx.interner)?;
        this.optimize_temporary_wires();
        Ok(this.body)
    }

    pub(crate) fn interner(&self) -> &'a Interner {
        self.ctx.interner
    }

    /// Emits `diag` against this module.
    pub(crate) fn report(&self, diag: Diagnostic) -> LowerError {
        self.ctx.sink.emit(diag.in_module(self.module_name));
        LowerError::Reported
    }

    /// Runs `f` on a builder at the current insertion point, which then
    /// moves past whatever `f` created.
    pub(crate) fn build<R>(&mut self, f: impl FnOnce(&mut HwBuilder<'_>) -> R) -> R {
        let mut b = HwBuilder::new(&mut self.body, self.at);
        b.set_loc(self.loc);
        let result = f(&mut b);
        self.at = b.insertion_point();
        result
    }

    /// Runs `f` with the insertion point at the end of `block`.
    pub(crate) fn in_block<R>(
        &mut self,
        block: HwBlockId,
        f: impl FnOnce(&mut Self) -> LowerResult<R>,
    ) -> LowerResult<R> {
        let saved = std::mem::replace(&mut self.at, InsertPoint::End(block));
        let result = f(self);
        self.at = saved;
        result
    }

    pub(crate) fn current_block(&self) -> HwBlockId {
        match self.at {
            InsertPoint::Start(block) | InsertPoint::End(block) => block,
            InsertPoint::Before(op) | InsertPoint::After(op) => self.body.op(op).parent,
        }
    }

    pub(crate) fn name_of(&self, op: &Operation) -> &'a str {
        op.attrs
            .name
            .map(|n| self.ctx.interner.resolve(n))
            .unwrap_or("")
    }

    /// Returns `true` if the declaration must keep its name through
    /// later optimizations.
    pub(crate) fn wants_symbol(op: &Operation) -> bool {
        has_dont_touch(&op.attrs.annotations) || op.attrs.name_kind == NameKind::Interesting
    }

    /// A fresh inner symbol `__<module>__<name>`.
    pub(crate) fn inner_sym(&mut self, name: &str) -> Ident {
        let base = format!("__{}__{name}", self.module_name);
        let mut candidate = base.clone();
        let mut n = 0;
        while !self.syms.insert(candidate.clone()) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        self.interner().get_or_intern(&candidate)
    }

    /// The structural type of `ty`; an unknown width is a user error.
    pub(crate) fn hw_type(&self, ty: &FType) -> LowerResult<HwType> {
        lower_type(ty).ok_or_else(|| {
            let what = format!("the result of `{}`", self.current);
            self.report(errors::error_unknown_width(&what, self.loc))
        })
    }

    pub(crate) fn set(&mut self, value: ValueId, lowered: Option<HwValueId>) -> LowerResult<()> {
        if self.lowered.insert(value, lowered).is_some() {
            return Err(InternalError::new(format!("value {} lowered twice", value.as_raw())).into());
        }
        Ok(())
    }

    pub(crate) fn is_lowered(&self, value: ValueId) -> bool {
        self.lowered.contains_key(&value)
    }

    /// The lowering of `value`, which may be a net.
    pub(crate) fn possibly_inout(&self, value: ValueId) -> LowerResult<Option<HwValueId>> {
        self.lowered.get(&value).copied().ok_or_else(|| {
            InternalError::new(format!("value {} used before it was lowered", value.as_raw())).into()
        })
    }

    /// The lowering of `value`, reading nets.
    pub(crate) fn lowered(&mut self, value: ValueId) -> LowerResult<Option<HwValueId>> {
        Ok(match self.possibly_inout(value)? {
            Some(v) if self.body.value_type(v).is_inout() => Some(self.read_value(v)),
            other => other,
        })
    }

    /// The lowering of `value`, with a one-bit zero for zero-width values.
    pub(crate) fn lowered_or_zero(&mut self, value: ValueId) -> LowerResult<HwValueId> {
        match self.lowered(value)? {
            Some(v) => Ok(v),
            None => Ok(self.int(1, 0)),
        }
    }

    /// A cached literal at the front of the body.
    pub(crate) fn int_constant(&mut self, value: LogicVec) -> HwValueId {
        if let Some(&v) = self.constants.get(&value) {
            return v;
        }
        let entry = self.body.entry;
        let v = HwBuilder::new(&mut self.body, InsertPoint::Start(entry)).constant(value.clone());
        self.constants.insert(value, v);
        v
    }

    pub(crate) fn int(&mut self, width: u32, value: u64) -> HwValueId {
        self.int_constant(LogicVec::from_u64(value, width))
    }

    pub(crate) fn all_ones(&mut self, width: u32) -> HwValueId {
        self.int_constant(LogicVec::all_one(width))
    }

    pub(crate) fn width(&self, value: HwValueId) -> u32 {
        self.body.value_type(value).bit_width()
    }

    /// `value ^ all-ones`.
    pub(crate) fn not(&mut self, value: HwValueId) -> HwValueId {
        let ones = self.all_ones(self.width(value));
        self.build(|b| b.comb(CombOp::Xor, value, ones))
    }

    /// The cached read of `net`, placed right after the net is defined.
    pub(crate) fn read_value(&mut self, net: HwValueId) -> HwValueId {
        if let Some(&r) = self.reads.get(&net) {
            return r;
        }
        let read = match self.body.defining_op(net) {
            Some(def) if matches!(self.body.op(def).kind, HwOpKind::ArrayIndexInOut) => {
                let (array, index) = (self.body.op(def).operands[0], self.body.op(def).operands[1]);
                let array = self.read_value(array);
                HwBuilder::new(&mut self.body, InsertPoint::After(def)).array_get(array, index)
            }
            Some(def) => HwBuilder::new(&mut self.body, InsertPoint::After(def)).read(net),
            None => {
                let entry = self.body.entry;
                HwBuilder::new(&mut self.body, InsertPoint::Start(entry)).read(net)
            }
        };
        self.reads.insert(net, read);
        read
    }

    /// Sign- or zero-extends an integer to `width` bits.
    pub(crate) fn extend_int(&mut self, value: HwValueId, signed: bool, width: u32) -> HwValueId {
        let w = self.width(value);
        if w == width {
            return value;
        }
        if w == 0 {
            return self.int(width, 0);
        }
        if signed {
            self.build(|b| {
                let sign = b.extract(value, w - 1, 1);
                let fill = b.value(HwOpKind::Replicate, vec![sign], HwType::Int(width - w));
                b.concat(vec![fill, value])
            })
        } else {
            let zeros = self.int(width - w, 0);
            self.build(|b| b.concat(vec![zeros, value]))
        }
    }

    /// Old value `value` converted to type `dest`, extending integers by
    /// the signedness of the source. A source wider than `dest` is a user
    /// error. Returns `None` only when `dest` has zero width.
    pub(crate) fn extended(&mut self, value: ValueId, dest: &FType) -> LowerResult<Option<HwValueId>> {
        let dest_hw = self.hw_type(dest)?;
        let dest_width = dest_hw.bit_width();
        let Some(v) = self.lowered(value)? else {
            if dest_width == 0 {
                return Ok(None);
            }
            let zero = self.int(dest_width, 0);
            return Ok(Some(match dest_hw {
                HwType::Int(_) => zero,
                other => self.build(|b| b.value(HwOpKind::Bitcast, vec![zero], other)),
            }));
        };
        let src = self.old.value_type(value).clone();
        self.convert(v, &src, dest).map(Some)
    }

    fn convert(&mut self, value: HwValueId, src: &FType, dest: &FType) -> LowerResult<HwValueId> {
        let dest_hw = self.hw_type(dest)?;
        if self.body.value_type(value) == &dest_hw {
            return Ok(value);
        }
        match (src, dest) {
            (FType::Vector(se, sn), FType::Vector(de, dn)) if sn == dn => {
                let iw = index_width(u64::from(*dn));
                let mut elements = Vec::with_capacity(*dn as usize);
                for i in 0..*dn {
                    let idx = self.int(iw, u64::from(i));
                    let e = self.build(|b| b.array_get(value, idx));
                    elements.push(self.convert(e, se, de)?);
                }
                elements.reverse();
                Ok(self.build(|b| b.array_create(elements)))
            }
            (FType::Bundle(sf), FType::Bundle(df)) if sf.len() == df.len() => {
                let mut fields = Vec::with_capacity(df.len());
                for (i, (s, d)) in sf.iter().zip(df).enumerate() {
                    let ty = self
                        .body
                        .value_type(value)
                        .struct_field(i)
                        .map(|f| f.ty.clone())
                        .ok_or_else(|| InternalError::new(format!("no field {i} to extend")))?;
                    let e = self.build(|b| b.value(HwOpKind::StructExtract(i as u32), vec![value], ty));
                    fields.push(self.convert(e, &s.ty, &d.ty)?);
                }
                Ok(self.build(|b| b.value(HwOpKind::StructCreate, fields, dest_hw)))
            }
            _ => {
                let (w, dw) = (self.width(value), dest_hw.bit_width());
                if !matches!(dest_hw, HwType::Int(_)) {
                    let shown = dest.display(self.interner());
                    return Err(InternalError::new(format!("cannot convert a value to `{shown}`")).into());
                }
                if w > dw {
                    return Err(self.report(errors::error_truncation(w, dw, self.loc)));
                }
                Ok(self.extend_int(value, src.is_signed(), dw))
            }
        }
    }

    /// Old value `value` extended or truncated to the width of ground type
    /// `dest`; aggregates are only extended.
    pub(crate) fn ext_or_trunc(&mut self, value: ValueId, dest: &FType) -> LowerResult<Option<HwValueId>> {
        if !dest.is_ground() {
            return self.extended(value, dest);
        }
        let dw = self.hw_type(dest)?.bit_width();
        match self.lowered(value)? {
            None if dw == 0 => Ok(None),
            None => Ok(Some(self.int(dw, 0))),
            Some(v) if self.width(v) > dw => Ok(Some(self.build(|b| b.extract(v, 0, dw)))),
            Some(_) => self.extended(value, dest),
        }
    }

    /// Reads `array[index]`, padding arrays whose length is not a power of
    /// two with copies of element 0 so every index is in bounds.
    pub(crate) fn array_index(&mut self, array: HwValueId, index: HwValueId) -> LowerResult<HwValueId> {
        let (elem, size) = self
            .body
            .value_type(array)
            .as_array()
            .map(|(e, n)| (e.clone(), n))
            .ok_or_else(|| InternalError::new("indexing into a non-array value"))?;
        if size <= 1 || self.ctx.options.strip_mux_pragmas {
            return Ok(self.build(|b| b.array_get(array, index)));
        }
        let mut padded = array;
        if !size.is_power_of_two() {
            let extra = size.next_power_of_two() - size;
            let zero = self.int(self.width(index), 0);
            padded = self.build(|b| {
                let first = b.array_get(array, zero);
                let fill = b.array_create(vec![first; extra as usize]);
                b.value(
                    HwOpKind::ArrayConcat,
                    vec![fill, array],
                    HwType::array(elem.clone(), size.next_power_of_two()),
                )
            });
        }
        let name = self.interner().get_or_intern("multibit_mux");
        Ok(self.build(|b| {
            let get = b.value(HwOpKind::ArrayGet, vec![padded, index], elem.clone());
            let get_op = b.body().defining_op(get);
            if let Some(op) = get_op {
                b.body().op_mut(op).attrs.sv_attributes.push("cadence map_to_mux".to_string());
            }
            let wire = b.named_wire(elem, name);
            let assign = b.assign(wire, get);
            b.body()
                .op_mut(assign)
                .attrs
                .sv_attributes
                .push("synopsys infer_mux_override".to_string());
            b.read(wire)
        }))
    }

    /// The `ifdef` blocks for `cond` in the current block, created on
    /// first use and moved to the insertion point after that.
    pub(crate) fn ifdef_blocks(&mut self, cond: &str) -> (HwBlockId, HwBlockId) {
        let key = (self.current_block(), cond.to_string());
        if let Some(&(op, then_block, else_block)) = self.ifdef_blocks.get(&key) {
            self.move_here(op);
            return (then_block, else_block);
        }
        let (op, then_block, else_block) = self.build(|b| b.ifdef(cond));
        self.ifdef_blocks.insert(key, (op, then_block, else_block));
        (then_block, else_block)
    }

    /// The body of the `initial` block of the current block.
    pub(crate) fn initial_block(&mut self) -> HwBlockId {
        let key = self.current_block();
        if let Some(&(op, block)) = self.initial_blocks.get(&key) {
            self.move_here(op);
            return block;
        }
        let (op, block) = self.build(|b| b.initial());
        self.initial_blocks.insert(key, (op, block));
        block
    }

    /// The `always` block for a clock and optional reset.
    ///
    /// Returns the block for the clocked logic and, with a reset, the block
    /// taken while the reset is asserted.
    pub(crate) fn always_block(
        &mut self,
        clock_edge: EventControl,
        clock: HwValueId,
        reset: Option<(ResetStyle, EventControl, HwValueId)>,
    ) -> LowerResult<(HwBlockId, Option<HwBlockId>)> {
        let key = AlwaysKey {
            block: self.current_block(),
            clock_edge,
            clock,
            reset,
        };
        if let Some(&(op, main, on_reset)) = self.always_blocks.get(&key) {
            self.move_here(op);
            return Ok((main, on_reset));
        }
        let mut events = vec![(clock_edge, clock)];
        if let Some((ResetStyle::Async, edge, signal)) = reset {
            events.push((edge, signal));
        }
        let (op, block) = self.build(|b| b.always(events));
        let (main, on_reset) = match reset {
            Some((_, _, signal)) => {
                let (_, then_block, else_block) =
                    HwBuilder::new(&mut self.body, InsertPoint::End(block)).if_(signal, true);
                let else_block =
                    else_block.ok_or_else(|| InternalError::new("reset `if` without an else block"))?;
                (else_block, Some(then_block))
            }
            None => (block, None),
        };
        self.always_blocks.insert(key, (op, main, on_reset));
        Ok((main, on_reset))
    }

    /// The then block of an `if (cond)`, reusing an `if` on the same
    /// condition that ends the current block.
    pub(crate) fn if_block(&mut self, cond: HwValueId) -> HwBlockId {
        if let InsertPoint::End(block) = self.at {
            if let Some(&last) = self.body.block_ops(block).last() {
                let op = self.body.op(last);
                if matches!(op.kind, HwOpKind::If) && op.operands == [cond] && op.regions.len() == 1 {
                    return op.regions[0];
                }
            }
        }
        let (_, then_block, _) = self.build(|b| b.if_(cond, false));
        then_block
    }

    fn move_here(&mut self, op: HwOpId) {
        self.body.move_op(op, self.at);
        self.at = self.at.advance(op);
    }

    fn setup_ports(&mut self, ports: &LoweredPorts) -> LowerResult<Vec<(u32, OutputSource)>> {
        let old = self.old;
        let interner = self.interner();
        let mut outputs = Vec::new();
        for (i, (&arg, port)) in old.args.iter().zip(&self.module.ports).enumerate() {
            let Some(pi) = ports.index[i] else {
                self.set(arg, None)?;
                continue;
            };
            let hw = &ports.ports[pi];
            if hw.direction != PortDirection::Output {
                let value = self.body.args[hw.arg_index as usize];
                self.set(arg, Some(value))?;
                continue;
            }
            if let Some((connect, src)) = self.single_output_driver(arg) {
                self.skip.insert(connect);
                outputs.push((hw.arg_index, OutputSource::Driver(src, port.ty.clone())));
                continue;
            }
            let name = interner.get_or_intern(&format!(".{}.output", interner.resolve(port.name)));
            let ty = hw.ty.clone();
            let wire = self.build(|b| b.named_wire(ty, name));
            self.tmp_wires.push(wire);
            self.set(arg, Some(wire))?;
            outputs.push((hw.arg_index, OutputSource::Net(wire)));
        }
        Ok(outputs)
    }

    /// The connect and source of an output port driven by exactly one
    /// top-level connect and used nowhere else.
    fn single_output_driver(&self, arg: ValueId) -> Option<(OpId, ValueId)> {
        let [only] = self.uses.uses(arg) else {
            return None;
        };
        let op = &self.old.ops[only.op];
        let is_connect = matches!(op.kind, OpKind::Connect | OpKind::StrictConnect);
        if !is_connect || only.operand != 0 || !self.old.is_top_level(only.op) {
            return None;
        }
        let src = op.operands[1];
        let named = self
            .old
            .defining_op(src)
            .is_some_and(|def| self.old.ops[def].attrs.debug_name.is_some());
        (!named).then_some((only.op, src))
    }

    fn finish_outputs(&mut self, sources: Vec<(u32, OutputSource)>, count: usize) -> LowerResult<()> {
        let mut outputs = vec![None; count];
        for (index, source) in sources {
            let value = match source {
                OutputSource::Driver(src, ty) => self
                    .extended(src, &ty)?
                    .ok_or_else(|| InternalError::new("output driven by a zero-width value"))?,
                OutputSource::Net(net) => self.read_value(net),
            };
            let slot = outputs
                .get_mut(index as usize)
                .ok_or_else(|| InternalError::new(format!("output index {index} out of range")))?;
            *slot = Some(value);
        }
        self.body.outputs = outputs
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.ok_or_else(|| InternalError::new(format!("output {i} has no value"))))
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    /// Emits the update logic of every register.
    fn finish_registers(&mut self) -> LowerResult<()> {
        for reg in std::mem::take(&mut self.regs) {
            let reset = reg
                .reset
                .map(|(style, signal, _)| (style, EventControl::Posedge, signal));
            let (main, on_reset) = self.always_block(EventControl::Posedge, reg.clock, reset)?;
            if reg.next != reg.hold {
                self.in_block(main, |this| {
                    this.build(|b| b.passign(reg.reg, reg.next));
                    Ok(())
                })?;
            }
            if let (Some(block), Some((_, _, init))) = (on_reset, reg.reset) {
                self.in_block(block, |this| {
                    this.build(|b| b.passign(reg.reg, init));
                    Ok(())
                })?;
            }
        }
        Ok(())
    }

    /// Replaces temporary wires written once at the top level by the value
    /// written.
    fn optimize_temporary_wires(&mut self) {
        for wire in std::mem::take(&mut self.tmp_wires) {
            let Some(decl) = self.body.defining_op(wire) else {
                continue;
            };
            if !self.body.is_linked(decl) || self.body.op(decl).attrs.debug_name.is_some() {
                continue;
            }
            let (mut reads, mut writes, mut other) = (Vec::new(), Vec::new(), false);
            for user in self.body.users(wire) {
                let op = self.body.op(user);
                match op.kind {
                    HwOpKind::ReadInOut => reads.push(user),
                    HwOpKind::Assign if op.operands[0] == wire && op.operands[1] != wire => writes.push(user),
                    _ => other = true,
                }
            }
            let &[write] = writes.as_slice() else {
                continue;
            };
            if other || self.body.op(write).parent != self.body.entry {
                continue;
            }
            let src = self.body.op(write).operands[1];
            if reads.iter().any(|&r| self.body.op(r).results[0] == src) {
                continue;
            }
            for read in reads {
                let value = self.body.op(read).results[0];
                self.body.replace_all_uses(value, src);
                self.body.erase(read);
            }
            self.body.erase(write);
            self.body.erase(decl);
        }
    }

    fn lower_op(&mut self, id: OpId) -> LowerResult<()> {
        let old = self.old;
        let op: &'a Operation = &old.ops[id];
        self.loc = op.loc;
        self.current = op.kind.mnemonic();
        if self.skip.contains(&id) || op.result().is_some_and(|r| self.is_lowered(r)) {
            return Ok(());
        }
        trace!("lowering `{}` in {}", self.current, self.module_name);
        if op.kind.is_expression() {
            if let Some(result) = op.result() {
                let ty = old.value_type(result);
                if self.hw_type(ty)?.bit_width() == 0 && !matches!(ty, FType::Analog(_)) {
                    return self.set(result, None);
                }
            }
        }
        match &op.kind {
            OpKind::Wire => self.lower_wire(op),
            OpKind::Node => self.lower_node(op),
            OpKind::Reg | OpKind::RegReset => self.lower_reg(op),
            OpKind::Mem(decl) => self.lower_mem(op, decl),
            OpKind::Instance(decl) => self.lower_instance(op, decl),
            OpKind::Connect | OpKind::StrictConnect => self.lower_connect(op),
            OpKind::Printf { format } => self.lower_printf(op, format),
            OpKind::Stop { exit_code } => self.lower_stop(op, *exit_code),
            OpKind::Verif(decl) => self.lower_verif(op, decl),
            OpKind::Attach => self.lower_attach(op),
            OpKind::Probe => self.lower_probe(op),
            OpKind::Skip => Ok(()),
            OpKind::When => Err(self.report(errors::error_when(op.loc))),
            OpKind::RefSub(_) => Err(self.report(errors::error_unhandled(self.current, op.loc))),
            _ => self.lower_expr(op),
        }
    }
}
