//! Declarations: wires, nodes, registers and instances.

use crate::errors;
use crate::lower::{BodyLowering, LowerResult, RegState, ResetStyle};
use strata_common::{Ident, InternalError};
use strata_hw::{Bind, HwInstance, HwOpAttrs, HwOpKind, HwType, HwValueId, PortDirection};
use strata_ir::{FType, InstanceDecl, OpKind, Operation, ValueId};

impl<'a> BodyLowering<'a> {
    /// Attributes for a declaration carrying symbol `sym`.
    fn decl_attrs(op: &Operation, sym: Option<Ident>) -> HwOpAttrs {
        HwOpAttrs {
            name: op.attrs.name,
            sym,
            sv_attributes: Vec::new(),
            debug_name: op.attrs.debug_name.clone(),
        }
    }

    fn kept_sym(&mut self, op: &Operation) -> Option<Ident> {
        op.attrs.sym.or_else(|| {
            Self::wants_symbol(op)
                .then(|| self.name_of(op))
                .filter(|name| !name.is_empty())
                .map(|name| self.inner_sym(name))
        })
    }

    pub(crate) fn lower_wire(&mut self, op: &'a Operation) -> LowerResult<()> {
        let result = op.results[0];
        let ty = self.hw_type(self.old.value_type(result))?;
        if ty.bit_width() == 0 {
            return self.set(result, None);
        }
        let sym = self.kept_sym(op);
        let attrs = Self::decl_attrs(op, sym);
        let wire = self.build(|b| b.wire(ty, attrs));
        self.set(result, Some(wire))
    }

    pub(crate) fn lower_node(&mut self, op: &'a Operation) -> LowerResult<()> {
        let result = op.results[0];
        let Some(input) = self.lowered(op.operands[0])? else {
            return self.set(result, None);
        };
        let keep = op.attrs.sym.is_some() || op.attrs.debug_name.is_some() || Self::wants_symbol(op);
        if !keep {
            return self.set(result, Some(input));
        }
        let sym = self.kept_sym(op);
        let attrs = Self::decl_attrs(op, sym);
        let ty = self.body.value_type(input).clone();
        let wire = self.build(|b| {
            let wire = b.wire(ty, attrs);
            b.assign(wire, input);
            wire
        });
        let read = self.read_value(wire);
        self.set(result, Some(read))
    }

    /// A register and, unless disabled, its randomized initial value.
    ///
    /// The update logic is emitted once the whole body is lowered, since
    /// the connects driving it come later.
    pub(crate) fn lower_reg(&mut self, op: &'a Operation) -> LowerResult<()> {
        let result = op.results[0];
        let rty = self.old.value_type(result).clone();
        let ty = self.hw_type(&rty)?;
        if ty.bit_width() == 0 {
            return self.set(result, None);
        }
        let clock = self.lowered_or_zero(op.operands[0])?;
        let reset = if matches!(op.kind, OpKind::RegReset) {
            let style = match self.old.value_type(op.operands[1]) {
                FType::AsyncReset => ResetStyle::Async,
                _ => ResetStyle::Sync,
            };
            let signal = self.lowered_or_zero(op.operands[1])?;
            let init = self
                .ext_or_trunc(op.operands[2], &rty)?
                .ok_or_else(|| InternalError::new("register reset value has no width"))?;
            Some((style, signal, init))
        } else {
            None
        };
        let sym = op
            .attrs
            .sym
            .or_else(|| Self::wants_symbol(op).then_some(op.attrs.name).flatten());
        let attrs = Self::decl_attrs(op, sym);
        let reg = self.build(|b| b.value_with(HwOpKind::Reg, vec![], HwType::inout(ty.clone()), attrs));
        let hold = self.read_value(reg);
        self.reg_index.insert(result, self.regs.len());
        self.regs.push(RegState {
            reg,
            clock,
            reset,
            next: hold,
            hold,
        });
        if !self.ctx.options.disable_reg_randomization {
            self.randomize_register(reg, ty)?;
        }
        self.set(result, Some(reg))
    }

    /// `reg = random` in the initial block guarded by `RANDOMIZE_REG_INIT`,
    /// outside synthesis.
    fn randomize_register(&mut self, reg: HwValueId, ty: HwType) -> LowerResult<()> {
        self.ctx.usage.mark(crate::header::Macro::RandomizeRegInit);
        let (_, not_synthesis) = self.ifdef_blocks("SYNTHESIS");
        self.in_block(not_synthesis, |this| {
            let initial = this.initial_block();
            this.in_block(initial, |this| {
                let (then_block, _) = this.ifdef_blocks("RANDOMIZE_REG_INIT");
                this.in_block(then_block, |this| {
                    if this.body.block_ops(then_block).is_empty() {
                        this.build(|b| b.stmt(HwOpKind::Verbatim("`INIT_RANDOM_PROLOG_".to_string()), vec![]));
                    }
                    let width = ty.bit_width();
                    let random = this.build(|b| {
                        let words: Vec<HwValueId> =
                            (0..width.div_ceil(32)).map(|_| b.macro_ref("RANDOM", 32)).collect();
                        let bits = if words.len() == 1 { words[0] } else { b.concat(words) };
                        let bits = if b.width(bits) == width {
                            bits
                        } else {
                            b.extract(bits, 0, width)
                        };
                        match ty {
                            HwType::Int(_) => bits,
                            other => b.value(HwOpKind::Bitcast, vec![bits], other),
                        }
                    });
                    this.build(|b| b.stmt(HwOpKind::BPAssign, vec![reg, random]));
                    Ok(())
                })
            })
        })
    }

    pub(crate) fn lower_instance(&mut self, op: &'a Operation, decl: &'a InstanceDecl) -> LowerResult<()> {
        let (ctx, interner) = (self.ctx, self.interner());
        let Some(callee) = ctx.signature(decl.module) else {
            let diag = errors::error_unknown_module(interner.resolve(decl.module), op.loc);
            return Err(self.report(diag));
        };
        if callee.index.len() != op.results.len() {
            return Err(InternalError::new(format!(
                "instance of `{}` has {} results for {} ports",
                interner.resolve(decl.module),
                op.results.len(),
                callee.index.len()
            ))
            .into());
        }
        let mut args: Vec<_> = callee.ports.iter().filter(|p| p.is_argument()).collect();
        args.sort_by_key(|p| p.arg_index);
        let arg_names: Vec<Ident> = args.iter().map(|p| p.name).collect();
        let mut operands: Vec<Option<HwValueId>> = vec![None; arg_names.len()];
        let mut outputs = Vec::new();
        for (&result, index) in op.results.iter().zip(&callee.index) {
            let Some(index) = *index else {
                self.set(result, None)?;
                continue;
            };
            let port = &callee.ports[index];
            let slot = port.arg_index as usize;
            match port.direction {
                PortDirection::Output => outputs.push((port.arg_index, port.name, port.ty.clone(), result)),
                PortDirection::Input => {
                    if self.uses.single_connect_user(self.old, result).is_some() {
                        let edge = self.backedges.create(&mut self.body, port.ty.clone());
                        self.set(result, Some(edge))?;
                        operands[slot] = Some(edge);
                    } else {
                        let wire = self.port_wire(port.name, port.ty.clone());
                        self.set(result, Some(wire))?;
                        operands[slot] = Some(self.read_value(wire));
                    }
                }
                PortDirection::InOut => {
                    let net = match self.attached_source(result)? {
                        Some(net) => net,
                        None => self.port_wire(port.name, port.ty.clone()),
                    };
                    self.set(result, Some(net))?;
                    operands[slot] = Some(net);
                }
            }
        }
        let operands = operands
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| InternalError::new("instance argument without a value"))?;
        outputs.sort_by_key(|o| o.0);

        let name = self.name_of(op);
        let sym = match (op.attrs.sym, decl.lower_to_bind) {
            (Some(sym), _) => Some(sym),
            (None, true) => Some(interner.get_or_intern(&format!("__{name}__"))),
            (None, false) => None,
        };
        if let (true, Some(sym)) = (decl.lower_to_bind, sym) {
            self.ctx.add_bind(Bind {
                module: self.module.name,
                instance: sym,
            });
        }
        let kind = HwOpKind::Instance(HwInstance {
            module: decl.module,
            arg_names,
            result_names: outputs.iter().map(|o| o.1).collect(),
            do_not_print: decl.lower_to_bind,
        });
        let attrs = HwOpAttrs {
            name: op.attrs.name,
            sym,
            sv_attributes: Vec::new(),
            debug_name: op.attrs.debug_name.clone(),
        };
        let types = outputs.iter().map(|o| o.2.clone()).collect();
        let inst = self.build(|b| b.op(kind, operands, types, attrs));
        let results = self.body.op(inst).results.clone();
        for (o, value) in outputs.into_iter().zip(results) {
            self.set(o.3, Some(value))?;
        }
        Ok(())
    }

    /// A temporary wire `.<port>.wire` standing in for an instance port.
    fn port_wire(&mut self, port: Ident, ty: HwType) -> HwValueId {
        let interner = self.interner();
        let name = interner.get_or_intern(&format!(".{}.wire", interner.resolve(port)));
        let wire = self.build(|b| b.named_wire(ty, name));
        self.tmp_wires.push(wire);
        wire
    }

    /// The net an analog instance port can be wired to directly: the one
    /// non-instance operand of the only attach using it.
    fn attached_source(&self, port: ValueId) -> LowerResult<Option<HwValueId>> {
        let [only] = self.uses.uses(port) else {
            return Ok(None);
        };
        let attach = &self.old.ops[only.op];
        if !matches!(attach.kind, OpKind::Attach) {
            return Ok(None);
        }
        let Some(source) = self.single_non_instance_operand(attach) else {
            return Ok(None);
        };
        if !self.is_lowered(source) {
            return Ok(None);
        }
        Ok(self
            .possibly_inout(source)?
            .filter(|&v| self.body.value_type(v).is_inout()))
    }
}
