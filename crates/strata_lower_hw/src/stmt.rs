//! Connects, prints, stops, attaches and probes.

use crate::errors;
use crate::header::Macro;
use crate::lower::{BodyLowering, LowerResult};
use strata_common::InternalError;
use strata_hw::{CombOp, HwOpAttrs, HwOpKind, HwType, HwValueId, ICmpPredicate};
use strata_ir::types::index_width;
use strata_ir::{EventControl, OpKind, Operation, ValueId};

/// One step from a register to the part of it a connect drives.
#[derive(Clone, Copy, Debug)]
enum PathStep {
    Field(u32),
    Index(u32),
    /// A dynamic index; `None` for a zero-width index, which selects
    /// element 0.
    Dynamic(Option<HwValueId>),
}

impl<'a> BodyLowering<'a> {
    pub(crate) fn lower_connect(&mut self, op: &'a Operation) -> LowerResult<()> {
        let (dest, src) = (op.operands[0], op.operands[1]);
        let strict = matches!(op.kind, OpKind::StrictConnect);
        let src_val = if strict {
            self.lowered(src)?
        } else {
            let dest_ty = self.old.value_type(dest).clone();
            self.extended(src, &dest_ty)?
        };
        let Some(src_val) = src_val else {
            return Ok(());
        };

        if let Some((reg, path)) = self.register_path(dest)? {
            let next = self.inject(self.regs[reg].next, &path, src_val)?;
            self.regs[reg].next = next;
            return Ok(());
        }

        let dest_val = self
            .possibly_inout(dest)?
            .ok_or_else(|| InternalError::new("connect to a value without width"))?;
        if strict && self.backedges.update(dest_val, src_val) {
            return Ok(());
        }
        if !self.body.value_type(dest_val).is_inout() {
            return Err(self.report(errors::error_not_inout("destination", op.loc)));
        }
        let assign = self.build(|b| b.assign(dest_val, src_val));
        self.body.op_mut(assign).attrs.debug_name = op.attrs.debug_name.clone();
        Ok(())
    }

    /// The register `dest` is part of and the steps leading from the
    /// register to `dest`, outermost first.
    fn register_path(&mut self, dest: ValueId) -> LowerResult<Option<(usize, Vec<PathStep>)>> {
        let old = self.old;
        let mut steps = Vec::new();
        let mut value = dest;
        loop {
            if let Some(&reg) = self.reg_index.get(&value) {
                steps.reverse();
                return Ok(Some((reg, steps)));
            }
            let Some(def) = old.defining_op(value) else {
                return Ok(None);
            };
            let op = &old.ops[def];
            let step = match op.kind {
                OpKind::Subfield(i) => PathStep::Field(i),
                OpKind::Subindex(i) => PathStep::Index(i),
                OpKind::Subaccess => PathStep::Dynamic(self.lowered(op.operands[1])?),
                _ => return Ok(None),
            };
            steps.push(step);
            value = op.operands[0];
        }
    }

    /// `base` with the part at `path` replaced by `src`.
    fn inject(&mut self, base: HwValueId, path: &[PathStep], src: HwValueId) -> LowerResult<HwValueId> {
        let Some((&step, rest)) = path.split_first() else {
            return Ok(src);
        };
        let ty = self.body.value_type(base).clone();
        match step {
            PathStep::Field(i) => {
                let field_ty = ty
                    .struct_field(i as usize)
                    .map(|f| f.ty.clone())
                    .ok_or_else(|| InternalError::new(format!("register has no field {i}")))?;
                let value = if rest.is_empty() {
                    src
                } else {
                    let old = self.build(|b| b.value(HwOpKind::StructExtract(i), vec![base], field_ty));
                    self.inject(old, rest, src)?
                };
                Ok(self.build(|b| b.value(HwOpKind::StructInject(i), vec![base, value], ty)))
            }
            PathStep::Index(i) => self.inject_element(base, i, rest, src),
            PathStep::Dynamic(None) => self.inject_element(base, 0, rest, src),
            PathStep::Dynamic(Some(index)) => {
                let size = Self::array_len(&ty)?;
                let iw = index_width(u64::from(size));
                let key_width = self.width(index);
                let mut elements = Vec::with_capacity(size as usize);
                for i in 0..size {
                    let at = self.int(iw, u64::from(i));
                    let old = self.build(|b| b.array_get(base, at));
                    if key_width < 32 && i >= 1 << key_width {
                        elements.push(old);
                        continue;
                    }
                    let new = self.inject(old, rest, src)?;
                    let key = self.int(key_width, u64::from(i));
                    let element = self.build(|b| {
                        let hit = b.icmp(ICmpPredicate::Eq, index, key);
                        b.mux(hit, new, old)
                    });
                    elements.push(element);
                }
                elements.reverse();
                Ok(self.build(|b| b.array_create(elements)))
            }
        }
    }

    /// `base` with element `index` replaced, slicing around it.
    fn inject_element(
        &mut self,
        base: HwValueId,
        index: u32,
        rest: &[PathStep],
        src: HwValueId,
    ) -> LowerResult<HwValueId> {
        let ty = self.body.value_type(base).clone();
        let size = Self::array_len(&ty)?;
        let elem = ty.element().as_array().map(|(e, _)| e.clone()).unwrap_or(HwType::Int(0));
        let iw = index_width(u64::from(size));
        let value = if rest.is_empty() {
            src
        } else {
            let at = self.int(iw, u64::from(index));
            let old = self.build(|b| b.array_get(base, at));
            self.inject(old, rest, src)?
        };
        if size == 1 {
            return Ok(self.build(|b| b.array_create(vec![value])));
        }
        let mut parts = Vec::with_capacity(3);
        if index + 1 != size {
            let low = self.int(iw, u64::from(index + 1));
            let upper = HwType::array(elem.clone(), size - index - 1);
            parts.push(self.build(|b| b.value(HwOpKind::ArraySlice, vec![base, low], upper)));
        }
        parts.push(self.build(|b| b.array_create(vec![value])));
        if index != 0 {
            let zero = self.int(iw, 0);
            let lower = HwType::array(elem, index);
            parts.push(self.build(|b| b.value(HwOpKind::ArraySlice, vec![base, zero], lower)));
        }
        Ok(self.build(|b| b.value(HwOpKind::ArrayConcat, parts, ty)))
    }

    fn array_len(ty: &HwType) -> LowerResult<u32> {
        ty.as_array()
            .map(|(_, n)| n)
            .ok_or_else(|| InternalError::new("indexing into a non-array register").into())
    }

    /// `$fwrite` to stderr under `PRINTF_COND_`, outside synthesis.
    pub(crate) fn lower_printf(&mut self, op: &'a Operation, format: &str) -> LowerResult<()> {
        let clock = self.required(op.operands[0])?;
        let cond = self.required(op.operands[1])?;
        let mut operands = Vec::with_capacity(op.operands.len() - 1);
        operands.push(self.int(32, 0x8000_0002));
        for &arg in &op.operands[2..] {
            operands.push(self.lowered_or_zero(arg)?);
        }
        let kind = HwOpKind::FWrite {
            format: format.to_string(),
        };
        self.ctx.usage.mark(Macro::PrintfCond);
        self.clocked_under_macro(clock, cond, "PRINTF_COND_", |this| {
            this.build(|b| b.stmt(kind, operands));
            Ok(())
        })
    }

    /// `$fatal` or `$finish` under `STOP_COND_`, outside synthesis.
    pub(crate) fn lower_stop(&mut self, op: &'a Operation, exit_code: i32) -> LowerResult<()> {
        let clock = self.required(op.operands[0])?;
        let cond = self.required(op.operands[1])?;
        let kind = if exit_code != 0 {
            HwOpKind::Fatal
        } else {
            HwOpKind::Finish
        };
        self.ctx.usage.mark(Macro::StopCond);
        self.clocked_under_macro(clock, cond, "STOP_COND_", |this| {
            this.build(|b| b.stmt(kind, vec![]));
            Ok(())
        })
    }

    /// Runs `f` in `if (`<cond_macro> & cond)` of the `always @(posedge
    /// clock)` block inside `ifndef SYNTHESIS`.
    fn clocked_under_macro(
        &mut self,
        clock: HwValueId,
        cond: HwValueId,
        cond_macro: &str,
        f: impl FnOnce(&mut Self) -> LowerResult<()>,
    ) -> LowerResult<()> {
        let (_, not_synthesis) = self.ifdef_blocks("SYNTHESIS");
        self.in_block(not_synthesis, |this| {
            let (main, _) = this.always_block(EventControl::Posedge, clock, None)?;
            this.in_block(main, |this| {
                let guard = this.build(|b| {
                    let enabled = b.macro_ref(cond_macro, 1);
                    b.comb(CombOp::And, enabled, cond)
                });
                let then_block = this.if_block(guard);
                this.in_block(then_block, f)
            })
        })
    }

    /// The only attached operand that is neither zero-width nor an
    /// instance port, if it has no other use.
    pub(crate) fn single_non_instance_operand(&self, attach: &Operation) -> Option<ValueId> {
        let old = self.old;
        let mut single = None;
        for &v in &attach.operands {
            let from_instance = old
                .defining_op(v)
                .is_some_and(|d| matches!(old.ops[d].kind, OpKind::Instance(_)));
            if old.value_type(v).bit_width() == Some(0) || from_instance {
                continue;
            }
            if self.uses.uses(v).len() != 1 || single.is_some() {
                return None;
            }
            single = Some(v);
        }
        single
    }

    /// Shorts analog nets: pairwise assigns for synthesis, an `alias`
    /// otherwise.
    pub(crate) fn lower_attach(&mut self, op: &'a Operation) -> LowerResult<()> {
        if op.operands.len() < 2 {
            return Ok(());
        }
        let mut nets = Vec::with_capacity(op.operands.len());
        for &v in &op.operands {
            let Some(net) = self.possibly_inout(v)? else {
                continue;
            };
            if !self.body.value_type(net).is_inout() {
                return Err(self.report(errors::error_not_inout("attached operand", op.loc)));
            }
            if !nets.contains(&net) {
                nets.push(net);
            }
        }
        if nets.len() < 2 {
            return Ok(());
        }

        let (synthesis, not_synthesis) = self.ifdef_blocks("SYNTHESIS");
        self.in_block(synthesis, |this| {
            let reads: Vec<HwValueId> = nets.iter().map(|&n| this.read_value(n)).collect();
            for (i, &dest) in nets.iter().enumerate() {
                for (j, &value) in reads.iter().enumerate() {
                    if i != j {
                        this.build(|b| b.assign(dest, value));
                    }
                }
            }
            Ok(())
        })?;
        self.in_block(not_synthesis, |this| {
            let (_, verilator, otherwise) = this.build(|b| b.ifdef("verilator"));
            this.in_block(verilator, |this| {
                let message = "`error \"Verilator does not support alias and thus cannot arbitrarily \
                               connect bidirectional wires and ports\"";
                this.build(|b| b.stmt(HwOpKind::Verbatim(message.to_string()), vec![]));
                Ok(())
            })?;
            this.in_block(otherwise, |this| {
                this.build(|b| b.stmt(HwOpKind::Alias, nets));
                Ok(())
            })
        })
    }

    pub(crate) fn lower_probe(&mut self, op: &'a Operation) -> LowerResult<()> {
        let mut operands = Vec::with_capacity(op.operands.len());
        for &v in &op.operands {
            operands.push(self.lowered_or_zero(v)?);
        }
        let attrs = HwOpAttrs {
            sym: op.attrs.sym,
            ..HwOpAttrs::default()
        };
        self.build(|b| b.op(HwOpKind::Probe, operands, vec![], attrs));
        Ok(())
    }
}

