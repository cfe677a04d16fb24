//! Assertions, assumptions and covers.
//!
//! A procedural statement becomes an immediate check inside
//! `always @(posedge clock) if (enable)`. A concurrent one becomes a
//! property sampled on its event, with the enable folded into the
//! predicate; an assert also gets a matching assume guarded by
//! `USE_PROPERTY_AS_CONSTRAINT`. The `IfElseFatal` format prints and stops
//! instead, unless asserts are emitted as properties. Guards wrap the
//! result in nested `ifdef`s, outermost first.

use crate::header::Macro;
use crate::lower::{BodyLowering, LowerResult};
use strata_hw::{CombOp, HwOpKind, HwValueId, HwVerif};
use strata_ir::{AssertFormat, EventControl, Operation, VerifDecl, VerifKind};

/// Operands and labels of one statement, lowered.
struct Check<'d> {
    decl: &'d VerifDecl,
    label: Option<String>,
    name: Option<&'d str>,
    message: Option<String>,
    message_ops: Vec<HwValueId>,
    clock: HwValueId,
    predicate: HwValueId,
    enable: HwValueId,
}

impl Check<'_> {
    fn verif(&self) -> HwVerif {
        HwVerif {
            kind: self.decl.kind,
            label: self.label.clone(),
            message: self.message.clone(),
        }
    }

    fn operands(&self, first: &[HwValueId]) -> Vec<HwValueId> {
        first.iter().chain(&self.message_ops).copied().collect()
    }
}

impl<'a> BodyLowering<'a> {
    pub(crate) fn lower_verif(&mut self, op: &'a Operation, decl: &'a VerifDecl) -> LowerResult<()> {
        let clock = self.required(op.operands[0])?;
        let predicate = self.required(op.operands[1])?;
        let enable = self.required(op.operands[2])?;

        let name = Some(self.name_of(op)).filter(|n| !n.is_empty());
        let label = name.map(|n| format!("{}__{n}", decl.kind.mnemonic()));
        let fatal_format = self.prints_and_stops(decl);

        let (message, message_ops) = if decl.kind != VerifKind::Cover && !decl.message.is_empty() {
            let mut ops = Vec::with_capacity(op.operands.len() - 3);
            for &arg in &op.operands[3..] {
                let mut value = self.lowered_or_zero(arg)?;
                if decl.concurrent && !fatal_format {
                    let ty = self.body.value_type(value).clone();
                    value = self.build(|b| b.value(HwOpKind::Sampled, vec![value], ty));
                }
                ops.push(value);
            }
            (Some(decl.message.clone()), ops)
        } else {
            (None, Vec::new())
        };

        let check = Check {
            decl,
            label,
            name,
            message,
            message_ops,
            clock,
            predicate,
            enable,
        };
        self.guarded(&decl.guards, |this| this.emit_check(&check))
    }

    /// Returns `true` if `decl` lowers to `$error` and `$fatal` rather
    /// than a property.
    fn prints_and_stops(&self, decl: &VerifDecl) -> bool {
        decl.concurrent && decl.format == AssertFormat::IfElseFatal && !self.ctx.options.emit_chisel_asserts_as_sva
    }

    /// Runs `f` inside the `ifdef` blocks for `guards`, outermost first.
    fn guarded<F>(&mut self, guards: &[String], f: F) -> LowerResult<()>
    where
        F: FnOnce(&mut Self) -> LowerResult<()>,
    {
        let Some((guard, rest)) = guards.split_first() else {
            return f(self);
        };
        let (then_block, _) = self.ifdef_blocks(guard);
        self.in_block(then_block, |this| this.guarded(rest, f))
    }

    fn emit_check(&mut self, check: &Check<'_>) -> LowerResult<()> {
        if !check.decl.concurrent {
            let (main, _) = self.always_block(EventControl::Posedge, check.clock, None)?;
            return self.in_block(main, |this| {
                let then_block = this.if_block(check.enable);
                this.in_block(then_block, |this| {
                    let operands = check.operands(&[check.predicate]);
                    this.build(|b| b.stmt(HwOpKind::Verif(check.verif()), operands));
                    Ok(())
                })
            });
        }
        if self.prints_and_stops(check.decl) {
            return self.emit_if_else_fatal(check);
        }

        let predicate = if check.decl.kind == VerifKind::Cover {
            self.build(|b| b.comb(CombOp::And, check.enable, check.predicate))
        } else {
            let disabled = self.not(check.enable);
            self.build(|b| b.comb(CombOp::Or, disabled, check.predicate))
        };
        let event = check.decl.event;
        let operands = check.operands(&[check.clock, predicate]);
        self.build(|b| b.stmt(HwOpKind::VerifConcurrent(check.verif(), event), operands));

        if check.decl.kind == VerifKind::Assert {
            let assume = HwVerif {
                kind: VerifKind::Assume,
                label: check.name.map(|n| format!("assume__{n}")),
                message: None,
            };
            let (then_block, _) = self.ifdef_blocks("USE_PROPERTY_AS_CONSTRAINT");
            self.in_block(then_block, |this| {
                this.build(|b| b.stmt(HwOpKind::VerifConcurrent(assume, event), vec![check.clock, predicate]));
                Ok(())
            })?;
        }
        Ok(())
    }

    /// `if (enable & !predicate)` printing under `ASSERT_VERBOSE_COND_`
    /// and stopping under `STOP_COND_`, outside synthesis.
    fn emit_if_else_fatal(&mut self, check: &Check<'_>) -> LowerResult<()> {
        let failed = self.not(check.predicate);
        let failed = self.build(|b| b.comb(CombOp::And, check.enable, failed));
        self.ctx.usage.mark(Macro::AssertVerboseCond);
        self.ctx.usage.mark(Macro::StopCond);
        let (_, not_synthesis) = self.ifdef_blocks("SYNTHESIS");
        self.in_block(not_synthesis, |this| {
            let (main, _) = this.always_block(EventControl::Posedge, check.clock, None)?;
            this.in_block(main, |this| {
                let on_failure = this.if_block(failed);
                this.in_block(on_failure, |this| {
                    let verbose = this.build(|b| b.macro_ref("ASSERT_VERBOSE_COND_", 1));
                    let print = this.if_block(verbose);
                    this.in_block(print, |this| {
                        let kind = HwOpKind::ErrorPrint {
                            message: check.message.clone().unwrap_or_default(),
                        };
                        let operands = check.message_ops.clone();
                        this.build(|b| b.stmt(kind, operands));
                        Ok(())
                    })?;
                    let stop = this.build(|b| b.macro_ref("STOP_COND_", 1));
                    let fatal = this.if_block(stop);
                    this.in_block(fatal, |this| {
                        this.build(|b| b.stmt(HwOpKind::Fatal, vec![]));
                        Ok(())
                    })
                })
            })
        })
    }
}
