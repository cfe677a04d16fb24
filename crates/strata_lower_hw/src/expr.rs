//! Expression lowering.
//!
//! Arithmetic works on operands extended to the result width, so the
//! structural operations always see equal widths. Results of zero width
//! never get here; see [`BodyLowering::lower_op`].

use crate::errors;
use crate::lower::{BodyLowering, LowerResult};
use strata_common::InternalError;
use strata_hw::{CombOp, HwOpKind, HwType, HwValueId, ICmpPredicate};
use strata_ir::types::index_width;
use strata_ir::{BinaryOp, FType, OpKind, Operation, ValueId};

fn comb_for(op: BinaryOp, signed: bool) -> Option<CombOp> {
    Some(match op {
        BinaryOp::Add => CombOp::Add,
        BinaryOp::Sub => CombOp::Sub,
        BinaryOp::Mul => CombOp::Mul,
        BinaryOp::And => CombOp::And,
        BinaryOp::Or => CombOp::Or,
        BinaryOp::Xor => CombOp::Xor,
        BinaryOp::Div if signed => CombOp::DivS,
        BinaryOp::Div => CombOp::DivU,
        BinaryOp::Rem if signed => CombOp::ModS,
        BinaryOp::Rem => CombOp::ModU,
        BinaryOp::DShl => CombOp::Shl,
        BinaryOp::DShr if signed => CombOp::ShrS,
        BinaryOp::DShr => CombOp::ShrU,
        _ => return None,
    })
}

fn predicate_for(op: BinaryOp, signed: bool) -> Option<ICmpPredicate> {
    Some(match (op, signed) {
        (BinaryOp::Eq, _) => ICmpPredicate::Eq,
        (BinaryOp::Neq, _) => ICmpPredicate::Ne,
        (BinaryOp::Lt, true) => ICmpPredicate::Slt,
        (BinaryOp::Lt, false) => ICmpPredicate::Ult,
        (BinaryOp::Leq, true) => ICmpPredicate::Sle,
        (BinaryOp::Leq, false) => ICmpPredicate::Ule,
        (BinaryOp::Gt, true) => ICmpPredicate::Sgt,
        (BinaryOp::Gt, false) => ICmpPredicate::Ugt,
        (BinaryOp::Geq, true) => ICmpPredicate::Sge,
        (BinaryOp::Geq, false) => ICmpPredicate::Uge,
        _ => return None,
    })
}

/// A selection that passed its range check reads at least one bit.
fn selected(value: Option<HwValueId>) -> LowerResult<HwValueId> {
    value.ok_or_else(|| InternalError::new("bit selection of a zero-width operand").into())
}

impl<'a> BodyLowering<'a> {
    pub(crate) fn lower_expr(&mut self, op: &'a Operation) -> LowerResult<()> {
        let result = op
            .result()
            .ok_or_else(|| InternalError::new(format!("`{}` has no result", op.kind.mnemonic())))?;
        let rty = self.old.value_type(result).clone();
        let operand = |i: usize| op.operands[i];
        let value = match &op.kind {
            OpKind::Constant(value) => Some(self.int_constant(value.clone())),
            OpKind::Invalid => self.lower_invalid(&rty)?,
            OpKind::Subfield(index) => self.lower_subfield(operand(0), *index)?,
            OpKind::Subindex(index) => self.lower_subindex(operand(0), *index)?,
            OpKind::Subaccess => self.lower_subaccess(operand(0), operand(1))?,
            OpKind::Mux => {
                let cond = self.lowered_or_zero(operand(0))?;
                let high = self.extended_or_zero(operand(1), &rty)?;
                let low = self.extended_or_zero(operand(2), &rty)?;
                Some(self.build(|b| b.mux(cond, high, low)))
            }
            OpKind::MultibitMux => {
                let inputs = &op.operands[1..];
                let index_ty = FType::uint(index_width(inputs.len() as u64));
                let index = self.ext_or_trunc_or_zero(operand(0), &index_ty)?;
                let mut elements = Vec::with_capacity(inputs.len());
                for &input in inputs {
                    elements.push(self.extended_or_zero(input, &rty)?);
                }
                let array = self.build(|b| b.array_create(elements));
                Some(self.array_index(array, index)?)
            }
            OpKind::BundleCreate | OpKind::VectorCreate => {
                let ty = self.hw_type(&rty)?;
                let mut fields = Vec::with_capacity(op.operands.len());
                for &v in &op.operands {
                    let v = match self.lowered(v)? {
                        Some(v) => v,
                        None => self.int(0, 0),
                    };
                    fields.push(v);
                }
                let kind = if matches!(op.kind, OpKind::VectorCreate) {
                    fields.reverse();
                    HwOpKind::ArrayCreate
                } else {
                    HwOpKind::StructCreate
                };
                Some(self.build(|b| b.value(kind, fields, ty)))
            }
            OpKind::BitCast => {
                let ty = self.hw_type(&rty)?;
                let input = match self.lowered(operand(0))? {
                    Some(v) => v,
                    None => self.int(ty.bit_width(), 0),
                };
                if self.body.value_type(input) == &ty {
                    Some(input)
                } else {
                    Some(self.build(|b| b.value(HwOpKind::Bitcast, vec![input], ty)))
                }
            }
            OpKind::AsUInt
            | OpKind::AsSInt
            | OpKind::AsClock
            | OpKind::AsAsyncReset
            | OpKind::RefSend
            | OpKind::RefResolve => self.possibly_inout(operand(0))?,
            OpKind::Cvt => {
                let signed = self.old.value_type(operand(0)).is_signed();
                match (self.lowered(operand(0))?, signed) {
                    (Some(v), true) => Some(v),
                    (None, true) => None,
                    (Some(v), false) => {
                        let zero = self.int(1, 0);
                        Some(self.build(|b| b.concat(vec![zero, v])))
                    }
                    (None, false) => Some(self.int(1, 0)),
                }
            }
            OpKind::Not => {
                let v = self.required(operand(0))?;
                Some(self.not(v))
            }
            OpKind::Neg => {
                let v = self.extended_or_zero(operand(0), &rty)?;
                let zero = self.int(self.width(v), 0);
                Some(self.build(|b| b.comb(CombOp::Sub, zero, v)))
            }
            OpKind::Pad(_) => Some(self.extended_or_zero(operand(0), &rty)?),
            OpKind::XorR => Some(match self.lowered(operand(0))? {
                Some(v) => self.build(|b| b.value(HwOpKind::Parity, vec![v], HwType::Int(1))),
                None => self.int(1, 0),
            }),
            OpKind::AndR => Some(match self.lowered(operand(0))? {
                Some(v) => {
                    let ones = self.all_ones(self.width(v));
                    self.build(|b| b.icmp(ICmpPredicate::Eq, v, ones))
                }
                None => self.int(1, 1),
            }),
            OpKind::OrR => Some(match self.lowered(operand(0))? {
                Some(v) => {
                    let zero = self.int(self.width(v), 0);
                    self.build(|b| b.icmp(ICmpPredicate::Ne, v, zero))
                }
                None => self.int(1, 0),
            }),
            OpKind::Binary(bin) => Some(self.lower_binary(*bin, operand(0), operand(1), &rty)?),
            OpKind::Cat => match (self.lowered(operand(0))?, self.lowered(operand(1))?) {
                (Some(high), Some(low)) => Some(self.build(|b| b.concat(vec![high, low]))),
                (high, low) => high.or(low),
            },
            OpKind::Bits { hi, lo } => {
                let (v, w) = self.selection_operand(operand(0))?;
                if hi < lo || *hi >= w {
                    let range = format!("bits {hi} down to {lo}");
                    return Err(self.report(errors::error_bit_range("bits", &range, w, op.loc)));
                }
                let v = selected(v)?;
                Some(self.build(|b| b.extract(v, *lo, hi - lo + 1)))
            }
            OpKind::Head(n) => {
                let (v, w) = self.selection_operand(operand(0))?;
                if *n > w {
                    let range = format!("the top {n} bits");
                    return Err(self.report(errors::error_bit_range("head", &range, w, op.loc)));
                }
                let v = selected(v)?;
                Some(self.build(|b| b.extract(v, w - n, *n)))
            }
            OpKind::Tail(n) => {
                let (v, w) = self.selection_operand(operand(0))?;
                if *n > w {
                    let range = format!("all but the top {n} bits");
                    return Err(self.report(errors::error_bit_range("tail", &range, w, op.loc)));
                }
                let v = selected(v)?;
                Some(self.build(|b| b.extract(v, 0, w - n)))
            }
            OpKind::Shl(n) => match self.lowered(operand(0))? {
                None => Some(self.int(*n, 0)),
                Some(v) if *n == 0 => Some(v),
                Some(v) => {
                    let zeros = self.int(*n, 0);
                    Some(self.build(|b| b.concat(vec![v, zeros])))
                }
            },
            OpKind::Shr(n) => {
                let signed = self.old.value_type(operand(0)).is_signed();
                match self.lowered(operand(0))? {
                    None => Some(self.int(self.hw_type(&rty)?.bit_width(), 0)),
                    Some(v) => {
                        let w = self.width(v);
                        let mut n = *n;
                        if n >= w && !signed {
                            Some(self.int(1, 0))
                        } else {
                            if n >= w {
                                n = w - 1;
                            }
                            Some(self.build(|b| b.extract(v, n, w - n)))
                        }
                    }
                }
            }
            _ => return Err(self.report(errors::error_unhandled(op.kind.mnemonic(), op.loc))),
        };
        self.set(result, value)
    }

    /// The operand of `bits`, `head` or `tail` and its width, 0 when the
    /// operand has zero width.
    fn selection_operand(&mut self, value: ValueId) -> LowerResult<(Option<HwValueId>, u32)> {
        let v = self.lowered(value)?;
        Ok((v, v.map_or(0, |v| self.width(v))))
    }

    /// The lowering of an operand that cannot have zero width here.
    pub(crate) fn required(&mut self, value: ValueId) -> LowerResult<HwValueId> {
        self.lowered(value)?
            .ok_or_else(|| InternalError::new(format!("operand {} has no value", value.as_raw())).into())
    }

    fn extended_or_zero(&mut self, value: ValueId, dest: &FType) -> LowerResult<HwValueId> {
        match self.extended(value, dest)? {
            Some(v) => Ok(v),
            None => Ok(self.int(0, 0)),
        }
    }

    fn ext_or_trunc_or_zero(&mut self, value: ValueId, dest: &FType) -> LowerResult<HwValueId> {
        match self.ext_or_trunc(value, dest)? {
            Some(v) => Ok(v),
            None => Ok(self.int(0, 0)),
        }
    }

    fn lower_invalid(&mut self, ty: &FType) -> LowerResult<Option<HwValueId>> {
        if matches!(ty, FType::Analog(_)) {
            let hw = self.hw_type(ty)?;
            let name = self.interner().get_or_intern(".invalid_analog");
            return Ok(Some(self.build(|b| b.named_wire(hw, name))));
        }
        if ty.contains_analog() {
            return Err(self.report(errors::error_unhandled("invalidvalue", self.loc)));
        }
        let hw = self.hw_type(ty)?;
        let zero = self.int(hw.bit_width(), 0);
        Ok(Some(match hw {
            HwType::Int(_) => zero,
            other => self.build(|b| b.value(HwOpKind::Bitcast, vec![zero], other)),
        }))
    }

    fn lower_subfield(&mut self, input: ValueId, index: u32) -> LowerResult<Option<HwValueId>> {
        let Some(v) = self.possibly_inout(input)? else {
            return Ok(None);
        };
        let ty = self.body.value_type(v).clone();
        let field = ty
            .element()
            .struct_field(index as usize)
            .map(|f| f.ty.clone())
            .ok_or_else(|| InternalError::new(format!("no field {index} in a lowered bundle")))?;
        Ok(Some(if ty.is_inout() {
            self.build(|b| b.value(HwOpKind::StructFieldInOut(index), vec![v], HwType::inout(field)))
        } else {
            self.build(|b| b.value(HwOpKind::StructExtract(index), vec![v], field))
        }))
    }

    fn vector_len(&self, vector: ValueId) -> LowerResult<u32> {
        match self.old.value_type(vector) {
            FType::Vector(_, len) => Ok(*len),
            FType::Ref(inner) => match inner.as_ref() {
                FType::Vector(_, len) => Ok(*len),
                _ => Err(InternalError::new("indexing into a non-vector reference").into()),
            },
            _ => Err(InternalError::new("indexing into a non-vector value").into()),
        }
    }

    fn element_access(&mut self, v: HwValueId, index: HwValueId, dynamic: bool) -> LowerResult<HwValueId> {
        let ty = self.body.value_type(v).clone();
        let elem = ty
            .element()
            .as_array()
            .map(|(e, _)| e.clone())
            .ok_or_else(|| InternalError::new("indexing into a non-array value"))?;
        if ty.is_inout() {
            return Ok(self.build(|b| {
                b.value(HwOpKind::ArrayIndexInOut, vec![v, index], HwType::inout(elem))
            }));
        }
        if dynamic {
            return self.array_index(v, index);
        }
        Ok(self.build(|b| b.array_get(v, index)))
    }

    fn lower_subindex(&mut self, input: ValueId, index: u32) -> LowerResult<Option<HwValueId>> {
        let len = self.vector_len(input)?;
        let Some(v) = self.possibly_inout(input)? else {
            return Ok(None);
        };
        let idx = self.int(index_width(u64::from(len)), u64::from(index));
        self.element_access(v, idx, false).map(Some)
    }

    fn lower_subaccess(&mut self, input: ValueId, index: ValueId) -> LowerResult<Option<HwValueId>> {
        let len = self.vector_len(input)?;
        let Some(v) = self.possibly_inout(input)? else {
            return Ok(None);
        };
        let index_ty = FType::uint(index_width(u64::from(len)));
        let idx = self.ext_or_trunc_or_zero(index, &index_ty)?;
        self.element_access(v, idx, true).map(Some)
    }

    fn lower_binary(&mut self, op: BinaryOp, lhs: ValueId, rhs: ValueId, rty: &FType) -> LowerResult<HwValueId> {
        let lty = self.old.value_type(lhs).clone();
        let rhs_ty = self.old.value_type(rhs).clone();
        let width_of = |t: &FType| t.ground_width().unwrap_or(0);
        if op.is_comparison() {
            let width = width_of(&lty).max(width_of(&rhs_ty)).max(1);
            let signed = lty.is_signed();
            let common = if signed { FType::sint(width) } else { FType::uint(width) };
            let l = self.extended_or_zero(lhs, &common)?;
            let r = self.extended_or_zero(rhs, &common)?;
            let pred = predicate_for(op, signed)
                .ok_or_else(|| InternalError::new(format!("`{}` is not a comparison", op.mnemonic())))?;
            return Ok(self.build(|b| b.icmp(pred, l, r)));
        }
        let signed = rty.is_signed();
        let comb = comb_for(op, signed)
            .ok_or_else(|| InternalError::new(format!("no structural form for `{}`", op.mnemonic())))?;
        let div_like = matches!(op, BinaryOp::Div | BinaryOp::Rem | BinaryOp::DShl | BinaryOp::DShr);
        if !div_like {
            let l = self.extended_or_zero(lhs, rty)?;
            let r = self.extended_or_zero(rhs, rty)?;
            return Ok(self.build(|b| b.comb(comb, l, r)));
        }
        // Shift amounts and divisors may be wider than the result.
        let result_width = width_of(rty);
        let width = result_width.max(width_of(&lty)).max(width_of(&rhs_ty));
        let common = if signed { FType::sint(width) } else { FType::uint(width) };
        let l = self.extended_or_zero(lhs, &common)?;
        let r = self.extended_or_zero(rhs, &common)?;
        let value = self.build(|b| b.comb(comb, l, r));
        if width == result_width {
            return Ok(value);
        }
        Ok(self.build(|b| b.extract(value, 0, result_width)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_picks_signed_form() {
        assert_eq!(comb_for(BinaryOp::Div, true), Some(CombOp::DivS));
        assert_eq!(comb_for(BinaryOp::Rem, false), Some(CombOp::ModU));
        assert_eq!(comb_for(BinaryOp::DShl, true), Some(CombOp::Shl));
        assert_eq!(comb_for(BinaryOp::Lt, true), None);
    }

    #[test]
    fn comparisons_follow_operand_sign() {
        assert_eq!(predicate_for(BinaryOp::Lt, true), Some(ICmpPredicate::Slt));
        assert_eq!(predicate_for(BinaryOp::Geq, false), Some(ICmpPredicate::Uge));
        assert_eq!(predicate_for(BinaryOp::Neq, true), Some(ICmpPredicate::Ne));
        assert_eq!(predicate_for(BinaryOp::Add, false), None);
    }
}
