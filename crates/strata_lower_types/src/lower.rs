//! Rebuilding a module over decomposed values.
//!
//! The old body is walked forward and every operation is re-created in a
//! fresh body. Each old value maps to a [`Lowered`] tree: a single new value
//! when it was kept whole, or one subtree per child when its type was
//! peeled. Field accesses then resolve by indexing the tree, and operations
//! that need a whole aggregate get one rebuilt from its leaves.

use crate::connect::{dynamic_write_path, Access};
use crate::context::TypeLoweringContext;
use crate::errors;
use crate::peel::{module_mode, peel};
use crate::ports::flatten_port;
use crate::tree::{Lowered, Tree};
use std::collections::{HashMap, HashSet};
use strata_common::{InternalError, Interner};
use strata_config::PreserveAggregate;
use strata_diagnostics::Diagnostic;
use strata_ir::annotations::filter_for_field;
use strata_ir::uses::UseMap;
use strata_ir::{
    Annotation, BlockId, Body, BodyBuilder, FType, InstanceDecl, Module, NameKind,
    OpAttrs, OpId, OpKind, Operation, Port, ValueDef, ValueId,
};
use strata_source::Location;

/// Why lowering a module stopped.
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

/// Builds the leaf at `path` of a decomposed result.
pub(crate) type MakeLeaf<'m, 'a> =
    dyn FnMut(&mut ModuleLowering<'a>, &FType, &[usize], OpAttrs) -> LowerResult<Lowered> + 'm;

/// Names handed down while peeling a declaration.
#[derive(Clone, Default)]
pub(crate) struct Naming {
    pub name: Option<String>,
    pub debug: Option<String>,
    pub kind: NameKind,
}

impl Naming {
    fn child(&self, suffix: &str, label: &str) -> Naming {
        Naming {
            name: self.name.as_ref().map(|n| format!("{n}{suffix}")),
            debug: self.debug.as_ref().map(|d| format!("{d}.{label}")),
            kind: self.kind,
        }
    }
}

/// The type of the node `path` leads to; children of references stay
/// references.
pub(crate) fn type_at(ty: &FType, path: &[usize]) -> Option<FType> {
    let mut cur = ty.clone();
    for &index in path {
        cur = match &cur {
            FType::Ref(inner) => FType::Ref(Box::new(inner.child(index)?.clone())),
            other => other.child(index)?.clone(),
        };
    }
    Some(cur)
}

/// Lowering state of one module.
pub(crate) struct ModuleLowering<'a> {
    pub(crate) ctx: &'a TypeLoweringContext<'a>,
    module: &'a str,
    pub(crate) old: &'a Body,
    pub(crate) new: Body,
    pub(crate) block: BlockId,
    loc: Location,
    current: &'static str,
    lowered: HashMap<ValueId, Lowered>,
    uses: UseMap,
    write_paths: HashSet<OpId>,
    write_only: HashMap<ValueId, bool>,
}

impl<'a> ModuleLowering<'a> {
    /// Lowers `module`, returning its new ports and body.
    pub(crate) fn run(
        ctx: &'a TypeLoweringContext<'a>,
        module: &'a Module,
        name: &'a str,
    ) -> LowerResult<(Vec<Port>, Option<Body>)> {
        check_types(ctx, module, name)?;
        let interner = ctx.interner;
        let debug_info = ctx.options.insert_debug_info;
        let mode = module_mode(module, ctx.options);

        let mut flat = Vec::new();
        let mut shapes = Vec::with_capacity(module.ports.len());
        let mut ports = Vec::new();
        for port in &module.ports {
            let port_name = interner.resolve(port.name);
            let first = flat.len();
            let shape = flatten_port(
                port_name,
                port.direction,
                &port.ty,
                &port.annotations,
                mode,
                interner,
                &mut flat,
            );
            let peeled = matches!(shape, Tree::Fields(_));
            if peeled && port.sym.is_some() {
                let diag = errors::error_symbol_on_aggregate(&format!("port `{port_name}`"), port.loc);
                ctx.sink.emit(diag.in_module(name));
                return Err(LowerError::Reported);
            }
            for fp in &flat[first..] {
                let debug_name = if peeled {
                    debug_info.then(|| fp.dotted.clone())
                } else {
                    port.debug_name
                        .clone()
                        .or_else(|| debug_info.then(|| port_name.to_string()))
                };
                ports.push(Port {
                    name: interner.get_or_intern(&fp.name),
                    direction: fp.direction,
                    ty: fp.ty.clone(),
                    sym: if peeled { None } else { port.sym },
                    annotations: fp.annotations.clone(),
                    debug_name,
                    loc: port.loc,
                });
            }
            shapes.push(shape);
        }

        let Some(old) = module.body.as_ref() else {
            return Ok((ports, None));
        };
        if old.args.len() != shapes.len() {
            return Err(InternalError::new(format!(
                "module `{name}` has {} ports but {} body arguments",
                shapes.len(),
                old.args.len()
            ))
            .into());
        }

        let new = Body::new(ports.iter().map(|p| p.ty.clone()));
        let args = new.args.clone();
        let entry = new.entry;
        let mut this = ModuleLowering {
            ctx,
            module: name,
            old,
            new,
            block: entry,
            loc: module.loc,
            current: "module",
            lowered: HashMap::new(),
            uses: UseMap::build(old),
            write_paths: collect_write_paths(old),
            write_only: HashMap::new(),
        };
        for (&arg, shape) in old.args.iter().zip(&shapes) {
            this.set(arg, shape.map(&mut |&i| args[i]))?;
        }
        this.lower_block(old.entry, entry)?;
        Ok((ports, Some(this.new)))
    }

    pub(crate) fn interner(&self) -> &'a Interner {
        self.ctx.interner
    }

    /// The mode used for declarations and expressions.
    pub(crate) fn mode(&self) -> PreserveAggregate {
        self.ctx.options.preserve_aggregate
    }

    pub(crate) fn builder(&mut self) -> BodyBuilder<'_> {
        let mut b = BodyBuilder::new(&mut self.new);
        b.set_block(self.block);
        b.set_loc(self.loc);
        b
    }

    /// Emits `diag` against this module.
    pub(crate) fn report(&self, diag: Diagnostic) -> LowerError {
        self.ctx.sink.emit(diag.in_module(self.module));
        LowerError::Reported
    }

    pub(crate) fn loc(&self) -> Location {
        self.loc
    }

    pub(crate) fn name_of(&self, op: &Operation) -> Option<&'a str> {
        op.attrs.name.map(|n| self.interner().resolve(n))
    }

    /// The lowered form of old value `value`.
    pub(crate) fn get(&self, value: ValueId) -> LowerResult<Lowered> {
        self.lowered.get(&value).cloned().ok_or_else(|| {
            InternalError::new(format!("value {} used before it was lowered", value.as_raw())).into()
        })
    }

    pub(crate) fn set(&mut self, value: ValueId, lowered: Lowered) -> LowerResult<()> {
        if self.lowered.insert(value, lowered).is_some() {
            return Err(InternalError::new(format!("value {} lowered twice", value.as_raw())).into());
        }
        Ok(())
    }

    /// Child `index` of a lowered value; indexes into kept aggregates.
    pub(crate) fn sub(&mut self, lowered: &Lowered, index: usize) -> LowerResult<Lowered> {
        match lowered {
            Tree::Fields(children) => children.get(index).cloned().ok_or_else(|| {
                InternalError::new(format!("no child {index} in a decomposed value")).into()
            }),
            Tree::Leaf(value) => {
                let value = *value;
                let kind = match self.new.value_type(value) {
                    FType::Bundle(_) => OpKind::Subfield(index as u32),
                    FType::Vector(..) => OpKind::Subindex(index as u32),
                    FType::Ref(_) => OpKind::RefSub(index as u32),
                    other => {
                        let ty = other.display(self.interner());
                        return Err(InternalError::new(format!("cannot index into `{ty}`")).into());
                    }
                };
                Ok(Tree::Leaf(self.builder().expr(kind, vec![value])?))
            }
        }
    }

    pub(crate) fn sub_path(&mut self, lowered: &Lowered, path: &[usize]) -> LowerResult<Lowered> {
        let mut cur = lowered.clone();
        for &index in path {
            cur = self.sub(&cur, index)?;
        }
        Ok(cur)
    }

    /// A single value of type `ty` for `lowered`.
    ///
    /// Decomposed values are concatenated and cast back: bundle fields
    /// from the most significant end, vector elements from the least. Only
    /// ground children can be concatenated.
    pub(crate) fn materialize(&mut self, lowered: &Lowered, ty: &FType) -> LowerResult<ValueId> {
        let children = match lowered {
            Tree::Leaf(value) => return Ok(*value),
            Tree::Fields(children) => children,
        };
        let mut leaves = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Tree::Leaf(v) if self.new.value_type(*v).is_ground() => leaves.push(*v),
                _ => {
                    let shown = ty.display(self.interner());
                    let diag = errors::error_opaque_user(self.current, &shown, self.loc);
                    return Err(self.report(diag));
                }
            }
        }
        let is_vector = matches!(ty, FType::Vector(..));
        let mut b = self.builder();
        let mut acc: Option<ValueId> = None;
        for v in leaves {
            acc = Some(match acc {
                None => v,
                Some(a) if is_vector => b.cat(v, a)?,
                Some(a) => b.cat(a, v)?,
            });
        }
        Ok(match acc {
            Some(bits) => b.bitcast(bits, ty.clone()),
            None => b.invalid(ty.clone()),
        })
    }

    /// Old value `value` as a single new value.
    pub(crate) fn value(&mut self, value: ValueId) -> LowerResult<ValueId> {
        let lowered = self.get(value)?;
        let ty = self.old.value_type(value);
        self.materialize(&lowered, ty)
    }

    /// The node at `path` of old value `value` as a single new value.
    pub(crate) fn value_at(&mut self, value: ValueId, path: &[usize]) -> LowerResult<ValueId> {
        let lowered = self.get(value)?;
        let node = self.sub_path(&lowered, path)?;
        let ty = type_at(self.old.value_type(value), path)
            .ok_or_else(|| InternalError::new(format!("no node at {path:?} of value {}", value.as_raw())))?;
        self.materialize(&node, &ty)
    }

    pub(crate) fn lower_block(&mut self, old_block: BlockId, new_block: BlockId) -> LowerResult<()> {
        let old = self.old;
        let saved = std::mem::replace(&mut self.block, new_block);
        for &op in old.block_ops(old_block) {
            self.lower_op(op)?;
        }
        self.block = saved;
        Ok(())
    }

    fn lower_op(&mut self, id: OpId) -> LowerResult<()> {
        let old = self.old;
        let op: &'a Operation = &old.ops[id];
        self.loc = op.loc;
        self.current = op.kind.mnemonic();
        if self.write_paths.contains(&id) && op.result().is_some_and(|r| self.is_write_only(r)) {
            return Ok(());
        }
        match &op.kind {
            OpKind::Wire => self.lower_producer(op, &mut |this, ty, _, attrs| {
                Ok(Tree::Leaf(this.builder().typed_with(OpKind::Wire, vec![], ty.clone(), attrs)))
            }),
            OpKind::Reg => {
                let clock = self.value(op.operands[0])?;
                self.lower_producer(op, &mut |this, ty, _, attrs| {
                    Ok(Tree::Leaf(this.builder().typed_with(OpKind::Reg, vec![clock], ty.clone(), attrs)))
                })
            }
            OpKind::RegReset => {
                let clock = self.value(op.operands[0])?;
                let reset = self.value(op.operands[1])?;
                let init = op.operands[2];
                self.lower_producer(op, &mut |this, ty, path, attrs| {
                    let init = this.value_at(init, path)?;
                    Ok(Tree::Leaf(this.builder().typed_with(
                        OpKind::RegReset,
                        vec![clock, reset, init],
                        ty.clone(),
                        attrs,
                    )))
                })
            }
            OpKind::Node => {
                let input = op.operands[0];
                self.lower_producer(op, &mut |this, ty, path, attrs| {
                    let input = this.value_at(input, path)?;
                    Ok(Tree::Leaf(this.builder().typed_with(OpKind::Node, vec![input], ty.clone(), attrs)))
                })
            }
            OpKind::Invalid => self.lower_producer(op, &mut |this, ty, _, attrs| {
                Ok(Tree::Leaf(this.builder().typed_with(OpKind::Invalid, vec![], ty.clone(), attrs)))
            }),
            OpKind::Mux => {
                let sel = self.value(op.operands[0])?;
                let (high, low) = (op.operands[1], op.operands[2]);
                self.lower_producer(op, &mut |this, ty, path, attrs| {
                    let high = this.value_at(high, path)?;
                    let low = this.value_at(low, path)?;
                    Ok(Tree::Leaf(this.builder().typed_with(OpKind::Mux, vec![sel, high, low], ty.clone(), attrs)))
                })
            }
            OpKind::MultibitMux => {
                let index = self.value(op.operands[0])?;
                let inputs = &op.operands[1..];
                self.lower_producer(op, &mut |this, ty, path, attrs| {
                    let mut operands = Vec::with_capacity(inputs.len() + 1);
                    operands.push(index);
                    for &input in inputs {
                        operands.push(this.value_at(input, path)?);
                    }
                    Ok(Tree::Leaf(this.builder().typed_with(OpKind::MultibitMux, operands, ty.clone(), attrs)))
                })
            }
            OpKind::RefSend | OpKind::RefResolve => {
                let input = op.operands[0];
                let kind = op.kind.clone();
                self.lower_producer(op, &mut |this, ty, path, attrs| {
                    let input = this.value_at(input, path)?;
                    Ok(Tree::Leaf(this.builder().typed_with(kind.clone(), vec![input], ty.clone(), attrs)))
                })
            }
            OpKind::BundleCreate | OpKind::VectorCreate => self.lower_create(op),
            OpKind::BitCast => self.lower_bitcast(op),
            OpKind::Subfield(i) | OpKind::Subindex(i) | OpKind::RefSub(i) => {
                let lowered = self.get(op.operands[0])?;
                let child = self.sub(&lowered, *i as usize)?;
                self.set(result_of(op)?, child)
            }
            OpKind::Subaccess => self.lower_subaccess(op),
            OpKind::Instance(decl) => self.lower_instance(op, decl),
            OpKind::Mem(decl) => self.lower_mem(op, decl),
            OpKind::Connect | OpKind::StrictConnect => self.lower_connect(op),
            OpKind::When => self.lower_when(op),
            _ => self.clone_op(op),
        }
    }

    /// Re-creates `op` with every operand as a single value.
    pub(crate) fn clone_op(&mut self, op: &'a Operation) -> LowerResult<()> {
        let mut operands = Vec::with_capacity(op.operands.len());
        for &value in &op.operands {
            operands.push(self.value(value)?);
        }
        let types = op
            .results
            .iter()
            .map(|&r| self.old.value_type(r).clone())
            .collect();
        let new_op = self
            .builder()
            .push(op.kind.clone(), operands, types, op.attrs.clone());
        let results = self.new.ops[new_op].results.clone();
        for (&old, new) in op.results.iter().zip(results) {
            self.set(old, Tree::Leaf(new))?;
        }
        Ok(())
    }

    /// Decomposes the result of a declaration or expression.
    ///
    /// `make` is called once per leaf with the leaf type, its path and the
    /// attributes it inherits. A result that does not peel is rebuilt by one
    /// call with the original attributes and an empty path.
    pub(crate) fn lower_producer(&mut self, op: &'a Operation, make: &mut MakeLeaf<'_, 'a>) -> LowerResult<()> {
        let result = result_of(op)?;
        let ty = self.old.value_type(result);
        let tree = if peel(ty, self.mode(), self.interner()).is_none() {
            let mut attrs = op.attrs.clone();
            if self.ctx.options.insert_debug_info && attrs.debug_name.is_none() {
                attrs.debug_name = self
                    .name_of(op)
                    .filter(|n| !n.starts_with('_'))
                    .map(str::to_string);
            }
            make(self, ty, &[], attrs)?
        } else {
            if op.attrs.sym.is_some() {
                let what = format!("{} `{}`", op.kind.mnemonic(), self.name_of(op).unwrap_or_default());
                return Err(self.report(errors::error_symbol_on_aggregate(&what, op.loc)));
            }
            let name = self.name_of(op).map(str::to_string);
            let naming = Naming {
                debug: self
                    .ctx
                    .options
                    .insert_debug_info
                    .then(|| op.attrs.debug_name.clone().or_else(|| name.clone()))
                    .flatten(),
                name,
                kind: op.attrs.name_kind,
            };
            self.build_tree(ty, &naming, op.attrs.annotations.clone(), &mut Vec::new(), make)?
        };
        self.set(result, tree)
    }

    /// Peels `ty` down to its leaves and calls `make` on each.
    pub(crate) fn build_tree(
        &mut self,
        ty: &FType,
        naming: &Naming,
        annotations: Vec<Annotation>,
        path: &mut Vec<usize>,
        make: &mut MakeLeaf<'_, 'a>,
    ) -> LowerResult<Lowered> {
        let Some(fields) = peel(ty, self.mode(), self.interner()) else {
            let attrs = OpAttrs {
                name: naming.name.as_deref().map(|n| self.interner().get_or_intern(n)),
                name_kind: naming.kind,
                annotations,
                sym: None,
                debug_name: naming.debug.clone(),
            };
            return make(self, ty, path.as_slice(), attrs);
        };
        let mut children = Vec::with_capacity(fields.len());
        for f in &fields {
            path.push(f.index);
            let annos = filter_for_field(&annotations, f.field_id, f.ty.max_field_id());
            let child = self.build_tree(&f.ty, &naming.child(&f.suffix, f.label()), annos, path, make);
            path.pop();
            children.push(child?);
        }
        Ok(Tree::Fields(children))
    }

    fn lower_create(&mut self, op: &'a Operation) -> LowerResult<()> {
        let ty = self.old.value_type(result_of(op)?);
        if peel(ty, self.mode(), self.interner()).is_none() {
            return self.clone_op(op);
        }
        let operands = &op.operands;
        self.lower_producer(op, &mut |this, _, path, _| {
            let (&first, rest) = path
                .split_first()
                .ok_or_else(|| InternalError::new("aggregate create lowered without a field"))?;
            let operand = *operands
                .get(first)
                .ok_or_else(|| InternalError::new(format!("aggregate create has no operand {first}")))?;
            let lowered = this.get(operand)?;
            this.sub_path(&lowered, rest)
        })
    }

    /// The bits of old value `value` as one unsigned integer with leaf 0 in
    /// the low bits; `None` when it has no bits at all.
    fn bits_of(&mut self, value: ValueId) -> LowerResult<Option<ValueId>> {
        let lowered = self.get(value)?;
        let mut leaves = Vec::new();
        self.ground_leaves(&lowered, self.old.value_type(value), &mut leaves)?;
        let mut acc = None;
        for (leaf, ty) in leaves {
            if ty.bit_width().unwrap_or(0) == 0 {
                continue;
            }
            let mut b = self.builder();
            let leaf = if matches!(ty, FType::UInt(_)) {
                leaf
            } else {
                b.as_uint(leaf)?
            };
            acc = Some(match acc {
                None => leaf,
                Some(a) => b.cat(leaf, a)?,
            });
        }
        Ok(acc)
    }

    fn ground_leaves(
        &mut self,
        lowered: &Lowered,
        ty: &FType,
        out: &mut Vec<(ValueId, FType)>,
    ) -> LowerResult<()> {
        match peel(ty, PreserveAggregate::None, self.interner()) {
            None => {
                let value = self.materialize(lowered, ty)?;
                out.push((value, ty.clone()));
            }
            Some(fields) => {
                for f in fields {
                    let child = self.sub(lowered, f.index)?;
                    self.ground_leaves(&child, &f.ty, out)?;
                }
            }
        }
        Ok(())
    }

    fn lower_bitcast(&mut self, op: &'a Operation) -> LowerResult<()> {
        let result = result_of(op)?;
        let out_ty = self.old.value_type(result);
        let peeled = peel(out_ty, self.mode(), self.interner()).is_some();
        if !peeled && !out_ty.is_ground() {
            return self.clone_op(op);
        }
        let bits = self.bits_of(op.operands[0])?;
        if peeled {
            let mut upto = 0u32;
            return self.lower_producer(op, &mut |this, ty, _, attrs| {
                let width = ty.bit_width().unwrap_or(0);
                let mut b = this.builder();
                if width == 0 {
                    return Ok(Tree::Leaf(b.typed_with(OpKind::Invalid, vec![], ty.clone(), attrs)));
                }
                let bits = bits.ok_or_else(|| InternalError::new("bitcast of a value without bits"))?;
                let slice = b.bits(bits, upto + width - 1, upto)?;
                upto += width;
                Ok(Tree::Leaf(b.typed_with(OpKind::BitCast, vec![slice], ty.clone(), attrs)))
            });
        }
        let mut b = self.builder();
        let value = match bits {
            None => b.invalid(out_ty.clone()),
            Some(bits) if b.ty(bits) == out_ty => bits,
            Some(bits) if out_ty.is_signed() => b.typed(OpKind::AsSInt, vec![bits], out_ty.clone()),
            Some(bits) => b.bitcast(bits, out_ty.clone()),
        };
        self.set(result, Tree::Leaf(value))
    }

    fn lower_subaccess(&mut self, op: &'a Operation) -> LowerResult<()> {
        let result = result_of(op)?;
        let (input, index) = (op.operands[0], op.operands[1]);
        let (elem, len) = match self.old.value_type(input) {
            FType::Vector(elem, len) => (elem.as_ref(), *len),
            other => {
                let ty = other.display(self.interner());
                return Err(InternalError::new(format!("subaccess into non-vector `{ty}`")).into());
            }
        };
        let tree = if len == 0 {
            self.build_tree(elem, &Naming::default(), Vec::new(), &mut Vec::new(), &mut |this, ty, _, _| {
                Ok(Tree::Leaf(this.builder().invalid(ty.clone())))
            })?
        } else if let Some(c) = constant_index(self.old, index).filter(|&c| c < u64::from(len)) {
            let lowered = self.get(input)?;
            self.sub(&lowered, c as usize)?
        } else {
            let base = self.get(input)?;
            let sel = self.value(index)?;
            let mut inputs = Vec::with_capacity(len as usize);
            for i in (0..len as usize).rev() {
                inputs.push(self.sub(&base, i)?);
            }
            self.build_tree(elem, &Naming::default(), Vec::new(), &mut Vec::new(), &mut |this, ty, path, _| {
                let node_ty = type_at(elem, path)
                    .ok_or_else(|| InternalError::new(format!("no node at {path:?} of a vector element")))?;
                let mut operands = Vec::with_capacity(inputs.len() + 1);
                operands.push(sel);
                for input in &inputs {
                    let node = this.sub_path(input, path)?;
                    operands.push(this.materialize(&node, &node_ty)?);
                }
                Ok(Tree::Leaf(this.builder().typed(OpKind::MultibitMux, operands, ty.clone())))
            })?
        };
        self.set(result, tree)
    }

    fn lower_instance(&mut self, op: &'a Operation, decl: &'a InstanceDecl) -> LowerResult<()> {
        let interner = self.interner();
        let mode = self.ctx.mode_of(decl.module);
        let mut flat = Vec::new();
        let mut shapes = Vec::with_capacity(op.results.len());
        for (i, &result) in op.results.iter().enumerate() {
            let (Some(&name), Some(&direction)) = (decl.port_names.get(i), decl.port_directions.get(i))
            else {
                return Err(InternalError::new(format!("instance result {i} has no port name or direction")).into());
            };
            let annos = decl.port_annotations.get(i).map(Vec::as_slice).unwrap_or(&[]);
            shapes.push(flatten_port(
                interner.resolve(name),
                direction,
                self.old.value_type(result),
                annos,
                mode,
                interner,
                &mut flat,
            ));
        }
        let annotated = flat.iter().any(|p| !p.annotations.is_empty());
        let new_decl = InstanceDecl {
            module: decl.module,
            lower_to_bind: decl.lower_to_bind,
            port_names: flat.iter().map(|p| interner.get_or_intern(&p.name)).collect(),
            port_directions: flat.iter().map(|p| p.direction).collect(),
            port_annotations: if annotated {
                flat.iter().map(|p| p.annotations.clone()).collect()
            } else {
                Vec::new()
            },
        };
        let types = flat.into_iter().map(|p| p.ty).collect();
        let new_op = self
            .builder()
            .push(OpKind::Instance(new_decl), vec![], types, op.attrs.clone());
        let results = self.new.ops[new_op].results.clone();
        for (&old, shape) in op.results.iter().zip(&shapes) {
            self.set(old, shape.map(&mut |&i| results[i]))?;
        }
        Ok(())
    }

    fn lower_when(&mut self, op: &'a Operation) -> LowerResult<()> {
        let cond = self.value(op.operands[0])?;
        let (when, then_block, else_block) = self.builder().when(cond, op.regions.len() > 1);
        self.new.ops[when].attrs = op.attrs.clone();
        if let Some(&region) = op.regions.first() {
            self.lower_block(region, then_block)?;
        }
        if let (Some(&region), Some(block)) = (op.regions.get(1), else_block) {
            self.lower_block(region, block)?;
        }
        Ok(())
    }

    /// The name a connect to `dest` is recorded under for debuggers.
    pub(crate) fn dest_name(&self, dest: ValueId) -> Option<String> {
        let ValueDef::Result { op, index } = self.old.values[dest].def else {
            return None;
        };
        let op = &self.old.ops[op];
        let name = self.name_of(op)?;
        match &op.kind {
            OpKind::Instance(decl) => {
                let port = decl.port_names.get(index as usize)?;
                Some(format!("{name}_{}", self.interner().resolve(*port)))
            }
            _ => Some(name.to_string()),
        }
    }

    /// Returns `true` if `value` is only ever written through, directly or
    /// via further field accesses.
    fn is_write_only(&mut self, value: ValueId) -> bool {
        if let Some(&known) = self.write_only.get(&value) {
            return known;
        }
        let old = self.old;
        let uses = self.uses.uses(value).to_vec();
        let mut write_only = true;
        for u in uses {
            let user = &old.ops[u.op];
            let ok = match user.kind {
                OpKind::Connect | OpKind::StrictConnect => u.operand == 0,
                OpKind::Subfield(_) | OpKind::Subindex(_) | OpKind::Subaccess => {
                    u.operand == 0 && user.result().is_some_and(|r| self.is_write_only(r))
                }
                _ => false,
            };
            if !ok {
                write_only = false;
                break;
            }
        }
        self.write_only.insert(value, write_only);
        write_only
    }
}

pub(crate) fn result_of(op: &Operation) -> LowerResult<ValueId> {
    op.result()
        .ok_or_else(|| InternalError::new(format!("'{}' has no result", op.kind.mnemonic())).into())
}

/// The value of a constant index, if `index` is one.
pub(crate) fn constant_index(body: &Body, index: ValueId) -> Option<u64> {
    let op = body.defining_op(index)?;
    match &body.ops[op].kind {
        OpKind::Constant(value) => value.to_u64(),
        _ => None,
    }
}

/// Accessors that only lead a dynamic write path down to its connect.
fn collect_write_paths(body: &Body) -> HashSet<OpId> {
    let mut out = HashSet::new();
    for id in body.walk() {
        let op = &body.ops[id];
        if !matches!(op.kind, OpKind::Connect | OpKind::StrictConnect) {
            continue;
        }
        if let Some((_, chain)) = dynamic_write_path(body, op.operands[0]) {
            out.extend(chain.iter().map(|&(op, _): &(OpId, Access)| op));
        }
    }
    out
}

/// Rejects types nested deeper than `max_aggregate_depth` or too large to
/// number their field IDs.
fn check_types(ctx: &TypeLoweringContext<'_>, module: &Module, name: &str) -> LowerResult<()> {
    let max = ctx.options.max_aggregate_depth;
    let check = |ty: &FType, loc: Location| {
        let depth = ty.depth();
        let diag = if depth > max {
            errors::error_too_deep(depth, max, loc)
        } else if !ty.fits_u32() {
            errors::error_too_large(&ty.display(ctx.interner), loc)
        } else {
            return Ok(());
        };
        ctx.sink.emit(diag.in_module(name));
        Err(LowerError::Reported)
    };
    for port in &module.ports {
        check(&port.ty, port.loc)?;
    }
    if let Some(body) = &module.body {
        for id in body.walk() {
            let op = &body.ops[id];
            for &result in &op.results {
                check(body.value_type(result), op.loc)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ir::BundleField;

    #[test]
    fn type_at_keeps_references() {
        let i = Interner::new();
        let inner = FType::Bundle(vec![BundleField::new(i.get_or_intern("a"), FType::uint(3))]);
        let ty = FType::Ref(Box::new(FType::vector(inner, 2)));
        assert_eq!(type_at(&ty, &[1, 0]), Some(FType::Ref(Box::new(FType::uint(3)))));
        assert_eq!(type_at(&ty, &[2]), None);
        assert_eq!(type_at(&FType::uint(1), &[]), Some(FType::uint(1)));
    }

    #[test]
    fn naming_appends_suffixes() {
        let naming = Naming {
            name: Some("w".to_string()),
            debug: Some("w".to_string()),
            kind: NameKind::Interesting,
        };
        let child = naming.child("_a", "a").child("_0", "0");
        assert_eq!(child.name.as_deref(), Some("w_a_0"));
        assert_eq!(child.debug.as_deref(), Some("w.a.0"));
        assert_eq!(child.kind, NameKind::Interesting);
    }

    #[test]
    fn constant_indices() {
        let mut body = Body::new([FType::uint(2)]);
        let arg = body.args[0];
        let mut b = BodyBuilder::new(&mut body);
        let c = b.uint(2, 3);
        assert_eq!(constant_index(&body, c), Some(3));
        assert_eq!(constant_index(&body, arg), None);
    }
}
