//! Memories become instances of generated memory modules.
//!
//! Every memory shape ([`MemorySummary`]) is served by one generated module
//! whose ports are flat integers: for read port `n` the inputs
//! `R<n>_addr`, `R<n>_en`, `R<n>_clk` and the output `R<n>_data`; read-write
//! and write ports follow with the `RW` and `W` prefixes. A memory with a
//! one-bit mask has its mask folded into the enable and no mask port.
//!
//! Inside the body each input field of each port becomes a temporary wire
//! `.<port>.<field>.wire` that the port's connects drive.

use crate::errors;
use crate::lower::{BodyLowering, LowerResult};
use crate::ports::lower_type;
use std::collections::BTreeMap;
use strata_common::{Ident, Interner, InternalError};
use strata_hw::{CombOp, HwInstance, HwModule, HwModuleKind, HwOpAttrs, HwOpKind, HwPort, HwType, HwValueId, PortDirection};
use strata_ir::types::index_width;
use strata_ir::{FType, MemDecl, MemPortKind, MemorySummary, Module, OpKind, Operation, ValueId};
use strata_source::Location;

/// Ports of a memory in instance order: read, then read-write, then write.
fn ordered_ports(decl: &MemDecl) -> Vec<usize> {
    let mut order = Vec::with_capacity(decl.ports.len());
    for kind in [MemPortKind::Read, MemPortKind::ReadWrite, MemPortKind::Write] {
        order.extend((0..decl.ports.len()).filter(|&i| decl.ports[i].kind == kind));
    }
    order
}

/// Accumulates ports, numbering arguments and results as they come.
#[derive(Default)]
struct PortList {
    ports: Vec<HwPort>,
    args: u32,
    results: u32,
}

impl PortList {
    fn input(&mut self, interner: &Interner, name: &str, width: u32) {
        let port = HwPort::new(interner.get_or_intern(name), PortDirection::Input, HwType::Int(width), self.args);
        self.ports.push(port);
        self.args += 1;
    }

    fn output(&mut self, interner: &Interner, name: &str, width: u32) {
        let port = HwPort::new(interner.get_or_intern(name), PortDirection::Output, HwType::Int(width), self.results);
        self.ports.push(port);
        self.results += 1;
    }
}

/// The ports of the generated module for memories shaped `summary`.
pub fn memory_ports(summary: &MemorySummary, interner: &Interner) -> Vec<HwPort> {
    let addr = index_width(summary.depth);
    let data = summary.data_width.max(1);
    let mut list = PortList::default();
    for n in 0..summary.num_read_ports {
        list.input(interner, &format!("R{n}_addr"), addr);
        list.input(interner, &format!("R{n}_en"), 1);
        list.input(interner, &format!("R{n}_clk"), 1);
        list.output(interner, &format!("R{n}_data"), data);
    }
    for n in 0..summary.num_read_write_ports {
        list.input(interner, &format!("RW{n}_addr"), addr);
        list.input(interner, &format!("RW{n}_en"), 1);
        list.input(interner, &format!("RW{n}_clk"), 1);
        list.input(interner, &format!("RW{n}_wmode"), 1);
        list.input(interner, &format!("RW{n}_wdata"), data);
        if summary.is_masked() {
            list.input(interner, &format!("RW{n}_wmask"), summary.mask_bits);
        }
        list.output(interner, &format!("RW{n}_rdata"), data);
    }
    for n in 0..summary.num_write_ports {
        list.input(interner, &format!("W{n}_addr"), addr);
        list.input(interner, &format!("W{n}_en"), 1);
        list.input(interner, &format!("W{n}_clk"), 1);
        list.input(interner, &format!("W{n}_data"), data);
        if summary.is_masked() {
            list.input(interner, &format!("W{n}_mask"), summary.mask_bits);
        }
    }
    list.ports
}

/// The generated module `name` implementing memories shaped `summary`.
pub fn generated_module(summary: MemorySummary, name: Ident, interner: &Interner) -> HwModule {
    HwModule {
        name,
        kind: HwModuleKind::GeneratedMemory(summary),
        ports: memory_ports(&summary, interner),
        body: None,
        loc: Location::UNKNOWN,
    }
}

/// The shape of every memory in `module` that lowering can handle, with
/// the smallest memory name seen for each shape.
pub fn collect_memories(module: &Module, interner: &Interner) -> BTreeMap<MemorySummary, String> {
    let mut found = BTreeMap::new();
    let Some(body) = module.body.as_ref() else {
        return found;
    };
    for id in body.walk() {
        let op = body.op(id);
        let OpKind::Mem(decl) = &op.kind else {
            continue;
        };
        if decl.data_type.contains_bundle() || decl.ports.iter().any(|p| p.kind == MemPortKind::Debug) {
            continue;
        }
        let Some(summary) = MemorySummary::from_decl(decl) else {
            continue;
        };
        let name = op.attrs.name.map(|n| interner.resolve(n)).unwrap_or("mem");
        insert_smallest(&mut found, summary, name.to_string());
    }
    found
}

fn insert_smallest(map: &mut BTreeMap<MemorySummary, String>, summary: MemorySummary, name: String) {
    map.entry(summary)
        .and_modify(|existing| {
            if name < *existing {
                *existing = name.clone();
            }
        })
        .or_insert(name);
}

/// Merges two collections, keeping the smallest name per shape. The
/// result does not depend on the order of the arguments.
pub fn merge_memories(
    mut a: BTreeMap<MemorySummary, String>,
    b: BTreeMap<MemorySummary, String>,
) -> BTreeMap<MemorySummary, String> {
    for (summary, name) in b {
        insert_smallest(&mut a, summary, name);
    }
    a
}

impl<'a> BodyLowering<'a> {
    pub(crate) fn lower_mem(&mut self, op: &'a Operation, decl: &'a MemDecl) -> LowerResult<()> {
        let name = self.name_of(op);
        if decl.data_type.contains_bundle() {
            return Err(self.report(errors::error_bundle_memory(name, op.loc)));
        }
        if decl.ports.iter().any(|p| p.kind == MemPortKind::Debug) {
            let what = format!("debug port of memory `{name}`");
            return Err(self.report(errors::error_unhandled(&what, op.loc)));
        }
        let Some(summary) = MemorySummary::from_decl(decl) else {
            let what = format!("memory `{name}`");
            return Err(self.report(errors::error_unknown_width(&what, op.loc)));
        };
        let module = self
            .ctx
            .memory_module(&summary)
            .ok_or_else(|| InternalError::new(format!("no generated module for memory `{name}`")))?;
        let interner = self.interner();
        let addr = index_width(decl.depth);
        let data = summary.data_width.max(1);
        let masked = summary.is_masked();

        let mut operands = Vec::new();
        let mut outputs = Vec::new();
        for pi in ordered_ports(decl) {
            let result = op.results[pi];
            let port = interner.resolve(decl.ports[pi].name);
            let field = |this: &mut Self, field: &str, width: u32| this.mem_field(result, port, field, width);
            match decl.ports[pi].kind {
                MemPortKind::Read => {
                    operands.push(field(self, "addr", addr)?);
                    operands.push(field(self, "en", 1)?);
                    operands.push(field(self, "clk", 1)?);
                    outputs.push((result, "data"));
                }
                MemPortKind::ReadWrite => {
                    operands.push(field(self, "addr", addr)?);
                    operands.push(field(self, "en", 1)?);
                    operands.push(field(self, "clk", 1)?);
                    let wmode = field(self, "wmode", 1)?;
                    let wdata = field(self, "wdata", data)?;
                    let wmask = field(self, "wmask", summary.mask_bits.max(1))?;
                    if masked {
                        operands.extend([wmode, wdata, wmask]);
                    } else {
                        let wmode = self.build(|b| b.comb(CombOp::And, wmode, wmask));
                        operands.extend([wmode, wdata]);
                    }
                    outputs.push((result, "rdata"));
                }
                MemPortKind::Write => {
                    operands.push(field(self, "addr", addr)?);
                    let en = field(self, "en", 1)?;
                    let clk = field(self, "clk", 1)?;
                    let wdata = field(self, "data", data)?;
                    let mask = field(self, "mask", summary.mask_bits.max(1))?;
                    if masked {
                        operands.extend([en, clk, wdata, mask]);
                    } else {
                        let en = self.build(|b| b.comb(CombOp::And, en, mask));
                        operands.extend([en, clk, wdata]);
                    }
                }
                MemPortKind::Debug => {}
            }
        }

        let ports = memory_ports(&summary, interner);
        let arg_names = ports.iter().filter(|p| p.is_argument()).map(|p| p.name).collect();
        let result_names = ports
            .iter()
            .filter(|p| p.direction == PortDirection::Output)
            .map(|p| p.name)
            .collect();
        let kind = HwOpKind::Instance(HwInstance {
            module,
            arg_names,
            result_names,
            do_not_print: false,
        });
        let attrs = HwOpAttrs {
            name: Some(interner.get_or_intern(&format!("{name}_ext"))),
            sym: op.attrs.sym,
            sv_attributes: Vec::new(),
            debug_name: None,
        };
        let types = vec![HwType::Int(data); outputs.len()];
        let inst = self.build(|b| b.op(kind, operands, types, attrs));
        let results = self.body.op(inst).results.clone();
        for ((port, field), value) in outputs.into_iter().zip(results) {
            let (index, ty) = self.port_field(port, field)?;
            let value = match lower_type(&ty) {
                Some(t) if t.bit_width() == 0 => None,
                Some(HwType::Int(_)) | None => Some(value),
                Some(t) => Some(self.build(|b| b.value(HwOpKind::Bitcast, vec![value], t))),
            };
            self.bind_field_users(port, index, value)?;
        }
        Ok(())
    }

    /// A temporary wire for input `field` of memory port `port`; every
    /// access to the field becomes the wire. Returns its read as a
    /// `width`-bit integer.
    fn mem_field(&mut self, port: ValueId, port_name: &str, field: &str, width: u32) -> LowerResult<HwValueId> {
        let (index, ty) = self.port_field(port, field)?;
        let lowered = lower_type(&ty).filter(|t| t.bit_width() > 0);
        let interner = self.interner();
        let name = interner.get_or_intern(&format!(".{port_name}.{field}.wire"));
        let wire_ty = lowered.clone().unwrap_or(HwType::Int(width));
        let wire = self.build(|b| b.named_wire(wire_ty, name));
        self.tmp_wires.push(wire);
        self.bind_field_users(port, index, lowered.as_ref().map(|_| wire))?;
        let read = self.read_value(wire);
        Ok(match lowered {
            Some(HwType::Int(_)) | None => read,
            Some(_) => self.build(|b| b.value(HwOpKind::Bitcast, vec![read], HwType::Int(width))),
        })
    }

    /// Index and type of `field` in the bundle of memory port `port`.
    fn port_field(&self, port: ValueId, field: &str) -> LowerResult<(usize, FType)> {
        let port_ty = self.old.value_type(port);
        self.interner()
            .get(field)
            .and_then(|f| port_ty.field_index(f))
            .and_then(|i| port_ty.child(i).map(|t| (i, t.clone())))
            .ok_or_else(|| InternalError::new(format!("memory port has no field `{field}`")).into())
    }

    /// Maps every `subfield` access to field `index` of memory port `port`
    /// to `value`.
    fn bind_field_users(&mut self, port: ValueId, index: usize, value: Option<HwValueId>) -> LowerResult<()> {
        let old = self.old;
        let users: Vec<ValueId> = self
            .uses
            .uses(port)
            .iter()
            .filter(|u| old.ops[u.op].kind == OpKind::Subfield(index as u32))
            .filter_map(|u| old.ops[u.op].result())
            .collect();
        for user in users {
            self.set(user, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ir::{MemPortDecl, ReadUnderWrite};

    fn summary(masked: bool) -> MemorySummary {
        MemorySummary {
            num_read_ports: 1,
            num_write_ports: 1,
            num_read_write_ports: 1,
            data_width: 8,
            depth: 16,
            read_latency: 0,
            write_latency: 1,
            mask_bits: if masked { 2 } else { 1 },
            ruw: ReadUnderWrite::Undefined,
        }
    }

    #[test]
    fn generated_ports_follow_port_kinds() {
        let interner = Interner::new();
        let ports = memory_ports(&summary(false), &interner);
        let names: Vec<&str> = ports.iter().map(|p| interner.resolve(p.name)).collect();
        assert_eq!(
            names,
            vec![
                "R0_addr", "R0_en", "R0_clk", "R0_data", "RW0_addr", "RW0_en", "RW0_clk", "RW0_wmode",
                "RW0_wdata", "RW0_rdata", "W0_addr", "W0_en", "W0_clk", "W0_data",
            ]
        );
        assert_eq!(ports[0].ty, HwType::Int(4));
        let outputs: Vec<u32> = ports
            .iter()
            .filter(|p| p.direction == PortDirection::Output)
            .map(|p| p.arg_index)
            .collect();
        assert_eq!(outputs, vec![0, 1]);
    }

    #[test]
    fn masked_memories_get_mask_ports() {
        let interner = Interner::new();
        let ports = memory_ports(&summary(true), &interner);
        let mask = ports
            .iter()
            .find(|p| interner.resolve(p.name) == "W0_mask")
            .unwrap();
        assert_eq!(mask.ty, HwType::Int(2));
        assert!(ports.iter().any(|p| interner.resolve(p.name) == "RW0_wmask"));
    }

    #[test]
    fn merge_keeps_smallest_name_in_any_order() {
        let mut a = BTreeMap::new();
        a.insert(summary(false), "zeta".to_string());
        let mut b = BTreeMap::new();
        b.insert(summary(false), "alpha".to_string());
        b.insert(summary(true), "beta".to_string());
        let ab = merge_memories(a.clone(), b.clone());
        let ba = merge_memories(b, a);
        assert_eq!(ab, ba);
        assert_eq!(ab[&summary(false)], "alpha");
        assert_eq!(ab.len(), 2);
    }

    #[test]
    fn read_ports_come_first() {
        let interner = Interner::new();
        let port = |name: &str, kind| MemPortDecl {
            name: interner.get_or_intern(name),
            kind,
            annotations: Vec::new(),
        };
        let decl = MemDecl {
            depth: 4,
            read_latency: 0,
            write_latency: 1,
            ruw: ReadUnderWrite::Undefined,
            data_type: FType::uint(8),
            ports: vec![
                port("w", MemPortKind::Write),
                port("rw", MemPortKind::ReadWrite),
                port("r", MemPortKind::Read),
            ],
        };
        assert_eq!(ordered_ports(&decl), vec![2, 1, 0]);
    }
}
