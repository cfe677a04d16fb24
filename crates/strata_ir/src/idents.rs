//! Identifier visitors for the circuit IR.
//!
//! Used to renumber a circuit against a reordered string table.

use crate::arena::{Arena, ArenaId};
use crate::body::Body;
use crate::module::{Circuit, Module, Port};
use crate::ops::{OpAttrs, OpKind, Operation};
use crate::types::FType;
use strata_common::{Ident, VisitIdents};

impl<I: ArenaId, T: VisitIdents> VisitIdents for Arena<I, T> {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        for item in self.as_mut_slice() {
            item.visit_idents(f);
        }
    }
}

impl VisitIdents for FType {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        match self {
            FType::Bundle(fields) => {
                for field in fields {
                    f(&mut field.name);
                    field.ty.visit_idents(f);
                }
            }
            FType::Vector(elem, _) | FType::Ref(elem) => elem.visit_idents(f),
            _ => {}
        }
    }
}

impl VisitIdents for OpAttrs {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        self.name.visit_idents(f);
        self.sym.visit_idents(f);
    }
}

impl VisitIdents for Operation {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        match &mut self.kind {
            OpKind::Mem(decl) => {
                decl.data_type.visit_idents(f);
                for port in &mut decl.ports {
                    f(&mut port.name);
                }
            }
            OpKind::Instance(decl) => {
                f(&mut decl.module);
                decl.port_names.visit_idents(f);
            }
            _ => {}
        }
        self.attrs.visit_idents(f);
    }
}

impl VisitIdents for Body {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        for value in self.values.as_mut_slice() {
            value.ty.visit_idents(f);
        }
        self.ops.visit_idents(f);
    }
}

impl VisitIdents for Port {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        f(&mut self.name);
        self.ty.visit_idents(f);
        self.sym.visit_idents(f);
    }
}

impl VisitIdents for Module {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        f(&mut self.name);
        self.ports.visit_idents(f);
        self.body.visit_idents(f);
    }
}

impl VisitIdents for Circuit {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        f(&mut self.name);
        f(&mut self.main);
        self.modules.visit_idents(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BodyBuilder;
    use crate::types::BundleField;
    use strata_common::Interner;

    #[test]
    fn every_name_of_a_circuit_is_visited() {
        let i = Interner::new();
        let io = FType::Bundle(vec![BundleField::new(i.get_or_intern("a"), FType::uint(1))]);
        let port = Port::input(i.get_or_intern("in"), io.clone());
        let mut m = Module::new(i.get_or_intern("Top"), vec![port]);
        BodyBuilder::new(m.body.as_mut().unwrap()).wire(i.get_or_intern("w"), io);
        let mut circuit = Circuit::new(m.name);
        circuit.add_module(m);

        let mut seen = Vec::new();
        circuit.visit_idents(&mut |id| seen.push(i.resolve(*id).to_string()));
        for name in ["Top", "in", "a", "w"] {
            assert!(seen.iter().any(|s| s == name), "{name} not visited: {seen:?}");
        }
        // Port type, argument value and wire result.
        assert_eq!(seen.iter().filter(|s| *s == "a").count(), 3);
        assert_eq!(seen.iter().filter(|s| *s == "Top").count(), 3);
    }
}
