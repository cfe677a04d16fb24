//! Identifier visitors for the structural IR.

use crate::body::HwBody;
use crate::module::{Bind, HwCircuit, HwModule, HwPort};
use crate::ops::{HwOp, HwOpKind};
use crate::types::HwType;
use strata_common::{Ident, VisitIdents};

impl VisitIdents for HwType {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        match self {
            HwType::Struct(fields) => {
                for field in fields {
                    f(&mut field.name);
                    field.ty.visit_idents(f);
                }
            }
            HwType::Array(elem, _) | HwType::InOut(elem) => elem.visit_idents(f),
            HwType::Int(_) => {}
        }
    }
}

impl VisitIdents for HwOp {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        if let HwOpKind::Instance(inst) = &mut self.kind {
            f(&mut inst.module);
            inst.arg_names.visit_idents(f);
            inst.result_names.visit_idents(f);
        }
        self.attrs.name.visit_idents(f);
        self.attrs.sym.visit_idents(f);
    }
}

impl VisitIdents for HwBody {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        for value in self.values.as_mut_slice() {
            value.ty.visit_idents(f);
        }
        self.ops.visit_idents(f);
    }
}

impl VisitIdents for HwPort {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        f(&mut self.name);
        self.ty.visit_idents(f);
        self.sym.visit_idents(f);
    }
}

impl VisitIdents for HwModule {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        f(&mut self.name);
        self.ports.visit_idents(f);
        self.body.visit_idents(f);
    }
}

impl VisitIdents for Bind {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        f(&mut self.module);
        f(&mut self.instance);
    }
}

impl VisitIdents for HwCircuit {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        f(&mut self.name);
        self.modules.visit_idents(f);
        self.binds.visit_idents(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::PortDirection;
    use crate::types::HwField;
    use strata_common::Interner;

    #[test]
    fn struct_fields_ports_and_binds_are_visited() {
        let i = Interner::new();
        let ty = HwType::Struct(vec![HwField {
            name: i.get_or_intern("f"),
            ty: HwType::Int(2),
        }]);
        let mut circuit = HwCircuit::new(i.get_or_intern("Top"));
        circuit.add_module(HwModule {
            name: i.get_or_intern("Top"),
            kind: Default::default(),
            ports: vec![HwPort::new(i.get_or_intern("p"), PortDirection::Input, ty, 0)],
            body: None,
            loc: Default::default(),
        });
        circuit.binds.push(Bind {
            module: i.get_or_intern("Top"),
            instance: i.get_or_intern("__u__"),
        });

        let mut seen = Vec::new();
        circuit.visit_idents(&mut |id| seen.push(i.resolve(*id).to_string()));
        assert_eq!(seen, vec!["Top", "Top", "p", "f", "Top", "__u__"]);
    }
}
