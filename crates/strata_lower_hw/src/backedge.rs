//! Placeholders for values used before they are driven.

use std::collections::HashMap;
use strata_common::{Interner, InternalError, StrataResult};
use strata_hw::{HwBody, HwBuilder, HwType, HwValueId, InsertPoint};

/// Placeholders with the value currently driving each of them.
///
/// A placeholder may be driven by another placeholder; resolution follows
/// the chain to the first real value. A placeholder nothing drives, or one
/// driven only through a cycle of placeholders, is replaced by the read of
/// a fresh `undriven` wire.
#[derive(Debug, Default)]
pub struct Backedges {
    edges: Vec<HwValueId>,
    drivers: HashMap<HwValueId, HwValueId>,
}

impl Backedges {
    /// Creates a placeholder of type `ty`, initially undriven.
    pub fn create(&mut self, body: &mut HwBody, ty: HwType) -> HwValueId {
        let edge = body.placeholder(ty);
        self.edges.push(edge);
        self.drivers.insert(edge, edge);
        edge
    }

    /// Returns `true` if `value` is one of these placeholders.
    pub fn contains(&self, value: HwValueId) -> bool {
        self.drivers.contains_key(&value)
    }

    /// Makes `driver` drive `edge`. Returns `false` if `edge` is not a
    /// placeholder.
    pub fn update(&mut self, edge: HwValueId, driver: HwValueId) -> bool {
        match self.drivers.get_mut(&edge) {
            Some(slot) => {
                *slot = driver;
                true
            }
            None => false,
        }
    }

    /// Replaces every placeholder in `body` by the value driving it.
    pub fn resolve(self, body: &mut HwBody, interner: &Interner) -> StrataResult<()> {
        for &edge in &self.edges {
            let mut value = edge;
            for _ in 0..=self.edges.len() {
                match self.drivers.get(&value) {
                    Some(&next) if next != value => value = next,
                    _ => break,
                }
            }
            if self.contains(value) {
                let ty = body.value_type(edge).clone();
                let entry = body.entry;
                let mut b = HwBuilder::new(body, InsertPoint::Start(entry));
                let wire = b.named_wire(ty, interner.get_or_intern("undriven"));
                value = b.read(wire);
            }
            body.replace_all_uses(edge, value);
        }
        let left = body.used_placeholders();
        if !left.is_empty() {
            return Err(InternalError::new(format!(
                "{} placeholders still used after resolution",
                left.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_hw::{HwOpKind, HwValueDef};

    #[test]
    fn follows_driver_chains() {
        let interner = Interner::new();
        let mut body = HwBody::new([HwType::Int(4)]);
        let arg = body.args[0];
        let mut edges = Backedges::default();
        let a = edges.create(&mut body, HwType::Int(4));
        let b = edges.create(&mut body, HwType::Int(4));
        let use_a = HwBuilder::at_end(&mut body).concat(vec![a, b]);
        assert!(edges.update(a, b));
        assert!(edges.update(b, arg));
        assert!(!edges.update(arg, a));
        edges.resolve(&mut body, &interner).unwrap();
        let op = body.defining_op(use_a).unwrap();
        assert_eq!(body.op(op).operands, vec![arg, arg]);
    }

    #[test]
    fn undriven_edges_read_a_wire() {
        let interner = Interner::new();
        let mut body = HwBody::new([]);
        let mut edges = Backedges::default();
        let a = edges.create(&mut body, HwType::Int(2));
        let b = edges.create(&mut body, HwType::Int(2));
        edges.update(a, b);
        edges.update(b, a);
        body.outputs = vec![a];
        edges.resolve(&mut body, &interner).unwrap();
        let out = body.outputs[0];
        assert!(matches!(body.values[out].def, HwValueDef::Result { .. }));
        let read = body.defining_op(out).unwrap();
        assert_eq!(body.op(read).kind, HwOpKind::ReadInOut);
        let wire = body.defining_op(body.op(read).operands[0]).unwrap();
        assert_eq!(body.op(wire).attrs.name, interner.get("undriven"));
    }
}
