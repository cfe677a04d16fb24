//! Module-reference graph of a circuit.

use crate::ids::{ModuleId, OpId};
use crate::module::Circuit;
use crate::ops::OpKind;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use strata_common::Ident;

/// An instance whose target module does not exist.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct UnknownTarget {
    /// Module containing the instance.
    pub parent: ModuleId,
    /// The instance operation.
    pub op: OpId,
    /// Name it refers to.
    pub target: Ident,
}

/// Edges run from the instantiating module to the instantiated one.
#[derive(Debug)]
pub struct InstanceGraph {
    graph: DiGraph<ModuleId, OpId>,
    nodes: HashMap<ModuleId, NodeIndex>,
    by_name: HashMap<Ident, ModuleId>,
    unknown: Vec<UnknownTarget>,
}

impl InstanceGraph {
    /// Scans every instance operation of `circuit`.
    pub fn build(circuit: &Circuit) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        let mut by_name = HashMap::new();
        for (id, module) in circuit.modules.iter() {
            nodes.insert(id, graph.add_node(id));
            by_name.insert(module.name, id);
        }
        let mut unknown = Vec::new();
        for (id, module) in circuit.modules.iter() {
            let Some(body) = &module.body else { continue };
            for op in body.walk() {
                let OpKind::Instance(decl) = &body.ops[op].kind else { continue };
                match by_name.get(&decl.module) {
                    Some(callee) => {
                        graph.add_edge(nodes[&id], nodes[callee], op);
                    }
                    None => unknown.push(UnknownTarget {
                        parent: id,
                        op,
                        target: decl.module,
                    }),
                }
            }
        }
        Self {
            graph,
            nodes,
            by_name,
            unknown,
        }
    }

    /// Finds a module by name.
    pub fn lookup(&self, name: Ident) -> Option<ModuleId> {
        self.by_name.get(&name).copied()
    }

    /// Instances inside `module` with their targets.
    pub fn instances_in(&self, module: ModuleId) -> Vec<(OpId, ModuleId)> {
        let Some(&node) = self.nodes.get(&module) else {
            return Vec::new();
        };
        let mut out: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (*e.weight(), self.graph[e.target()]))
            .collect();
        out.sort();
        out
    }

    /// Modules that instantiate `module`, without duplicates.
    pub fn parents_of(&self, module: ModuleId) -> Vec<ModuleId> {
        let Some(&node) = self.nodes.get(&module) else {
            return Vec::new();
        };
        let mut out: Vec<_> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|n| self.graph[n])
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Instances naming a module that does not exist.
    pub fn unknown_targets(&self) -> &[UnknownTarget] {
        &self.unknown
    }

    /// Modules ordered so every parent precedes its children; `None` if the
    /// hierarchy is recursive.
    pub fn top_down(&self) -> Option<Vec<ModuleId>> {
        toposort(&self.graph, None)
            .ok()
            .map(|order| order.into_iter().map(|n| self.graph[n]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BodyBuilder;
    use crate::module::{Direction as PortDirection, Module, Port};
    use crate::ops::InstanceDecl;
    use crate::types::FType;
    use strata_common::Interner;

    fn instance_of(i: &Interner, target: &str) -> InstanceDecl {
        InstanceDecl {
            module: i.get_or_intern(target),
            lower_to_bind: false,
            port_names: vec![i.get_or_intern("x")],
            port_directions: vec![PortDirection::In],
            port_annotations: vec![],
        }
    }

    #[test]
    fn edges_and_order() {
        let i = Interner::new();
        let mut circuit = Circuit::new(i.get_or_intern("Top"));
        let leaf = circuit.add_module(Module::new(
            i.get_or_intern("Leaf"),
            vec![Port::input(i.get_or_intern("x"), FType::uint(1))],
        ));
        let mut top = Module::new(i.get_or_intern("Top"), vec![]);
        {
            let body = top.body.as_mut().unwrap();
            let mut b = BodyBuilder::new(body);
            b.instance(i.get_or_intern("u0"), instance_of(&i, "Leaf"), vec![FType::uint(1)]);
            b.instance(i.get_or_intern("u1"), instance_of(&i, "Missing"), vec![FType::uint(1)]);
        }
        let top = circuit.add_module(top);
        let graph = InstanceGraph::build(&circuit);
        assert_eq!(graph.instances_in(top).len(), 1);
        assert_eq!(graph.parents_of(leaf), vec![top]);
        assert_eq!(graph.unknown_targets().len(), 1);
        assert_eq!(graph.unknown_targets()[0].target, i.get_or_intern("Missing"));
        assert_eq!(graph.top_down(), Some(vec![top, leaf]));
        assert_eq!(graph.lookup(i.get_or_intern("Leaf")), Some(leaf));
    }
}
