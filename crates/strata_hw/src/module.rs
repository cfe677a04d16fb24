//! Structural modules and the circuit holding them.

use crate::body::HwBody;
use crate::header::HeaderItem;
use crate::ids::HwModuleId;
use crate::types::HwType;
use serde::{Deserialize, Serialize};
use strata_common::Ident;
use strata_ir::{Arena, MemorySummary};
use strata_source::Location;

/// Direction of a structural port.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum PortDirection {
    Input,
    Output,
    #[serde(rename = "inout")]
    InOut,
}

/// A structural port.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct HwPort {
    /// Port name.
    pub name: Ident,
    /// Port direction.
    pub direction: PortDirection,
    /// Port type; the value type for inouts.
    pub ty: HwType,
    /// Index among the body arguments (inputs and inouts) or among the
    /// outputs, depending on the direction.
    pub arg_index: u32,
    /// Inner symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sym: Option<Ident>,
    /// Source-level name recorded for debuggers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_name: Option<String>,
    /// Source location.
    #[serde(default)]
    pub loc: Location,
}

impl HwPort {
    /// A port without symbol or debug name.
    pub fn new(name: Ident, direction: PortDirection, ty: HwType, arg_index: u32) -> Self {
        Self {
            name,
            direction,
            ty,
            arg_index,
            sym: None,
            debug_name: None,
            loc: Location::UNKNOWN,
        }
    }

    /// Returns `true` for ports that are body arguments.
    pub fn is_argument(&self) -> bool {
        self.direction != PortDirection::Output
    }
}

/// What kind of module this is.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HwModuleKind {
    /// A module with a body.
    #[default]
    Module,
    /// Defined elsewhere.
    External {
        /// Name of the definition to instantiate, if it differs.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        defname: Option<String>,
    },
    /// A memory left to a memory generator.
    GeneratedMemory(MemorySummary),
}

/// A structural module.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct HwModule {
    /// Module name.
    pub name: Ident,
    /// Module kind.
    #[serde(default)]
    pub kind: HwModuleKind,
    /// Ports in declaration order.
    pub ports: Vec<HwPort>,
    /// Body of a [`HwModuleKind::Module`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<HwBody>,
    /// Source location.
    #[serde(default)]
    pub loc: Location,
}

impl HwModule {
    /// Input and inout ports in argument order.
    pub fn arguments(&self) -> impl Iterator<Item = &HwPort> {
        self.ports.iter().filter(|p| p.is_argument())
    }

    /// Output ports in result order.
    pub fn outputs(&self) -> impl Iterator<Item = &HwPort> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Output)
    }

    /// Looks up a port by name.
    pub fn port(&self, name: Ident) -> Option<&HwPort> {
        self.ports.iter().find(|p| p.name == name)
    }
}

/// An instance emitted through a `bind` statement.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Bind {
    /// Module containing the instance.
    pub module: Ident,
    /// Symbol of the instance.
    pub instance: Ident,
}

/// The structural form of a whole circuit.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct HwCircuit {
    /// Circuit name.
    pub name: Ident,
    /// Every module, generated memories included.
    pub modules: Arena<HwModuleId, HwModule>,
    /// Instances to emit as binds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub binds: Vec<Bind>,
    /// Macro definitions emitted ahead of the modules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header: Vec<HeaderItem>,
}

impl HwCircuit {
    /// An empty circuit.
    pub fn new(name: Ident) -> Self {
        Self {
            name,
            modules: Arena::new(),
            binds: Vec::new(),
            header: Vec::new(),
        }
    }

    /// Adds a module.
    pub fn add_module(&mut self, module: HwModule) -> HwModuleId {
        self.modules.alloc(module)
    }

    /// Finds a module by name.
    pub fn module_by_name(&self, name: Ident) -> Option<&HwModule> {
        self.modules.values().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::Interner;

    #[test]
    fn argument_and_output_views() {
        let i = Interner::new();
        let module = HwModule {
            name: i.get_or_intern("Top"),
            kind: HwModuleKind::Module,
            ports: vec![
                HwPort::new(i.get_or_intern("a"), PortDirection::Input, HwType::Int(2), 0),
                HwPort::new(i.get_or_intern("o"), PortDirection::Output, HwType::Int(2), 0),
                HwPort::new(i.get_or_intern("pad"), PortDirection::InOut, HwType::Int(1), 1),
            ],
            body: None,
            loc: Location::UNKNOWN,
        };
        let args: Vec<u32> = module.arguments().map(|p| p.arg_index).collect();
        assert_eq!(args, vec![0, 1]);
        assert_eq!(module.outputs().count(), 1);
        assert_eq!(
            module.port(i.get_or_intern("pad")).map(|p| p.direction),
            Some(PortDirection::InOut)
        );
    }

    #[test]
    fn circuit_lookup() {
        let i = Interner::new();
        let mut circuit = HwCircuit::new(i.get_or_intern("Top"));
        let name = i.get_or_intern("Leaf");
        circuit.add_module(HwModule {
            name,
            kind: HwModuleKind::External { defname: None },
            ports: vec![],
            body: None,
            loc: Location::UNKNOWN,
        });
        assert!(circuit.module_by_name(name).is_some());
        assert!(circuit.module_by_name(i.get_or_intern("Missing")).is_none());
        let json = serde_json::to_string(&circuit).unwrap();
        assert!(!json.contains("binds"));
    }
}
