//! Circuits, modules and ports.

use crate::annotations::Annotation;
use crate::arena::Arena;
use crate::body::Body;
use crate::ids::ModuleId;
use crate::types::FType;
use serde::{Deserialize, Serialize};
use strata_common::Ident;
use strata_source::Location;

/// Direction of a module port.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Driven by the instantiating module.
    In,
    /// Driven by the module itself.
    Out,
}

impl Direction {
    /// The opposite direction.
    pub fn flip(self) -> Self {
        match self {
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
        }
    }

    /// Flips the direction when `flip` is set.
    pub fn flip_if(self, flip: bool) -> Self {
        if flip {
            self.flip()
        } else {
            self
        }
    }
}

/// Whether a module may be instantiated from outside the circuit.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// A module with a body, or the signature of a module defined elsewhere.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Defined in this circuit.
    #[default]
    Module,
    /// Defined elsewhere.
    External {
        /// Name of the definition to instantiate, if it differs.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        defname: Option<String>,
    },
}

/// A module port.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Port {
    /// Port name.
    pub name: Ident,
    /// Port direction.
    pub direction: Direction,
    /// Port type.
    pub ty: FType,
    /// Inner symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sym: Option<Ident>,
    /// Port annotations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    /// Source-level name recorded for debuggers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_name: Option<String>,
    /// Source location.
    #[serde(default)]
    pub loc: Location,
}

impl Port {
    /// Creates a port without symbol, annotations or location.
    pub fn new(name: Ident, direction: Direction, ty: FType) -> Self {
        Self {
            name,
            direction,
            ty,
            sym: None,
            annotations: Vec::new(),
            debug_name: None,
            loc: Location::UNKNOWN,
        }
    }

    /// Shorthand for an input port.
    pub fn input(name: Ident, ty: FType) -> Self {
        Self::new(name, Direction::In, ty)
    }

    /// Shorthand for an output port.
    pub fn output(name: Ident, ty: FType) -> Self {
        Self::new(name, Direction::Out, ty)
    }
}

/// A module of a [`Circuit`].
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Module {
    /// Module name.
    pub name: Ident,
    /// Defined here or elsewhere.
    #[serde(default)]
    pub kind: ModuleKind,
    /// Visibility outside the circuit.
    #[serde(default)]
    pub visibility: Visibility,
    /// Ports in declaration order.
    pub ports: Vec<Port>,
    /// Module annotations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    /// Source location.
    #[serde(default)]
    pub loc: Location,
    /// Body; `None` for external modules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
}

impl Module {
    /// Creates a module whose body has one argument per port.
    pub fn new(name: Ident, ports: Vec<Port>) -> Self {
        let body = Body::new(ports.iter().map(|p| p.ty.clone()));
        Self {
            name,
            kind: ModuleKind::Module,
            visibility: Visibility::Public,
            ports,
            annotations: Vec::new(),
            loc: Location::UNKNOWN,
            body: Some(body),
        }
    }

    /// Creates an external module.
    pub fn external(name: Ident, ports: Vec<Port>) -> Self {
        Self {
            name,
            kind: ModuleKind::External { defname: None },
            visibility: Visibility::Public,
            ports,
            annotations: Vec::new(),
            loc: Location::UNKNOWN,
            body: None,
        }
    }

    /// Returns `true` for external modules.
    pub fn is_external(&self) -> bool {
        matches!(self.kind, ModuleKind::External { .. })
    }

    /// Returns `true` for public modules.
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// A whole design: every module plus the name of the top.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Circuit {
    /// Circuit name.
    pub name: Ident,
    /// Name of the top module.
    pub main: Ident,
    /// All modules.
    pub modules: Arena<ModuleId, Module>,
}

impl Circuit {
    /// Creates an empty circuit whose top module is also called `name`.
    pub fn new(name: Ident) -> Self {
        Self {
            name,
            main: name,
            modules: Arena::new(),
        }
    }

    /// Adds a module.
    pub fn add_module(&mut self, module: Module) -> ModuleId {
        self.modules.alloc(module)
    }

    /// Finds a module by name.
    pub fn module_by_name(&self, name: Ident) -> Option<ModuleId> {
        self.modules
            .iter()
            .find(|(_, m)| m.name == name)
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::Interner;

    #[test]
    fn module_body_has_port_arguments() {
        let i = Interner::new();
        let m = Module::new(
            i.get_or_intern("Top"),
            vec![
                Port::input(i.get_or_intern("a"), FType::uint(1)),
                Port::output(i.get_or_intern("b"), FType::uint(2)),
            ],
        );
        let body = m.body.as_ref().unwrap();
        assert_eq!(body.args.len(), 2);
        assert_eq!(body.value_type(body.args[1]), &FType::uint(2));
    }

    #[test]
    fn lookup_by_name() {
        let i = Interner::new();
        let mut c = Circuit::new(i.get_or_intern("Top"));
        let ext = c.add_module(Module::external(i.get_or_intern("Ext"), vec![]));
        assert_eq!(c.module_by_name(i.get_or_intern("Ext")), Some(ext));
        assert_eq!(c.module_by_name(i.get_or_intern("Nope")), None);
        assert!(c.modules[ext].is_external());
    }

    #[test]
    fn flip_directions() {
        assert_eq!(Direction::In.flip_if(true), Direction::Out);
        assert_eq!(Direction::Out.flip_if(false), Direction::Out);
    }
}
