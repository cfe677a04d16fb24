//! State shared by the per-module workers of type lowering.

use crate::lower::{LowerError, ModuleLowering};
use crate::peel::module_mode;
use log::debug;
use std::collections::HashMap;
use strata_common::{Ident, Interner, StrataResult};
use strata_config::{LoweringOptions, PreserveAggregate};
use strata_diagnostics::DiagnosticSink;
use strata_ir::{Circuit, Module};

/// Read-only context handed to every module worker.
///
/// Holds the preservation mode of every module up front so instances can be
/// flattened the way their callee's ports are, whatever order the workers run
/// in.
pub struct TypeLoweringContext<'a> {
    /// Interner for names and suffixes.
    pub interner: &'a Interner,
    /// Pass options.
    pub options: &'a LoweringOptions,
    /// Sink for user-facing errors.
    pub sink: &'a DiagnosticSink,
    modes: HashMap<Ident, PreserveAggregate>,
}

impl<'a> TypeLoweringContext<'a> {
    /// Creates the context for lowering `circuit`.
    pub fn new(
        circuit: &Circuit,
        interner: &'a Interner,
        options: &'a LoweringOptions,
        sink: &'a DiagnosticSink,
    ) -> Self {
        let modes = circuit
            .modules
            .values()
            .map(|m| (m.name, module_mode(m, options)))
            .collect();
        Self {
            interner,
            options,
            sink,
            modes,
        }
    }

    /// The port preservation mode of the module called `name`.
    ///
    /// Modules outside the circuit decompose fully.
    pub fn mode_of(&self, name: Ident) -> PreserveAggregate {
        self.modes
            .get(&name)
            .copied()
            .unwrap_or(PreserveAggregate::None)
    }

    /// Lowers the ports and body of one module.
    ///
    /// Returns `Ok(false)` when a user-facing error was reported; the module
    /// is then left exactly as it was.
    pub fn lower_module(&self, module: &mut Module) -> StrataResult<bool> {
        let name = self.interner.resolve(module.name).to_string();
        debug!("lowering types of module {name}");
        match ModuleLowering::run(self, module, &name) {
            Ok((ports, body)) => {
                module.ports = ports;
                module.body = body;
                Ok(true)
            }
            Err(LowerError::Reported) => {
                debug!("type lowering of module {name} failed");
                Ok(false)
            }
            Err(LowerError::Internal(err)) => Err(err),
        }
    }
}
