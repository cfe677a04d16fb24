//! State shared by the per-module workers of structural lowering.

use crate::header::MacroUsage;
use crate::lower::{BodyLowering, LowerError};
use crate::ports::LoweredPorts;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use strata_common::{Ident, Interner, StrataResult};
use strata_config::LoweringOptions;
use strata_diagnostics::DiagnosticSink;
use strata_hw::{Bind, HwBody};
use strata_ir::{MemorySummary, Module};

/// Context handed to every module worker.
///
/// Signatures and generated memory names are computed before any body is
/// lowered; workers only add binds and macro uses, both of which tolerate
/// concurrent writers.
pub struct HwLoweringContext<'a> {
    /// Interner for names and symbols.
    pub interner: &'a Interner,
    /// Pass options.
    pub options: &'a LoweringOptions,
    /// Sink for user-facing errors.
    pub sink: &'a DiagnosticSink,
    /// Macros referenced so far.
    pub usage: MacroUsage,
    signatures: HashMap<Ident, LoweredPorts>,
    memories: BTreeMap<MemorySummary, Ident>,
    binds: Mutex<Vec<Bind>>,
}

impl<'a> HwLoweringContext<'a> {
    /// Creates the context from lowered signatures and memory module names.
    pub fn new(
        interner: &'a Interner,
        options: &'a LoweringOptions,
        sink: &'a DiagnosticSink,
        signatures: HashMap<Ident, LoweredPorts>,
        memories: BTreeMap<MemorySummary, Ident>,
    ) -> Self {
        Self {
            interner,
            options,
            sink,
            usage: MacroUsage::default(),
            signatures,
            memories,
            binds: Mutex::new(Vec::new()),
        }
    }

    /// The lowered ports of module `name`, if it lowered.
    pub fn signature(&self, name: Ident) -> Option<&LoweredPorts> {
        self.signatures.get(&name)
    }

    /// Name of the generated module implementing memories shaped `summary`.
    pub fn memory_module(&self, summary: &MemorySummary) -> Option<Ident> {
        self.memories.get(summary).copied()
    }

    /// Records an instance to emit as a bind.
    pub fn add_bind(&self, bind: Bind) {
        let mut binds = self.binds.lock().unwrap_or_else(|e| e.into_inner());
        binds.push(bind);
    }

    /// Every recorded bind, sorted by module and symbol.
    pub fn take_binds(&self) -> Vec<Bind> {
        let mut binds = std::mem::take(&mut *self.binds.lock().unwrap_or_else(|e| e.into_inner()));
        binds.sort_by_cached_key(|b| {
            (
                self.interner.resolve(b.module).to_string(),
                self.interner.resolve(b.instance).to_string(),
            )
        });
        binds
    }

    /// Lowers the body of one module whose ports already lowered.
    ///
    /// Returns `Ok(None)` when a user-facing error was reported.
    pub fn lower_module(&self, module: &Module) -> StrataResult<Option<HwBody>> {
        let name = self.interner.resolve(module.name);
        let Some(ports) = self.signature(module.name) else {
            return Ok(None);
        };
        let Some(body) = module.body.as_ref() else {
            return Ok(None);
        };
        match BodyLowering::run(self, module, name, ports, body) {
            Ok(lowered) => {
                debug!("lowered module {name} to structural form");
                Ok(Some(lowered))
            }
            Err(LowerError::Reported) => {
                debug!("structural lowering of module {name} failed");
                Ok(None)
            }
            Err(LowerError::Internal(err)) => Err(err),
        }
    }
}
