//! Structural lowering.
//!
//! Turns a circuit whose aggregates were lowered into the structural form:
//! ports become explicit nets, connects become assignments, registers
//! become `always` blocks, memories become instances of generated memory
//! modules, and prints, stops and checks become procedural code under
//! macro guards. Module bodies are lowered independently, in parallel;
//! memories, binds and the file header are assembled afterwards.
//!
//! # Usage
//!
//! ```ignore
//! let (hw, outcome) = lower_to_hw(&circuit, &interner, &options, &sink)?;
//! if outcome.is_success() {
//!     println!("{}", serde_json::to_string_pretty(&hw)?);
//! }
//! ```

#![warn(missing_docs)]

pub mod backedge;
pub mod context;
mod decl;
pub mod errors;
mod expr;
pub mod header;
mod lower;
pub mod memory;
pub mod ports;
mod stmt;
mod verif;

use log::{debug, info};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use strata_common::{Interner, PassOutcome, StrataResult};
use strata_config::LoweringOptions;
use strata_diagnostics::DiagnosticSink;
use strata_hw::{HwBody, HwCircuit, HwModule, HwModuleKind};
use strata_ir::{Circuit, ModuleKind};

pub use backedge::Backedges;
pub use context::HwLoweringContext;
pub use header::{file_header, Macro, MacroUsage};
pub use ports::{lower_ports, LoweredPorts};

/// Lowers `circuit` to a new structural circuit.
///
/// Modules that hit a user-facing error are reported to `sink` and
/// produced without a body, and the outcome is then
/// [`PassOutcome::Failure`]. Only internal bugs return `Err`.
pub fn lower_to_hw(
    circuit: &Circuit,
    interner: &Interner,
    options: &LoweringOptions,
    sink: &DiagnosticSink,
) -> StrataResult<(HwCircuit, PassOutcome)> {
    info!("lowering {} modules to structural form", circuit.modules.len());
    let mut failed = false;

    let mut signatures = HashMap::new();
    for module in circuit.modules.values() {
        match lower_ports(module, interner) {
            Ok(ports) => {
                signatures.insert(module.name, ports);
            }
            Err(diag) => {
                sink.emit(diag.in_module(interner.resolve(module.name)));
                failed = true;
            }
        }
    }

    let collected = circuit
        .modules
        .as_slice()
        .par_iter()
        .map(|module| memory::collect_memories(module, interner))
        .reduce(BTreeMap::new, memory::merge_memories);
    let mut taken: HashSet<String> = circuit
        .modules
        .values()
        .map(|m| interner.resolve(m.name).to_string())
        .collect();
    let mut memories = BTreeMap::new();
    for (summary, mem) in collected {
        let base = format!("{mem}_combMem");
        let mut name = base.clone();
        let mut n = 0;
        while !taken.insert(name.clone()) {
            name = format!("{base}_{n}");
            n += 1;
        }
        debug!("memory shape {summary} served by {name}");
        memories.insert(summary, interner.get_or_intern(&name));
    }

    let ctx = HwLoweringContext::new(interner, options, sink, signatures, memories.clone());
    let bodies: Vec<StrataResult<Option<HwBody>>> = circuit
        .modules
        .as_slice()
        .par_iter()
        .map(|module| match module.kind {
            ModuleKind::Module => ctx.lower_module(module),
            ModuleKind::External { .. } => Ok(None),
        })
        .collect();

    let mut hw = HwCircuit::new(circuit.name);
    for (module, body) in circuit.modules.values().zip(bodies) {
        let body = body?;
        let Some(ports) = ctx.signature(module.name) else {
            continue;
        };
        let kind = match &module.kind {
            ModuleKind::Module => {
                failed |= module.body.is_some() && body.is_none();
                HwModuleKind::Module
            }
            ModuleKind::External { defname } => HwModuleKind::External {
                defname: defname.clone(),
            },
        };
        hw.add_module(HwModule {
            name: module.name,
            kind,
            ports: ports.ports.clone(),
            body,
            loc: module.loc,
        });
    }
    if !memories.is_empty() && !options.disable_mem_randomization {
        ctx.usage.mark(Macro::RandomizeMemInit);
    }
    for (summary, name) in memories {
        hw.add_module(memory::generated_module(summary, name, interner));
    }
    hw.binds = ctx.take_binds();
    hw.header = file_header(&ctx.usage, options);

    info!(
        "structural lowering produced {} modules and {} binds",
        hw.modules.len(),
        hw.binds.len()
    );
    Ok((hw, PassOutcome::from_failed(failed)))
}
