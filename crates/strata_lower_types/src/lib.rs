//! Aggregate type lowering.
//!
//! Replaces values of bundle and vector type with one value per ground
//! leaf, following the structure of the type. Module ports, instance
//! results, declarations, expressions, connects and memories are all
//! rewritten; aggregates the configured preservation mode keeps are left
//! whole. Every module is lowered independently, in parallel.
//!
//! # Usage
//!
//! ```ignore
//! let outcome = lower_types(&mut circuit, &interner, &options, &sink)?;
//! if !outcome.is_success() {
//!     // diagnostics were reported to `sink`
//! }
//! ```

#![warn(missing_docs)]

mod connect;
pub mod context;
pub mod errors;
mod lower;
mod memory;
pub mod peel;
pub mod ports;
pub mod tree;

use log::info;
use rayon::prelude::*;
use strata_common::{Interner, PassOutcome, StrataResult};
use strata_config::LoweringOptions;
use strata_diagnostics::DiagnosticSink;
use strata_ir::Circuit;

pub use context::TypeLoweringContext;
pub use tree::{Lowered, Tree};

/// Lowers the aggregate types of every module of `circuit` in place.
///
/// Modules that hit a user-facing error are reported to `sink` and left
/// unchanged, and the outcome is then [`PassOutcome::Failure`]. Only
/// internal bugs return `Err`.
pub fn lower_types(
    circuit: &mut Circuit,
    interner: &Interner,
    options: &LoweringOptions,
    sink: &DiagnosticSink,
) -> StrataResult<PassOutcome> {
    info!(
        "lowering types of {} modules (preserve: {:?})",
        circuit.modules.len(),
        options.preserve_aggregate
    );
    let ctx = TypeLoweringContext::new(circuit, interner, options, sink);
    let results: Vec<StrataResult<bool>> = circuit
        .modules
        .as_mut_slice()
        .par_iter_mut()
        .map(|module| ctx.lower_module(module))
        .collect();
    let mut failed = false;
    for result in results {
        failed |= !result?;
    }
    Ok(PassOutcome::from_failed(failed))
}
