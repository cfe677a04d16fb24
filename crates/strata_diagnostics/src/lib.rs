//! Diagnostics reported by the lowering passes.
//!
//! A [`Diagnostic`] carries a severity, a stable [`DiagnosticCode`], the
//! location of the offending operation and optionally the module whose
//! lowering it aborted. Passes emit into a shared [`DiagnosticSink`] from
//! parallel workers; the CLI renders the result with a
//! [`DiagnosticRenderer`].

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{DiagnosticCode, Pass};
pub use diagnostic::{Diagnostic, Label, LabelStyle};
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
