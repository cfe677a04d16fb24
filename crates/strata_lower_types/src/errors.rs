//! Diagnostic codes and helper functions for type-lowering errors.
//!
//! Error codes `E101`--`E106` cover aggregates that cannot be decomposed.
//! Each of them fails the module being lowered; other modules are
//! unaffected.

use strata_diagnostics::{Diagnostic, DiagnosticCode, Label};
use strata_source::Location;

/// A symbol on an operation or port whose type must be decomposed.
pub const E101: DiagnosticCode = DiagnosticCode::new(101);

/// A memory with a debug port whose data must be split.
pub const E102: DiagnosticCode = DiagnosticCode::new(102);

/// An aggregate consumed whole whose leaves cannot be concatenated.
pub const E103: DiagnosticCode = DiagnosticCode::new(103);

/// An aggregate nested deeper than `max_aggregate_depth`.
pub const E104: DiagnosticCode = DiagnosticCode::new(104);

/// A memory whose data type contains a bundle.
pub const E105: DiagnosticCode = DiagnosticCode::new(105);

/// A type with more leaves, field IDs or bits than fit a `u32`.
pub const E106: DiagnosticCode = DiagnosticCode::new(106);

/// Creates a diagnostic for a symbol on a value that must be decomposed.
pub fn error_symbol_on_aggregate(what: &str, loc: Location) -> Diagnostic {
    Diagnostic::error(
        E101,
        format!("{what} has a symbol, but no symbols may exist on aggregates passed through LowerTypes"),
        loc,
    )
}

/// Creates a diagnostic for a memory with a debug port.
pub fn error_debug_port(mem: &str, port: &str, loc: Location) -> Diagnostic {
    Diagnostic::error(
        E102,
        format!("cannot lower memory `{mem}` with debug port `{port}`"),
        loc,
    )
    .with_note("debug ports read the whole memory and cannot be split per field")
}

/// Creates a diagnostic for an aggregate that an operation needs whole.
pub fn error_opaque_user(user: &str, ty: &str, loc: Location) -> Diagnostic {
    Diagnostic::error(
        E103,
        format!("cannot handle an opaque user `{user}` of aggregate type `{ty}` with non-ground type elements"),
        loc,
    )
}

/// Creates a diagnostic for an aggregate nested too deeply.
pub fn error_too_deep(depth: u32, max: u32, loc: Location) -> Diagnostic {
    Diagnostic::error(
        E104,
        format!("aggregate nested {depth} levels deep exceeds the limit of {max}"),
        loc,
    )
    .with_note("raise `max_aggregate_depth` in the `[lowering]` table to accept it")
}

/// Creates a diagnostic for a memory whose data type holds a bundle.
pub fn error_bundle_memory(mem: &str, loc: Location) -> Diagnostic {
    Diagnostic::error(
        E105,
        format!("memory `{mem}` has bundle-typed data"),
        loc,
    )
    .with_label(Label::primary(loc, "declared here"))
    .with_note("memory data must be ground or a vector of ground elements")
}

/// Creates a diagnostic for a type too large to number or measure.
pub fn error_too_large(ty: &str, loc: Location) -> Diagnostic {
    Diagnostic::error(E106, format!("type `{ty}` is too large to lower"), loc)
        .with_note("its leaf count, field IDs or total width exceed 2^32 - 1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_formats() {
        assert_eq!(format!("{E101}"), "E101");
        assert_eq!(format!("{E104}"), "E104");
        assert_eq!(format!("{E105}"), "E105");
        assert_eq!(format!("{E106}"), "E106");
    }

    #[test]
    fn symbol_diagnostic_names_the_value() {
        let d = error_symbol_on_aggregate("wire `w`", Location::UNKNOWN);
        assert_eq!(d.code, E101);
        assert!(d.message.starts_with("wire `w` has a symbol"));
    }

    #[test]
    fn depth_diagnostic_has_note() {
        let d = error_too_deep(5, 4, Location::UNKNOWN);
        assert_eq!(d.code, E104);
        assert_eq!(d.notes.len(), 1);
    }
}
