//! Diagnostic codes and helper functions for structural-lowering errors.
//!
//! Error codes `E201`--`E211` cover constructs that have no structural
//! equivalent. Each of them fails the module being lowered.

use strata_diagnostics::{Diagnostic, DiagnosticCode, Label};
use strata_source::Location;

/// A type whose width was never inferred.
pub const E201: DiagnosticCode = DiagnosticCode::new(201);

/// An aggregate port carrying field-sensitive symbols.
pub const E202: DiagnosticCode = DiagnosticCode::new(202);

/// A zero-width port that something refers to by symbol.
pub const E203: DiagnosticCode = DiagnosticCode::new(203);

/// An operation with no structural form.
pub const E204: DiagnosticCode = DiagnosticCode::new(204);

/// A memory with bundle data.
pub const E205: DiagnosticCode = DiagnosticCode::new(205);

/// A connect or attach to something that is not a net.
pub const E206: DiagnosticCode = DiagnosticCode::new(206);

/// A connect whose source is wider than its destination.
pub const E207: DiagnosticCode = DiagnosticCode::new(207);

/// A `when` left over from earlier passes.
pub const E208: DiagnosticCode = DiagnosticCode::new(208);

/// An instance of a module that does not exist.
pub const E209: DiagnosticCode = DiagnosticCode::new(209);

/// A port of reference type.
pub const E210: DiagnosticCode = DiagnosticCode::new(210);

/// A `bits`, `head` or `tail` reaching outside its operand.
pub const E211: DiagnosticCode = DiagnosticCode::new(211);

/// Creates a diagnostic for a type of unknown width.
pub fn error_unknown_width(what: &str, loc: Location) -> Diagnostic {
    Diagnostic::error(E201, format!("cannot lower {what}: its width is unknown"), loc)
        .with_note("every width must be inferred before structural lowering")
}

/// Creates a diagnostic for an aggregate port with field-sensitive symbols.
pub fn error_port_field_symbols(port: &str, loc: Location) -> Diagnostic {
    Diagnostic::error(
        E202,
        format!("cannot lower aggregate port `{port}` with field sensitive symbols"),
        loc,
    )
    .with_label(Label::primary(loc, "port declared here"))
}

/// Creates a diagnostic for a zero-width port with a symbol.
pub fn error_zero_width_symbol(port: &str, loc: Location) -> Diagnostic {
    Diagnostic::error(
        E203,
        format!("zero width port `{port}` is referenced by name"),
        loc,
    )
    .with_note("zero width ports are removed, so nothing may refer to them")
}

/// Creates a diagnostic for an operation without a structural form.
pub fn error_unhandled(op: &str, loc: Location) -> Diagnostic {
    Diagnostic::error(E204, format!("cannot lower operation `{op}`"), loc)
}

/// Creates a diagnostic for a memory with bundle data.
pub fn error_bundle_memory(mem: &str, loc: Location) -> Diagnostic {
    Diagnostic::error(
        E205,
        format!("memory `{mem}` should have been split into ground-typed memories"),
        loc,
    )
    .with_label(Label::primary(loc, "declared here"))
}

/// Creates a diagnostic for a write to something other than a net.
pub fn error_not_inout(what: &str, loc: Location) -> Diagnostic {
    Diagnostic::error(E206, format!("{what} isn't an inout type"), loc)
}

/// Creates a diagnostic for a source wider than its destination.
pub fn error_truncation(src: u32, dest: u32, loc: Location) -> Diagnostic {
    Diagnostic::error(
        E207,
        format!("operand should not be a truncation: {src} bits into {dest} bits"),
        loc,
    )
}

/// Creates a diagnostic for a leftover `when`.
pub fn error_when(loc: Location) -> Diagnostic {
    Diagnostic::error(E208, "`when` must be expanded before structural lowering", loc)
}

/// Creates a diagnostic for an instance of a missing module.
pub fn error_unknown_module(module: &str, loc: Location) -> Diagnostic {
    Diagnostic::error(
        E209,
        format!("could not find module `{module}` referenced by instance"),
        loc,
    )
}

/// Creates a diagnostic for a reference-typed port.
pub fn error_ref_port(port: &str, loc: Location) -> Diagnostic {
    Diagnostic::error(E210, format!("port `{port}` has a reference type"), loc)
        .with_note("references must be resolved before structural lowering")
}

/// Creates a diagnostic for a bit selection outside its `width`-bit operand.
pub fn error_bit_range(op: &str, range: &str, width: u32, loc: Location) -> Diagnostic {
    Diagnostic::error(
        E211,
        format!("`{op}` selects {range} of a {width}-bit operand"),
        loc,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_formats() {
        assert_eq!(format!("{E201}"), "E201");
        assert_eq!(format!("{E206}"), "E206");
        assert_eq!(format!("{E210}"), "E210");
        assert_eq!(format!("{E211}"), "E211");
    }

    #[test]
    fn truncation_names_both_widths() {
        let d = error_truncation(8, 4, Location::UNKNOWN);
        assert_eq!(d.code, E207);
        assert!(d.message.contains("8 bits into 4 bits"));
    }

    #[test]
    fn unknown_width_has_note() {
        let d = error_unknown_width("port `a`", Location::UNKNOWN);
        assert_eq!(d.code, E201);
        assert_eq!(d.notes.len(), 1);
    }
}
