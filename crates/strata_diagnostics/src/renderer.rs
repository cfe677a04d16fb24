//! Rendering diagnostics for the terminal.

use crate::diagnostic::{Diagnostic, LabelStyle};
use crate::severity::Severity;
use strata_source::SourceMap;

/// Formats diagnostics for output.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic, sources: &SourceMap) -> String;
}

/// Renders diagnostics in a rustc-like layout:
///
/// ```text
/// error[E205]: memory 'm' has bundle-typed data
///   --> Top.fir:10:5
///    |
/// 10 |     mem m :
///    |
///    = in module Top, during structural lowering
///    = note: ...
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, severity: Severity, text: &str) -> String {
        if self.color {
            format!("\x1b[1;{}m{text}\x1b[0m", severity.ansi_color())
        } else {
            text.to_string()
        }
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic, sources: &SourceMap) -> String {
        let mut out = String::new();
        let header = format!("{}[{}]", diag.severity, diag.code);
        out.push_str(&format!(
            "{}: {}\n",
            self.paint(diag.severity, &header),
            diag.message
        ));

        if !diag.location.is_unknown() {
            out.push_str(&format!("  --> {}\n", sources.display(diag.location)));
            if let Some(line) = sources.line_text(diag.location) {
                let line_num = diag.location.line.to_string();
                let pad = " ".repeat(line_num.len());
                out.push_str(&format!("{pad} |\n{line_num} | {line}\n{pad} |\n"));
            }
        }

        for label in &diag.labels {
            let marker = match label.style {
                LabelStyle::Primary => "-->",
                LabelStyle::Secondary => "...",
            };
            out.push_str(&format!(
                "  {marker} {}: {}\n",
                sources.display(label.location),
                label.message
            ));
        }
        match (&diag.module, diag.code.pass()) {
            (Some(module), Some(pass)) => out.push_str(&format!("   = in module {module}, during {}\n", pass.name())),
            (Some(module), None) => out.push_str(&format!("   = in module {module}\n")),
            (None, _) => {}
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        out
    }
}
