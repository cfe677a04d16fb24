//! Macros used by lowered bodies and the file header defining them.
//!
//! Module workers mark the macros they reference in a shared
//! [`MacroUsage`]; once every body is lowered, [`file_header`] emits the
//! definitions in a fixed order.

use std::sync::atomic::{AtomicBool, Ordering};
use strata_config::LoweringOptions;
use strata_hw::HeaderItem;

/// A macro whose definition may be needed in the header.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Macro {
    /// Registers are randomized at time zero.
    RandomizeRegInit,
    /// Memories are randomized at time zero.
    RandomizeMemInit,
    /// `PRINTF_COND_` guards printf statements.
    PrintfCond,
    /// `ASSERT_VERBOSE_COND_` guards assertion messages.
    AssertVerboseCond,
    /// `STOP_COND_` guards stop statements.
    StopCond,
}

/// Thread-safe record of which macros some body refers to.
#[derive(Debug, Default)]
pub struct MacroUsage {
    randomize_reg_init: AtomicBool,
    randomize_mem_init: AtomicBool,
    printf_cond: AtomicBool,
    assert_verbose_cond: AtomicBool,
    stop_cond: AtomicBool,
}

impl MacroUsage {
    fn flag(&self, m: Macro) -> &AtomicBool {
        match m {
            Macro::RandomizeRegInit => &self.randomize_reg_init,
            Macro::RandomizeMemInit => &self.randomize_mem_init,
            Macro::PrintfCond => &self.printf_cond,
            Macro::AssertVerboseCond => &self.assert_verbose_cond,
            Macro::StopCond => &self.stop_cond,
        }
    }

    /// Records that `m` is referenced.
    pub fn mark(&self, m: Macro) {
        self.flag(m).store(true, Ordering::Relaxed);
    }

    /// Returns `true` if `m` was marked.
    pub fn is_used(&self, m: Macro) -> bool {
        self.flag(m).load(Ordering::Relaxed)
    }
}

/// `` `ifdef guard `define name `endif ``, or the `ifndef` form when only
/// the fallback is given.
fn guarded_define(guard: &str, if_defined: Option<&str>, otherwise: Option<&str>) -> HeaderItem {
    let define = |text: Option<&str>| {
        text.map(|t| vec![HeaderItem::verbatim(format!("`define {t}"))])
            .unwrap_or_default()
    };
    HeaderItem::ifdef(guard, define(if_defined), define(otherwise))
}

/// The header items defining every used macro; empty if none is used.
pub fn file_header(usage: &MacroUsage, options: &LoweringOptions) -> Vec<HeaderItem> {
    let reg_init = usage.is_used(Macro::RandomizeRegInit) && !options.disable_reg_randomization;
    let mem_init = usage.is_used(Macro::RandomizeMemInit) && !options.disable_mem_randomization;
    let printf = usage.is_used(Macro::PrintfCond);
    let verbose = usage.is_used(Macro::AssertVerboseCond);
    let stop = usage.is_used(Macro::StopCond);
    let needs_random = reg_init || mem_init;
    if !(needs_random || printf || verbose || stop) {
        return Vec::new();
    }

    let mut items = vec![HeaderItem::verbatim(
        "// Standard header to adapt well known macros to our needs.",
    )];
    if reg_init {
        items.push(guarded_define("RANDOMIZE_REG_INIT", Some("RANDOMIZE"), None));
    }
    if mem_init {
        items.push(guarded_define("RANDOMIZE_MEM_INIT", Some("RANDOMIZE"), None));
    }
    if needs_random {
        items.push(HeaderItem::verbatim(""));
        items.push(HeaderItem::verbatim(
            "// RANDOM may be set to an expression that produces a 32-bit random unsigned value.",
        ));
        items.push(guarded_define("RANDOM", None, Some("RANDOM $random")));
    }
    if printf {
        items.push(HeaderItem::verbatim(""));
        items.push(HeaderItem::verbatim(
            "// Users can define 'PRINTF_COND' to add an extra gate to prints.",
        ));
        items.push(guarded_define(
            "PRINTF_COND",
            Some("PRINTF_COND_ (`PRINTF_COND)"),
            Some("PRINTF_COND_ 1"),
        ));
    }
    if verbose {
        items.push(HeaderItem::verbatim(""));
        items.push(HeaderItem::verbatim(
            "// Users can define 'ASSERT_VERBOSE_COND' to add an extra gate to assert error printing.",
        ));
        items.push(guarded_define(
            "ASSERT_VERBOSE_COND",
            Some("ASSERT_VERBOSE_COND_ (`ASSERT_VERBOSE_COND)"),
            Some("ASSERT_VERBOSE_COND_ 1"),
        ));
    }
    if stop {
        items.push(HeaderItem::verbatim(""));
        items.push(HeaderItem::verbatim(
            "// Users can define 'STOP_COND' to add an extra gate to stop conditions.",
        ));
        items.push(guarded_define(
            "STOP_COND",
            Some("STOP_COND_ (`STOP_COND)"),
            Some("STOP_COND_ 1"),
        ));
    }
    if needs_random {
        items.push(HeaderItem::verbatim(""));
        items.push(HeaderItem::verbatim(
            "// Users can define INIT_RANDOM as general code that gets injected into the",
        ));
        items.push(HeaderItem::verbatim("// initializer block for modules with registers."));
        items.push(guarded_define("INIT_RANDOM", None, Some("INIT_RANDOM")));
        items.push(HeaderItem::verbatim(""));
        items.push(HeaderItem::verbatim(
            "// If using random initialization, you can also define RANDOMIZE_DELAY to",
        ));
        items.push(HeaderItem::verbatim("// customize the delay used, otherwise 0.002 is used."));
        items.push(guarded_define("RANDOMIZE_DELAY", None, Some("RANDOMIZE_DELAY 0.002")));
        items.push(HeaderItem::verbatim(""));
        items.push(HeaderItem::verbatim(
            "// Define INIT_RANDOM_PROLOG_ for use in our modules below.",
        ));
        items.push(HeaderItem::ifdef(
            "RANDOMIZE",
            vec![guarded_define(
                "VERILATOR",
                Some("INIT_RANDOM_PROLOG_ `INIT_RANDOM"),
                Some("INIT_RANDOM_PROLOG_ `INIT_RANDOM #`RANDOMIZE_DELAY begin end"),
            )],
            vec![HeaderItem::verbatim("`define INIT_RANDOM_PROLOG_")],
        ));
    }
    items.push(HeaderItem::verbatim(""));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_hw::header::render;

    #[test]
    fn nothing_used_means_no_header() {
        let usage = MacroUsage::default();
        assert!(file_header(&usage, &LoweringOptions::default()).is_empty());
    }

    #[test]
    fn disabled_randomization_suppresses_its_defines() {
        let usage = MacroUsage::default();
        usage.mark(Macro::RandomizeRegInit);
        let options = LoweringOptions {
            disable_reg_randomization: true,
            ..LoweringOptions::default()
        };
        assert!(file_header(&usage, &options).is_empty());
    }

    #[test]
    fn printf_guard_has_fallback() {
        let usage = MacroUsage::default();
        usage.mark(Macro::PrintfCond);
        let text = render(&file_header(&usage, &LoweringOptions::default()));
        assert!(text.starts_with("// Standard header"));
        assert!(text.contains("`define PRINTF_COND_ (`PRINTF_COND)"));
        assert!(text.contains("`define PRINTF_COND_ 1"));
        assert!(!text.contains("RANDOM"));
    }

    #[test]
    fn register_init_pulls_in_random_prolog() {
        let usage = MacroUsage::default();
        usage.mark(Macro::RandomizeRegInit);
        let text = render(&file_header(&usage, &LoweringOptions::default()));
        assert!(text.contains("`define RANDOMIZE\n"));
        assert!(text.contains("`define RANDOM $random"));
        assert!(text.contains("`define RANDOMIZE_DELAY 0.002"));
        assert!(text.contains("`define INIT_RANDOM_PROLOG_ `INIT_RANDOM #`RANDOMIZE_DELAY begin end"));
        assert!(!text.contains("STOP_COND"));
    }
}
