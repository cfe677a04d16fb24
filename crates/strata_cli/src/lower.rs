//! `strata lower`: runs type lowering and, optionally, structural lowering.
//!
//! 1. Read the input document and rebuild its tables
//! 2. Resolve options: `strata.toml`, then command-line flags
//! 3. Lower aggregate types
//! 4. Lower to the structural form (unless `--stage types`)
//! 5. Render diagnostics and write the resulting document, with the names
//!    the passes minted sorted so the output does not depend on scheduling

use std::error::Error;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;
use strata_common::PassOutcome;
use strata_config::{LoweringOptions, StrataConfig, CONFIG_FILE_NAME};
use strata_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use strata_ir::{Circuit, Document};
use strata_lower_hw::lower_to_hw;
use strata_lower_types::lower_types;
use strata_source::SourceMap;

use crate::{GlobalArgs, LowerArgs, Stage};

/// Runs the `strata lower` command.
///
/// Returns exit code 0 if both passes succeed and 1 if either reported an
/// error. Unreadable input or an internal failure is returned as `Err`.
pub fn run(args: &LowerArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let input = Path::new(&args.input);
    let text = std::fs::read_to_string(input).map_err(|e| format!("cannot read {}: {e}", input.display()))?;
    let document: Document<Circuit> = serde_json::from_str(&text)?;
    let interner = document.interner()?;
    let inputs = document.strings.len();
    let sources = load_sources(&document.files, input.parent());
    let files = document.files;
    let mut circuit = document.top;

    let options = resolve_options(args, global)?;
    debug!("lowering options: {options:?}");
    let sink = DiagnosticSink::new();

    let outcome = lower_types(&mut circuit, &interner, &options, &sink)?;
    let code = if args.stage == Stage::Types || !outcome.is_success() {
        if !outcome.is_success() {
            info!("type lowering failed; skipping structural lowering");
        }
        write_output(args, &Document::canonical(&interner, inputs, files, circuit))?;
        outcome
    } else {
        let (hw, outcome) = lower_to_hw(&circuit, &interner, &options, &sink)?;
        write_output(args, &Document::canonical(&interner, inputs, files, hw))?;
        outcome
    };

    let renderer = TerminalRenderer::new(global.color);
    for diag in sink.take_all() {
        eprintln!("{}", renderer.render(&diag, &sources));
    }

    Ok(match code {
        PassOutcome::Success => 0,
        PassOutcome::Failure => {
            if !global.quiet {
                eprintln!("error: lowering failed with {} error(s)", sink.error_count().max(1));
            }
            1
        }
    })
}

/// Registers each file of the document, loading its text when it exists
/// next to the input so diagnostics can quote it.
fn load_sources(files: &[String], base: Option<&Path>) -> SourceMap {
    let mut map = SourceMap::new();
    for file in files {
        let path = match base {
            Some(dir) if Path::new(file).is_relative() => dir.join(file),
            _ => PathBuf::from(file),
        };
        if map.load_file(&path).is_err() {
            map.register(file.as_str());
        }
    }
    map
}

/// Options from the configuration file, overridden by flags.
///
/// `--config` names the file explicitly; otherwise `strata.toml` in the
/// working directory is used when present.
pub fn resolve_options(args: &LowerArgs, global: &GlobalArgs) -> Result<LoweringOptions, Box<dyn Error>> {
    let config = match &global.config {
        Some(path) => strata_config::load_config(Path::new(path))?,
        None => {
            let default = Path::new(CONFIG_FILE_NAME);
            if default.is_file() {
                strata_config::load_config(default)?
            } else {
                StrataConfig::default()
            }
        }
    };
    let mut options = config.lowering;
    if let Some(mode) = args.preserve_aggregate {
        options.preserve_aggregate = mode;
    }
    options.preserve_public_types &= !args.no_preserve_public_types;
    options.insert_debug_info |= args.insert_debug_info;
    options.strip_mux_pragmas |= args.strip_mux_pragmas;
    options.emit_chisel_asserts_as_sva |= args.emit_chisel_asserts_as_sva;
    options.disable_mem_randomization |= args.disable_mem_randomization;
    options.disable_reg_randomization |= args.disable_reg_randomization;
    Ok(options)
}

fn write_output<T: Serialize>(args: &LowerArgs, document: &T) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(document)?;
    match &args.output {
        Some(path) => std::fs::write(path, json + "\n").map_err(|e| format!("cannot write {path}: {e}"))?,
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cli, Command};
    use strata_config::PreserveAggregate;
    use clap::Parser;

    fn global(config: Option<String>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config,
        }
    }

    fn lower_args(extra: &[&str]) -> LowerArgs {
        let mut argv = vec!["strata", "lower", "in.json"];
        argv.extend_from_slice(extra);
        let Command::Lower(args) = Cli::parse_from(argv).command;
        args
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        std::fs::write(
            &path,
            "[lowering]\npreserve_aggregate = \"all\"\nstrip_mux_pragmas = true\n",
        )
        .unwrap();
        let args = lower_args(&["--preserve-aggregate", "vec", "--no-preserve-public-types"]);
        let options = resolve_options(&args, &global(Some(path.display().to_string()))).unwrap();
        assert_eq!(options.preserve_aggregate, PreserveAggregate::Vec);
        assert!(!options.preserve_public_types);
        assert!(options.strip_mux_pragmas);
    }

    #[test]
    fn config_file_alone_sets_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        std::fs::write(&path, "[lowering]\ndisable_reg_randomization = true\n").unwrap();
        let options = resolve_options(&lower_args(&[]), &global(Some(path.display().to_string()))).unwrap();
        assert!(options.disable_reg_randomization);
        assert_eq!(options.preserve_aggregate, PreserveAggregate::None);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let result = resolve_options(&lower_args(&[]), &global(Some("/nonexistent/strata.toml".into())));
        assert!(result.is_err());
    }

    #[test]
    fn unreadable_sources_are_still_registered() {
        let map = load_sources(&["nowhere.fir".to_string(), "also.fir".to_string()], None);
        assert_eq!(map.len(), 2);
    }
}
