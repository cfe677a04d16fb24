//! Strongly-typed configuration values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level layout of a `strata.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrataConfig {
    /// Options for both lowering passes.
    #[serde(default)]
    pub lowering: LoweringOptions,
}

/// How eagerly aggregate types are decomposed by type lowering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreserveAggregate {
    /// Decompose every aggregate.
    #[default]
    None,
    /// Keep one-dimensional vectors of ground elements.
    OneDimVec,
    /// Keep any aggregate that contains no bundle.
    Vec,
    /// Keep every passive aggregate.
    All,
}

impl fmt::Display for PreserveAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PreserveAggregate::None => "none",
            PreserveAggregate::OneDimVec => "onedimvec",
            PreserveAggregate::Vec => "vec",
            PreserveAggregate::All => "all",
        };
        f.write_str(s)
    }
}

impl FromStr for PreserveAggregate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(PreserveAggregate::None),
            "onedimvec" | "1d-vec" => Ok(PreserveAggregate::OneDimVec),
            "vec" => Ok(PreserveAggregate::Vec),
            "all" => Ok(PreserveAggregate::All),
            other => Err(format!("unknown aggregate preservation mode '{other}'")),
        }
    }
}

/// Options consumed by type lowering and structural lowering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoweringOptions {
    /// Aggregate-preservation mode for type lowering.
    pub preserve_aggregate: PreserveAggregate,
    /// Keep the ports of public modules fully decomposed.
    pub preserve_public_types: bool,
    /// Skip the random initialization of memories.
    pub disable_mem_randomization: bool,
    /// Skip the random initialization of registers.
    pub disable_reg_randomization: bool,
    /// Record dotted source names on decomposed values.
    pub insert_debug_info: bool,
    /// Emit formatted Chisel asserts as concurrent assertions.
    pub emit_chisel_asserts_as_sva: bool,
    /// Leave out the synthesis pragmas on array indexing.
    pub strip_mux_pragmas: bool,
    /// Deepest aggregate nesting type lowering will recurse into.
    pub max_aggregate_depth: u32,
}

impl Default for LoweringOptions {
    fn default() -> Self {
        Self {
            preserve_aggregate: PreserveAggregate::None,
            preserve_public_types: true,
            disable_mem_randomization: false,
            disable_reg_randomization: false,
            insert_debug_info: false,
            emit_chisel_asserts_as_sva: false,
            strip_mux_pragmas: false,
            max_aggregate_depth: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = LoweringOptions::default();
        assert_eq!(opts.preserve_aggregate, PreserveAggregate::None);
        assert!(opts.preserve_public_types);
        assert!(!opts.strip_mux_pragmas);
    }

    #[test]
    fn mode_parses_cli_spellings() {
        assert_eq!("vec".parse(), Ok(PreserveAggregate::Vec));
        assert_eq!("1d-vec".parse(), Ok(PreserveAggregate::OneDimVec));
        assert!("tree".parse::<PreserveAggregate>().is_err());
        assert_eq!(PreserveAggregate::OneDimVec.to_string(), "onedimvec");
    }
}
