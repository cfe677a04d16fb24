//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::StrataConfig;
use std::path::Path;

/// The file looked up by [`load_config`] in a project directory.
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Loads `strata.toml` from a file path, or from a directory containing it.
pub fn load_config(path: &Path) -> Result<StrataConfig, ConfigError> {
    let file = if path.is_dir() {
        path.join(CONFIG_FILE_NAME)
    } else {
        path.to_path_buf()
    };
    let content = std::fs::read_to_string(&file).map_err(|source| ConfigError::Io {
        path: file.clone(),
        source,
    })?;
    load_config_from_str(&content).map_err(|e| e.in_file(file))
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<StrataConfig, ConfigError> {
    let config: StrataConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: None,
            message: e.to_string(),
        })?;
    validate_config(&config)?;
    Ok(config)
}

/// Rejects option combinations the passes cannot honor.
fn validate_config(config: &StrataConfig) -> Result<(), ConfigError> {
    if config.lowering.max_aggregate_depth == 0 {
        return Err(ConfigError::Invalid {
            path: None,
            message: "lowering.max_aggregate_depth must be at least 1".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, StrataConfig::default());
    }

    #[test]
    fn parse_lowering_table() {
        let config = load_config_from_str(
            r#"
[lowering]
preserve_aggregate = "vec"
preserve_public_types = false
insert_debug_info = true
strip_mux_pragmas = true
"#,
        )
        .unwrap();
        let l = &config.lowering;
        assert_eq!(l.preserve_aggregate, crate::PreserveAggregate::Vec);
        assert!(!l.preserve_public_types);
        assert!(l.insert_debug_info);
        assert!(l.strip_mux_pragmas);
        assert!(!l.disable_reg_randomization);
    }

    #[test]
    fn zero_depth_is_rejected() {
        let err = load_config_from_str("[lowering]\nmax_aggregate_depth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { path: None, .. }));
    }

    #[test]
    fn unknown_mode_is_parse_error() {
        let err = load_config_from_str("[lowering]\npreserve_aggregate = \"tree\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unknown_key_is_parse_error() {
        let err = load_config_from_str("[lowering]\nfast = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        writeln!(f, "[lowering]\nemit_chisel_asserts_as_sva = true").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert!(config.lowering.emit_chisel_asserts_as_sva);
    }

    #[test]
    fn file_errors_carry_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[lowering]\nmax_aggregate_depth = 0\n").unwrap();
        match load_config(&path).unwrap_err() {
            ConfigError::Invalid { path: Some(p), .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn io_error_from_missing_file() {
        let err = load_config(Path::new("/nonexistent/strata.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
