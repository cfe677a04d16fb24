//! Errors from reading a `strata.toml`.

use std::path::PathBuf;

/// Why a configuration could not be loaded.
///
/// Errors from [`load_config`](crate::load_config) name the file they came
/// from; [`load_config_from_str`](crate::load_config_from_str) has no file
/// and leaves `path` empty.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the option schema.
    #[error("failed to parse configuration{}: {message}", located(path))]
    Parse {
        /// The file being parsed, if any.
        path: Option<PathBuf>,
        /// The TOML error, with line and column.
        message: String,
    },

    /// An option holds a value the passes cannot honor.
    #[error("invalid configuration{}: {message}", located(path))]
    Invalid {
        /// The file the option came from, if any.
        path: Option<PathBuf>,
        /// What is wrong with the value.
        message: String,
    },
}

impl ConfigError {
    /// Attaches `path` to a parse or validation error.
    pub(crate) fn in_file(self, file: PathBuf) -> Self {
        match self {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: Some(file),
                message,
            },
            ConfigError::Invalid { message, .. } => ConfigError::Invalid {
                path: Some(file),
                message,
            },
            io => io,
        }
    }
}

fn located(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_file() {
        let err = ConfigError::Parse {
            path: None,
            message: "expected '=' at line 3".to_string(),
        }
        .in_file(PathBuf::from("strata.toml"));
        assert_eq!(
            err.to_string(),
            "failed to parse configuration in strata.toml: expected '=' at line 3"
        );
    }

    #[test]
    fn invalid_without_file() {
        let err = ConfigError::Invalid {
            path: None,
            message: "bad".to_string(),
        };
        assert_eq!(err.to_string(), "invalid configuration: bad");
    }

    #[test]
    fn io_error_shows_path() {
        let err = ConfigError::Io {
            path: PathBuf::from("/gone/strata.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().starts_with("cannot read /gone/strata.toml:"));
    }
}
