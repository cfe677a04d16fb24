//! `file:line:col` locations.

use crate::file_id::FileId;
use serde::{Deserialize, Serialize};

/// A point in an input file. Lines and columns are 1-based.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Location {
    /// The file this location points into.
    pub file: FileId,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub col: u32,
}

impl Location {
    /// Location of operations synthesized by a pass.
    pub const UNKNOWN: Location = Location {
        file: FileId::UNKNOWN,
        line: 0,
        col: 0,
    };

    /// Creates a new location.
    pub fn new(file: FileId, line: u32, col: u32) -> Self {
        Self { file, line, col }
    }

    /// Returns `true` for [`Location::UNKNOWN`] and other file-less locations.
    pub fn is_unknown(&self) -> bool {
        self.file.is_unknown()
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unknown() {
        assert!(Location::default().is_unknown());
        assert!(!Location::new(FileId::from_raw(0), 3, 9).is_unknown());
    }

    #[test]
    fn serde_shape() {
        let loc = Location::new(FileId::from_raw(1), 12, 4);
        let json = serde_json::to_string(&loc).unwrap();
        assert_eq!(json, r#"{"file":1,"line":12,"col":4}"#);
    }
}
