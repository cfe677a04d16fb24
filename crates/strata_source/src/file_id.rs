//! File table indices.

use serde::{Deserialize, Serialize};

/// Position of a file in the document file table and the
/// [`SourceMap`](crate::SourceMap).
///
/// Operations synthesized by a pass point at [`FileId::UNKNOWN`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(u32);

impl FileId {
    /// No file. Serializes as `4294967295`.
    pub const UNKNOWN: FileId = FileId(u32::MAX);

    /// The file at table position `raw`.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The table position.
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// Whether this is [`FileId::UNKNOWN`].
    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_never_names_a_table_entry() {
        assert!(FileId::UNKNOWN.is_unknown());
        assert!(!FileId::from_raw(0).is_unknown());
        assert_eq!(FileId::from_raw(7).index(), 7);
    }
}
