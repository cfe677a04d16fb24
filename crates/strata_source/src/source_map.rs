//! Registry of the files circuit locations point into.

use crate::file_id::FileId;
use crate::location::Location;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

struct FileEntry {
    path: PathBuf,
    text: Option<String>,
}

/// The files referenced by a circuit's locations.
///
/// A file may be registered by name only; its text is loaded lazily by the
/// CLI when it exists on disk so diagnostics can quote the offending line.
pub struct SourceMap {
    files: Vec<FileEntry>,
}

impl SourceMap {
    /// Creates an empty source map.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Registers a file by name without its contents.
    pub fn register(&mut self, path: impl Into<PathBuf>) -> FileId {
        self.push(path.into(), None)
    }

    /// Registers a file together with its contents.
    pub fn add_source(&mut self, path: impl Into<PathBuf>, text: String) -> FileId {
        self.push(path.into(), Some(text))
    }

    /// Reads a file from disk and registers it.
    pub fn load_file(&mut self, path: &Path) -> Result<FileId, io::Error> {
        let text = std::fs::read_to_string(path)?;
        Ok(self.push(path.to_path_buf(), Some(text)))
    }

    fn push(&mut self, path: PathBuf, text: Option<String>) -> FileId {
        let id = FileId::from_raw(self.files.len() as u32);
        self.files.push(FileEntry { path, text });
        id
    }

    /// Returns the number of registered files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no file is registered.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns the path of a registered file.
    pub fn path(&self, id: FileId) -> Option<&Path> {
        self.files.get(id.index()).map(|f| f.path.as_path())
    }

    /// Returns the text of the line a location points at, if the file's
    /// contents are known.
    pub fn line_text(&self, loc: Location) -> Option<&str> {
        let text = self.files.get(loc.file.index())?.text.as_deref()?;
        text.lines().nth(loc.line.checked_sub(1)? as usize)
    }

    /// Formats a location as `path:line:col`, or `<unknown>`.
    pub fn display(&self, loc: Location) -> DisplayLocation<'_> {
        DisplayLocation { map: self, loc }
    }
}

impl Default for SourceMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Display adapter returned by [`SourceMap::display`].
pub struct DisplayLocation<'a> {
    map: &'a SourceMap,
    loc: Location,
}

impl fmt::Display for DisplayLocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.map.path(self.loc.file) {
            Some(path) => write!(f, "{}:{}:{}", path.display(), self.loc.line, self.loc.col),
            None => write!(f, "<unknown>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_display() {
        let mut map = SourceMap::new();
        let id = map.register("Top.fir");
        let loc = Location::new(id, 10, 5);
        assert_eq!(map.display(loc).to_string(), "Top.fir:10:5");
        assert_eq!(map.line_text(loc), None);
    }

    #[test]
    fn line_text_with_contents() {
        let mut map = SourceMap::new();
        let id = map.add_source("Top.fir", "circuit Top :\n  module Top :\n".to_string());
        assert_eq!(map.line_text(Location::new(id, 2, 3)), Some("  module Top :"));
        assert_eq!(map.line_text(Location::new(id, 9, 1)), None);
        assert_eq!(map.line_text(Location::new(id, 0, 1)), None);
    }

    #[test]
    fn unknown_location_displays_placeholder() {
        let map = SourceMap::new();
        assert_eq!(map.display(Location::UNKNOWN).to_string(), "<unknown>");
    }

    #[test]
    fn load_missing_file_fails() {
        let mut map = SourceMap::new();
        assert!(map.load_file(Path::new("/nonexistent/Top.fir")).is_err());
        assert!(map.is_empty());
    }
}
