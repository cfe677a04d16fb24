//! Source locations attached to circuit operations.
//!
//! Circuits arrive already parsed, so locations are `file:line:col`
//! triples rather than byte spans. The [`SourceMap`] records the file names
//! a circuit refers to and, when available, their text for rendering
//! snippets under diagnostics.

#![warn(missing_docs)]

pub mod file_id;
pub mod location;
pub mod source_map;

pub use file_id::FileId;
pub use location::Location;
pub use source_map::SourceMap;
