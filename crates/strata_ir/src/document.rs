//! JSON interchange documents.
//!
//! Identifiers serialize as raw interner indices, so a document carries the
//! string table that gives them meaning. Locations carry raw file indices
//! resolved through the file table.

use serde::{Deserialize, Serialize};
use strata_common::{Ident, Interner, VisitIdents};
use strata_source::SourceMap;
use thiserror::Error;

/// Problems turning a document back into in-memory tables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// The string table lists the same string twice.
    #[error("string table lists \"{0}\" more than once")]
    DuplicateString(String),
}

/// A serialized circuit (or structural circuit) with its tables.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document<T> {
    /// String table; position `i` is `Ident::from_raw(i)`.
    pub strings: Vec<String>,
    /// File table; position `i` is `FileId::from_raw(i)`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    /// The payload.
    pub top: T,
}

impl<T> Document<T> {
    /// Captures `top` together with the tables its identifiers refer to.
    pub fn new(interner: &Interner, files: Vec<String>, top: T) -> Self {
        Self {
            strings: interner.to_table(),
            files,
            top,
        }
    }

    /// Captures `top` like [`Document::new`], but lists the strings
    /// interned after the first `inputs` in sorted order and renumbers
    /// `top` to match.
    ///
    /// Passes intern new names from parallel workers, so the raw value of a
    /// minted name depends on scheduling. Sorting them makes the document
    /// the same on every run. Strings read from the input keep their place.
    pub fn canonical(interner: &Interner, inputs: usize, files: Vec<String>, mut top: T) -> Self
    where
        T: VisitIdents,
    {
        let table = interner.to_table();
        let inputs = inputs.min(table.len());
        let mut minted: Vec<usize> = (inputs..table.len()).collect();
        minted.sort_unstable_by(|&a, &b| table[a].cmp(&table[b]));

        let mut renumber: Vec<u32> = (0..table.len() as u32).collect();
        for (offset, &old) in minted.iter().enumerate() {
            renumber[old] = (inputs + offset) as u32;
        }
        top.visit_idents(&mut |ident| {
            if let Some(&raw) = renumber.get(ident.as_raw() as usize) {
                *ident = Ident::from_raw(raw);
            }
        });

        let mut strings = table[..inputs].to_vec();
        strings.extend(minted.iter().map(|&i| table[i].clone()));
        Self { strings, files, top }
    }

    /// Rebuilds the interner whose indices match the string table.
    pub fn interner(&self) -> Result<Interner, DocumentError> {
        Interner::from_table(&self.strings).map_err(DocumentError::DuplicateString)
    }

    /// Registers every listed file, in order, so file indices line up.
    pub fn source_map(&self) -> SourceMap {
        let mut map = SourceMap::new();
        for file in &self.files {
            map.register(file.as_str());
        }
        map
    }

    /// Replaces the payload, keeping the tables.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Document<U> {
        Document {
            strings: self.strings,
            files: self.files,
            top: f(self.top),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Circuit, Module, Port};
    use crate::types::FType;

    #[test]
    fn circuit_roundtrip_keeps_names() {
        let i = Interner::new();
        let mut circuit = Circuit::new(i.get_or_intern("Top"));
        circuit.add_module(Module::new(
            i.get_or_intern("Top"),
            vec![Port::input(i.get_or_intern("clk"), FType::Clock)],
        ));
        let doc = Document::new(&i, vec!["top.fir".to_string()], circuit.clone());
        let json = serde_json::to_string(&doc).unwrap();
        let back: Document<Circuit> = serde_json::from_str(&json).unwrap();
        let interner = back.interner().unwrap();
        assert_eq!(back.top, circuit);
        assert_eq!(interner.resolve(back.top.name), "Top");
        assert_eq!(back.source_map().len(), 1);
    }

    #[test]
    fn minted_strings_are_sorted_and_renumbered() {
        let i = Interner::from_table(&["Top"]).unwrap();
        let mut circuit = Circuit::new(Ident::from_raw(0));
        // Minted out of order, as parallel workers may.
        let late = i.get_or_intern("w_b");
        let early = i.get_or_intern("w_a");
        circuit.add_module(Module::new(
            circuit.name,
            vec![Port::input(late, FType::uint(1)), Port::input(early, FType::uint(1))],
        ));

        let doc = Document::canonical(&i, 1, vec![], circuit);
        assert_eq!(doc.strings, vec!["Top", "w_a", "w_b"]);
        let ports = &doc.top.modules.values().next().unwrap().ports;
        assert_eq!(ports[0].name, Ident::from_raw(2));
        assert_eq!(ports[1].name, Ident::from_raw(1));
        assert_eq!(doc.top.name, Ident::from_raw(0));

        let rebuilt = doc.interner().unwrap();
        assert_eq!(rebuilt.resolve(ports[0].name), "w_b");
    }

    #[test]
    fn duplicate_strings_are_rejected() {
        let doc = Document {
            strings: vec!["a".to_string(), "a".to_string()],
            files: vec![],
            top: Ident::from_raw(0),
        };
        assert_eq!(
            doc.interner().err(),
            Some(DocumentError::DuplicateString("a".to_string()))
        );
    }
}
