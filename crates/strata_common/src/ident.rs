//! Interned names.
//!
//! Every module, port, field and value name is an [`Ident`]. Circuit
//! documents write identifiers as raw numbers next to a string table, and
//! [`Interner::from_table`] / [`Interner::to_table`] convert between that
//! table and a live interner without renumbering anything.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// An interned name; the raw value is its position in the string table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ident(u32);

impl Ident {
    /// The identifier at string table position `raw`.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Position in the string table.
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: keys round-trip through `usize` unchanged, and `try_from_usize`
// refuses anything that does not fit a `u32`.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Self)
    }
}

/// String interner shared by the worker threads of both passes.
///
/// Lowering mints names such as `w_a`, `.x.output` or `mem_combMem` from
/// several modules at once, so interning takes `&self`.
pub struct Interner {
    rodeo: ThreadedRodeo<Ident>,
}

impl Interner {
    /// An interner with no strings.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Rebuilds the interner described by a document string table.
    ///
    /// Position `i` of `table` becomes `Ident::from_raw(i)`. A string listed
    /// twice cannot keep both positions and is returned as the error.
    pub fn from_table<S: AsRef<str>>(table: &[S]) -> Result<Self, String> {
        let interner = Self::new();
        for (position, s) in table.iter().enumerate() {
            if interner.get_or_intern(s.as_ref()).0 as usize != position {
                return Err(s.as_ref().to_string());
            }
        }
        Ok(interner)
    }

    /// The string table for a document, including names minted by passes.
    pub fn to_table(&self) -> Vec<String> {
        (0..self.rodeo.len())
            .map(|i| self.rodeo.resolve(&Ident(i as u32)).to_string())
            .collect()
    }

    /// The identifier for `s`, interning it if needed.
    pub fn get_or_intern(&self, s: &str) -> Ident {
        self.rodeo.get_or_intern(s)
    }

    /// The identifier for `s` if it has been interned.
    pub fn get(&self, s: &str) -> Option<Ident> {
        self.rodeo.get(s)
    }

    /// `base` with `suffix` appended, e.g. `a` + `_b` = `a_b`.
    pub fn suffixed(&self, base: Ident, suffix: &str) -> Ident {
        let mut name = String::with_capacity(suffix.len() + 8);
        name.push_str(self.resolve(base));
        name.push_str(suffix);
        self.get_or_intern(&name)
    }

    /// The string behind `ident`. Panics if another interner produced it.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.rodeo.resolve(&ident)
    }

    /// Number of distinct strings.
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Whether nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

/// Values holding identifiers that can be renumbered in place.
///
/// Implementations must reach every [`Ident`] the value serializes.
pub trait VisitIdents {
    /// Calls `f` on every identifier held by `self`.
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident));
}

impl VisitIdents for Ident {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        f(self);
    }
}

impl<T: VisitIdents> VisitIdents for Option<T> {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        if let Some(inner) = self {
            inner.visit_idents(f);
        }
    }
}

impl<T: VisitIdents> VisitIdents for Vec<T> {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        for item in self {
            item.visit_idents(f);
        }
    }
}

impl<T: VisitIdents + ?Sized> VisitIdents for Box<T> {
    fn visit_idents(&mut self, f: &mut dyn FnMut(&mut Ident)) {
        (**self).visit_idents(f);
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}
