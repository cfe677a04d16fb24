//! Shared foundational types used across the strata lowering pipeline.
//!
//! This crate provides interned identifiers, 4-state constant payloads, and
//! the internal-error result type shared by every pass.

#![warn(missing_docs)]

pub mod ident;
pub mod logic;
pub mod logic_vec;
pub mod result;

pub use ident::{Ident, Interner, VisitIdents};
pub use logic::Logic;
pub use logic_vec::LogicVec;
pub use result::{InternalError, PassOutcome, StrataResult};
