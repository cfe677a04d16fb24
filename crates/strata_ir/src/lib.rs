//! The typed, aggregate-rich circuit IR consumed by the lowering passes.
//!
//! A [`Circuit`] holds [`Module`]s whose [`Body`] is an SSA graph of
//! [`Operation`]s over values of type [`FType`]. Bundles, vectors and
//! probes are first-class here; `strata_lower_types` removes them and
//! `strata_lower_hw` turns the result into structural form.

#![warn(missing_docs)]

pub mod annotations;
pub mod arena;
pub mod body;
pub mod builder;
pub mod document;
pub mod ids;
mod idents;
pub mod instance_graph;
pub mod memory;
pub mod module;
pub mod ops;
pub mod types;
pub mod uses;

pub use annotations::Annotation;
pub use arena::{Arena, ArenaId};
pub use body::{Block, Body, Value, ValueDef};
pub use builder::BodyBuilder;
pub use document::{Document, DocumentError};
pub use ids::{BlockId, ModuleId, OpId, ValueId};
pub use instance_graph::InstanceGraph;
pub use memory::MemorySummary;
pub use module::{Circuit, Direction, Module, ModuleKind, Port, Visibility};
pub use ops::{
    AssertFormat, BinaryOp, EventControl, InstanceDecl, MemDecl, MemPortDecl, MemPortKind,
    NameKind, OpAttrs, OpKind, Operation, ReadUnderWrite, VerifDecl, VerifKind,
};
pub use types::{BundleField, FType};
