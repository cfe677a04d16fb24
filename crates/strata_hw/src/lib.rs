//! The structural output vocabulary of the lowering pipeline.
//!
//! An [`HwCircuit`] holds [`HwModule`]s whose [`HwBody`] contains only
//! ground integers, packed arrays and structs, nets, and the fixed set of
//! structural operators in [`HwOpKind`]: constants, net reads and
//! assignments, combinational logic, instances, clocked and conditional
//! blocks, macro references, prints and checks. A text emitter consumes
//! this form; none is part of this crate.

#![warn(missing_docs)]

pub mod body;
pub mod builder;
pub mod header;
pub mod ids;
mod idents;
pub mod module;
pub mod ops;
pub mod types;

pub use body::{HwBlock, HwBody, HwValue, HwValueDef, InsertPoint};
pub use builder::HwBuilder;
pub use header::HeaderItem;
pub use ids::{HwBlockId, HwModuleId, HwOpId, HwValueId};
pub use module::{Bind, HwCircuit, HwModule, HwModuleKind, HwPort, PortDirection};
pub use ops::{CombOp, HwInstance, HwOp, HwOpAttrs, HwOpKind, HwVerif, ICmpPredicate};
pub use types::{HwField, HwType};
