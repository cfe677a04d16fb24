//! The structural operator vocabulary.
//!
//! Operand conventions are listed per variant. Statement-like kinds with
//! nested blocks (`Always`, `IfDef`, `Initial`, `If`) keep them in
//! [`HwOp::regions`].

use crate::ids::{HwBlockId, HwValueId};
use serde::{Deserialize, Serialize};
use strata_common::{Ident, LogicVec};
use strata_ir::{EventControl, VerifKind};
use strata_source::Location;

/// Combinational arithmetic and logic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum CombOp {
    Add,
    Sub,
    Mul,
    DivU,
    DivS,
    ModU,
    ModS,
    And,
    Or,
    Xor,
    Shl,
    ShrU,
    ShrS,
}

impl CombOp {
    /// Lower-case mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            CombOp::Add => "add",
            CombOp::Sub => "sub",
            CombOp::Mul => "mul",
            CombOp::DivU => "divu",
            CombOp::DivS => "divs",
            CombOp::ModU => "modu",
            CombOp::ModS => "mods",
            CombOp::And => "and",
            CombOp::Or => "or",
            CombOp::Xor => "xor",
            CombOp::Shl => "shl",
            CombOp::ShrU => "shru",
            CombOp::ShrS => "shrs",
        }
    }
}

/// Integer comparison predicates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum ICmpPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl ICmpPredicate {
    /// Lower-case mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            ICmpPredicate::Eq => "eq",
            ICmpPredicate::Ne => "ne",
            ICmpPredicate::Slt => "slt",
            ICmpPredicate::Sle => "sle",
            ICmpPredicate::Sgt => "sgt",
            ICmpPredicate::Sge => "sge",
            ICmpPredicate::Ult => "ult",
            ICmpPredicate::Ule => "ule",
            ICmpPredicate::Ugt => "ugt",
            ICmpPredicate::Uge => "uge",
        }
    }
}

/// Payload of an instance operation.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct HwInstance {
    /// Name of the instantiated module.
    pub module: Ident,
    /// Input port names, one per operand.
    pub arg_names: Vec<Ident>,
    /// Output port names, one per result.
    pub result_names: Vec<Ident>,
    /// The instance is emitted through a bind statement instead.
    #[serde(default)]
    pub do_not_print: bool,
}

/// Payload of an assert, assume or cover.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct HwVerif {
    /// Statement kind.
    pub kind: VerifKind,
    /// Statement label, e.g. `assert__overflow`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Failure message format string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Operation kinds.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HwOpKind {
    /// An integer literal.
    Constant(LogicVec),
    /// An all-`x` literal of the result type.
    #[serde(rename = "constant_x")]
    ConstantX,
    /// A net; the result is `InOut`.
    Wire,
    /// A variable assigned from procedural code; the result is `InOut`.
    Reg,
    /// `[inout]`: the current value of a net.
    ReadInOut,
    /// `[dest, src]`: continuous assignment.
    Assign,
    /// `[dest, src]`: nonblocking procedural assignment.
    #[serde(rename = "passign")]
    PAssign,
    /// `[dest, src]`: blocking procedural assignment.
    #[serde(rename = "bpassign")]
    BPAssign,
    /// `[lhs, rhs]`
    Comb(CombOp),
    /// `[lhs, rhs]`, result `i1`.
    #[serde(rename = "icmp")]
    ICmp(ICmpPredicate),
    /// Operands from most to least significant.
    Concat,
    /// `[input]`: result-width bits starting at `low`.
    Extract {
        /// Lowest extracted bit.
        low: u32,
    },
    /// `[input]` repeated to the result width.
    Replicate,
    /// `[cond, true, false]`
    Mux,
    /// `[input]`: XOR reduction.
    Parity,
    /// Elements from the highest index down to element 0.
    ArrayCreate,
    /// `[array, index]`
    ArrayGet,
    /// `[array, low_index]`: result-length elements from `low_index`.
    ArraySlice,
    /// Arrays from the highest elements down to the lowest.
    ArrayConcat,
    /// `[inout array, index]`: a net for one element.
    ArrayIndexInOut,
    /// One operand per field.
    StructCreate,
    /// `[struct]`: field `i`.
    StructExtract(u32),
    /// `[inout struct]`: a net for field `i`.
    StructFieldInOut(u32),
    /// `[struct, value]`: `struct` with field `i` replaced.
    StructInject(u32),
    /// `[input]` reinterpreted as the result type.
    Bitcast,
    /// Inputs as operands, outputs as results.
    Instance(HwInstance),
    /// One operand per event; region 0 is the body.
    Always {
        /// Edge for each operand.
        events: Vec<EventControl>,
    },
    /// Region 0 if the macro is defined, region 1 otherwise.
    #[serde(rename = "ifdef")]
    IfDef {
        /// Macro tested.
        macro_name: String,
    },
    /// Region 0 runs once at time zero.
    Initial,
    /// `[cond]`; region 0 then, optional region 1 else.
    If,
    /// The value of a macro.
    MacroRef(String),
    /// `[fd, args...]`
    #[serde(rename = "fwrite")]
    FWrite {
        /// Format string.
        format: String,
    },
    /// `$finish`
    Finish,
    /// `$fatal`
    Fatal,
    /// `[args...]`: `$error(message, args...)`.
    ErrorPrint {
        /// Format string.
        message: String,
    },
    /// `[predicate, args...]`: immediate check in procedural code.
    Verif(HwVerif),
    /// `[clock, property, args...]`
    VerifConcurrent(HwVerif, EventControl),
    /// `[input]`: `$sampled(input)`.
    Sampled,
    /// Nets shorted together.
    Alias,
    /// Text emitted as is.
    Verbatim(String),
    /// Keeps the operands observable.
    Probe,
}

impl HwOpKind {
    /// Lower-case mnemonic used in dumps.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            HwOpKind::Constant(_) => "constant",
            HwOpKind::ConstantX => "constant_x",
            HwOpKind::Wire => "wire",
            HwOpKind::Reg => "reg",
            HwOpKind::ReadInOut => "read_inout",
            HwOpKind::Assign => "assign",
            HwOpKind::PAssign => "passign",
            HwOpKind::BPAssign => "bpassign",
            HwOpKind::Comb(op) => op.mnemonic(),
            HwOpKind::ICmp(_) => "icmp",
            HwOpKind::Concat => "concat",
            HwOpKind::Extract { .. } => "extract",
            HwOpKind::Replicate => "replicate",
            HwOpKind::Mux => "mux",
            HwOpKind::Parity => "parity",
            HwOpKind::ArrayCreate => "array_create",
            HwOpKind::ArrayGet => "array_get",
            HwOpKind::ArraySlice => "array_slice",
            HwOpKind::ArrayConcat => "array_concat",
            HwOpKind::ArrayIndexInOut => "array_index_inout",
            HwOpKind::StructCreate => "struct_create",
            HwOpKind::StructExtract(_) => "struct_extract",
            HwOpKind::StructFieldInOut(_) => "struct_field_inout",
            HwOpKind::StructInject(_) => "struct_inject",
            HwOpKind::Bitcast => "bitcast",
            HwOpKind::Instance(_) => "instance",
            HwOpKind::Always { .. } => "always",
            HwOpKind::IfDef { .. } => "ifdef",
            HwOpKind::Initial => "initial",
            HwOpKind::If => "if",
            HwOpKind::MacroRef(_) => "macro_ref",
            HwOpKind::FWrite { .. } => "fwrite",
            HwOpKind::Finish => "finish",
            HwOpKind::Fatal => "fatal",
            HwOpKind::ErrorPrint { .. } => "error",
            HwOpKind::Verif(v) => v.kind.mnemonic(),
            HwOpKind::VerifConcurrent(v, _) => match v.kind {
                VerifKind::Assert => "assert_concurrent",
                VerifKind::Assume => "assume_concurrent",
                VerifKind::Cover => "cover_concurrent",
            },
            HwOpKind::Sampled => "sampled",
            HwOpKind::Alias => "alias",
            HwOpKind::Verbatim(_) => "verbatim",
            HwOpKind::Probe => "probe",
        }
    }

    /// Returns `true` for side-effect free operations that may be removed
    /// once unused.
    pub fn is_pure(&self) -> bool {
        matches!(
            self,
            HwOpKind::Constant(_)
                | HwOpKind::ConstantX
                | HwOpKind::ReadInOut
                | HwOpKind::Comb(_)
                | HwOpKind::ICmp(_)
                | HwOpKind::Concat
                | HwOpKind::Extract { .. }
                | HwOpKind::Replicate
                | HwOpKind::Mux
                | HwOpKind::Parity
                | HwOpKind::ArrayCreate
                | HwOpKind::ArrayGet
                | HwOpKind::ArraySlice
                | HwOpKind::ArrayConcat
                | HwOpKind::ArrayIndexInOut
                | HwOpKind::StructCreate
                | HwOpKind::StructExtract(_)
                | HwOpKind::StructFieldInOut(_)
                | HwOpKind::StructInject(_)
                | HwOpKind::Bitcast
                | HwOpKind::MacroRef(_)
                | HwOpKind::Sampled
        )
    }
}

/// Attributes common to every structural operation.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HwOpAttrs {
    /// Declaration name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Ident>,
    /// Inner symbol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sym: Option<Ident>,
    /// Attributes emitted as comments next to the operation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sv_attributes: Vec<String>,
    /// Source-level name recorded for debuggers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_name: Option<String>,
}

impl HwOpAttrs {
    /// Attributes carrying only a name.
    pub fn named(name: Ident) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }
}

/// One operation of a structural body.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct HwOp {
    /// What the operation does.
    pub kind: HwOpKind,
    /// Operand values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operands: Vec<HwValueId>,
    /// Result values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<HwValueId>,
    /// Nested blocks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<HwBlockId>,
    /// Names, symbols and attributes.
    #[serde(default)]
    pub attrs: HwOpAttrs,
    /// Source location.
    #[serde(default)]
    pub loc: Location,
    /// The block holding this operation.
    pub parent: HwBlockId,
}

impl HwOp {
    /// The single result, if any.
    pub fn result(&self) -> Option<HwValueId> {
        self.results.first().copied()
    }
}
