//! The closed catalog of circuit operations.
//!
//! Every operation of a module body is an [`Operation`] whose [`OpKind`]
//! determines the meaning of its operands and results. Operand conventions
//! are listed on each variant.

use crate::annotations::Annotation;
use crate::ids::{BlockId, ValueId};
use crate::module::Direction;
use crate::types::{index_width, BundleField, FType};
use serde::{Deserialize, Serialize};
use strata_common::{Ident, Interner, LogicVec};
use strata_source::Location;

/// Whether a declaration's name must be kept.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameKind {
    /// A generated name that later passes may drop.
    #[default]
    Droppable,
    /// A user-visible name.
    Interesting,
}

/// Attributes common to every operation.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OpAttrs {
    /// Declaration name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Ident>,
    /// Whether [`name`](Self::name) must be kept.
    pub name_kind: NameKind,
    /// Annotations on the operation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    /// Inner symbol that other modules may refer to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sym: Option<Ident>,
    /// Source-level name recorded for debuggers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_name: Option<String>,
}

impl OpAttrs {
    /// Attributes carrying only a name.
    pub fn named(name: Ident) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }

    /// Attributes carrying an interesting name.
    pub fn interesting(name: Ident) -> Self {
        Self {
            name: Some(name),
            name_kind: NameKind::Interesting,
            ..Self::default()
        }
    }
}

/// Two-operand primitive operations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    DShl,
    DShr,
    Lt,
    Leq,
    Gt,
    Geq,
    Eq,
    Neq,
}

impl BinaryOp {
    /// Returns `true` for the six comparisons.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Leq | BinaryOp::Gt | BinaryOp::Geq | BinaryOp::Eq | BinaryOp::Neq
        )
    }

    /// Lower-case mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Rem => "rem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::DShl => "dshl",
            BinaryOp::DShr => "dshr",
            BinaryOp::Lt => "lt",
            BinaryOp::Leq => "leq",
            BinaryOp::Gt => "gt",
            BinaryOp::Geq => "geq",
            BinaryOp::Eq => "eq",
            BinaryOp::Neq => "neq",
        }
    }
}

/// Memory read-under-write behaviour.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum ReadUnderWrite {
    #[default]
    Undefined,
    Old,
    New,
}

/// The kind of a memory port.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum MemPortKind {
    Read,
    Write,
    ReadWrite,
    Debug,
}

/// One port of a memory declaration.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct MemPortDecl {
    /// Port name.
    pub name: Ident,
    /// Port kind.
    pub kind: MemPortKind,
    /// Annotations on the port result.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

/// A memory declaration. Each port is one result whose bundle type follows
/// from the port kind (see [`MemDecl::port_type`]).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct MemDecl {
    /// Number of words.
    pub depth: u64,
    /// Read latency in cycles.
    pub read_latency: u32,
    /// Write latency in cycles.
    pub write_latency: u32,
    /// Read-under-write policy.
    #[serde(default)]
    pub ruw: ReadUnderWrite,
    /// Type of one word.
    pub data_type: FType,
    /// Ports in result order.
    pub ports: Vec<MemPortDecl>,
}

impl MemDecl {
    /// Width of the address field.
    pub fn addr_width(&self) -> u32 {
        index_width(self.depth)
    }

    /// The result type of port `index`.
    pub fn port_type(&self, index: usize, interner: &Interner) -> FType {
        let field = |name: &str, ty: FType| BundleField::new(interner.get_or_intern(name), ty);
        let flipped = |name: &str, ty: FType| BundleField::flipped(interner.get_or_intern(name), ty);
        let addr = || field("addr", FType::uint(self.addr_width()));
        let en = || field("en", FType::uint(1));
        let clk = || field("clk", FType::Clock);
        let data = self.data_type.clone();
        match self.ports[index].kind {
            MemPortKind::Read => FType::Bundle(vec![addr(), en(), clk(), flipped("data", data)]),
            MemPortKind::Write => FType::Bundle(vec![
                addr(),
                en(),
                clk(),
                field("data", data),
                field("mask", self.data_type.mask_type()),
            ]),
            MemPortKind::ReadWrite => FType::Bundle(vec![
                addr(),
                en(),
                clk(),
                flipped("rdata", data.clone()),
                field("wmode", FType::uint(1)),
                field("wdata", data),
                field("wmask", self.data_type.mask_type()),
            ]),
            MemPortKind::Debug => FType::Ref(Box::new(FType::vector(data, self.depth as u32))),
        }
    }
}

/// A module instantiation. Results are the callee's ports in order.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct InstanceDecl {
    /// Name of the instantiated module.
    pub module: Ident,
    /// Emit the instance as a bind rather than inline.
    #[serde(default)]
    pub lower_to_bind: bool,
    /// Callee port names, one per result.
    pub port_names: Vec<Ident>,
    /// Callee port directions, one per result.
    pub port_directions: Vec<Direction>,
    /// Per-port annotations, empty or one list per result.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub port_annotations: Vec<Vec<Annotation>>,
}

/// Clock edge a concurrent check or clocked block triggers on.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum EventControl {
    #[default]
    Posedge,
    Negedge,
    Edge,
}

/// Which verification statement.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum VerifKind {
    Assert,
    Assume,
    Cover,
}

impl VerifKind {
    /// Lower-case mnemonic, also the label prefix.
    pub fn mnemonic(self) -> &'static str {
        match self {
            VerifKind::Assert => "assert",
            VerifKind::Assume => "assume",
            VerifKind::Cover => "cover",
        }
    }
}

/// How an assertion message is meant to be printed.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertFormat {
    /// Plain immediate or concurrent check.
    #[default]
    Plain,
    /// Chisel-style `if (cond) { $error(...); $fatal; }`.
    IfElseFatal,
}

/// Payload of an assert, assume or cover statement.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct VerifDecl {
    /// Statement kind.
    pub kind: VerifKind,
    /// Message format string.
    #[serde(default)]
    pub message: String,
    /// Emit as a concurrent property.
    #[serde(default)]
    pub concurrent: bool,
    /// Edge the concurrent form samples on.
    #[serde(default)]
    pub event: EventControl,
    /// Message style.
    #[serde(default)]
    pub format: AssertFormat,
    /// Macros the statement is wrapped in, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guards: Vec<String>,
}

/// Operation kinds.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    // Declarations.
    /// A wire. No operands.
    Wire,
    /// A register: `[clock]`.
    Reg,
    /// A register with reset: `[clock, reset, init]`.
    RegReset,
    /// A named expression: `[input]`.
    Node,
    /// A memory; one result per port.
    Mem(MemDecl),
    /// A module instance; one result per callee port.
    Instance(InstanceDecl),

    // Expressions.
    /// A literal.
    Constant(LogicVec),
    /// An undriven value.
    Invalid,
    /// Bundle field `i`: `[bundle]`.
    Subfield(u32),
    /// Vector element `i`: `[vector]`.
    Subindex(u32),
    /// Dynamic vector element: `[vector, index]`.
    Subaccess,
    /// `[sel, high, low]`.
    Mux,
    /// `[index, inputs...]`, inputs ordered from the last element down to
    /// element 0.
    MultibitMux,
    /// One operand per field.
    BundleCreate,
    /// One operand per element, element 0 first.
    VectorCreate,
    /// Reinterpret the bits of `[input]` as the result type.
    BitCast,
    /// `[input]`
    #[serde(rename = "as_uint")]
    AsUInt,
    /// `[input]`
    #[serde(rename = "as_sint")]
    AsSInt,
    /// `[input]`
    AsClock,
    /// `[input]`
    AsAsyncReset,
    /// `[input]`
    Cvt,
    /// `[input]`
    Neg,
    /// `[input]`
    Not,
    /// `[input]`
    #[serde(rename = "andr")]
    AndR,
    /// `[input]`
    #[serde(rename = "orr")]
    OrR,
    /// `[input]`
    #[serde(rename = "xorr")]
    XorR,
    /// `[input]`
    Pad(u32),
    /// `[input]`
    Shl(u32),
    /// `[input]`
    Shr(u32),
    /// `[input]`
    Head(u32),
    /// `[input]`
    Tail(u32),
    /// `[input]`
    Bits {
        /// Highest bit, inclusive.
        hi: u32,
        /// Lowest bit.
        lo: u32,
    },
    /// `[high, low]`
    Cat,
    /// `[lhs, rhs]`
    Binary(BinaryOp),
    /// Probe a hardware value: `[input]`.
    RefSend,
    /// Read a probe: `[ref]`.
    RefResolve,
    /// Element `i` of an aggregate probe: `[ref]`.
    RefSub(u32),

    // Statements.
    /// `[dest, src]`
    Connect,
    /// `[dest, src]` with identical types.
    StrictConnect,
    /// `[cond]`; regions are the then block and an optional else block.
    When,
    /// `[clock, cond, args...]`
    Printf {
        /// Format string.
        format: String,
    },
    /// `[clock, cond]`
    Stop {
        /// Simulator exit code.
        exit_code: i32,
    },
    /// `[clock, predicate, enable, message args...]`
    Verif(VerifDecl),
    /// Short analog nets together.
    Attach,
    /// Keep the operands observable.
    Probe,
    /// Does nothing.
    Skip,
}

impl OpKind {
    /// Lower-case mnemonic used in diagnostics.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpKind::Wire => "wire",
            OpKind::Reg => "reg",
            OpKind::RegReset => "regreset",
            OpKind::Node => "node",
            OpKind::Mem(_) => "mem",
            OpKind::Instance(_) => "instance",
            OpKind::Constant(_) => "constant",
            OpKind::Invalid => "invalidvalue",
            OpKind::Subfield(_) => "subfield",
            OpKind::Subindex(_) => "subindex",
            OpKind::Subaccess => "subaccess",
            OpKind::Mux => "mux",
            OpKind::MultibitMux => "multibit_mux",
            OpKind::BundleCreate => "bundlecreate",
            OpKind::VectorCreate => "vectorcreate",
            OpKind::BitCast => "bitcast",
            OpKind::AsUInt => "asUInt",
            OpKind::AsSInt => "asSInt",
            OpKind::AsClock => "asClock",
            OpKind::AsAsyncReset => "asAsyncReset",
            OpKind::Cvt => "cvt",
            OpKind::Neg => "neg",
            OpKind::Not => "not",
            OpKind::AndR => "andr",
            OpKind::OrR => "orr",
            OpKind::XorR => "xorr",
            OpKind::Pad(_) => "pad",
            OpKind::Shl(_) => "shl",
            OpKind::Shr(_) => "shr",
            OpKind::Head(_) => "head",
            OpKind::Tail(_) => "tail",
            OpKind::Bits { .. } => "bits",
            OpKind::Cat => "cat",
            OpKind::Binary(op) => op.mnemonic(),
            OpKind::RefSend => "ref.send",
            OpKind::RefResolve => "ref.resolve",
            OpKind::RefSub(_) => "ref.sub",
            OpKind::Connect => "connect",
            OpKind::StrictConnect => "strictconnect",
            OpKind::When => "when",
            OpKind::Printf { .. } => "printf",
            OpKind::Stop { .. } => "stop",
            OpKind::Verif(v) => v.kind.mnemonic(),
            OpKind::Attach => "attach",
            OpKind::Probe => "probe",
            OpKind::Skip => "skip",
        }
    }

    /// Returns `true` for operations without side effects that produce a
    /// single value.
    pub fn is_expression(&self) -> bool {
        !matches!(
            self,
            OpKind::Wire
                | OpKind::Reg
                | OpKind::RegReset
                | OpKind::Node
                | OpKind::Mem(_)
                | OpKind::Instance(_)
                | OpKind::Connect
                | OpKind::StrictConnect
                | OpKind::When
                | OpKind::Printf { .. }
                | OpKind::Stop { .. }
                | OpKind::Verif(_)
                | OpKind::Attach
                | OpKind::Probe
                | OpKind::Skip
        )
    }

    /// Infers the result type from the operand types.
    ///
    /// Returns `None` for kinds whose result type is not determined by their
    /// operands (constants, casts to aggregates, declarations, statements).
    pub fn infer_type(&self, operands: &[&FType]) -> Option<FType> {
        let width = |i: usize| operands.get(i).and_then(|t| t.ground_width());
        let signed = |i: usize| operands.get(i).is_some_and(|t| t.is_signed());
        let int = |signed: bool, w: Option<u32>| {
            if signed {
                FType::SInt(w)
            } else {
                FType::UInt(w)
            }
        };
        let ty = match self {
            OpKind::Subfield(i) | OpKind::Subindex(i) => operands.first()?.child(*i as usize)?.clone(),
            OpKind::Subaccess => operands.first()?.child(0)?.clone(),
            OpKind::RefSub(i) => {
                FType::Ref(Box::new(operands.first()?.child(*i as usize)?.clone()))
            }
            OpKind::RefSend => FType::Ref(Box::new((*operands.first()?).clone())),
            OpKind::RefResolve => match operands.first()? {
                FType::Ref(inner) => (**inner).clone(),
                _ => return None,
            },
            OpKind::Mux => {
                let (high, low) = (operands.get(1)?, operands.get(2)?);
                if high.is_integer() && low.is_integer() {
                    let w = width(1).zip(width(2)).map(|(a, b)| a.max(b));
                    int(high.is_signed(), w)
                } else {
                    (*high).clone()
                }
            }
            OpKind::MultibitMux => (*operands.get(1)?).clone(),
            OpKind::AsUInt => FType::UInt(operands.first()?.bit_width()),
            OpKind::AsSInt => FType::SInt(operands.first()?.bit_width()),
            OpKind::AsClock => FType::Clock,
            OpKind::AsAsyncReset => FType::AsyncReset,
            OpKind::Cvt => FType::SInt(if signed(0) { width(0) } else { width(0).map(|w| w + 1) }),
            OpKind::Neg => FType::SInt(width(0).map(|w| w + 1)),
            OpKind::Not => FType::UInt(width(0)),
            OpKind::AndR | OpKind::OrR | OpKind::XorR => FType::uint(1),
            OpKind::Pad(n) => int(signed(0), width(0).map(|w| w.max(*n))),
            OpKind::Shl(n) => int(signed(0), width(0).map(|w| w + n)),
            OpKind::Shr(n) => int(signed(0), width(0).map(|w| w.saturating_sub(*n).max(1))),
            OpKind::Head(n) => FType::uint(*n),
            OpKind::Tail(n) => FType::UInt(width(0).map(|w| w.saturating_sub(*n))),
            OpKind::Bits { hi, lo } => FType::uint(hi + 1 - lo),
            OpKind::Cat => FType::UInt(width(0).zip(width(1)).map(|(a, b)| a + b)),
            OpKind::Binary(op) => {
                if op.is_comparison() {
                    return Some(FType::uint(1));
                }
                let (a, b) = (width(0), width(1));
                let both = a.zip(b);
                let w = match op {
                    BinaryOp::Add | BinaryOp::Sub => both.map(|(a, b)| a.max(b) + 1),
                    BinaryOp::Mul => both.map(|(a, b)| a + b),
                    BinaryOp::Div => a.map(|a| if signed(0) { a + 1 } else { a }),
                    BinaryOp::Rem => both.map(|(a, b)| a.min(b)),
                    BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
                        return Some(FType::UInt(both.map(|(a, b)| a.max(b))));
                    }
                    BinaryOp::DShl => both.and_then(|(a, b)| {
                        1u32.checked_shl(b).map(|p| a + p - 1)
                    }),
                    BinaryOp::DShr => a,
                    _ => None,
                };
                int(signed(0), w)
            }
            _ => return None,
        };
        Some(ty)
    }
}

/// One operation of a module body.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Operation {
    /// What the operation does.
    pub kind: OpKind,
    /// Operand values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operands: Vec<ValueId>,
    /// Result values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ValueId>,
    /// Nested blocks (only `when` has any).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<BlockId>,
    /// Names, annotations and symbols.
    #[serde(default)]
    pub attrs: OpAttrs,
    /// Source location.
    #[serde(default)]
    pub loc: Location,
    /// The block that holds this operation.
    pub parent: BlockId,
}

impl Operation {
    /// The single result of an expression or declaration.
    pub fn result(&self) -> Option<ValueId> {
        self.results.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_result_types() {
        let u4 = FType::uint(4);
        let s3 = FType::sint(3);
        assert_eq!(OpKind::Cat.infer_type(&[&u4, &s3]), Some(FType::uint(7)));
        assert_eq!(OpKind::Binary(BinaryOp::Add).infer_type(&[&s3, &u4]), Some(FType::sint(5)));
        assert_eq!(OpKind::Binary(BinaryOp::Lt).infer_type(&[&u4, &u4]), Some(FType::uint(1)));
        assert_eq!(OpKind::Binary(BinaryOp::DShl).infer_type(&[&u4, &FType::uint(2)]), Some(FType::uint(7)));
        assert_eq!(OpKind::Bits { hi: 3, lo: 1 }.infer_type(&[&u4]), Some(FType::uint(3)));
        assert_eq!(OpKind::Shr(9).infer_type(&[&u4]), Some(FType::uint(1)));
        assert_eq!(OpKind::Cvt.infer_type(&[&u4]), Some(FType::sint(5)));
        assert_eq!(OpKind::AsUInt.infer_type(&[&s3]), Some(FType::uint(3)));
        assert_eq!(OpKind::Wire.infer_type(&[]), None);
    }

    #[test]
    fn accessor_result_types() {
        let v = FType::vector(FType::uint(2), 3);
        assert_eq!(OpKind::Subindex(2).infer_type(&[&v]), Some(FType::uint(2)));
        assert_eq!(OpKind::Subindex(3).infer_type(&[&v]), None);
        assert_eq!(OpKind::Subaccess.infer_type(&[&v, &FType::uint(2)]), Some(FType::uint(2)));
        let r = FType::Ref(Box::new(v.clone()));
        assert_eq!(
            OpKind::RefSub(1).infer_type(&[&r]),
            Some(FType::Ref(Box::new(FType::uint(2))))
        );
        assert_eq!(OpKind::RefResolve.infer_type(&[&r]), Some(v));
    }

    #[test]
    fn memory_port_types() {
        let interner = Interner::new();
        let mem = MemDecl {
            depth: 8,
            read_latency: 0,
            write_latency: 1,
            ruw: ReadUnderWrite::Undefined,
            data_type: FType::uint(8),
            ports: vec![
                MemPortDecl { name: interner.get_or_intern("r"), kind: MemPortKind::Read, annotations: vec![] },
                MemPortDecl { name: interner.get_or_intern("w"), kind: MemPortKind::Write, annotations: vec![] },
            ],
        };
        assert_eq!(mem.addr_width(), 3);
        assert_eq!(
            mem.port_type(0, &interner).display(&interner),
            "{addr: UInt<3>, en: UInt<1>, clk: Clock, flip data: UInt<8>}"
        );
        assert_eq!(
            mem.port_type(1, &interner).display(&interner),
            "{addr: UInt<3>, en: UInt<1>, clk: Clock, data: UInt<8>, mask: UInt<1>}"
        );
    }

    #[test]
    fn expression_classification() {
        assert!(OpKind::Cat.is_expression());
        assert!(OpKind::Invalid.is_expression());
        assert!(!OpKind::Wire.is_expression());
        assert!(!OpKind::Connect.is_expression());
        assert_eq!(OpKind::Binary(BinaryOp::Geq).mnemonic(), "geq");
    }

    #[test]
    fn kinds_serialize_by_name() {
        let json = serde_json::to_string(&OpKind::Bits { hi: 3, lo: 0 }).unwrap();
        assert_eq!(json, r#"{"bits":{"hi":3,"lo":0}}"#);
        let back: OpKind = serde_json::from_str(r#""strict_connect""#).unwrap();
        assert_eq!(back, OpKind::StrictConnect);
    }
}
