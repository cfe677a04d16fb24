//! Canonical memory shapes used to share generated memory modules.

use crate::ops::{MemDecl, MemPortKind, ReadUnderWrite};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The shape of a memory. Two memories with equal summaries are served by
/// the same generated module.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct MemorySummary {
    /// Read ports.
    pub num_read_ports: u32,
    /// Write ports.
    pub num_write_ports: u32,
    /// Read-write ports.
    pub num_read_write_ports: u32,
    /// Width of one word.
    pub data_width: u32,
    /// Number of words.
    pub depth: u64,
    /// Read latency in cycles.
    pub read_latency: u32,
    /// Write latency in cycles.
    pub write_latency: u32,
    /// Width of the write mask.
    pub mask_bits: u32,
    /// Read-under-write policy.
    pub ruw: ReadUnderWrite,
}

impl MemorySummary {
    /// Summarizes a memory declaration; `None` if its data width is unknown.
    pub fn from_decl(decl: &MemDecl) -> Option<Self> {
        let count = |kind: MemPortKind| decl.ports.iter().filter(|p| p.kind == kind).count() as u32;
        Some(Self {
            num_read_ports: count(MemPortKind::Read),
            num_write_ports: count(MemPortKind::Write),
            num_read_write_ports: count(MemPortKind::ReadWrite),
            data_width: decl.data_type.bit_width()?,
            depth: decl.depth,
            read_latency: decl.read_latency,
            write_latency: decl.write_latency,
            mask_bits: decl.data_type.leaf_count(),
            ruw: decl.ruw,
        })
    }

    /// A one-bit mask folds into the enable.
    pub fn is_masked(&self) -> bool {
        self.mask_bits > 1
    }

    /// Data bits guarded by one mask bit.
    pub fn mask_granularity(&self) -> u32 {
        if self.is_masked() {
            self.data_width / self.mask_bits
        } else {
            self.data_width
        }
    }
}

impl fmt::Display for MemorySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FIRRTLMem_{}_{}_{}_{}_{}_{}_{}_{}_{}",
            self.num_read_ports,
            self.num_write_ports,
            self.num_read_write_ports,
            self.data_width,
            self.depth,
            self.read_latency,
            self.write_latency,
            self.mask_bits,
            self.ruw as u8,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::MemPortDecl;
    use crate::types::FType;
    use strata_common::Interner;

    fn decl(data_type: FType, kinds: &[MemPortKind]) -> MemDecl {
        let i = Interner::new();
        MemDecl {
            depth: 8,
            read_latency: 0,
            write_latency: 1,
            ruw: ReadUnderWrite::Undefined,
            data_type,
            ports: kinds
                .iter()
                .enumerate()
                .map(|(n, &kind)| MemPortDecl {
                    name: i.get_or_intern(&format!("p{n}")),
                    kind,
                    annotations: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn counts_ports_and_widths() {
        let s = MemorySummary::from_decl(&decl(
            FType::uint(8),
            &[MemPortKind::Read, MemPortKind::Write, MemPortKind::Read],
        ))
        .unwrap();
        assert_eq!((s.num_read_ports, s.num_write_ports, s.num_read_write_ports), (2, 1, 0));
        assert_eq!(s.data_width, 8);
        assert!(!s.is_masked());
        assert_eq!(s.mask_granularity(), 8);
        assert_eq!(s.to_string(), "FIRRTLMem_2_1_0_8_8_0_1_1_0");
    }

    #[test]
    fn vector_data_is_masked_per_element() {
        let s = MemorySummary::from_decl(&decl(FType::vector(FType::uint(8), 4), &[MemPortKind::Write]))
            .unwrap();
        assert_eq!(s.mask_bits, 4);
        assert!(s.is_masked());
        assert_eq!(s.mask_granularity(), 8);
    }

    #[test]
    fn equal_shapes_compare_equal() {
        let a = MemorySummary::from_decl(&decl(FType::uint(8), &[MemPortKind::Read])).unwrap();
        let b = MemorySummary::from_decl(&decl(FType::uint(8), &[MemPortKind::Read])).unwrap();
        assert_eq!(a, b);
        assert!(MemorySummary::from_decl(&decl(FType::UInt(None), &[])).is_none());
    }
}
