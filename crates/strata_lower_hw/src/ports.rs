//! Type and port lowering.
//!
//! Flips disappear, bundles become packed structs, vectors become packed
//! arrays and every ground type becomes a plain integer. Zero-width ports
//! are dropped from the signature; analog ports become inout ports.

use crate::errors;
use strata_common::Interner;
use strata_diagnostics::Diagnostic;
use strata_hw::{HwField, HwPort, HwType, PortDirection};
use strata_ir::{Direction, FType, Module};

/// Debug-name annotation class moved onto the structural port.
pub const DEBUG_NAME_CLASS: &str = "hw.debug.name";

/// The structural type of `ty`, or `None` if some width is unknown.
///
/// References lower to the type they refer to.
pub fn lower_type(ty: &FType) -> Option<HwType> {
    Some(match ty {
        FType::UInt(w) | FType::SInt(w) | FType::Analog(w) => HwType::Int((*w)?),
        FType::Clock | FType::Reset | FType::AsyncReset => HwType::Int(1),
        FType::Bundle(fields) => HwType::Struct(
            fields
                .iter()
                .map(|f| {
                    Some(HwField {
                        name: f.name,
                        ty: lower_type(&f.ty)?,
                    })
                })
                .collect::<Option<Vec<_>>>()?,
        ),
        FType::Vector(elem, len) => HwType::array(lower_type(elem)?, *len),
        FType::Ref(inner) => lower_type(inner)?,
    })
}

/// The lowered signature of one module.
#[derive(Clone, Debug, Default)]
pub struct LoweredPorts {
    /// Structural ports in declaration order.
    pub ports: Vec<HwPort>,
    /// For every original port, its index in `ports`; `None` when dropped.
    pub index: Vec<Option<usize>>,
}

impl LoweredPorts {
    /// Argument types in argument order.
    pub fn argument_types(&self) -> Vec<HwType> {
        let mut args: Vec<&HwPort> = self.ports.iter().filter(|p| p.is_argument()).collect();
        args.sort_by_key(|p| p.arg_index);
        args.into_iter()
            .map(|p| match p.direction {
                PortDirection::InOut => HwType::inout(p.ty.clone()),
                _ => p.ty.clone(),
            })
            .collect()
    }

    /// Number of output ports.
    pub fn num_outputs(&self) -> usize {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Output)
            .count()
    }
}

/// Lowers the ports of `module`.
///
/// Outputs are numbered among the results, inputs and inouts among the
/// arguments, each in declaration order.
pub fn lower_ports(module: &Module, interner: &Interner) -> Result<LoweredPorts, Diagnostic> {
    let mut out = LoweredPorts::default();
    let (mut num_args, mut num_results) = (0u32, 0u32);
    for port in &module.ports {
        let name = interner.resolve(port.name);
        if port.ty.is_ref() {
            return Err(errors::error_ref_port(name, port.loc));
        }
        let Some(ty) = lower_type(&port.ty) else {
            return Err(errors::error_unknown_width(&format!("port `{name}`"), port.loc));
        };
        if ty.bit_width() == 0 {
            if port.sym.is_some() {
                return Err(errors::error_zero_width_symbol(name, port.loc));
            }
            out.index.push(None);
            continue;
        }
        let field_symbols = port
            .annotations
            .iter()
            .any(|a| a.is_dont_touch() && a.target_field.is_some_and(|f| f != 0));
        if field_symbols && !matches!(ty, HwType::Int(_)) {
            return Err(errors::error_port_field_symbols(name, port.loc));
        }

        let (direction, arg_index) = if matches!(port.ty, FType::Analog(_)) {
            num_args += 1;
            (PortDirection::InOut, num_args - 1)
        } else if port.direction == Direction::Out {
            num_results += 1;
            (PortDirection::Output, num_results - 1)
        } else {
            num_args += 1;
            (PortDirection::Input, num_args - 1)
        };
        let mut hw = HwPort::new(port.name, direction, ty, arg_index);
        hw.sym = port.sym;
        hw.loc = port.loc;
        hw.debug_name = port.debug_name.clone().or_else(|| {
            port.annotations
                .iter()
                .find(|a| a.class == DEBUG_NAME_CLASS)
                .and_then(|a| a.members.get("name"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        });
        out.index.push(Some(out.ports.len()));
        out.ports.push(hw);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ir::{Annotation, BundleField, Port};

    #[test]
    fn lowers_aggregates_and_drops_flips() {
        let i = Interner::new();
        let (a, b) = (i.get_or_intern("a"), i.get_or_intern("b"));
        let ty = FType::Bundle(vec![
            BundleField::new(a, FType::vector(FType::sint(3), 2)),
            BundleField::flipped(b, FType::Clock),
        ]);
        let lowered = lower_type(&ty).unwrap();
        assert_eq!(
            lowered,
            HwType::Struct(vec![
                HwField {
                    name: a,
                    ty: HwType::array(HwType::Int(3), 2)
                },
                HwField {
                    name: b,
                    ty: HwType::Int(1)
                },
            ])
        );
        assert_eq!(lower_type(&FType::UInt(None)), None);
    }

    #[test]
    fn numbers_arguments_and_results_separately() {
        let i = Interner::new();
        let m = Module::new(
            i.get_or_intern("M"),
            vec![
                Port::input(i.get_or_intern("a"), FType::uint(4)),
                Port::output(i.get_or_intern("o"), FType::uint(4)),
                Port::input(i.get_or_intern("z"), FType::uint(0)),
                Port::new(i.get_or_intern("x"), Direction::In, FType::Analog(Some(1))),
                Port::output(i.get_or_intern("p"), FType::uint(1)),
            ],
        );
        let lowered = lower_ports(&m, &i).unwrap();
        let summary: Vec<(&str, PortDirection, u32)> = lowered
            .ports
            .iter()
            .map(|p| (i.resolve(p.name), p.direction, p.arg_index))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a", PortDirection::Input, 0),
                ("o", PortDirection::Output, 0),
                ("x", PortDirection::InOut, 1),
                ("p", PortDirection::Output, 1),
            ]
        );
        assert_eq!(lowered.index, vec![Some(0), Some(1), None, Some(2), Some(3)]);
        assert_eq!(
            lowered.argument_types(),
            vec![HwType::Int(4), HwType::inout(HwType::Int(1))]
        );
    }

    #[test]
    fn zero_width_port_with_symbol_fails() {
        let i = Interner::new();
        let mut port = Port::input(i.get_or_intern("z"), FType::uint(0));
        port.sym = Some(i.get_or_intern("z_sym"));
        let m = Module::new(i.get_or_intern("M"), vec![port]);
        let diag = lower_ports(&m, &i).unwrap_err();
        assert_eq!(diag.code, errors::E203);
    }

    #[test]
    fn field_symbols_on_aggregate_port_fail() {
        let i = Interner::new();
        let mut port = Port::input(i.get_or_intern("v"), FType::vector(FType::uint(1), 2));
        port.annotations.push(Annotation::dont_touch().on_field(1));
        let m = Module::new(i.get_or_intern("M"), vec![port]);
        assert_eq!(lower_ports(&m, &i).unwrap_err().code, errors::E202);
    }

    #[test]
    fn unknown_width_and_ref_ports_fail() {
        let i = Interner::new();
        let m = Module::new(i.get_or_intern("M"), vec![Port::input(i.get_or_intern("u"), FType::UInt(None))]);
        assert_eq!(lower_ports(&m, &i).unwrap_err().code, errors::E201);
        let r = FType::Ref(Box::new(FType::uint(1)));
        let m = Module::new(i.get_or_intern("M"), vec![Port::output(i.get_or_intern("r"), r)]);
        assert_eq!(lower_ports(&m, &i).unwrap_err().code, errors::E210);
    }

    #[test]
    fn debug_name_comes_from_annotation() {
        let i = Interner::new();
        let mut port = Port::input(i.get_or_intern("a"), FType::uint(1));
        port.annotations
            .push(Annotation::new(DEBUG_NAME_CLASS).with_member("name", "io.a".into()));
        let m = Module::new(i.get_or_intern("M"), vec![port]);
        let lowered = lower_ports(&m, &i).unwrap();
        assert_eq!(lowered.ports[0].debug_name.as_deref(), Some("io.a"));
    }
}
