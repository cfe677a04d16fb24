//! Runs the `strata` binary over documents written to a temporary directory.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use strata_common::Interner;
use strata_hw::{HwCircuit, HwOpKind};
use strata_ir::{BodyBuilder, BundleField, Circuit, Document, FType, Module, Port};

fn strata(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_strata"))
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("failed to run strata")
}

/// `Top` passing a two-field bundle straight through.
fn bundle_passthrough(i: &Interner) -> Circuit {
    let io = FType::Bundle(vec![
        BundleField::new(i.get_or_intern("a"), FType::uint(1)),
        BundleField::new(i.get_or_intern("b"), FType::uint(2)),
    ]);
    let mut m = Module::new(
        i.get_or_intern("Top"),
        vec![
            Port::input(i.get_or_intern("in"), io.clone()),
            Port::output(i.get_or_intern("out"), io),
        ],
    );
    let body = m.body.as_mut().unwrap();
    let args = body.args.clone();
    BodyBuilder::new(body).connect(args[1], args[0]);
    let mut circuit = Circuit::new(m.name);
    circuit.add_module(m);
    circuit
}

/// `Top` driving `o` with `cat(w.b, w.a)` of a bundle wire with constant
/// fields.
fn cat_of_bundle_wire(i: &Interner) -> Circuit {
    let ty = FType::Bundle(vec![
        BundleField::new(i.get_or_intern("a"), FType::uint(2)),
        BundleField::new(i.get_or_intern("b"), FType::uint(2)),
    ]);
    let mut m = Module::new(i.get_or_intern("Top"), vec![Port::output(i.get_or_intern("o"), FType::uint(4))]);
    let body = m.body.as_mut().unwrap();
    let o = body.args[0];
    let mut b = BodyBuilder::new(body);
    let w = b.wire(i.get_or_intern("w"), ty);
    let wa = b.subfield(w, 0).unwrap();
    let wb = b.subfield(w, 1).unwrap();
    let one = b.uint(2, 1);
    let two = b.uint(2, 2);
    b.connect(wa, one);
    b.connect(wb, two);
    let cat = b.cat(wb, wa).unwrap();
    b.connect(o, cat);
    let mut circuit = Circuit::new(m.name);
    circuit.add_module(m);
    circuit
}

/// Eight modules passing differently named bundles through.
fn many_passthroughs(i: &Interner) -> Circuit {
    let io = FType::Bundle(vec![
        BundleField::new(i.get_or_intern("a"), FType::uint(1)),
        BundleField::new(i.get_or_intern("b"), FType::uint(2)),
    ]);
    let mut circuit = Circuit::new(i.get_or_intern("M0"));
    for k in 0..8 {
        let mut m = Module::new(
            i.get_or_intern(&format!("M{k}")),
            vec![
                Port::input(i.get_or_intern(&format!("in{k}")), io.clone()),
                Port::output(i.get_or_intern(&format!("out{k}")), io.clone()),
            ],
        );
        let body = m.body.as_mut().unwrap();
        let args = body.args.clone();
        BodyBuilder::new(body).connect(args[1], args[0]);
        circuit.add_module(m);
    }
    circuit
}

/// `Top` with a wire of unknown width, which structural lowering rejects.
fn unknown_width(i: &Interner) -> Circuit {
    let mut m = Module::new(i.get_or_intern("Top"), vec![]);
    let body = m.body.as_mut().unwrap();
    BodyBuilder::new(body).wire(i.get_or_intern("w"), FType::UInt(None));
    let mut circuit = Circuit::new(m.name);
    circuit.add_module(m);
    circuit
}

fn write_document(dir: &Path, i: &Interner, circuit: Circuit) -> String {
    let path = dir.join("in.json");
    let json = serde_json::to_string(&Document::new(i, vec![], circuit)).unwrap();
    std::fs::write(&path, json).unwrap();
    path.display().to_string()
}

fn strings(doc: &Value) -> Vec<&str> {
    doc["strings"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect()
}

#[test]
fn types_stage_flattens_bundle_ports() {
    let dir = tempfile::tempdir().unwrap();
    let i = Interner::new();
    let input = write_document(dir.path(), &i, bundle_passthrough(&i));
    let out = dir.path().join("out.json");

    let output = strata(
        &["lower", &input, "-o", out.to_str().unwrap(), "--stage", "types"],
        dir.path(),
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let names = strings(&doc);
    for expected in ["in_a", "in_b", "out_a", "out_b"] {
        assert!(names.contains(&expected), "missing {expected} in {names:?}");
    }
    assert!(doc["top"]["modules"].as_array().unwrap().len() == 1);
}

#[test]
fn hw_stage_writes_structural_circuit_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let i = Interner::new();
    let input = write_document(dir.path(), &i, bundle_passthrough(&i));

    let output = strata(&["--quiet", "lower", &input], dir.path());
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let doc: Value = serde_json::from_slice(&output.stdout).unwrap();
    let modules = doc["top"]["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0]["ports"].as_array().unwrap().len(), 4);
}

#[test]
fn failed_lowering_exits_with_one_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let i = Interner::new();
    let input = write_document(dir.path(), &i, unknown_width(&i));

    let output = strata(&["--color", "never", "lower", &input, "-o", "out.json"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("E201"), "stderr: {stderr}");
}

#[test]
fn config_file_in_working_directory_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let i = Interner::new();
    let input = write_document(dir.path(), &i, bundle_passthrough(&i));
    std::fs::write(dir.path().join("strata.toml"), "[lowering]\nno_such_option = 1\n").unwrap();

    let output = strata(&["lower", &input, "--stage", "types"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to parse configuration"), "stderr: {stderr}");
}

#[test]
fn missing_input_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = strata(&["lower", "absent.json"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot read absent.json"));
}

#[test]
fn bundle_wire_lowers_to_concatenation_of_field_wires() {
    let dir = tempfile::tempdir().unwrap();
    let i = Interner::new();
    let input = write_document(dir.path(), &i, cat_of_bundle_wire(&i));

    let output = strata(&["--quiet", "lower", &input], dir.path());
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let doc: Document<HwCircuit> = serde_json::from_slice(&output.stdout).unwrap();
    let names = doc.interner().unwrap();
    let top = doc.top.module_by_name(names.get("Top").unwrap()).unwrap();
    let body = top.body.as_ref().unwrap();
    let concat = body.op(body.defining_op(body.outputs[0]).unwrap());
    assert_eq!(concat.kind, HwOpKind::Concat);
    let wires: Vec<&str> = concat
        .operands
        .iter()
        .map(|&v| {
            let read = body.op(body.defining_op(v).unwrap());
            assert_eq!(read.kind, HwOpKind::ReadInOut);
            let wire = body.op(body.defining_op(read.operands[0]).unwrap());
            names.resolve(wire.attrs.name.unwrap())
        })
        .collect();
    assert_eq!(wires, vec!["w_b", "w_a"]);
}

#[test]
fn repeated_runs_write_identical_documents() {
    let dir = tempfile::tempdir().unwrap();
    let i = Interner::new();
    let input = write_document(dir.path(), &i, many_passthroughs(&i));

    let first = strata(&["--quiet", "lower", &input], dir.path());
    assert!(first.status.success(), "stderr: {}", String::from_utf8_lossy(&first.stderr));
    for _ in 0..3 {
        let again = strata(&["--quiet", "lower", &input], dir.path());
        assert!(again.stdout == first.stdout, "output changed between runs");
    }

    let doc: Value = serde_json::from_slice(&first.stdout).unwrap();
    let names = strings(&doc);
    let minted = &names[i.len()..];
    assert!(minted.contains(&"in3_a"), "{minted:?}");
    assert!(minted.windows(2).all(|w| w[0] < w[1]), "{minted:?}");
}
