use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use packstruct_core::{ReaderSource, Record, RegistryDecl, StructRegistry};

fn case_dir(dir: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join(dir)
}

fn load_registry(dir: &str) -> StructRegistry {
    let text = fs::read_to_string(case_dir(dir).join("layouts.json")).expect("read layouts.json");
    let decl = RegistryDecl::from_json(&text).expect("parse layouts.json");
    StructRegistry::from_decl(&decl).expect("build layouts")
}

fn load_values(dir: &str) -> Record {
    let text = fs::read_to_string(case_dir(dir).join("values.json")).expect("read values.json");
    serde_json::from_str(&text).expect("parse values.json")
}

fn load_expected(dir: &str) -> Vec<u8> {
    let text = fs::read_to_string(case_dir(dir).join("expected.hex")).expect("read expected.hex");
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).expect("ascii hex");
            u8::from_str_radix(pair, 16).expect("hex byte")
        })
        .collect()
}

fn run_golden(dir: &str) {
    let registry = load_registry(dir);
    let layout = registry.resolve(None).expect("single layout");
    let values = load_values(dir);
    let expected = load_expected(dir);

    let packed = layout.pack(&values).expect("pack");
    assert_eq!(packed, expected, "golden bytes mismatch in {dir}");

    let unpacked = layout.unpack(&expected).expect("unpack");
    assert_eq!(unpacked, values, "golden record mismatch in {dir}");

    let mut source = ReaderSource::new(Cursor::new(expected.clone()));
    let streamed = layout.unpack_from_stream(&mut source).expect("stream unpack");
    assert_eq!(streamed, unpacked, "stream mismatch in {dir}");

    if layout.static_len().is_some() {
        let fast = layout.fast_unpack(&expected).expect("fast unpack");
        assert_eq!(fast, unpacked, "fast path mismatch in {dir}");
    }
}

#[test]
fn golden_something() {
    run_golden("tests/golden/something");
}

#[test]
fn golden_sensor_frame() {
    run_golden("tests/golden/sensor_frame");
}

#[test]
fn golden_offset_body() {
    run_golden("tests/golden/offset_body");
}

#[test]
fn golden_something_renders_tokens() {
    let registry = load_registry("tests/golden/something");
    let layout = registry.resolve(Some("something")).expect("named layout");
    let values = load_values("tests/golden/something");
    assert_eq!(layout.render(&values).unwrap(), "l< l< l< A11 x");
}

#[test]
fn golden_sensor_frame_is_static() {
    let registry = load_registry("tests/golden/sensor_frame");
    let layout = registry.resolve(None).expect("single layout");
    assert_eq!(layout.static_len(), Some(25));
    assert_eq!(
        layout.render(&Record::new()).unwrap(),
        "S> C e G H2 A6 x2"
    );
}
