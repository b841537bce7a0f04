#![cfg(feature = "binary-cache")]

use std::collections::HashMap;

use stylebake::serial::DeserializeError;
use stylebake::{normalize, Compiler, MemoryLoader, Options, RuleTable, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn style(entries: &[(&str, Value)]) -> Value {
    Value::Object(
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect(),
    )
}

fn populated_table() -> RuleTable {
    let mut table = RuleTable::new();
    let decls = normalize(&style(&[
        ("color", Value::Str("red".into())),
        ("margin", Value::Str("1px 2px".into())),
        ("zIndex", Value::Num(3.0)),
        (
            ":hover",
            style(&[("color", Value::Str("blue".into()))]),
        ),
        (
            "@media (min-width: 600px)",
            style(&[("fontSize", Value::Num(18.0))]),
        ),
    ]))
    .unwrap();
    for decl in &decls {
        table.intern(decl).unwrap();
    }
    table
}

// ---------------------------------------------------------------------------
// Round-trip
// ---------------------------------------------------------------------------

#[test]
fn round_trip_keeps_rules_and_order() {
    let original = populated_table();
    let bytes = original.to_bytes().unwrap();
    let restored = RuleTable::from_bytes(&bytes).unwrap();

    assert_eq!(restored.len(), original.len());
    let a: Vec<_> = original.rules().cloned().collect();
    let b: Vec<_> = restored.rules().cloned().collect();
    assert_eq!(a, b);
    assert_eq!(restored.stylesheet(true), original.stylesheet(true));
}

#[test]
fn round_trip_with_compression() {
    let mut plain = RuleTable::new();
    let decl = normalize(&style(&[("color", Value::Str("red".into()))])).unwrap().remove(0);
    let full = plain.intern(&decl).unwrap().class_name.clone();

    let map = HashMap::from([(full[1..].to_owned(), "r".to_owned())]);
    let mut table = RuleTable::new().with_compression(map.clone());
    table.intern(&decl).unwrap();

    let restored = RuleTable::from_bytes(&table.to_bytes().unwrap()).unwrap();
    assert_eq!(restored.compression(), &map);
    assert_eq!(restored.get(&decl).unwrap().class_name, format!("{}_r", &full[..5]));
}

#[test]
fn empty_table_round_trips() {
    let bytes = RuleTable::new().to_bytes().unwrap();
    assert!(RuleTable::from_bytes(&bytes).unwrap().is_empty());
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.bin");
    let original = populated_table();
    original.to_binary_file(&path).unwrap();
    let restored = RuleTable::from_binary_file(&path).unwrap();
    assert_eq!(restored.len(), original.len());
}

#[test]
fn restored_table_continues_a_build() {
    let compiler = Compiler::new(Options::default(), MemoryLoader::new()).unwrap();
    let source = "import { css } from '@stylebake/react';\nconst a = <a css={{ color: 'red', marginTop: 4 }} />;";
    let mut first = compiler.rule_table();
    compiler.transform_with_table("src/a.jsx", source, &mut first).unwrap();

    let mut restored = RuleTable::from_bytes(&first.to_bytes().unwrap()).unwrap();
    let output = compiler.transform_with_table("src/b.jsx", source, &mut restored).unwrap();
    assert_eq!(restored.len(), 2);
    assert_eq!(output.rules.len(), 2);
}

// ---------------------------------------------------------------------------
// Corruption
// ---------------------------------------------------------------------------

#[test]
fn flipped_payload_byte_fails_checksum() {
    let mut bytes = populated_table().to_bytes().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    assert!(matches!(
        RuleTable::from_bytes(&bytes),
        Err(DeserializeError::ChecksumMismatch)
    ));
}

#[test]
fn truncated_blob_is_rejected() {
    let bytes = populated_table().to_bytes().unwrap();
    assert!(matches!(
        RuleTable::from_bytes(&bytes[..bytes.len() - 4]),
        Err(DeserializeError::LengthMismatch { .. })
    ));
}

#[test]
fn wrong_magic_is_rejected() {
    let mut bytes = populated_table().to_bytes().unwrap();
    bytes[0..4].copy_from_slice(b"OORO");
    let err = RuleTable::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, DeserializeError::BadMagic));
    assert_eq!(err.to_string(), "not a stylebake rule cache: invalid magic bytes");
}

#[test]
fn future_format_version_is_rejected() {
    let mut bytes = populated_table().to_bytes().unwrap();
    bytes[4..6].copy_from_slice(&99u16.to_le_bytes());
    assert!(matches!(
        RuleTable::from_bytes(&bytes),
        Err(DeserializeError::IncompatibleVersion { what: "format", blob: 99, .. })
    ));
}
