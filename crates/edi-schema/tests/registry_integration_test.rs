//! Integration tests for building mapping registries from disk and archives

use edi_schema::{Delimiters, Error, MappingsRegistry, SegmentNode};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const COMMON: &str = r#"
segments:
  children:
    - segment:
        segcode: DTM
        xmltag: DateTime
        fields:
          - xmltag: period
            components:
              - xmltag: qualifier
                required: true
              - xmltag: value
"#;

const ORDERS: &str = r#"{
    "description": {"name": "ORDERS", "version": "D:96A:UN", "namespace": "urn:orders"},
    "imports": [{"resource": "common.yaml", "namespace": "c"}],
    "segments": {"xmltag": "Order", "children": [
        {"segment": {"segcode": "BGM", "xmltag": "Header", "min_occurs": 1}},
        {"segment": {"ref": "c:DTM", "max_occurs": 35}}
    ]}
}"#;

const INVOIC: &str = r#"
description:
  name: INVOIC
  version: D:96A:UN
segments:
  xmltag: Invoice
  children:
    - segment:
        segcode: BGM
        min_occurs: 1
"#;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_directory_registers_messages_not_libraries() -> anyhow::Result<()> {
    let dir = tempdir().unwrap();
    write(dir.path(), "common.yaml", COMMON);
    write(dir.path(), "orders.json", ORDERS);
    write(dir.path(), "invoic.yml", INVOIC);
    write(dir.path(), "notes.txt", "ignored");

    let registry = MappingsRegistry::from_directory(dir.path())?;
    assert_eq!(registry.message_names(), vec!["INVOIC:D:96A:UN", "ORDERS:D:96A:UN"]);

    let orders = registry.resolve("ORDERS:D:96A:UN", &Delimiters::default())?;
    assert_eq!(orders.root().xmltag, "Order");
    assert!(orders.maps_segment("DTM"));
    assert_eq!(orders.namespace().unwrap().prefix, "orders");

    let SegmentNode::Segment(dtm) = &orders.root().children[1] else {
        panic!("expected DTM segment");
    };
    assert_eq!(dtm.xmltag, "DateTime");
    assert!(dtm.fields[0].components[0].required);
    Ok(())
}

#[test]
fn test_cyclic_directory_fails_to_load() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "a.json",
        r#"{"description": {"name": "A"}, "imports": [{"resource": "b.json", "namespace": "b"}],
            "segments": {"xmltag": "A"}}"#,
    );
    write(
        dir.path(),
        "b.json",
        r#"{"imports": [{"resource": "a.json", "namespace": "a"}], "segments": {}}"#,
    );

    match MappingsRegistry::from_directory(dir.path()) {
        Err(Error::CyclicImport { cycle }) => assert_eq!(cycle, "a.json -> b.json -> a.json"),
        other => panic!("Expected CyclicImport error, got {other:?}"),
    }
}

#[test]
fn test_duplicate_models_in_directory() {
    let dir = tempdir().unwrap();
    write(dir.path(), "invoic1.yaml", INVOIC);
    write(dir.path(), "invoic2.yaml", INVOIC);

    let result = MappingsRegistry::from_directory(dir.path());
    assert!(matches!(result, Err(Error::DuplicateModel(_))));
}

#[test]
fn test_from_files_rejects_library() {
    let dir = tempdir().unwrap();
    write(dir.path(), "common.yaml", COMMON);

    let result = MappingsRegistry::from_files(&[dir.path().join("common.yaml")]);
    assert!(matches!(result, Err(Error::InvalidFormat { .. })));
}

#[test]
fn test_from_archive() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("models.zip");
    let mut writer = ZipWriter::new(File::create(&archive).unwrap());
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in [
        ("META-INF/mapping-models.lst", "# message models\nd96a/orders.json\n"),
        ("d96a/orders.json", ORDERS),
        ("d96a/common.yaml", COMMON),
    ] {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();

    let registry = MappingsRegistry::from_archive(&archive, &dir.path().join("extracted")).unwrap();
    assert_eq!(registry.message_names(), vec!["ORDERS:D:96A:UN"]);
    assert!(dir.path().join("extracted/d96a/common.yaml").is_file());
}
