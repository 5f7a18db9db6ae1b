//! Integration tests for registries loaded from disk before parsing

use edi_adapter_edifact::InterchangeParser;
use edi_events::{Cursor, TreeBuilder};
use edi_schema::{Error as SchemaError, MappingsRegistry};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const INTERCHANGE: &str = "UNB+UNOA:4+S+R+240101:1200+1'UNH+1+ORDERS:D:96A:UN'\
                           BGM+220+PO1'DTM+137:20240101:102'NAD+BY+1'UNS+S'UNT+6+1'UNZ+1+1'";

fn mappings_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/testdata/mappings")
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_testdata_registry() -> anyhow::Result<()> {
    let registry = MappingsRegistry::from_directory(&mappings_dir())?;
    assert_eq!(registry.message_names(), vec!["ORDERS:D:96A:UN"]);

    let orders = registry
        .get("ORDERS:D:96A:UN")
        .ok_or_else(|| anyhow::anyhow!("ORDERS is not registered"))?;
    assert!(orders.maps_segment("NAD"));
    assert!(orders.maps_segment("QTY"));
    assert!(!orders.maps_segment("FTX"));
    Ok(())
}

#[test]
fn test_self_import_fails_before_parsing() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "loop.yaml",
        "description:\n  name: LOOP\nimports:\n  - resource: loop.yaml\n    namespace: l\nsegments:\n  xmltag: Loop\n",
    );

    match MappingsRegistry::from_directory(dir.path()) {
        Err(SchemaError::CyclicImport { cycle }) => assert_eq!(cycle, "loop.yaml -> loop.yaml"),
        other => panic!("Expected CyclicImport error, got {other:?}"),
    }
}

#[test]
fn test_transitive_import_cycle_fails_before_parsing() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "orders.yaml",
        "description:\n  name: ORDERS\n  version: D:96A:UN\nimports:\n  - resource: a.yaml\n    namespace: a\nsegments:\n  xmltag: Order\n",
    );
    write(dir.path(), "a.yaml", "imports:\n  - resource: b.yaml\n    namespace: b\nsegments: {}\n");
    write(dir.path(), "b.yaml", "imports:\n  - resource: a.yaml\n    namespace: a\nsegments: {}\n");

    let result = MappingsRegistry::from_directory(dir.path());
    assert!(matches!(result, Err(SchemaError::CyclicImport { .. })), "{result:?}");
}

#[test]
fn test_parse_with_archive_registry() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("d96a.zip");
    let mut writer = ZipWriter::new(File::create(&archive).unwrap());
    let options = SimpleFileOptions::default();
    writer.start_file("META-INF/mapping-models.lst", options).unwrap();
    writer.write_all(b"d96a/orders.yaml\n").unwrap();
    for name in ["orders.yaml", "common.yaml"] {
        writer.start_file(format!("d96a/{name}"), options).unwrap();
        writer.write_all(&fs::read(mappings_dir().join(name)).unwrap()).unwrap();
    }
    writer.finish().unwrap();

    let registry = MappingsRegistry::from_archive(&archive, &dir.path().join("models")).unwrap();
    let parser = InterchangeParser::new(Arc::new(registry));

    let mut tree = TreeBuilder::new();
    parser.parse(INTERCHANGE.as_bytes(), &mut tree).unwrap();
    let root = tree.into_root().unwrap();
    let cursor = Cursor::new(&root);
    assert_eq!(cursor.text_at("interchangeMessage/Order/DateTime/period/qualifier").unwrap(), "137");

    // the parser is reusable across interchanges
    let mut second = TreeBuilder::new();
    parser.parse(INTERCHANGE.as_bytes(), &mut second).unwrap();
    assert_eq!(second.into_root().unwrap(), root);
}

#[test]
fn test_imported_namespace_scoped_to_each_message() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "parties.yaml",
        r#"
description:
  name: PARTIES
  namespace: urn:example:parties
segments:
  children:
    - segment:
        segcode: NAD
        xmltag: Party
        fields:
          - xmltag: qualifier
"#,
    );
    write(
        dir.path(),
        "orders.yaml",
        r#"
description:
  name: ORDERS
  version: D:96A:UN
  namespace: urn:example:orders
  namespace_prefix: ord
imports:
  - resource: parties.yaml
    namespace: pty
segments:
  xmltag: Order
  children:
    - segment:
        segcode: BGM
        xmltag: Header
        fields:
          - xmltag: number
    - segment:
        ref: pty:NAD
        max_occurs: 2
"#,
    );
    let registry = MappingsRegistry::from_files(&[dir.path().join("orders.yaml")]).unwrap();

    let input = "UNB+UNOW:4+S+R+240101:1200+1'\
                 UNH+1+ORDERS:D:96A:UN'BGM+Ä1'NAD+BY'NAD+SU'UNT+5+1'\
                 UNH+2+ORDERS:D:96A:UN'BGM+Ö2'NAD+BY'UNT+4+2'\
                 UNZ+2+1'";
    let mut tree = TreeBuilder::new();
    InterchangeParser::new(Arc::new(registry))
        .parse(input.as_bytes(), &mut tree)
        .unwrap();
    let root = tree.into_root().unwrap();

    let messages = root.find_children("interchangeMessage");
    assert_eq!(messages.len(), 2);
    for message in messages {
        let order = message.find_child("Order").unwrap();
        assert_eq!(order.attributes.get("xmlns:ord"), Some("urn:example:orders"));
        assert_eq!(order.find_child("Header").unwrap().name.prefixed(), "ord:Header");

        for party in order.find_children("Party") {
            assert_eq!(party.name.prefixed(), "pty:Party");
            assert_eq!(party.attributes.get("xmlns:pty"), Some("urn:example:parties"));
            assert_eq!(party.children[0].name.prefixed(), "pty:qualifier");
        }
    }
}
