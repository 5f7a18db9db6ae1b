//! Mapping document loader with import resolution
//!
//! Documents are JSON or YAML, chosen by file extension. Imports are
//! resolved relative to the importing document's directory and loaded
//! depth-first; a document that is reached again while it is still being
//! loaded closes an import cycle and fails the whole load.

use crate::delimiters::Delimiters;
use crate::imports::{ImportScope, ImportedLibrary, TruncationOverrides};
use crate::model::{
    Component, DataType, Description, Edimap, Field, MaxOccurs, Segment, SegmentGroup, SegmentNode,
    SubComponent, ValueSpec,
};
use crate::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Serialization format of a mapping document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// `.yaml`/`.yml` are YAML, everything else JSON
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => DocumentFormat::Yaml,
            _ => DocumentFormat::Json,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MappingFile {
    #[serde(default)]
    description: Option<DescriptionFile>,
    #[serde(default)]
    delimiters: Option<Delimiters>,
    #[serde(default)]
    ignore_unmapped_segments: bool,
    #[serde(default)]
    imports: Vec<ImportFile>,
    segments: GroupFile,
}

#[derive(Debug, Deserialize)]
struct DescriptionFile {
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    namespace_prefix: Option<String>,
}

impl From<DescriptionFile> for Description {
    fn from(file: DescriptionFile) -> Self {
        Self {
            name: file.name,
            version: file.version,
            namespace: file.namespace,
            namespace_prefix: file.namespace_prefix,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImportFile {
    resource: String,
    namespace: String,
    #[serde(default)]
    truncatable_segments: Option<bool>,
    #[serde(default)]
    truncatable_fields: Option<bool>,
    #[serde(default)]
    truncatable_components: Option<bool>,
}

/// `max_occurs` accepts a count, `-1`, or `"*"`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OccursFile {
    Count(i64),
    Text(String),
}

impl OccursFile {
    fn to_max_occurs(&self, document: &str) -> Result<MaxOccurs> {
        match self {
            OccursFile::Count(-1) => Ok(MaxOccurs::Unbounded),
            OccursFile::Count(n) => u32::try_from(*n)
                .map(MaxOccurs::Bounded)
                .map_err(|_| Error::invalid(document, format!("invalid max_occurs {n}"))),
            OccursFile::Text(text) if text == "*" => Ok(MaxOccurs::Unbounded),
            OccursFile::Text(text) => text
                .parse()
                .map(MaxOccurs::Bounded)
                .map_err(|_| Error::invalid(document, format!("invalid max_occurs '{text}'"))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NodeFile {
    Segment(SegmentFile),
    Group(GroupFile),
}

#[derive(Debug, Deserialize)]
struct GroupFile {
    #[serde(default)]
    xmltag: String,
    #[serde(default)]
    min_occurs: u32,
    #[serde(default)]
    max_occurs: Option<OccursFile>,
    #[serde(default)]
    documentation: Option<String>,
    #[serde(default)]
    children: Vec<NodeFile>,
}

#[derive(Debug, Deserialize)]
struct SegmentFile {
    #[serde(default)]
    segcode: Option<String>,
    #[serde(default, rename = "ref")]
    reference: Option<String>,
    #[serde(default)]
    xmltag: Option<String>,
    #[serde(default)]
    min_occurs: Option<u32>,
    #[serde(default)]
    max_occurs: Option<OccursFile>,
    #[serde(default)]
    truncatable: Option<bool>,
    #[serde(default)]
    documentation: Option<String>,
    #[serde(default)]
    fields: Vec<FieldFile>,
    #[serde(default)]
    children: Vec<NodeFile>,
}

#[derive(Debug, Default, Deserialize)]
struct ValueFile {
    #[serde(default, rename = "type")]
    data_type: Option<DataType>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    min_length: Option<usize>,
    #[serde(default)]
    max_length: Option<usize>,
    #[serde(default)]
    pattern: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FieldFile {
    xmltag: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    truncatable: bool,
    #[serde(default)]
    value: Option<ValueFile>,
    #[serde(default)]
    components: Vec<ComponentFile>,
}

#[derive(Debug, Deserialize)]
struct ComponentFile {
    xmltag: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    truncatable: bool,
    #[serde(default)]
    value: Option<ValueFile>,
    #[serde(default)]
    sub_components: Vec<SubComponentFile>,
}

#[derive(Debug, Deserialize)]
struct SubComponentFile {
    xmltag: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    value: Option<ValueFile>,
}

/// Loads mapping documents and resolves their imports
///
/// Every file is loaded at most once per loader; later imports of the
/// same file reuse the resolved result.
#[derive(Debug, Default)]
pub struct MappingLoader {
    cache: HashMap<PathBuf, Edimap>,
    in_progress: Vec<PathBuf>,
}

impl MappingLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a mapping document from a file
    ///
    /// # Errors
    ///
    /// Returns `CyclicImport` when the document imports itself directly or
    /// transitively, `InvalidFormat`/`UnresolvedReference` for malformed
    /// documents, and `Io` when the file cannot be read.
    pub fn load_file(&mut self, path: &Path) -> Result<Edimap> {
        let path = path.canonicalize()?;

        if let Some(start) = self.in_progress.iter().position(|p| *p == path) {
            let mut cycle: Vec<String> = self.in_progress[start..].iter().map(|p| display_name(p)).collect();
            cycle.push(display_name(&path));
            return Err(Error::CyclicImport {
                cycle: cycle.join(" -> "),
            });
        }

        if let Some(cached) = self.cache.get(&path) {
            trace!("Reusing loaded mapping document {}", path.display());
            return Ok(cached.clone());
        }

        debug!("Loading mapping document {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        let document = display_name(&path);
        let file = parse_document(&content, DocumentFormat::from_path(&path), &document)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        self.in_progress.push(path.clone());
        let result = self.build(file, &base_dir, &document);
        self.in_progress.pop();

        let edimap = result?;
        self.cache.insert(path, edimap.clone());
        Ok(edimap)
    }

    /// Load a mapping document from JSON text; imports resolve against the
    /// current directory
    ///
    /// # Errors
    ///
    /// See [`MappingLoader::load_str`].
    pub fn load_from_json(&mut self, json: &str) -> Result<Edimap> {
        self.load_str(json, DocumentFormat::Json, Path::new("."), "<json>")
    }

    /// Load a mapping document from YAML text; imports resolve against the
    /// current directory
    ///
    /// # Errors
    ///
    /// See [`MappingLoader::load_str`].
    pub fn load_from_yaml(&mut self, yaml: &str) -> Result<Edimap> {
        self.load_str(yaml, DocumentFormat::Yaml, Path::new("."), "<yaml>")
    }

    /// Load a mapping document from text, resolving imports against `base_dir`
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` for syntax or structure errors, plus any
    /// error raised while loading imports.
    pub fn load_str(
        &mut self,
        content: &str,
        format: DocumentFormat,
        base_dir: &Path,
        document: &str,
    ) -> Result<Edimap> {
        let file = parse_document(content, format, document)?;
        self.build(file, base_dir, document)
    }

    fn build(&mut self, file: MappingFile, base_dir: &Path, document: &str) -> Result<Edimap> {
        let mut scope = ImportScope::new();
        for import in file.imports {
            let path = base_dir.join(&import.resource);
            if !path.is_file() {
                return Err(Error::invalid(
                    document,
                    format!("imported resource '{}' not found", import.resource),
                ));
            }
            let imported = self.load_file(&path)?;
            let overrides = TruncationOverrides {
                segments: import.truncatable_segments,
                fields: import.truncatable_fields,
                components: import.truncatable_components,
            };
            trace!("{} imports {} as '{}'", document, import.resource, import.namespace);
            let library = ImportedLibrary::new(&import.resource, imported, &import.namespace, overrides);
            scope.add(&import.namespace, library, document)?;
        }

        let description: Description = file.description.map(Into::into).unwrap_or_default();
        let converter = Converter {
            scope: &scope,
            document,
        };
        let segments = converter.root(file.segments)?;

        Ok(Edimap {
            description,
            delimiters: file.delimiters,
            ignore_unmapped_segments: file.ignore_unmapped_segments,
            segments,
        })
    }
}

fn parse_document(content: &str, format: DocumentFormat, document: &str) -> Result<MappingFile> {
    match format {
        DocumentFormat::Json => serde_json::from_str(content)
            .map_err(|e| Error::invalid(document, format!("JSON parse error: {e}"))),
        // `- segment: {..}` entries are single-key maps, not YAML `!tags`
        DocumentFormat::Yaml => serde_yaml::with::singleton_map_recursive::deserialize(
            serde_yaml::Deserializer::from_str(content),
        )
        .map_err(|e| Error::invalid(document, format!("YAML parse error: {e}"))),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// Converts the file structs of one document into model types
struct Converter<'a> {
    scope: &'a ImportScope,
    document: &'a str,
}

impl Converter<'_> {
    fn root(&self, file: GroupFile) -> Result<SegmentGroup> {
        let children = self.nodes(file.children)?;
        Ok(SegmentGroup {
            xmltag: file.xmltag,
            min_occurs: 1,
            max_occurs: MaxOccurs::Bounded(1),
            namespace: None,
            documentation: file.documentation,
            children,
        })
    }

    fn nodes(&self, files: Vec<NodeFile>) -> Result<Vec<SegmentNode>> {
        files
            .into_iter()
            .map(|node| match node {
                NodeFile::Segment(segment) => self.segment(segment).map(SegmentNode::Segment),
                NodeFile::Group(group) => self.group(group).map(SegmentNode::Group),
            })
            .collect()
    }

    fn group(&self, file: GroupFile) -> Result<SegmentGroup> {
        if file.xmltag.is_empty() {
            return Err(Error::invalid(self.document, "group without xmltag"));
        }
        let max_occurs = self.max_occurs(file.max_occurs.as_ref())?;
        let group = SegmentGroup {
            xmltag: file.xmltag,
            min_occurs: file.min_occurs,
            max_occurs,
            namespace: None,
            documentation: file.documentation,
            children: self.nodes(file.children)?,
        };
        if group.first_segcode().is_none() {
            return Err(Error::invalid(
                self.document,
                format!("group '{}' must start with a segment", group.xmltag),
            ));
        }
        Ok(group)
    }

    fn segment(&self, file: SegmentFile) -> Result<Segment> {
        let mut segment = match (file.segcode, file.reference) {
            (Some(segcode), None) => {
                if segcode.is_empty() {
                    return Err(Error::invalid(self.document, "segment with empty segcode"));
                }
                let xmltag = file.xmltag.unwrap_or_else(|| segcode.clone());
                let fields = file
                    .fields
                    .into_iter()
                    .map(|field| self.field(field))
                    .collect::<Result<Vec<_>>>()?;
                let mut segment = Segment::new(segcode, xmltag).with_fields(fields);
                segment.truncatable = file.truncatable.unwrap_or(false);
                segment
            }
            (None, Some(reference)) => {
                if !file.fields.is_empty() {
                    return Err(Error::invalid(
                        self.document,
                        format!("segment reference '{reference}' cannot declare fields"),
                    ));
                }
                let mut segment = self.scope.resolve(&reference, self.document)?;
                if let Some(xmltag) = file.xmltag {
                    segment.xmltag = xmltag;
                }
                if let Some(truncatable) = file.truncatable {
                    segment.truncatable = truncatable;
                }
                segment
            }
            _ => {
                return Err(Error::invalid(
                    self.document,
                    "segment needs exactly one of 'segcode' or 'ref'",
                ));
            }
        };

        if let Some(min) = file.min_occurs {
            segment.min_occurs = min;
        }
        if let Some(max) = file.max_occurs.as_ref() {
            segment.max_occurs = self.max_occurs(Some(max))?;
        }
        if file.documentation.is_some() {
            segment.documentation = file.documentation;
        }
        if !file.children.is_empty() {
            segment.children = self.nodes(file.children)?;
        }
        Ok(segment)
    }

    fn field(&self, file: FieldFile) -> Result<Field> {
        let components = file
            .components
            .into_iter()
            .map(|component| self.component(component))
            .collect::<Result<Vec<_>>>()?;
        Ok(Field {
            xmltag: self.xmltag(file.xmltag)?,
            required: file.required,
            truncatable: file.truncatable,
            value: self.value(file.value)?,
            components,
        })
    }

    fn component(&self, file: ComponentFile) -> Result<Component> {
        let sub_components = file
            .sub_components
            .into_iter()
            .map(|sub| {
                Ok(SubComponent {
                    xmltag: self.xmltag(sub.xmltag)?,
                    required: sub.required,
                    value: self.value(sub.value)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Component {
            xmltag: self.xmltag(file.xmltag)?,
            required: file.required,
            truncatable: file.truncatable,
            value: self.value(file.value)?,
            sub_components,
        })
    }

    fn xmltag(&self, xmltag: String) -> Result<String> {
        if xmltag.is_empty() {
            Err(Error::invalid(self.document, "value position without xmltag"))
        } else {
            Ok(xmltag)
        }
    }

    fn value(&self, file: Option<ValueFile>) -> Result<Option<ValueSpec>> {
        let Some(file) = file else {
            return Ok(None);
        };
        let pattern = file
            .pattern
            .map(|pattern| {
                Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
                    Error::invalid(self.document, format!("invalid pattern '{pattern}': {e}"))
                })
            })
            .transpose()?;
        Ok(Some(ValueSpec {
            data_type: file.data_type.unwrap_or_default(),
            format: file.format,
            min_length: file.min_length,
            max_length: file.max_length,
            pattern,
        }))
    }

    fn max_occurs(&self, file: Option<&OccursFile>) -> Result<MaxOccurs> {
        file.map_or(Ok(MaxOccurs::default()), |occurs| occurs.to_max_occurs(self.document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const ORDERS_JSON: &str = r#"
    {
        "description": {"name": "ORDERS", "version": "D:96A:UN", "namespace": "urn:orders"},
        "segments": {
            "xmltag": "Order",
            "children": [
                {"segment": {"segcode": "BGM", "xmltag": "Header", "min_occurs": 1,
                    "fields": [
                        {"xmltag": "documentName", "components": [
                            {"xmltag": "code", "required": true}
                        ]},
                        {"xmltag": "documentNumber", "required": true,
                         "value": {"type": "string", "max_length": 35}}
                    ]}},
                {"group": {"xmltag": "LineItem", "max_occurs": "*", "children": [
                    {"segment": {"segcode": "LIN", "xmltag": "Line", "min_occurs": 1}},
                    {"segment": {"segcode": "QTY", "xmltag": "Quantity", "max_occurs": -1,
                        "fields": [{"xmltag": "amount", "value": {"type": "decimal"}}]}}
                ]}}
            ]
        }
    }
    "#;

    #[test]
    fn test_load_from_json() {
        let edimap = MappingLoader::new().load_from_json(ORDERS_JSON).unwrap();

        assert_eq!(edimap.description.lookup_name(), "ORDERS:D:96A:UN");
        assert_eq!(edimap.segments.xmltag, "Order");
        assert_eq!(edimap.segments.children.len(), 2);

        let SegmentNode::Segment(bgm) = &edimap.segments.children[0] else {
            panic!("expected segment");
        };
        assert_eq!(bgm.min_occurs, 1);
        assert!(!bgm.truncatable);
        assert_eq!(bgm.fields[0].components[0].xmltag, "code");
        assert_eq!(bgm.fields[1].value.as_ref().unwrap().max_length, Some(35));

        let group = &edimap.segments.children[1];
        assert_eq!(group.max_occurs(), MaxOccurs::Unbounded);
        let SegmentNode::Group(group) = group else {
            panic!("expected group");
        };
        assert_eq!(group.children[1].max_occurs(), MaxOccurs::Unbounded);
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
description:
  name: INVOIC
  version: D:96A:UN
ignore_unmapped_segments: true
delimiters:
  segment: "~"
segments:
  xmltag: Invoice
  children:
    - segment:
        segcode: BGM
        fields:
          - xmltag: name
            value:
              type: date
              format: "%Y%m%d"
              pattern: "[0-9]+"
"#;
        let edimap = MappingLoader::new().load_from_yaml(yaml).unwrap();
        assert!(edimap.ignore_unmapped_segments);
        assert_eq!(edimap.delimiters.unwrap().segment, '~');

        let SegmentNode::Segment(bgm) = &edimap.segments.children[0] else {
            panic!("expected segment");
        };
        assert_eq!(bgm.xmltag, "BGM");
        let value = bgm.fields[0].value.as_ref().unwrap();
        assert_eq!(value.data_type, DataType::Date);
        assert!(value.pattern.as_ref().unwrap().is_match("2024"));
        assert!(!value.pattern.as_ref().unwrap().is_match("20x4"));
    }

    #[test]
    fn test_yaml_matches_json_document() {
        let yaml = r#"
description:
  name: ORDERS
  version: D:96A:UN
  namespace: urn:orders
segments:
  xmltag: Order
  children:
    - segment:
        segcode: BGM
        xmltag: Header
        min_occurs: 1
        fields:
          - xmltag: documentName
            components:
              - xmltag: code
                required: true
          - xmltag: documentNumber
            required: true
            value:
              type: string
              max_length: 35
    - group:
        xmltag: LineItem
        max_occurs: "*"
        children:
          - segment:
              segcode: LIN
              xmltag: Line
              min_occurs: 1
          - segment:
              segcode: QTY
              xmltag: Quantity
              max_occurs: -1
              fields:
                - xmltag: amount
                  value:
                    type: decimal
"#;
        let from_yaml = MappingLoader::new().load_from_yaml(yaml).unwrap();
        let from_json = MappingLoader::new().load_from_json(ORDERS_JSON).unwrap();

        assert_eq!(format!("{from_yaml:?}"), format!("{from_json:?}"));
        let SegmentNode::Group(group) = &from_yaml.segments.children[1] else {
            panic!("expected group");
        };
        assert_eq!(group.children[0].segcode(), Some("LIN"));
    }

    #[test]
    fn test_library_with_description_and_no_root_xmltag() {
        let yaml = r"
description:
  name: PARTIES
  namespace: urn:parties
segments:
  children:
    - segment:
        segcode: NAD
        xmltag: Party
";
        let edimap = MappingLoader::new().load_from_yaml(yaml).unwrap();
        assert_eq!(edimap.description.name, "PARTIES");
        assert!(edimap.segments.xmltag.is_empty());
        assert_eq!(edimap.segments.children.len(), 1);
    }

    #[test]
    fn test_invalid_documents() {
        let cases = [
            "not json",
            r#"{"segments": {"xmltag": "X", "children": [{"segment": {"xmltag": "A"}}]}}"#,
            r#"{"segments": {"xmltag": "X", "children": [{"group": {"xmltag": "G", "children": []}}]}}"#,
            r#"{"segments": {"xmltag": "X", "children": [{"segment": {"segcode": "A", "max_occurs": "many"}}]}}"#,
            r#"{"segments": {"xmltag": "X", "children": [{"segment": {"segcode": "A",
                "fields": [{"xmltag": "f", "value": {"pattern": "("}}]}}]}}"#,
        ];
        for case in cases {
            let result = MappingLoader::new().load_from_json(case);
            assert!(
                matches!(result, Err(Error::InvalidFormat { .. })),
                "expected InvalidFormat for {case}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_import_with_reference() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("common.yaml"),
            r#"
description:
  name: common
  namespace: urn:common
segments:
  children:
    - segment:
        segcode: NAD
        xmltag: NameAndAddress
        fields:
          - xmltag: partyQualifier
            required: true
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("orders.json"),
            r#"{
                "description": {"name": "ORDERS", "version": "D:96A:UN"},
                "imports": [{"resource": "common.yaml", "namespace": "c", "truncatable_fields": true}],
                "segments": {"xmltag": "Order", "children": [
                    {"segment": {"ref": "c:NAD", "min_occurs": 1, "max_occurs": 5}}
                ]}
            }"#,
        )
        .unwrap();

        let edimap = MappingLoader::new().load_file(&dir.path().join("orders.json")).unwrap();
        let SegmentNode::Segment(nad) = &edimap.segments.children[0] else {
            panic!("expected segment");
        };
        assert_eq!(nad.segcode, "NAD");
        assert_eq!(nad.min_occurs, 1);
        assert_eq!(nad.max_occurs, MaxOccurs::Bounded(5));
        assert!(nad.fields[0].truncatable);
        let ns = nad.namespace.as_ref().unwrap();
        assert_eq!((ns.uri.as_str(), ns.prefix.as_str()), ("urn:common", "c"));
    }

    #[test]
    fn test_unresolved_reference() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("lib.json"), r#"{"segments": {"children": []}}"#).unwrap();
        fs::write(
            dir.path().join("main.json"),
            r#"{"imports": [{"resource": "lib.json", "namespace": "l"}],
                "segments": {"xmltag": "M", "children": [{"segment": {"ref": "l:BGM"}}]}}"#,
        )
        .unwrap();

        let result = MappingLoader::new().load_file(&dir.path().join("main.json"));
        assert!(matches!(result, Err(Error::UnresolvedReference { .. })));
    }

    #[test]
    fn test_missing_import() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("main.json"),
            r#"{"imports": [{"resource": "missing.json", "namespace": "m"}],
                "segments": {"xmltag": "M"}}"#,
        )
        .unwrap();

        let err = MappingLoader::new().load_file(&dir.path().join("main.json")).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_self_import_is_cyclic() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("self.json"),
            r#"{"imports": [{"resource": "self.json", "namespace": "s"}], "segments": {"xmltag": "S"}}"#,
        )
        .unwrap();

        match MappingLoader::new().load_file(&dir.path().join("self.json")) {
            Err(Error::CyclicImport { cycle }) => assert_eq!(cycle, "self.json -> self.json"),
            other => panic!("Expected CyclicImport error, got {other:?}"),
        }
    }

    #[test]
    fn test_transitive_import_cycle() {
        let dir = tempdir().unwrap();
        for (name, target) in [("a.json", "b.json"), ("b.json", "c.json"), ("c.json", "a.json")] {
            fs::write(
                dir.path().join(name),
                format!(
                    r#"{{"imports": [{{"resource": "{target}", "namespace": "x"}}], "segments": {{"xmltag": "R"}}}}"#
                ),
            )
            .unwrap();
        }

        match MappingLoader::new().load_file(&dir.path().join("a.json")) {
            Err(Error::CyclicImport { cycle }) => {
                assert_eq!(cycle, "a.json -> b.json -> c.json -> a.json");
            }
            other => panic!("Expected CyclicImport error, got {other:?}"),
        }
    }

    #[test]
    fn test_shared_import_is_not_a_cycle() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("base.json"),
            r#"{"segments": {"children": [{"segment": {"segcode": "DTM"}}]}}"#,
        )
        .unwrap();
        for name in ["left.json", "right.json"] {
            fs::write(
                dir.path().join(name),
                r#"{"imports": [{"resource": "base.json", "namespace": "b"}],
                    "segments": {"children": [{"segment": {"ref": "b:DTM"}}]}}"#,
            )
            .unwrap();
        }
        fs::write(
            dir.path().join("top.json"),
            r#"{"imports": [{"resource": "left.json", "namespace": "l"},
                            {"resource": "right.json", "namespace": "r"}],
                "segments": {"xmltag": "Top", "children": [
                    {"segment": {"ref": "l:DTM"}}, {"segment": {"ref": "r:DTM", "xmltag": "Other"}}
                ]}}"#,
        )
        .unwrap();

        let edimap = MappingLoader::new().load_file(&dir.path().join("top.json")).unwrap();
        assert_eq!(edimap.segments.children.len(), 2);
        assert_eq!(edimap.segments.children[1].xmltag(), "Other");
    }

    #[test]
    fn test_document_format_from_path() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.yml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("a.yaml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("a.json")), DocumentFormat::Json);
    }
}
