//! Mapping model definitions
//!
//! An [`Edimap`] is the grammar a message is matched against: an ordered
//! tree of groups and segments with occurrence bounds, where each segment
//! describes its fields, components and sub-components. [`EdifactModel`]
//! wraps a finished `Edimap` for shared, read-only use by parsers.

use crate::delimiters::Delimiters;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// Upper occurrence bound of a group or segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

impl MaxOccurs {
    /// Whether another occurrence is allowed after `count` matches
    #[must_use]
    pub fn allows(self, count: u32) -> bool {
        match self {
            MaxOccurs::Bounded(max) => count < max,
            MaxOccurs::Unbounded => true,
        }
    }
}

impl Default for MaxOccurs {
    fn default() -> Self {
        MaxOccurs::Bounded(1)
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxOccurs::Bounded(n) => write!(f, "{n}"),
            MaxOccurs::Unbounded => f.write_str("*"),
        }
    }
}

/// A namespace URI together with the prefix it is declared under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceBinding {
    pub uri: String,
    pub prefix: String,
}

impl NamespaceBinding {
    pub fn new(uri: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            prefix: prefix.into(),
        }
    }
}

/// Identity of a mapping model
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Description {
    /// Message name (e.g. "ORDERS")
    pub name: String,
    /// Version (e.g. "D:96A:UN")
    pub version: String,
    /// Namespace URI the message content is qualified with
    pub namespace: Option<String>,
    /// Prefix for `namespace`; defaults to the lowercased message name
    pub namespace_prefix: Option<String>,
}

impl Description {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            namespace: None,
            namespace_prefix: None,
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, uri: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.namespace = Some(uri.into());
        self.namespace_prefix = Some(prefix.into());
        self
    }

    /// Registry key: `name:version`, or just `name` without a version
    #[must_use]
    pub fn lookup_name(&self) -> String {
        if self.version.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.name, self.version)
        }
    }

    /// The namespace binding declared by this description, if any
    #[must_use]
    pub fn namespace_binding(&self) -> Option<NamespaceBinding> {
        let uri = self.namespace.as_ref()?;
        let prefix = self
            .namespace_prefix
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase());
        Some(NamespaceBinding::new(uri.clone(), prefix))
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} (version {})", self.name, self.version)
        }
    }
}

/// Declared data type of a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Any text (EDIFACT "an"/"a")
    #[default]
    String,
    /// Optionally signed whole number
    Integer,
    /// Optionally signed number using the active decimal mark
    Decimal,
    /// Calendar date; `format` is a chrono pattern, default `%Y%m%d`
    Date,
    /// Time of day; `format` is a chrono pattern, default `%H%M`
    Time,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::String => "String",
            DataType::Integer => "Integer",
            DataType::Decimal => "Decimal",
            DataType::Date => "Date",
            DataType::Time => "Time",
        };
        f.write_str(name)
    }
}

/// Data type plus validation facets of a value position
#[derive(Debug, Clone, Default)]
pub struct ValueSpec {
    pub data_type: DataType,
    /// Date/time pattern
    pub format: Option<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Compiled at load time so a bad pattern fails before any parse
    pub pattern: Option<Regex>,
}

impl ValueSpec {
    #[must_use]
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    #[must_use]
    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Human readable description of the expected value, for error messages
    #[must_use]
    pub fn expected(&self) -> String {
        let mut expected = self.data_type.to_string();
        if let Some(format) = &self.format {
            expected.push_str(&format!(" '{format}'"));
        }
        if let Some(pattern) = &self.pattern {
            expected.push_str(&format!(" matching '{}'", pattern.as_str()));
        }
        expected
    }
}

/// Innermost value position of a component
#[derive(Debug, Clone)]
pub struct SubComponent {
    pub xmltag: String,
    pub required: bool,
    pub value: Option<ValueSpec>,
}

impl SubComponent {
    pub fn new(xmltag: impl Into<String>) -> Self {
        Self {
            xmltag: xmltag.into(),
            required: false,
            value: None,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Component of a composite field
#[derive(Debug, Clone)]
pub struct Component {
    pub xmltag: String,
    pub required: bool,
    /// Trailing sub-components may be omitted
    pub truncatable: bool,
    pub value: Option<ValueSpec>,
    pub sub_components: Vec<SubComponent>,
}

impl Component {
    pub fn new(xmltag: impl Into<String>) -> Self {
        Self {
            xmltag: xmltag.into(),
            required: false,
            truncatable: false,
            value: None,
            sub_components: Vec::new(),
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: ValueSpec) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn with_sub_components(mut self, sub_components: Vec<SubComponent>) -> Self {
        self.sub_components = sub_components;
        self
    }
}

/// Data element of a segment; scalar when it has no components
#[derive(Debug, Clone)]
pub struct Field {
    pub xmltag: String,
    pub required: bool,
    /// Trailing components may be omitted
    pub truncatable: bool,
    pub value: Option<ValueSpec>,
    pub components: Vec<Component>,
}

impl Field {
    pub fn new(xmltag: impl Into<String>) -> Self {
        Self {
            xmltag: xmltag.into(),
            required: false,
            truncatable: false,
            value: None,
            components: Vec::new(),
        }
    }

    /// A composite field with the given components
    pub fn composite(xmltag: impl Into<String>, components: Vec<Component>) -> Self {
        Self {
            components,
            ..Self::new(xmltag)
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn truncatable(mut self, truncatable: bool) -> Self {
        self.truncatable = truncatable;
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: ValueSpec) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.components.is_empty()
    }
}

/// Leaf segment definition
#[derive(Debug, Clone)]
pub struct Segment {
    pub segcode: String,
    pub xmltag: String,
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
    /// Trailing fields may be omitted
    pub truncatable: bool,
    /// Set on segments that came from an import with its own namespace
    pub namespace: Option<NamespaceBinding>,
    pub documentation: Option<String>,
    pub fields: Vec<Field>,
    /// Segments nested under this one, matched after it
    pub children: Vec<SegmentNode>,
}

impl Segment {
    pub fn new(segcode: impl Into<String>, xmltag: impl Into<String>) -> Self {
        Self {
            segcode: segcode.into(),
            xmltag: xmltag.into(),
            min_occurs: 0,
            max_occurs: MaxOccurs::default(),
            truncatable: false,
            namespace: None,
            documentation: None,
            fields: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn occurs(mut self, min: u32, max: MaxOccurs) -> Self {
        self.min_occurs = min;
        self.max_occurs = max;
        self
    }

    #[must_use]
    pub fn truncatable(mut self, truncatable: bool) -> Self {
        self.truncatable = truncatable;
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<SegmentNode>) -> Self {
        self.children = children;
        self
    }
}

/// Container of ordered child nodes with occurrence bounds
#[derive(Debug, Clone)]
pub struct SegmentGroup {
    pub xmltag: String,
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
    pub namespace: Option<NamespaceBinding>,
    pub documentation: Option<String>,
    pub children: Vec<SegmentNode>,
}

impl SegmentGroup {
    pub fn new(xmltag: impl Into<String>) -> Self {
        Self {
            xmltag: xmltag.into(),
            min_occurs: 0,
            max_occurs: MaxOccurs::default(),
            namespace: None,
            documentation: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn occurs(mut self, min: u32, max: MaxOccurs) -> Self {
        self.min_occurs = min;
        self.max_occurs = max;
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<SegmentNode>) -> Self {
        self.children = children;
        self
    }

    /// Code of the segment that opens this group
    #[must_use]
    pub fn first_segcode(&self) -> Option<&str> {
        self.children.first().and_then(SegmentNode::segcode)
    }
}

/// A node of the grammar tree
#[derive(Debug, Clone)]
pub enum SegmentNode {
    Group(SegmentGroup),
    Segment(Segment),
}

impl SegmentNode {
    /// The segment code that starts a match of this node
    #[must_use]
    pub fn segcode(&self) -> Option<&str> {
        match self {
            SegmentNode::Group(group) => group.first_segcode(),
            SegmentNode::Segment(segment) => Some(&segment.segcode),
        }
    }

    #[must_use]
    pub fn xmltag(&self) -> &str {
        match self {
            SegmentNode::Group(group) => &group.xmltag,
            SegmentNode::Segment(segment) => &segment.xmltag,
        }
    }

    #[must_use]
    pub fn min_occurs(&self) -> u32 {
        match self {
            SegmentNode::Group(group) => group.min_occurs,
            SegmentNode::Segment(segment) => segment.min_occurs,
        }
    }

    /// Upper bound, never below the lower bound
    #[must_use]
    pub fn max_occurs(&self) -> MaxOccurs {
        let (min, max) = match self {
            SegmentNode::Group(group) => (group.min_occurs, group.max_occurs),
            SegmentNode::Segment(segment) => (segment.min_occurs, segment.max_occurs),
        };
        match max {
            MaxOccurs::Bounded(n) if n < min => MaxOccurs::Bounded(min),
            other => other,
        }
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&NamespaceBinding> {
        match self {
            SegmentNode::Group(group) => group.namespace.as_ref(),
            SegmentNode::Segment(segment) => segment.namespace.as_ref(),
        }
    }

    fn collect_segcodes<'a>(&'a self, codes: &mut HashSet<&'a str>) {
        let children = match self {
            SegmentNode::Group(group) => &group.children,
            SegmentNode::Segment(segment) => {
                codes.insert(&segment.segcode);
                &segment.children
            }
        };
        for child in children {
            child.collect_segcodes(codes);
        }
    }
}

impl From<Segment> for SegmentNode {
    fn from(segment: Segment) -> Self {
        SegmentNode::Segment(segment)
    }
}

impl From<SegmentGroup> for SegmentNode {
    fn from(group: SegmentGroup) -> Self {
        SegmentNode::Group(group)
    }
}

/// A complete mapping document after imports have been resolved
#[derive(Debug, Clone)]
pub struct Edimap {
    pub description: Description,
    /// Delimiters the model was written for; `None` accepts any
    pub delimiters: Option<Delimiters>,
    pub ignore_unmapped_segments: bool,
    /// Root container; its `xmltag` names the message content element
    pub segments: SegmentGroup,
}

impl Edimap {
    pub fn new(description: Description, segments: SegmentGroup) -> Self {
        Self {
            description,
            delimiters: None,
            ignore_unmapped_segments: false,
            segments,
        }
    }

    #[must_use]
    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = Some(delimiters);
        self
    }

    #[must_use]
    pub fn ignore_unmapped_segments(mut self, ignore: bool) -> Self {
        self.ignore_unmapped_segments = ignore;
        self
    }
}

/// Compiled, immutable mapping model shared by any number of parses
#[derive(Debug, Clone)]
pub struct EdifactModel {
    edimap: Edimap,
    mapped_codes: HashSet<String>,
}

impl EdifactModel {
    #[must_use]
    pub fn new(edimap: Edimap) -> Self {
        let mut codes = HashSet::new();
        for child in &edimap.segments.children {
            child.collect_segcodes(&mut codes);
        }
        let mapped_codes = codes.into_iter().map(str::to_string).collect();
        Self {
            edimap,
            mapped_codes,
        }
    }

    #[must_use]
    pub fn edimap(&self) -> &Edimap {
        &self.edimap
    }

    #[must_use]
    pub fn description(&self) -> &Description {
        &self.edimap.description
    }

    #[must_use]
    pub fn root(&self) -> &SegmentGroup {
        &self.edimap.segments
    }

    #[must_use]
    pub fn delimiters(&self) -> Option<&Delimiters> {
        self.edimap.delimiters.as_ref()
    }

    #[must_use]
    pub fn ignore_unmapped_segments(&self) -> bool {
        self.edimap.ignore_unmapped_segments
    }

    #[must_use]
    pub fn lookup_name(&self) -> String {
        self.edimap.description.lookup_name()
    }

    #[must_use]
    pub fn namespace(&self) -> Option<NamespaceBinding> {
        self.edimap.description.namespace_binding()
    }

    /// Whether any segment anywhere in the model has this code
    #[must_use]
    pub fn maps_segment(&self, segcode: &str) -> bool {
        self.mapped_codes.contains(segcode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Edimap {
        let line = SegmentGroup::new("LineItem")
            .occurs(0, MaxOccurs::Unbounded)
            .with_children(vec![
                Segment::new("LIN", "Line").occurs(1, MaxOccurs::Bounded(1)).into(),
                Segment::new("QTY", "Quantity").into(),
            ]);
        Edimap::new(
            Description::new("ORDERS", "D:96A:UN"),
            SegmentGroup::new("Order").with_children(vec![
                Segment::new("BGM", "Header").occurs(1, MaxOccurs::Bounded(1)).into(),
                line.into(),
            ]),
        )
    }

    #[test]
    fn test_lookup_name() {
        assert_eq!(Description::new("ORDERS", "D:96A:UN").lookup_name(), "ORDERS:D:96A:UN");
        assert_eq!(Description::new("ORDERS", "").lookup_name(), "ORDERS");
    }

    #[test]
    fn test_namespace_prefix_defaults_to_name() {
        let mut description = Description::new("ORDERS", "D:96A:UN");
        assert!(description.namespace_binding().is_none());

        description.namespace = Some("urn:orders".to_string());
        let binding = description.namespace_binding().unwrap();
        assert_eq!(binding.prefix, "orders");
        assert_eq!(binding.uri, "urn:orders");
    }

    #[test]
    fn test_group_segcode_is_first_segment() {
        let edimap = sample();
        let group = &edimap.segments.children[1];
        assert_eq!(group.segcode(), Some("LIN"));
        assert_eq!(group.max_occurs(), MaxOccurs::Unbounded);
    }

    #[test]
    fn test_max_never_below_min() {
        let node: SegmentNode = Segment::new("BGM", "Header")
            .occurs(3, MaxOccurs::Bounded(1))
            .into();
        assert_eq!(node.max_occurs(), MaxOccurs::Bounded(3));
    }

    #[test]
    fn test_mapped_codes() {
        let model = EdifactModel::new(sample());
        assert!(model.maps_segment("BGM"));
        assert!(model.maps_segment("QTY"));
        assert!(!model.maps_segment("FTX"));
        assert_eq!(model.lookup_name(), "ORDERS:D:96A:UN");
    }

    #[test]
    fn test_max_occurs_allows() {
        assert!(MaxOccurs::Bounded(2).allows(1));
        assert!(!MaxOccurs::Bounded(2).allows(2));
        assert!(MaxOccurs::Unbounded.allows(u32::MAX - 1));
        assert_eq!(MaxOccurs::Unbounded.to_string(), "*");
    }

    #[test]
    fn test_expected_description() {
        let spec = ValueSpec::new(DataType::Date).with_format("%Y%m%d");
        assert_eq!(spec.expected(), "Date '%Y%m%d'");
    }
}
