//! Sidecar metadata extraction
//!
//! Every unpacked dataset carries an `EOPMetadata.xml` sidecar conforming to
//! a fixed EarthObservation schema. [`extract`] applies the declarative field
//! table from [`schema`] over the parsed document and produces a typed
//! [`MetadataRecord`]. A missing path is a hard failure - it distinguishes a
//! malformed upstream document from a code defect - and so is a value that
//! refuses to convert to its declared datatype.

use chrono::{DateTime, Utc};
use roxmltree::{Document, Node};
use std::collections::BTreeMap;
use std::path::Path;

pub mod schema;

use schema::{FieldKind, FieldSpec, PathSeg};

/// Name of the XML sidecar packaged alongside each dataset's payload.
pub const SIDECAR_FILENAME: &str = "EOPMetadata.xml";

/// Secondary manifest sidecar, deleted together with the metadata sidecar.
pub const MANIFEST_FILENAME: &str = "manifest.xml";

/// Metadata extraction errors
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The sidecar is not well-formed XML
    #[error("malformed sidecar XML: {0}")]
    Xml(String),

    /// No schema is declared for this product id
    #[error("no metadata schema registered for product {0}")]
    UnknownProduct(String),

    /// A path segment declared in the schema is absent from the document
    #[error("field {field}: path segment {segment:?} not found in sidecar")]
    SchemaPath {
        /// Field whose extraction failed
        field: &'static str,
        /// The missing segment
        segment: String,
    },

    /// The raw value cannot be coerced to the declared datatype
    #[error("field {field}: cannot convert {value:?} to {kind:?}")]
    TypeConversion {
        /// Field whose conversion failed
        field: &'static str,
        /// Raw string found in the document
        value: String,
        /// Declared target datatype
        kind: FieldKind,
    },

    /// The sidecar file could not be read
    #[error("failed to read sidecar: {0}")]
    Io(#[from] std::io::Error),
}

/// One typed metadata value, tagged by its declared [`FieldKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    /// Timestamp field
    DateTime(DateTime<Utc>),
    /// String field
    Str(String),
    /// Integer field
    Int(i64),
    /// Float field
    Float(f64),
}

/// Extracted metadata for one dataset: field name to typed value.
///
/// Contains exactly the fields declared in the product's schema.
pub type MetadataRecord = BTreeMap<&'static str, MetadataValue>;

/// Apply the product's field schema to a raw sidecar document.
pub fn extract(xml: &str, product_id: &str) -> Result<MetadataRecord, MetadataError> {
    let schema = schema::schema_for(product_id)
        .ok_or_else(|| MetadataError::UnknownProduct(product_id.to_string()))?;

    let doc = Document::parse(xml).map_err(|e| MetadataError::Xml(e.to_string()))?;

    let mut record = MetadataRecord::new();
    for spec in schema {
        let raw = walk_path(&doc, spec)?;
        record.insert(spec.name, convert(spec, &raw)?);
    }
    Ok(record)
}

/// Read and extract the sidecar from an unpacked dataset directory.
pub fn extract_from_dir(dir: &Path, product_id: &str) -> Result<MetadataRecord, MetadataError> {
    let xml = std::fs::read_to_string(dir.join(SIDECAR_FILENAME))?;
    extract(&xml, product_id)
}

/// Walk a field's path segments and return the raw string value.
///
/// Element steps match on local name, ignoring namespace prefixes, which are
/// stable local names in the EarthObservation schema. The value of a field
/// ending on an element is that element's text content.
fn walk_path(doc: &Document, spec: &FieldSpec) -> Result<String, MetadataError> {
    let mut node: Option<Node> = None;

    for (index, segment) in spec.path.iter().enumerate() {
        match segment {
            PathSeg::Elem(name) => {
                let next = match node {
                    // First segment names the document root element.
                    None if index == 0 => {
                        Some(doc.root_element()).filter(|n| n.tag_name().name() == *name)
                    }
                    None => None,
                    Some(current) => current
                        .children()
                        .find(|n| n.is_element() && n.tag_name().name() == *name),
                };
                node = Some(next.ok_or_else(|| MetadataError::SchemaPath {
                    field: spec.name,
                    segment: (*name).to_string(),
                })?);
            }
            PathSeg::Attr(name) => {
                let current = node.ok_or_else(|| MetadataError::SchemaPath {
                    field: spec.name,
                    segment: format!("@{name}"),
                })?;
                let value = current
                    .attributes()
                    .find(|a| a.name() == *name)
                    .map(|a| a.value().to_string())
                    .ok_or_else(|| MetadataError::SchemaPath {
                        field: spec.name,
                        segment: format!("@{name}"),
                    })?;
                return Ok(value);
            }
        }
    }

    let current = node.ok_or_else(|| MetadataError::SchemaPath {
        field: spec.name,
        segment: "<empty path>".to_string(),
    })?;
    current
        .text()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| MetadataError::SchemaPath {
            field: spec.name,
            segment: "#text".to_string(),
        })
}

/// Convert a raw string through the field's declared datatype tag.
fn convert(spec: &FieldSpec, raw: &str) -> Result<MetadataValue, MetadataError> {
    let conversion_failed = || MetadataError::TypeConversion {
        field: spec.name,
        value: raw.to_string(),
        kind: spec.kind,
    };

    match spec.kind {
        FieldKind::DateTime => DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_rfc3339(&format!("{raw}Z")))
            .map(|dt| MetadataValue::DateTime(dt.with_timezone(&Utc)))
            .map_err(|_| conversion_failed()),
        FieldKind::Str => Ok(MetadataValue::Str(raw.to_string())),
        FieldKind::Int => raw
            .parse::<i64>()
            .map(MetadataValue::Int)
            .map_err(|_| conversion_failed()),
        FieldKind::Float => raw
            .parse::<f64>()
            .map(MetadataValue::Float)
            .map_err(|_| conversion_failed()),
    }
}
