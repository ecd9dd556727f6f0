//! Declarative field-location schemas, keyed by product id.
//!
//! Each field names a walk through the `EOPMetadata.xml` EarthObservation
//! document (element steps by local name, then optionally an attribute) and
//! the datatype the raw string must convert to. Keeping the table static
//! means a malformed upstream document fails extraction loudly instead of
//! producing partially typed records.

/// Target datatype of an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// RFC 3339 timestamp
    DateTime,
    /// Verbatim string
    Str,
    /// Signed integer
    Int,
    /// Floating point number
    Float,
}

/// One step of an extraction path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSeg {
    /// Descend into the child element with this local name
    Elem(&'static str),
    /// Read an attribute of the current element, by local name
    Attr(&'static str),
}

/// Location and datatype of one metadata field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name in the resulting record
    pub name: &'static str,
    /// Declared datatype
    pub kind: FieldKind,
    /// Extraction path, starting at the document root element
    pub path: &'static [PathSeg],
}

use FieldKind::{DateTime, Float, Int, Str};
use PathSeg::{Attr, Elem};

/// Field schema for the MSG15 rapid-scan product.
const MSG15_RSS_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "start_date",
        kind: DateTime,
        path: &[
            Elem("EarthObservation"),
            Elem("phenomenonTime"),
            Elem("TimePeriod"),
            Elem("beginPosition"),
        ],
    },
    FieldSpec {
        name: "end_date",
        kind: DateTime,
        path: &[
            Elem("EarthObservation"),
            Elem("phenomenonTime"),
            Elem("TimePeriod"),
            Elem("endPosition"),
        ],
    },
    FieldSpec {
        name: "result_time",
        kind: DateTime,
        path: &[
            Elem("EarthObservation"),
            Elem("resultTime"),
            Elem("TimeInstant"),
            Elem("timePosition"),
        ],
    },
    FieldSpec {
        name: "platform_short_name",
        kind: Str,
        path: &[
            Elem("EarthObservation"),
            Elem("procedure"),
            Elem("EarthObservationEquipment"),
            Elem("platform"),
            Elem("Platform"),
            Elem("shortName"),
        ],
    },
    FieldSpec {
        name: "platform_orbit_type",
        kind: Str,
        path: &[
            Elem("EarthObservation"),
            Elem("procedure"),
            Elem("EarthObservationEquipment"),
            Elem("platform"),
            Elem("Platform"),
            Elem("orbitType"),
        ],
    },
    FieldSpec {
        name: "instrument_name",
        kind: Str,
        path: &[
            Elem("EarthObservation"),
            Elem("procedure"),
            Elem("EarthObservationEquipment"),
            Elem("instrument"),
            Elem("Instrument"),
            Elem("shortName"),
        ],
    },
    FieldSpec {
        name: "sensor_op_mode",
        kind: Str,
        path: &[
            Elem("EarthObservation"),
            Elem("procedure"),
            Elem("EarthObservationEquipment"),
            Elem("sensor"),
            Elem("Sensor"),
            Elem("operationalMode"),
        ],
    },
    FieldSpec {
        name: "center_srs_name",
        kind: Str,
        path: &[
            Elem("EarthObservation"),
            Elem("featureOfInterest"),
            Elem("Footprint"),
            Elem("centerOf"),
            Elem("Point"),
            Attr("srsName"),
        ],
    },
    FieldSpec {
        name: "center_position",
        kind: Str,
        path: &[
            Elem("EarthObservation"),
            Elem("featureOfInterest"),
            Elem("Footprint"),
            Elem("centerOf"),
            Elem("Point"),
            Elem("pos"),
        ],
    },
    FieldSpec {
        name: "file_name",
        kind: Str,
        path: &[
            Elem("EarthObservation"),
            Elem("result"),
            Elem("EarthObservationResult"),
            Elem("product"),
            Elem("ProductInformation"),
            Elem("fileName"),
            Elem("ServiceReference"),
            Attr("href"),
        ],
    },
    FieldSpec {
        name: "file_size",
        kind: Int,
        path: &[
            Elem("EarthObservation"),
            Elem("result"),
            Elem("EarthObservationResult"),
            Elem("product"),
            Elem("ProductInformation"),
            Elem("size"),
        ],
    },
    FieldSpec {
        name: "missing_pct",
        kind: Float,
        path: &[
            Elem("EarthObservation"),
            Elem("metaDataProperty"),
            Elem("EarthObservationMetaData"),
            Elem("missingData"),
        ],
    },
];

/// Look up the field schema for a product id.
pub fn schema_for(product_id: &str) -> Option<&'static [FieldSpec]> {
    match product_id {
        "EO:EUM:DAT:MSG:MSG15-RSS" => Some(MSG15_RSS_FIELDS),
        _ => None,
    }
}
