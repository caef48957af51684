//! This serialization system writes arrays of arbitrary values as indented
//! XML documents. Types opt in by knowing their _schema_: the ordered list of
//! fields that get serialized, each with an output name and a type label
//! chosen by the schema author. Values of types which don't know their schema
//! are still accepted, and are written as a `notXMLable` marker.
//!
//! Typical usage pattern:
//!
//! - derive `Xmlable` on a struct, marking each serialized field with
//!   `#[xml(type = "...")]` and optionally `name = "..."`
//! - convert each value to serialize into a `Value`, with `ToValue` or the
//!   `Value` constructors
//! - pass the slice of values to `serialize`, `serialize_to_path`, or
//!   `serialize_to_string`
//!
//! ```
//! use xmlable::{Xmlable, ToValue, serialize_to_string};
//!
//! #[derive(Xmlable)]
//! struct Product {
//!     #[xml(type = "String", name = "productname")]
//!     name: String,
//!     #[xml(type = "double")]
//!     price: f64,
//!     // not serialized
//!     stock: u32,
//! }
//!
//! let wine = Product { name: "Wine".into(), price: 11.4, stock: 3 };
//! let xml = serialize_to_string(&[wine.to_value()]).unwrap();
//! assert_eq!(
//!     xml,
//!     "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
//!      <Array>\n\
//!      \t<Product>\n\
//!      \t\t<productname type=\"String\">Wine</productname>\n\
//!      \t\t<price type=\"double\">11.4</price>\n\
//!      \t</Product>\n\
//!      </Array>",
//! );
//! # let _ = wine.stock;
//! ```
//!
//! Output is produced incrementally by a `TagWriter`, which can also be used
//! on its own. Text and attribute values are written verbatim unless
//! escaping is turned on with `WriterOptions`.
//!
//! Object graphs with cycles are not supported; serializing one recurses
//! without bound.

#[macro_use]
extern crate tracing;

pub mod error;

mod do_if_err;
mod value;
mod schema;
mod cache;
mod writer;
mod serializer;

pub use crate::{
    value::{
        Value,
        ToValue,
        simple_type_name,
    },
    schema::{
        Xmlable,
        XmlObject,
        TypeSchema,
        TypeSchemaBuilder,
        FieldDescriptor,
        SchemaSummary,
        FieldSummary,
    },
    cache::SchemaCache,
    writer::{
        TagWriter,
        WriterOptions,
        PROLOGUE,
    },
    serializer::{
        Serializer,
        xml_path,
        ARRAY_TAG,
        NOT_XMLABLE_TAG,
        NULL_TAG,
        NULL_TEXT,
        TYPE_ATTR,
        XML_EXTENSION,
    },
};
pub use xmlable_derive::Xmlable;


use crate::error::Result;
use std::{
    io::Write,
    path::{Path, PathBuf},
};


/// Serialize `values` to `sink`. See `Serializer::serialize`.
pub fn serialize<W: Write>(values: &[Value<'_>], sink: W) -> Result<()> {
    Serializer::new().serialize(values, sink)
}

/// Serialize `values` to a file. See `Serializer::serialize_to_path`.
pub fn serialize_to_path<P: AsRef<Path>>(values: &[Value<'_>], path: P) -> Result<PathBuf> {
    Serializer::new().serialize_to_path(values, path)
}

/// Serialize `values` into a string.
pub fn serialize_to_string(values: &[Value<'_>]) -> Result<String> {
    Serializer::new().serialize_to_string(values)
}
