//! Recursive walk of values through their schemas, into a `TagWriter`.

use crate::{
    cache::SchemaCache,
    error::{
        Error,
        Result,
    },
    schema::XmlObject,
    value::Value,
    writer::{
        TagWriter,
        WriterOptions,
    },
};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};


/// Name of the element wrapping every array.
pub const ARRAY_TAG: &'static str = "Array";

/// Name of the empty element marking a value whose type isn't `Xmlable`.
pub const NOT_XMLABLE_TAG: &'static str = "notXMLable";

/// Name of the empty element standing for a null array element.
pub const NULL_TAG: &'static str = "null";

/// Value written into a field element whose value is null.
pub const NULL_TEXT: &'static str = "null";

/// Attribute of field elements holding the field's type label.
pub const TYPE_ATTR: &'static str = "type";

/// Extension appended to output paths which don't already have it.
pub const XML_EXTENSION: &'static str = ".xml";


/// Serializes arrays of values as markup documents.
///
/// Reusable for any number of sequential runs. Each run starts with an empty
/// schema cache and leaves it empty when it ends, however it ends.
#[derive(Debug, Default)]
pub struct Serializer {
    cache: SchemaCache,
    options: WriterOptions,
}

impl Serializer {
    pub fn new() -> Self {
        Serializer::default()
    }

    pub fn with_options(options: WriterOptions) -> Self {
        Serializer {
            cache: SchemaCache::new(),
            options,
        }
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Number of schemas currently cached. Zero between runs.
    pub fn cached_schemas(&self) -> usize {
        self.cache.len()
    }

    /// Serialize `values` as the elements of the root `Array` element,
    /// writing to `sink`. The sink is released when this returns, even on
    /// error, after every open tag has been closed.
    pub fn serialize<W: Write>(&mut self, values: &[Value<'_>], sink: W) -> Result<()> {
        debug!(values = values.len(), "serializing array");
        let mut run = Run::new(&mut self.cache);
        let mut writer = TagWriter::with_options(
            BufWriter::new(sink),
            self.options.clone(),
        )?;
        let result = run.array(values, &mut writer);
        let closed = writer.close().map(drop);
        result?;
        closed?;
        debug!(types = run.types_seen(), "finished serializing array");
        Ok(())
    }

    /// Serialize `values` to the file at `path`, with `.xml` appended if
    /// `path` doesn't already end with it. Returns the path written to.
    pub fn serialize_to_path<P: AsRef<Path>>(
        &mut self,
        values: &[Value<'_>],
        path: P,
    ) -> Result<PathBuf> {
        let path = xml_path(path);
        let file = File::create(&path)?;
        self.serialize(values, file)?;
        Ok(path)
    }

    /// Serialize `values` into a string.
    pub fn serialize_to_string(&mut self, values: &[Value<'_>]) -> Result<String> {
        let mut buf = Vec::new();
        self.serialize(values, &mut buf)?;
        String::from_utf8(buf).map_err(Error::other)
    }
}

/// `path` with `.xml` appended, unless it already ends with `.xml`.
pub fn xml_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if path.as_os_str().to_string_lossy().ends_with(XML_EXTENSION) {
        path.to_owned()
    } else {
        let mut appended = path.as_os_str().to_owned();
        appended.push(XML_EXTENSION);
        PathBuf::from(appended)
    }
}


/// State of one run. Resets the cache when dropped.
struct Run<'c> {
    cache: &'c mut SchemaCache,
    types_seen: usize,
}

impl<'c> Run<'c> {
    fn new(cache: &'c mut SchemaCache) -> Self {
        cache.reset();
        Run {
            cache,
            types_seen: 0,
        }
    }

    fn types_seen(&self) -> usize {
        self.types_seen
    }

    fn array<W: Write>(&mut self, values: &[Value<'_>], writer: &mut TagWriter<W>) -> Result<()> {
        writer.open_tag(ARRAY_TAG, &[])?;
        for value in values {
            self.element(value, writer)?;
        }
        writer.close_tag()
    }

    fn element<W: Write>(&mut self, value: &Value<'_>, writer: &mut TagWriter<W>) -> Result<()> {
        match value {
            &Value::Null => {
                writer.open_tag(NULL_TAG, &[])?;
                writer.close_tag()
            }
            &Value::Array(ref values) => self.array(values, writer),
            &Value::Object(object) => self.object(object, writer, true),
            &Value::Plain { type_name, .. } => not_xmlable(type_name, writer),
        }
    }

    fn object<W: Write>(
        &mut self,
        object: &dyn XmlObject,
        writer: &mut TagWriter<W>,
        wrap_with_tag: bool,
    ) -> Result<()> {
        let known = self.cache.len();
        let schema = self.cache.schema_of(object);
        if self.cache.len() > known {
            self.types_seen += 1;
        }

        if wrap_with_tag {
            writer.open_tag(schema.type_name(), &[])?;
        }
        for field in schema.fields() {
            writer.open_tag(field.name(), &[TYPE_ATTR, field.type_label()])?;
            match field.read(object.as_any()) {
                Value::Null => writer.write_value(NULL_TEXT)?,
                Value::Array(ref values) => self.array(values, writer)?,
                // nested object shares the field's element
                Value::Object(inner) => self.object(inner, writer, false)?,
                Value::Plain { ref text, .. } => writer.write_value(text)?,
            }
            writer.close_tag()?;
        }
        if wrap_with_tag {
            writer.close_tag()?;
        }
        Ok(())
    }
}

impl<'c> Drop for Run<'c> {
    fn drop(&mut self) {
        trace!(schemas = self.cache.len(), "resetting schema cache");
        self.cache.reset();
    }
}

// <TypeName>
//     <notXMLable />
// </TypeName>
fn not_xmlable<W: Write>(type_name: &str, writer: &mut TagWriter<W>) -> Result<()> {
    writer.open_tag(type_name, &[])?;
    writer.open_tag(NOT_XMLABLE_TAG, &[])?;
    writer.close_tag()?;
    writer.close_tag()
}
