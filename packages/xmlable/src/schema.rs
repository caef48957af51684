//! Per-type schemas: the ordered list of fields a type serializes, and the
//! traits by which types provide them.

use crate::value::{
    Value,
    simple_type_name,
};
use std::{
    any::{Any, TypeId, type_name},
    borrow::Cow,
    fmt::{self, Debug, Formatter},
    marker::PhantomData,
};
use serde::Serialize;


/// Type which knows which of its fields are serialized, and how. The
/// `xmlable_derive` package in the workspace provides a derive proc macro for
/// this, configured with `#[xml(type = "...", name = "...")]` field
/// attributes.
///
/// A type that doesn't implement this is "not XMLable": standing on its own
/// it serializes as a `notXMLable` marker.
pub trait Xmlable: Any {
    fn schema() -> TypeSchema
    where
        Self: Sized;
}

/// Object-safe face of `Xmlable`, so that values of types only known at run
/// time can be serialized. Implemented for every `Xmlable`.
pub trait XmlObject: Any {
    fn as_any(&self) -> &dyn Any;

    /// Simple name of the concrete type, without module path or generics.
    fn type_name(&self) -> &'static str;

    fn build_schema(&self) -> TypeSchema;
}

impl<T: Xmlable> XmlObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        simple_type_name(type_name::<T>())
    }

    fn build_schema(&self) -> TypeSchema {
        T::schema()
    }
}


/// The ordered serializable fields of one type.
pub struct TypeSchema {
    type_id: TypeId,
    type_name: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl TypeSchema {
    pub fn builder<T: Any>() -> TypeSchemaBuilder<T> {
        TypeSchemaBuilder {
            fields: Vec::new(),
            _p: PhantomData,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn summary(&self) -> SchemaSummary {
        SchemaSummary {
            type_name: self.type_name.to_owned(),
            fields: self.fields
                .iter()
                .map(|field| FieldSummary {
                    name: field.name().to_owned(),
                    type_label: field.type_label().to_owned(),
                })
                .collect(),
        }
    }
}

impl Debug for TypeSchema {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("TypeSchema")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Builds a `TypeSchema` for `T`, one field at a time in declaration order.
///
/// ```
/// use xmlable::{TypeSchema, ToValue};
///
/// struct Address {
///     city: String,
///     number: i32,
/// }
///
/// let schema = TypeSchema::builder::<Address>()
///     .field("city", "String", |this| this.city.to_value())
///     .field("number", "int", |this| this.number.to_value())
///     .build();
/// assert_eq!(schema.type_name(), "Address");
/// assert_eq!(schema.fields()[1].name(), "number");
/// ```
pub struct TypeSchemaBuilder<T> {
    fields: Vec<FieldDescriptor>,
    _p: PhantomData<fn(&T)>,
}

impl<T: Any> TypeSchemaBuilder<T> {
    pub fn field<N, L>(
        mut self,
        name: N,
        type_label: L,
        get: fn(&T) -> Value<'_>,
    ) -> Self
    where
        N: Into<Cow<'static, str>>,
        L: Into<Cow<'static, str>>,
    {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            type_label: type_label.into(),
            owner: type_name::<T>(),
            accessor: Box::new(TypedAccessor { get }),
        });
        self
    }

    pub fn build(self) -> TypeSchema {
        TypeSchema {
            type_id: TypeId::of::<T>(),
            type_name: simple_type_name(type_name::<T>()),
            fields: self.fields,
        }
    }
}


/// One serializable field: its output name, the type label it's tagged
/// with, and how to read it.
pub struct FieldDescriptor {
    name: Cow<'static, str>,
    type_label: Cow<'static, str>,
    owner: &'static str,
    accessor: Box<dyn Accessor>,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Label the schema author gave the field's type. Not derived from the
    /// value.
    pub fn type_label(&self) -> &str {
        &self.type_label
    }

    /// Read this field from `instance`, or `None` if `instance` isn't of the
    /// type this field belongs to.
    pub fn try_read<'a>(&self, instance: &'a dyn Any) -> Option<Value<'a>> {
        self.accessor.read(instance)
    }

    /// Read this field from `instance`. A failed read is logged and reads
    /// as `Value::Null`.
    pub fn read<'a>(&self, instance: &'a dyn Any) -> Value<'a> {
        match self.try_read(instance) {
            Some(value) => value,
            None => {
                error!(
                    field = %self.name,
                    owner = self.owner,
                    "serialization of field failed, instance is of a different type (writing null)"
                );
                Value::Null
            }
        }
    }
}

impl Debug for FieldDescriptor {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("type_label", &self.type_label)
            .finish()
    }
}

trait Accessor {
    fn read<'a>(&self, instance: &'a dyn Any) -> Option<Value<'a>>;
}

struct TypedAccessor<T> {
    get: fn(&T) -> Value<'_>,
}

impl<T: Any> Accessor for TypedAccessor<T> {
    fn read<'a>(&self, instance: &'a dyn Any) -> Option<Value<'a>> {
        instance.downcast_ref::<T>().map(self.get)
    }
}


/// Serializable description of a `TypeSchema`, for inspecting or exporting
/// schemas.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SchemaSummary {
    pub type_name: String,
    pub fields: Vec<FieldSummary>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FieldSummary {
    pub name: String,
    pub type_label: String,
}
