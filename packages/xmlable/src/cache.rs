//! Run-scoped cache of type schemas.

use crate::schema::{
    TypeSchema,
    XmlObject,
    Xmlable,
};
use std::{
    any::TypeId,
    collections::HashMap,
    rc::Rc,
};


/// Schemas built so far in a serialization run, by type. A type's schema is
/// built the first time one of its values is serialized, and shared by every
/// later value of that type until `reset`.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: HashMap<TypeId, Rc<TypeSchema>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        SchemaCache::default()
    }

    /// Get the schema for the concrete type of `object`, building it if this
    /// is the first time that type is seen.
    pub fn schema_of(&mut self, object: &dyn XmlObject) -> Rc<TypeSchema> {
        let type_id = object.as_any().type_id();
        if let Some(schema) = self.schemas.get(&type_id) {
            trace!(type_name = object.type_name(), "schema cache hit");
            return Rc::clone(schema);
        }
        let schema = Rc::new(object.build_schema());
        trace!(
            type_name = schema.type_name(),
            fields = schema.fields().len(),
            "introspected type"
        );
        self.schemas.insert(type_id, Rc::clone(&schema));
        schema
    }

    /// Like `schema_of`, for a statically known type.
    pub fn schema_of_type<T: Xmlable>(&mut self) -> Rc<TypeSchema> {
        if let Some(schema) = self.schemas.get(&TypeId::of::<T>()) {
            return Rc::clone(schema);
        }
        let schema = Rc::new(T::schema());
        self.schemas.insert(TypeId::of::<T>(), Rc::clone(&schema));
        schema
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.schemas.contains_key(&type_id)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Forget every cached schema.
    pub fn reset(&mut self) {
        self.schemas.clear();
    }
}
