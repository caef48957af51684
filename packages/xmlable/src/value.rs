//! Runtime model of the values a field can hold, the trait for converting
//! into it, and implementations for common types.

use crate::schema::{
    XmlObject,
    Xmlable,
};
use std::{
    any::type_name,
    borrow::Cow,
    collections::{
        BTreeMap,
        BTreeSet,
        HashMap,
        HashSet,
        LinkedList,
        VecDeque,
    },
    fmt::{self, Debug, Display, Formatter},
    rc::Rc,
    sync::Arc,
};


/// A value as the serializer sees it.
///
/// Which variant a value converts into decides how it's written: objects
/// are walked through their schema, arrays are wrapped in an `Array`
/// element, and everything else is plain text.
pub enum Value<'a> {
    /// Absent value.
    Null,
    /// Sequence of values.
    Array(Vec<Value<'a>>),
    /// Value of a type that knows its schema.
    Object(&'a dyn XmlObject),
    /// Value of a type that doesn't know its schema. As a field value this
    /// is written as `text`. Standing on its own, such as in an array, only
    /// its `type_name` is written.
    Plain {
        type_name: &'static str,
        text: Cow<'a, str>,
    },
}

impl<'a> Value<'a> {
    pub fn object<T: Xmlable>(object: &'a T) -> Self {
        Value::Object(object)
    }

    /// Plain value written through its `Display` implementation.
    pub fn display<T: Display + ?Sized>(value: &'a T) -> Self {
        Value::Plain {
            type_name: simple_type_name(type_name::<T>()),
            text: Cow::Owned(value.to_string()),
        }
    }

    /// Plain value written through its `Debug` implementation.
    pub fn debug<T: Debug + ?Sized>(value: &'a T) -> Self {
        Value::Plain {
            type_name: simple_type_name(type_name::<T>()),
            text: Cow::Owned(format!("{:?}", value)),
        }
    }

    /// Plain value of a type with no text form at all. Its text is the full
    /// type name.
    pub fn opaque<T: ?Sized>(_value: &'a T) -> Self {
        Value::Plain {
            type_name: simple_type_name(type_name::<T>()),
            text: Cow::Borrowed(type_name::<T>()),
        }
    }

    pub fn array<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a T>,
        T: ToValue + ?Sized + 'a,
    {
        Value::Array(values.into_iter().map(ToValue::to_value).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, &Value::Null)
    }
}

impl<'a> Debug for Value<'a> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            &Value::Null => f.write_str("Null"),
            &Value::Array(ref values) => f.debug_tuple("Array").field(values).finish(),
            &Value::Object(object) => f.debug_tuple("Object").field(&object.type_name()).finish(),
            &Value::Plain { type_name, ref text } => f
                .debug_struct("Plain")
                .field("type_name", &type_name)
                .field("text", text)
                .finish(),
        }
    }
}

const POINTER_PREFIXES: [&'static str; 5] = ["&", "mut ", "*const ", "*mut ", "dyn "];

/// Reduce a type name to something usable as an element name: strip the
/// module path and generic arguments, so for eg
/// `alloc::collections::btree::map::BTreeMap<u8, u8>` becomes `BTreeMap`.
///
/// References, pointers and trait objects are named after what they point
/// to (`&str` becomes `str`). Tuples become `Tuple`, slices and arrays
/// become `Array`, and anything else without a plain identifier, such as a
/// closure, becomes `Value`.
pub fn simple_type_name(full: &'static str) -> &'static str {
    let mut name = full.trim_start();
    loop {
        let stripped = POINTER_PREFIXES
            .iter()
            .find_map(|&prefix| name.strip_prefix(prefix));
        match stripped {
            Some(rest) => name = rest.trim_start(),
            None => break,
        }
    }
    if name.starts_with('(') {
        return "Tuple";
    }
    if name.starts_with('[') {
        return "Array";
    }

    let base = match name.find('<') {
        Some(i) => &name[..i],
        None => name,
    };
    let base = match base.rfind("::") {
        Some(i) => &base[i + 2..],
        None => base,
    };
    let end = base
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(base.len());
    match &base[..end] {
        "" => "Value",
        ident => ident,
    }
}


/// Types which can be read into a `Value`.
///
/// `#[derive(Xmlable)]` implements this for the types it derives on, as
/// `Value::Object`.
pub trait ToValue {
    fn to_value(&self) -> Value<'_>;
}

macro_rules! display_to_value {
    ($($t:ident,)*)=>{$(
        impl ToValue for $t {
            fn to_value(&self) -> Value<'_> {
                Value::Plain {
                    type_name: stringify!($t),
                    text: Cow::Owned(self.to_string()),
                }
            }
        }
    )*};
}

display_to_value!(
    u8, u16, u32, u64, u128, usize,
    i8, i16, i32, i64, i128, isize,
    char,
    bool,
);

// debug formatting keeps the fraction on whole numbers, so 1.0 isn't "1"
macro_rules! float_to_value {
    ($($t:ident,)*)=>{$(
        impl ToValue for $t {
            fn to_value(&self) -> Value<'_> {
                Value::Plain {
                    type_name: stringify!($t),
                    text: Cow::Owned(format!("{:?}", self)),
                }
            }
        }
    )*};
}

float_to_value!(f32, f64,);

impl ToValue for str {
    fn to_value(&self) -> Value<'_> {
        Value::Plain {
            type_name: "str",
            text: Cow::Borrowed(self),
        }
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value<'_> {
        Value::Plain {
            type_name: "String",
            text: Cow::Borrowed(self.as_str()),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value<'_> {
        match self {
            &Some(ref inner) => inner.to_value(),
            &None => Value::Null,
        }
    }
}

macro_rules! seqs_to_value {
    ($($c:ident,)*)=>{$(
        impl<T: ToValue> ToValue for $c<T> {
            fn to_value(&self) -> Value<'_> {
                Value::array(self)
            }
        }
    )*};
}

seqs_to_value!(
    Vec,
    VecDeque,
    LinkedList,
);

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value<'_> {
        Value::array(self)
    }
}

impl<T: ToValue, const LEN: usize> ToValue for [T; LEN] {
    fn to_value(&self) -> Value<'_> {
        Value::array(self)
    }
}

// maps and sets aren't arrays, they're opaque values with a text form
macro_rules! sets_to_value {
    ($($c:ident,)*)=>{$(
        impl<T: Debug> ToValue for $c<T> {
            fn to_value(&self) -> Value<'_> {
                Value::debug(self)
            }
        }
    )*};
}

sets_to_value!(
    HashSet,
    BTreeSet,
);

macro_rules! maps_to_value {
    ($($c:ident,)*)=>{$(
        impl<K: Debug, V: Debug> ToValue for $c<K, V> {
            fn to_value(&self) -> Value<'_> {
                Value::debug(self)
            }
        }
    )*};
}

maps_to_value!(
    HashMap,
    BTreeMap,
);

impl<'b, T: ToValue + ?Sized> ToValue for &'b T {
    fn to_value(&self) -> Value<'_> {
        T::to_value(*self)
    }
}

impl<'b, T: ToValue + ?Sized> ToValue for &'b mut T {
    fn to_value(&self) -> Value<'_> {
        T::to_value(&**self)
    }
}

impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Value<'_> {
        T::to_value(&**self)
    }
}

impl<T: ToValue + ?Sized> ToValue for Rc<T> {
    fn to_value(&self) -> Value<'_> {
        T::to_value(&**self)
    }
}

impl<T: ToValue + ?Sized> ToValue for Arc<T> {
    fn to_value(&self) -> Value<'_> {
        T::to_value(&**self)
    }
}

impl<'b, T: ToValue + ToOwned + ?Sized> ToValue for Cow<'b, T> {
    fn to_value(&self) -> Value<'_> {
        T::to_value(&**self)
    }
}
