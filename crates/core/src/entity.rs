//! Object property mapper
//!
//! Structured types that no other strategy in the cascade handles are
//! mapped property-by-property. For each property the mapper records the
//! wire field name (the declared property name unless renamed) and a pair
//! of accessors that compose the property's own codec, resolved
//! recursively through the [`Codec`] impl of the property type.
//!
//! The descriptor list for a type is computed once, on first use, and
//! memoized process-wide (see [`crate::resolver::mapper`]); afterwards it
//! is immutable and shared.
//!
//! Types enter the mapper by static registration through
//! [`crate::entity_model!`], which also derives [`Codec`] so entities nest
//! inside options, sequences, maps and other entities with no extra code.

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::resolver;
use crate::value::{Fields, Key, Value};

/// Per-property conversion record for a structured type
///
/// Holds the Rust property name, the wire field name, and the two
/// accessors composing the property's own codec. Built once per owning
/// type and immutable afterwards.
pub struct Property<T> {
    property: &'static str,
    field: &'static str,
    read: fn(&T) -> Result<Value>,
    write: fn(&mut T, Value) -> Result<()>,
}

impl<T> Property<T> {
    /// Build a descriptor from the property name, wire field name, and
    /// codec-composing accessors
    pub fn new(
        property: &'static str,
        field: &'static str,
        read: fn(&T) -> Result<Value>,
        write: fn(&mut T, Value) -> Result<()>,
    ) -> Self {
        Property {
            property,
            field,
            read,
            write,
        }
    }

    /// The declared Rust property name
    pub fn property(&self) -> &'static str {
        self.property
    }

    /// The wire field name (override if renamed, else the property name)
    pub fn field(&self) -> &'static str {
        self.field
    }
}

/// Accessor pair for the numeric key property of an entity type
///
/// The key property backs the storage [`Key`]; an id of zero means "not
/// yet allocated" and projects as an incomplete key.
pub struct KeyProperty<T> {
    property: &'static str,
    read: fn(&T) -> i64,
    write: fn(&mut T, i64),
}

impl<T> KeyProperty<T> {
    /// Build a key accessor pair
    pub fn new(property: &'static str, read: fn(&T) -> i64, write: fn(&mut T, i64)) -> Self {
        KeyProperty {
            property,
            read,
            write,
        }
    }

    /// The declared Rust property name
    pub fn property(&self) -> &'static str {
        self.property
    }
}

/// Statically registered description of a structured type
///
/// Implemented through [`crate::entity_model!`]; the mapper calls
/// `properties` exactly once per process and caches the result.
pub trait EntityModel: Default + Send + Sync + 'static {
    /// Entity kind used when building storage keys for this type
    const KIND: &'static str;

    /// The numeric key property, if the type declares one
    fn key_property() -> Option<KeyProperty<Self>> {
        None
    }

    /// Ordered property descriptors for this type
    fn properties() -> Vec<Property<Self>>;
}

/// The aggregate of a type's property descriptors
///
/// Created lazily on first use via [`crate::resolver::mapper`] and never
/// recreated; all access is read-through-cache.
pub struct EntityMapper<T> {
    properties: Vec<Property<T>>,
    key: Option<KeyProperty<T>>,
}

impl<T: EntityModel> EntityMapper<T> {
    pub(crate) fn build() -> Self {
        EntityMapper {
            properties: T::properties(),
            key: T::key_property(),
        }
    }

    /// Fill `obj` from a document
    ///
    /// A `None` document returns the object unchanged, distinguishing
    /// "entity absent" from "entity with all-default fields". Otherwise
    /// every property with a present field decodes into the object; a
    /// field absent from the document leaves that property untouched
    /// (absent is not null). Decode errors propagate, never swallowed.
    pub fn populate(&self, mut obj: T, fields: Option<&Fields>) -> Result<T> {
        let Some(fields) = fields else {
            return Ok(obj);
        };
        for prop in &self.properties {
            if let Some(value) = fields.get(prop.field) {
                (prop.write)(&mut obj, value.clone())?;
            }
        }
        Ok(obj)
    }

    /// Write `obj` into a document
    ///
    /// A `None` object returns the document unchanged, so no fields are
    /// ever written for "no object". Otherwise every property encodes
    /// under its wire field name.
    pub fn project(&self, mut fields: Fields, obj: Option<&T>) -> Result<Fields> {
        let Some(obj) = obj else {
            return Ok(fields);
        };
        for prop in &self.properties {
            fields.insert(prop.field, (prop.read)(obj)?);
        }
        Ok(fields)
    }

    /// The wire field name for a declared property
    ///
    /// This is the same lookup the mapper uses when projecting, so filter
    /// predicates built from it always agree with stored field names.
    pub fn field_name(&self, property: &str) -> Result<&'static str> {
        self.properties
            .iter()
            .find(|p| p.property == property)
            .map(|p| p.field)
            .ok_or_else(|| Error::UnknownProperty {
                type_name: std::any::type_name::<T>(),
                property: property.to_string(),
            })
    }

    /// The storage key for `obj`, if the type declares a key property
    ///
    /// An unallocated id (zero) yields an incomplete key.
    pub fn key_of(&self, obj: &T) -> Option<Key> {
        self.key.as_ref().map(|k| {
            let id = (k.read)(obj);
            if id == 0 {
                Key::incomplete(T::KIND)
            } else {
                Key::with_id(T::KIND, id)
            }
        })
    }

    /// Write an allocated id back into the key property
    ///
    /// Returns false when the type declares no key property.
    pub fn assign_key(&self, obj: &mut T, id: i64) -> bool {
        match &self.key {
            Some(k) => {
                (k.write)(obj, id);
                true
            }
            None => false,
        }
    }
}

/// The wire field name for a property of `T`
///
/// The shared pure lookup behind both the mapper and external
/// filter/query builders: the overridden name if the property is renamed,
/// else its declared name.
pub fn field_name_of<T: EntityModel>(property: &str) -> Result<&'static str> {
    resolver::mapper::<T>().field_name(property)
}

// ============================================================================
// Foreign keys
// ============================================================================

/// Foreign-key reference to another entity type
///
/// Holds the target's [`Key`] and optionally a loaded value. Encodes as
/// the key-reference case; the referenced entity itself is never inlined.
#[derive(Debug, Clone)]
pub struct Fk<T: EntityModel> {
    key: Option<Key>,
    value: Option<T>,
}

impl<T: EntityModel> Fk<T> {
    /// Reference an entity by key
    pub fn from_key(key: Key) -> Self {
        Fk {
            key: Some(key),
            value: None,
        }
    }

    /// Reference a loaded entity, deriving the key from its key property
    pub fn from_value(value: T) -> Self {
        let key = resolver::mapper::<T>().key_of(&value);
        Fk {
            key,
            value: Some(value),
        }
    }

    /// The referenced key, if known
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// The loaded value, if present
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Consume the reference, yielding the loaded value if present
    pub fn into_value(self) -> Option<T> {
        self.value
    }
}

impl<T: EntityModel + PartialEq> PartialEq for Fk<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value
    }
}

impl<T: EntityModel> Codec for Fk<T> {
    fn encode(&self) -> Result<Value> {
        match &self.key {
            Some(key) => Ok(Value::KeyRef(key.clone())),
            None => Err(Error::structure(
                "foreign key",
                "holds neither a key nor a keyed value",
            )),
        }
    }

    fn decode(value: Value) -> Result<Self> {
        Ok(Fk::from_key(value.into_key()?))
    }
}

// ============================================================================
// Static registration
// ============================================================================

/// Register a struct as an entity type
///
/// Declares the ordered property list for an existing struct (which must
/// implement `Default`), optionally a numeric key property and per-field
/// wire-name overrides, and derives [`Codec`] through the entity mapper.
///
/// ```
/// use docmap_core::{entity_model, Codec};
///
/// #[derive(Debug, Default, Clone, PartialEq)]
/// struct Simple {
///     bar: i64,
///     baz: String,
/// }
///
/// entity_model! {
///     Simple("Simple") {
///         key bar: i64,
///         baz: String as "_baz",
///     }
/// }
///
/// let x = Simple { bar: 11, baz: "hello world!".into() };
/// let wire = x.encode().unwrap();
/// let rt = Simple::decode(wire).unwrap();
/// assert_eq!(rt, x);
/// ```
///
/// The kind may be omitted, in which case it defaults to the type name:
/// `entity_model! { Simple { key bar: i64, baz: String } }`.
#[macro_export]
macro_rules! entity_model {
    // entity with a numeric key property
    ($ty:ident ($kind:expr) { key $key:ident : i64 $(, $field:ident : $fty:ty $(as $wire:literal)?)* $(,)? }) => {
        impl $crate::EntityModel for $ty {
            const KIND: &'static str = $kind;

            fn key_property() -> Option<$crate::KeyProperty<Self>> {
                Some($crate::KeyProperty::new(
                    stringify!($key),
                    |obj| obj.$key,
                    |obj, id| obj.$key = id,
                ))
            }

            fn properties() -> Vec<$crate::Property<Self>> {
                vec![
                    $crate::Property::new(
                        stringify!($key),
                        stringify!($key),
                        |obj| $crate::Codec::encode(&obj.$key),
                        |obj, value| {
                            obj.$key = $crate::Codec::decode(value)?;
                            Ok(())
                        },
                    ),
                    $($crate::entity_model!(@property $field : $fty $(as $wire)?),)*
                ]
            }
        }

        $crate::entity_model!(@codec $ty);
    };

    // entity without a key property
    ($ty:ident ($kind:expr) { $($field:ident : $fty:ty $(as $wire:literal)?),* $(,)? }) => {
        impl $crate::EntityModel for $ty {
            const KIND: &'static str = $kind;

            fn properties() -> Vec<$crate::Property<Self>> {
                vec![
                    $($crate::entity_model!(@property $field : $fty $(as $wire)?),)*
                ]
            }
        }

        $crate::entity_model!(@codec $ty);
    };

    // kind defaults to the type name
    ($ty:ident { $($body:tt)* }) => {
        $crate::entity_model! { $ty (stringify!($ty)) { $($body)* } }
    };

    (@property $field:ident : $fty:ty) => {
        $crate::entity_model!(@named $field, stringify!($field))
    };

    (@property $field:ident : $fty:ty as $wire:literal) => {
        $crate::entity_model!(@named $field, $wire)
    };

    (@named $field:ident, $wire:expr) => {
        $crate::Property::new(
            stringify!($field),
            $wire,
            |obj| $crate::Codec::encode(&obj.$field),
            |obj, value| {
                obj.$field = $crate::Codec::decode(value)?;
                Ok(())
            },
        )
    };

    (@codec $ty:ident) => {
        impl $crate::Codec for $ty {
            fn encode(&self) -> $crate::Result<$crate::Value> {
                $crate::resolver::mapper::<$ty>()
                    .project($crate::Fields::new(), Some(self))
                    .map($crate::Value::Entity)
            }

            fn decode(value: $crate::Value) -> $crate::Result<Self> {
                let fields = value.into_entity()?;
                $crate::resolver::mapper::<$ty>()
                    .populate(<$ty as Default>::default(), Some(&fields))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::mapper;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Simple {
        bar: i64,
        baz: String,
    }

    entity_model! {
        Simple("Simple") {
            key bar: i64,
            baz: String as "_baz",
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Plain {
        name: String,
        score: Option<i32>,
    }

    entity_model! {
        Plain {
            name: String,
            score: Option<i32>,
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Outer {
        id: i64,
        nested: Option<Simple>,
        tags: Vec<String>,
    }

    entity_model! {
        Outer("Outer") {
            key id: i64,
            nested: Option<Simple> as "firstNested",
            tags: Vec<String>,
        }
    }

    #[test]
    fn test_entity_roundtrip() {
        let x = Simple {
            bar: 11,
            baz: "hello world!".to_string(),
        };
        let encoded = x.encode().unwrap();
        let rt = Simple::decode(encoded).unwrap();
        assert_eq!(rt, x);
    }

    #[test]
    fn test_renamed_field_appears_only_under_wire_name() {
        let x = Simple {
            bar: 99,
            baz: "hello world!".to_string(),
        };
        let fields = x.encode().unwrap().into_entity().unwrap();
        assert_eq!(
            fields.get("_baz"),
            Some(&Value::String("hello world!".to_string()))
        );
        assert!(!fields.contains("baz"));
        assert_eq!(fields.get("bar"), Some(&Value::Int(99)));
    }

    #[test]
    fn test_populate_none_document_returns_object_unchanged() {
        let obj = Simple {
            bar: 5,
            baz: "kept".to_string(),
        };
        let out = mapper::<Simple>().populate(obj.clone(), None).unwrap();
        assert_eq!(out, obj);
    }

    #[test]
    fn test_project_none_object_returns_document_unchanged() {
        let mut fields = Fields::new();
        fields.insert("existing", Value::Int(1));
        let out = mapper::<Simple>().project(fields.clone(), None).unwrap();
        assert_eq!(out, fields);
    }

    #[test]
    fn test_populate_absent_field_leaves_property_untouched() {
        let mut fields = Fields::new();
        fields.insert("bar", Value::Int(42));
        // "_baz" deliberately absent
        let seed = Simple {
            bar: 0,
            baz: "default".to_string(),
        };
        let out = mapper::<Simple>().populate(seed, Some(&fields)).unwrap();
        assert_eq!(out.bar, 42);
        assert_eq!(out.baz, "default");
    }

    #[test]
    fn test_populate_explicit_null_decodes_through_codec() {
        let mut fields = Fields::new();
        fields.insert("name", Value::String("n".to_string()));
        fields.insert("score", Value::Null);
        let out = mapper::<Plain>()
            .populate(Plain::default(), Some(&fields))
            .unwrap();
        assert_eq!(out.score, None);

        // an explicit null under a non-nullable property is a case mismatch
        let mut bad = Fields::new();
        bad.insert("bar", Value::Null);
        assert!(mapper::<Simple>()
            .populate(Simple::default(), Some(&bad))
            .is_err());
    }

    #[test]
    fn test_nested_entity_roundtrip() {
        let x = Outer {
            id: 10,
            nested: Some(Simple {
                bar: 0,
                baz: "hey!".to_string(),
            }),
            tags: vec!["a".to_string(), "b".to_string()],
        };
        let encoded = x.encode().unwrap();

        let fields = encoded.as_entity().unwrap();
        let nested = fields.get("firstNested").unwrap().as_entity().unwrap();
        assert_eq!(
            nested.get("_baz"),
            Some(&Value::String("hey!".to_string()))
        );

        let rt = Outer::decode(encoded).unwrap();
        assert_eq!(rt, x);
    }

    #[test]
    fn test_nested_none_entity_encodes_null() {
        let x = Outer {
            id: 1,
            nested: None,
            tags: vec![],
        };
        let fields = x.encode().unwrap().into_entity().unwrap();
        assert_eq!(fields.get("firstNested"), Some(&Value::Null));

        let rt = Outer::decode(Value::Entity(fields)).unwrap();
        assert_eq!(rt.nested, None);
    }

    #[test]
    fn test_entity_list_roundtrip() {
        let list = vec![
            Simple {
                bar: 1,
                baz: "Simple0".to_string(),
            },
            Simple {
                bar: 2,
                baz: "Simple1".to_string(),
            },
        ];
        let encoded = list.encode().unwrap();
        assert_eq!(<Vec<Simple>>::decode(encoded).unwrap(), list);
    }

    #[test]
    fn test_field_name_lookup() {
        let m = mapper::<Simple>();
        assert_eq!(m.field_name("baz").unwrap(), "_baz");
        assert_eq!(m.field_name("bar").unwrap(), "bar");

        let err = m.field_name("nope").unwrap_err();
        match err {
            Error::UnknownProperty { property, .. } => assert_eq!(property, "nope"),
            other => panic!("wrong error: {other}"),
        }

        assert_eq!(field_name_of::<Simple>("baz").unwrap(), "_baz");
    }

    #[test]
    fn test_key_of_and_assign() {
        let m = mapper::<Simple>();

        let fresh = Simple::default();
        let key = m.key_of(&fresh).unwrap();
        assert!(!key.is_complete());
        assert_eq!(key.kind(), "Simple");

        let mut obj = fresh;
        assert!(m.assign_key(&mut obj, 7));
        assert_eq!(obj.bar, 7);
        let key = m.key_of(&obj).unwrap();
        assert_eq!(key.id(), Some(7));

        // a type without a key property has no storage key
        let plain = Plain::default();
        assert!(mapper::<Plain>().key_of(&plain).is_none());
    }

    #[test]
    fn test_fk_from_key_roundtrip() {
        let fk = Fk::<Simple>::from_key(Key::with_id("Simple", 33));
        let encoded = fk.encode().unwrap();
        assert_eq!(encoded, Value::KeyRef(Key::with_id("Simple", 33)));
        let rt = <Fk<Simple>>::decode(encoded).unwrap();
        assert_eq!(rt.key(), Some(&Key::with_id("Simple", 33)));
        assert!(rt.value().is_none());
    }

    #[test]
    fn test_fk_from_value_derives_key() {
        let fk = Fk::from_value(Simple {
            bar: 33,
            baz: "hello world!".to_string(),
        });
        assert_eq!(fk.key(), Some(&Key::with_id("Simple", 33)));
        assert_eq!(fk.value().map(|v| v.bar), Some(33));
    }

    #[test]
    fn test_fk_equality() {
        let a = Fk::<Simple>::from_key(Key::with_id("Simple", 1));
        let b = Fk::<Simple>::from_key(Key::with_id("Simple", 1));
        let c = Fk::<Simple>::from_key(Key::with_id("Simple", 2));
        assert_eq!(a, b);
        assert_ne!(a, c);

        let v1 = Fk::from_value(Simple {
            bar: 0,
            baz: "Baz".to_string(),
        });
        let v2 = Fk::from_value(Simple {
            bar: 0,
            baz: "Baz".to_string(),
        });
        let v3 = Fk::from_value(Simple {
            bar: 0,
            baz: "Hello".to_string(),
        });
        assert_eq!(v1, v2);
        assert_ne!(v1, v3);
    }

    #[test]
    fn test_fk_inside_entity() {
        #[derive(Debug, Default, Clone)]
        struct Owner {
            id: i64,
            simple: Option<Fk<Simple>>,
        }

        entity_model! {
            Owner("Owner") {
                key id: i64,
                simple: Option<Fk<Simple>> as "fkSimple",
            }
        }

        let x = Owner {
            id: 31337,
            simple: Some(Fk::from_value(Simple {
                bar: 33,
                baz: "hello world!".to_string(),
            })),
        };
        let fields = x.encode().unwrap().into_entity().unwrap();
        assert_eq!(
            fields.get("fkSimple"),
            Some(&Value::KeyRef(Key::with_id("Simple", 33)))
        );

        let rt = Owner::decode(Value::Entity(fields)).unwrap();
        assert_eq!(rt.id, 31337);
        assert_eq!(
            rt.simple.as_ref().and_then(|fk| fk.key()).and_then(Key::id),
            Some(33)
        );
    }
}
