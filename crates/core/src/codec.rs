//! Codec trait and the strategy dispatch cascade
//!
//! A [`Codec`] is the matched conversion pair for one native type: encode
//! into the tagged [`Value`] model and decode back out of it. For all
//! representable, non-lossy values `decode(encode(v)) == v`; where a
//! narrower native width cannot represent a wire value, the per-type rule
//! in [`crate::scalar`] applies (documented narrowing, never silent
//! corruption).
//!
//! ## Dispatch cascade
//!
//! Which strategy converts a type is decided in a fixed priority order,
//! first match wins:
//!
//! 1. sequences (`Vec<T>`, `[T; N]`, `Box<T>` passthrough) -> element-wise
//!    `Array` mapping
//! 2. closed generic containers: `Option<T>` (null wrapping), map entry
//!    pairs (2-element arrays), `HashMap`/`BTreeMap` (arrays of entry
//!    pairs), tuples of arity 2-4 (`Entity` with positional `Item1..ItemN`
//!    fields)
//! 3. scalars and enums -> the table in [`crate::scalar`]
//! 4. structured objects -> the entity mapper in [`crate::entity`],
//!    entered by static registration through [`crate::entity_model!`]
//!
//! Each type shape matches exactly one `Codec` impl, so the cascade is
//! resolved at compile time; a type matching none of the strategies has no
//! impl and surfaces as an unsupported type at the dynamic resolver
//! (`crate::resolver`) instead of being silently treated as a document.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::error::{Error, Result};
use crate::value::{Fields, Value};

/// Matched conversion pair for one native type
///
/// Implementations must be pure: no I/O, no observable side effects, and
/// deterministic for a given input. `encode` never mutates the source and
/// always builds a fresh [`Value`].
pub trait Codec: Sized {
    /// Convert a native value into its tagged representation
    fn encode(&self) -> Result<Value>;

    /// Convert a tagged value back into the native type
    fn decode(value: Value) -> Result<Self>;
}

// ============================================================================
// Identity
// ============================================================================

/// A tagged value converts to itself, unchanged in both directions.
impl Codec for Value {
    fn encode(&self) -> Result<Value> {
        Ok(self.clone())
    }

    fn decode(value: Value) -> Result<Self> {
        Ok(value)
    }
}

// ============================================================================
// Sequences
// ============================================================================

impl<T: Codec> Codec for Vec<T> {
    fn encode(&self) -> Result<Value> {
        let items = self
            .iter()
            .map(Codec::encode)
            .collect::<Result<Vec<Value>>>()?;
        Ok(Value::Array(items))
    }

    fn decode(value: Value) -> Result<Self> {
        value.into_array()?.into_iter().map(T::decode).collect()
    }
}

impl<T: Codec, const N: usize> Codec for [T; N] {
    fn encode(&self) -> Result<Value> {
        let items = self
            .iter()
            .map(Codec::encode)
            .collect::<Result<Vec<Value>>>()?;
        Ok(Value::Array(items))
    }

    fn decode(value: Value) -> Result<Self> {
        let items = value.into_array()?;
        if items.len() != N {
            return Err(Error::structure(
                "fixed-size array",
                format!(
                    "requires a {}-element array but found a {}-element array",
                    N,
                    items.len()
                ),
            ));
        }
        let decoded = items
            .into_iter()
            .map(T::decode)
            .collect::<Result<Vec<T>>>()?;
        // length was checked above, so the conversion cannot fail
        Ok(<[T; N]>::try_from(decoded).unwrap_or_else(|_| unreachable!()))
    }
}

impl<T: Codec> Codec for Box<T> {
    fn encode(&self) -> Result<Value> {
        (**self).encode()
    }

    fn decode(value: Value) -> Result<Self> {
        T::decode(value).map(Box::new)
    }
}

// ============================================================================
// Nullable
// ============================================================================

/// Absent values encode as `Null`; any non-null case decodes through the
/// element codec. This makes `Option<T>` the nullable wrapper for every
/// other strategy in the cascade.
impl<T: Codec> Codec for Option<T> {
    fn encode(&self) -> Result<Value> {
        match self {
            None => Ok(Value::Null),
            Some(inner) => inner.encode(),
        }
    }

    fn decode(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::decode(other).map(Some),
        }
    }
}

// ============================================================================
// Map entries and maps
// ============================================================================

/// Encode one map entry as a 2-element array `[key, value]`.
fn encode_entry<K: Codec, V: Codec>(key: &K, value: &V) -> Result<Value> {
    Ok(Value::Array(vec![key.encode()?, value.encode()?]))
}

/// Decode one map entry from a 2-element array, failing with a structural
/// error naming the expected vs. actual element count.
fn decode_entry<K: Codec, V: Codec>(value: Value) -> Result<(K, V)> {
    let mut items = value.into_array()?;
    if items.len() != 2 {
        return Err(Error::structure(
            "key/value pair",
            format!(
                "requires a 2-element array but found a {}-element array",
                items.len()
            ),
        ));
    }
    // popping back to front keeps the removals O(1)
    let value = items.pop().unwrap_or(Value::Null);
    let key = items.pop().unwrap_or(Value::Null);
    Ok((K::decode(key)?, V::decode(value)?))
}

impl<K, V> Codec for HashMap<K, V>
where
    K: Codec + Eq + Hash,
    V: Codec,
{
    fn encode(&self) -> Result<Value> {
        let entries = self
            .iter()
            .map(|(k, v)| encode_entry(k, v))
            .collect::<Result<Vec<Value>>>()?;
        Ok(Value::Array(entries))
    }

    fn decode(value: Value) -> Result<Self> {
        let mut map = HashMap::new();
        for entry in value.into_array()? {
            let (k, v) = decode_entry(entry)?;
            // last write wins on duplicate keys
            map.insert(k, v);
        }
        Ok(map)
    }
}

impl<K, V> Codec for BTreeMap<K, V>
where
    K: Codec + Ord,
    V: Codec,
{
    fn encode(&self) -> Result<Value> {
        let entries = self
            .iter()
            .map(|(k, v)| encode_entry(k, v))
            .collect::<Result<Vec<Value>>>()?;
        Ok(Value::Array(entries))
    }

    fn decode(value: Value) -> Result<Self> {
        let mut map = BTreeMap::new();
        for entry in value.into_array()? {
            let (k, v) = decode_entry(entry)?;
            map.insert(k, v);
        }
        Ok(map)
    }
}

// ============================================================================
// Tuples
// ============================================================================

fn take_item<T: Codec>(fields: &mut Fields, name: &'static str) -> Result<T> {
    let value = fields
        .remove(name)
        .ok_or_else(|| Error::structure("tuple", format!("missing field {name:?}")))?;
    T::decode(value)
}

/// Tuples encode as an `Entity` with positional field names
/// `"Item1".."ItemN"`, read back in order on decode.
impl<A: Codec, B: Codec> Codec for (A, B) {
    fn encode(&self) -> Result<Value> {
        let mut fields = Fields::new();
        fields.insert("Item1", self.0.encode()?);
        fields.insert("Item2", self.1.encode()?);
        Ok(Value::Entity(fields))
    }

    fn decode(value: Value) -> Result<Self> {
        let mut fields = value.into_entity()?;
        Ok((take_item(&mut fields, "Item1")?, take_item(&mut fields, "Item2")?))
    }
}

impl<A: Codec, B: Codec, C: Codec> Codec for (A, B, C) {
    fn encode(&self) -> Result<Value> {
        let mut fields = Fields::new();
        fields.insert("Item1", self.0.encode()?);
        fields.insert("Item2", self.1.encode()?);
        fields.insert("Item3", self.2.encode()?);
        Ok(Value::Entity(fields))
    }

    fn decode(value: Value) -> Result<Self> {
        let mut fields = value.into_entity()?;
        Ok((
            take_item(&mut fields, "Item1")?,
            take_item(&mut fields, "Item2")?,
            take_item(&mut fields, "Item3")?,
        ))
    }
}

impl<A: Codec, B: Codec, C: Codec, D: Codec> Codec for (A, B, C, D) {
    fn encode(&self) -> Result<Value> {
        let mut fields = Fields::new();
        fields.insert("Item1", self.0.encode()?);
        fields.insert("Item2", self.1.encode()?);
        fields.insert("Item3", self.2.encode()?);
        fields.insert("Item4", self.3.encode()?);
        Ok(Value::Entity(fields))
    }

    fn decode(value: Value) -> Result<Self> {
        let mut fields = value.into_entity()?;
        Ok((
            take_item(&mut fields, "Item1")?,
            take_item(&mut fields, "Item2")?,
            take_item(&mut fields, "Item3")?,
            take_item(&mut fields, "Item4")?,
        ))
    }
}
