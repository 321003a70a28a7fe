//! Scalar codec table
//!
//! Built-in conversions between native scalar types and the `Int`,
//! `Double`, `Bool`, `String` and `Blob` wire cases. Every entry is
//! bidirectional and round-trips exactly for all representable values;
//! where a narrower native width cannot hold the 64-bit wire value the
//! decode narrows by truncation, a deliberate and documented rule rather
//! than an error.
//!
//! Integer handling:
//! - signed widths widen into the `Int` slot on encode and truncate back
//!   on decode
//! - unsigned widths are reinterpreted bit-for-bit into the signed 64-bit
//!   slot (`u64::MAX` travels as `-1`), and the decode reverses the same
//!   reinterpretation, so the full unsigned range round-trips
//!
//! Time handling: instants normalize to UTC before storage. A naive
//! instant (no locality information) is treated as already-UTC without
//! adjustment, while a local-zone instant is converted; decode always
//! yields the absolute UTC instant.

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use std::io::Cursor;
use url::Url;
use uuid::Uuid;

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::value::{Key, Value};

// ============================================================================
// Integers
// ============================================================================

/// Signed integers ride the 64-bit wire slot; decode narrows by truncation.
macro_rules! signed_int_codec {
    ($($t:ty),*) => {$(
        impl Codec for $t {
            fn encode(&self) -> Result<Value> {
                Ok(Value::Int(i64::from(*self)))
            }

            fn decode(value: Value) -> Result<Self> {
                Ok(value.into_int()? as $t)
            }
        }
    )*}
}

signed_int_codec!(i8, i16, i32);

impl Codec for i64 {
    fn encode(&self) -> Result<Value> {
        Ok(Value::Int(*self))
    }

    fn decode(value: Value) -> Result<Self> {
        value.into_int()
    }
}

/// Unsigned integers are reinterpreted bit-for-bit into the signed wire
/// slot; the cast wraps, never fails, and the decode cast is its exact
/// inverse.
macro_rules! unsigned_int_codec {
    ($($t:ty),*) => {$(
        impl Codec for $t {
            fn encode(&self) -> Result<Value> {
                Ok(Value::Int(*self as i64))
            }

            fn decode(value: Value) -> Result<Self> {
                Ok(value.into_int()? as $t)
            }
        }
    )*}
}

unsigned_int_codec!(u8, u16, u32, u64);

// ============================================================================
// Floating point
// ============================================================================

impl Codec for f64 {
    fn encode(&self) -> Result<Value> {
        Ok(Value::Double(*self))
    }

    fn decode(value: Value) -> Result<Self> {
        value.into_double()
    }
}

impl Codec for f32 {
    fn encode(&self) -> Result<Value> {
        Ok(Value::Double(f64::from(*self)))
    }

    fn decode(value: Value) -> Result<Self> {
        Ok(value.into_double()? as f32)
    }
}

// ============================================================================
// Decimal
// ============================================================================

/// Fixed-point decimals travel as the 16 raw bytes of their four 32-bit
/// components (the sign+scale word plus three magnitude words). The byte
/// copy is exact, so every representable decimal round-trips, including
/// the edges of the range.
impl Codec for Decimal {
    fn encode(&self) -> Result<Value> {
        Ok(Value::Blob(self.serialize().to_vec()))
    }

    fn decode(value: Value) -> Result<Self> {
        let bytes = value.into_blob()?;
        let words: [u8; 16] = bytes.as_slice().try_into().map_err(|_| {
            Error::structure(
                "decimal",
                format!("requires a 16-byte blob but found {} bytes", bytes.len()),
            )
        })?;
        Ok(Decimal::deserialize(words))
    }
}

// ============================================================================
// Boolean, string, char
// ============================================================================

impl Codec for bool {
    fn encode(&self) -> Result<Value> {
        Ok(Value::Bool(*self))
    }

    fn decode(value: Value) -> Result<Self> {
        value.into_bool()
    }
}

impl Codec for String {
    fn encode(&self) -> Result<Value> {
        Ok(Value::String(self.clone()))
    }

    fn decode(value: Value) -> Result<Self> {
        value.into_string()
    }
}

impl Codec for char {
    fn encode(&self) -> Result<Value> {
        Ok(Value::String(self.to_string()))
    }

    fn decode(value: Value) -> Result<Self> {
        let s = value.into_string()?;
        s.chars()
            .next()
            .ok_or_else(|| Error::structure("char", "requires a non-empty string"))
    }
}

// ============================================================================
// Time
// ============================================================================

impl Codec for DateTime<Utc> {
    fn encode(&self) -> Result<Value> {
        Ok(Value::Int(self.timestamp_micros()))
    }

    fn decode(value: Value) -> Result<Self> {
        let micros = value.into_int()?;
        DateTime::from_timestamp_micros(micros).ok_or_else(|| {
            Error::structure("instant", format!("{micros} microseconds is out of range"))
        })
    }
}

impl Codec for DateTime<Local> {
    fn encode(&self) -> Result<Value> {
        // local instants are converted to UTC before storage
        self.with_timezone(&Utc).encode()
    }

    fn decode(value: Value) -> Result<Self> {
        Ok(DateTime::<Utc>::decode(value)?.with_timezone(&Local))
    }
}

/// A naive instant carries no locality information and is treated as
/// already-UTC without adjustment, unlike a local instant which is
/// converted. Decode yields the UTC wall-clock reading back.
impl Codec for NaiveDateTime {
    fn encode(&self) -> Result<Value> {
        Ok(Value::Int(self.and_utc().timestamp_micros()))
    }

    fn decode(value: Value) -> Result<Self> {
        Ok(DateTime::<Utc>::decode(value)?.naive_utc())
    }
}

impl Codec for TimeDelta {
    fn encode(&self) -> Result<Value> {
        let nanos = self.num_nanoseconds().ok_or_else(|| {
            Error::structure("duration", "nanosecond count overflows the 64-bit wire integer")
        })?;
        Ok(Value::Int(nanos))
    }

    fn decode(value: Value) -> Result<Self> {
        Ok(TimeDelta::nanoseconds(value.into_int()?))
    }
}

// ============================================================================
// Uuid, Uri, type descriptor
// ============================================================================

impl Codec for Uuid {
    fn encode(&self) -> Result<Value> {
        Ok(Value::Blob(self.as_bytes().to_vec()))
    }

    fn decode(value: Value) -> Result<Self> {
        let bytes = value.into_blob()?;
        Uuid::from_slice(&bytes).map_err(|_| {
            Error::structure(
                "uuid",
                format!("requires a 16-byte blob but found {} bytes", bytes.len()),
            )
        })
    }
}

impl Codec for Url {
    fn encode(&self) -> Result<Value> {
        Ok(Value::String(self.as_str().to_string()))
    }

    fn decode(value: Value) -> Result<Self> {
        let text = value.into_string()?;
        Url::parse(&text).map_err(|e| Error::structure("uri", format!("{text:?}: {e}")))
    }
}

/// Fully qualified type name, stored in its string form
///
/// The descriptor for a live type comes from [`TypeDesc::of`]; a decoded
/// descriptor carries the stored name without resurrecting the type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDesc(String);

impl TypeDesc {
    /// Descriptor naming the type `T`
    pub fn of<T: ?Sized>() -> Self {
        TypeDesc(std::any::type_name::<T>().to_string())
    }

    /// Descriptor from a previously stored name
    pub fn from_name(name: impl Into<String>) -> Self {
        TypeDesc(name.into())
    }

    /// The fully qualified type name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Codec for TypeDesc {
    fn encode(&self) -> Result<Value> {
        Ok(Value::String(self.0.clone()))
    }

    fn decode(value: Value) -> Result<Self> {
        Ok(TypeDesc(value.into_string()?))
    }
}

// ============================================================================
// Byte streams and key references
// ============================================================================

/// Byte streams travel as `Blob`; decode materializes a fresh in-memory
/// cursor positioned at the start of the bytes.
impl Codec for Cursor<Vec<u8>> {
    fn encode(&self) -> Result<Value> {
        Ok(Value::Blob(self.get_ref().clone()))
    }

    fn decode(value: Value) -> Result<Self> {
        Ok(Cursor::new(value.into_blob()?))
    }
}

/// Key references pass through opaquely, unchanged in both directions.
impl Codec for Key {
    fn encode(&self) -> Result<Value> {
        Ok(Value::KeyRef(self.clone()))
    }

    fn decode(value: Value) -> Result<Self> {
        value.into_key()
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Declare a fieldless enum stored through its underlying integer width.
///
/// The enum encodes as its discriminant in the given repr; decode narrows
/// the wire integer to that repr and matches it against the declared
/// discriminants, failing with a structural error on an unknown one.
///
/// ```
/// use docmap_core::{scalar_enum, Codec, Value};
///
/// scalar_enum! {
///     /// Lifecycle state of an account.
///     pub enum Status: i32 {
///         Active = 0,
///         Suspended = 1,
///         Closed = 2,
///     }
/// }
///
/// let wire = Status::Suspended.encode().unwrap();
/// assert_eq!(wire, Value::Int(1));
/// assert_eq!(Status::decode(wire).unwrap(), Status::Suspended);
/// ```
#[macro_export]
macro_rules! scalar_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ty {
            $($(#[$vmeta:meta])* $variant:ident = $disc:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr($repr)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $disc),+
        }

        impl $crate::Codec for $name {
            fn encode(&self) -> $crate::Result<$crate::Value> {
                <$repr as $crate::Codec>::encode(&(*self as $repr))
            }

            fn decode(value: $crate::Value) -> $crate::Result<Self> {
                let raw = <$repr as $crate::Codec>::decode(value)?;
                match raw {
                    $(x if x == $name::$variant as $repr => Ok($name::$variant),)+
                    other => Err($crate::Error::structure(
                        stringify!($name),
                        format!("unknown discriminant {other}"),
                    )),
                }
            }
        }
    };
}
