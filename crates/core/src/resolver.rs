//! Type resolver and per-type codec cache
//!
//! Resolution is lazy and triggered by first use per type. The resolver
//! owns the only shared mutable state in the engine: two process-wide
//! maps keyed by [`TypeId`], one holding type-erased codec pairs and one
//! holding entity-mapper tables. Both are write-once-per-key and
//! read-many.
//!
//! ## Concurrency
//!
//! Concurrent callers may race on a cold type. Synthesis is a pure,
//! deterministic function of the type, so redundant computation is
//! acceptable; publication happens with a single atomic insert-if-absent
//! (the `DashMap` entry API), which guarantees every reader observes a
//! fully-formed pair with both halves bound. Once a slot is populated it
//! is never replaced.
//!
//! The engine performs no I/O and no blocking here: resolution either
//! completes or fails synchronously, and failures are structural
//! (an unsupported type), never transient.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::trace;

use crate::codec::Codec;
use crate::entity::{EntityMapper, EntityModel};
use crate::error::{Error, Result};
use crate::value::Value;

type ErasedDecodeFn = dyn Fn(Value) -> Result<Box<dyn Any + Send>> + Send + Sync;
type ErasedEncodeFn = dyn Fn(&(dyn Any + Send)) -> Result<Value> + Send + Sync;

/// Type-erased codec pair for one native type
///
/// Always carries both conversion directions; a pair missing one half is
/// rejected at registration time, so a published pair is never partial.
pub struct ErasedCodec {
    type_name: &'static str,
    decode: Box<ErasedDecodeFn>,
    encode: Box<ErasedEncodeFn>,
}

impl std::fmt::Debug for ErasedCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErasedCodec")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl ErasedCodec {
    fn from_codec<T: Codec + Any + Send>() -> Self {
        ErasedCodec {
            type_name: std::any::type_name::<T>(),
            decode: Box::new(|value| {
                T::decode(value).map(|v| Box::new(v) as Box<dyn Any + Send>)
            }),
            encode: Box::new(|any| {
                let v = any.downcast_ref::<T>().ok_or_else(|| {
                    Error::mismatch(std::any::type_name::<T>(), "a different runtime type")
                })?;
                v.encode()
            }),
        }
    }

    fn from_parts<T: Any + Send>(
        decode: fn(Value) -> Result<T>,
        encode: fn(&T) -> Result<Value>,
    ) -> Self {
        ErasedCodec {
            type_name: std::any::type_name::<T>(),
            decode: Box::new(move |value| {
                decode(value).map(|v| Box::new(v) as Box<dyn Any + Send>)
            }),
            encode: Box::new(move |any| {
                let v = any.downcast_ref::<T>().ok_or_else(|| {
                    Error::mismatch(std::any::type_name::<T>(), "a different runtime type")
                })?;
                encode(v)
            }),
        }
    }

    /// The fully qualified name of the native type this pair converts
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Decode through the erased pair, yielding a boxed native value
    pub fn decode_erased(&self, value: Value) -> Result<Box<dyn Any + Send>> {
        (self.decode)(value)
    }

    /// Encode through the erased pair
    ///
    /// Fails with a type-mismatch error if `value` is not the native type
    /// this pair was synthesized for.
    pub fn encode_erased(&self, value: &(dyn Any + Send)) -> Result<Value> {
        (self.encode)(value)
    }

    /// Decode through the erased pair and downcast to `T`
    pub fn decode<T: Any>(&self, value: Value) -> Result<T> {
        self.decode_erased(value)?
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| Error::mismatch(std::any::type_name::<T>(), "a different runtime type"))
    }

    /// Encode a native value through the erased pair
    pub fn encode<T: Any + Send>(&self, value: &T) -> Result<Value> {
        self.encode_erased(value)
    }
}

/// Codec pairs, keyed by the native type's identity
static CODECS: Lazy<DashMap<TypeId, Arc<ErasedCodec>>> = Lazy::new(DashMap::new);

/// Entity-mapper tables, keyed by the entity type's identity
static MAPPERS: Lazy<DashMap<TypeId, Arc<dyn Any + Send + Sync>>> = Lazy::new(DashMap::new);

/// Resolve the codec pair for `T`, synthesizing and caching it on first use
///
/// Idempotent and safe to call repeatedly; every call after the first for
/// a given type is an O(1) cache hit returning the same pair.
pub fn resolve<T: Codec + Any + Send>() -> Arc<ErasedCodec> {
    let entry = CODECS.entry(TypeId::of::<T>()).or_insert_with(|| {
        trace!(
            target: "docmap::resolver",
            type_name = std::any::type_name::<T>(),
            "synthesizing codec pair"
        );
        Arc::new(ErasedCodec::from_codec::<T>())
    });
    entry.value().clone()
}

/// Look up the codec pair for `T` without synthesizing one
///
/// A type that was never resolved nor registered fails with an
/// unsupported-type error naming the type; the same error is returned on
/// every subsequent attempt.
pub fn resolve_dyn<T: Any>() -> Result<Arc<ErasedCodec>> {
    CODECS
        .get(&TypeId::of::<T>())
        .map(|entry| entry.value().clone())
        .ok_or_else(Error::unsupported::<T>)
}

/// Register a custom codec pair for `T`
///
/// Both conversion directions must be supplied; anything less is a
/// programming error in strategy registration and fails with a
/// partial-codec error. Registration is write-once: the first pair
/// published for a type wins and later registrations are silently
/// ignored, matching the cache's first-writer semantics.
pub fn register_custom<T: Any + Send>(
    decode: Option<fn(Value) -> Result<T>>,
    encode: Option<fn(&T) -> Result<Value>>,
) -> Result<()> {
    let (decode, encode) = match (decode, encode) {
        (Some(d), Some(e)) => (d, e),
        _ => return Err(Error::PartialCodec(std::any::type_name::<T>().to_string())),
    };
    CODECS.entry(TypeId::of::<T>()).or_insert_with(|| {
        trace!(
            target: "docmap::resolver",
            type_name = std::any::type_name::<T>(),
            "registering custom codec pair"
        );
        Arc::new(ErasedCodec::from_parts(decode, encode))
    });
    Ok(())
}

/// The cached entity mapper for `T`, built once on first use
///
/// Property-descriptor construction runs at most once per type per
/// process; concurrent first callers may race, and the first published
/// table wins.
pub fn mapper<T: EntityModel>() -> Arc<EntityMapper<T>> {
    let entry = MAPPERS.entry(TypeId::of::<T>()).or_insert_with(|| {
        trace!(
            target: "docmap::resolver",
            type_name = std::any::type_name::<T>(),
            "building entity mapper"
        );
        Arc::new(EntityMapper::<T>::build()) as Arc<dyn Any + Send + Sync>
    });
    // the TypeId key pins the stored type, so the downcast cannot fail
    entry
        .value()
        .clone()
        .downcast::<EntityMapper<T>>()
        .expect("mapper cache holds exactly the type keyed by its TypeId")
}
