//! Core codec engine for docmap
//!
//! This crate converts native values to and from a schema-less tagged
//! document model, deriving the conversion pair for a type once and
//! reusing it for every subsequent value of that type:
//! - Value / Fields / Key: the tagged value model (`value`)
//! - Codec: the conversion trait and dispatch cascade (`codec`)
//! - Scalar table: built-in primitive conversions (`scalar`)
//! - EntityModel / EntityMapper: property-by-property mapping of
//!   structured types (`entity`)
//! - resolver: the process-wide per-type codec cache (`resolver`)
//! - Filter: field-name-aware predicate construction (`filter`)
//! - Error: error type hierarchy (`error`)
//!
//! The cascade deciding how a type converts runs in a fixed priority
//! order (sequences, then generic containers, then scalars and enums,
//! then the structured-object fallback); see `codec` for the details.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
pub mod codec;
pub mod entity;
pub mod error;
pub mod filter;
pub mod resolver;
pub mod scalar;
pub mod value;

// Re-export commonly used types and traits
pub use codec::Codec;
pub use entity::{field_name_of, EntityMapper, EntityModel, Fk, KeyProperty, Property};
pub use error::{Error, Result};
pub use filter::{Filter, Op};
pub use resolver::{mapper, register_custom, resolve, resolve_dyn, ErasedCodec};
pub use scalar::TypeDesc;
pub use value::{Fields, Key, KeyId, Value};
