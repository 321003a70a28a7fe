//! Field-name-aware filter construction
//!
//! Query predicates are built against entity *properties* and resolved to
//! wire *field names* through the same mapper lookup the projection uses,
//! so a renamed property is filtered under its stored name, never its
//! declared name. The comparand is encoded through its own codec, which
//! keeps predicate values in the exact representation the store holds.

use std::cmp::Ordering;

use crate::codec::Codec;
use crate::entity::EntityModel;
use crate::error::Result;
use crate::resolver;
use crate::value::{Fields, Value};

/// Comparison operator of a property predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Stored value equals the comparand
    Equal,
    /// Stored value orders strictly after the comparand
    GreaterThan,
    /// Stored value orders strictly before the comparand
    LessThan,
    /// Stored value orders after or equals the comparand
    GreaterThanOrEqual,
    /// Stored value orders before or equals the comparand
    LessThanOrEqual,
}

/// A single-property predicate over stored entities
///
/// Carries the resolved wire field name, the operator, and the encoded
/// comparand.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    field: String,
    op: Op,
    value: Value,
}

impl Filter {
    /// Build a predicate over a property of `T`
    ///
    /// The property name is resolved to its wire field name through the
    /// entity mapper; an undeclared property fails with an
    /// unknown-property error.
    pub fn property<T: EntityModel, V: Codec>(property: &str, op: Op, value: &V) -> Result<Filter> {
        let field = resolver::mapper::<T>().field_name(property)?;
        Ok(Filter {
            field: field.to_string(),
            op,
            value: value.encode()?,
        })
    }

    /// Equality predicate over a property of `T`
    pub fn equal<T: EntityModel, V: Codec>(property: &str, value: &V) -> Result<Filter> {
        Self::property::<T, V>(property, Op::Equal, value)
    }

    /// Strictly-greater predicate over a property of `T`
    pub fn greater_than<T: EntityModel, V: Codec>(property: &str, value: &V) -> Result<Filter> {
        Self::property::<T, V>(property, Op::GreaterThan, value)
    }

    /// Strictly-less predicate over a property of `T`
    pub fn less_than<T: EntityModel, V: Codec>(property: &str, value: &V) -> Result<Filter> {
        Self::property::<T, V>(property, Op::LessThan, value)
    }

    /// Greater-or-equal predicate over a property of `T`
    pub fn greater_than_or_equal<T: EntityModel, V: Codec>(
        property: &str,
        value: &V,
    ) -> Result<Filter> {
        Self::property::<T, V>(property, Op::GreaterThanOrEqual, value)
    }

    /// Less-or-equal predicate over a property of `T`
    pub fn less_than_or_equal<T: EntityModel, V: Codec>(
        property: &str,
        value: &V,
    ) -> Result<Filter> {
        Self::property::<T, V>(property, Op::LessThanOrEqual, value)
    }

    /// The resolved wire field name this predicate reads
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The comparison operator
    pub fn op(&self) -> Op {
        self.op
    }

    /// The encoded comparand
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Evaluate the predicate against one stored document
    ///
    /// An absent field never matches, and neither does a stored value of
    /// a different case than the comparand.
    pub fn matches(&self, fields: &Fields) -> bool {
        let Some(stored) = fields.get(&self.field) else {
            return false;
        };
        let Some(ord) = compare(stored, &self.value) else {
            return false;
        };
        match self.op {
            Op::Equal => ord == Ordering::Equal,
            Op::GreaterThan => ord == Ordering::Greater,
            Op::LessThan => ord == Ordering::Less,
            Op::GreaterThanOrEqual => ord != Ordering::Less,
            Op::LessThanOrEqual => ord != Ordering::Greater,
        }
    }
}

/// Ordered comparison of two stored values
///
/// Defined within a case only; cross-case comparison yields `None` (no
/// implicit coercions). Doubles follow IEEE-754 partial order, so a NaN
/// comparand matches nothing.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Blob(x), Value::Blob(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
