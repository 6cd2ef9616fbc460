//! composable value specs
//!
//! A [Spec] turns a loosely typed [Value] (or its absence) into a typed result. Specs are
//! built from small primitives ([string], [integer], [list_of], ...) and wrapped in
//! combinators ([required], [defaulted], [only_one], ...).
//!
//! Specs never mutate their input and have no side effects besides returning a [SpecError].
//!
//! ```
//! # use syncr::{config_tree, meta::Meta, spec::*, value::Value};
//! let tree = config_tree!("{}");
//! let meta = Meta::new(&tree).at("memory_size");
//!
//! let memory_size = defaulted(divisible_by(64), 128);
//! assert_eq!(memory_size.normalise(&meta, None).unwrap(), 128);
//! assert_eq!(memory_size.normalise(&meta, Some(&Value::Integer(256))).unwrap(), 256);
//! assert!(memory_size.normalise(&meta, Some(&Value::Integer(200))).is_err());
//! ```
mod format;
mod primitives;

pub use format::{formatted_string, FormattedString};
pub use primitives::*;

use crate::errors::{SpecError, SpecResult};
use crate::meta::Meta;
use crate::value::Value;

pub trait Spec {
    type Output;

    /// Normalise `val`, `None` meaning the value was not specified at all
    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<Self::Output>;
}

/// Unwrap a value that must be present
pub(crate) fn filled<'v>(meta: &Meta, val: Option<&'v Value>) -> SpecResult<&'v Value> {
    val.ok_or_else(|| meta.missing("expected a value"))
}

/// Fails when the value is absent
#[derive(Debug, Clone)]
pub struct Required<S>(S);

pub fn required<S: Spec>(spec: S) -> Required<S> {
    Required(spec)
}

impl<S: Spec> Spec for Required<S> {
    type Output = S::Output;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<Self::Output> {
        let Some(val) = val else {
            return Err(meta.missing(format!(
                "{} is required",
                meta.key_name().unwrap_or("value")
            )));
        };
        self.0.normalise(meta, Some(val))
    }
}

/// Absent values become `None`
#[derive(Debug, Clone)]
pub struct Optional<S>(S);

pub fn optional<S: Spec>(spec: S) -> Optional<S> {
    Optional(spec)
}

impl<S: Spec> Spec for Optional<S> {
    type Output = Option<S::Output>;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<Self::Output> {
        val.map(|val| self.0.normalise(meta, Some(val))).transpose()
    }
}

/// Absent values are replaced with a default
pub struct Defaulted<S: Spec> {
    spec: S,
    default: S::Output,
}

pub fn defaulted<S: Spec>(spec: S, default: impl Into<S::Output>) -> Defaulted<S> {
    Defaulted {
        spec,
        default: default.into(),
    }
}

impl<S> Spec for Defaulted<S>
where
    S: Spec,
    S::Output: Clone,
{
    type Output = S::Output;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<Self::Output> {
        match val {
            Some(val) => self.spec.normalise(meta, Some(val)),
            None => Ok(self.default.clone()),
        }
    }
}

/// Ignores the input, always yields the same value
#[derive(Debug, Clone)]
pub struct Overridden<T>(T);

pub fn overridden<T: Clone>(value: T) -> Overridden<T> {
    Overridden(value)
}

impl<T: Clone> Spec for Overridden<T> {
    type Output = T;

    fn normalise(&self, _meta: &Meta, _val: Option<&Value>) -> SpecResult<Self::Output> {
        Ok(self.0.clone())
    }
}

/// Requires a list spec to yield exactly one element and unwraps it
#[derive(Debug, Clone)]
pub struct OnlyOne<S>(S);

pub fn only_one<S, T>(spec: S) -> OnlyOne<S>
where
    S: Spec<Output = Vec<T>>,
{
    OnlyOne(spec)
}

impl<S, T> Spec for OnlyOne<S>
where
    S: Spec<Output = Vec<T>>,
    T: std::fmt::Debug,
{
    type Output = T;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<Self::Output> {
        let mut found = self.0.normalise(meta, val)?;
        if found.len() != 1 {
            return Err(SpecError::InvalidValue {
                path: meta.path(),
                message: "expected exactly one".to_string(),
                got: format!("{found:?}"),
            });
        }

        Ok(found.remove(0))
    }
}

/// An integer that is a multiple of `divider`
#[derive(Debug, Clone, derive_new::new)]
pub struct DivisibleBy {
    divider: i64,
}

pub fn divisible_by(divider: i64) -> DivisibleBy {
    DivisibleBy::new(divider)
}

impl Spec for DivisibleBy {
    type Output = i64;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<Self::Output> {
        let number = integer().normalise(meta, val)?;
        if number.checked_rem(self.divider) != Some(0) {
            return Err(meta.invalid(
                format!("value should be divisible by {}", self.divider),
                filled(meta, val)?,
            ));
        }

        Ok(number)
    }
}
