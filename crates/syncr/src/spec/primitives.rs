use super::{filled, Spec};
use crate::errors::SpecResult;
use crate::meta::Meta;
use crate::value::Value;
use indexmap::IndexMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy)]
pub struct StringSpec;

pub fn string() -> StringSpec {
    StringSpec
}

impl Spec for StringSpec {
    type Output = String;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<String> {
        let val = filled(meta, val)?;
        val.as_str()
            .map(str::to_string)
            .ok_or_else(|| meta.invalid("expected a string", val))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IntegerSpec;

pub fn integer() -> IntegerSpec {
    IntegerSpec
}

impl Spec for IntegerSpec {
    type Output = i64;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<i64> {
        match filled(meta, val)? {
            Value::Integer(number) => Ok(*number),
            other => Err(meta.invalid("expected an integer", other)),
        }
    }
}

/// A string out of a fixed set of choices
#[derive(Debug, Clone, Copy)]
pub struct StringChoice {
    choices: &'static [&'static str],
}

pub fn string_choice(choices: &'static [&'static str]) -> StringChoice {
    StringChoice { choices }
}

impl Spec for StringChoice {
    type Output = String;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<String> {
        let choice = string().normalise(meta, val)?;
        if !self.choices.contains(&choice.as_str()) {
            return Err(meta.invalid(
                format!("expected one of {:?}", self.choices),
                filled(meta, val)?,
            ));
        }

        Ok(choice)
    }
}

/// Any value, as is
#[derive(Debug, Clone, Copy)]
pub struct AnySpec;

pub fn any() -> AnySpec {
    AnySpec
}

impl Spec for AnySpec {
    type Output = Value;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<Value> {
        filled(meta, val).cloned()
    }
}

/// A list of values
///
/// A single value is treated as a list with one element, an absent value as an empty list.
#[derive(Debug, Clone)]
pub struct ListOf<S>(S);

pub fn list_of<S: Spec>(spec: S) -> ListOf<S> {
    ListOf(spec)
}

impl<S: Spec> Spec for ListOf<S> {
    type Output = Vec<S::Output>;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<Self::Output> {
        match val {
            None => Ok(vec![]),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| self.0.normalise(&meta.indexed_at(index), Some(item)))
                .collect(),
            Some(single) => Ok(vec![self.0.normalise(meta, Some(single))?]),
        }
    }
}

/// An object with string keys, order preserved
#[derive(Debug, Clone)]
pub struct DictOf<S>(S);

pub fn dict_of<S: Spec>(spec: S) -> DictOf<S> {
    DictOf(spec)
}

impl<S: Spec> Spec for DictOf<S> {
    type Output = IndexMap<String, S::Output>;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<Self::Output> {
        let val = filled(meta, val)?;
        let Some(object) = val.as_object() else {
            return Err(meta.invalid("expected a mapping", val));
        };

        object
            .iter()
            .map(|(key, item)| {
                self.0
                    .normalise(&meta.at(key.as_str()), Some(item))
                    .map(|normalised| (key.clone(), normalised))
            })
            .collect()
    }
}

/// Path to an existing directory
#[derive(Debug, Clone, Copy)]
pub struct DirectorySpec;

pub fn directory() -> DirectorySpec {
    DirectorySpec
}

impl Spec for DirectorySpec {
    type Output = PathBuf;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<PathBuf> {
        let path = PathBuf::from(string().normalise(meta, val)?);
        if !path.is_dir() {
            return Err(meta.invalid("expected an existing directory", filled(meta, val)?));
        }

        Ok(path)
    }
}
