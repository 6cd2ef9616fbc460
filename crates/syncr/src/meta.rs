//! normalisation context
//!
//! A [Meta] is handed to every spec and resolver. It gives read-only access to the whole
//! [ConfigTree] and knows the dotted path of the value currently being normalised, which
//! every [SpecError] carries.
use crate::config::ConfigTree;
use crate::errors::{SpecError, SpecResult};
use crate::value::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone)]
pub struct Meta<'c> {
    everything: &'c ConfigTree,
    path: Vec<Segment>,
}

impl<'c> Meta<'c> {
    pub fn new(everything: &'c ConfigTree) -> Self {
        Self {
            everything,
            path: vec![],
        }
    }

    pub fn everything(&self) -> &'c ConfigTree {
        self.everything
    }

    /// Context of a child key
    pub fn at(&self, key: impl Into<String>) -> Self {
        let mut path = self.path.clone();
        path.push(Segment::Key(key.into()));
        Self {
            everything: self.everything,
            path,
        }
    }

    /// Context of a list element
    pub fn indexed_at(&self, index: usize) -> Self {
        let mut path = self.path.clone();
        path.push(Segment::Index(index));
        Self {
            everything: self.everything,
            path,
        }
    }

    /// Name of the innermost key (ignoring list indices)
    pub fn key_name(&self) -> Option<&str> {
        self.path.iter().rev().find_map(|segment| match segment {
            Segment::Key(key) => Some(key.as_str()),
            Segment::Index(_) => None,
        })
    }

    pub fn path(&self) -> String {
        self.to_string()
    }

    /// Id of the account named by the current environment
    pub fn default_account_id(&self) -> SpecResult<String> {
        let Some(environment) = self.everything.environment() else {
            return Err(self.missing("no environment specified (aws_syncr.environment)"));
        };

        self.everything
            .account_id(environment)
            .ok_or_else(|| SpecError::UnknownAccount {
                path: self.path(),
                account: environment.to_string(),
            })
    }

    /// Resolve a declared account alias, a blank alias means the default account
    pub fn account_id(&self, alias: &str) -> SpecResult<String> {
        if alias.is_empty() {
            return self.default_account_id();
        }

        self.everything
            .account_id(alias)
            .ok_or_else(|| SpecError::UnknownAccount {
                path: self.path(),
                account: alias.to_string(),
            })
    }

    pub fn default_location(&self) -> SpecResult<String> {
        self.everything
            .location()
            .map(str::to_string)
            .ok_or_else(|| self.missing("no default location specified (aws_syncr.location)"))
    }

    pub fn invalid(&self, message: impl Into<String>, got: &Value) -> SpecError {
        SpecError::InvalidValue {
            path: self.path(),
            message: message.into(),
            got: got.to_string(),
        }
    }

    pub fn missing(&self, message: impl Into<String>) -> SpecError {
        SpecError::MissingField {
            path: self.path(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Meta<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return f.write_str("<root>");
        }

        for (index, segment) in self.path.iter().enumerate() {
            match segment {
                Segment::Key(key) if index == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }

        Ok(())
    }
}
