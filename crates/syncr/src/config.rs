//! read-only configuration tree
//!
//! The merged result of all loaded documents. Normalisation never mutates it; the only
//! writes happen while setting up a run ([ConfigTree::with_environment]).
//!
//! Well known locations:
//!
//! | **path**                | **content**                                   |
//! |-------------------------|-----------------------------------------------|
//! | `accounts`              | account alias -> account id                   |
//! | `templates`             | template name -> partial resource definition  |
//! | `aws_syncr.environment` | current environment (an alias in `accounts`)  |
//! | `aws_syncr.location`    | default region                                |
//! | `lambda`                | function name -> function definition          |
use crate::value::{Object, Value};

pub const ACCOUNTS: &str = "accounts";
pub const TEMPLATES: &str = "templates";
const SETTINGS: &str = "aws_syncr";
const ENVIRONMENT: &str = "environment";
const LOCATION: &str = "location";

#[derive(Debug, Clone, Default)]
pub struct ConfigTree {
    root: Object,
}

impl ConfigTree {
    pub fn new(root: Object) -> Self {
        Self { root }
    }

    /// Override the ambient environment and/or default location for this run
    pub fn with_environment(mut self, environment: Option<String>, location: Option<String>) -> Self {
        let settings = self
            .root
            .entry(SETTINGS.to_string())
            .or_insert_with(|| Value::Object(Object::new()));

        if !matches!(settings, Value::Object(_)) {
            tracing::warn!("replacing non-object {SETTINGS} section");
            *settings = Value::Object(Object::new());
        }

        if let Value::Object(settings) = settings {
            if let Some(environment) = environment {
                settings.insert(ENVIRONMENT.to_string(), environment.into());
            }
            if let Some(location) = location {
                settings.insert(LOCATION.to_string(), location.into());
            }
        }

        self
    }

    pub fn root(&self) -> &Object {
        &self.root
    }

    /// Lookup by dotted path (`aws_syncr.environment`)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let (first, rest) = path.split_once('.').unwrap_or((path, ""));
        self.root.get(first).and_then(|value| value.get_path(rest))
    }

    pub fn environment(&self) -> Option<&str> {
        self.get(SETTINGS)
            .and_then(|settings| settings.get(ENVIRONMENT))
            .and_then(Value::as_str)
    }

    pub fn location(&self) -> Option<&str> {
        self.get(SETTINGS)
            .and_then(|settings| settings.get(LOCATION))
            .and_then(Value::as_str)
    }

    /// Account id for an alias
    ///
    /// Ids may be written as integers in the documents, they are always handed out as strings.
    pub fn account_id(&self, alias: &str) -> Option<String> {
        self.get(ACCOUNTS)
            .and_then(|accounts| accounts.get(alias))
            .and_then(Value::as_scalar_string)
    }

    pub fn templates(&self) -> Option<&Object> {
        self.get(TEMPLATES).and_then(Value::as_object)
    }
}

impl From<Object> for ConfigTree {
    fn from(value: Object) -> Self {
        Self::new(value)
    }
}

/// Utility macro to create a [ConfigTree] from a yaml document
///
/// ```
/// # use syncr::config_tree;
/// let tree = config_tree!("accounts: {dev: '123456789012'}");
/// assert_eq!(tree.account_id("dev").as_deref(), Some("123456789012"));
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use syncr::config_tree;
/// config_tree!("- not a mapping");
/// ```
#[macro_export]
macro_rules! config_tree {
    { $expr:expr } => {
        $crate::config::ConfigTree::new(
            serde_yaml::from_str::<$crate::value::Object>($expr).expect("document must be a yaml mapping")
        )
    };
}
