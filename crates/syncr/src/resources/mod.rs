//! resource references and their expansion into ARNs
//!
//! A declared reference is either a literal string, used as is, or a mapping tagged with exactly
//! one of `iam`, `kms`, `s3` or `arn` (no tag or several tags is a `MissingField`):
//!
//! ```yaml
//! role:
//!   - iam: role/my-role
//!     account: [dev, prod]
//!   - s3: __self__
//!   - kms: {alias: secrets, location: us-east-1}
//!   - arn: sqs
//!     identity: my-queue
//!   - "arn:aws:sns:us-east-1:123456789012:literal"
//! ```
//!
//! One reference may expand into several ARNs (one per account, user, ...). The tag value
//! `__self__` refers to the resource doing the declaring, see [SelfContext].
mod arn;
mod iam;
mod kms;
mod s3;

pub use arn::GenericArnResolver;
pub use iam::IamResolver;
pub use kms::KmsResolver;
pub use s3::S3Resolver;

use crate::errors::{SpecError, SpecResult};
use crate::meta::Meta;
use crate::spec::{list_of, string, Spec};
use crate::value::{Object, Value};
use std::fmt;

/// Sentinel referring to the declaring resource
pub const SELF: &str = "__self__";

/// Expands the value found under a resolver's tag into ARNs
pub trait ArnResolver {
    fn resolve(&self, meta: &Meta, val: &Value) -> SpecResult<Vec<String>>;
}

/// Type and name of the resource that declares the references
#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct SelfContext {
    #[new(into)]
    pub self_type: String,
    #[new(into)]
    pub self_name: String,
}

impl SelfContext {
    /// Name of the declaring resource, if it is of the `expected` type
    pub fn expect(&self, meta: &Meta, expected: &'static str) -> SpecResult<&str> {
        if self.self_type != expected {
            return Err(SpecError::InvalidSelfReference {
                path: meta.path(),
                expected,
                self_type: self.self_type.clone(),
            });
        }

        Ok(&self.self_name)
    }
}

/// Account ids declared under `account`, an empty or blank entry means the default account
pub(crate) fn declared_account_ids(meta: &Meta, resource: &Object) -> SpecResult<Vec<String>> {
    let meta = meta.at("account");
    let aliases = list_of(string()).normalise(&meta, resource.get("account"))?;
    if aliases.is_empty() {
        return Ok(vec![meta.default_account_id()?]);
    }

    aliases
        .iter()
        .map(|alias| meta.account_id(alias.trim()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Iam,
    Kms,
    S3,
    Arn,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [Self::Iam, Self::Kms, Self::S3, Self::Arn];

    pub fn tag(self) -> &'static str {
        match self {
            ResourceKind::Iam => "iam",
            ResourceKind::Kms => "kms",
            ResourceKind::S3 => "s3",
            ResourceKind::Arn => "arn",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One parsed entry of a reference list
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceRef<'v> {
    Literal(&'v str),
    Iam { resource: &'v Object, names: &'v Value },
    Kms { resource: &'v Object, keys: &'v Value },
    S3 { bucket: &'v Value },
    Arn { resource: &'v Object, service: &'v Value },
}

impl<'v> ResourceRef<'v> {
    pub fn parse(meta: &Meta, item: &'v Value) -> SpecResult<Self> {
        let resource = match item {
            Value::String(literal) => return Ok(ResourceRef::Literal(literal)),
            Value::Object(resource) => resource,
            other => {
                return Err(meta.invalid("expected a string or a resource mapping", other));
            }
        };

        let mut present = ResourceKind::ALL
            .into_iter()
            .filter_map(|kind| resource.get(kind.tag()).map(|val| (kind, val)));

        let Some((kind, val)) = present.next() else {
            return Err(meta.missing("resource mapping needs one of iam, kms, s3 or arn"));
        };

        if let Some((other, _)) = present.next() {
            return Err(meta.missing(format!(
                "only one resource type per mapping, found {kind} and {other}"
            )));
        }

        Ok(match kind {
            ResourceKind::Iam => ResourceRef::Iam {
                resource,
                names: val,
            },
            ResourceKind::Kms => ResourceRef::Kms {
                resource,
                keys: val,
            },
            ResourceKind::S3 => ResourceRef::S3 { bucket: val },
            ResourceKind::Arn => ResourceRef::Arn {
                resource,
                service: val,
            },
        })
    }

    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            ResourceRef::Literal(_) => None,
            ResourceRef::Iam { .. } => Some(ResourceKind::Iam),
            ResourceRef::Kms { .. } => Some(ResourceKind::Kms),
            ResourceRef::S3 { .. } => Some(ResourceKind::S3),
            ResourceRef::Arn { .. } => Some(ResourceKind::Arn),
        }
    }

    /// Expand into ARNs, `meta` points at the reference itself
    pub fn resolve(&self, meta: &Meta, self_context: &SelfContext) -> SpecResult<Vec<String>> {
        let tagged = |kind: ResourceKind| meta.at(kind.tag());

        match *self {
            ResourceRef::Literal(literal) => Ok(vec![literal.to_string()]),
            ResourceRef::Iam { resource, names } => IamResolver::new(resource, self_context)
                .resolve(&tagged(ResourceKind::Iam), names),
            ResourceRef::Kms { resource, keys } => KmsResolver::new(resource, self_context)
                .resolve(&tagged(ResourceKind::Kms), keys),
            ResourceRef::S3 { bucket } => {
                S3Resolver::new(self_context).resolve(&tagged(ResourceKind::S3), bucket)
            }
            ResourceRef::Arn { resource, service } => GenericArnResolver::new(resource)
                .resolve(&tagged(ResourceKind::Arn), service),
        }
    }
}

/// A list of resource references, expanded and sorted
///
/// Duplicates are kept: two references producing the same ARN yield it twice.
#[derive(Debug, Clone, derive_new::new)]
pub struct ResourceSpec {
    self_context: SelfContext,
    /// Allowed resource types, `None` allows all
    only: Option<&'static [ResourceKind]>,
}

impl Spec for ResourceSpec {
    type Output = Vec<String>;

    #[tracing::instrument(level = "trace", skip_all, fields(path = %meta))]
    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<Vec<String>> {
        let items: Vec<&Value> = match val {
            None => vec![],
            Some(Value::Array(items)) => items.iter().collect(),
            Some(single) => vec![single],
        };

        let mut result = vec![];
        for (index, item) in items.into_iter().enumerate() {
            let meta = meta.indexed_at(index);
            let reference = ResourceRef::parse(&meta, item)?;

            if let (Some(kind), Some(only)) = (reference.kind(), self.only) {
                if !only.contains(&kind) {
                    return Err(SpecError::UnsupportedResourceType {
                        path: meta.path(),
                        wanted: kind.tag().to_string(),
                        available: only.iter().map(|kind| kind.tag().to_string()).collect(),
                    });
                }
            }

            let found = reference.resolve(&meta, &self.self_context)?;
            tracing::trace!(path = %meta, ?found, "resolved reference");
            result.extend(found);
        }

        result.sort();
        Ok(result)
    }
}
