use super::{declared_account_ids, ArnResolver, SelfContext, SELF};
use crate::errors::SpecResult;
use crate::meta::Meta;
use crate::spec::{optional, string, Spec};
use crate::value::{Object, Value};

/// `kms: <key>` references
///
/// Keys are given by alias (a plain string or `{alias: ...}`) or by id (`{key_id: ...}`).
/// The region comes from the key mapping, then the reference mapping, then `aws_syncr.location`.
///
/// ```yaml
/// - kms: [secrets, {key_id: 1234abcd, location: us-east-1}]
///   account: [dev, prod]
/// ```
#[derive(Debug, derive_new::new)]
pub struct KmsResolver<'r> {
    resource: &'r Object,
    self_context: &'r SelfContext,
}

#[derive(Debug, PartialEq)]
enum Key {
    Alias(String),
    Id(String),
}

impl KmsResolver<'_> {
    fn key(&self, meta: &Meta, declared: &Value) -> SpecResult<(Key, String)> {
        match declared {
            Value::String(key) if key == SELF => {
                let alias = self.self_context.expect(meta, "key")?;
                Ok((Key::Alias(alias.to_string()), meta.default_location()?))
            }
            Value::String(alias) => Ok((Key::Alias(alias.clone()), self.location(meta, None)?)),
            Value::Object(key) => {
                let alias = optional(string()).normalise(&meta.at("alias"), key.get("alias"))?;
                let key_id = optional(string()).normalise(&meta.at("key_id"), key.get("key_id"))?;
                let location = self.location(meta, key.get("location"))?;

                match (alias, key_id) {
                    (Some(alias), _) => Ok((Key::Alias(alias), location)),
                    (None, Some(key_id)) => Ok((Key::Id(key_id), location)),
                    (None, None) => Err(meta.missing("kms key needs an alias or a key_id")),
                }
            }
            other => Err(meta.invalid("expected a key alias or a key mapping", other)),
        }
    }

    fn location(&self, meta: &Meta, overridden: Option<&Value>) -> SpecResult<String> {
        let meta = meta.at("location");
        match overridden.or_else(|| self.resource.get("location")) {
            Some(location) => string().normalise(&meta, Some(location)),
            None => meta.default_location(),
        }
    }
}

impl ArnResolver for KmsResolver<'_> {
    fn resolve(&self, meta: &Meta, val: &Value) -> SpecResult<Vec<String>> {
        let declared_keys: Vec<(Meta, &Value)> = match val {
            Value::Array(keys) => keys
                .iter()
                .enumerate()
                .map(|(index, key)| (meta.indexed_at(index), key))
                .collect(),
            single => vec![(meta.clone(), single)],
        };

        let mut arns = vec![];
        for (key_meta, declared) in declared_keys {
            let (key, location) = self.key(&key_meta, declared)?;
            for account_id in declared_account_ids(meta, self.resource)? {
                arns.push(match &key {
                    Key::Alias(alias) => {
                        format!("arn:aws:kms:{location}:{account_id}:alias/{alias}")
                    }
                    Key::Id(key_id) => format!("arn:aws:kms:{location}:{account_id}:key/{key_id}"),
                });
            }
        }

        Ok(arns)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::errors::SpecError;
    use crate::resources::test::{tree, yaml};
    use pretty_assertions::assert_eq;

    fn resolve(self_context: SelfContext, resource: &str) -> SpecResult<Vec<String>> {
        let tree = tree();
        let meta = Meta::new(&tree).at("kms");
        let resource = yaml(resource);
        let resource = resource.as_object().expect("resource mapping");
        KmsResolver::new(resource, &self_context).resolve(&meta, &resource["kms"])
    }

    fn lambda() -> SelfContext {
        SelfContext::new("lambda", "fn")
    }

    #[test]
    fn alias_with_default_location() {
        assert_eq!(
            resolve(lambda(), "kms: secrets").unwrap(),
            ["arn:aws:kms:ap-southeast-2:111111111111:alias/secrets"]
        );
    }

    #[test]
    fn resource_location_and_accounts() {
        assert_eq!(
            resolve(lambda(), "{kms: secrets, location: us-east-1, account: [stg, prod]}").unwrap(),
            [
                "arn:aws:kms:us-east-1:222222222222:alias/secrets",
                "arn:aws:kms:us-east-1:333333333333:alias/secrets",
            ]
        );
    }

    #[test]
    fn key_mappings() {
        let found = resolve(
            lambda(),
            "kms: [{key_id: 1234abcd}, {alias: other, location: eu-west-1}]",
        )
        .unwrap();

        assert_eq!(
            found,
            [
                "arn:aws:kms:ap-southeast-2:111111111111:key/1234abcd",
                "arn:aws:kms:eu-west-1:111111111111:alias/other",
            ]
        );
    }

    #[test]
    fn keys_times_accounts() {
        let found = resolve(
            lambda(),
            "{kms: [secrets, {key_id: 1234abcd}], account: [stg, prod]}",
        )
        .unwrap();

        assert_eq!(
            found,
            [
                "arn:aws:kms:ap-southeast-2:222222222222:alias/secrets",
                "arn:aws:kms:ap-southeast-2:333333333333:alias/secrets",
                "arn:aws:kms:ap-southeast-2:222222222222:key/1234abcd",
                "arn:aws:kms:ap-southeast-2:333333333333:key/1234abcd",
            ]
        );
    }

    #[test]
    fn key_location_wins_over_reference_location() {
        let found = resolve(
            lambda(),
            "{kms: [{alias: a, location: eu-west-1}, b], location: us-east-1}",
        )
        .unwrap();

        assert_eq!(
            found,
            [
                "arn:aws:kms:eu-west-1:111111111111:alias/a",
                "arn:aws:kms:us-east-1:111111111111:alias/b",
            ]
        );
    }

    #[test]
    fn unknown_account() {
        let err = resolve(lambda(), "{kms: secrets, account: nope}").unwrap_err();
        assert_eq!(
            err,
            SpecError::UnknownAccount {
                path: "kms.account".into(),
                account: "nope".into(),
            }
        );
    }

    #[test]
    fn key_mapping_needs_alias_or_id() {
        let err = resolve(lambda(), "kms: [secrets, {location: eu-west-1}]").unwrap_err();
        assert!(matches!(err, SpecError::MissingField { path, .. } if path == "kms[1]"));
    }

    #[test]
    fn self_reference_uses_default_location() {
        assert_eq!(
            resolve(SelfContext::new("key", "my-key"), "{kms: __self__, location: us-east-1}")
                .unwrap(),
            ["arn:aws:kms:ap-southeast-2:111111111111:alias/my-key"]
        );
    }

    #[test]
    fn self_reference_needs_a_key() {
        let err = resolve(lambda(), "kms: __self__").unwrap_err();
        assert!(matches!(
            err,
            SpecError::InvalidSelfReference { expected: "key", .. }
        ));
    }
}
