use super::{declared_account_ids, ArnResolver};
use crate::errors::SpecResult;
use crate::meta::Meta;
use crate::spec::{defaulted, list_of, string, Spec};
use crate::value::{Object, Value};

/// `arn: <service>` references for everything without a dedicated resolver
///
/// ```yaml
/// - arn: sqs
///   identity: [queue-a, queue-b]
///   location: us-east-1         # optional, defaults to ""
///   account: prod               # optional, defaults to the current environment
/// ```
#[derive(Debug, derive_new::new)]
pub struct GenericArnResolver<'r> {
    resource: &'r Object,
}

impl ArnResolver for GenericArnResolver<'_> {
    fn resolve(&self, meta: &Meta, val: &Value) -> SpecResult<Vec<String>> {
        let service = string().normalise(meta, Some(val))?;

        let Some(identity) = self.resource.get("identity") else {
            return Err(meta.missing("generic arn specified without specifying 'identity'"));
        };
        let identities = list_of(string()).normalise(&meta.at("identity"), Some(identity))?;
        let location =
            defaulted(string(), "").normalise(&meta.at("location"), self.resource.get("location"))?;
        let account_ids = declared_account_ids(meta, self.resource)?;

        let mut arns = vec![];
        for identity in &identities {
            for account_id in &account_ids {
                arns.push(format!(
                    "arn:aws:{service}:{location}:{account_id}:{identity}"
                ));
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

    fn resolve(resource: &str) -> SpecResult<Vec<String>> {
        let tree = tree();
        let meta = Meta::new(&tree).at("arn");
        let resource = yaml(resource);
        let resource = resource.as_object().expect("resource mapping");
        GenericArnResolver::new(resource).resolve(&meta, &resource["arn"])
    }

    #[test]
    fn identities_times_accounts() {
        let found = resolve(
            "{arn: sqs, identity: [queue-a, queue-b], location: us-east-1, account: [dev, prod]}",
        )
        .unwrap();

        assert_eq!(
            found,
            [
                "arn:aws:sqs:us-east-1:111111111111:queue-a",
                "arn:aws:sqs:us-east-1:333333333333:queue-a",
                "arn:aws:sqs:us-east-1:111111111111:queue-b",
                "arn:aws:sqs:us-east-1:333333333333:queue-b",
            ]
        );
    }

    #[test]
    fn location_defaults_to_empty() {
        assert_eq!(
            resolve("{arn: sns, identity: topic}").unwrap(),
            ["arn:aws:sns::111111111111:topic"]
        );
    }

    #[test]
    fn unknown_account() {
        let err = resolve("{arn: sqs, identity: queue, account: [dev, nope]}").unwrap_err();
        assert_eq!(
            err,
            SpecError::UnknownAccount {
                path: "arn.account".into(),
                account: "nope".into(),
            }
        );
    }

    #[test]
    fn identity_is_required() {
        let err = resolve("{arn: sns}").unwrap_err();
        assert!(matches!(err, SpecError::MissingField { path, .. } if path == "arn"));
    }
}
