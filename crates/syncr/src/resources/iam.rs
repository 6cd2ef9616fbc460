use super::{declared_account_ids, ArnResolver, SelfContext, SELF};
use crate::errors::SpecResult;
use crate::meta::Meta;
use crate::spec::{list_of, string, Spec};
use crate::value::{Object, Value};

/// `iam: <principal>` references
///
/// Produces one ARN per account, principal and user (in that nesting order):
///
/// ```yaml
/// - iam: role/deployer        # arn:aws:iam::<default account>:role/deployer
///   account: [dev, prod]      # ...once per account
///   users: [alice, bob]       # arn:aws:iam::<account>:role/deployer/alice, ...
/// - iam: assumed-role/admin   # arn:aws:sts::<default account>:assumed-role/admin
/// - iam: __self__             # arn:aws:iam::<default account>:role/<declaring role>
/// ```
#[derive(Debug, derive_new::new)]
pub struct IamResolver<'r> {
    resource: &'r Object,
    self_context: &'r SelfContext,
}

impl ArnResolver for IamResolver<'_> {
    fn resolve(&self, meta: &Meta, val: &Value) -> SpecResult<Vec<String>> {
        let account_ids = declared_account_ids(meta, self.resource)?;
        let users = list_of(string()).normalise(&meta.at("users"), self.resource.get("users"))?;
        let names = list_of(string()).normalise(meta, Some(val))?;

        let mut arns = vec![];
        for account_id in &account_ids {
            // once __self__ is seen, the rest of this account's names use the default account too
            let mut account_id = account_id.clone();
            for name in &names {
                let name = if name == SELF {
                    let role = self.self_context.expect(meta, "iam")?;
                    account_id = meta.default_account_id()?;
                    format!("role/{role}")
                } else {
                    name.clone()
                };

                let service = if name.starts_with("assumed-role") {
                    "sts"
                } else {
                    "iam"
                };

                let arn = format!("arn:aws:{service}::{account_id}:{name}");
                if users.is_empty() {
                    arns.push(arn);
                } else {
                    arns.extend(users.iter().map(|user| format!("{arn}/{user}")));
                }
            }
        }

        Ok(arns)
    }
}
