//! make the provider match the declared functions
//!
//! [sync_one] only decides between create and modify. Working out which attributes actually
//! differ is up to the [LambdaApi] implementation.
use crate::lambda::{Lambda, Lambdas};
use serde::{Deserialize, Serialize};

/// Errors from provider operations, passed on unchanged
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("failed to look up function {name} in {location}: {message}")]
    Lookup {
        name: String,
        location: String,
        message: String,
    },
    #[error("failed to create function {name}: {message}")]
    Create { name: String, message: String },
    #[error("failed to modify function {name}: {message}")]
    Modify { name: String, message: String },
}

/// Observed state of a deployed function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub location: String,
    pub runtime: String,
    pub role: String,
    pub handler: String,
    #[serde(default)]
    pub timeout: Option<i64>,
    pub memory_size: i64,
    #[serde(default)]
    pub description: Option<String>,
}

/// The lambda part of a cloud provider client
pub trait LambdaApi {
    fn function_info(&self, name: &str, location: &str) -> Result<Option<FunctionInfo>, ProviderError>;

    fn create_function(&mut self, function: &Lambda) -> Result<(), ProviderError>;

    /// Bring `existing` in line with `function`
    fn modify_function(&mut self, existing: &FunctionInfo, function: &Lambda) -> Result<(), ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Modified,
}

/// Make sure this function exists and has only the attributes we want it to have
#[tracing::instrument(level = "debug", skip_all, fields(function = %function.name, location = %function.location))]
pub fn sync_one(api: &mut dyn LambdaApi, function: &Lambda) -> Result<SyncAction, ProviderError> {
    match api.function_info(&function.name, &function.location)? {
        None => {
            tracing::debug!("function does not exist, creating");
            api.create_function(function)?;
            Ok(SyncAction::Created)
        }
        Some(existing) => {
            tracing::debug!("function exists, modifying");
            api.modify_function(&existing, function)?;
            Ok(SyncAction::Modified)
        }
    }
}

/// [sync_one] for every function, in declaration order
pub fn sync_all(
    api: &mut dyn LambdaApi,
    lambdas: &Lambdas,
) -> Result<Vec<(String, SyncAction)>, ProviderError> {
    lambdas
        .items
        .iter()
        .map(|(name, function)| sync_one(api, function).map(|action| (name.clone(), action)))
        .collect()
}

/// A changed attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub field: &'static str,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannedChange {
    Create {
        name: String,
        location: String,
    },
    Modify {
        name: String,
        location: String,
        changes: Vec<Change>,
    },
}

/// Provider backed by a snapshot of observed state that only records what it would do
#[derive(Debug, Default, derive_new::new)]
pub struct PlanProvider {
    observed: Vec<FunctionInfo>,
    #[new(default)]
    planned: Vec<PlannedChange>,
}

impl PlanProvider {
    pub fn planned(&self) -> &[PlannedChange] {
        &self.planned
    }

    pub fn into_planned(self) -> Vec<PlannedChange> {
        self.planned
    }
}

fn changes(existing: &FunctionInfo, function: &Lambda) -> Vec<Change> {
    fn render<T: ToString>(value: &Option<T>) -> String {
        value
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "<none>".to_string())
    }

    let compared = [
        ("runtime", existing.runtime.clone(), function.runtime.clone()),
        ("role", existing.role.clone(), function.role.clone()),
        ("handler", existing.handler.clone(), function.handler.clone()),
        ("timeout", render(&existing.timeout), render(&function.timeout)),
        (
            "memory_size",
            existing.memory_size.to_string(),
            function.memory_size.to_string(),
        ),
        (
            "description",
            render(&existing.description),
            render(&function.description),
        ),
    ];

    compared
        .into_iter()
        .filter(|(_, from, to)| from != to)
        .map(|(field, from, to)| Change { field, from, to })
        .collect()
}

impl LambdaApi for PlanProvider {
    fn function_info(&self, name: &str, location: &str) -> Result<Option<FunctionInfo>, ProviderError> {
        Ok(self
            .observed
            .iter()
            .find(|info| info.name == name && info.location == location)
            .cloned())
    }

    fn create_function(&mut self, function: &Lambda) -> Result<(), ProviderError> {
        self.planned.push(PlannedChange::Create {
            name: function.name.clone(),
            location: function.location.clone(),
        });
        Ok(())
    }

    fn modify_function(&mut self, existing: &FunctionInfo, function: &Lambda) -> Result<(), ProviderError> {
        let changes = changes(existing, function);
        tracing::debug!(function = %function.name, changed = changes.len(), "planned modification");
        self.planned.push(PlannedChange::Modify {
            name: function.name.clone(),
            location: function.location.clone(),
            changes,
        });
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lambda::{InlineCode, LambdaCode};
    use pretty_assertions::assert_eq;

    fn lambda(name: &str) -> Lambda {
        Lambda {
            name: name.into(),
            role: "arn:aws:iam::1:role/fn".into(),
            code: LambdaCode::Inline(InlineCode {
                code: "pass".into(),
                runtime: "python".into(),
            }),
            handler: "lambda_function.lambda_handler".into(),
            timeout: Some(10),
            runtime: "python".into(),
            location: "us-east-1".into(),
            description: None,
            sample_event: None,
            memory_size: 128,
        }
    }

    fn observed(name: &str) -> FunctionInfo {
        FunctionInfo {
            name: name.into(),
            location: "us-east-1".into(),
            runtime: "python".into(),
            role: "arn:aws:iam::1:role/fn".into(),
            handler: "lambda_function.lambda_handler".into(),
            timeout: Some(3),
            memory_size: 128,
            description: None,
        }
    }

    #[test]
    fn creates_missing_functions() {
        let mut api = PlanProvider::new(vec![]);
        assert_eq!(sync_one(&mut api, &lambda("fn")).unwrap(), SyncAction::Created);
        assert_eq!(
            api.planned(),
            [PlannedChange::Create {
                name: "fn".into(),
                location: "us-east-1".into()
            }]
        );
    }

    #[test]
    fn modifies_existing_functions() {
        let mut api = PlanProvider::new(vec![observed("fn")]);
        assert_eq!(sync_one(&mut api, &lambda("fn")).unwrap(), SyncAction::Modified);
        assert_eq!(
            api.into_planned(),
            [PlannedChange::Modify {
                name: "fn".into(),
                location: "us-east-1".into(),
                changes: vec![Change {
                    field: "timeout",
                    from: "3".into(),
                    to: "10".into(),
                }],
            }]
        );
    }

    #[test]
    fn lookup_is_by_name_and_location() {
        let mut elsewhere = observed("fn");
        elsewhere.location = "eu-west-1".into();

        let mut api = PlanProvider::new(vec![elsewhere]);
        assert_eq!(sync_one(&mut api, &lambda("fn")).unwrap(), SyncAction::Created);
    }

    struct FailingApi;

    impl LambdaApi for FailingApi {
        fn function_info(&self, _: &str, _: &str) -> Result<Option<FunctionInfo>, ProviderError> {
            Ok(None)
        }

        fn create_function(&mut self, function: &Lambda) -> Result<(), ProviderError> {
            Err(ProviderError::Create {
                name: function.name.clone(),
                message: "throttled".into(),
            })
        }

        fn modify_function(&mut self, _: &FunctionInfo, _: &Lambda) -> Result<(), ProviderError> {
            unreachable!("nothing exists")
        }
    }

    #[test]
    fn provider_errors_propagate() {
        let err = sync_one(&mut FailingApi, &lambda("fn")).unwrap_err();
        assert_eq!(
            err,
            ProviderError::Create {
                name: "fn".into(),
                message: "throttled".into()
            }
        );
    }

    #[test]
    fn sync_all_in_order() {
        let mut lambdas = Lambdas::default();
        lambdas.items.insert("b".into(), lambda("b"));
        lambdas.items.insert("a".into(), lambda("a"));

        let mut api = PlanProvider::new(vec![observed("a")]);
        assert_eq!(
            sync_all(&mut api, &lambdas).unwrap(),
            [
                ("b".to_string(), SyncAction::Created),
                ("a".to_string(), SyncAction::Modified)
            ]
        );
    }

    #[test]
    fn observed_state_deserializes() {
        let state: Vec<FunctionInfo> = serde_yaml::from_str(
            "- {name: fn, location: us-east-1, runtime: python, role: r, handler: h, memory_size: 128}",
        )
        .unwrap();
        assert_eq!(state[0].timeout, None);
    }
}
