//! lambda function definitions
//!
//! The `lambda` section maps function names to their definition:
//!
//! ```yaml
//! lambda:
//!   resize-images:
//!     use: python-defaults        # optional, merged underneath (see `templates`)
//!     role: {iam: role/image-resizer}
//!     runtime: python
//!     location: "${aws_syncr.location}"
//!     code:
//!       directory: {directory: ./resize, exclude: ["*.pyc"]}
//!     memory_size: 256            # multiple of 64, defaults to 128
//!     timeout: 30
//! ```
//!
//! `handler` may be omitted for the `python` and `nodejs` runtimes.
use crate::errors::{SpecError, SpecResult};
use crate::meta::Meta;
use crate::resources::{ResourceKind, ResourceSpec, SelfContext};
use crate::spec::{
    defaulted, directory, divisible_by, filled, formatted_string, integer, list_of, only_one,
    optional, overridden, required, string, string_choice, Spec,
};
use crate::value::Value;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;

pub const SECTION: &str = "lambda";

const CODE_SOURCES: &[&str] = &["s3", "inline", "directory"];
const DEFAULT_RUNTIME: &str = "python";
const ROLE_TYPES: &[ResourceKind] = &[ResourceKind::Iam];

/// All functions of the `lambda` section, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Lambdas {
    pub items: IndexMap<String, Lambda>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lambda {
    /// Alias of the function
    pub name: String,
    /// The role assumed by the function
    pub role: String,
    pub code: LambdaCode,
    /// Function within the code that gets executed
    pub handler: String,
    /// Max execution time in seconds
    pub timeout: Option<i64>,
    pub runtime: String,
    /// The region the function lives in
    pub location: String,
    pub description: Option<String>,
    /// A sample event to test with
    pub sample_event: Option<String>,
    /// Max memory in MB
    pub memory_size: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LambdaCode {
    S3(S3Code),
    Inline(InlineCode),
    Directory(DirectoryCode),
}

impl LambdaCode {
    pub fn s3_address(&self) -> Option<String> {
        match self {
            LambdaCode::S3(code) => Some(code.s3_address()),
            LambdaCode::Inline(_) | LambdaCode::Directory(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct S3Code {
    pub key: String,
    pub bucket: String,
    pub version: Option<String>,
}

impl S3Code {
    pub fn s3_address(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineCode {
    pub code: String,
    pub runtime: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryCode {
    pub directory: PathBuf,
    pub exclude: Vec<String>,
}

/// The `runtime` declared next to the field being normalised
#[derive(Debug, Clone)]
struct SiblingRuntime<'a> {
    function: Meta<'a>,
    declared: Option<&'a Value>,
}

impl SiblingRuntime<'_> {
    fn effective(&self) -> SpecResult<String> {
        match self.declared {
            Some(runtime) => formatted_string().normalise(&self.function.at("runtime"), Some(runtime)),
            None => Ok(DEFAULT_RUNTIME.to_string()),
        }
    }
}

/// `handler`, defaulted from the runtime when absent
struct FunctionHandlerSpec<'a> {
    runtime: SiblingRuntime<'a>,
}

impl Spec for FunctionHandlerSpec<'_> {
    type Output = String;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<String> {
        if val.is_some() {
            return formatted_string().normalise(meta, val);
        }

        match self.runtime.effective()?.as_str() {
            "nodejs" => Ok("index.handler".to_string()),
            "python" => Ok("lambda_function.lambda_handler".to_string()),
            // java (and everything else) has no conventional entry point
            runtime => Err(SpecError::NoDefaultHandler {
                path: meta.path(),
                runtime: runtime.to_string(),
            }),
        }
    }
}

/// `code`: exactly one of `s3`, `inline` or `directory`
struct FunctionCodeSpec<'a> {
    runtime: SiblingRuntime<'a>,
}

impl Spec for FunctionCodeSpec<'_> {
    type Output = LambdaCode;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<LambdaCode> {
        let val = filled(meta, val)?;
        let Some(declared) = val.as_object() else {
            return Err(meta.invalid("expected a mapping with one of s3, inline or directory", val));
        };

        for source in declared.keys() {
            string_choice(CODE_SOURCES).normalise(meta, Some(&source.as_str().into()))?;
        }

        let mut sources = declared.iter();
        let (source, code) = match (sources.next(), sources.next()) {
            (Some(only), None) => only,
            (None, _) => {
                return Err(SpecError::InvalidCode {
                    path: meta.path(),
                    message: "specify one of s3, inline, or directory for your code".to_string(),
                });
            }
            (Some(_), Some(_)) => {
                return Err(SpecError::InvalidCode {
                    path: meta.path(),
                    message: format!(
                        "only specify one of s3, inline, or directory for your code (got {:?})",
                        declared.keys().collect::<Vec<_>>()
                    ),
                });
            }
        };

        let meta = meta.at(source.as_str());
        match source.as_str() {
            "s3" => self.s3(&meta, code).map(LambdaCode::S3),
            "inline" => Ok(LambdaCode::Inline(InlineCode {
                code: string().normalise(&meta, Some(code))?,
                runtime: self.runtime.effective()?,
            })),
            _ => Self::directory(&meta, code).map(LambdaCode::Directory),
        }
    }
}

impl FunctionCodeSpec<'_> {
    fn s3(&self, meta: &Meta, code: &Value) -> SpecResult<S3Code> {
        let Some(fields) = code.as_object() else {
            return Err(meta.invalid("expected a mapping with key, bucket and version", code));
        };

        Ok(S3Code {
            key: required(formatted_string()).normalise(&meta.at("key"), fields.get("key"))?,
            bucket: required(formatted_string())
                .normalise(&meta.at("bucket"), fields.get("bucket"))?,
            version: optional(string()).normalise(&meta.at("version"), fields.get("version"))?,
        })
    }

    fn directory(meta: &Meta, code: &Value) -> SpecResult<DirectoryCode> {
        match code {
            Value::String(_) => Ok(DirectoryCode {
                directory: directory().normalise(meta, Some(code))?,
                exclude: vec![],
            }),
            Value::Object(fields) => Ok(DirectoryCode {
                directory: required(directory())
                    .normalise(&meta.at("directory"), fields.get("directory"))?,
                exclude: list_of(string()).normalise(&meta.at("exclude"), fields.get("exclude"))?,
            }),
            other => Err(meta.invalid("expected a directory or a mapping with directory and exclude", other)),
        }
    }
}

/// A single function definition, keyed by `function_name`
#[derive(Debug, Clone, derive_new::new)]
pub struct LambdaSpec {
    #[new(into)]
    function_name: String,
}

impl LambdaSpec {
    /// Merge the definition over the template named by `use`
    fn with_template(&self, meta: &Meta, template: &Value, val: &Value) -> SpecResult<Value> {
        let wanted = string().normalise(&meta.at("use"), Some(template))?;
        let templates = meta.everything().templates();

        let Some(template) = templates.and_then(|templates| templates.get(&wanted)) else {
            return Err(SpecError::UnknownTemplate {
                path: meta.path(),
                wanted,
                available: templates
                    .map(|templates| templates.keys().cloned().collect())
                    .unwrap_or_default(),
            });
        };

        tracing::debug!(function = %self.function_name, template = %wanted, "using template");
        Ok(template.clone().merged_with(val.clone()))
    }
}

impl Spec for LambdaSpec {
    type Output = Lambda;

    #[tracing::instrument(level = "trace", skip_all, fields(function = %self.function_name))]
    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<Lambda> {
        let val = filled(meta, val)?;
        let merged;
        let val = match val.get("use") {
            Some(template) => {
                merged = self.with_template(meta, template, val)?;
                &merged
            }
            None => val,
        };

        let Some(fields) = val.as_object() else {
            return Err(meta.invalid("expected a mapping", val));
        };
        let field = |name: &str| (meta.at(name), fields.get(name));

        let runtime = SiblingRuntime {
            function: meta.clone(),
            declared: fields.get("runtime"),
        };

        let role = required(only_one(ResourceSpec::new(
            SelfContext::new("lambda", self.function_name.as_str()),
            Some(ROLE_TYPES),
        )));

        let (m, v) = field("name");
        let name = overridden(self.function_name.clone()).normalise(&m, v)?;
        let (m, v) = field("role");
        let role = role.normalise(&m, v)?;
        let (m, v) = field("code");
        let code = required(FunctionCodeSpec {
            runtime: runtime.clone(),
        })
        .normalise(&m, v)?;
        let (m, v) = field("handler");
        let handler = FunctionHandlerSpec { runtime }.normalise(&m, v)?;
        let (m, v) = field("timeout");
        let timeout = optional(integer()).normalise(&m, v)?;
        let (m, v) = field("runtime");
        let runtime = required(formatted_string()).normalise(&m, v)?;
        let (m, v) = field("location");
        let location = required(formatted_string()).normalise(&m, v)?;
        let (m, v) = field("description");
        let description = optional(formatted_string()).normalise(&m, v)?;
        let (m, v) = field("sample_event");
        let sample_event = optional(string()).normalise(&m, v)?;
        let (m, v) = field("memory_size");
        let memory_size = defaulted(divisible_by(64), 128).normalise(&m, v)?;

        Ok(Lambda {
            name,
            role,
            code,
            handler,
            timeout,
            runtime,
            location,
            description,
            sample_event,
            memory_size,
        })
    }
}

/// The whole `lambda` section
#[derive(Debug, Clone, Copy, Default)]
pub struct LambdasSpec;

impl Spec for LambdasSpec {
    type Output = Lambdas;

    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<Lambdas> {
        let Some(val) = val else {
            return Ok(Lambdas::default());
        };
        let Some(functions) = val.as_object() else {
            return Err(meta.invalid("expected a mapping of function name to function", val));
        };

        let items = functions
            .iter()
            .map(|(name, function)| {
                LambdaSpec::new(name.as_str())
                    .normalise(&meta.at(name.as_str()), Some(function))
                    .map(|lambda| (name.clone(), lambda))
            })
            .collect::<SpecResult<_>>()?;

        Ok(Lambdas { items })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::ConfigTree;
    use crate::config_tree;
    use pretty_assertions::assert_eq;

    fn tree() -> ConfigTree {
        config_tree!(
            r#"
accounts:
  dev: "111111111111"
  prod: "333333333333"
aws_syncr:
  environment: dev
  location: ap-southeast-2
templates:
  base:
    runtime: python
    timeout: 30
    location: "${aws_syncr.location}"
    role: {iam: role/lambda-base}
  java:
    runtime: java
"#
        )
    }

    fn normalise(function: &str) -> SpecResult<Lambda> {
        let tree = tree();
        let meta = Meta::new(&tree).at(SECTION).at("fn");
        let function: Value = serde_yaml::from_str(function).expect("valid yaml");
        LambdaSpec::new("fn").normalise(&meta, Some(&function))
    }

    const MINIMAL: &str = r#"
role: {iam: role/fn}
runtime: python
location: us-east-1
code: {inline: "def handler(event, context): pass"}
"#;

    #[test]
    fn minimal_function() {
        assert_eq!(
            normalise(MINIMAL).unwrap(),
            Lambda {
                name: "fn".into(),
                role: "arn:aws:iam::111111111111:role/fn".into(),
                code: LambdaCode::Inline(InlineCode {
                    code: "def handler(event, context): pass".into(),
                    runtime: "python".into(),
                }),
                handler: "lambda_function.lambda_handler".into(),
                timeout: None,
                runtime: "python".into(),
                location: "us-east-1".into(),
                description: None,
                sample_event: None,
                memory_size: 128,
            }
        );
    }

    #[test]
    fn template_merge() {
        let lambda = normalise("use: base\ntimeout: 10\ncode: {s3: {key: fn.zip, bucket: code}}").unwrap();
        assert_eq!(lambda.timeout, Some(10));
        assert_eq!(lambda.runtime, "python");
        assert_eq!(lambda.location, "ap-southeast-2");
        assert_eq!(lambda.role, "arn:aws:iam::111111111111:role/lambda-base");
        assert_eq!(lambda.code.s3_address().as_deref(), Some("s3://code/fn.zip"));
    }

    #[test]
    fn unknown_template() {
        let err = normalise("use: nope").unwrap_err();
        assert_eq!(
            err,
            SpecError::UnknownTemplate {
                path: "lambda.fn".into(),
                wanted: "nope".into(),
                available: vec!["base".into(), "java".into()],
            }
        );
    }

    #[test]
    fn default_handlers() {
        let nodejs = MINIMAL.replace("runtime: python", "runtime: nodejs");
        let lambda = normalise(&nodejs).unwrap();
        assert_eq!(lambda.handler, "index.handler");
        assert_eq!(
            lambda.code,
            LambdaCode::Inline(InlineCode {
                code: "def handler(event, context): pass".into(),
                runtime: "nodejs".into(),
            })
        );

        let err = normalise(&MINIMAL.replace("runtime: python", "runtime: java")).unwrap_err();
        assert_eq!(
            err,
            SpecError::NoDefaultHandler {
                path: "lambda.fn.handler".into(),
                runtime: "java".into()
            }
        );

        let err = normalise(&MINIMAL.replace("runtime: python", "runtime: go")).unwrap_err();
        assert!(matches!(err, SpecError::NoDefaultHandler { runtime, .. } if runtime == "go"));
    }

    #[test]
    fn explicit_handler_is_formatted() {
        let java = "use: java\nhandler: \"${aws_syncr.environment}.Handler::handle\"";
        let lambda = normalise(&format!("{MINIMAL}\n{java}").replace("runtime: python\n", ""))
            .unwrap();
        assert_eq!(lambda.handler, "dev.Handler::handle");
        assert_eq!(lambda.runtime, "java");
    }

    #[test]
    fn memory_size() {
        assert_eq!(normalise(&format!("{MINIMAL}memory_size: 256")).unwrap().memory_size, 256);

        let err = normalise(&format!("{MINIMAL}memory_size: 200")).unwrap_err();
        assert!(
            matches!(err, SpecError::InvalidValue { path, .. } if path == "lambda.fn.memory_size")
        );
    }

    #[test]
    fn role_must_be_exactly_one_iam_arn() {
        let err = normalise(&MINIMAL.replace("{iam: role/fn}", "{iam: role/fn, account: [dev, prod]}"))
            .unwrap_err();
        assert!(matches!(err, SpecError::InvalidValue { path, .. } if path == "lambda.fn.role"));

        let err = normalise(&MINIMAL.replace("{iam: role/fn}", "{s3: bucket}")).unwrap_err();
        assert!(matches!(err, SpecError::UnsupportedResourceType { .. }));

        let err = normalise(&MINIMAL.replace("role: {iam: role/fn}\n", "")).unwrap_err();
        assert!(matches!(err, SpecError::MissingField { path, .. } if path == "lambda.fn.role"));
    }

    #[test]
    fn literal_role() {
        let lambda =
            normalise(&MINIMAL.replace("{iam: role/fn}", "\"arn:aws:iam::1:role/x\"")).unwrap();
        assert_eq!(lambda.role, "arn:aws:iam::1:role/x");
    }

    #[test]
    fn ambiguous_code() {
        let err = normalise(&MINIMAL.replace(
            "code: {inline: \"def handler(event, context): pass\"}",
            "code: {inline: x, s3: {key: k, bucket: b}}",
        ))
        .unwrap_err();
        assert!(matches!(err, SpecError::InvalidCode { path, .. } if path == "lambda.fn.code"));

        let err = normalise(&MINIMAL.replace(
            "code: {inline: \"def handler(event, context): pass\"}",
            "code: {}",
        ))
        .unwrap_err();
        assert!(matches!(err, SpecError::InvalidCode { .. }));

        let err = normalise(&MINIMAL.replace(
            "code: {inline: \"def handler(event, context): pass\"}",
            "code: {zip: x}",
        ))
        .unwrap_err();
        assert!(matches!(err, SpecError::InvalidValue { .. }));
    }

    #[test]
    fn s3_code() {
        let lambda = normalise(&MINIMAL.replace(
            "code: {inline: \"def handler(event, context): pass\"}",
            "code: {s3: {key: \"${aws_syncr.environment}/fn.zip\", bucket: code, version: v3}}",
        ))
        .unwrap();
        assert_eq!(
            lambda.code,
            LambdaCode::S3(S3Code {
                key: "dev/fn.zip".into(),
                bucket: "code".into(),
                version: Some("v3".into()),
            })
        );

        let err = normalise(&MINIMAL.replace(
            "code: {inline: \"def handler(event, context): pass\"}",
            "code: {s3: {key: fn.zip}}",
        ))
        .unwrap_err();
        assert!(matches!(err, SpecError::MissingField { path, .. } if path == "lambda.fn.code.s3.bucket"));
    }

    #[test]
    fn directory_code() {
        let here = env!("CARGO_MANIFEST_DIR");
        let inline = "code: {inline: \"def handler(event, context): pass\"}";

        let lambda = normalise(&MINIMAL.replace(inline, &format!("code: {{directory: \"{here}\"}}")))
            .unwrap();
        assert_eq!(
            lambda.code,
            LambdaCode::Directory(DirectoryCode {
                directory: here.into(),
                exclude: vec![],
            })
        );

        let lambda = normalise(&MINIMAL.replace(
            inline,
            &format!("code: {{directory: {{directory: \"{here}\", exclude: [target]}}}}"),
        ))
        .unwrap();
        assert_eq!(
            lambda.code,
            LambdaCode::Directory(DirectoryCode {
                directory: here.into(),
                exclude: vec!["target".into()],
            })
        );
    }

    #[test]
    fn section_keeps_declaration_order() {
        let tree = tree();
        let meta = Meta::new(&tree).at(SECTION);
        let section: Value = serde_yaml::from_str(
            "zeta: {use: base, code: {inline: x}}\nalpha: {use: base, code: {inline: y}}",
        )
        .unwrap();

        let lambdas = LambdasSpec.normalise(&meta, Some(&section)).unwrap();
        assert_eq!(lambdas.items.keys().collect::<Vec<_>>(), ["zeta", "alpha"]);
        assert_eq!(lambdas.items["alpha"].name, "alpha");
    }
}
