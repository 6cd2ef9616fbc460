//! `${...}` references inside string values
//!
//! `"${aws_syncr.location}-handler"` is rendered by looking up `aws_syncr.location` in the
//! [ConfigTree](crate::config::ConfigTree). Referenced strings are rendered too, so
//! references may chain. `$${` produces a literal `${`.
//!
//! Strings are parsed as hcl templates, so only plain traversals (`${a.b.c}`) may be
//! interpolated. Functions, operators and directives are rejected.
use super::{filled, Spec};
use crate::errors::{SpecError, SpecResult};
use crate::meta::Meta;
use crate::value::Value;
use hcl::template::{Element, Template};
use hcl::{Expression, TraversalOperator};
use std::str::FromStr;

/// A string (or integer, rendered as string) with references resolved
#[derive(Debug, Clone, Copy)]
pub struct FormattedString;

pub fn formatted_string() -> FormattedString {
    FormattedString
}

impl Spec for FormattedString {
    type Output = String;

    #[tracing::instrument(level = "trace", skip_all, fields(path = %meta))]
    fn normalise(&self, meta: &Meta, val: Option<&Value>) -> SpecResult<String> {
        let template = match filled(meta, val)? {
            Value::String(s) => s,
            Value::Integer(number) => return Ok(number.to_string()),
            other => return Err(meta.invalid("expected a string or integer", other)),
        };

        render(meta, template, &mut vec![])
    }
}

fn render(meta: &Meta, template: &str, stack: &mut Vec<String>) -> SpecResult<String> {
    let parsed = Template::from_str(template)
        .map_err(|err| bad_reference(meta, template, &err.to_string()))?;

    let mut output = String::with_capacity(template.len());
    for element in parsed.elements() {
        match element {
            Element::Literal(literal) => output.push_str(literal),
            Element::Interpolation(interpolation) => {
                let Some(reference) = dotted_path(&interpolation.expr) else {
                    return Err(bad_reference(
                        meta,
                        template,
                        "only references to config keys can be interpolated",
                    ));
                };
                output.push_str(&lookup(meta, &reference, stack)?);
            }
            Element::Directive(_) => {
                return Err(bad_reference(meta, template, "template directives are not supported"));
            }
        }
    }

    Ok(output)
}

/// `a.b.c` for a variable followed by attribute accesses, `None` for any other expression
fn dotted_path(expr: &Expression) -> Option<String> {
    match expr {
        Expression::Variable(variable) => Some(variable.as_str().to_string()),
        Expression::Traversal(traversal) => {
            let mut path = dotted_path(&traversal.expr)?;
            for operator in &traversal.operators {
                let TraversalOperator::GetAttr(key) = operator else {
                    return None;
                };
                path.push('.');
                path.push_str(key.as_str());
            }
            Some(path)
        }
        _ => None,
    }
}

fn lookup(meta: &Meta, reference: &str, stack: &mut Vec<String>) -> SpecResult<String> {
    if stack.iter().any(|seen| seen == reference) {
        return Err(bad_reference(
            meta,
            reference,
            &format!("reference loop via {}", stack.join(" -> ")),
        ));
    }

    let Some(value) = meta.everything().get(reference) else {
        return Err(bad_reference(meta, reference, "no such key"));
    };

    match value {
        Value::String(nested) => {
            stack.push(reference.to_string());
            let rendered = render(meta, nested, stack);
            stack.pop();
            rendered
        }
        other => other
            .as_scalar_string()
            .ok_or_else(|| bad_reference(meta, reference, &format!("can't format {}", other.type_name()))),
    }
}

fn bad_reference(meta: &Meta, reference: &str, message: &str) -> SpecError {
    SpecError::BadReference {
        path: meta.path(),
        reference: reference.to_string(),
        message: message.to_string(),
    }
}
