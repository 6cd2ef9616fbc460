//! config sections and the specs that normalise them
use crate::config::ConfigTree;
use crate::errors::SpecResult;
use crate::lambda::{self, Lambdas, LambdasSpec};
use crate::meta::Meta;
use crate::spec::Spec;
use crate::value::Value;
use indexmap::IndexMap;
use serde::Serialize;

/// A normalised top level section
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Lambda(Lambdas),
}

pub type SectionSpec = fn(&Meta, &Value) -> SpecResult<Section>;

/// Section key -> container spec, in processing order
pub fn register() -> IndexMap<&'static str, SectionSpec> {
    let mut registry: IndexMap<&'static str, SectionSpec> = IndexMap::new();
    registry.insert(lambda::SECTION, lambda_section);
    registry
}

fn lambda_section(meta: &Meta, val: &Value) -> SpecResult<Section> {
    LambdasSpec.normalise(meta, Some(val)).map(Section::Lambda)
}

/// Normalise every registered section present in `tree`
///
/// Stops at the first error.
pub fn normalise_all(tree: &ConfigTree) -> SpecResult<Vec<Section>> {
    let meta = Meta::new(tree);
    let mut sections = vec![];

    for (key, spec) in register() {
        let Some(val) = tree.get(key) else {
            tracing::debug!(section = key, "section not present");
            continue;
        };

        tracing::debug!(section = key, "normalising section");
        sections.push(spec(&meta.at(key), val)?);
    }

    Ok(sections)
}
