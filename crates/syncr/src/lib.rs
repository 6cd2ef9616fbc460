//! # syncr - declarative aws resources
//!
//! Reads configuration documents describing aws resources, normalises them into typed
//! definitions and reconciles those against what a provider reports as deployed.
//!
//! ## Introduction for developers
//!
//! ### Loading documents
//!
//! [documents::ConfigDocuments] loads yaml, json and hcl files and merges them (in load order)
//! into one [config::ConfigTree]. The tree is read-only from then on.
//!
//! ### Normalising
//!
//! Every value is normalised by a [spec::Spec]: a small composable validator that turns a
//! [value::Value] into a typed result. Each spec receives a [meta::Meta] which grants access to
//! the whole tree (for `accounts`, `templates`, `${...}` references, ...) and knows the
//! dotted path of the current value, so every [errors::SpecError] can point at its origin.
//!
//! The first error aborts the whole run, there are no partial results.
//!
//! ### Resource references
//!
//! Policies and roles refer to other resources by ARN. Writing those out is tedious, so
//! references may be shorthand mappings that [resources::ResourceSpec] expands:
//!
//! ```yaml
//! role:
//!   iam: role/deployer
//!   account: [dev, prod]
//! ```
//!
//! becomes
//!
//! | **account** | **ARN**                                   |
//! |-------------|-------------------------------------------|
//! | `dev`       | `arn:aws:iam::<dev id>:role/deployer`     |
//! | `prod`      | `arn:aws:iam::<prod id>:role/deployer`    |
//!
//! Expanded lists are sorted but never deduplicated.
//!
//! ### Sections
//!
//! Top level sections (currently only `lambda`) are listed in [registry::register]. A section's
//! spec produces its typed definitions ([lambda::Lambdas]).
//!
//! ### Reconciling
//!
//! [reconcile::sync_one] asks a [reconcile::LambdaApi] whether a function exists and then
//! creates or modifies it.
//!
pub mod config;
pub mod documents;
pub mod errors;
pub mod lambda;
pub mod meta;
pub mod reconcile;
pub mod registry;
pub mod resources;
pub mod spec;
pub mod value;
