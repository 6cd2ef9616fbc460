//! collection of configuration documents (parsed [Value] and path to source file)
//!
//! [ConfigDocuments] tracks the source path of every document and merges them into one
//! [ConfigTree] in the order they were added. Later documents win, mappings merge recursively.
//!
//! Supported formats, by file extension:
//! - `.yml`, `.yaml`
//! - `.json`
//! - `.hcl`
use crate::config::ConfigTree;
use crate::value::{Object, Value};
use std::path::{Path, PathBuf};

#[derive(Default, Debug)]
pub struct ConfigDocuments {
    documents: Vec<(Source, Object)>,
}

impl ConfigDocuments {
    pub fn insert(&mut self, document: Object, path: impl Into<Source>) {
        self.documents.push((path.into(), document));
    }

    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.documents.iter().map(|(source, _)| source)
    }

    pub fn source_count(&self) -> usize {
        self.documents.len()
    }

    /// Everything merged into one tree
    pub fn merged(&self) -> ConfigTree {
        let merged = self
            .documents
            .iter()
            .fold(Value::Object(Object::new()), |merged, (_, document)| {
                merged.merged_with(Value::Object(document.clone()))
            });

        match merged {
            Value::Object(root) => ConfigTree::new(root),
            _ => unreachable!("merging objects always yields an object"),
        }
    }
}

impl ConfigDocuments {
    pub fn load_file(&mut self, file_path: &Path) -> Result<(), LoadError> {
        let file_path = file_path.canonicalize()?;
        tracing::info!(path=%file_path.display(), "loading file");

        let format = Format::of(&file_path).ok_or_else(|| LoadError::UnknownFormat(file_path.clone()))?;
        let file_contents = std::fs::read_to_string(&file_path)?;
        let value = format.parse(&file_contents)?;

        let Value::Object(document) = value else {
            return Err(LoadError::NotAMapping(file_path));
        };

        self.insert(document, Some(file_path));
        Ok(())
    }

    /// Load every supported file of a directory, sorted by file name
    pub fn load_directory(&mut self, dir_path: &Path) -> Result<(), LoadError> {
        let mut file_paths = vec![];

        for dir_entry in std::fs::read_dir(dir_path)? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }

            let file_path = dir_entry.path();
            if Format::of(&file_path).is_some() {
                file_paths.push(file_path);
            }
        }

        if file_paths.is_empty() {
            return Err(LoadError::NoFilesFound);
        }

        file_paths.sort();
        for file_path in file_paths {
            self.load_file(&file_path)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Format {
    Yaml,
    Json,
    Hcl,
}

impl Format {
    pub fn of(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yml" | "yaml" => Some(Format::Yaml),
            "json" => Some(Format::Json),
            "hcl" => Some(Format::Hcl),
            _ => None,
        }
    }

    pub fn parse(self, input: &str) -> Result<Value, LoadError> {
        Ok(match self {
            Format::Yaml => serde_yaml::from_str(input)?,
            Format::Json => serde_json::from_str(input)?,
            Format::Hcl => hcl::from_str(input)?,
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("No files found in directory")]
    NoFilesFound,
    #[error("Unsupported file type: {}", .0.display())]
    UnknownFormat(PathBuf),
    #[error("Document is not a mapping: {}", .0.display())]
    NotAMapping(PathBuf),
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse yaml file")]
    YamlParseFailed(#[from] serde_yaml::Error),
    #[error("Unable to parse json file")]
    JsonParseFailed(#[from] serde_json::Error),
    #[error("Unable to parse hcl file")]
    HclParseFailed(#[from] hcl::Error),
}

pub type Source = Option<PathBuf>;
