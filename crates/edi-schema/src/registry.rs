//! Registry of compiled mapping models keyed by message lookup name
//!
//! The registry is built once and then only read, so a single instance
//! can be shared between concurrent parses behind an `Arc`.

use crate::archive;
use crate::delimiters::Delimiters;
use crate::loader::MappingLoader;
use crate::model::{EdifactModel, Edimap};
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Immutable set of mapping models
#[derive(Debug, Clone, Default)]
pub struct MappingsRegistry {
    models: HashMap<String, Arc<EdifactModel>>,
}

impl MappingsRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from already compiled models
    ///
    /// # Errors
    ///
    /// Returns `DuplicateModel` when two models share a lookup name.
    pub fn from_models(models: impl IntoIterator<Item = EdifactModel>) -> Result<Self> {
        let mut registry = Self::new();
        for model in models {
            registry.insert(model)?;
        }
        Ok(registry)
    }

    /// Load every `.json`, `.yaml` and `.yml` document in a directory.
    /// Documents without a description or without a root xmltag are import
    /// libraries and are not registered themselves.
    ///
    /// # Errors
    ///
    /// Any load error (including import cycles) fails the whole registry.
    pub fn from_directory(dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && matches!(
                        path.extension().and_then(|e| e.to_str()),
                        Some("json" | "yaml" | "yml")
                    )
            })
            .collect();
        paths.sort();

        let mut loader = MappingLoader::new();
        let mut registry = Self::new();
        for path in paths {
            let edimap = loader.load_file(&path)?;
            if !is_message(&edimap) {
                debug!("{} describes no message, treating it as a library", path.display());
                continue;
            }
            registry.insert(EdifactModel::new(edimap))?;
        }
        info!("Loaded {} mapping model(s) from {}", registry.len(), dir.display());
        Ok(registry)
    }

    /// Load exactly the listed documents, each of which must describe a message
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` for a listed document without a description
    /// or root xmltag, plus any load error.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut loader = MappingLoader::new();
        let mut registry = Self::new();
        for path in paths {
            let path = path.as_ref();
            let edimap = loader.load_file(path)?;
            registry.insert(message_model(edimap, path)?)?;
        }
        Ok(registry)
    }

    /// Extract a mapping archive into `extract_dir` and load the models its
    /// manifest lists
    ///
    /// # Errors
    ///
    /// Returns `Archive` for unreadable archives, plus any load error.
    pub fn from_archive(archive: &Path, extract_dir: &Path) -> Result<Self> {
        let listed = archive::extract(archive, extract_dir)?;
        let registry = Self::from_files(&listed)?;
        info!("Loaded {} mapping model(s) from archive {}", registry.len(), archive.display());
        Ok(registry)
    }

    fn insert(&mut self, model: EdifactModel) -> Result<()> {
        let name = model.lookup_name();
        if self.models.contains_key(&name) {
            return Err(Error::DuplicateModel(name));
        }
        debug!("Registered mapping model {}", name);
        self.models.insert(name, Arc::new(model));
        Ok(())
    }

    /// Find the model for a message and check that it can be used with the
    /// delimiters currently in force
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown name and `IncompatibleDelimiters`
    /// when the model was written for different separators.
    pub fn resolve(&self, name: &str, active: &Delimiters) -> Result<Arc<EdifactModel>> {
        let model = self
            .models
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        if let Some(expected) = model.delimiters() {
            if !expected.is_compatible_with(active) {
                return Err(Error::IncompatibleDelimiters {
                    model: name.to_string(),
                    expected: Box::new(*expected),
                    actual: Box::new(*active),
                });
            }
        }
        Ok(Arc::clone(model))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<EdifactModel>> {
        self.models.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Registered lookup names, sorted
    #[must_use]
    pub fn message_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.keys().cloned().collect();
        names.sort();
        names
    }
}

fn is_message(edimap: &Edimap) -> bool {
    !edimap.description.name.is_empty() && !edimap.segments.xmltag.is_empty()
}

fn message_model(edimap: Edimap, path: &Path) -> Result<EdifactModel> {
    if edimap.description.name.is_empty() {
        return Err(Error::invalid(
            path.display().to_string(),
            "listed mapping document has no description",
        ));
    }
    if edimap.segments.xmltag.is_empty() {
        return Err(Error::invalid(
            path.display().to_string(),
            "root segments element needs an xmltag",
        ));
    }
    Ok(EdifactModel::new(edimap))
}
