//! Session cache of parsed definitions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, trace};

use crate::definition::MultibodyDefinition;
use crate::error::{DefinitionError, Result};
use crate::mesh::{MeshCache, MeshLoader, ObjMeshLoader};
use crate::parser::{parse_definition, ParseContext};

/// Parsed definitions keyed by source, plus the resources parsing needs: the
/// mesh cache, the mesh loader and the session random source.
///
/// A definition is parsed once per distinct source. Entities hold an `Arc`
/// to the canonical blueprint and keep their own runtime state.
pub struct MultibodyEntityDatabase {
    definitions: HashMap<PathBuf, Arc<MultibodyDefinition>>,
    meshes: MeshCache,
    loader: Box<dyn MeshLoader>,
    rng: StdRng,
}

impl Default for MultibodyEntityDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MultibodyEntityDatabase {
    /// Create a database with an OBJ loader and an entropy-seeded random source.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a database with a reproducible random source.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            definitions: HashMap::new(),
            meshes: MeshCache::new(),
            loader: Box::new(ObjMeshLoader),
            rng,
        }
    }

    /// Replace the mesh loader.
    pub fn with_loader(mut self, loader: impl MeshLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Definition for a file, parsing it on first request.
    ///
    /// Failures are not cached.
    pub fn get_model(&mut self, path: impl AsRef<Path>) -> Result<Arc<MultibodyDefinition>> {
        let path = path.as_ref();
        if let Some(definition) = self.definitions.get(path) {
            trace!("Definition cache hit: {:?}", path);
            return Ok(Arc::clone(definition));
        }

        let file = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            file: file.clone(),
            source,
        })?;
        self.parse_and_store(path.to_path_buf(), &source, &file, path.parent())
    }

    /// Definition for an in-memory document, cached under `source_name`.
    /// Relative mesh paths are resolved against the working directory.
    pub fn parse_str(&mut self, source_name: &str, source: &str) -> Result<Arc<MultibodyDefinition>> {
        let key = PathBuf::from(source_name);
        if let Some(definition) = self.definitions.get(&key) {
            trace!("Definition cache hit: {}", source_name);
            return Ok(Arc::clone(definition));
        }
        self.parse_and_store(key, source, source_name, None)
    }

    fn parse_and_store(
        &mut self,
        key: PathBuf,
        source: &str,
        file: &str,
        base_dir: Option<&Path>,
    ) -> Result<Arc<MultibodyDefinition>> {
        let definition = parse_definition(
            source,
            file,
            ParseContext {
                base_dir,
                meshes: &mut self.meshes,
                loader: &*self.loader,
                rng: &mut self.rng,
            },
        )?;
        info!(
            "Loaded definition {} from {} ({} links, {} joints)",
            definition.name(),
            file,
            definition.links().len(),
            definition.joints().len()
        );
        let definition = Arc::new(definition);
        self.definitions.insert(key, Arc::clone(&definition));
        Ok(definition)
    }

    /// Whether a source has been parsed.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.definitions.contains_key(path.as_ref())
    }

    /// Number of cached definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether nothing has been parsed.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Session mesh cache.
    pub fn meshes(&self) -> &MeshCache {
        &self.meshes
    }

    /// Session random source.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}
