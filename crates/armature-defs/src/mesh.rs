//! Mesh loading and the per-session mesh cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nalgebra::{Point3, Vector3};
use tracing::{debug, info, trace, warn};

/// Errors that can occur during mesh loading.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// OBJ parser error.
    #[error("OBJ loading error: {0}")]
    ObjLoad(#[from] tobj::LoadError),

    /// The file extension is not handled by the loader.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The file parsed but contained no geometry.
    #[error("No mesh data found in file")]
    NoMeshData,
}

/// RGBA8 texture pixels, rows bottom to top.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

/// One drawable piece of a mesh file.
#[derive(Debug, Clone, Default)]
pub struct SubMesh {
    /// Name of the object in the file.
    pub name: String,
    /// Flat xyz positions.
    pub vertices: Vec<f32>,
    /// Triangle indices into `vertices`.
    pub indices: Vec<u32>,
    /// Flat uv coordinates, empty if the file has none.
    pub uvs: Vec<f32>,
    /// Diffuse texture, if the material names one that could be read.
    pub texture: Option<Texture>,
}

impl SubMesh {
    /// Vertex positions as points.
    pub fn points(&self) -> impl Iterator<Item = Point3<f32>> + '_ {
        self.vertices
            .chunks_exact(3)
            .map(|v| Point3::new(v[0], v[1], v[2]))
    }

    /// Axis-aligned bounds `(min, max)`, `None` for an empty sub-mesh.
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let mut points = self.points();
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| {
            (min.inf(&p), max.sup(&p))
        }))
    }
}

/// Geometry loaded from one mesh file.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Sub-meshes in file order.
    pub submeshes: Vec<SubMesh>,
}

impl MeshData {
    /// Bounds over all sub-meshes after applying a per-axis scale.
    pub fn scaled_bounds(&self, scale: &Vector3<f32>) -> Option<(Point3<f32>, Point3<f32>)> {
        self.submeshes
            .iter()
            .filter_map(SubMesh::bounds)
            .map(|(min, max)| {
                let a = Point3::from(min.coords.component_mul(scale));
                let b = Point3::from(max.coords.component_mul(scale));
                (a.inf(&b), a.sup(&b))
            })
            .reduce(|(min_a, max_a), (min_b, max_b)| (min_a.inf(&min_b), max_a.sup(&max_b)))
    }
}

/// Loads mesh files into [`MeshData`].
pub trait MeshLoader {
    /// Whether the loader handles this file. The parser rejects anything
    /// unsupported before attempting a load.
    fn supports(&self, path: &Path) -> bool;

    /// Load the file.
    fn load(&self, path: &Path) -> Result<MeshData, MeshError>;
}

/// Wavefront OBJ loader backed by `tobj`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjMeshLoader;

impl MeshLoader for ObjMeshLoader {
    fn supports(&self, path: &Path) -> bool {
        path.extension().and_then(|ext| ext.to_str()) == Some("obj")
    }

    fn load(&self, path: &Path) -> Result<MeshData, MeshError> {
        if !self.supports(path) {
            let ext = path
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or_default();
            return Err(MeshError::UnsupportedFormat(ext.to_string()));
        }
        info!("Loading OBJ file: {:?}", path);

        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )?;

        if models.is_empty() {
            return Err(MeshError::NoMeshData);
        }

        let materials = materials.unwrap_or_else(|e| {
            warn!("Ignoring materials of {:?}: {}", path, e);
            Vec::new()
        });
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let submeshes = models
            .into_iter()
            .map(|model| {
                let texture = model
                    .mesh
                    .material_id
                    .and_then(|id| materials.get(id))
                    .and_then(|material| material.diffuse_texture.as_deref())
                    .and_then(|file| load_texture(&base_dir.join(file)));
                debug!(
                    "Loaded OBJ model '{}' with {} vertices and {} indices",
                    model.name,
                    model.mesh.positions.len() / 3,
                    model.mesh.indices.len()
                );
                SubMesh {
                    name: model.name,
                    vertices: model.mesh.positions,
                    indices: model.mesh.indices,
                    uvs: model.mesh.texcoords,
                    texture,
                }
            })
            .collect();

        Ok(MeshData { submeshes })
    }
}

fn load_texture(path: &Path) -> Option<Texture> {
    match image::open(path) {
        Ok(image) => {
            let rgba = image.flipv().to_rgba8();
            Some(Texture {
                width: rgba.width(),
                height: rgba.height(),
                pixels: rgba.into_raw(),
            })
        }
        Err(e) => {
            warn!("Failed to load texture {:?}: {}", path, e);
            None
        }
    }
}

/// Loaded meshes keyed by file name, so a file shared by several links or
/// definitions is read once.
#[derive(Debug, Default)]
pub struct MeshCache {
    meshes: HashMap<PathBuf, Arc<MeshData>>,
}

impl MeshCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached mesh, loading it on first use.
    pub fn get_or_load(
        &mut self,
        path: &Path,
        loader: &dyn MeshLoader,
    ) -> Result<Arc<MeshData>, MeshError> {
        if let Some(mesh) = self.meshes.get(path) {
            trace!("Mesh cache hit: {:?}", path);
            return Ok(Arc::clone(mesh));
        }
        let mesh = Arc::new(loader.load(path)?);
        self.meshes.insert(path.to_path_buf(), Arc::clone(&mesh));
        Ok(mesh)
    }

    /// Cached mesh for a file, if loaded.
    pub fn get(&self, path: &Path) -> Option<Arc<MeshData>> {
        self.meshes.get(path).cloned()
    }

    /// Number of distinct files loaded.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether nothing has been loaded.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}
