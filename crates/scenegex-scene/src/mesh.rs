//! Triangulated mesh snapshot records
//!
//! Meshes are captured already triangulated, with per-loop attribute
//! tables. A loop is one corner of one triangle; colors and UVs are indexed
//! by loop, positions and normals by vertex.

use scenegex_core::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::anim::AnimationCurve;

/// A single deformation weight: the vertex group slot it belongs to and
/// its raw (unnormalized) weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexGroupWeight {
    pub group: usize,
    pub weight: f32,
}

/// One triangle of the captured mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// Vertex indices into the mesh vertex tables.
    pub vertices: [u32; 3],
    /// Loop indices into the per-loop attribute tables.
    pub loops: [u32; 3],
    #[serde(default)]
    pub material_index: usize,
    /// Smooth-shaded triangles take per-vertex normals, flat ones take the
    /// face normal.
    #[serde(default)]
    pub smooth: bool,
    /// Face normal, used for flat shading and for flat morph targets.
    pub normal: Vec3,
}

/// One shape key block: a full alternative position table plus the normals
/// evaluated with only this key active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeKeyBlock {
    pub name: String,
    /// Current weight of the key.
    #[serde(default)]
    pub value: f32,
    pub positions: Vec<Vec3>,
    /// Per-vertex normals of the morphed mesh.
    pub vertex_normals: Vec<Vec3>,
    /// Per-triangle face normals of the morphed mesh.
    pub face_normals: Vec<Vec3>,
    /// Curves animating this key's weight, if any.
    #[serde(default)]
    pub curves: Vec<AnimationCurve>,
}

/// Shape key (morph target) set of a mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeKeys {
    /// Relative keys morph against a base key; absolute keys form a
    /// sequence.
    #[serde(default)]
    pub relative: bool,
    /// Index of the base (reference) block for relative keys.
    #[serde(default)]
    pub reference_key: usize,
    pub blocks: Vec<ShapeKeyBlock>,
}

/// A triangulated mesh snapshot. Vertex-indexed tables (`positions`,
/// `normals`, `group_weights`) have one entry per vertex; `colors` and each
/// UV layer have one entry per loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub triangles: Vec<Triangle>,
    /// Deformation weights per vertex, possibly empty per entry.
    #[serde(default)]
    pub group_weights: Vec<Vec<VertexGroupWeight>>,
    /// Per-loop colors of the first color layer, empty when the mesh has
    /// no color layers.
    #[serde(default)]
    pub colors: Vec<Vec3>,
    /// Per-loop UV coordinates, outer index is the layer. Only the first
    /// two layers are exported.
    #[serde(default)]
    pub uv_layers: Vec<Vec<Vec2>>,
    #[serde(default)]
    pub shape_keys: Option<ShapeKeys>,
}

impl Mesh {
    /// Highest material index referenced by any triangle, 0 for an empty
    /// mesh.
    pub fn max_material_index(&self) -> usize {
        self.triangles
            .iter()
            .map(|t| t.material_index)
            .max()
            .unwrap_or(0)
    }
}
