//! Scene snapshot container and validation

use std::io::Read;

use scenegex_core::{Error, Mat4, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::armature::Armature;
use crate::material::Material;
use crate::mesh::Mesh;
use crate::node::{NodeData, NodeId, SceneNode};
use crate::objects::{Camera, Light};

/// Measurement system of the host scene. Imperial scenes scale the
/// exported distance metric by the foot-to-meter factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

/// Playback and unit settings captured with the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    pub frame_start: i32,
    pub frame_end: i32,
    pub fps: f32,
    pub fps_base: f32,
    pub unit_scale: f32,
    pub unit_system: UnitSystem,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            frame_start: 1,
            frame_end: 250,
            fps: 24.0,
            fps_base: 1.0,
            unit_scale: 1.0,
            unit_system: UnitSystem::Metric,
        }
    }
}

impl SceneSettings {
    /// Seconds per frame.
    pub fn frame_time(&self) -> f32 {
        1.0 / (self.fps_base * self.fps)
    }

    /// Scale of the exported distance metric, in meters per scene unit.
    pub fn distance_scale(&self) -> f32 {
        match self.unit_system {
            UnitSystem::Metric => self.unit_scale,
            UnitSystem::Imperial => self.unit_scale * 0.3048,
        }
    }
}

/// An immutable scene snapshot: the node arena plus the object tables
/// nodes reference by index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub roots: Vec<NodeId>,
    pub meshes: Vec<Mesh>,
    pub armatures: Vec<Armature>,
    pub lights: Vec<Light>,
    pub cameras: Vec<Camera>,
    pub materials: Vec<Material>,
    pub settings: SceneSettings,
}

impl Scene {
    /// Read a snapshot from a JSON stream and validate it.
    pub fn from_json(reader: impl Read) -> Result<Self> {
        let scene: Scene = serde_json::from_reader(reader)
            .map_err(|e| Error::invalid_scene(e.to_string()))?;
        scene.validate()?;
        debug!(
            nodes = scene.nodes.len(),
            meshes = scene.meshes.len(),
            "loaded scene snapshot"
        );
        Ok(scene)
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.index()]
    }

    /// Check referential integrity of the arena. Every parent, child, and
    /// object reference must land inside its table, and the snapshot must
    /// have at least one root node.
    pub fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(Error::MissingSceneRoot);
        }
        for &root in &self.roots {
            if root.index() >= self.nodes.len() {
                return Err(Error::DanglingNode {
                    node: "<root list>".into(),
                    index: root.index(),
                });
            }
        }

        for node in &self.nodes {
            let links = node.parent.iter().chain(node.children.iter());
            for &link in links {
                if link.index() >= self.nodes.len() {
                    return Err(Error::DanglingNode {
                        node: node.name.clone(),
                        index: link.index(),
                    });
                }
            }

            let (kind, index, len) = match node.data {
                NodeData::None => continue,
                NodeData::Mesh(i) => ("mesh", i, self.meshes.len()),
                NodeData::Light(i) => ("light", i, self.lights.len()),
                NodeData::Camera(i) => ("camera", i, self.cameras.len()),
                NodeData::Armature(i) => ("armature", i, self.armatures.len()),
            };
            if index >= len {
                return Err(Error::DanglingObject {
                    node: node.name.clone(),
                    kind,
                    index,
                });
            }
            for &slot in &node.material_slots {
                if slot >= self.materials.len() {
                    return Err(Error::DanglingObject {
                        node: node.name.clone(),
                        kind: "material",
                        index: slot,
                    });
                }
            }
        }

        for mesh in &self.meshes {
            self.validate_mesh(mesh)?;
        }
        Ok(())
    }

    fn validate_mesh(&self, mesh: &Mesh) -> Result<()> {
        let bad = |what: &str| {
            Err(Error::invalid_scene(format!(
                "mesh '{}': {what}",
                mesh.name
            )))
        };
        if mesh.normals.len() != mesh.positions.len() {
            return bad("normal count does not match vertex count");
        }
        if !mesh.group_weights.is_empty() && mesh.group_weights.len() != mesh.positions.len() {
            return bad("group weight count does not match vertex count");
        }
        for tri in &mesh.triangles {
            for &v in &tri.vertices {
                if v as usize >= mesh.positions.len() {
                    return bad("triangle references missing vertex");
                }
            }
            for &l in &tri.loops {
                if !mesh.colors.is_empty() && l as usize >= mesh.colors.len() {
                    return bad("triangle references missing color loop");
                }
                for layer in &mesh.uv_layers {
                    if l as usize >= layer.len() {
                        return bad("triangle references missing uv loop");
                    }
                }
            }
        }
        if let Some(keys) = &mesh.shape_keys {
            for block in &keys.blocks {
                if block.positions.len() != mesh.positions.len() {
                    return bad("shape key vertex count does not match mesh");
                }
                if block.vertex_normals.len() != mesh.positions.len() {
                    return bad("shape key vertex normal count does not match mesh");
                }
                if block.face_normals.len() != mesh.triangles.len() {
                    return bad("shape key face normal count does not match triangle count");
                }
            }
        }
        Ok(())
    }

    /// Bake rest transforms into mesh data where it cannot change meaning:
    /// leaf mesh nodes with no animation curves whose mesh is not shared
    /// with another node. Their local matrix becomes the identity.
    pub fn apply_transforms(&mut self) {
        for i in 0..self.nodes.len() {
            let node = &self.nodes[i];
            let NodeData::Mesh(mesh_index) = node.data else {
                continue;
            };
            if !node.children.is_empty() || !node.curves.is_empty() {
                continue;
            }
            let shared = self
                .nodes
                .iter()
                .enumerate()
                .any(|(j, n)| j != i && n.data == NodeData::Mesh(mesh_index));
            if shared {
                continue;
            }

            let matrix = self.nodes[i].rest_matrix;
            let mesh = &mut self.meshes[mesh_index];
            for p in &mut mesh.positions {
                *p = matrix.transform_point(*p);
            }
            for n in &mut mesh.normals {
                *n = matrix.transform_direction(*n).normalized();
            }
            for tri in &mut mesh.triangles {
                tri.normal = matrix.transform_direction(tri.normal).normalized();
            }
            if let Some(keys) = &mut mesh.shape_keys {
                for block in &mut keys.blocks {
                    for p in &mut block.positions {
                        *p = matrix.transform_point(*p);
                    }
                    for n in &mut block.vertex_normals {
                        *n = matrix.transform_direction(*n).normalized();
                    }
                    for n in &mut block.face_normals {
                        *n = matrix.transform_direction(*n).normalized();
                    }
                }
            }
            self.nodes[i].rest_matrix = Mat4::IDENTITY;
            self.nodes[i].transform = Default::default();
        }
    }

    /// Rest-pose world matrix of a node: the product of local rest
    /// matrices up the parent chain.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let node = self.node(id);
        match node.parent {
            Some(parent) => self.world_matrix(parent).mul(&node.rest_matrix),
            None => node.rest_matrix,
        }
    }

    /// First node attached to the given armature table entry, used to
    /// resolve skeleton references from skinned meshes.
    pub fn armature_node(&self, armature: usize) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.data == NodeData::Armature(armature))
            .map(|i| NodeId(i as u32))
    }
}
