//! Scene traversal and document orchestration
//!
//! Two passes over the node arena. The first pass registers every
//! exportable node (and armature bones) under sequential `nodeN` structure
//! names and records which objects are bone-parented. The second pass
//! emits the node tree; geometry, light, camera, and material structures
//! are registered on first reference during that pass and written out
//! afterwards in first-occurrence order.

use std::collections::HashMap;

use scenegex_core::{Result, EPSILON};
use scenegex_scene::{FrameEvaluator, NodeData, NodeId, Scene};
use tracing::{debug, info};

use crate::writer::OgexWriter;
use crate::ExportOptions;

/// Registry key: either a scene node, or one bone of the armature attached
/// to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum NodeKey {
    Object(NodeId),
    Bone(NodeId, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Plain,
    Bone,
    Geometry,
    Light,
    Camera,
}

impl NodeKind {
    fn struct_identifier(self) -> &'static str {
        match self {
            NodeKind::Plain => "Node $",
            NodeKind::Bone => "BoneNode $",
            NodeKind::Geometry => "GeometryNode $",
            NodeKind::Light => "LightNode $",
            NodeKind::Camera => "CameraNode $",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeRef {
    pub(crate) kind: NodeKind,
    pub(crate) struct_name: String,
}

/// A referenced object (mesh, light, camera) with the nodes that use it.
#[derive(Debug, Clone)]
pub(crate) struct ObjectEntry {
    pub(crate) object: usize,
    pub(crate) struct_name: String,
    pub(crate) nodes: Vec<NodeId>,
}

/// Drives one export run. All registries live only for this run.
pub struct Exporter<'a, E: FrameEvaluator> {
    pub(crate) scene: &'a Scene,
    pub(crate) evaluator: &'a E,
    pub(crate) options: &'a ExportOptions,
    pub(crate) writer: OgexWriter,

    pub(crate) nodes: Vec<(NodeKey, NodeRef)>,
    pub(crate) geometries: Vec<ObjectEntry>,
    pub(crate) lights: Vec<ObjectEntry>,
    pub(crate) cameras: Vec<ObjectEntry>,
    /// (material table index, struct name), in first-reference order.
    pub(crate) materials: Vec<(usize, String)>,
    /// Bone name to the object nodes parented to it.
    pub(crate) bone_parents: HashMap<String, Vec<NodeId>>,

    pub(crate) begin_frame: i32,
    pub(crate) end_frame: i32,
    pub(crate) frame_time: f32,
}

impl<'a, E: FrameEvaluator> Exporter<'a, E> {
    pub fn new(scene: &'a Scene, evaluator: &'a E, options: &'a ExportOptions) -> Self {
        let settings = scene.settings;
        Self {
            scene,
            evaluator,
            options,
            writer: OgexWriter::new(options.float_as_hex),
            nodes: Vec::new(),
            geometries: Vec::new(),
            lights: Vec::new(),
            cameras: Vec::new(),
            materials: Vec::new(),
            bone_parents: HashMap::new(),
            begin_frame: settings.frame_start,
            end_frame: settings.frame_end,
            frame_time: settings.frame_time(),
        }
    }

    /// Produce the complete document. Nothing is returned on error, so a
    /// failed export yields no partial output.
    pub fn run(mut self) -> Result<Vec<u8>> {
        self.scene.validate()?;

        let scene = self.scene;
        for &root in &scene.roots {
            self.process_node(root);
        }
        self.process_skinned_meshes();
        debug!(registered = self.nodes.len(), "node registry built");

        self.export_metrics();
        for &root in &scene.roots {
            self.export_node(root, None)?;
        }

        let mut i = 0;
        while i < self.geometries.len() {
            self.export_geometry(i)?;
            i += 1;
        }
        for i in 0..self.lights.len() {
            self.export_light(i);
        }
        for i in 0..self.cameras.len() {
            self.export_camera(i);
        }
        if self.options.export_materials {
            for i in 0..self.materials.len() {
                self.export_material(i);
            }
        }

        info!(
            nodes = self.nodes.len(),
            geometries = self.geometries.len(),
            materials = self.materials.len(),
            bytes = self.writer.as_str().len(),
            "export complete"
        );
        Ok(self.writer.into_bytes())
    }

    pub(crate) fn find_node_ref(&self, key: NodeKey) -> Option<&NodeRef> {
        self.nodes.iter().find(|(k, _)| *k == key).map(|(_, r)| r)
    }

    /// Name of a registry entry as the host knows it.
    fn entry_name(&self, key: NodeKey) -> &str {
        match key {
            NodeKey::Object(id) => &self.scene.node(id).name,
            NodeKey::Bone(node, bone) => {
                let NodeData::Armature(a) = self.scene.node(node).data else {
                    return "";
                };
                &self.scene.armatures[a].bones[bone].name
            }
        }
    }

    /// Find a registry entry by host name, used to resolve skeleton bone
    /// references.
    pub(crate) fn find_node_by_name(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|(k, _)| self.entry_name(*k) == name)
    }

    fn node_kind(&self, id: NodeId) -> NodeKind {
        match self.scene.node(id).data {
            NodeData::Mesh(_) => NodeKind::Geometry,
            NodeData::Light(_) => NodeKind::Light,
            NodeData::Camera(_) => NodeKind::Camera,
            _ => NodeKind::Plain,
        }
    }

    fn process_node(&mut self, id: NodeId) {
        let scene = self.scene;
        let node = scene.node(id);
        if !self.options.export_selection_only || node.selected {
            let kind = self.node_kind(id);
            let struct_name = format!("node{}", self.nodes.len() + 1);
            self.nodes.push((NodeKey::Object(id), NodeRef { kind, struct_name }));

            if let Some(bone) = &node.parent_bone {
                self.bone_parents.entry(bone.clone()).or_default().push(id);
            }
            if let NodeData::Armature(a) = node.data {
                for &root in &scene.armatures[a].roots {
                    self.process_bone(id, a, root);
                }
            }
        }
        for &child in &node.children {
            self.process_node(child);
        }
    }

    fn process_bone(&mut self, node: NodeId, armature: usize, bone: usize) {
        let record = &self.scene.armatures[armature].bones[bone];
        if !self.options.export_selection_only || record.selected {
            let struct_name = format!("node{}", self.nodes.len() + 1);
            self.nodes.push((
                NodeKey::Bone(node, bone),
                NodeRef {
                    kind: NodeKind::Bone,
                    struct_name,
                },
            ));
        }
        for &child in &self.scene.armatures[armature].bones[bone].children {
            self.process_bone(node, armature, child);
        }
    }

    /// Any registry entry whose name matches a bone of a skinning armature
    /// is forced to export as a BoneNode, so skeleton references stay
    /// consistent even when an ordinary node stands in for a bone.
    fn process_skinned_meshes(&mut self) {
        let scene = self.scene;
        let mut forced: Vec<usize> = Vec::new();
        for (key, node_ref) in &self.nodes {
            if node_ref.kind != NodeKind::Geometry {
                continue;
            }
            let NodeKey::Object(id) = *key else { continue };
            let Some((_, armature)) = self.armature_ancestor(id) else {
                continue;
            };
            for bone in &scene.armatures[armature].bones {
                if let Some(entry) = self.find_node_by_name(&bone.name) {
                    forced.push(entry);
                }
            }
        }
        for entry in forced {
            self.nodes[entry].1.kind = NodeKind::Bone;
        }
    }

    /// Nearest ancestor carrying an armature, which is what skins a mesh
    /// node.
    pub(crate) fn armature_ancestor(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let scene = self.scene;
        let mut current = scene.node(id).parent;
        while let Some(ancestor) = current {
            if let NodeData::Armature(a) = scene.node(ancestor).data {
                return Some((ancestor, a));
            }
            current = scene.node(ancestor).parent;
        }
        None
    }

    fn export_metrics(&mut self) {
        let settings = self.scene.settings;
        self.writer.write("Metric (key = \"distance\") {float {");
        self.writer.write_float(settings.distance_scale());
        self.writer.write("}}\n");
        self.writer.write("Metric (key = \"angle\") {float {");
        self.writer.write_float(1.0);
        self.writer.write("}}\n");
        self.writer.write("Metric (key = \"time\") {float {");
        self.writer.write_float(1.0);
        self.writer.write("}}\n");
        self.writer.write("Metric (key = \"up\") {string {\"z\"}}\n");
    }

    fn register_geometry(&mut self, mesh_index: usize, node: NodeId) -> String {
        if let Some(entry) = self.geometries.iter_mut().find(|e| e.object == mesh_index) {
            entry.nodes.push(node);
            return entry.struct_name.clone();
        }
        let mut struct_name = sanitize_struct_name(&self.scene.meshes[mesh_index].name);
        if self.geometries.iter().any(|e| e.struct_name == struct_name) {
            struct_name = format!("{}{}", struct_name, self.geometries.len() + 1);
        }
        self.geometries.push(ObjectEntry {
            object: mesh_index,
            struct_name: struct_name.clone(),
            nodes: vec![node],
        });
        struct_name
    }

    fn register_light(&mut self, light_index: usize, node: NodeId) -> String {
        if let Some(entry) = self.lights.iter_mut().find(|e| e.object == light_index) {
            entry.nodes.push(node);
            return entry.struct_name.clone();
        }
        let struct_name = format!("light{}", self.lights.len() + 1);
        self.lights.push(ObjectEntry {
            object: light_index,
            struct_name: struct_name.clone(),
            nodes: vec![node],
        });
        struct_name
    }

    fn register_camera(&mut self, camera_index: usize, node: NodeId) -> String {
        if let Some(entry) = self.cameras.iter_mut().find(|e| e.object == camera_index) {
            entry.nodes.push(node);
            return entry.struct_name.clone();
        }
        let struct_name = format!("camera{}", self.cameras.len() + 1);
        self.cameras.push(ObjectEntry {
            object: camera_index,
            struct_name: struct_name.clone(),
            nodes: vec![node],
        });
        struct_name
    }

    /// Emit one node structure with its children nested inside. A `Some`
    /// correction carries the pose matrix of the bone this node is
    /// parented to; its inverse is written as an extra transform.
    fn export_node(
        &mut self,
        id: NodeId,
        bone_correction: Option<scenegex_core::Mat4>,
    ) -> Result<()> {
        let scene = self.scene;
        let node = scene.node(id);
        let node_ref = self.find_node_ref(NodeKey::Object(id)).cloned();

        if let Some(nref) = &node_ref {
            self.writer.indent_write(nref.kind.struct_identifier(), 0, true);
            self.writer.write(&nref.struct_name);
            if nref.kind == NodeKind::Geometry && node.hide_render {
                self.writer.write(" (visible = false)");
            }
            self.writer.write("\n");
            self.writer.indent_write("{\n", 0, false);
            self.writer.inc_indent();

            let mut struct_flag = false;
            if !node.name.is_empty() {
                self.writer.indent_write("Name {string {\"", 0, false);
                self.writer.write(&node.name);
                self.writer.write("\"}}\n");
                struct_flag = true;
            }

            match node.data {
                NodeData::Mesh(m) if nref.kind == NodeKind::Geometry => {
                    let geometry_name = self.register_geometry(m, id);
                    self.writer.indent_write("ObjectRef {ref {$", 0, false);
                    self.writer.write(&geometry_name);
                    self.writer.write("}}\n");
                    struct_flag = true;

                    if self.options.export_materials {
                        let slots = node.material_slots.clone();
                        for (slot, material) in slots.into_iter().enumerate() {
                            self.export_material_ref(material, slot);
                        }
                    }
                    if scene.meshes[m].shape_keys.is_some() {
                        self.export_morph_weights(id, m);
                    }
                }
                NodeData::Light(l) => {
                    let light_name = self.register_light(l, id);
                    self.writer.indent_write("ObjectRef {ref {$", 0, false);
                    self.writer.write(&light_name);
                    self.writer.write("}}\n");
                    struct_flag = true;
                }
                NodeData::Camera(c) => {
                    let camera_name = self.register_camera(c, id);
                    self.writer.indent_write("ObjectRef {ref {$", 0, false);
                    self.writer.write(&camera_name);
                    self.writer.write("}}\n");
                    struct_flag = true;
                }
                _ => {}
            }
            if struct_flag {
                self.writer.write("\n");
            }

            if let Some(pose) = bone_correction {
                // Undo the bone's pose so the node keeps its world placement.
                if pose.determinant().abs() > EPSILON {
                    self.writer.indent_write("Transform\n", 0, false);
                    self.writer.indent_write("{\n", 0, false);
                    self.writer.inc_indent();
                    self.writer.indent_write("float[16]\n", 0, false);
                    self.writer.indent_write("{\n", 0, false);
                    let inverse = pose.inverse_or_self();
                    self.writer.write_matrix(&inverse);
                    self.writer.indent_write("}\n", 0, false);
                    self.writer.dec_indent();
                    self.writer.indent_write("}\n", 0, false);
                    self.writer.write("\n");
                }
            }

            self.export_node_transform(id);

            if let NodeData::Armature(a) = node.data {
                for &root in &scene.armatures[a].roots {
                    self.export_bone(id, a, root)?;
                }
            }
        }

        for &child in &node.children {
            // Bone-parented children are emitted under their bone instead.
            if scene.node(child).parent_bone.is_none() {
                self.export_node(child, None)?;
            }
        }

        if node_ref.is_some() {
            self.writer.dec_indent();
            self.writer.indent_write("}\n", 0, false);
        }
        Ok(())
    }

    fn export_bone(&mut self, node: NodeId, armature: usize, bone: usize) -> Result<()> {
        let scene = self.scene;
        let record = &scene.armatures[armature].bones[bone];
        let node_ref = self.find_node_ref(NodeKey::Bone(node, bone)).cloned();

        if let Some(nref) = &node_ref {
            self.writer.indent_write(nref.kind.struct_identifier(), 0, true);
            self.writer.write(&nref.struct_name);
            self.writer.write("\n");
            self.writer.indent_write("{\n", 0, false);
            self.writer.inc_indent();

            if !record.name.is_empty() {
                self.writer.indent_write("Name {string {\"", 0, false);
                self.writer.write(&record.name);
                self.writer.write("\"}}\n");
                self.writer.write("\n");
            }

            self.export_bone_transform(node, armature, bone);
        }

        for &child in &scene.armatures[armature].bones[bone].children {
            self.export_bone(node, armature, child)?;
        }

        if let Some(subnodes) = self.bone_parents.get(&record.name).cloned() {
            let pose = record.pose_matrix.unwrap_or(record.bind_matrix);
            for sub in subnodes {
                let correction = if scene.node(sub).parent_bone_relative {
                    None
                } else {
                    Some(pose)
                };
                self.export_node(sub, correction)?;
            }
        }

        if node_ref.is_some() {
            self.writer.dec_indent();
            self.writer.indent_write("}\n", 0, false);
        }
        Ok(())
    }
}

/// Structure names derived from host object names: lowercased, with spaces
/// and dots flattened to underscores.
fn sanitize_struct_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c == ' ' || c == '.' {
            out.push('_');
        } else {
            for lower in c.to_lowercase() {
                out.push(lower);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenegex_scene::{RestPose, SceneNode};

    fn scene_with_chain() -> Scene {
        let mut root = SceneNode::new("root");
        root.children.push(NodeId(1));
        let mut child = SceneNode::new("child");
        child.parent = Some(NodeId(0));
        child.selected = false;

        Scene {
            nodes: vec![root, child],
            roots: vec![NodeId(0)],
            ..Default::default()
        }
    }

    #[test]
    fn test_sanitize_struct_name() {
        assert_eq!(sanitize_struct_name("Cube.001"), "cube_001");
        assert_eq!(sanitize_struct_name("Rock Wall"), "rock_wall");
    }

    #[test]
    fn test_registration_order_and_names() {
        let scene = scene_with_chain();
        let options = ExportOptions::default();
        let evaluator = RestPose;
        let mut exporter = Exporter::new(&scene, &evaluator, &options);
        exporter.process_node(NodeId(0));

        assert_eq!(exporter.nodes.len(), 2);
        assert_eq!(exporter.nodes[0].1.struct_name, "node1");
        assert_eq!(exporter.nodes[1].1.struct_name, "node2");
    }

    #[test]
    fn test_selection_only_skips_unselected() {
        let scene = scene_with_chain();
        let options = ExportOptions {
            export_selection_only: true,
            ..Default::default()
        };
        let evaluator = RestPose;
        let mut exporter = Exporter::new(&scene, &evaluator, &options);
        exporter.process_node(NodeId(0));

        assert_eq!(exporter.nodes.len(), 1);
        assert!(exporter.find_node_ref(NodeKey::Object(NodeId(1))).is_none());
    }

    #[test]
    fn test_unregistered_node_children_still_export() {
        let scene = scene_with_chain();
        let options = ExportOptions {
            export_selection_only: true,
            ..Default::default()
        };
        let evaluator = RestPose;
        let exporter = Exporter::new(&scene, &evaluator, &options);
        let bytes = exporter.run().unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains("Node $node1"));
        assert!(!text.contains("child"));
    }
}
