//! Geometry, light, and camera object structures
//!
//! Object structures are shared: every node that references the same mesh,
//! light, or camera points at one structure, and the structure carries a
//! comment listing the referencing nodes.

use scenegex_core::{Error, Result, Vec2, Vec3};
use scenegex_scene::{Falloff, FrameEvaluator, LightKind, NodeId};

use crate::animation::{animation_present, classify_curve, CurveKind};
use crate::vertex::{deindex_mesh, unify_vertices};
use crate::walker::Exporter;

impl<E: FrameEvaluator> Exporter<'_, E> {
    fn write_node_table(&mut self, nodes: &[NodeId]) {
        let scene = self.scene;
        for (i, &node) in nodes.iter().enumerate() {
            if i == 0 {
                self.writer.write("\t\t// ");
            } else {
                self.writer.write(", ");
            }
            self.writer.write(&scene.node(node).name);
        }
    }

    pub(crate) fn export_geometry(&mut self, index: usize) -> Result<()> {
        let entry = self.geometries[index].clone();
        let scene = self.scene;
        let mesh = &scene.meshes[entry.object];
        if mesh.triangles.is_empty() {
            let node = entry
                .nodes
                .first()
                .map(|&n| scene.node(n).name.clone())
                .unwrap_or_default();
            return Err(Error::EmptyGeometry { node });
        }

        self.writer.write("\nGeometryObject $");
        self.writer.write(&entry.struct_name);
        self.write_node_table(&entry.nodes);
        self.writer.write("\n{\n");
        self.writer.inc_indent();

        let mut struct_flag = false;
        if let Some(keys) = &mesh.shape_keys {
            let base_index = if keys.relative { keys.reference_key } else { 0 };
            for (m, block) in keys.blocks.iter().enumerate() {
                let w = &mut self.writer;
                w.indent_write("Morph (index = ", 0, struct_flag);
                w.write_int(m as i64);
                if keys.relative && m != base_index {
                    w.write(", base = ");
                    w.write_int(base_index as i64);
                }
                w.write(")\n");
                w.indent_write("{\n", 0, false);
                w.indent_write("Name {string {\"", 1, false);
                w.write(&block.name);
                w.write("\"}}\n");
                w.indent_write("}\n", 0, false);
                struct_flag = true;
            }
        }

        self.writer
            .indent_write("Mesh (primitive = \"triangles\")\n", 0, struct_flag);
        self.writer.indent_write("{\n", 0, false);
        self.writer.inc_indent();

        let (flattened, material_table) = deindex_mesh(mesh);
        let (unified, index_table) = unify_vertices(&flattened);

        let positions: Vec<Vec3> = unified.iter().map(|v| v.position).collect();
        self.write_vertex_array3("position", None, &positions);

        if self.options.export_normals {
            let normals: Vec<Vec3> = unified.iter().map(|v| v.normal).collect();
            self.write_vertex_array3("normal", None, &normals);
        }
        if self.options.export_vertex_colors && !mesh.colors.is_empty() {
            let colors: Vec<Vec3> = unified.iter().map(|v| v.color).collect();
            self.write_vertex_array3("color", None, &colors);
        }
        if self.options.export_uvs {
            if !mesh.uv_layers.is_empty() {
                let uvs: Vec<Vec2> = unified.iter().map(|v| v.texcoord0).collect();
                self.write_vertex_array2("texcoord", &uvs);
            }
            if mesh.uv_layers.len() > 1 {
                let uvs: Vec<Vec2> = unified.iter().map(|v| v.texcoord1).collect();
                self.write_vertex_array2("texcoord[1]", &uvs);
            }
        }

        if let Some(keys) = &mesh.shape_keys {
            for (m, block) in keys.blocks.iter().enumerate() {
                let positions: Vec<Vec3> = unified
                    .iter()
                    .map(|v| block.positions[v.vertex_index as usize])
                    .collect();
                self.write_vertex_array3("position", Some(m), &positions);

                if self.options.export_normals {
                    let normals: Vec<Vec3> = unified
                        .iter()
                        .map(|v| {
                            let tri = &mesh.triangles[v.face_index as usize];
                            if tri.smooth {
                                block.vertex_normals[v.vertex_index as usize]
                            } else {
                                block.face_normals[v.face_index as usize]
                            }
                        })
                        .collect();
                    self.write_vertex_array3("normal", Some(m), &normals);
                }
            }
        }

        let triangle_count = material_table.len();
        let triangles: Vec<[u32; 3]> = (0..triangle_count)
            .map(|t| {
                [
                    index_table[t * 3],
                    index_table[t * 3 + 1],
                    index_table[t * 3 + 2],
                ]
            })
            .collect();
        let max_material = mesh.max_material_index();

        if max_material == 0 {
            self.write_index_array(None, &triangles);
        } else {
            for m in 0..=max_material {
                let subset: Vec<[u32; 3]> = triangles
                    .iter()
                    .zip(&material_table)
                    .filter(|(_, &mat)| mat == m)
                    .map(|(tri, _)| *tri)
                    .collect();
                if !subset.is_empty() {
                    self.write_index_array(Some(m), &subset);
                }
            }
        }

        if let Some(&first_node) = entry.nodes.first() {
            if !mesh.group_weights.is_empty() {
                if let Some((armature_node, armature)) = self.armature_ancestor(first_node) {
                    self.export_skin(first_node, armature_node, armature, &unified);
                }
            }
        }

        self.writer.dec_indent();
        self.writer.indent_write("}\n", 0, false);
        self.writer.dec_indent();
        self.writer.indent_write("}\n", 0, false);
        Ok(())
    }

    fn write_vertex_array3(&mut self, attrib: &str, morph: Option<usize>, values: &[Vec3]) {
        let w = &mut self.writer;
        w.indent_write("VertexArray (attrib = \"", 0, false);
        w.write(attrib);
        w.write("\"");
        if let Some(m) = morph {
            w.write(", morph = ");
            w.write_int(m as i64);
        }
        w.write(")\n");
        w.indent_write("{\n", 0, false);
        w.inc_indent();
        w.indent_write("float[3]\t\t// ", 0, false);
        w.write_int(values.len() as i64);
        w.indent_write("{\n", 0, true);
        w.write_vector3_array(values);
        w.indent_write("}\n", 0, false);
        w.dec_indent();
        w.indent_write("}\n", 0, false);
        w.write("\n");
    }

    fn write_vertex_array2(&mut self, attrib: &str, values: &[Vec2]) {
        let w = &mut self.writer;
        w.indent_write("VertexArray (attrib = \"", 0, false);
        w.write(attrib);
        w.write("\")\n");
        w.indent_write("{\n", 0, false);
        w.inc_indent();
        w.indent_write("float[2]\t\t// ", 0, false);
        w.write_int(values.len() as i64);
        w.indent_write("{\n", 0, true);
        w.write_vector2_array(values);
        w.indent_write("}\n", 0, false);
        w.dec_indent();
        w.indent_write("}\n", 0, false);
        w.write("\n");
    }

    fn write_index_array(&mut self, material: Option<usize>, triangles: &[[u32; 3]]) {
        let w = &mut self.writer;
        match material {
            Some(m) => {
                w.indent_write("IndexArray (material = ", 0, true);
                w.write_int(m as i64);
                w.write(")\n");
            }
            None => w.indent_write("IndexArray\n", 0, true),
        }
        w.indent_write("{\n", 0, false);
        w.inc_indent();
        w.indent_write("unsigned_int32[3]\t\t// ", 0, false);
        w.write_int(triangles.len() as i64);
        w.indent_write("{\n", 0, true);
        w.write_triangle_array(triangles);
        w.indent_write("}\n", 0, false);
        w.dec_indent();
        w.indent_write("}\n", 0, false);
    }

    /// MorphWeight structures for a geometry node, plus keyframe or
    /// sampled tracks for the animated weights.
    pub(crate) fn export_morph_weights(&mut self, id: NodeId, mesh_index: usize) {
        let scene = self.scene;
        let mesh = &scene.meshes[mesh_index];
        let Some(keys) = &mesh.shape_keys else { return };

        let tracks: Vec<_> = keys
            .blocks
            .iter()
            .map(|block| match block.curves.first() {
                Some(curve) => {
                    let kind = classify_curve(curve);
                    let animated = kind == CurveKind::Sampled || animation_present(curve, kind);
                    (Some(curve), kind, animated)
                }
                None => (None, CurveKind::Sampled, false),
            })
            .collect();

        for (k, block) in keys.blocks.iter().enumerate() {
            let w = &mut self.writer;
            w.indent_write("MorphWeight", 0, k == 0);
            if tracks[k].2 {
                w.write(" %mw");
                w.write_int(k as i64);
            }
            w.write(" (index = ");
            w.write_int(k as i64);
            w.write(") {float {");
            let value = if keys.relative && k == keys.reference_key {
                1.0
            } else {
                block.value
            };
            w.write_float(value);
            w.write("}}\n");
        }

        if !tracks.iter().any(|t| t.2) {
            return;
        }

        self.writer.indent_write("Animation\n", 0, true);
        self.writer.indent_write("{\n", 0, false);
        self.writer.inc_indent();
        let mut track_flag = false;
        for (k, (curve, kind, animated)) in tracks.iter().enumerate() {
            if !*animated {
                continue;
            }
            let target = format!("mw{k}");
            match curve {
                Some(c) if *kind != CurveKind::Sampled => {
                    self.export_animation_track(c, *kind, &target, track_flag);
                }
                _ => {
                    let fallback = keys.blocks[k].value;
                    self.export_morph_sampled_track(id, k, fallback, &target, track_flag);
                }
            }
            track_flag = true;
        }
        self.writer.dec_indent();
        self.writer.indent_write("}\n", 0, false);
    }

    fn export_morph_sampled_track(
        &mut self,
        id: NodeId,
        block: usize,
        fallback: f32,
        target: &str,
        newline: bool,
    ) {
        let values: Vec<f32> = (self.begin_frame..=self.end_frame)
            .map(|frame| {
                self.evaluator
                    .morph_weight_at(id, block, frame as f32)
                    .unwrap_or(fallback)
            })
            .collect();

        self.writer.indent_write("Track (target = %", 0, newline);
        self.writer.write(target);
        self.writer.write(")\n");
        self.writer.indent_write("{\n", 0, false);
        self.writer.inc_indent();

        self.writer.indent_write("Time\n", 0, false);
        self.writer.indent_write("{\n", 0, false);
        self.writer.inc_indent();
        self.writer.indent_write("Key {float {", 0, false);
        for i in 0..values.len() {
            if i > 0 {
                self.writer.write(", ");
            }
            self.writer.write_float(i as f32 * self.frame_time);
        }
        self.writer.write("}}\n");
        self.writer.dec_indent();
        self.writer.indent_write("}\n", 0, false);

        self.writer.indent_write("Value\n", 0, true);
        self.writer.indent_write("{\n", 0, false);
        self.writer.inc_indent();
        self.writer.indent_write("Key {float {", 0, false);
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                self.writer.write(", ");
            }
            self.writer.write_float(*value);
        }
        self.writer.write("}}\n");
        self.writer.dec_indent();
        self.writer.indent_write("}\n", 0, false);

        self.writer.dec_indent();
        self.writer.indent_write("}\n", 0, false);
    }

    pub(crate) fn export_light(&mut self, index: usize) {
        let entry = self.lights[index].clone();
        let scene = self.scene;
        let light = &scene.lights[entry.object];

        self.writer.write("\nLightObject $");
        self.writer.write(&entry.struct_name);
        self.writer.write(" (type = ");
        let (type_name, point, spot) = match light.kind {
            LightKind::Sun => ("\"infinite\"", false, false),
            LightKind::Point => ("\"point\"", true, false),
            LightKind::Spot => ("\"spot\"", true, true),
        };
        self.writer.write(type_name);
        if !light.shadow {
            self.writer.write(", shadow = false");
        }
        self.writer.write(")");
        self.write_node_table(&entry.nodes);
        self.writer.write("\n{\n");
        self.writer.inc_indent();

        let w = &mut self.writer;
        w.indent_write("Color (attrib = \"light\") {float[3] {", 0, false);
        w.write_color(light.color);
        w.write("}}\n");

        if light.energy != 1.0 {
            w.indent_write("Param (attrib = \"intensity\") {float {", 0, false);
            w.write_float(light.energy);
            w.write("}}\n");
        }

        if point {
            match light.falloff {
                Some(Falloff::InverseLinear) => self.write_atten("inverse", light.distance),
                Some(Falloff::InverseSquare) => {
                    self.write_atten("inverse_square", light.distance.sqrt());
                }
                Some(Falloff::LinearQuadraticWeighted { linear, quadratic }) => {
                    if quadratic == 0.0 {
                        if linear != 0.0 {
                            self.write_atten("inverse", light.distance / linear);
                        }
                    } else {
                        self.write_atten("inverse_square", (light.distance / quadratic).sqrt());
                    }
                }
                None => {}
            }
        }

        if spot {
            let end_angle = light.spot_size * 0.5;
            let begin_angle = end_angle * (1.0 - light.spot_blend);
            let w = &mut self.writer;
            w.indent_write("Atten (kind = \"angle\", curve = \"linear\")\n", 0, true);
            w.indent_write("{\n", 0, false);
            w.indent_write("Param (attrib = \"begin\") {float {", 1, false);
            w.write_float(begin_angle);
            w.write("}}\n");
            w.indent_write("Param (attrib = \"end\") {float {", 1, false);
            w.write_float(end_angle);
            w.write("}}\n");
            w.indent_write("}\n", 0, false);
        }

        self.writer.dec_indent();
        self.writer.write("}\n");
    }

    fn write_atten(&mut self, curve: &str, scale: f32) {
        let w = &mut self.writer;
        w.indent_write("Atten (curve = \"", 0, true);
        w.write(curve);
        w.write("\")\n");
        w.indent_write("{\n", 0, false);
        w.indent_write("Param (attrib = \"scale\") {float {", 1, false);
        w.write_float(scale);
        w.write("}}\n");
        w.indent_write("}\n", 0, false);
    }

    pub(crate) fn export_camera(&mut self, index: usize) {
        let entry = self.cameras[index].clone();
        let scene = self.scene;
        let camera = scene.cameras[entry.object];

        self.writer.write("\nCameraObject $");
        self.writer.write(&entry.struct_name);
        self.write_node_table(&entry.nodes);
        self.writer.write("\n{\n");
        self.writer.inc_indent();

        let w = &mut self.writer;
        w.indent_write("Param (attrib = \"fov\") {float {", 0, false);
        w.write_float(camera.fov);
        w.write("}}\n");
        w.indent_write("Param (attrib = \"near\") {float {", 0, false);
        w.write_float(camera.clip_start);
        w.write("}}\n");
        w.indent_write("Param (attrib = \"far\") {float {", 0, false);
        w.write_float(camera.clip_end);
        w.write("}}\n");

        self.writer.dec_indent();
        self.writer.write("}\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExportOptions;
    use scenegex_scene::{Camera, Light, Mesh, NodeData, RestPose, Scene, SceneNode, Triangle};

    fn run(scene: &Scene) -> String {
        let options = ExportOptions::default();
        let evaluator = RestPose;
        let bytes = Exporter::new(scene, &evaluator, &options).run().unwrap();
        String::from_utf8(bytes).unwrap()
    }

    fn quad_mesh(name: &str, second_material: usize) -> Mesh {
        let tri = |vertices: [u32; 3], material_index: usize| Triangle {
            vertices,
            loops: vertices,
            material_index,
            smooth: false,
            normal: Vec3::new(0.0, 0.0, 1.0),
        };
        Mesh {
            name: name.into(),
            positions: vec![
                Vec3::ZERO,
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            normals: vec![Vec3::new(0.0, 0.0, 1.0); 4],
            triangles: vec![tri([0, 1, 2], 0), tri([0, 2, 3], second_material)],
            group_weights: Vec::new(),
            colors: Vec::new(),
            uv_layers: Vec::new(),
            shape_keys: None,
        }
    }

    #[test]
    fn test_geometry_object_shared_by_two_nodes() {
        let mut a = SceneNode::new("left");
        a.data = NodeData::Mesh(0);
        let mut b = SceneNode::new("right");
        b.data = NodeData::Mesh(0);

        let scene = Scene {
            nodes: vec![a, b],
            roots: vec![NodeId(0), NodeId(1)],
            meshes: vec![quad_mesh("Plane", 0)],
            ..Default::default()
        };
        let text = run(&scene);

        // One geometry structure, two referencing nodes in the comment.
        assert_eq!(text.matches("GeometryObject $plane").count(), 1);
        assert!(text.contains("GeometryObject $plane\t\t// left, right"));
        assert!(text.contains("ObjectRef {ref {$plane}}"));
        // Flat quad dedups to four unified vertices.
        assert!(text.contains("float[3]\t\t// 4"));
    }

    #[test]
    fn test_per_material_index_arrays() {
        let mut node = SceneNode::new("quad");
        node.data = NodeData::Mesh(0);
        let scene = Scene {
            nodes: vec![node],
            roots: vec![NodeId(0)],
            meshes: vec![quad_mesh("Quad", 1)],
            ..Default::default()
        };
        let text = run(&scene);

        assert!(text.contains("IndexArray (material = 0)"));
        assert!(text.contains("IndexArray (material = 1)"));
        assert!(text.contains("unsigned_int32[3]\t\t// 1"));
        assert!(!text.contains("IndexArray\n"));
    }

    #[test]
    fn test_single_material_mesh_has_plain_index_array() {
        let mut node = SceneNode::new("quad");
        node.data = NodeData::Mesh(0);
        let scene = Scene {
            nodes: vec![node],
            roots: vec![NodeId(0)],
            meshes: vec![quad_mesh("Quad", 0)],
            ..Default::default()
        };
        let text = run(&scene);

        assert!(text.contains("IndexArray\n"));
        assert!(!text.contains("IndexArray (material"));
        assert!(text.contains("unsigned_int32[3]\t\t// 2"));
    }

    #[test]
    fn test_light_object_attributes() {
        let mut node = SceneNode::new("lamp");
        node.data = NodeData::Light(0);
        let scene = Scene {
            nodes: vec![node],
            roots: vec![NodeId(0)],
            lights: vec![Light {
                name: "lamp".into(),
                kind: LightKind::Spot,
                color: [1.0, 0.5, 0.25],
                energy: 2.0,
                shadow: false,
                falloff: Some(Falloff::InverseSquare),
                distance: 25.0,
                spot_size: 1.0,
                spot_blend: 0.5,
            }],
            ..Default::default()
        };
        let text = run(&scene);

        assert!(text.contains("LightObject $light1 (type = \"spot\", shadow = false)"));
        assert!(text.contains("Color (attrib = \"light\") {float[3] {{1.000000, 0.500000, 0.250000}}}"));
        assert!(text.contains("Param (attrib = \"intensity\") {float {2.000000}}"));
        assert!(text.contains("Atten (curve = \"inverse_square\")"));
        assert!(text.contains("Param (attrib = \"scale\") {float {5.000000}}"));
        assert!(text.contains("Atten (kind = \"angle\", curve = \"linear\")"));
        assert!(text.contains("Param (attrib = \"end\") {float {0.500000}}"));
        assert!(text.contains("Param (attrib = \"begin\") {float {0.250000}}"));
    }

    #[test]
    fn test_camera_object_params() {
        let mut node = SceneNode::new("cam");
        node.data = NodeData::Camera(0);
        let scene = Scene {
            nodes: vec![node],
            roots: vec![NodeId(0)],
            cameras: vec![Camera {
                fov: 0.9,
                clip_start: 0.1,
                clip_end: 100.0,
            }],
            ..Default::default()
        };
        let text = run(&scene);

        assert!(text.contains("CameraNode $node1"));
        assert!(text.contains("CameraObject $camera1\t\t// cam"));
        assert!(text.contains("Param (attrib = \"fov\") {float {0.900000}}"));
        assert!(text.contains("Param (attrib = \"near\") {float {0.100000}}"));
        assert!(text.contains("Param (attrib = \"far\") {float {100.000000}}"));
    }
}
