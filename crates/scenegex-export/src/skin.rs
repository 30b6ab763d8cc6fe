//! Skin export: skeleton reference, bind poses, and per-vertex weights
//!
//! Vertex group names remap to bone indices by name; names that match no
//! bone contribute nothing. Raw weights for each vertex are renormalized
//! so they sum to exactly one whenever their raw sum is nonzero.

use scenegex_core::Mat4;
use scenegex_scene::{FrameEvaluator, NodeId};

use crate::vertex::ExportVertex;
use crate::walker::{Exporter, NodeKey};

impl<E: FrameEvaluator> Exporter<'_, E> {
    pub(crate) fn export_skin(
        &mut self,
        node: NodeId,
        armature_node: NodeId,
        armature: usize,
        vertices: &[ExportVertex],
    ) {
        let scene = self.scene;
        let record = scene.node(node);
        let mesh = match record.data {
            scenegex_scene::NodeData::Mesh(m) => &scene.meshes[m],
            _ => return,
        };
        let bones = &scene.armatures[armature].bones;

        // Vertex group slot -> bone index, unresolved names excluded.
        let group_remap: Vec<Option<usize>> = record
            .vertex_groups
            .iter()
            .map(|name| scene.armatures[armature].bone_by_name(name))
            .collect();

        let mut bone_count_array: Vec<u32> = Vec::with_capacity(vertices.len());
        let mut bone_index_array: Vec<u32> = Vec::new();
        let mut bone_weight_array: Vec<f32> = Vec::new();

        for vertex in vertices {
            let groups = mesh
                .group_weights
                .get(vertex.vertex_index as usize)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let mut count: u32 = 0;
            let mut total: f32 = 0.0;
            for gw in groups {
                let Some(Some(bone)) = group_remap.get(gw.group).copied() else {
                    continue;
                };
                if gw.weight != 0.0 {
                    count += 1;
                    total += gw.weight;
                    bone_index_array.push(bone as u32);
                    bone_weight_array.push(gw.weight);
                }
            }
            bone_count_array.push(count);

            if total != 0.0 {
                let normalizer = 1.0 / total;
                let start = bone_weight_array.len() - count as usize;
                for weight in &mut bone_weight_array[start..] {
                    *weight *= normalizer;
                }
            }
        }

        let w = &mut self.writer;
        w.indent_write("Skin\n", 0, true);
        w.indent_write("{\n", 0, false);
        w.inc_indent();

        // Skin-space transform; geometry is exported untransformed.
        w.indent_write("Transform\n", 0, false);
        w.indent_write("{\n", 0, false);
        w.inc_indent();
        w.indent_write("float[16]\n", 0, false);
        w.indent_write("{\n", 0, false);
        w.write_matrix(&Mat4::IDENTITY);
        w.indent_write("}\n", 0, false);
        w.dec_indent();
        w.indent_write("}\n", 0, false);

        // Skeleton: bone references plus their bind-pose transforms.
        let w = &mut self.writer;
        w.indent_write("Skeleton\n", 0, true);
        w.indent_write("{\n", 0, false);
        w.inc_indent();

        w.indent_write("BoneRefArray\n", 0, false);
        w.indent_write("{\n", 0, false);
        w.inc_indent();
        w.indent_write("ref\t\t\t// ", 0, false);
        w.write_int(bones.len() as i64);
        w.indent_write("{\n", 0, true);
        w.indent_write("", 1, false);
        for bone in 0..bones.len() {
            let struct_name = self
                .find_node_ref(NodeKey::Bone(armature_node, bone))
                .map(|r| r.struct_name.clone());
            let w = &mut self.writer;
            match struct_name {
                Some(name) => {
                    w.write("$");
                    w.write(&name);
                }
                None => w.write("null"),
            }
            if bone + 1 < bones.len() {
                w.write(", ");
            } else {
                w.write("\n");
            }
        }
        let w = &mut self.writer;
        w.indent_write("}\n", 0, false);
        w.dec_indent();
        w.indent_write("}\n", 0, false);

        let armature_world = scene.world_matrix(armature_node);
        let bind_poses: Vec<Mat4> = bones
            .iter()
            .map(|bone| armature_world.mul(&bone.bind_matrix))
            .collect();

        let w = &mut self.writer;
        w.indent_write("Transform\n", 0, true);
        w.indent_write("{\n", 0, false);
        w.inc_indent();
        w.indent_write("float[16]\t// ", 0, false);
        w.write_int(bind_poses.len() as i64);
        w.indent_write("{\n", 0, true);
        w.write_matrix_array(&bind_poses);
        w.indent_write("}\n", 0, false);
        w.dec_indent();
        w.indent_write("}\n", 0, false);

        w.dec_indent();
        w.indent_write("}\n", 0, false); // Skeleton

        w.indent_write("BoneCountArray\n", 0, true);
        w.indent_write("{\n", 0, false);
        w.inc_indent();
        w.indent_write("unsigned_int16\t\t// ", 0, false);
        w.write_int(bone_count_array.len() as i64);
        w.indent_write("{\n", 0, true);
        w.write_int_array(&bone_count_array);
        w.indent_write("}\n", 0, false);
        w.dec_indent();
        w.indent_write("}\n", 0, false);

        w.indent_write("BoneIndexArray\n", 0, true);
        w.indent_write("{\n", 0, false);
        w.inc_indent();
        w.indent_write("unsigned_int16\t\t// ", 0, false);
        w.write_int(bone_index_array.len() as i64);
        w.indent_write("{\n", 0, true);
        w.write_int_array(&bone_index_array);
        w.indent_write("}\n", 0, false);
        w.dec_indent();
        w.indent_write("}\n", 0, false);

        w.indent_write("BoneWeightArray\n", 0, true);
        w.indent_write("{\n", 0, false);
        w.inc_indent();
        w.indent_write("float\t\t// ", 0, false);
        w.write_int(bone_weight_array.len() as i64);
        w.indent_write("{\n", 0, true);
        w.write_float_array(&bone_weight_array);
        w.indent_write("}\n", 0, false);
        w.dec_indent();
        w.indent_write("}\n", 0, false);

        w.dec_indent();
        w.indent_write("}\n", 0, false); // Skin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::deindex_mesh;
    use crate::ExportOptions;
    use scenegex_core::Vec3;
    use scenegex_scene::{
        Armature, Bone, Mesh, NodeData, RestPose, Scene, SceneNode, Triangle, VertexGroupWeight,
    };

    fn skinned_scene() -> Scene {
        let bone = |name: &str, parent: Option<usize>, children: Vec<usize>| Bone {
            name: name.into(),
            parent,
            children,
            bind_matrix: scenegex_core::Mat4::IDENTITY,
            pose_matrix: None,
            curves: Vec::new(),
            selected: true,
        };
        let armature = Armature {
            name: "rig".into(),
            bones: vec![bone("hip", None, vec![1]), bone("spine", Some(0), vec![])],
            roots: vec![0],
        };

        let weights = vec![
            vec![
                VertexGroupWeight { group: 0, weight: 2.0 },
                VertexGroupWeight { group: 1, weight: 2.0 },
            ],
            vec![VertexGroupWeight { group: 0, weight: 1.0 }],
            // One weight pointing at a group with no matching bone.
            vec![
                VertexGroupWeight { group: 2, weight: 1.0 },
                VertexGroupWeight { group: 1, weight: 3.0 },
            ],
        ];
        let mesh = Mesh {
            name: "skinned".into(),
            positions: vec![
                Vec3::ZERO,
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            normals: vec![Vec3::new(0.0, 0.0, 1.0); 3],
            triangles: vec![Triangle {
                vertices: [0, 1, 2],
                loops: [0, 1, 2],
                material_index: 0,
                smooth: false,
                normal: Vec3::new(0.0, 0.0, 1.0),
            }],
            group_weights: weights,
            colors: Vec::new(),
            uv_layers: Vec::new(),
            shape_keys: None,
        };

        let mut arm_node = SceneNode::new("rig");
        arm_node.data = NodeData::Armature(0);
        arm_node.children.push(scenegex_scene::NodeId(1));
        let mut mesh_node = SceneNode::new("body");
        mesh_node.parent = Some(scenegex_scene::NodeId(0));
        mesh_node.data = NodeData::Mesh(0);
        mesh_node.vertex_groups = vec!["hip".into(), "spine".into(), "tail".into()];

        Scene {
            nodes: vec![arm_node, mesh_node],
            roots: vec![scenegex_scene::NodeId(0)],
            meshes: vec![mesh],
            armatures: vec![armature],
            ..Default::default()
        }
    }

    #[test]
    fn test_skin_weights_are_normalized() {
        let scene = skinned_scene();
        let options = ExportOptions::default();
        let evaluator = RestPose;
        let bytes = Exporter::new(&scene, &evaluator, &options).run().unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains("Skin"));
        assert!(text.contains("BoneRefArray"));
        // Vertex 0: two equal weights normalized to a half each.
        assert!(text.contains("0.500000, 0.500000"));
        // Vertex 2: the unmatched group drops out and the rest renormalizes.
        assert!(text.contains("1.000000"));
        // Bone counts per unified vertex: 2, 1, 1.
        assert!(text.contains("BoneCountArray"));
        assert!(text.contains("2, 1, 1"));
    }

    #[test]
    fn test_skin_writes_bone_refs_in_armature_order() {
        let scene = skinned_scene();
        let options = ExportOptions::default();
        let evaluator = RestPose;
        let bytes = Exporter::new(&scene, &evaluator, &options).run().unwrap();
        let text = String::from_utf8(bytes).unwrap();

        // Bones registered right after the armature node itself.
        assert!(text.contains("$node2, $node3"));
    }
}
