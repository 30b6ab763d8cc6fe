//! Material structures and material references
//!
//! Materials are registered the first time a node references one, so the
//! structure table is in first-use order. Channels with no recorded value
//! are skipped rather than written with a guessed default.

use scenegex_scene::FrameEvaluator;

use crate::walker::Exporter;

impl<E: FrameEvaluator> Exporter<'_, E> {
    /// Write a `MaterialRef` for one material slot, registering the
    /// material under a sequential `materialN` structure name on first use.
    pub(crate) fn export_material_ref(&mut self, material: usize, slot: usize) {
        let struct_name = match self.materials.iter().find(|(m, _)| *m == material) {
            Some((_, name)) => name.clone(),
            None => {
                let name = format!("material{}", self.materials.len() + 1);
                self.materials.push((material, name.clone()));
                name
            }
        };

        let w = &mut self.writer;
        w.indent_write("MaterialRef (index = ", 0, false);
        w.write_int(slot as i64);
        w.write(") {ref {$");
        w.write(&struct_name);
        w.write("}}\n");
    }

    pub(crate) fn export_material(&mut self, index: usize) {
        let (material_index, struct_name) = self.materials[index].clone();
        let scene = self.scene;
        let material = &scene.materials[material_index];

        self.writer.write("\nMaterial $");
        self.writer.write(&struct_name);
        self.writer.write("\n{\n");
        self.writer.inc_indent();

        if !material.name.is_empty() {
            let w = &mut self.writer;
            w.indent_write("Name {string {\"", 0, false);
            w.write(&material.name);
            w.write("\"}}\n\n");
        }

        if let Some(shader) = &material.shader {
            self.write_material_color("diffuse", shader.base_color.color);
            self.write_material_color("specular", shader.specular.color);
            self.write_material_color("emission", shader.emission.color);

            self.write_material_param("roughness", shader.roughness.value);
            self.write_material_param("metalness", shader.metallic.value);
            self.write_material_param("opacity", shader.alpha.value);

            self.write_material_texture("diffuse", shader.base_color.texture.as_deref());
            self.write_material_texture("specular", shader.specular.texture.as_deref());
            self.write_material_texture("roughness", shader.roughness.texture.as_deref());
            self.write_material_texture("metalness", shader.metallic.texture.as_deref());
            self.write_material_texture("emission", shader.emission.texture.as_deref());
            self.write_material_texture("opacity", shader.alpha.texture.as_deref());
            self.write_material_texture("normal", shader.normal_texture.as_deref());
        }

        self.writer.dec_indent();
        self.writer.write("}\n");
    }

    fn write_material_color(&mut self, attrib: &str, color: Option<[f32; 3]>) {
        let Some(color) = color else { return };
        let w = &mut self.writer;
        w.indent_write("Color (attrib = \"", 0, false);
        w.write(attrib);
        w.write("\") {float[3] {");
        w.write_color(color);
        w.write("}}\n");
    }

    fn write_material_param(&mut self, attrib: &str, value: Option<f32>) {
        let Some(value) = value else { return };
        let w = &mut self.writer;
        w.indent_write("Param (attrib = \"", 0, false);
        w.write(attrib);
        w.write("\") {float {");
        w.write_float(value);
        w.write("}}\n");
    }

    /// Texture paths are rewritten to the import-relative convention: only
    /// the file name of the recorded path survives.
    fn write_material_texture(&mut self, attrib: &str, texture: Option<&str>) {
        let Some(texture) = texture else { return };
        let base = texture
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(texture);

        let w = &mut self.writer;
        w.indent_write("Texture (attrib = \"", 0, true);
        w.write(attrib);
        w.write("\")\n");
        w.indent_write("{\n", 0, false);
        w.indent_write("string {\"", 1, false);
        w.write_file_name(&format!("/Import/textures/{base}"));
        w.write("\"}\n");
        w.indent_write("}\n", 0, false);
    }
}

#[cfg(test)]
mod tests {
    use crate::ExportOptions;
    use crate::Exporter;
    use scenegex_core::Vec3;
    use scenegex_scene::{
        Material, MaterialChannel, Mesh, NodeData, NodeId, RestPose, Scene, SceneNode, Shader,
        Triangle,
    };

    fn material_scene() -> Scene {
        let mesh = Mesh {
            name: "slab".into(),
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
            group_weights: Vec::new(),
            colors: Vec::new(),
            uv_layers: Vec::new(),
            shape_keys: None,
        };

        let material = Material {
            name: "Stone".into(),
            shader: Some(Shader {
                base_color: MaterialChannel {
                    color: Some([0.8, 0.7, 0.6]),
                    value: None,
                    texture: Some("C:\\textures\\stone.png".into()),
                },
                specular: MaterialChannel::default(),
                roughness: MaterialChannel {
                    color: None,
                    value: Some(0.4),
                    texture: None,
                },
                metallic: MaterialChannel::default(),
                emission: MaterialChannel::default(),
                alpha: MaterialChannel::default(),
                normal_texture: None,
            }),
        };

        let mut node = SceneNode::new("slab");
        node.data = NodeData::Mesh(0);
        node.material_slots = vec![0];

        Scene {
            nodes: vec![node],
            roots: vec![NodeId(0)],
            meshes: vec![mesh],
            materials: vec![material],
            ..Default::default()
        }
    }

    fn run(scene: &Scene, options: &ExportOptions) -> String {
        let evaluator = RestPose;
        let bytes = Exporter::new(scene, &evaluator, options).run().unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_material_structure_and_reference() {
        let text = run(&material_scene(), &ExportOptions::default());

        assert!(text.contains("MaterialRef (index = 0) {ref {$material1}}"));
        assert!(text.contains("\nMaterial $material1\n"));
        assert!(text.contains("Name {string {\"Stone\"}}"));
        assert!(text.contains(
            "Color (attrib = \"diffuse\") {float[3] {{0.800000, 0.700000, 0.600000}}}"
        ));
        assert!(text.contains("Param (attrib = \"roughness\") {float {0.400000}}"));
        // Unrecorded channels stay out of the document.
        assert!(!text.contains("attrib = \"specular\""));
        assert!(!text.contains("attrib = \"opacity\""));
    }

    #[test]
    fn test_texture_path_rewritten_to_import_convention() {
        let text = run(&material_scene(), &ExportOptions::default());

        assert!(text.contains("Texture (attrib = \"diffuse\")"));
        assert!(text.contains("string {\"/Import/textures/stone.png\"}"));
        assert!(!text.contains("C:"));
    }

    #[test]
    fn test_materials_can_be_disabled() {
        let options = ExportOptions {
            export_materials: false,
            ..Default::default()
        };
        let text = run(&material_scene(), &options);

        assert!(!text.contains("MaterialRef"));
        assert!(!text.contains("Material $"));
    }
}
