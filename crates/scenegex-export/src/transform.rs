//! Node and bone transform emission
//!
//! Every transform lands in exactly one of three shapes:
//! - static: a single `Transform {float[16]}` matrix,
//! - sampled: `Transform %transform` plus a baked per-frame matrix track,
//! - decomposed: per-axis Translation/Rotation/Scale substructures with
//!   keyframe tracks targeting them.
//!
//! Quaternion or axis-angle rotation modes, any curve that classification
//! rejects, and the force-sample option all route to the sampled shape.
//! Baked frames that never deviate from the rest matrix collapse the
//! sampled shape back to a plain static matrix.

use scenegex_core::{Mat4, Quat, Vec3, Vec4, EPSILON};
use scenegex_scene::anim::curves_frame_range;
use scenegex_scene::{AnimationCurve, ChannelPath, FrameEvaluator, NodeId, RotationMode};

use crate::animation::{animation_present, classify_curve, CurveKind};
use crate::walker::Exporter;

const AXIS_NAME: [&str; 3] = ["x", "y", "z"];
const SUBTRANSLATION: [&str; 3] = ["xpos", "ypos", "zpos"];
const SUBROTATION: [&str; 3] = ["xrot", "yrot", "zrot"];
const SUBSCALE: [&str; 3] = ["xscl", "yscl", "zscl"];
const DELTA_SUBTRANSLATION: [&str; 3] = ["dxpos", "dypos", "dzpos"];
const DELTA_SUBROTATION: [&str; 3] = ["dxrot", "dyrot", "dzrot"];
const DELTA_SUBSCALE: [&str; 3] = ["dxscl", "dyscl", "dzscl"];

// Channel group indices into the gathered slot table.
const POS: usize = 0;
const DPOS: usize = 1;
const ROT: usize = 2;
const DROT: usize = 3;
const SCL: usize = 4;
const DSCL: usize = 5;

#[derive(Clone, Copy, Default)]
struct Slot<'a> {
    curve: Option<&'a AnimationCurve>,
    kind: CurveKind,
    animated: bool,
}

fn group_animated(group: &[Slot<'_>; 3]) -> bool {
    group.iter().any(|slot| slot.animated)
}

impl<E: FrameEvaluator> Exporter<'_, E> {
    pub(crate) fn export_node_transform(&mut self, id: NodeId) {
        let scene = self.scene;
        let node = scene.node(id);
        let mut sampled =
            self.options.force_sampled_animation || node.rotation_mode.forces_sampled();

        let mut groups: [[Slot; 3]; 6] = Default::default();
        if !sampled {
            for curve in &node.curves {
                let kind = classify_curve(curve);
                if kind == CurveKind::Sampled {
                    sampled = true;
                    break;
                }
                let group = match curve.channel {
                    ChannelPath::Location => POS,
                    ChannelPath::DeltaLocation => DPOS,
                    ChannelPath::RotationEuler => ROT,
                    ChannelPath::DeltaRotationEuler => DROT,
                    ChannelPath::Scale => SCL,
                    ChannelPath::DeltaScale => DSCL,
                    // Quaternion and axis-angle channels have no per-axis
                    // decomposition.
                    ChannelPath::RotationQuaternion
                    | ChannelPath::DeltaRotationQuaternion
                    | ChannelPath::RotationAxisAngle => {
                        sampled = true;
                        break;
                    }
                };
                let axis = curve.component;
                if axis < 3 && groups[group][axis].curve.is_none() {
                    groups[group][axis] = Slot {
                        curve: Some(curve),
                        kind,
                        animated: animation_present(curve, kind),
                    };
                }
            }
        }

        if sampled {
            let animated = self.sampled_node_animation_present(id);
            self.write_transform_matrix(&node.rest_matrix, animated);
            if animated {
                self.export_node_sampled_animation(id);
            }
            return;
        }

        if !groups.iter().any(group_animated) {
            self.write_transform_matrix(&node.rest_matrix, false);
            return;
        }

        self.export_decomposed_transform(id, &groups);
    }

    fn export_decomposed_transform(&mut self, id: NodeId, groups: &[[Slot<'_>; 3]; 6]) {
        let scene = self.scene;
        let node = scene.node(id);
        let t = &node.transform;
        let axes = node.rotation_mode.emission_axes();
        let mut struct_flag = false;

        // Delta translation, then translation.
        struct_flag = self.emit_translation_group(
            &groups[DPOS],
            t.delta_location,
            &DELTA_SUBTRANSLATION,
            struct_flag,
        );
        struct_flag =
            self.emit_translation_group(&groups[POS], t.location, &SUBTRANSLATION, struct_flag);

        // Delta rotation.
        if group_animated(&groups[DROT]) {
            for &axis in &axes {
                let angle = t.delta_rotation_euler.component(axis);
                if groups[DROT][axis].animated || angle.abs() > EPSILON {
                    self.write_axis_struct(
                        "Rotation",
                        Some(DELTA_SUBROTATION[axis]),
                        axis,
                        angle,
                        struct_flag,
                    );
                    struct_flag = true;
                }
            }
        } else if !t.delta_rotation_quaternion.is_identity() {
            self.write_quaternion_struct(t.delta_rotation_quaternion, struct_flag);
            struct_flag = true;
        } else {
            for &axis in &axes {
                let angle = t.delta_rotation_euler.component(axis);
                if angle.abs() > EPSILON {
                    self.write_axis_struct("Rotation", None, axis, angle, struct_flag);
                    struct_flag = true;
                }
            }
        }

        // Rotation.
        if group_animated(&groups[ROT]) {
            for &axis in &axes {
                let angle = t.rotation_euler.component(axis);
                if groups[ROT][axis].animated || angle.abs() > EPSILON {
                    self.write_axis_struct(
                        "Rotation",
                        Some(SUBROTATION[axis]),
                        axis,
                        angle,
                        struct_flag,
                    );
                    struct_flag = true;
                }
            }
        } else {
            match node.rotation_mode {
                RotationMode::Quaternion => {
                    if !t.rotation_quaternion.is_identity() {
                        self.write_quaternion_struct(t.rotation_quaternion, struct_flag);
                        struct_flag = true;
                    }
                }
                RotationMode::AxisAngle => {
                    // Stored as (angle, axis).
                    if t.rotation_axis_angle.x.abs() > EPSILON {
                        self.write_axis_angle_struct(t.rotation_axis_angle, struct_flag);
                        struct_flag = true;
                    }
                }
                _ => {
                    for &axis in &axes {
                        let angle = t.rotation_euler.component(axis);
                        if angle.abs() > EPSILON {
                            self.write_axis_struct("Rotation", None, axis, angle, struct_flag);
                            struct_flag = true;
                        }
                    }
                }
            }
        }

        // Delta scale, then scale.
        struct_flag =
            self.emit_scale_group(&groups[DSCL], t.delta_scale, &DELTA_SUBSCALE, struct_flag);
        struct_flag = self.emit_scale_group(&groups[SCL], t.scale, &SUBSCALE, struct_flag);
        let _ = struct_flag;

        // Keyframe tracks for every present channel.
        let curves = &node.curves;
        let (range_begin, range_end) = curves_frame_range(curves)
            .unwrap_or((self.begin_frame as f32, self.end_frame as f32));
        let begin = self.begin_frame as f32;

        self.writer.indent_write("Animation (begin = ", 0, true);
        self.writer.write_float((range_begin - begin) * self.frame_time);
        self.writer.write(", end = ");
        self.writer.write_float((range_end - begin) * self.frame_time);
        self.writer.write(")\n");
        self.writer.indent_write("{\n", 0, false);
        self.writer.inc_indent();

        let order: [(usize, [&str; 3]); 6] = [
            (DPOS, DELTA_SUBTRANSLATION),
            (POS, SUBTRANSLATION),
            (DROT, DELTA_SUBROTATION),
            (ROT, SUBROTATION),
            (DSCL, DELTA_SUBSCALE),
            (SCL, SUBSCALE),
        ];
        let mut track_flag = false;
        for (group, names) in order {
            for axis in 0..3 {
                let slot = groups[group][axis];
                if !slot.animated {
                    continue;
                }
                if let Some(curve) = slot.curve {
                    self.export_animation_track(curve, slot.kind, names[axis], track_flag);
                    track_flag = true;
                }
            }
        }

        self.writer.dec_indent();
        self.writer.indent_write("}\n", 0, false);
    }

    fn emit_translation_group(
        &mut self,
        group: &[Slot<'_>; 3],
        value: Vec3,
        names: &[&str; 3],
        mut struct_flag: bool,
    ) -> bool {
        if group_animated(group) {
            for axis in 0..3 {
                let v = value.component(axis);
                if group[axis].animated || v.abs() > EPSILON {
                    self.write_axis_struct("Translation", Some(names[axis]), axis, v, struct_flag);
                    struct_flag = true;
                }
            }
        } else if value.x.abs() > EPSILON || value.y.abs() > EPSILON || value.z.abs() > EPSILON {
            self.write_vector_struct("Translation", value, struct_flag);
            struct_flag = true;
        }
        struct_flag
    }

    fn emit_scale_group(
        &mut self,
        group: &[Slot<'_>; 3],
        value: Vec3,
        names: &[&str; 3],
        mut struct_flag: bool,
    ) -> bool {
        if group_animated(group) {
            for axis in 0..3 {
                let v = value.component(axis);
                if group[axis].animated || (v - 1.0).abs() > EPSILON {
                    self.write_axis_struct("Scale", Some(names[axis]), axis, v, struct_flag);
                    struct_flag = true;
                }
            }
        } else if (value.x - 1.0).abs() > EPSILON
            || (value.y - 1.0).abs() > EPSILON
            || (value.z - 1.0).abs() > EPSILON
        {
            self.write_vector_struct("Scale", value, struct_flag);
            struct_flag = true;
        }
        struct_flag
    }

    fn write_transform_matrix(&mut self, matrix: &Mat4, animated: bool) {
        self.writer.indent_write("Transform", 0, false);
        if animated {
            self.writer.write(" %transform");
        }
        self.writer.write("\n");
        self.writer.indent_write("{\n", 0, false);
        self.writer.inc_indent();
        self.writer.indent_write("float[16]\n", 0, false);
        self.writer.indent_write("{\n", 0, false);
        self.writer.write_matrix(matrix);
        self.writer.indent_write("}\n", 0, false);
        self.writer.dec_indent();
        self.writer.indent_write("}\n", 0, false);
    }

    fn write_axis_struct(
        &mut self,
        keyword: &str,
        target: Option<&str>,
        axis: usize,
        value: f32,
        newline: bool,
    ) {
        self.writer.indent_write(keyword, 0, newline);
        if let Some(target) = target {
            self.writer.write(" %");
            self.writer.write(target);
        }
        self.writer.write(" (kind = \"");
        self.writer.write(AXIS_NAME[axis]);
        self.writer.write("\")\n");
        self.writer.indent_write("{\n", 0, false);
        self.writer.indent_write("float {", 1, false);
        self.writer.write_float(value);
        self.writer.write("}\n");
        self.writer.indent_write("}\n", 0, false);
    }

    fn write_vector_struct(&mut self, keyword: &str, value: Vec3, newline: bool) {
        self.writer.indent_write(keyword, 0, newline);
        self.writer.write("\n");
        self.writer.indent_write("{\n", 0, false);
        self.writer.indent_write("float[3] {", 1, false);
        self.writer.write_vector3(value);
        self.writer.write("}\n");
        self.writer.indent_write("}\n", 0, false);
    }

    fn write_quaternion_struct(&mut self, q: Quat, newline: bool) {
        self.writer
            .indent_write("Rotation (kind = \"quaternion\")\n", 0, newline);
        self.writer.indent_write("{\n", 0, false);
        self.writer.indent_write("float[4] {", 1, false);
        self.writer.write_quaternion(q);
        self.writer.write("}\n");
        self.writer.indent_write("}\n", 0, false);
    }

    fn write_axis_angle_struct(&mut self, value: Vec4, newline: bool) {
        self.writer
            .indent_write("Rotation (kind = \"axis\")\n", 0, newline);
        self.writer.indent_write("{\n", 0, false);
        self.writer.indent_write("float[4] {", 1, false);
        self.writer.write_vector4(value);
        self.writer.write("}\n");
        self.writer.indent_write("}\n", 0, false);
    }

    fn sampled_node_animation_present(&self, id: NodeId) -> bool {
        let rest = self.scene.node(id).rest_matrix;
        for frame in self.begin_frame..=self.end_frame {
            if let Some(m) = self.evaluator.node_local_at(id, frame as f32) {
                if m.differs_from(&rest) {
                    return true;
                }
            }
        }
        false
    }

    fn export_node_sampled_animation(&mut self, id: NodeId) {
        let rest = self.scene.node(id).rest_matrix;
        let frames: Vec<Mat4> = (self.begin_frame..=self.end_frame)
            .map(|frame| {
                self.evaluator
                    .node_local_at(id, frame as f32)
                    .unwrap_or(rest)
            })
            .collect();
        self.write_sampled_track(&frames);
    }

    /// `Animation { Track (target = %transform) { … } }` over baked
    /// per-frame matrices. Key times start at zero and step by the frame
    /// time.
    fn write_sampled_track(&mut self, frames: &[Mat4]) {
        self.writer.indent_write("Animation\n", 0, true);
        self.writer.indent_write("{\n", 0, false);
        self.writer.inc_indent();
        self.writer.indent_write("Track (target = %transform)\n", 0, false);
        self.writer.indent_write("{\n", 0, false);
        self.writer.inc_indent();

        self.writer.indent_write("Time\n", 0, false);
        self.writer.indent_write("{\n", 0, false);
        self.writer.inc_indent();
        self.writer.indent_write("Key {float {", 0, false);
        for i in 0..frames.len() {
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
        self.writer.indent_write("Key\n", 0, false);
        self.writer.indent_write("{\n", 0, false);
        self.writer.inc_indent();
        self.writer.indent_write("float[16]\n", 0, false);
        self.writer.indent_write("{\n", 0, false);
        self.writer.write_matrix_array(frames);
        self.writer.indent_write("}\n", 0, false);
        self.writer.dec_indent();
        self.writer.indent_write("}\n", 0, false);
        self.writer.dec_indent();
        self.writer.indent_write("}\n", 0, false);

        self.writer.dec_indent();
        self.writer.indent_write("}\n", 0, false);
        self.writer.dec_indent();
        self.writer.indent_write("}\n", 0, false);
    }

    pub(crate) fn export_bone_transform(&mut self, node: NodeId, armature: usize, bone: usize) {
        let scene = self.scene;
        let bones = &scene.armatures[armature].bones;
        let record = &bones[bone];
        let animated = self.options.force_sampled_animation || record.is_animated();

        let mut transform = record.bind_matrix;
        if let Some(parent) = record.parent {
            let parent_bind = bones[parent].bind_matrix;
            if parent_bind.determinant().abs() > EPSILON {
                transform = parent_bind.inverse_or_self().mul(&transform);
            }
        }
        if let Some(pose) = record.pose_matrix {
            transform = pose;
            if let Some(parent) = record.parent {
                if let Some(parent_pose) = bones[parent].pose_matrix {
                    if parent_pose.determinant().abs() > EPSILON {
                        transform = parent_pose.inverse_or_self().mul(&transform);
                    }
                }
            }
        }

        self.write_transform_matrix(&transform, animated);

        if animated && record.pose_matrix.is_some() {
            self.export_bone_sampled_animation(node, armature, bone);
        }
    }

    fn export_bone_sampled_animation(&mut self, node: NodeId, armature: usize, bone: usize) {
        let scene = self.scene;
        let bones = &scene.armatures[armature].bones;
        let record = &bones[bone];
        let rest_pose = record.pose_matrix.unwrap_or(record.bind_matrix);

        let mut present = false;
        for frame in self.begin_frame..=self.end_frame {
            if let Some(m) = self.evaluator.bone_pose_at(node, bone, frame as f32) {
                if m.differs_from(&rest_pose) {
                    present = true;
                    break;
                }
            }
        }
        if !present {
            return;
        }

        let frames: Vec<Mat4> = (self.begin_frame..=self.end_frame)
            .map(|frame| {
                let pose = self
                    .evaluator
                    .bone_pose_at(node, bone, frame as f32)
                    .unwrap_or(rest_pose);
                match record.parent {
                    Some(parent) => {
                        let parent_rest = bones[parent]
                            .pose_matrix
                            .unwrap_or(bones[parent].bind_matrix);
                        let parent_pose = self
                            .evaluator
                            .bone_pose_at(node, parent, frame as f32)
                            .unwrap_or(parent_rest);
                        if parent_pose.determinant().abs() > EPSILON {
                            parent_pose.inverse_or_self().mul(&pose)
                        } else {
                            pose
                        }
                    }
                    None => pose,
                }
            })
            .collect();
        self.write_sampled_track(&frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExportOptions;
    use scenegex_core::Vec2;
    use scenegex_scene::{
        BakedFrames, Interpolation, Keyframe, RestPose, Scene, SceneNode, SceneSettings,
    };

    fn settings() -> SceneSettings {
        SceneSettings {
            frame_start: 1,
            frame_end: 21,
            fps: 1.0,
            fps_base: 1.0,
            ..Default::default()
        }
    }

    fn one_node_scene(node: SceneNode) -> Scene {
        Scene {
            nodes: vec![node],
            roots: vec![NodeId(0)],
            settings: settings(),
            ..Default::default()
        }
    }

    fn linear_key(frame: f32, value: f32) -> Keyframe {
        Keyframe {
            frame,
            value,
            handle_left: Vec2::new(frame - 1.0, value),
            handle_right: Vec2::new(frame + 1.0, value),
            interpolation: Interpolation::Linear,
        }
    }

    fn emit(scene: &Scene, options: &ExportOptions) -> String {
        let evaluator = RestPose;
        let mut exporter = Exporter::new(scene, &evaluator, options);
        exporter.export_node_transform(NodeId(0));
        exporter.writer.as_str().to_owned()
    }

    #[test]
    fn test_static_node_emits_single_matrix() {
        let scene = one_node_scene(SceneNode::new("box"));
        let text = emit(&scene, &ExportOptions::default());

        assert!(text.starts_with("Transform\n"));
        assert!(!text.contains("%transform"));
        assert!(!text.contains("Animation"));
    }

    #[test]
    fn test_quaternion_mode_without_baked_frames_collapses_to_static() {
        let mut node = SceneNode::new("spinner");
        node.rotation_mode = RotationMode::Quaternion;
        let scene = one_node_scene(node);
        let text = emit(&scene, &ExportOptions::default());

        assert!(!text.contains("%transform"));
        assert!(!text.contains("Animation"));
    }

    #[test]
    fn test_baked_frames_produce_sampled_track() {
        let mut node = SceneNode::new("spinner");
        node.rotation_mode = RotationMode::Quaternion;
        let scene = one_node_scene(node);

        let mut baked = BakedFrames::new(1);
        let frames: Vec<Mat4> = (0..21)
            .map(|i| Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)))
            .collect();
        baked.set_node_frames(NodeId(0), frames);

        let options = ExportOptions::default();
        let mut exporter = Exporter::new(&scene, &baked, &options);
        exporter.export_node_transform(NodeId(0));
        let text = exporter.writer.as_str().to_owned();

        assert!(text.contains("Transform %transform"));
        assert!(text.contains("Track (target = %transform)"));
        assert!(text.contains("float[16]"));
        // First two key times, one frame-time apart.
        assert!(text.contains("Key {float {0.000000, 1.000000"));
    }

    #[test]
    fn test_decomposed_x_translation_track() {
        let mut node = SceneNode::new("slider");
        node.curves.push(AnimationCurve {
            channel: ChannelPath::Location,
            component: 0,
            keyframes: vec![
                linear_key(1.0, 0.0),
                linear_key(11.0, 5.0),
                linear_key(21.0, 10.0),
            ],
        });
        let scene = one_node_scene(node);
        let text = emit(&scene, &ExportOptions::default());

        assert!(text.contains("Translation %xpos (kind = \"x\")"));
        assert!(text.contains("Animation (begin = 0.000000, end = 20.000000)"));
        assert!(text.contains("Track (target = %xpos)"));
        assert!(text.contains("Key {float {0.000000, 10.000000, 20.000000}}"));
        assert!(text.contains("Key {float {0.000000, 5.000000, 10.000000}}"));
    }

    #[test]
    fn test_bezier_x_translation_leaves_other_axes_static() {
        let bezier_key = |frame: f32, value: f32| Keyframe {
            frame,
            value,
            // Zero tangents: handles sit on the key value.
            handle_left: Vec2::new(frame - 2.0, value),
            handle_right: Vec2::new(frame + 2.0, value),
            interpolation: Interpolation::Bezier,
        };
        let mut node = SceneNode::new("hopper");
        node.curves.push(AnimationCurve {
            channel: ChannelPath::Location,
            component: 0,
            keyframes: vec![
                bezier_key(1.0, 0.0),
                bezier_key(11.0, 5.0),
                bezier_key(21.0, 0.0),
            ],
        });
        let scene = one_node_scene(node);
        let text = emit(&scene, &ExportOptions::default());

        assert!(text.contains("Translation %xpos (kind = \"x\")"));
        assert!(!text.contains("ypos"));
        assert!(!text.contains("zpos"));
        assert!(text.contains("Time (curve = \"bezier\")"));
        assert!(text.contains("Value (curve = \"bezier\")"));
        assert!(text.contains("Key (kind = \"-control\")"));
        assert!(text.contains("Key (kind = \"+control\")"));
        // Three keys on both sides of the track.
        assert!(text.contains("Key {float {0.000000, 10.000000, 20.000000}}"));
        assert!(text.contains("Key {float {0.000000, 5.000000, 0.000000}}"));
    }

    #[test]
    fn test_constant_curve_stays_static() {
        let mut node = SceneNode::new("parked");
        node.curves.push(AnimationCurve {
            channel: ChannelPath::Location,
            component: 2,
            keyframes: vec![linear_key(1.0, 4.0), linear_key(21.0, 4.0)],
        });
        let scene = one_node_scene(node);
        let text = emit(&scene, &ExportOptions::default());

        // Keys never differ beyond EPSILON, so no decomposition happens.
        assert!(text.starts_with("Transform\n"));
        assert!(!text.contains("Animation"));
    }

    #[test]
    fn test_euler_emission_order_is_reversed_mode_order() {
        let mut node = SceneNode::new("tilted");
        node.transform.rotation_euler = Vec3::new(0.1, 0.2, 0.3);
        // Animate one translation axis to force the decomposed shape.
        node.curves.push(AnimationCurve {
            channel: ChannelPath::Location,
            component: 1,
            keyframes: vec![linear_key(1.0, 0.0), linear_key(21.0, 2.0)],
        });
        let scene = one_node_scene(node);
        let text = emit(&scene, &ExportOptions::default());

        let z = text.find("Rotation (kind = \"z\")").unwrap();
        let y = text.find("Rotation (kind = \"y\")").unwrap();
        let x = text.find("Rotation (kind = \"x\")").unwrap();
        assert!(z < y && y < x);
    }

    #[test]
    fn test_nonidentity_static_groups_emit_combined_vectors() {
        let mut node = SceneNode::new("placed");
        node.transform.location = Vec3::new(1.0, 2.0, 3.0);
        node.transform.scale = Vec3::new(2.0, 2.0, 2.0);
        node.curves.push(AnimationCurve {
            channel: ChannelPath::RotationEuler,
            component: 0,
            keyframes: vec![linear_key(1.0, 0.0), linear_key(21.0, 1.5)],
        });
        let scene = one_node_scene(node);
        let text = emit(&scene, &ExportOptions::default());

        assert!(text.contains("Translation\n"));
        assert!(text.contains("float[3] {{1.000000, 2.000000, 3.000000}}"));
        assert!(text.contains("Scale\n"));
        assert!(text.contains("float[3] {{2.000000, 2.000000, 2.000000}}"));
        assert!(text.contains("Rotation %xrot (kind = \"x\")"));
    }
}
