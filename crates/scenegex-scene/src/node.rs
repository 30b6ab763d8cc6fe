//! Scene node snapshot records

use scenegex_core::{Mat4, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::anim::AnimationCurve;

/// Stable identifier of a node within one scene snapshot. Ids index into
/// [`crate::Scene::nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Rotation representation of a node. Euler variants carry their rotation
/// order; quaternion and axis-angle rotations always force sampled
/// animation export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationMode {
    #[default]
    #[serde(rename = "XYZ")]
    Xyz,
    #[serde(rename = "XZY")]
    Xzy,
    #[serde(rename = "YXZ")]
    Yxz,
    #[serde(rename = "YZX")]
    Yzx,
    #[serde(rename = "ZXY")]
    Zxy,
    #[serde(rename = "ZYX")]
    Zyx,
    #[serde(rename = "QUATERNION")]
    Quaternion,
    #[serde(rename = "AXIS_ANGLE")]
    AxisAngle,
}

impl RotationMode {
    /// True for the modes that cannot be decomposed into per-axis euler
    /// tracks.
    pub fn forces_sampled(self) -> bool {
        matches!(self, RotationMode::Quaternion | RotationMode::AxisAngle)
    }

    /// Axis indices in document emission order: the rotation-order string
    /// reversed, so "XYZ" emits z, then y, then x. Euler modes only.
    pub fn emission_axes(self) -> [usize; 3] {
        match self {
            RotationMode::Xyz => [2, 1, 0],
            RotationMode::Xzy => [1, 2, 0],
            RotationMode::Yxz => [2, 0, 1],
            RotationMode::Yzx => [0, 2, 1],
            RotationMode::Zxy => [1, 0, 2],
            RotationMode::Zyx | RotationMode::Quaternion | RotationMode::AxisAngle => [0, 1, 2],
        }
    }
}

/// Local transform components of a node, including the delta variants that
/// combine additively with the base channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeTransform {
    pub location: Vec3,
    pub delta_location: Vec3,
    pub rotation_euler: Vec3,
    pub delta_rotation_euler: Vec3,
    pub rotation_quaternion: Quat,
    pub delta_rotation_quaternion: Quat,
    /// (angle, axis x, axis y, axis z)
    pub rotation_axis_angle: Vec4,
    pub scale: Vec3,
    pub delta_scale: Vec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            delta_location: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            delta_rotation_euler: Vec3::ZERO,
            rotation_quaternion: Quat::IDENTITY,
            delta_rotation_quaternion: Quat::IDENTITY,
            rotation_axis_angle: Vec4::new(0.0, 0.0, 1.0, 0.0),
            scale: Vec3::ONE,
            delta_scale: Vec3::ONE,
        }
    }
}

/// Object data attached to a node, referencing the scene object tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeData {
    #[default]
    None,
    Mesh(usize),
    Light(usize),
    Camera(usize),
    Armature(usize),
}

/// One node of the snapshot arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub data: NodeData,

    /// Resolved local rest matrix (the host's `matrix_local`).
    #[serde(default)]
    pub rest_matrix: Mat4,
    #[serde(default)]
    pub transform: NodeTransform,
    #[serde(default)]
    pub rotation_mode: RotationMode,
    #[serde(default)]
    pub curves: Vec<AnimationCurve>,

    /// Material table indices per slot, mesh nodes only.
    #[serde(default)]
    pub material_slots: Vec<usize>,
    /// Vertex group names in slot order, mesh nodes only.
    #[serde(default)]
    pub vertex_groups: Vec<String>,

    /// Selection flag for export-selection-only runs.
    #[serde(default = "default_true")]
    pub selected: bool,
    /// Hidden geometry nodes are exported with `visible = false`.
    #[serde(default)]
    pub hide_render: bool,

    /// Name of the bone this node is attached to, if bone-parented.
    #[serde(default)]
    pub parent_bone: Option<String>,
    /// Relative bone parenting skips the inverse pose-transform correction.
    #[serde(default)]
    pub parent_bone_relative: bool,
}

fn default_true() -> bool {
    true
}

impl SceneNode {
    /// Create a bare generic node with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            data: NodeData::None,
            rest_matrix: Mat4::IDENTITY,
            transform: NodeTransform::default(),
            rotation_mode: RotationMode::Xyz,
            curves: Vec::new(),
            material_slots: Vec::new(),
            vertex_groups: Vec::new(),
            selected: true,
            hide_render: false,
            parent_bone: None,
            parent_bone_relative: false,
        }
    }
}
