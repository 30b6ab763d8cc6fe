//! Armature and bone snapshot records

use scenegex_core::Mat4;
use serde::{Deserialize, Serialize};

use crate::anim::AnimationCurve;

/// One bone of an armature. Bind matrices are in armature space; the pose
/// matrix is the current posed transform, present only when the armature
/// carries a pose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone within the owning armature.
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub children: Vec<usize>,
    /// Rest (bind) matrix in armature space.
    pub bind_matrix: Mat4,
    /// Posed matrix in armature space, if the armature is posed.
    #[serde(default)]
    pub pose_matrix: Option<Mat4>,
    /// Curves animating this bone's pose channels.
    #[serde(default)]
    pub curves: Vec<AnimationCurve>,
    #[serde(default = "default_true")]
    pub selected: bool,
}

fn default_true() -> bool {
    true
}

impl Bone {
    /// True when any pose channel of this bone is keyed.
    pub fn is_animated(&self) -> bool {
        self.curves.iter().any(|c| !c.keyframes.is_empty())
    }
}

/// An armature snapshot: a flat bone table plus the root indices, in the
/// host's bone order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Armature {
    pub name: String,
    pub bones: Vec<Bone>,
    pub roots: Vec<usize>,
}

impl Armature {
    /// Look up a bone index by name.
    pub fn bone_by_name(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// True when any bone of the armature is animated.
    pub fn is_animated(&self) -> bool {
        self.bones.iter().any(Bone::is_animated)
    }
}
