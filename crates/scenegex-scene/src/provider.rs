//! Frame evaluation for sampled animation
//!
//! Sampled transform export needs the posed matrices of nodes and bones at
//! every frame of the animation range. Rather than mutating a live scene's
//! current frame, the exporter pulls evaluated values through the
//! [`FrameEvaluator`] trait: hosts pre-bake their evaluated frames into a
//! [`BakedFrames`] table, and a snapshot with no baked data falls back to
//! [`RestPose`], which answers nothing and lets every sampled channel
//! collapse to its rest value.

use std::collections::HashMap;

use scenegex_core::Mat4;

use crate::node::NodeId;

/// Read-only access to evaluated animation state at a given frame.
///
/// All methods return `None` when no evaluated value exists for the query;
/// callers substitute the rest value.
pub trait FrameEvaluator {
    /// Local (parent-relative) matrix of a node at `frame`.
    fn node_local_at(&self, node: NodeId, frame: f32) -> Option<Mat4>;

    /// Armature-space pose matrix of bone `bone` of the armature attached
    /// to `node`, at `frame`.
    fn bone_pose_at(&self, node: NodeId, bone: usize, frame: f32) -> Option<Mat4>;

    /// Weight of shape key block `block` of the mesh attached to `node`,
    /// at `frame`.
    fn morph_weight_at(&self, node: NodeId, block: usize, frame: f32) -> Option<f32>;
}

/// Evaluator with no animation data. Every query answers `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestPose;

impl FrameEvaluator for RestPose {
    fn node_local_at(&self, _node: NodeId, _frame: f32) -> Option<Mat4> {
        None
    }

    fn bone_pose_at(&self, _node: NodeId, _bone: usize, _frame: f32) -> Option<Mat4> {
        None
    }

    fn morph_weight_at(&self, _node: NodeId, _block: usize, _frame: f32) -> Option<f32> {
        None
    }
}

/// Pre-baked per-frame evaluation tables covering a contiguous frame range
/// starting at `first_frame`. Frame `first_frame + i` maps to index `i` of
/// each stored vector.
#[derive(Debug, Clone, Default)]
pub struct BakedFrames {
    first_frame: i32,
    node_frames: HashMap<NodeId, Vec<Mat4>>,
    bone_frames: HashMap<(NodeId, usize), Vec<Mat4>>,
    morph_frames: HashMap<(NodeId, usize), Vec<f32>>,
}

impl BakedFrames {
    pub fn new(first_frame: i32) -> Self {
        Self {
            first_frame,
            node_frames: HashMap::new(),
            bone_frames: HashMap::new(),
            morph_frames: HashMap::new(),
        }
    }

    pub fn set_node_frames(&mut self, node: NodeId, frames: Vec<Mat4>) {
        self.node_frames.insert(node, frames);
    }

    pub fn set_bone_frames(&mut self, node: NodeId, bone: usize, frames: Vec<Mat4>) {
        self.bone_frames.insert((node, bone), frames);
    }

    pub fn set_morph_frames(&mut self, node: NodeId, block: usize, frames: Vec<f32>) {
        self.morph_frames.insert((node, block), frames);
    }

    fn frame_index(&self, frame: f32) -> Option<usize> {
        let offset = frame.round() as i32 - self.first_frame;
        usize::try_from(offset).ok()
    }
}

impl FrameEvaluator for BakedFrames {
    fn node_local_at(&self, node: NodeId, frame: f32) -> Option<Mat4> {
        let index = self.frame_index(frame)?;
        self.node_frames.get(&node)?.get(index).copied()
    }

    fn bone_pose_at(&self, node: NodeId, bone: usize, frame: f32) -> Option<Mat4> {
        let index = self.frame_index(frame)?;
        self.bone_frames.get(&(node, bone))?.get(index).copied()
    }

    fn morph_weight_at(&self, node: NodeId, block: usize, frame: f32) -> Option<f32> {
        let index = self.frame_index(frame)?;
        self.morph_frames.get(&(node, block))?.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenegex_core::Vec3;

    #[test]
    fn test_rest_pose_answers_nothing() {
        let rest = RestPose;
        assert!(rest.node_local_at(NodeId(0), 1.0).is_none());
        assert!(rest.bone_pose_at(NodeId(0), 3, 1.0).is_none());
        assert!(rest.morph_weight_at(NodeId(0), 0, 1.0).is_none());
    }

    #[test]
    fn test_baked_frame_lookup() {
        let mut baked = BakedFrames::new(10);
        baked.set_node_frames(
            NodeId(2),
            vec![
                Mat4::from_translation(Vec3::new(0.0, 0.0, 0.0)),
                Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)),
            ],
        );

        let at_11 = baked.node_local_at(NodeId(2), 11.0).unwrap();
        assert_eq!(at_11.translation(), Vec3::new(1.0, 0.0, 0.0));

        // Out of range in both directions, and unknown node.
        assert!(baked.node_local_at(NodeId(2), 9.0).is_none());
        assert!(baked.node_local_at(NodeId(2), 12.0).is_none());
        assert!(baked.node_local_at(NodeId(7), 10.0).is_none());
    }

    #[test]
    fn test_baked_morph_weights() {
        let mut baked = BakedFrames::new(0);
        baked.set_morph_frames(NodeId(1), 2, vec![0.0, 0.5, 1.0]);

        assert_eq!(baked.morph_weight_at(NodeId(1), 2, 1.0), Some(0.5));
        assert_eq!(baked.morph_weight_at(NodeId(1), 0, 1.0), None);
    }
}
