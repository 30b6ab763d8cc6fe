//! Scene snapshot model for scenegex
//!
//! The host scene graph is a live, mutable object graph. This crate models
//! it as an immutable arena of snapshot records captured once at export
//! start: nodes addressed by [`NodeId`], object data (meshes, armatures,
//! lights, cameras, materials) held in parallel tables and referenced by
//! index. Nothing here holds live back-references.

pub mod anim;
pub mod armature;
pub mod material;
pub mod mesh;
pub mod node;
pub mod objects;
pub mod provider;
pub mod scene;

pub use anim::{AnimationCurve, ChannelPath, Interpolation, Keyframe};
pub use armature::{Armature, Bone};
pub use material::{Material, MaterialChannel, Shader};
pub use mesh::{Mesh, ShapeKeyBlock, ShapeKeys, Triangle, VertexGroupWeight};
pub use node::{NodeData, NodeId, RotationMode, SceneNode};
pub use objects::{Camera, Falloff, Light, LightKind};
pub use provider::{BakedFrames, FrameEvaluator, RestPose};
pub use scene::{Scene, SceneSettings, UnitSystem};
