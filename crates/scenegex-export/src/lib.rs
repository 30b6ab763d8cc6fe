//! scenegex export core
//!
//! Turns an immutable scene snapshot into an OpenGEX-style text document:
//! - vertex deindexing and exact-match deduplication
//! - keyframe curve classification (linear / bezier / sampled)
//! - static, sampled, and per-axis decomposed transform emission
//! - skin export with normalized bone weights
//! - geometry, light, camera, and material object structures

pub mod animation;
pub mod material;
pub mod objects;
pub mod skin;
pub mod transform;
pub mod vertex;
pub mod walker;
pub mod writer;

pub use animation::CurveKind;
pub use scenegex_core::{Error, Result};
pub use vertex::{deindex_mesh, unify_vertices, ExportVertex};
pub use walker::Exporter;
pub use writer::OgexWriter;

use scenegex_scene::{FrameEvaluator, Scene};

/// Switches controlling what one export run emits.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Export only nodes flagged as selected.
    pub export_selection_only: bool,
    /// Bake every transform channel instead of writing keyframe tracks.
    pub force_sampled_animation: bool,
    /// Write floats as IEEE-754 bit patterns for lossless round-trips.
    pub float_as_hex: bool,
    pub export_vertex_colors: bool,
    pub export_uvs: bool,
    pub export_normals: bool,
    pub export_materials: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            export_selection_only: false,
            force_sampled_animation: false,
            float_as_hex: false,
            export_vertex_colors: true,
            export_uvs: true,
            export_normals: true,
            export_materials: true,
        }
    }
}

/// Export a scene snapshot to a complete document held in memory.
///
/// The evaluator supplies baked per-frame values for sampled animation;
/// pass [`scenegex_scene::RestPose`] when no baked data exists.
pub fn export_scene<E: FrameEvaluator>(
    scene: &Scene,
    evaluator: &E,
    options: &ExportOptions,
) -> Result<Vec<u8>> {
    Exporter::new(scene, evaluator, options).run()
}
