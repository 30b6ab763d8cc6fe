//! Material snapshot records
//!
//! Materials are captured as the resolved channel values of the host's
//! principled surface shader. Each channel may carry a constant color, a
//! constant scalar, and/or a texture image path.

use serde::{Deserialize, Serialize};

/// One shader input channel. A channel with a texture exports the texture;
/// constants export as colors or params.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialChannel {
    pub color: Option<[f32; 3]>,
    pub value: Option<f32>,
    /// Image file path as recorded by the host.
    pub texture: Option<String>,
}

impl MaterialChannel {
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.value.is_none() && self.texture.is_none()
    }
}

/// Resolved principled-shader channels of a material.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Shader {
    pub base_color: MaterialChannel,
    pub specular: MaterialChannel,
    pub roughness: MaterialChannel,
    pub metallic: MaterialChannel,
    pub emission: MaterialChannel,
    pub alpha: MaterialChannel,
    /// Normal map image path, if the material has one wired up.
    pub normal_texture: Option<String>,
}

/// A material snapshot. Materials without a recognized shader still export
/// as named, empty material structures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default)]
    pub shader: Option<Shader>,
}
