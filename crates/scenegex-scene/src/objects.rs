//! Light and camera snapshot records

use serde::{Deserialize, Serialize};

/// Light source shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    /// Directional light, exported as `infinite`.
    Sun,
    Point,
    Spot,
}

/// Distance attenuation model of a point or spot light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Falloff {
    InverseLinear,
    InverseSquare,
    LinearQuadraticWeighted { linear: f32, quadratic: f32 },
}

/// A light snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub name: String,
    pub kind: LightKind,
    pub color: [f32; 3],
    /// Intensity multiplier; exported as a param only when it is not 1.
    #[serde(default = "default_energy")]
    pub energy: f32,
    #[serde(default)]
    pub shadow: bool,
    #[serde(default)]
    pub falloff: Option<Falloff>,
    /// Attenuation reference distance.
    #[serde(default)]
    pub distance: f32,
    /// Full cone angle of a spot light, radians.
    #[serde(default)]
    pub spot_size: f32,
    /// Softness of the spot edge, 0..1.
    #[serde(default)]
    pub spot_blend: f32,
}

fn default_energy() -> f32 {
    1.0
}

/// A camera snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Horizontal field of view, radians.
    pub fov: f32,
    pub clip_start: f32,
    pub clip_end: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falloff_serde() {
        let f: Falloff = serde_json::from_str(
            r#"{"linear_quadratic_weighted": {"linear": 0.25, "quadratic": 0.75}}"#,
        )
        .unwrap();
        assert_eq!(
            f,
            Falloff::LinearQuadraticWeighted {
                linear: 0.25,
                quadratic: 0.75
            }
        );
    }
}
