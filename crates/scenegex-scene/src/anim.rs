//! Animation curve snapshot records

use scenegex_core::Vec2;
use serde::{Deserialize, Serialize};

/// The transform property a curve drives. Each curve targets exactly one
/// scalar component of one of these channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelPath {
    Location,
    DeltaLocation,
    RotationEuler,
    DeltaRotationEuler,
    RotationQuaternion,
    DeltaRotationQuaternion,
    RotationAxisAngle,
    Scale,
    DeltaScale,
}

/// Keyframe interpolation mode as recorded by the host. Anything the
/// exporter does not recognize deserializes as `Unsupported` and forces the
/// owning curve to be sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Linear,
    Bezier,
    Constant,
    #[serde(other)]
    Unsupported,
}

/// A single keyframe: frame number, value, and Bezier handles in
/// (frame, value) space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: f32,
    pub value: f32,
    pub handle_left: Vec2,
    pub handle_right: Vec2,
    pub interpolation: Interpolation,
}

/// An ordered keyframe curve driving one component of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationCurve {
    pub channel: ChannelPath,
    /// Component index within the channel (0 = x, 1 = y, 2 = z; quaternion
    /// and axis-angle channels use 0..4).
    pub component: usize,
    pub keyframes: Vec<Keyframe>,
}

impl AnimationCurve {
    /// Frame range covered by this curve, `None` for an empty curve.
    pub fn frame_range(&self) -> Option<(f32, f32)> {
        let first = self.keyframes.first()?;
        let mut min = first.frame;
        let mut max = first.frame;
        for key in &self.keyframes[1..] {
            min = min.min(key.frame);
            max = max.max(key.frame);
        }
        Some((min, max))
    }
}

/// Frame range covered by a set of curves, mirroring the host's notion of
/// an action's frame range.
pub fn curves_frame_range(curves: &[AnimationCurve]) -> Option<(f32, f32)> {
    let mut range: Option<(f32, f32)> = None;
    for curve in curves {
        if let Some((min, max)) = curve.frame_range() {
            range = Some(match range {
                Some((lo, hi)) => (lo.min(min), hi.max(max)),
                None => (min, max),
            });
        }
    }
    range
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(frame: f32, value: f32) -> Keyframe {
        Keyframe {
            frame,
            value,
            handle_left: Vec2::new(frame - 1.0, value),
            handle_right: Vec2::new(frame + 1.0, value),
            interpolation: Interpolation::Bezier,
        }
    }

    #[test]
    fn test_frame_range() {
        let curve = AnimationCurve {
            channel: ChannelPath::Location,
            component: 0,
            keyframes: vec![key(10.0, 1.0), key(0.0, 2.0), key(25.0, 3.0)],
        };
        assert_eq!(curve.frame_range(), Some((0.0, 25.0)));
    }

    #[test]
    fn test_combined_frame_range() {
        let a = AnimationCurve {
            channel: ChannelPath::Location,
            component: 0,
            keyframes: vec![key(5.0, 0.0), key(12.0, 1.0)],
        };
        let b = AnimationCurve {
            channel: ChannelPath::Scale,
            component: 2,
            keyframes: vec![key(1.0, 1.0), key(30.0, 2.0)],
        };
        assert_eq!(curves_frame_range(&[a, b]), Some((1.0, 30.0)));
        assert_eq!(curves_frame_range(&[]), None);
    }

    #[test]
    fn test_unknown_interpolation_deserializes_as_unsupported() {
        let json = r#"{"frame": 0.0, "value": 1.0,
                       "handle_left": {"x": -1.0, "y": 1.0},
                       "handle_right": {"x": 1.0, "y": 1.0},
                       "interpolation": "elastic"}"#;
        let key: Keyframe = serde_json::from_str(json).unwrap();
        assert_eq!(key.interpolation, Interpolation::Unsupported);
    }
}
