//! Keyframe curve classification and track emission
//!
//! A curve is exported as explicit keys only when every keyframe uses
//! linear or Bezier interpolation; anything else falls back to sampling
//! baked frames. Presence tests decide whether a curve changes anything at
//! all, so constant curves never produce animation structures.

use scenegex_core::EPSILON;
use scenegex_scene::{AnimationCurve, FrameEvaluator, Interpolation, Keyframe};

use crate::walker::Exporter;

/// How a curve will be written to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurveKind {
    /// Baked per-frame values; also the fallback for unsupported
    /// interpolation modes.
    #[default]
    Sampled,
    Linear,
    Bezier,
}

/// Classify a curve by its keyframe interpolation modes. Mixed
/// linear/Bezier curves are sampled rather than approximated.
pub fn classify_curve(curve: &AnimationCurve) -> CurveKind {
    let mut linear = 0usize;
    let mut bezier = 0usize;
    for key in &curve.keyframes {
        match key.interpolation {
            Interpolation::Linear => linear += 1,
            Interpolation::Bezier => bezier += 1,
            _ => return CurveKind::Sampled,
        }
    }
    if bezier == 0 {
        CurveKind::Linear
    } else if linear == 0 {
        CurveKind::Bezier
    } else {
        CurveKind::Sampled
    }
}

/// True when any key value deviates from the first key's value by more
/// than EPSILON.
pub fn keys_differ(curve: &AnimationCurve) -> bool {
    let Some(first) = curve.keyframes.first() else {
        return false;
    };
    curve.keyframes[1..]
        .iter()
        .any(|key| (key.value - first.value).abs() > EPSILON)
}

/// True when any key has a Bezier handle whose value deviates from the key
/// value, which bends an otherwise constant curve.
pub fn tangents_nonzero(curve: &AnimationCurve) -> bool {
    curve.keyframes.iter().any(|key| {
        (key.value - key.handle_left.y).abs() > EPSILON
            || (key.handle_right.y - key.value).abs() > EPSILON
    })
}

/// Whether the curve produces any observable animation.
pub fn animation_present(curve: &AnimationCurve, kind: CurveKind) -> bool {
    if kind == CurveKind::Bezier {
        keys_differ(curve) || tangents_nonzero(curve)
    } else {
        keys_differ(curve)
    }
}

impl<E: FrameEvaluator> Exporter<'_, E> {
    fn export_key_times(&mut self, keys: &[Keyframe]) {
        let begin = self.begin_frame as f32;
        self.writer.indent_write("Key {float {", 0, false);
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                self.writer.write(", ");
            }
            self.writer.write_float((key.frame - begin) * self.frame_time);
        }
        self.writer.write("}}\n");
    }

    fn export_key_time_control_points(&mut self, keys: &[Keyframe]) {
        let begin = self.begin_frame as f32;
        self.writer.indent_write("Key (kind = \"-control\") {float {", 0, false);
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                self.writer.write(", ");
            }
            self.writer
                .write_float((key.handle_left.x - begin) * self.frame_time);
        }
        self.writer.write("}}\n");

        self.writer.indent_write("Key (kind = \"+control\") {float {", 0, false);
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                self.writer.write(", ");
            }
            self.writer
                .write_float((key.handle_right.x - begin) * self.frame_time);
        }
        self.writer.write("}}\n");
    }

    fn export_key_values(&mut self, keys: &[Keyframe]) {
        self.writer.indent_write("Key {float {", 0, false);
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                self.writer.write(", ");
            }
            self.writer.write_float(key.value);
        }
        self.writer.write("}}\n");
    }

    fn export_key_value_control_points(&mut self, keys: &[Keyframe]) {
        self.writer.indent_write("Key (kind = \"-control\") {float {", 0, false);
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                self.writer.write(", ");
            }
            self.writer.write_float(key.handle_left.y);
        }
        self.writer.write("}}\n");

        self.writer.indent_write("Key (kind = \"+control\") {float {", 0, false);
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                self.writer.write(", ");
            }
            self.writer.write_float(key.handle_right.y);
        }
        self.writer.write("}}\n");
    }

    /// One `Track` structure for a classified curve. Bezier tracks carry
    /// control-point key arrays on both the time and value sides.
    pub(crate) fn export_animation_track(
        &mut self,
        curve: &AnimationCurve,
        kind: CurveKind,
        target: &str,
        newline: bool,
    ) {
        self.writer.indent_write("Track (target = %", 0, newline);
        self.writer.write(target);
        self.writer.write(")\n");
        self.writer.indent_write("{\n", 0, false);
        self.writer.inc_indent();

        if kind != CurveKind::Bezier {
            self.writer.indent_write("Time\n", 0, false);
            self.writer.indent_write("{\n", 0, false);
            self.writer.inc_indent();
            self.export_key_times(&curve.keyframes);
            self.writer.dec_indent();
            self.writer.indent_write("}\n", 0, false);

            self.writer.indent_write("Value\n", 0, true);
            self.writer.indent_write("{\n", 0, false);
            self.writer.inc_indent();
            self.export_key_values(&curve.keyframes);
            self.writer.dec_indent();
            self.writer.indent_write("}\n", 0, false);
        } else {
            self.writer.indent_write("Time (curve = \"bezier\")\n", 0, false);
            self.writer.indent_write("{\n", 0, false);
            self.writer.inc_indent();
            self.export_key_times(&curve.keyframes);
            self.export_key_time_control_points(&curve.keyframes);
            self.writer.dec_indent();
            self.writer.indent_write("}\n", 0, false);

            self.writer.indent_write("Value (curve = \"bezier\")\n", 0, true);
            self.writer.indent_write("{\n", 0, false);
            self.writer.inc_indent();
            self.export_key_values(&curve.keyframes);
            self.export_key_value_control_points(&curve.keyframes);
            self.writer.dec_indent();
            self.writer.indent_write("}\n", 0, false);
        }

        self.writer.dec_indent();
        self.writer.indent_write("}\n", 0, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenegex_core::Vec2;
    use scenegex_scene::ChannelPath;

    fn curve(keys: Vec<Keyframe>) -> AnimationCurve {
        AnimationCurve {
            channel: ChannelPath::Location,
            component: 0,
            keyframes: keys,
        }
    }

    fn key(frame: f32, value: f32, interpolation: Interpolation) -> Keyframe {
        Keyframe {
            frame,
            value,
            handle_left: Vec2::new(frame - 1.0, value),
            handle_right: Vec2::new(frame + 1.0, value),
            interpolation,
        }
    }

    #[test]
    fn test_classify_totality() {
        let all_linear = curve(vec![
            key(0.0, 0.0, Interpolation::Linear),
            key(10.0, 1.0, Interpolation::Linear),
        ]);
        assert_eq!(classify_curve(&all_linear), CurveKind::Linear);

        let all_bezier = curve(vec![
            key(0.0, 0.0, Interpolation::Bezier),
            key(10.0, 1.0, Interpolation::Bezier),
        ]);
        assert_eq!(classify_curve(&all_bezier), CurveKind::Bezier);

        let mixed = curve(vec![
            key(0.0, 0.0, Interpolation::Linear),
            key(10.0, 1.0, Interpolation::Bezier),
        ]);
        assert_eq!(classify_curve(&mixed), CurveKind::Sampled);

        let constant = curve(vec![key(0.0, 0.0, Interpolation::Constant)]);
        assert_eq!(classify_curve(&constant), CurveKind::Sampled);

        // One unsupported key among many poisons the whole curve.
        let tainted = curve(vec![
            key(0.0, 0.0, Interpolation::Linear),
            key(5.0, 1.0, Interpolation::Constant),
            key(10.0, 2.0, Interpolation::Linear),
        ]);
        assert_eq!(classify_curve(&tainted), CurveKind::Sampled);
    }

    #[test]
    fn test_presence_epsilon() {
        let flat = curve(vec![
            key(0.0, 1.0, Interpolation::Linear),
            key(10.0, 1.0 + 5e-7, Interpolation::Linear),
        ]);
        assert!(!animation_present(&flat, CurveKind::Linear));

        let moving = curve(vec![
            key(0.0, 1.0, Interpolation::Linear),
            key(10.0, 1.0 + 5e-6, Interpolation::Linear),
        ]);
        assert!(animation_present(&moving, CurveKind::Linear));
    }

    #[test]
    fn test_bezier_presence_checks_handles() {
        // Constant values but a bent handle still animates.
        let mut bent = curve(vec![
            key(0.0, 1.0, Interpolation::Bezier),
            key(10.0, 1.0, Interpolation::Bezier),
        ]);
        assert!(!animation_present(&bent, CurveKind::Bezier));

        bent.keyframes[0].handle_right.y = 2.0;
        assert!(animation_present(&bent, CurveKind::Bezier));
    }

    #[test]
    fn test_empty_curve_is_absent() {
        let empty = curve(Vec::new());
        assert_eq!(classify_curve(&empty), CurveKind::Linear);
        assert!(!animation_present(&empty, CurveKind::Linear));
    }
}
