//! Bézier envelope over normalized `[0, 1]`.
//!
//! One curve type serves both clip volume fades and automation ramps: sorted
//! control points with a per-segment "bend" coefficient. Between neighbors
//! `(x0, y0)` and `(x1, y1)` with bend `b`, the curve is the quadratic Bézier
//! whose control point is the segment midpoint shifted vertically by `b`.
//! Small bends degenerate to a straight line.

use crate::buffer::AudioBuffer;

/// Bend magnitude below which a segment is treated as a straight line.
const BEND_EPSILON: f32 = 0.005;

/// Which end of a buffer a fade applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeSide {
    /// Fade the first `duration` frames.
    In,
    /// Fade the last `duration` frames.
    Out,
}

/// A piecewise quadratic Bézier curve defined by control points and bends.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    points: Vec<(f32, f32)>,
    bends: Vec<f32>,
}

impl Envelope {
    /// Build an envelope. Points are sorted by x; missing bends pad to 0.
    pub fn new(mut points: Vec<(f32, f32)>, mut bends: Vec<f32>) -> Self {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        let segments = points.len().saturating_sub(1);
        bends.resize(segments, 0.0);
        Self { points, bends }
    }

    /// Straight 0→1 ramp.
    pub fn linear() -> Self {
        Self::new(vec![(0.0, 0.0), (1.0, 1.0)], vec![0.0])
    }

    /// Control points, sorted by x.
    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    /// Per-segment bend coefficients.
    pub fn bends(&self) -> &[f32] {
        &self.bends
    }

    /// Curve value at normalized `x`. Before the first point the first y is
    /// returned; after the last point, the last y.
    pub fn eval(&self, x: f32) -> f32 {
        let pts = &self.points;
        match pts.len() {
            0 => return 0.0,
            1 => return pts[0].1,
            _ => {}
        }
        if x <= pts[0].0 {
            return pts[0].1;
        }
        if x >= pts[pts.len() - 1].0 {
            return pts[pts.len() - 1].1;
        }
        for i in 0..pts.len() - 1 {
            let (x0, y0) = pts[i];
            let (x1, y1) = pts[i + 1];
            if x0 <= x && x <= x1 {
                let dx = x1 - x0;
                if dx < 1e-9 {
                    return y0;
                }
                let t = (x - x0) / dx;
                let bend = self.bends.get(i).copied().unwrap_or(0.0);
                return bezier_y(y0, y1, bend, t);
            }
        }
        pts[pts.len() - 1].1
    }

    /// Sample the curve at `n` evenly spaced x positions, clamped to [0, 1].
    pub fn sample_curve(&self, n: usize) -> Vec<f32> {
        let mut curve = Vec::with_capacity(n);
        let denom = n.saturating_sub(1).max(1) as f32;
        for i in 0..n {
            let x = i as f32 / denom;
            curve.push(self.eval(x).clamp(0.0, 1.0));
        }
        curve
    }
}

/// Quadratic Bézier y at parameter `t` with the control point shifted by
/// `bend` from the segment midpoint.
fn bezier_y(y0: f32, y1: f32, bend: f32, t: f32) -> f32 {
    if bend.abs() < BEND_EPSILON {
        return y0 + t * (y1 - y0);
    }
    let cy = (y0 + y1) / 2.0 + bend;
    let u = 1.0 - t;
    u * u * y0 + 2.0 * u * t * cy + t * t * y1
}

/// Piecewise-linear interpolation over sorted control points — the simplified
/// form the automation engine uses for parameter ramping.
pub fn interpolate_curve(points: &[(f32, f32)], x: f32) -> f32 {
    match points.len() {
        0 => return 0.0,
        1 => return points[0].1,
        _ => {}
    }
    if x <= points[0].0 {
        return points[0].1;
    }
    if x >= points[points.len() - 1].0 {
        return points[points.len() - 1].1;
    }
    for i in 0..points.len() - 1 {
        let (x0, y0) = points[i];
        let (x1, y1) = points[i + 1];
        if x0 <= x && x <= x1 {
            if (x1 - x0).abs() < 1e-9 {
                return y0;
            }
            let t = (x - x0) / (x1 - x0);
            return y0 + t * (y1 - y0);
        }
    }
    points[points.len() - 1].1
}

/// Multiply the first or last `duration` frames of `audio` by the envelope
/// curve, identically across channels. Returns a fresh buffer.
pub fn apply_envelope_fade(
    audio: &AudioBuffer,
    duration: usize,
    envelope: &Envelope,
    side: FadeSide,
) -> AudioBuffer {
    let mut result = audio.clone();
    let frames = result.frames();
    let n = duration.min(frames);
    if n <= 1 {
        return result;
    }
    let curve = envelope.sample_curve(n);
    let offset = match side {
        FadeSide::In => 0,
        FadeSide::Out => frames - n,
    };
    for (i, gain) in curve.iter().enumerate() {
        for c in 0..result.channels() {
            let v = result.sample(offset + i, c) * gain;
            result.set_sample(offset + i, c, v);
        }
    }
    result
}
