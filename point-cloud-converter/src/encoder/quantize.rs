/// Fixed-point quantization of positions onto the signed 16-bit range
use crate::bounds::PointCloudBounds;
use crate::point_cloud::Point;
use constants::quantization::{MIN_AXIS_RANGE, SHORT_MAX, SHORT_MIN, SHORT_RANGE};
use serde::{Deserialize, Serialize};

/// Per-axis mapping `value = quantized * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantizationFrame {
    pub offset: [f32; 3],
    pub scale: [f32; 3],
}

impl QuantizationFrame {
    /// Frame mapping each axis's observed min/max onto [-32768, 32767].
    /// Axes with (near) zero extent get a scale of 1.0.
    pub fn from_points(points: &[Point]) -> Self {
        let bounds = PointCloudBounds::from_points(points);
        let (min, max) = if bounds.is_empty() {
            ([0.0; 3], [0.0; 3])
        } else {
            (bounds.min(), bounds.max())
        };

        let mut offset = [0.0f32; 3];
        let mut scale = [1.0f32; 3];
        for axis in 0..3 {
            let range = max[axis] - min[axis];
            let axis_scale = if range < MIN_AXIS_RANGE { 1.0 } else { range / SHORT_RANGE };
            scale[axis] = axis_scale as f32;
            offset[axis] = (min[axis] - SHORT_MIN as f64 * axis_scale) as f32;
        }

        Self { offset, scale }
    }

    pub fn quantize(&self, point: &Point) -> [i16; 3] {
        let mut out = [0i16; 3];
        for (axis, value) in point.to_array().into_iter().enumerate() {
            let scaled = (value as f64 - self.offset[axis] as f64) / self.scale[axis] as f64;
            out[axis] = scaled.round().clamp(SHORT_MIN as f64, SHORT_MAX as f64) as i16;
        }
        out
    }

    pub fn dequantize(&self, quantized: [i16; 3]) -> [f64; 3] {
        let mut out = [0.0f64; 3];
        for axis in 0..3 {
            out[axis] = quantized[axis] as f64 * self.scale[axis] as f64 + self.offset[axis] as f64;
        }
        out
    }

    pub fn quantize_all(&self, points: &[Point]) -> Vec<[i16; 3]> {
        points.iter().map(|p| self.quantize(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn extremes_map_to_short_limits() {
        let points = vec![Point::new(-10.0, 0.0, 5.0), Point::new(10.0, 4.0, 5.0)];
        let frame = QuantizationFrame::from_points(&points);

        assert_eq!(frame.quantize(&points[0])[..2], [-32768, -32768]);
        assert_eq!(frame.quantize(&points[1])[..2], [32767, 32767]);
    }

    #[test]
    fn flat_axis_uses_unit_scale() {
        let points = vec![Point::new(0.0, 2.0, 7.5), Point::new(1.0, 2.0, 7.5)];
        let frame = QuantizationFrame::from_points(&points);

        assert_eq!(frame.scale[1], 1.0);
        assert_eq!(frame.scale[2], 1.0);
        assert_eq!(frame.offset[1], 2.0 + 32768.0);
        assert_eq!(frame.quantize(&points[0])[1], -32768);
    }

    #[test]
    fn round_trip_within_half_step() {
        let mut rng = StdRng::seed_from_u64(11);
        let points: Vec<Point> = (0..5_000)
            .map(|_| {
                Point::new(
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(0.0..3.0),
                    rng.gen_range(-1.0..20.0),
                )
            })
            .collect();
        let frame = QuantizationFrame::from_points(&points);

        for p in &points {
            let restored = frame.dequantize(frame.quantize(p));
            for (axis, value) in p.to_array().into_iter().enumerate() {
                let step = frame.scale[axis] as f64;
                let error = (restored[axis] - value as f64).abs();
                assert!(error <= step / 2.0 + 1e-6, "axis {axis}: {error} > {}", step / 2.0);
            }
        }
    }
}
