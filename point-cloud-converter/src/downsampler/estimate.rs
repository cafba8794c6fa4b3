/// Linear byte-size model and its inverse (target size -> point count)
use crate::encoder::{Compression, OutputFormat};
use constants::estimation::{
    DRC_BYTES_PER_POINT, DRC_OVERHEAD_BYTES, GLB_DRACO_BYTES_PER_POINT,
    GLB_FLOAT_BYTES_PER_POINT, GLB_MESHOPT_BYTES_PER_POINT, GLB_OVERHEAD_BYTES,
    GLB_QUANTIZED_BYTES_PER_POINT, SIZE_REFINE_ITERATIONS, SIZE_REFINE_TOLERANCE,
};

/// bytes ≈ count * bytes_per_point + overhead
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeModel {
    pub bytes_per_point: f64,
    pub overhead: f64,
}

impl SizeModel {
    /// Calibrated constants for an output configuration.
    pub fn for_output(format: OutputFormat, compression: Compression, quantized: bool) -> Self {
        let (bytes_per_point, overhead) = match (format, compression) {
            (OutputFormat::Drc, _) => (DRC_BYTES_PER_POINT, DRC_OVERHEAD_BYTES),
            (OutputFormat::Glb, Compression::Draco) => (GLB_DRACO_BYTES_PER_POINT, GLB_OVERHEAD_BYTES),
            (OutputFormat::Glb, Compression::Meshopt) => {
                (GLB_MESHOPT_BYTES_PER_POINT, GLB_OVERHEAD_BYTES)
            }
            (OutputFormat::Glb, Compression::None) if quantized => {
                (GLB_QUANTIZED_BYTES_PER_POINT, GLB_OVERHEAD_BYTES)
            }
            (OutputFormat::Glb, Compression::None) => (GLB_FLOAT_BYTES_PER_POINT, GLB_OVERHEAD_BYTES),
        };

        Self {
            bytes_per_point,
            overhead,
        }
    }

    /// Estimated output size for `count` points.
    pub fn estimate_file_size(&self, count: usize) -> u64 {
        (count as f64 * self.bytes_per_point + self.overhead) as u64
    }

    /// Point count expected to produce an output of about `target_bytes`.
    /// Never returns less than one point.
    pub fn target_points_for_size(&self, target_bytes: u64) -> usize {
        if target_bytes == 0 {
            return 1;
        }

        let target = target_bytes as f64;
        let available = (target - self.overhead).max(1.0);
        let mut count = (available / self.bytes_per_point).floor();

        for _ in 0..SIZE_REFINE_ITERATIONS {
            let estimated = self.estimate_file_size(count as usize) as f64;
            if estimated <= 0.0 {
                break;
            }
            if (estimated - target).abs() / target < SIZE_REFINE_TOLERANCE {
                break;
            }
            count = (count * target / estimated).floor();
        }

        (count as usize).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_constants_per_output() {
        let drc = SizeModel::for_output(OutputFormat::Drc, Compression::None, false);
        assert_eq!((drc.bytes_per_point, drc.overhead), (6.5, 100.0));

        let draco = SizeModel::for_output(OutputFormat::Glb, Compression::Draco, false);
        assert_eq!((draco.bytes_per_point, draco.overhead), (5.7, 3000.0));

        let quantized = SizeModel::for_output(OutputFormat::Glb, Compression::None, true);
        let float = SizeModel::for_output(OutputFormat::Glb, Compression::None, false);
        assert!(quantized.bytes_per_point < float.bytes_per_point);
    }

    #[test]
    fn inverse_round_trips_within_one_percent() {
        for quantized in [false, true] {
            let model = SizeModel::for_output(OutputFormat::Glb, Compression::None, quantized);
            let target = 500 * 1024;
            let count = model.target_points_for_size(target);
            let estimated = model.estimate_file_size(count) as f64;

            assert!((estimated - target as f64).abs() / (target as f64) < 0.01);
        }
    }

    #[test]
    fn tiny_budgets_clamp_to_one_point() {
        let model = SizeModel::for_output(OutputFormat::Glb, Compression::None, false);
        assert_eq!(model.target_points_for_size(0), 1);
        assert_eq!(model.target_points_for_size(10), 1);
    }

    #[test]
    fn drc_has_smaller_overhead() {
        let model = SizeModel::for_output(OutputFormat::Drc, Compression::None, false);
        assert_eq!(model.target_points_for_size(100 + 650), 100);
    }
}
