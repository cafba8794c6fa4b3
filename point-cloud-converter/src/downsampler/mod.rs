/// Voxel downsampling to a point, percentage or byte budget
pub mod estimate;
pub mod voxel;

pub use estimate::SizeModel;
pub use voxel::{
    VoxelSizeSearch, count_occupied_voxels, downsample_voxel_grid_nearest,
    find_voxel_size_for_target, voxel_keys,
};

use crate::error::{ConverterError, ConverterResult};
use crate::point_cloud::PointCloud;
use constants::estimation::VOXEL_COUNT_TOLERANCE;
use indicatif::ProgressBar;
use tracing::{debug, info, instrument, warn};

/// How much of the cloud to keep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DownsampleTarget {
    Points(usize),
    /// Percentage of the source point count, within [0, 100].
    Percent(f64),
    /// Output file size in bytes, converted through the size model.
    Bytes { size: u64, model: SizeModel },
}

impl DownsampleTarget {
    /// Resolve to a point count for a cloud of `source_count` points.
    pub fn resolve(&self, source_count: usize) -> ConverterResult<usize> {
        let count = match *self {
            DownsampleTarget::Points(n) => n,
            DownsampleTarget::Percent(p) => {
                if !(0.0..=100.0).contains(&p) {
                    return Err(ConverterError::InvalidArgument(format!(
                        "percentage must be between 0 and 100, got {p}"
                    )));
                }
                (source_count as f64 * p / 100.0).floor() as usize
            }
            DownsampleTarget::Bytes { size, model } => {
                let count = model.target_points_for_size(size);
                debug!(
                    "Target size {size} bytes -> {count} points (estimated {} bytes)",
                    model.estimate_file_size(count)
                );
                count
            }
        };

        if count == 0 {
            return Err(ConverterError::InvalidArgument(format!(
                "{self:?} resolves to zero points"
            )));
        }
        Ok(count)
    }
}

/// Pick `target` entries spread evenly across the cloud's current order.
fn thin_evenly(cloud: &PointCloud, target: usize) -> PointCloud {
    let len = cloud.len() as u128;
    let indices: Vec<usize> = (0..target as u128)
        .map(|i| (i * len / target as u128) as usize)
        .collect();
    cloud.select(&indices)
}

/// Reduce `cloud` to roughly `target_count` points, each an original
/// point of the input. Returns the input untouched when it already fits.
#[instrument(skip(cloud, progress), fields(points = cloud.len()))]
pub fn downsample(
    cloud: PointCloud,
    target_count: usize,
    progress: Option<&ProgressBar>,
) -> ConverterResult<PointCloud> {
    if target_count >= cloud.len() {
        debug!("Target {target_count} >= {} points, nothing to do", cloud.len());
        return Ok(cloud);
    }
    if target_count == 0 {
        return Ok(PointCloud::default());
    }

    let search = find_voxel_size_for_target(cloud.points(), target_count, VOXEL_COUNT_TOLERANCE)?;
    info!(
        "Voxel size {:.6} after {} iterations ({} occupied)",
        search.voxel_size, search.iterations, search.occupied
    );

    let (reduced, _) = downsample_voxel_grid_nearest(&cloud, search.voxel_size, progress)?;
    let deviation = (reduced.len() as f64 - target_count as f64).abs() / target_count as f64;
    if deviation <= VOXEL_COUNT_TOLERANCE {
        return Ok(reduced);
    }

    // No voxel size lands inside the window: start from a reduction that
    // overshoots and thin it down to the exact count.
    let base = if reduced.len() > target_count {
        reduced
    } else if let Some(size) = search.overshoot_size {
        downsample_voxel_grid_nearest(&cloud, size, progress)?.0
    } else {
        warn!(
            "Could not reach {target_count} points, keeping {} voxels",
            reduced.len()
        );
        return Ok(reduced);
    };

    if base.len() <= target_count {
        return Ok(base);
    }
    debug!("Thinning {} voxels to {target_count} points", base.len());
    Ok(thin_evenly(&base, target_count))
}

/// Resolve `target` against the cloud and downsample.
pub fn downsample_to_target(
    cloud: PointCloud,
    target: &DownsampleTarget,
    progress: Option<&ProgressBar>,
) -> ConverterResult<PointCloud> {
    let count = target.resolve(cloud.len())?;
    downsample(cloud, count, progress)
}
