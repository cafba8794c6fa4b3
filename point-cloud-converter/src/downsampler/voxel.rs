/// Voxel grid binning, voxel size search and nearest-to-centroid reduction
use crate::bounds::PointCloudBounds;
use crate::error::{ConverterError, ConverterResult};
use crate::point_cloud::{Point, PointCloud};
use constants::estimation::VOXEL_SEARCH_ITERATIONS;
use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{debug, instrument};

/// Row-major voxel key for every point at the given cell size.
///
/// Cell indices are shifted so the smallest occupied index on each axis is
/// zero, then flattened as `ix * (ey * ez) + iy * ez + iz`. Two points share
/// a key exactly when they fall in the same cell.
pub fn voxel_keys(points: &[Point], voxel_size: f64) -> ConverterResult<Vec<u64>> {
    if !(voxel_size.is_finite() && voxel_size > 0.0) {
        return Err(ConverterError::InvalidArgument(format!(
            "voxel size must be positive, got {voxel_size}"
        )));
    }

    let cells: Vec<[i64; 3]> = points
        .par_iter()
        .map(|p| {
            [
                (p.x as f64 / voxel_size).floor() as i64,
                (p.y as f64 / voxel_size).floor() as i64,
                (p.z as f64 / voxel_size).floor() as i64,
            ]
        })
        .collect();

    let mut min = [i64::MAX; 3];
    let mut max = [i64::MIN; 3];
    for cell in &cells {
        for axis in 0..3 {
            min[axis] = min[axis].min(cell[axis]);
            max[axis] = max[axis].max(cell[axis]);
        }
    }
    if cells.is_empty() {
        return Ok(Vec::new());
    }

    let extent = |axis: usize| (max[axis] - min[axis]) as u64 + 1;
    let (ey, ez) = (extent(1), extent(2));
    let stride_x = extent(0)
        .checked_mul(ey)
        .and_then(|v| v.checked_mul(ez))
        .map(|_| ey * ez)
        .ok_or_else(|| {
            ConverterError::InvalidArgument(format!(
                "voxel size {voxel_size} is too small for a 64-bit grid key"
            ))
        })?;

    Ok(cells
        .par_iter()
        .map(|c| {
            let ix = (c[0] - min[0]) as u64;
            let iy = (c[1] - min[1]) as u64;
            let iz = (c[2] - min[2]) as u64;
            ix * stride_x + iy * ez + iz
        })
        .collect())
}

/// Number of distinct occupied cells at the given voxel size.
pub fn count_occupied_voxels(points: &[Point], voxel_size: f64) -> ConverterResult<usize> {
    let mut keys = voxel_keys(points, voxel_size)?;
    keys.par_sort_unstable();
    keys.dedup();
    Ok(keys.len())
}

/// Outcome of the voxel size bisection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelSizeSearch {
    /// Last midpoint evaluated, the best-effort answer.
    pub voxel_size: f64,
    /// Occupied cells at `voxel_size`.
    pub occupied: usize,
    pub iterations: usize,
    pub converged: bool,
    /// Initial lower bound of the search.
    pub lower_bound: f64,
    /// Largest size seen that still produced more cells than the target.
    pub overshoot_size: Option<f64>,
}

/// Bisect for a voxel size whose occupied cell count is within `tolerance`
/// of `target`. Never fails to produce a size; returns the last midpoint
/// when the search does not converge.
#[instrument(skip(points))]
pub fn find_voxel_size_for_target(
    points: &[Point],
    target: usize,
    tolerance: f64,
) -> ConverterResult<VoxelSizeSearch> {
    let diagonal = PointCloudBounds::from_points(points).diagonal();

    // All points coincide (or there are none): any size gives one cell.
    if target == 0 || !(diagonal > 0.0) {
        return Ok(VoxelSizeSearch {
            voxel_size: 1.0,
            occupied: points.len().min(1),
            iterations: 0,
            converged: target == points.len().min(1),
            lower_bound: 1.0,
            overshoot_size: None,
        });
    }

    let target_f = target as f64;
    let lower_bound = diagonal / (target_f.cbrt() * 10.0);
    let mut vmin = lower_bound;
    let mut vmax = diagonal / 2.0;
    let mut vmid = (vmin + vmax) / 2.0;
    let mut occupied = 0;
    let mut overshoot_size = None;

    for iteration in 1..=VOXEL_SEARCH_ITERATIONS {
        vmid = (vmin + vmax) / 2.0;
        occupied = count_occupied_voxels(points, vmid)?;

        if (occupied as f64 - target_f).abs() / target_f <= tolerance {
            debug!("Voxel size {vmid:.6} gives {occupied} cells after {iteration} iterations");
            return Ok(VoxelSizeSearch {
                voxel_size: vmid,
                occupied,
                iterations: iteration,
                converged: true,
                lower_bound,
                overshoot_size,
            });
        }

        // Too many cells means the cells are too small.
        if occupied > target {
            vmin = vmid;
            overshoot_size = Some(vmid);
        } else {
            vmax = vmid;
        }
    }

    debug!("Voxel size search did not converge, using {vmid:.6} ({occupied} cells)");
    Ok(VoxelSizeSearch {
        voxel_size: vmid,
        occupied,
        iterations: VOXEL_SEARCH_ITERATIONS,
        converged: false,
        lower_bound,
        overshoot_size,
    })
}

/// Index of the member closest to the members' centroid. Ties resolve to
/// the first member in slice order.
fn nearest_to_centroid(points: &[Point], members: &[usize]) -> usize {
    let mut centroid = [0.0f64; 3];
    for &i in members {
        centroid[0] += points[i].x as f64;
        centroid[1] += points[i].y as f64;
        centroid[2] += points[i].z as f64;
    }
    let n = members.len() as f64;
    centroid = [centroid[0] / n, centroid[1] / n, centroid[2] / n];

    let mut best = members[0];
    let mut best_distance = f64::INFINITY;
    for &i in members {
        let dx = points[i].x as f64 - centroid[0];
        let dy = points[i].y as f64 - centroid[1];
        let dz = points[i].z as f64 - centroid[2];
        let distance = dx * dx + dy * dy + dz * dz;
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best
}

/// Keep one original point per occupied voxel: the one nearest the voxel's
/// centroid. Output is ordered by voxel key; the selected source indices
/// are returned alongside.
#[instrument(skip(cloud, progress))]
pub fn downsample_voxel_grid_nearest(
    cloud: &PointCloud,
    voxel_size: f64,
    progress: Option<&ProgressBar>,
) -> ConverterResult<(PointCloud, Vec<usize>)> {
    let points = cloud.points();
    let keys = voxel_keys(points, voxel_size)?;

    // Stable sort keeps input order inside each voxel.
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.par_sort_by_key(|&i| keys[i]);

    let mut groups = Vec::new();
    let mut start = 0;
    for end in 1..=order.len() {
        if end == order.len() || keys[order[end]] != keys[order[start]] {
            groups.push((start, end));
            start = end;
        }
    }

    if let Some(pb) = progress {
        pb.set_length(groups.len() as u64);
        pb.set_position(0);
    }

    let selected: Vec<usize> = groups
        .par_iter()
        .map(|&(start, end)| {
            let chosen = nearest_to_centroid(points, &order[start..end]);
            if let Some(pb) = progress {
                pb.inc(1);
            }
            chosen
        })
        .collect();

    debug!("Reduced {} points to {} voxels", points.len(), selected.len());
    Ok((cloud.select(&selected), selected))
}
