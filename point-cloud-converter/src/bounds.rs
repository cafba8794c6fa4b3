/// Point cloud coordinate bounds tracking
use crate::point_cloud::Point;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const BOUNDS_CHUNK_SIZE: usize = 25_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointCloudBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl Default for PointCloudBounds {
    fn default() -> Self {
        Self::new()
    }
}

impl PointCloudBounds {
    /// Create new bounds initialised to infinity values
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
            min_z: f64::INFINITY,
            max_z: f64::NEG_INFINITY,
        }
    }

    /// Calculate bounds over all points in parallel chunks.
    pub fn from_points(points: &[Point]) -> Self {
        points
            .par_chunks(BOUNDS_CHUNK_SIZE)
            .map(|chunk| {
                let mut local_bounds = PointCloudBounds::new();
                for point in chunk {
                    local_bounds.update(point.x as f64, point.y as f64, point.z as f64);
                }
                local_bounds
            })
            .reduce_with(|a, b| a.merge(&b))
            .unwrap_or_else(PointCloudBounds::new)
    }

    /// Update bounds with a new point
    pub fn update(&mut self, x: f64, y: f64, z: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
        self.min_z = self.min_z.min(z);
        self.max_z = self.max_z.max(z);
    }

    /// Union of two bounds
    pub fn merge(mut self, other: &PointCloudBounds) -> Self {
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
        self.min_z = self.min_z.min(other.min_z);
        self.max_z = self.max_z.max(other.max_z);
        self
    }

    /// True until at least one point has been added
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x
    }

    pub fn min(&self) -> [f64; 3] {
        [self.min_x, self.min_y, self.min_z]
    }

    pub fn max(&self) -> [f64; 3] {
        [self.max_x, self.max_y, self.max_z]
    }

    /// Get world space dimensions
    pub fn dimensions(&self) -> (f64, f64, f64) {
        if self.is_empty() {
            return (0.0, 0.0, 0.0);
        }
        (
            self.max_x - self.min_x,
            self.max_y - self.min_y,
            self.max_z - self.min_z,
        )
    }

    /// Length of the bounding box diagonal
    pub fn diagonal(&self) -> f64 {
        let (dx, dy, dz) = self.dimensions();
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}
