/// Sphere and hemisphere spatial filters applied before downsampling
use crate::error::{ConverterError, ConverterResult};
use crate::point_cloud::{Point, PointCloud};
use clap::ValueEnum;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum UpAxis {
    #[default]
    Y,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterShape {
    Sphere,
    /// Upper half of the sphere along `up`.
    Hemisphere { up: UpAxis },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FilterCenter {
    #[default]
    Origin,
    /// Centroid of the unfiltered cloud.
    Geometric,
    Custom([f32; 3]),
}

impl FilterCenter {
    /// Parse `origin`, `geometric`, `x,y,z` or `x y z`.
    pub fn parse(input: &str) -> ConverterResult<Self> {
        let input = input.trim().to_lowercase();
        match input.as_str() {
            "origin" => return Ok(Self::Origin),
            "geometric" => return Ok(Self::Geometric),
            _ => {}
        }

        let parts: Vec<&str> = if input.contains(',') {
            input.split(',').map(str::trim).collect()
        } else {
            input.split_whitespace().collect()
        };

        if parts.len() != 3 {
            return Err(ConverterError::InvalidArgument(format!(
                "invalid center '{input}', expected 'origin', 'geometric' or three numbers"
            )));
        }

        let mut coords = [0.0f32; 3];
        for (coord, part) in coords.iter_mut().zip(&parts) {
            *coord = part.parse().map_err(|_| {
                ConverterError::InvalidArgument(format!("invalid center coordinate '{part}'"))
            })?;
        }
        Ok(Self::Custom(coords))
    }

    fn resolve(self, points: &[Point]) -> [f64; 3] {
        match self {
            Self::Origin => [0.0; 3],
            Self::Custom(c) => [c[0] as f64, c[1] as f64, c[2] as f64],
            Self::Geometric => geometric_center(points),
        }
    }
}

/// Filter parameters; the radius is relative to the bounding box diagonal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereFilter {
    pub shape: FilterShape,
    pub center: FilterCenter,
    pub radius_relative: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterReport {
    pub center: [f64; 3],
    pub radius_absolute: f64,
    pub points_before: usize,
    pub points_after: usize,
}

/// Centroid of all points, origin for an empty set.
pub fn geometric_center(points: &[Point]) -> [f64; 3] {
    if points.is_empty() {
        return [0.0; 3];
    }
    let mut sum = [0.0f64; 3];
    for p in points {
        sum[0] += p.x as f64;
        sum[1] += p.y as f64;
        sum[2] += p.z as f64;
    }
    let n = points.len() as f64;
    [sum[0] / n, sum[1] / n, sum[2] / n]
}

#[instrument(skip_all)]
pub fn apply_sphere_filter(
    cloud: &PointCloud,
    filter: &SphereFilter,
) -> ConverterResult<(PointCloud, FilterReport)> {
    if !(filter.radius_relative.is_finite() && filter.radius_relative >= 0.0) {
        return Err(ConverterError::InvalidArgument(format!(
            "filter radius must be a non-negative number, got {}",
            filter.radius_relative
        )));
    }

    let center = filter.center.resolve(cloud.points());
    let radius_absolute = filter.radius_relative * cloud.bounds().diagonal();
    let radius_squared = radius_absolute * radius_absolute;

    let filtered = cloud.filter(|p| {
        let d = [
            p.x as f64 - center[0],
            p.y as f64 - center[1],
            p.z as f64 - center[2],
        ];
        let inside = d[0] * d[0] + d[1] * d[1] + d[2] * d[2] <= radius_squared;
        match filter.shape {
            FilterShape::Sphere => inside,
            FilterShape::Hemisphere { up: UpAxis::Y } => inside && d[1] >= 0.0,
            FilterShape::Hemisphere { up: UpAxis::Z } => inside && d[2] >= 0.0,
        }
    });

    let report = FilterReport {
        center,
        radius_absolute,
        points_before: cloud.len(),
        points_after: filtered.len(),
    };
    info!(
        "Filter kept {}/{} points (radius {:.3})",
        report.points_after, report.points_before, report.radius_absolute
    );

    Ok((filtered, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point_cloud::Colour;

    fn line_cloud() -> PointCloud {
        // Diagonal of the bounding box is 10 along x.
        let points: Vec<Point> = (-5..=5).map(|i| Point::new(i as f32, 0.0, 0.0)).collect();
        let colours = (0..points.len()).map(|i| Colour::new(i as u8, 0, 0)).collect();
        PointCloud::new(points, colours).unwrap()
    }

    #[test]
    fn parses_centers() {
        assert_eq!(FilterCenter::parse(" Origin ").unwrap(), FilterCenter::Origin);
        assert_eq!(FilterCenter::parse("geometric").unwrap(), FilterCenter::Geometric);
        assert_eq!(
            FilterCenter::parse("1.5, 2, -3").unwrap(),
            FilterCenter::Custom([1.5, 2.0, -3.0])
        );
        assert_eq!(FilterCenter::parse("1 2 3").unwrap(), FilterCenter::Custom([1.0, 2.0, 3.0]));
        assert!(FilterCenter::parse("1,2").is_err());
        assert!(FilterCenter::parse("a,b,c").is_err());
    }

    #[test]
    fn sphere_uses_relative_radius() {
        let filter = SphereFilter {
            shape: FilterShape::Sphere,
            center: FilterCenter::Origin,
            radius_relative: 0.2,
        };
        let (filtered, report) = apply_sphere_filter(&line_cloud(), &filter).unwrap();

        assert_eq!(report.radius_absolute, 2.0);
        assert_eq!(filtered.len(), 5);
        assert_eq!(filtered.points()[0], Point::new(-2.0, 0.0, 0.0));
        // colours stay attached to their points
        assert_eq!(filtered.colours()[0], Colour::new(3, 0, 0));
    }

    #[test]
    fn hemisphere_keeps_upper_half() {
        let points = vec![
            Point::new(0.0, 1.0, 0.0),
            Point::new(0.0, -1.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
            Point::new(0.0, 0.0, -1.0),
        ];
        let cloud = PointCloud::with_default_colour(points);
        let filter = SphereFilter {
            shape: FilterShape::Hemisphere { up: UpAxis::Z },
            center: FilterCenter::Origin,
            radius_relative: 1.0,
        };
        let (filtered, _) = apply_sphere_filter(&cloud, &filter).unwrap();

        assert_eq!(
            filtered.points(),
            &[Point::new(0.0, 1.0, 0.0), Point::new(0.0, -1.0, 0.0), Point::new(0.0, 0.0, 1.0)]
        );
    }

    #[test]
    fn geometric_center_is_centroid() {
        let cloud = PointCloud::with_default_colour(vec![
            Point::new(10.0, 0.0, 0.0),
            Point::new(12.0, 2.0, 0.0),
        ]);
        let filter = SphereFilter {
            shape: FilterShape::Sphere,
            center: FilterCenter::Geometric,
            radius_relative: 0.0,
        };
        let (filtered, report) = apply_sphere_filter(&cloud, &filter).unwrap();
        assert_eq!(report.center, [11.0, 1.0, 0.0]);
        assert!(filtered.is_empty());
    }

    #[test]
    fn rejects_negative_radius() {
        let filter = SphereFilter {
            shape: FilterShape::Sphere,
            center: FilterCenter::Origin,
            radius_relative: -1.0,
        };
        assert!(apply_sphere_filter(&line_cloud(), &filter).is_err());
    }
}
