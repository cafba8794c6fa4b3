/// Canonical point cloud representation shared by every pipeline stage
use crate::bounds::PointCloudBounds;
use crate::error::{ConverterError, ConverterResult};
use constants::colour::DEFAULT_COLOUR;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for Colour {
    fn default() -> Self {
        let [r, g, b] = DEFAULT_COLOUR;
        Self { r, g, b }
    }
}

/// Ordered points with a parallel array of colours. Index `i` of both
/// arrays always refers to the same physical point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    points: Vec<Point>,
    colours: Vec<Colour>,
}

impl PointCloud {
    /// Pair positions with colours, rejecting arrays of different length.
    pub fn new(points: Vec<Point>, colours: Vec<Colour>) -> ConverterResult<Self> {
        if points.len() != colours.len() {
            return Err(ConverterError::InvalidArgument(format!(
                "{} points but {} colours",
                points.len(),
                colours.len()
            )));
        }
        Ok(Self { points, colours })
    }

    /// Points without colour data get the default opaque white.
    pub fn with_default_colour(points: Vec<Point>) -> Self {
        let colours = vec![Colour::default(); points.len()];
        Self { points, colours }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn colours(&self) -> &[Colour] {
        &self.colours
    }

    pub fn into_parts(self) -> (Vec<Point>, Vec<Colour>) {
        (self.points, self.colours)
    }

    pub fn bounds(&self) -> PointCloudBounds {
        PointCloudBounds::from_points(&self.points)
    }

    /// New cloud made of the points at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            points: indices.iter().map(|&i| self.points[i]).collect(),
            colours: indices.iter().map(|&i| self.colours[i]).collect(),
        }
    }

    /// New cloud keeping the points for which `keep` returns true.
    pub fn filter<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Point) -> bool,
    {
        let indices: Vec<usize> = self
            .points
            .iter()
            .enumerate()
            .filter(|(_, p)| keep(p))
            .map(|(i, _)| i)
            .collect();
        self.select(&indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_lengths() {
        let result = PointCloud::new(vec![Point::default(); 2], vec![Colour::default()]);
        assert!(matches!(result, Err(ConverterError::InvalidArgument(_))));
    }

    #[test]
    fn select_keeps_points_and_colours_aligned() {
        let cloud = PointCloud::new(
            vec![Point::new(0.0, 0.0, 0.0), Point::new(1.0, 1.0, 1.0), Point::new(2.0, 2.0, 2.0)],
            vec![Colour::new(0, 0, 0), Colour::new(1, 1, 1), Colour::new(2, 2, 2)],
        )
        .unwrap();

        let picked = cloud.select(&[2, 0]);
        assert_eq!(picked.points(), &[Point::new(2.0, 2.0, 2.0), Point::new(0.0, 0.0, 0.0)]);
        assert_eq!(picked.colours(), &[Colour::new(2, 2, 2), Colour::new(0, 0, 0)]);
    }

    #[test]
    fn default_colour_is_white() {
        let cloud = PointCloud::with_default_colour(vec![Point::default(); 3]);
        assert!(cloud.colours().iter().all(|c| *c == Colour::new(255, 255, 255)));
    }
}
