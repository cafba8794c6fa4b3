/// Output coordinate system transforms
use crate::point_cloud::Point;
use clap::ValueEnum;
use constants::coordinate_system::{
    IDENTITY, NEG_ALL, NEG_X, NEG_Y, NEG_Z, SWAP_YZ, SWAP_YZ_NEG_Y, SWAP_YZ_NEG_Z,
    transform_coordinates,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CoordinateTransform {
    #[default]
    #[value(name = "none")]
    None,
    #[value(name = "neg_x")]
    NegX,
    #[value(name = "neg_y")]
    NegY,
    #[value(name = "neg_z")]
    NegZ,
    #[value(name = "swap_yz")]
    SwapYz,
    #[value(name = "swap_yz_neg_y")]
    SwapYzNegY,
    #[value(name = "swap_yz_neg_z")]
    SwapYzNegZ,
    #[value(name = "neg_all")]
    NegAll,
}

impl CoordinateTransform {
    pub fn matrix(self) -> &'static [[f64; 3]; 3] {
        match self {
            Self::None => &IDENTITY,
            Self::NegX => &NEG_X,
            Self::NegY => &NEG_Y,
            Self::NegZ => &NEG_Z,
            Self::SwapYz => &SWAP_YZ,
            Self::SwapYzNegY => &SWAP_YZ_NEG_Y,
            Self::SwapYzNegZ => &SWAP_YZ_NEG_Z,
            Self::NegAll => &NEG_ALL,
        }
    }

    /// Transform every point, returning a new position array.
    pub fn apply(self, points: &[Point]) -> Vec<Point> {
        if self == Self::None {
            return points.to_vec();
        }

        let matrix = self.matrix();
        points
            .iter()
            .map(|p| {
                let (x, y, z) = transform_coordinates(matrix, p.x as f64, p.y as f64, p.z as f64);
                Point::new(x as f32, y as f32, z as f32)
            })
            .collect()
    }
}
