/// LAS/LAZ survey point reader
use crate::error::ConverterResult;
use crate::point_cloud::{Colour, Point, PointCloud};
use las::Reader;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Create LAS file reader for point cloud access.
/// Handles both .las and .laz compressed formats.
pub fn create_reader(file_path: &Path) -> ConverterResult<Reader> {
    let file = File::open(file_path)?;
    let buf_reader = BufReader::new(file);
    Ok(Reader::new(buf_reader)?)
}

/// 16-bit LAS colour channels keep their high byte.
fn las_colour(colour: las::Color) -> Colour {
    Colour::new(
        (colour.red >> 8) as u8,
        (colour.green >> 8) as u8,
        (colour.blue >> 8) as u8,
    )
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_las(path: &Path) -> ConverterResult<PointCloud> {
    let mut reader = create_reader(path)?;
    let header = reader.header();
    let total_points = header.number_of_points() as usize;
    let has_colour = header.point_format().has_color;

    debug!(
        "LAS {}.{} with {} points, point format {:?}",
        header.version().major,
        header.version().minor,
        total_points,
        header.point_format().to_u8()
    );

    let mut points = Vec::with_capacity(total_points);
    let mut colours = Vec::with_capacity(total_points);

    for point_result in reader.points() {
        let point = point_result?;
        points.push(Point::new(point.x as f32, point.y as f32, point.z as f32));
        colours.push(point.color.map(las_colour).unwrap_or_default());
    }

    if !has_colour {
        warn!("LAS point format carries no colour, defaulting to white");
    }

    PointCloud::new(points, colours)
}
