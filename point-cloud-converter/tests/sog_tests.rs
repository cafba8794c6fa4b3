use image::{ImageOutputFormat, RgbImage};
use point_cloud_converter::decoder::colour::sh_dc_to_colour;
use point_cloud_converter::decoder::sog::{decode_sog_bytes, inverse_log_transform};
use point_cloud_converter::{Colour, decode};
use serde_json::json;
use std::io::{Cursor, Write};
use zip::write::{FileOptions, ZipWriter};

/// Encode one RGB pixel per point. PNG bytes stand in for webp; the
/// decoder sniffs the format from content.
fn raster(pixels: &[[u8; 3]]) -> Vec<u8> {
    let raw: Vec<u8> = pixels.iter().flatten().copied().collect();
    let image = RgbImage::from_raw(pixels.len() as u32, 1, raw).unwrap();
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageOutputFormat::Png).unwrap();
    out.into_inner()
}

fn archive(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn codebook() -> Vec<f64> {
    (0..256).map(|i| (i as f64 - 128.0) / 64.0).collect()
}

fn meta(count: usize) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "version": 2,
        "count": count,
        "means": {
            "mins": [-1.0, -1.0, -1.0],
            "maxs": [4.0, 4.0, 4.0],
            "files": ["means_l.webp", "means_u.webp"]
        },
        "sh0": {
            "codebook": codebook(),
            "files": ["sh0.webp"]
        }
    }))
    .unwrap()
}

// raw 0 -> min, raw 65535 -> max, raw 13107 (= 65535 / 5) -> log-space 0
const LOW: [[u8; 3]; 3] = [[0, 0, 0], [255, 255, 255], [51, 51, 51]];
const HIGH: [[u8; 3]; 3] = [[0, 0, 0], [255, 255, 255], [51, 51, 51]];

fn assert_close(actual: f32, expected: f64) {
    assert!(
        (actual as f64 - expected).abs() <= 1e-5 * expected.abs().max(1.0),
        "{actual} != {expected}"
    );
}

#[test]
fn decodes_positions_through_inverse_log() {
    let data = archive(&[
        ("meta.json", meta(3)),
        ("means_l.webp", raster(&LOW)),
        ("means_u.webp", raster(&HIGH)),
        ("sh0.webp", raster(&[[128, 128, 128], [192, 64, 255], [0, 0, 0]])),
    ]);
    let cloud = decode_sog_bytes(data).unwrap();
    assert_eq!(cloud.len(), 3);

    let points = cloud.points();
    for value in points[0].to_array() {
        assert_close(value, inverse_log_transform(-1.0));
    }
    for value in points[1].to_array() {
        assert_close(value, inverse_log_transform(4.0));
    }
    for value in points[2].to_array() {
        assert!(value.abs() < 1e-6, "log-space zero decoded to {value}");
    }
}

#[test]
fn colours_index_the_codebook_per_channel() {
    let data = archive(&[
        ("meta.json", meta(3)),
        ("means_l.webp", raster(&LOW)),
        ("means_u.webp", raster(&HIGH)),
        ("sh0.webp", raster(&[[128, 128, 128], [192, 64, 255], [0, 0, 0]])),
    ]);
    let cloud = decode_sog_bytes(data).unwrap();
    let book = codebook();

    assert_eq!(cloud.colours()[0], sh_dc_to_colour([0.0, 0.0, 0.0]));
    assert_eq!(cloud.colours()[1], sh_dc_to_colour([book[192], book[64], book[255]]));
    assert_eq!(cloud.colours()[2], sh_dc_to_colour([book[0], book[0], book[0]]));
}

#[test]
fn missing_colour_raster_defaults_to_white() {
    let data = archive(&[
        ("meta.json", meta(3)),
        ("means_l.webp", raster(&LOW)),
        ("means_u.webp", raster(&HIGH)),
    ]);
    let cloud = decode_sog_bytes(data).unwrap();
    assert_eq!(cloud.colours(), &[Colour::new(255, 255, 255); 3]);
}

#[test]
fn short_colour_raster_is_padded_with_white() {
    let data = archive(&[
        ("meta.json", meta(3)),
        ("means_l.webp", raster(&LOW)),
        ("means_u.webp", raster(&HIGH)),
        ("sh0.webp", raster(&[[128, 128, 128]])),
    ]);
    let cloud = decode_sog_bytes(data).unwrap();
    assert_eq!(cloud.colours().len(), 3);
    assert_eq!(cloud.colours()[2], Colour::new(255, 255, 255));
}

#[test]
fn missing_geometry_raster_is_fatal() {
    let data = archive(&[("meta.json", meta(3)), ("means_l.webp", raster(&LOW))]);
    let err = decode_sog_bytes(data).unwrap_err();
    assert!(err.is_decode_error(), "{err}");
}

#[test]
fn missing_metadata_is_fatal() {
    let data = archive(&[("means_l.webp", raster(&LOW))]);
    assert!(decode_sog_bytes(data).unwrap_err().is_decode_error());
}

#[test]
fn decodes_from_disk_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.SOG");
    std::fs::write(
        &path,
        archive(&[
            ("meta.json", meta(3)),
            ("means_l.webp", raster(&LOW)),
            ("means_u.webp", raster(&HIGH)),
        ]),
    )
    .unwrap();

    let cloud = decode(&path).unwrap();
    assert_eq!(cloud.len(), 3);
}

#[test]
fn overflowing_point_count_is_a_decode_error() {
    let data = archive(&[
        ("meta.json", meta(usize::MAX / 2)),
        ("means_l.webp", raster(&LOW[..2])),
        ("means_u.webp", raster(&HIGH[..2])),
    ]);
    let err = decode_sog_bytes(data).unwrap_err();
    assert!(err.is_decode_error(), "{err}");
}

#[test]
fn point_count_beyond_raster_is_a_decode_error() {
    let data = archive(&[
        ("meta.json", meta(4)),
        ("means_l.webp", raster(&LOW)),
        ("means_u.webp", raster(&HIGH)),
    ]);
    let err = decode_sog_bytes(data).unwrap_err();
    assert!(err.is_decode_error(), "{err}");
    assert!(err.to_string().contains("expected at least 4"), "{err}");
}
