use point_cloud_converter::encoder::glb::{Gltf, read_glb};
use point_cloud_converter::encoder::{PointCloudCompressor, VertexBufferCompressor};
use point_cloud_converter::{
    Colour, Compression, Compressors, ConverterError, ConverterResult, DownsampleTarget,
    EncodeOptions, Point, PointCloud, decode, downsample_to_target, export,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Stands in for draco_encoder: a recognisable blob sized by point count.
struct FakeDraco;

impl PointCloudCompressor for FakeDraco {
    fn compress(&self, points: &[Point], colours: &[Colour]) -> ConverterResult<Vec<u8>> {
        assert_eq!(points.len(), colours.len());
        Ok(b"DRACO".iter().copied().cycle().take(points.len() * 3 + 2).collect())
    }
}

/// Stands in for meshoptimizer: keeps every other byte.
struct FakeMeshopt;

impl VertexBufferCompressor for FakeMeshopt {
    fn compress(&self, vertices: &[u8], count: usize, stride: usize) -> ConverterResult<Vec<u8>> {
        assert_eq!(vertices.len(), count * stride);
        Ok(vertices.iter().step_by(2).copied().collect())
    }
}

fn fakes() -> Compressors {
    Compressors {
        point_cloud: Box::new(FakeDraco),
        vertex_buffer: Box::new(FakeMeshopt),
    }
}

fn grid_cloud(side: usize) -> PointCloud {
    let mut points = Vec::new();
    let mut colours = Vec::new();
    for x in 0..side {
        for y in 0..side {
            for z in 0..side {
                points.push(Point::new(x as f32 * 0.5, y as f32 * 0.5 - 3.0, z as f32 * 0.25));
                colours.push(Colour::new(x as u8, y as u8, z as u8));
            }
        }
    }
    PointCloud::new(points, colours).unwrap()
}

/// Every region a view points at (directly or through the meshopt
/// extension) starts aligned, none overlap, and each buffer's declared
/// length covers exactly its regions plus inner padding.
fn assert_layout(doc: &Gltf) {
    let regions: Vec<(usize, usize, usize)> = doc
        .buffer_views
        .iter()
        .flat_map(|v| {
            let compressed = v
                .extensions
                .as_ref()
                .map(|ext| (ext.meshopt.buffer, ext.meshopt.byte_offset, ext.meshopt.byte_length));
            std::iter::once((v.buffer, v.byte_offset, v.byte_length)).chain(compressed)
        })
        .collect();

    for (index, buffer) in doc.buffers.iter().enumerate() {
        let mut spans: Vec<(usize, usize)> = regions
            .iter()
            .filter(|r| r.0 == index)
            .map(|r| (r.1, r.2))
            .collect();
        spans.sort();

        let mut end = 0;
        for &(offset, length) in &spans {
            assert_eq!(offset % 4, 0, "region at {offset} is not aligned");
            assert!(offset >= end, "region at {offset} overlaps previous ending at {end}");
            assert!(offset - end < 4, "more padding than alignment requires");
            end = offset + length;
        }
        assert_eq!(buffer.byte_length, end, "buffer {index} length");
    }
}

fn export_and_read(cloud: &PointCloud, name: &str, options: EncodeOptions) -> (Gltf, Vec<u8>, u64) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let written = export(cloud, &path, &options, &fakes()).unwrap();
    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len() as u64, written);
    assert_eq!(bytes.len() % 4, 0);
    let (doc, bin) = read_glb(&bytes).unwrap();
    (doc, bin, written)
}

#[test]
fn float_glb_round_trips_positions() {
    let cloud = grid_cloud(3);
    let (doc, bin, _) = export_and_read(&cloud, "grid.glb", EncodeOptions::default());
    assert_layout(&doc);

    let view = &doc.buffer_views[0];
    let decoded: Vec<f32> = bin[view.byte_offset..view.byte_offset + view.byte_length]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    let expected: Vec<f32> = cloud.points().iter().flat_map(|p| p.to_array()).collect();
    assert_eq!(decoded, expected);
}

#[test]
fn every_glb_variant_keeps_aligned_layout() {
    // 27 points: SHORT positions (162 bytes) force padding before colours
    let cloud = grid_cloud(3);
    for (compression, quantize) in [
        (Compression::None, false),
        (Compression::None, true),
        (Compression::Draco, false),
        (Compression::Meshopt, true),
    ] {
        let options = EncodeOptions {
            compression,
            quantize,
            ..Default::default()
        };
        let (doc, _, _) = export_and_read(&cloud, "variant.glb", options);
        assert_layout(&doc);
        assert_eq!(doc.accessors[0].count, 27);
        assert_eq!(doc.accessors[0].min, Some(vec![0.0, -3.0, 0.0]));
        assert_eq!(doc.accessors[0].max, Some(vec![1.0, -2.0, 0.5]));
    }
}

#[test]
fn quantized_positions_dequantize_through_node_transform() {
    let cloud = grid_cloud(4);
    let options = EncodeOptions {
        quantize: true,
        ..Default::default()
    };
    let (doc, bin, _) = export_and_read(&cloud, "quant.glb", options);

    let node = &doc.nodes[0];
    let (offset, scale) = (node.translation.unwrap(), node.scale.unwrap());
    let view = &doc.buffer_views[0];
    let shorts: Vec<i16> = bin[view.byte_offset..view.byte_offset + view.byte_length]
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();

    for (p, q) in cloud.points().iter().zip(shorts.chunks_exact(3)) {
        for axis in 0..3 {
            let restored = q[axis] as f64 * scale[axis] as f64 + offset[axis] as f64;
            let step = scale[axis] as f64;
            assert!((restored - p.to_array()[axis] as f64).abs() <= step / 2.0 + 1e-6);
        }
    }
}

#[test]
fn drc_export_writes_compressor_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloud.drc");
    let cloud = grid_cloud(2);
    let written = export(&cloud, &path, &EncodeOptions::default(), &fakes()).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(written, 8 * 3 + 2);
    assert!(bytes.starts_with(b"DRACO"));
}

#[test]
fn unsupported_extensions_are_rejected_up_front() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloud.obj");
    let err = export(&grid_cloud(2), &path, &EncodeOptions::default(), &fakes()).unwrap_err();
    assert!(matches!(err, ConverterError::UnsupportedFormat { ref extension } if extension == "obj"));
    assert!(!path.exists());

    let err = decode(Path::new("missing.e57")).unwrap_err();
    assert!(matches!(err, ConverterError::UnsupportedFormat { .. }));
}

#[test]
fn ply_to_glb_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.ply");

    let mut ply = String::from(
        "ply\nformat ascii 1.0\nelement vertex 1000\nproperty float x\nproperty float y\nproperty float z\nproperty uchar red\nproperty uchar green\nproperty uchar blue\nend_header\n",
    );
    for i in 0..1000 {
        let (x, y, z) = (i % 10, (i / 10) % 10, i / 100);
        ply.push_str(&format!("{x} {y} {z} {} {} {}\n", x * 20, y * 20, z * 20));
    }
    fs::write(&input, ply).unwrap();

    let cloud = decode(&input).unwrap();
    assert_eq!(cloud.len(), 1000);
    let source: BTreeSet<[u32; 3]> = cloud
        .points()
        .iter()
        .map(|p| p.to_array().map(f32::to_bits))
        .collect();

    let reduced = downsample_to_target(cloud, &DownsampleTarget::Percent(12.5), None).unwrap();
    assert!((118..=132).contains(&reduced.len()), "got {}", reduced.len());
    assert!(reduced.points().iter().all(|p| source.contains(&p.to_array().map(f32::to_bits))));

    let output = dir.path().join("scan_prcnt_12(5).glb");
    let written = export(&reduced, &output, &EncodeOptions::default(), &fakes()).unwrap();
    let (doc, _) = read_glb(&fs::read(&output).unwrap()).unwrap();
    assert_eq!(doc.accessors[0].count, reduced.len());
    assert!(written > 0);
}
