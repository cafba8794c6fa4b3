/// Point cloud downsampler and GLB/Draco exporter entry point
use clap::{ArgGroup, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use point_cloud_converter::coordinates::CoordinateTransform;
use point_cloud_converter::filter::{
    FilterCenter, FilterShape, SphereFilter, UpAxis, apply_sphere_filter,
};
use point_cloud_converter::output_name::{
    OutputNameParams, TargetLabel, format_file_size, generate_output_filename, parse_size,
};
use point_cloud_converter::{
    Compression, Compressors, ConverterError, ConverterResult, DownsampleTarget, EncodeOptions,
    OutputFormat, SizeModel, decode, downsample_to_target, export,
};
use std::path::PathBuf;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{Layer, layer::SubscriberExt};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Downsample point clouds (.ply, .sog, .las, .laz) to GLB or Draco")]
#[command(group(ArgGroup::new("target").required(true).args(["points", "size", "percent"])))]
struct Args {
    /// Source point cloud
    input: PathBuf,
    /// Output file (.glb or .drc); derived from the input and options when omitted
    output: Option<PathBuf>,
    /// Target number of points
    #[arg(long)]
    points: Option<usize>,
    /// Target file size, e.g. 500kb, 10mb (bare numbers are kilobytes)
    #[arg(long)]
    size: Option<String>,
    /// Target percentage of source points (0-100)
    #[arg(long)]
    percent: Option<f64>,
    /// Compress GLB geometry with draco_encoder
    #[arg(long)]
    draco: bool,
    /// Compress GLB attribute streams with meshoptimizer (enables quantization)
    #[arg(long)]
    meshopt: bool,
    /// Store positions with KHR_mesh_quantization
    #[arg(long)]
    quant: bool,
    /// Keep only points inside a sphere
    #[arg(long, conflicts_with = "filter_hemisphere")]
    filter_sphere: bool,
    /// Keep only points inside the upper half of a sphere
    #[arg(long)]
    filter_hemisphere: bool,
    /// Filter radius relative to the bounding box diagonal
    #[arg(long)]
    filter_radius: Option<f64>,
    /// Filter center: origin, geometric, or x,y,z
    #[arg(long, default_value = "origin")]
    filter_center: String,
    /// Up axis of the hemisphere filter
    #[arg(long, value_enum, default_value = "y")]
    up_axis: UpAxis,
    /// Coordinate transform applied before encoding
    #[arg(long, value_enum, default_value = "none")]
    transform: CoordinateTransform,
    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

impl Args {
    fn filter(&self) -> ConverterResult<Option<SphereFilter>> {
        let shape = match (self.filter_sphere, self.filter_hemisphere) {
            (true, _) => Some(FilterShape::Sphere),
            (false, true) => Some(FilterShape::Hemisphere { up: self.up_axis }),
            (false, false) => None,
        };

        match (shape, self.filter_radius) {
            (None, None) => Ok(None),
            (None, Some(_)) => Err(ConverterError::InvalidArgument(
                "--filter-radius needs --filter-sphere or --filter-hemisphere".into(),
            )),
            (Some(_), None) => Err(ConverterError::InvalidArgument(
                "--filter-radius is required with a sphere or hemisphere filter".into(),
            )),
            (Some(_), Some(radius)) if radius <= 0.0 => Err(ConverterError::InvalidArgument(
                format!("filter radius must be greater than 0, got {radius}"),
            )),
            (Some(shape), Some(radius)) => Ok(Some(SphereFilter {
                shape,
                center: FilterCenter::parse(&self.filter_center)?,
                radius_relative: radius,
            })),
        }
    }

    fn target_label(&self) -> TargetLabel {
        match (self.percent, &self.size, self.points) {
            (Some(p), _, _) => TargetLabel::Percent(p),
            (None, Some(s), _) => TargetLabel::Size(s.clone()),
            (None, None, n) => TargetLabel::Points(n.unwrap_or_default()),
        }
    }
}

fn downsample_progress() -> ConverterResult<ProgressBar> {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("[{bar:40.cyan/blue}] {pos}/{len} voxels ({percent}%) {msg}")
        .map_err(|e| ConverterError::InvalidArgument(e.to_string()))?
        .progress_chars("▉▊▋▌▍▎▏ ");
    pb.set_style(style);
    pb.set_message("Downsampling");
    Ok(pb)
}

fn run(args: &Args) -> ConverterResult<()> {
    let compression = Compression::from_flags(args.draco, args.meshopt)?;
    let filter = args.filter()?;

    let output = match &args.output {
        Some(path) => path.clone(),
        None => {
            let params = OutputNameParams {
                filter: filter.map(|f| f.shape),
                filter_radius: filter.map(|f| f.radius_relative),
                filter_center: filter.map(|f| f.center).unwrap_or_default(),
                target: args.target_label(),
                compression,
                quant_explicit: args.quant && compression != Compression::Draco,
            };
            let path = generate_output_filename(&args.input, &params);
            info!("Output: {}", path.display());
            path
        }
    };

    // Reject unusable options before reading anything.
    let options = EncodeOptions {
        format: OutputFormat::from_path(&output)?,
        compression,
        quantize: args.quant,
        transform: args.transform,
    }
    .normalized()?;
    let size_bytes = args.size.as_deref().map(parse_size).transpose()?;

    let mut cloud = decode(&args.input)?;
    let source_count = cloud.len();

    if let Some(filter) = &filter {
        let (filtered, report) = apply_sphere_filter(&cloud, filter)?;
        info!(
            "Filter center ({:.2}, {:.2}, {:.2}), radius {:.2}: {} -> {} points",
            report.center[0],
            report.center[1],
            report.center[2],
            report.radius_absolute,
            report.points_before,
            report.points_after
        );
        cloud = filtered;
    }

    let target = match (args.percent, size_bytes, args.points) {
        (Some(p), _, _) => DownsampleTarget::Percent(p),
        (None, Some(size), _) => {
            info!("Target size: {}", format_file_size(size));
            DownsampleTarget::Bytes {
                size,
                model: SizeModel::for_output(options.format, options.compression, options.quantize),
            }
        }
        (None, None, Some(n)) => DownsampleTarget::Points(n),
        (None, None, None) => {
            return Err(ConverterError::InvalidArgument(
                "one of --points, --size or --percent is required".into(),
            ));
        }
    };

    let pb = downsample_progress()?;
    let reduced = downsample_to_target(cloud, &target, Some(&pb));
    pb.finish_and_clear();
    let reduced = reduced?;
    info!("Downsampled {} -> {} points", source_count, reduced.len());

    let written = export(&reduced, &output, &options, &Compressors::default())?;

    println!(
        "{}: {} points, {}",
        output.display(),
        reduced.len(),
        format_file_size(written)
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_filter(LevelFilter::from(args.log_level));
    tracing::subscriber::set_global_default(tracing_subscriber::registry().with(fmt_layer))?;

    info!("{:?}", args);

    if let Err(e) = run(&args) {
        error!("{e}");
        return Err(e.into());
    }
    Ok(())
}
