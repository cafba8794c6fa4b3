/// Error types for decoding, downsampling and encoding operations.
use thiserror::Error;

/// Result type for converter operations.
pub type ConverterResult<T> = Result<T, ConverterError>;

#[derive(Debug, Error)]
pub enum ConverterError {
    /// Malformed or unsupported input container, or missing geometry data.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("LAS error: {0}")]
    Las(#[from] las::Error),

    /// Unrecognised input or output file extension.
    #[error("unsupported format: '{extension}'")]
    UnsupportedFormat { extension: String },

    /// An external compressor binary or library is not available.
    #[error("{tool} is not available: {hint}")]
    EncodingDependency { tool: &'static str, hint: String },

    /// An external compressor ran and reported failure.
    #[error("{tool} failed: {message}")]
    EncodingFailure { tool: &'static str, message: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// True for every failure raised while reading a source file.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::Archive(_) | Self::Image(_) | Self::Json(_) | Self::Las(_)
        )
    }

    /// True when remediation means installing a missing compressor.
    pub fn is_missing_dependency(&self) -> bool {
        matches!(self, Self::EncodingDependency { .. })
    }
}
