//! Error type shared by setup and I/O boundaries of the sculpting core.
//!
//! Setup failures (missing shaders, pipelines that fail validation, a grid that
//! cannot be encoded) are fatal and stop initialization. Per-frame problems are
//! never reported through this type; they are clamped or logged instead.

/// Result alias used throughout the crate.
pub type SculptResult<T> = Result<T, SculptError>;

#[derive(Debug, thiserror::Error)]
pub enum SculptError {
    #[error("no shader source registered under \"{name}\"")]
    ShaderMissing { name: String },
    #[error("shader program \"{program}\" failed to build: {message}")]
    ShaderCompilation { program: String, message: String },
    #[error("creating {what} failed validation: {message}")]
    ResourceCreation { what: String, message: String },
    #[error("material parameter \"{name}\" declared twice")]
    DuplicateParam { name: String },
    #[error("material has no parameter \"{name}\"")]
    UnknownParam { name: String },
    #[error("material parameter \"{name}\" is a {actual}, not a {expected}")]
    ParamKind {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("window surface is not supported by the adapter")]
    SurfaceUnsupported,
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("pixel buffer is {actual} bytes, expected {expected} for {width}x{height}x{channels}")]
    PixelBufferSize {
        width: u32,
        height: u32,
        channels: u32,
        expected: usize,
        actual: usize,
    },
    #[error("unsupported channel count {0}, expected 3 or 4")]
    ChannelCount(u32),
    #[error("GPU readback failed: {0}")]
    Readback(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("malformed config {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
