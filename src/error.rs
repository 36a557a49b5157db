//! Errors raised by the evaluation pipeline.

/// Everything that can go wrong while configuring or evaluating a frame.
///
/// The invalid-parameter variants are raised when a value is constructed, so a
/// frame that starts evaluating can't fail on arithmetic.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("max_iterations must be at least 2, got {0}")]
    InvalidMaxIterations(u32),

    #[error("escape radius squared must be finite and positive, got {0}")]
    InvalidEscapeRadius(f32),

    #[error("zoom must be finite and positive, got {0}")]
    InvalidZoom(f32),

    #[error("view centre must be finite, got ({real}, {imaginary})")]
    InvalidCenter { real: f32, imaginary: f32 },

    #[error("palette needs at least 2 samples, got {0}")]
    InvalidSampleCount(usize),

    #[error("unknown gradient {0:?}")]
    UnknownGradient(String),

    #[error("invalid gradient: {0}")]
    InvalidGradient(String),

    #[error("no suitable graphics adapter found")]
    NoAdapter,

    #[error("failed to request graphics device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("failed to map buffer: {0}")]
    BufferAsync(#[from] wgpu::BufferAsyncError),

    #[error("readback channel closed before the buffer was mapped")]
    ReadbackAborted,

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
