mod plane;
pub use plane::*;

mod yuv;
pub use yuv::*;

mod reusable_frame;
pub use reusable_frame::*;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConvertError {
    #[error("Unsupported output format: {0:?}")]
    UnsupportedFormat(ffmpeg::format::Pixel),
    #[error("Dimension mismatch: capture is {input:?}, frame is {output:?}")]
    DimensionMismatch {
        input: (u32, u32),
        output: (u32, u32),
    },
    #[error("Dimensions {0}x{1} are not even")]
    OddDimensions(u32, u32),
    #[error("Plane {plane} too small: needs {expected} bytes, has {actual}")]
    PlaneTooSmall {
        plane: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Frame could not be made writable: {0}")]
    NotWritable(ffmpeg::Error),
}
