pub use ffmpeg::{format::pixel::Pixel, util::rational::Rational as FFRational};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VideoInfoError {
    #[error("Invalid dimensions {0}x{1}: width and height must be positive")]
    Empty(u32, u32),
    #[error("Invalid dimensions {0}x{1}: width and height must be even for 4:2:0 chroma")]
    OddDimensions(u32, u32),
}

/// Geometry and timing of the raw video handed to the encoder.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    pub pixel_format: Pixel,
    pub width: u32,
    pub height: u32,
    pub time_base: FFRational,
    pub frame_rate: FFRational,
}

impl VideoInfo {
    pub const DEFAULT_TIME_BASE: FFRational = FFRational(1, 15);
    pub const DEFAULT_FPS: u32 = 120;

    /// Planar 4:2:0 video of the given size, with the default time base and frame rate.
    pub fn yuv420p(width: u32, height: u32) -> Result<Self, VideoInfoError> {
        Self::new(Pixel::YUV420P, width, height, Self::DEFAULT_FPS)
    }

    pub fn new(
        pixel_format: Pixel,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Self, VideoInfoError> {
        if width == 0 || height == 0 {
            return Err(VideoInfoError::Empty(width, height));
        }

        if width % 2 != 0 || height % 2 != 0 {
            return Err(VideoInfoError::OddDimensions(width, height));
        }

        Ok(Self {
            pixel_format,
            width,
            height,
            time_base: Self::DEFAULT_TIME_BASE,
            frame_rate: FFRational(fps as i32, 1),
        })
    }

    pub fn with_time_base(mut self, time_base: FFRational) -> Self {
        self.time_base = time_base;
        self
    }

    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.frame_rate = FFRational(fps as i32, 1);
        self
    }

    /// Size of each chroma plane for 4:2:0 subsampling.
    pub fn chroma_size(&self) -> (u32, u32) {
        (self.width / 2, self.height / 2)
    }

    pub fn empty_frame(&self) -> ffmpeg::frame::Video {
        ffmpeg::frame::Video::new(self.pixel_format, self.width, self.height)
    }
}
