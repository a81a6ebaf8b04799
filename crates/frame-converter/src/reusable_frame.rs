use fbcast_media_info::{Pixel, VideoInfo};
use ffmpeg::frame;
use tracing::trace;

use crate::ConvertError;

/// The long-lived output frame, reused across iterations.
///
/// Once a frame has been sent to an encoder, the encoder may keep a reference
/// to its buffers for reordering. Mutable access therefore goes only through
/// [`ReusableFrame::make_writable`], which gives the frame fresh buffers when
/// the current ones are still shared.
pub struct ReusableFrame {
    frame: frame::Video,
}

impl ReusableFrame {
    pub fn new(info: &VideoInfo) -> Result<Self, ConvertError> {
        if info.pixel_format != Pixel::YUV420P {
            return Err(ConvertError::UnsupportedFormat(info.pixel_format));
        }

        if info.width % 2 != 0 || info.height % 2 != 0 {
            return Err(ConvertError::OddDimensions(info.width, info.height));
        }

        Ok(Self {
            frame: info.empty_frame(),
        })
    }

    pub fn frame(&self) -> &frame::Video {
        &self.frame
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    /// Whether nothing else holds a reference to the frame's buffers.
    pub fn is_writable(&self) -> bool {
        unsafe { ffmpeg::ffi::av_frame_is_writable(self.frame.as_ptr() as *mut _) != 0 }
    }

    /// Detaches the frame from any other holder of its buffers and returns it
    /// for writing. Existing contents are preserved.
    pub fn make_writable(&mut self) -> Result<&mut frame::Video, ConvertError> {
        let shared = !self.is_writable();
        let ret = unsafe { ffmpeg::ffi::av_frame_make_writable(self.frame.as_mut_ptr()) };

        if ret < 0 {
            return Err(ConvertError::NotWritable(ffmpeg::Error::from(ret)));
        }

        if shared {
            trace!("Frame buffers still shared, reallocated before writing");
        }

        Ok(&mut self.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_frame_is_writable() {
        let info = VideoInfo::yuv420p(4, 2).unwrap();
        let mut frame = ReusableFrame::new(&info).unwrap();

        assert!(frame.is_writable());
        assert_eq!((frame.width(), frame.height()), (4, 2));
        assert!(frame.make_writable().is_ok());
    }

    #[test]
    fn rejects_packed_formats() {
        let info = VideoInfo::new(Pixel::RGB24, 4, 2, 30).unwrap();

        assert!(matches!(
            ReusableFrame::new(&info),
            Err(ConvertError::UnsupportedFormat(Pixel::RGB24))
        ));
    }
}
