mod buffer;
pub use buffer::*;

mod pattern;
pub use pattern::*;

#[cfg(x11)]
pub mod x11;
#[cfg(x11)]
pub use x11::X11Capture;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Could not open display connection to '{0}'")]
    DisplayUnavailable(String),
    #[error("Display reported invalid dimensions {0}x{1}")]
    InvalidDimensions(i32, i32),
    #[error("Failed to read image of {width}x{height} from the display")]
    ImageUnavailable { width: u32, height: u32 },
    #[error("Unsupported pixel layout: {0} bits per pixel")]
    UnsupportedLayout(u32),
    #[error("Pixel buffer too small: expected at least {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },
}

/// A source of full-screen images.
///
/// Each call to [`DisplayCapture::capture`] blocks until the whole region
/// `(0, 0)`–`(width, height)` has been read and returns a buffer owned by the
/// caller. Failures are not retried.
pub trait DisplayCapture {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn capture(&mut self) -> Result<CaptureBuffer, CaptureError>;
}

impl<T: DisplayCapture + ?Sized> DisplayCapture for Box<T> {
    fn width(&self) -> u32 {
        (**self).width()
    }

    fn height(&self) -> u32 {
        (**self).height()
    }

    fn capture(&mut self) -> Result<CaptureBuffer, CaptureError> {
        (**self).capture()
    }
}

/// Rounds a reported display dimension down to the nearest even value, since
/// 4:2:0 chroma needs whole 2x2 blocks.
pub fn even_dimension(value: i32) -> Result<u32, i32> {
    if value <= 0 {
        return Err(value);
    }

    match (value as u32) & !1 {
        0 => Err(value),
        even => Ok(even),
    }
}
