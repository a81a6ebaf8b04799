use crate::{CaptureBuffer, CaptureError, DisplayCapture};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestPattern {
    #[default]
    ColorGradient,
    Checkerboard {
        size: u32,
    },
    SolidColor {
        r: u8,
        g: u8,
        b: u8,
    },
}

/// A synthetic display that renders a [`TestPattern`] on every capture.
///
/// Used wherever a real display server is not available.
#[derive(Debug, Clone)]
pub struct PatternCapture {
    width: u32,
    height: u32,
    pattern: TestPattern,
    frames_captured: u64,
}

impl PatternCapture {
    pub fn new(width: u32, height: u32, pattern: TestPattern) -> Result<Self, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::InvalidDimensions(width as i32, height as i32));
        }

        Ok(Self {
            width,
            height,
            pattern,
            frames_captured: 0,
        })
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }

    fn render(&self) -> CaptureBuffer {
        let (width, height) = (self.width, self.height);
        let phase = (self.frames_captured % 256) as u8;

        match self.pattern {
            TestPattern::SolidColor { r, g, b } => {
                CaptureBuffer::from_fn(width, height, |_, _| [r, g, b])
            }
            TestPattern::Checkerboard { size } => {
                let size = size.max(1);
                CaptureBuffer::from_fn(width, height, |x, y| {
                    if ((x / size) + (y / size)) % 2 == 0 {
                        [255, 255, 255]
                    } else {
                        [0, 0, 0]
                    }
                })
            }
            TestPattern::ColorGradient => CaptureBuffer::from_fn(width, height, |x, y| {
                let (x, y) = (x as u64, y as u64);
                let (w, h) = (width as u64, height as u64);
                [
                    ((x * 255 / w) as u8).wrapping_add(phase),
                    ((y * 255 / h) as u8).wrapping_add(phase),
                    (((x + y) * 255 / (w + h)) as u8).wrapping_add(phase),
                ]
            }),
        }
    }
}

impl DisplayCapture for PatternCapture {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn capture(&mut self) -> Result<CaptureBuffer, CaptureError> {
        let buffer = self.render();
        self.frames_captured += 1;
        Ok(buffer)
    }
}
