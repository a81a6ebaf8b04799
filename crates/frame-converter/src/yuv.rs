use std::{fmt, str::FromStr};

use fbcast_capture::CaptureBuffer;
use ffmpeg::{format::Pixel, frame};

use crate::{ConvertError, PlaneDescriptor, PlaneMut};

const LUMA_SCALE: i32 = 1_000;
const CHROMA_SCALE: i32 = 10_000;
const CHROMA_OFFSET: i32 = 128 * CHROMA_SCALE;

/// `Y = 0.299R + 0.587G + 0.114B`, truncated.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    luma_sum(r as i32, g as i32, b as i32, 1)
}

/// `Cb = -0.1687R - 0.3313G + 0.5B + 128`, truncated.
#[inline]
pub fn chroma_blue(r: u8, g: u8, b: u8) -> u8 {
    chroma_blue_sum(r as i32, g as i32, b as i32, 1)
}

/// `Cr = 0.5R - 0.4187G - 0.0813B + 128`, truncated.
#[inline]
pub fn chroma_red(r: u8, g: u8, b: u8) -> u8 {
    chroma_red_sum(r as i32, g as i32, b as i32, 1)
}

// The `_sum` variants take channel sums over `count` pixels so averaging
// divides only once.

#[inline]
fn luma_sum(r: i32, g: i32, b: i32, count: i32) -> u8 {
    let value = (299 * r + 587 * g + 114 * b) / (LUMA_SCALE * count);
    value.clamp(0, 255) as u8
}

#[inline]
fn chroma_blue_sum(r: i32, g: i32, b: i32, count: i32) -> u8 {
    let value = (-1687 * r - 3313 * g + 5000 * b + CHROMA_OFFSET * count) / (CHROMA_SCALE * count);
    value.clamp(0, 255) as u8
}

#[inline]
fn chroma_red_sum(r: i32, g: i32, b: i32, count: i32) -> u8 {
    let value = (5000 * r - 4187 * g - 813 * b + CHROMA_OFFSET * count) / (CHROMA_SCALE * count);
    value.clamp(0, 255) as u8
}

/// How one chroma sample is derived from its 2x2 block of pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChromaSubsampling {
    /// Take the top-left pixel of the block.
    #[default]
    TopLeft,
    /// Average all four pixels of the block.
    Average,
}

impl fmt::Display for ChromaSubsampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TopLeft => write!(f, "top-left"),
            Self::Average => write!(f, "average"),
        }
    }
}

impl FromStr for ChromaSubsampling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top-left" => Ok(Self::TopLeft),
            "average" => Ok(Self::Average),
            other => Err(format!(
                "unknown chroma subsampling '{other}', expected 'top-left' or 'average'"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChromaPlane {
    Blue,
    Red,
}

/// Converts packed RGB captures into planar YUV 4:2:0 frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorSpaceConverter {
    subsampling: ChromaSubsampling,
}

impl ColorSpaceConverter {
    pub fn new(subsampling: ChromaSubsampling) -> Self {
        Self { subsampling }
    }

    /// Writes `input` into the caller-owned `output` frame. The frame must be
    /// YUV420P, writable, and the same size as the capture.
    pub fn convert(
        &self,
        input: &CaptureBuffer,
        output: &mut frame::Video,
    ) -> Result<(), ConvertError> {
        if output.format() != Pixel::YUV420P {
            return Err(ConvertError::UnsupportedFormat(output.format()));
        }

        let (width, height) = (output.width(), output.height());
        if (input.width(), input.height()) != (width, height) {
            return Err(ConvertError::DimensionMismatch {
                input: (input.width(), input.height()),
                output: (width, height),
            });
        }

        if width % 2 != 0 || height % 2 != 0 {
            return Err(ConvertError::OddDimensions(width, height));
        }

        let [luma, cb, cr] = PlaneDescriptor::yuv420p(output);

        self.fill_luma(input, PlaneMut::from_frame(output, luma)?);
        self.fill_chroma(input, PlaneMut::from_frame(output, cb)?, ChromaPlane::Blue);
        self.fill_chroma(input, PlaneMut::from_frame(output, cr)?, ChromaPlane::Red);

        Ok(())
    }

    fn fill_luma(&self, input: &CaptureBuffer, mut plane: PlaneMut<'_>) {
        for (y, row) in plane.rows_mut().enumerate() {
            for (dst, [r, g, b]) in row.iter_mut().zip(input.row_rgb(y as u32)) {
                *dst = luma(r, g, b);
            }
        }
    }

    fn fill_chroma(&self, input: &CaptureBuffer, mut plane: PlaneMut<'_>, which: ChromaPlane) {
        let chroma: fn(i32, i32, i32, i32) -> u8 = match which {
            ChromaPlane::Blue => chroma_blue_sum,
            ChromaPlane::Red => chroma_red_sum,
        };

        for (cy, row) in plane.rows_mut().enumerate() {
            let y = (cy * 2) as u32;

            match self.subsampling {
                ChromaSubsampling::TopLeft => {
                    for (dst, [r, g, b]) in row.iter_mut().zip(input.row_rgb(y).step_by(2)) {
                        *dst = chroma(r as i32, g as i32, b as i32, 1);
                    }
                }
                ChromaSubsampling::Average => {
                    for (cx, dst) in row.iter_mut().enumerate() {
                        let x = (cx * 2) as u32;
                        let mut sum = [0i32; 3];
                        for [r, g, b] in [
                            input.rgb(x, y),
                            input.rgb(x + 1, y),
                            input.rgb(x, y + 1),
                            input.rgb(x + 1, y + 1),
                        ] {
                            sum[0] += r as i32;
                            sum[1] += g as i32;
                            sum[2] += b as i32;
                        }
                        *dst = chroma(sum[0], sum[1], sum[2], 4);
                    }
                }
            }
        }
    }
}
