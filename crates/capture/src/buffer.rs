use crate::CaptureError;

/// Location of one colour channel inside a raw pixel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMask {
    mask: u32,
    shift: u32,
    bits: u32,
}

impl ChannelMask {
    pub const fn new(mask: u32) -> Self {
        Self {
            mask,
            shift: if mask == 0 { 0 } else { mask.trailing_zeros() },
            bits: mask.count_ones(),
        }
    }

    /// Extracts the channel and rescales it to 8 bits.
    #[inline]
    pub fn extract(&self, pixel: u32) -> u8 {
        let value = (pixel & self.mask) >> self.shift;

        match self.bits {
            0 => 0,
            8 => value as u8,
            bits if bits > 8 => (value >> (bits - 8)) as u8,
            bits => {
                let max = (1u32 << bits) - 1;
                ((value * 255 + max / 2) / max) as u8
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

/// How raw pixel values are packed in a [`CaptureBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    pub bytes_per_pixel: usize,
    pub byte_order: ByteOrder,
    pub red: ChannelMask,
    pub green: ChannelMask,
    pub blue: ChannelMask,
}

impl PixelLayout {
    /// 32-bit little-endian `0x00RRGGBB`, the usual 24-bit-depth TrueColor visual.
    pub const BGRX: Self = Self {
        bytes_per_pixel: 4,
        byte_order: ByteOrder::LittleEndian,
        red: ChannelMask::new(0x00ff_0000),
        green: ChannelMask::new(0x0000_ff00),
        blue: ChannelMask::new(0x0000_00ff),
    };

    /// Packed `R, G, B` bytes.
    pub const RGB24: Self = Self {
        bytes_per_pixel: 3,
        byte_order: ByteOrder::BigEndian,
        red: ChannelMask::new(0x00ff_0000),
        green: ChannelMask::new(0x0000_ff00),
        blue: ChannelMask::new(0x0000_00ff),
    };

    pub fn new(
        bits_per_pixel: u32,
        byte_order: ByteOrder,
        red_mask: u32,
        green_mask: u32,
        blue_mask: u32,
    ) -> Result<Self, CaptureError> {
        if !matches!(bits_per_pixel, 16 | 24 | 32) {
            return Err(CaptureError::UnsupportedLayout(bits_per_pixel));
        }

        Ok(Self {
            bytes_per_pixel: (bits_per_pixel / 8) as usize,
            byte_order,
            red: ChannelMask::new(red_mask),
            green: ChannelMask::new(green_mask),
            blue: ChannelMask::new(blue_mask),
        })
    }

    #[inline]
    fn read(&self, bytes: &[u8]) -> u32 {
        match self.byte_order {
            ByteOrder::LittleEndian => bytes
                .iter()
                .rev()
                .fold(0u32, |acc, b| (acc << 8) | *b as u32),
            ByteOrder::BigEndian => bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32),
        }
    }

    #[inline]
    pub fn rgb(&self, bytes: &[u8]) -> [u8; 3] {
        let pixel = self.read(bytes);
        [
            self.red.extract(pixel),
            self.green.extract(pixel),
            self.blue.extract(pixel),
        ]
    }
}

/// One captured screen image. Owned by the iteration that produced it.
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
    layout: PixelLayout,
}

impl CaptureBuffer {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        stride: usize,
        layout: PixelLayout,
    ) -> Result<Self, CaptureError> {
        let row_bytes = width as usize * layout.bytes_per_pixel;
        let expected = if height == 0 {
            0
        } else {
            stride.max(row_bytes) * (height as usize - 1) + row_bytes
        };

        if stride < row_bytes || data.len() < expected {
            return Err(CaptureError::BufferTooSmall {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            width,
            height,
            stride,
            layout,
        })
    }

    /// Builds a tightly packed buffer by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Self {
        let layout = PixelLayout::RGB24;
        let stride = width as usize * layout.bytes_per_pixel;
        let mut data = Vec::with_capacity(stride * height as usize);

        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }

        Self {
            data,
            width,
            height,
            stride,
            layout,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Raw bytes of row `y`, trimmed to `width` pixels.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * self.layout.bytes_per_pixel]
    }

    /// The red, green and blue components of every pixel in row `y`.
    pub fn row_rgb(&self, y: u32) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.row(y)
            .chunks_exact(self.layout.bytes_per_pixel)
            .map(|bytes| self.layout.rgb(bytes))
    }

    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let bpp = self.layout.bytes_per_pixel;
        let start = y as usize * self.stride + x as usize * bpp;
        self.layout.rgb(&self.data[start..start + bpp])
    }
}
