use crate::ConvertError;

/// Where a plane lives inside a frame: which data pointer, how many samples
/// per row and rows, and the distance in bytes between rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneDescriptor {
    pub index: usize,
    pub width: usize,
    pub height: usize,
    pub stride: usize,
}

impl PlaneDescriptor {
    /// Luma, Cb and Cr planes of a 4:2:0 frame.
    pub fn yuv420p(frame: &ffmpeg::frame::Video) -> [PlaneDescriptor; 3] {
        let (width, height) = (frame.width() as usize, frame.height() as usize);

        [
            PlaneDescriptor {
                index: 0,
                width,
                height,
                stride: frame.stride(0),
            },
            PlaneDescriptor {
                index: 1,
                width: width / 2,
                height: height / 2,
                stride: frame.stride(1),
            },
            PlaneDescriptor {
                index: 2,
                width: width / 2,
                height: height / 2,
                stride: frame.stride(2),
            },
        ]
    }

    /// Smallest number of bytes that can hold this plane.
    pub fn min_len(&self) -> usize {
        match self.height {
            0 => 0,
            height => self.stride * (height - 1) + self.width,
        }
    }

    /// Byte offset of sample `(x, y)`, or `None` when out of bounds.
    pub fn offset(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.stride + x)
    }
}

/// Mutable, bounds-checked view of one plane.
pub struct PlaneMut<'a> {
    data: &'a mut [u8],
    descriptor: PlaneDescriptor,
}

impl<'a> PlaneMut<'a> {
    pub fn new(data: &'a mut [u8], descriptor: PlaneDescriptor) -> Result<Self, ConvertError> {
        if data.len() < descriptor.min_len() || descriptor.stride < descriptor.width {
            return Err(ConvertError::PlaneTooSmall {
                plane: descriptor.index,
                expected: descriptor.min_len(),
                actual: data.len(),
            });
        }

        Ok(Self { data, descriptor })
    }

    /// Borrows plane `descriptor.index` of `frame`.
    pub fn from_frame(
        frame: &'a mut ffmpeg::frame::Video,
        descriptor: PlaneDescriptor,
    ) -> Result<Self, ConvertError> {
        Self::new(frame.data_mut(descriptor.index), descriptor)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        self.descriptor.offset(x, y).map(|offset| self.data[offset])
    }

    /// Writes one sample. Returns `false` without writing when out of bounds.
    pub fn set(&mut self, x: usize, y: usize, value: u8) -> bool {
        match self.descriptor.offset(x, y) {
            Some(offset) => {
                self.data[offset] = value;
                true
            }
            None => false,
        }
    }

    /// The `width` visible samples of row `y`, without stride padding.
    pub fn row_mut(&mut self, y: usize) -> Option<&mut [u8]> {
        let start = self.descriptor.offset(0, y)?;
        Some(&mut self.data[start..start + self.descriptor.width])
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        let width = self.descriptor.width;
        self.data
            .chunks_mut(self.descriptor.stride)
            .take(self.descriptor.height)
            .map(move |row| &mut row[..width])
    }
}
