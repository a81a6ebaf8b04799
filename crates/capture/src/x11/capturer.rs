use tracing::{debug, info};
use x11::xlib;

use super::Server;
use crate::{ByteOrder, CaptureBuffer, CaptureError, DisplayCapture, PixelLayout, even_dimension};

/// Captures the root window of an X11 screen with `XGetImage`.
pub struct X11Capture {
    server: Server,
    root: xlib::Window,
    width: u32,
    height: u32,
}

impl X11Capture {
    pub fn open(display: Option<&str>) -> Result<Self, CaptureError> {
        let server = Server::connect(display)?;
        let (raw_width, raw_height) = server.screen_size();

        let (width, height) = match (even_dimension(raw_width), even_dimension(raw_height)) {
            (Ok(width), Ok(height)) => (width, height),
            _ => return Err(CaptureError::InvalidDimensions(raw_width, raw_height)),
        };

        if (width as i32, height as i32) != (raw_width, raw_height) {
            debug!("Cropping {raw_width}x{raw_height} screen to {width}x{height}");
        }

        info!(
            "Opened display '{}' screen {} ({width}x{height})",
            server.name(),
            server.screen()
        );

        Ok(Self {
            root: server.root(),
            server,
            width,
            height,
        })
    }
}

impl DisplayCapture for X11Capture {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn capture(&mut self) -> Result<CaptureBuffer, CaptureError> {
        let image = unsafe {
            xlib::XGetImage(
                self.server.raw(),
                self.root,
                0,
                0,
                self.width,
                self.height,
                !0, // Plane mask.
                xlib::ZPixmap,
            )
        };

        if image.is_null() {
            return Err(CaptureError::ImageUnavailable {
                width: self.width,
                height: self.height,
            });
        }

        let image = ImageGuard(image);
        let raw = unsafe { &*image.0 };

        let layout = PixelLayout::new(
            raw.bits_per_pixel as u32,
            if raw.byte_order == xlib::LSBFirst {
                ByteOrder::LittleEndian
            } else {
                ByteOrder::BigEndian
            },
            raw.red_mask as u32,
            raw.green_mask as u32,
            raw.blue_mask as u32,
        )?;

        if raw.data.is_null() || raw.bytes_per_line <= 0 {
            return Err(CaptureError::ImageUnavailable {
                width: self.width,
                height: self.height,
            });
        }

        let stride = raw.bytes_per_line as usize;
        let len = stride * self.height as usize;
        let data = unsafe { std::slice::from_raw_parts(raw.data as *const u8, len) }.to_vec();

        // The XImage is released when `image` drops; the buffer owns a copy.
        CaptureBuffer::new(data, self.width, self.height, stride, layout)
    }
}

struct ImageGuard(*mut xlib::XImage);

impl Drop for ImageGuard {
    fn drop(&mut self) {
        unsafe {
            xlib::XDestroyImage(self.0);
        }
    }
}
