use std::{
    ffi::{CStr, CString},
    ptr,
};

use x11::xlib;

use crate::CaptureError;

/// An open Xlib connection together with the screen it was opened on.
#[derive(Debug)]
pub struct Server {
    raw: *mut xlib::Display,
    screen: i32,
    name: String,
}

impl Server {
    /// Connects to `name`, or to the display named by `$DISPLAY` when `None`.
    pub fn connect(name: Option<&str>) -> Result<Server, CaptureError> {
        let Ok(c_name) = name.map(CString::new).transpose() else {
            return Err(CaptureError::DisplayUnavailable(
                name.unwrap_or_default().to_string(),
            ));
        };

        let name_ptr = c_name.as_ref().map_or(ptr::null(), |n| n.as_ptr());
        let raw = unsafe { xlib::XOpenDisplay(name_ptr) };

        if raw.is_null() {
            return Err(CaptureError::DisplayUnavailable(
                name.map(str::to_string).unwrap_or_else(default_display_name),
            ));
        }

        let screen = unsafe { xlib::XDefaultScreen(raw) };
        let name = unsafe { CStr::from_ptr(xlib::XDisplayString(raw)) }
            .to_string_lossy()
            .into_owned();

        Ok(Server { raw, screen, name })
    }

    pub fn raw(&self) -> *mut xlib::Display {
        self.raw
    }

    pub fn screen(&self) -> i32 {
        self.screen
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> xlib::Window {
        unsafe { xlib::XRootWindow(self.raw, self.screen) }
    }

    /// Size of the default screen as reported by the server. May be non-positive
    /// on a misconfigured server.
    pub fn screen_size(&self) -> (i32, i32) {
        unsafe {
            (
                xlib::XDisplayWidth(self.raw, self.screen),
                xlib::XDisplayHeight(self.raw, self.screen),
            )
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        unsafe {
            xlib::XCloseDisplay(self.raw);
        }
    }
}

fn default_display_name() -> String {
    std::env::var("DISPLAY").unwrap_or_default()
}
