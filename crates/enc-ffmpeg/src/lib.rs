mod base;
pub use base::*;

mod video;
pub use video::*;

mod mux;
pub use mux::*;
