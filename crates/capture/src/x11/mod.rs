mod capturer;
mod server;

pub use capturer::*;
pub use server::*;
