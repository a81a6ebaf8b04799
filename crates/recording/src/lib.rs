mod pipeline;
pub use pipeline::*;

mod stop;
pub use stop::*;
