mod elementary;
pub use elementary::*;
