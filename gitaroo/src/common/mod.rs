mod math;
mod read_write;

pub use math::*;
pub use read_write::*;
