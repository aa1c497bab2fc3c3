mod cached;
mod interface;

pub use cached::*;
pub use interface::*;
