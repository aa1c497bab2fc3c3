mod format;
mod radix;
mod word;

pub use format::*;
pub use radix::*;
pub use word::*;
