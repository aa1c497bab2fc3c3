//! Object storage capability consumed by the block catalog.
//!
//! The catalog only needs two things from storage: resolving an object by
//! name, and opening a ranged byte stream on it. Everything about transport,
//! authentication and retries inside a single request stays behind
//! [`Object::range_reader`].

mod fs;
mod interface;
mod memory;

pub use fs::*;
pub use interface::*;
pub use memory::*;
