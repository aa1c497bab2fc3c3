#![doc = include_str!("../README.md")]

mod catalog;
mod codec;
mod error;
mod palindrome;
mod raw;
mod store;
#[cfg(test)]
mod testutil;
mod unpack;

pub use crate::catalog::*;
pub use crate::codec::*;
pub use crate::error::*;
pub use crate::palindrome::*;
pub use crate::raw::*;
pub use crate::store::*;
pub use crate::unpack::*;
