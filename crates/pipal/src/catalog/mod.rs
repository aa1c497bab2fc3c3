//! Block catalogs and the composed raw-byte stream over them.
//!
//! A catalog is an ordered list of [`BlockDescriptor`]s. [`ResultSet`]
//! validates the list once and precomputes a [`BlockLayout`]: the digit and
//! raw-byte prefix sums that every seek resolves against. Readers produced by
//! a result set own their storage handles; the result set itself owns none.

mod header;
mod layout;
mod manifest;
mod resultset;

pub use header::*;
pub use layout::*;
pub use manifest::*;
pub use resultset::*;
