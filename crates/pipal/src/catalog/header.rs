use crate::Radix;
use serde::{Deserialize, Serialize};

/// Per-shard header describing the digits a block holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub radix: Radix,
    /// Zero-based sequence index of the block.
    pub block_id: u64,
    /// Number of digits the block represents.
    pub block_size: u64,
    /// Stored payload length in bytes. Only used to validate the layout;
    /// zero means unknown.
    #[serde(default)]
    pub payload_length: u64,
    /// Size of the entire logical stream. Only meaningful when non-zero.
    #[serde(default)]
    pub total_digits: u64,
}

/// A block and where its payload lives in storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    pub header: BlockHeader,
    /// Storage key of the object holding the block.
    pub name: String,
    /// Byte offset of the first packed word inside the object, past the
    /// object's preamble.
    pub first_digit_offset: u64,
}
