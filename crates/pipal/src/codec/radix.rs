use crate::Error;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Numeral base of a digit stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Radix {
    Decimal,
    Hexadecimal,
}

impl Radix {
    /// The numeric base, 10 or 16.
    pub const fn base(self) -> u64 {
        match self {
            Self::Decimal => 10,
            Self::Hexadecimal => 16,
        }
    }
}

impl fmt::Display for Radix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base())
    }
}

impl TryFrom<u32> for Radix {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            10 => Ok(Self::Decimal),
            16 => Ok(Self::Hexadecimal),
            other => Err(Error::invalid_catalog(format!("unsupported radix {other}"))),
        }
    }
}

impl From<Radix> for u32 {
    fn from(radix: Radix) -> Self {
        radix.base() as u32
    }
}
