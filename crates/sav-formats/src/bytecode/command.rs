//! Bytecode command bytes

/// Command byte: no block, skip to the next command
pub const PAD: u8 = 0;
/// Command byte: end of case data (only honoured when bias decoding is enabled)
pub const END_OF_DATA: u8 = 252;
/// Command byte: the next 8 raw payload bytes are the block
pub const LITERAL: u8 = 253;
/// Command byte: the block is eight ASCII spaces
pub const SPACES: u8 = 254;
/// Command byte: the block is the system-missing pattern
pub const SYS_MISSING: u8 = 255;

/// Decoded meaning of one command byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Padding after the last block of a group (0)
    Pad,
    /// Biased small integer, `code - bias` (1..=251)
    Bias(u8),
    /// End of the compressed data (252)
    EndOfData,
    /// Literal 8-byte block follows in the payload (253)
    Literal,
    /// Eight spaces (254)
    Spaces,
    /// System-missing value (255)
    SysMissing,
}

impl Command {
    /// Interpret a command byte. Every byte value has a meaning.
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            PAD => Self::Pad,
            END_OF_DATA => Self::EndOfData,
            LITERAL => Self::Literal,
            SPACES => Self::Spaces,
            SYS_MISSING => Self::SysMissing,
            code => Self::Bias(code),
        }
    }

    /// Get the byte representation
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Pad => PAD,
            Self::Bias(code) => code,
            Self::EndOfData => END_OF_DATA,
            Self::Literal => LITERAL,
            Self::Spaces => SPACES,
            Self::SysMissing => SYS_MISSING,
        }
    }

    /// Whether this command carries 8 payload bytes after the command group
    pub const fn has_payload(self) -> bool {
        matches!(self, Self::Literal)
    }
}
