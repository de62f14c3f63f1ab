//! Bytecode compression for case data
//!
//! Compressed case data is a sequence of units. Each unit is a group of 8
//! command bytes followed by the 8-byte payload of every `LITERAL` command in
//! the group, in command order. There are no separators or length prefixes;
//! a new unit starts when the commands of the previous one are used up.
//!
//! | Byte     | Meaning                                        |
//! |----------|------------------------------------------------|
//! | 0        | padding, produces no block                     |
//! | 1..=251  | biased integer `code - bias` (opt-in)          |
//! | 252      | end of data (opt-in)                           |
//! | 253      | literal, 8 payload bytes follow the group      |
//! | 254      | eight spaces                                   |
//! | 255      | system-missing (`-f64::MAX`)                   |
//!
//! # Example
//!
//! ```
//! use sav_formats::bytecode::{ByteCodeReader, ByteCodeWriter};
//!
//! let mut writer = ByteCodeWriter::new(Vec::new());
//! writer.append(b"ab").expect("append");
//! let encoded = writer.into_inner().expect("flush");
//! assert_eq!(&encoded[..8], &[253, 0, 0, 0, 0, 0, 0, 0]);
//! assert_eq!(&encoded[8..], b"ab      ");
//!
//! let mut reader = ByteCodeReader::new(encoded.as_slice());
//! assert_eq!(reader.read(2).expect("read"), b"ab");
//! ```

mod command;
mod options;
mod reader;
mod writer;

pub use command::{Command, END_OF_DATA, LITERAL, PAD, SPACES, SYS_MISSING};
pub use options::{BiasMode, ByteCodeOptions, DEFAULT_BIAS, SPACES_BLOCK, serde_endian};
pub use reader::ByteCodeReader;
pub use writer::ByteCodeWriter;

use std::io::{ErrorKind, Read};

use crate::error::SavResult;

/// Size of one decoded block
pub const BLOCK_SIZE: usize = 8;

/// Number of command bytes in one unit
pub const COMMAND_GROUP_SIZE: usize = 8;

/// Source of decoded case-data bytes
///
/// Implemented by [`ByteCodeReader`] for compressed files and by
/// [`RawBlockReader`](crate::data::RawBlockReader) for uncompressed ones.
pub trait BlockSource {
    /// Read exactly `len` bytes, or fewer only at the end of the data
    fn read_bytes(&mut self, len: usize) -> SavResult<Vec<u8>>;

    /// Whether no further bytes are available
    fn at_end(&mut self) -> SavResult<bool>;
}

/// Sink for case-data bytes
pub trait BlockSink {
    /// Buffer bytes for output
    fn append(&mut self, data: &[u8]) -> SavResult<()>;

    /// Emit all buffered bytes, padding to a whole block
    fn flush(&mut self) -> SavResult<()>;
}

/// Fill `buf` from `reader`, stopping early only at end of stream
pub(crate) fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
