//! Case-data codec for SPSS system files
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Widths are bounded well below i32::MAX
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::doc_markdown)] // Format terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::float_cmp)] // Bit-exact comparisons are the point
#![allow(clippy::derive_partial_eq_without_eq)] // Binary format structs
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! This crate reads and writes the case data of `.sav` files: the rows of
//! numbers and strings that follow the dictionary.
//!
//! # Layers
//!
//! - **Segments**: arithmetic splitting strings longer than 255 bytes into
//!   segments, see [`segment`]
//! - **Bytecode**: the block compression used by compressed files, see
//!   [`bytecode`]
//! - **Dictionary**: variable descriptors, segment descriptors and the very
//!   long string width map, see [`dictionary`]
//! - **Data**: rows of cells encoded through the layers above, see [`data`]
//!
//! Every codec instance owns its buffers and is driven through `&mut self`.
//! Independent instances on independent streams can run on separate threads.

#![warn(missing_docs)]

pub mod bytecode;
pub mod data;
pub mod dictionary;
pub mod error;
pub mod segment;

// Test utilities module
#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod test_utils;

pub use bytecode::{BiasMode, ByteCodeOptions, ByteCodeReader, ByteCodeWriter};
pub use data::{CaseContext, CaseReader, CaseRow, CaseWriter, Cell, Header, read_cases, write_cases};
pub use dictionary::{Dictionary, Variable, VariableRecord, VeryLongStringMap};
pub use error::{SavError, SavResult};

/// Records with a symmetric binary form
pub trait SavFormat: Sized {
    /// Parse from bytes
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>>;

    /// Build to bytes
    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>>;

    /// Verify round-trip correctness
    fn verify_round_trip(data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        let parsed = Self::parse(data)?;
        let rebuilt = parsed.build()?;
        if data != rebuilt.as_slice() {
            return Err("Round-trip verification failed".into());
        }
        Ok(())
    }
}
