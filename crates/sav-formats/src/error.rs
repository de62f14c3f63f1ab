//! Case-data codec error types

use thiserror::Error;

/// Errors raised while encoding or decoding system file case data
#[derive(Debug, Error)]
pub enum SavError {
    /// The underlying stream failed to supply or accept the required bytes
    #[error("stream error: {0}")]
    Stream(#[from] std::io::Error),

    /// A bias-range command byte was found while bias decoding is disabled
    #[error("unsupported bytecode encoding: command byte {0} (bias compression is not enabled)")]
    UnsupportedEncoding(u8),

    /// Required context is missing or inconsistent
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// `flush` left data behind. The padding rules make this unreachable.
    #[error(
        "encoder inconsistency: {residual} residual bytes and {pending} pending commands after flush"
    )]
    EncoderInconsistency {
        /// Input bytes still buffered
        residual: usize,
        /// Commands still waiting for a full group
        pending: usize,
    },

    /// A variable descriptor carried a width that cannot be a case-data width
    #[error("invalid variable width: {0}")]
    InvalidWidth(i32),

    /// The very long string width map text could not be parsed
    #[error("invalid very long string map: {0}")]
    InvalidWidthMap(String),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

impl SavError {
    /// Stream error for a read that ended before the requested bytes arrived
    pub(crate) fn unexpected_eof(what: &str, expected: usize, actual: usize) -> Self {
        Self::Stream(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("{what}: expected {expected} bytes, got {actual}"),
        ))
    }

    /// Whether this error is a premature end of the underlying stream
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, Self::Stream(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}

/// Result type for case-data operations
pub type SavResult<T> = Result<T, SavError>;
