//! Verbatim block transport for uncompressed case data

use std::io::{Read, Write};

use crate::bytecode::{BLOCK_SIZE, BlockSink, BlockSource, SPACES_BLOCK, read_up_to};
use crate::error::SavResult;

/// Reads uncompressed case data straight from the stream
#[derive(Debug)]
pub struct RawBlockReader<R: Read> {
    inner: R,
    peeked: Option<u8>,
}

impl<R: Read> RawBlockReader<R> {
    /// Wrap a reader positioned at the first case
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            peeked: None,
        }
    }

    /// Return the wrapped reader
    ///
    /// A byte consumed by [`at_end`](BlockSource::at_end) is lost.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> BlockSource for RawBlockReader<R> {
    fn read_bytes(&mut self, len: usize) -> SavResult<Vec<u8>> {
        let mut data = vec![0u8; len];
        let mut filled = 0;
        if len > 0
            && let Some(byte) = self.peeked.take()
        {
            data[0] = byte;
            filled = 1;
        }
        filled += read_up_to(&mut self.inner, &mut data[filled..])?;
        data.truncate(filled);
        Ok(data)
    }

    fn at_end(&mut self) -> SavResult<bool> {
        if self.peeked.is_some() {
            return Ok(false);
        }
        let mut byte = [0u8; 1];
        if read_up_to(&mut self.inner, &mut byte)? == 0 {
            return Ok(true);
        }
        self.peeked = Some(byte[0]);
        Ok(false)
    }
}

/// Writes uncompressed case data straight to the stream
#[derive(Debug)]
pub struct RawBlockWriter<W: Write> {
    inner: W,
    unaligned: usize,
}

impl<W: Write> RawBlockWriter<W> {
    /// Wrap a writer positioned after the data record preamble
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            unaligned: 0,
        }
    }

    /// Pad to a whole block, flush and return the wrapped writer
    pub fn finish(mut self) -> SavResult<W> {
        BlockSink::flush(&mut self)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> BlockSink for RawBlockWriter<W> {
    fn append(&mut self, data: &[u8]) -> SavResult<()> {
        self.inner.write_all(data)?;
        self.unaligned = (self.unaligned + data.len()) % BLOCK_SIZE;
        Ok(())
    }

    fn flush(&mut self) -> SavResult<()> {
        if self.unaligned > 0 {
            self.inner
                .write_all(&SPACES_BLOCK[..BLOCK_SIZE - self.unaligned])?;
            self.unaligned = 0;
        }
        Ok(())
    }
}
