//! Bytecode decoder

use std::collections::VecDeque;
use std::io::Read;

use tracing::trace;

use super::command::Command;
use super::options::{ByteCodeOptions, SPACES_BLOCK};
use super::{BLOCK_SIZE, BlockSource, COMMAND_GROUP_SIZE, read_up_to};
use crate::error::{SavError, SavResult};

/// Decoder for bytecode-compressed case data
///
/// Reads command groups from the wrapped stream on demand and hands out
/// decoded bytes in whatever lengths the caller asks for. Bytes decoded past
/// the end of a request are kept for the next call.
#[derive(Debug)]
pub struct ByteCodeReader<R> {
    inner: R,
    options: ByteCodeOptions,
    commands: VecDeque<u8>,
    residual: VecDeque<u8>,
    exhausted: bool,
    units_read: u64,
}

impl<R: Read> ByteCodeReader<R> {
    /// Create a decoder with default options
    pub fn new(inner: R) -> Self {
        Self::with_options(inner, ByteCodeOptions::default())
    }

    /// Create a decoder with explicit options
    pub fn with_options(inner: R, options: ByteCodeOptions) -> Self {
        Self {
            inner,
            options,
            commands: VecDeque::with_capacity(COMMAND_GROUP_SIZE),
            residual: VecDeque::new(),
            exhausted: false,
            units_read: 0,
        }
    }

    /// Decoder configuration
    pub fn options(&self) -> &ByteCodeOptions {
        &self.options
    }

    /// Read exactly `len` decoded bytes
    ///
    /// Returns fewer bytes only when the compressed stream has ended. On error
    /// nothing is handed out; blocks decoded before the failure stay buffered.
    pub fn read(&mut self, len: usize) -> SavResult<Vec<u8>> {
        while self.residual.len() < len {
            match self.next_block()? {
                Some(block) => self.residual.extend(block),
                None => break,
            }
        }
        let take = len.min(self.residual.len());
        Ok(self.residual.drain(..take).collect())
    }

    /// Whether the compressed stream has no more blocks and nothing is buffered
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.residual.is_empty()
    }

    /// Number of command groups read so far
    pub fn units_read(&self) -> u64 {
        self.units_read
    }

    /// Get a reference to the wrapped reader
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the decoder, returning the wrapped reader
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Resolve commands until one produces a block or the stream ends
    fn next_block(&mut self) -> SavResult<Option<[u8; BLOCK_SIZE]>> {
        loop {
            if self.exhausted {
                return Ok(None);
            }
            let Some(byte) = self.commands.pop_front() else {
                self.refill_commands()?;
                continue;
            };

            match Command::from_byte(byte) {
                Command::Pad => {}
                Command::Literal => return self.read_literal().map(Some),
                Command::Spaces => return Ok(Some(SPACES_BLOCK)),
                Command::SysMissing => return Ok(Some(self.options.sysmis_block())),
                Command::Bias(code) if self.options.bias_mode.is_enabled() => {
                    return Ok(Some(self.options.bias_block(code)));
                }
                Command::EndOfData if self.options.bias_mode.is_enabled() => {
                    trace!("end of data command after {} units", self.units_read);
                    self.commands.clear();
                    self.exhausted = true;
                }
                Command::Bias(_) | Command::EndOfData => {
                    // Leave the command in place so a retry fails the same way
                    self.commands.push_front(byte);
                    return Err(SavError::UnsupportedEncoding(byte));
                }
            }
        }
    }

    /// Load the next group of 8 command bytes, marking the stream exhausted at EOF
    fn refill_commands(&mut self) -> SavResult<()> {
        let mut group = [0u8; COMMAND_GROUP_SIZE];
        let got = read_up_to(&mut self.inner, &mut group)?;
        match got {
            0 => {
                trace!("compressed stream ended after {} units", self.units_read);
                self.exhausted = true;
            }
            COMMAND_GROUP_SIZE => {
                trace!(unit = self.units_read, commands = %hex::encode(group), "read command group");
                self.commands.extend(group);
                self.units_read += 1;
            }
            partial => {
                return Err(SavError::unexpected_eof(
                    "command group",
                    COMMAND_GROUP_SIZE,
                    partial,
                ));
            }
        }
        Ok(())
    }

    fn read_literal(&mut self) -> SavResult<[u8; BLOCK_SIZE]> {
        let mut block = [0u8; BLOCK_SIZE];
        let got = read_up_to(&mut self.inner, &mut block)?;
        if got != BLOCK_SIZE {
            return Err(SavError::unexpected_eof("literal block", BLOCK_SIZE, got));
        }
        Ok(block)
    }
}

impl<R: Read> BlockSource for ByteCodeReader<R> {
    fn read_bytes(&mut self, len: usize) -> SavResult<Vec<u8>> {
        self.read(len)
    }

    fn at_end(&mut self) -> SavResult<bool> {
        if !self.residual.is_empty() {
            return Ok(false);
        }
        match self.next_block()? {
            Some(block) => {
                self.residual.extend(block);
                Ok(false)
            }
            None => Ok(true),
        }
    }
}
