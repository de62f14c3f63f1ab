//! Bytecode encoder

use std::io::Write;

use tracing::{debug, trace};

use super::command::{Command, END_OF_DATA, PAD};
use super::options::{ByteCodeOptions, SPACES_BLOCK};
use super::{BLOCK_SIZE, BlockSink, COMMAND_GROUP_SIZE};
use crate::error::{SavError, SavResult};

/// Encoder for bytecode-compressed case data
///
/// Input is cut into 8-byte blocks. Each block becomes one command byte and,
/// for literals, 8 bytes of payload. A full group of 8 commands is written
/// together with its payload as one unit.
#[derive(Debug)]
pub struct ByteCodeWriter<W: Write> {
    inner: W,
    options: ByteCodeOptions,
    sysmis: [u8; BLOCK_SIZE],
    residual: Vec<u8>,
    commands: Vec<u8>,
    payload: Vec<u8>,
    units_written: u64,
}

impl<W: Write> ByteCodeWriter<W> {
    /// Create an encoder with default options
    pub fn new(inner: W) -> Self {
        Self::with_options(inner, ByteCodeOptions::default())
    }

    /// Create an encoder with explicit options
    pub fn with_options(inner: W, options: ByteCodeOptions) -> Self {
        Self {
            inner,
            sysmis: options.sysmis_block(),
            options,
            residual: Vec::with_capacity(BLOCK_SIZE),
            commands: Vec::with_capacity(COMMAND_GROUP_SIZE),
            payload: Vec::with_capacity(COMMAND_GROUP_SIZE * BLOCK_SIZE),
            units_written: 0,
        }
    }

    /// Encoder configuration
    pub fn options(&self) -> &ByteCodeOptions {
        &self.options
    }

    /// Buffer `data`, emitting every complete unit it produces
    pub fn append(&mut self, data: &[u8]) -> SavResult<()> {
        let mut data = data;

        if !self.residual.is_empty() {
            let take = (BLOCK_SIZE - self.residual.len()).min(data.len());
            self.residual.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.residual.len() < BLOCK_SIZE {
                return Ok(());
            }
            let block = to_block(&self.residual);
            self.residual.clear();
            self.push_block(block)?;
        }

        let mut blocks = data.chunks_exact(BLOCK_SIZE);
        for block in &mut blocks {
            self.push_block(to_block(block))?;
        }
        self.residual.extend_from_slice(blocks.remainder());
        Ok(())
    }

    /// Emit everything buffered
    ///
    /// A trailing partial block is padded with spaces and a partial command
    /// group with PAD bytes. Flushing an empty encoder does nothing. The
    /// wrapped writer itself is not flushed; see [`finish`](Self::finish).
    pub fn flush(&mut self) -> SavResult<()> {
        if !self.residual.is_empty() {
            let padding = BLOCK_SIZE - self.residual.len();
            self.append(&SPACES_BLOCK[..padding])?;
        }

        if !self.commands.is_empty() {
            self.commands.resize(COMMAND_GROUP_SIZE, PAD);
            self.emit_unit()?;
        }

        if !self.residual.is_empty() || !self.commands.is_empty() {
            return Err(SavError::EncoderInconsistency {
                residual: self.residual.len(),
                pending: self.commands.len(),
            });
        }
        Ok(())
    }

    /// Number of units written so far
    pub fn units_written(&self) -> u64 {
        self.units_written
    }

    /// Get a reference to the wrapped writer
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Flush and return the wrapped writer
    pub fn into_inner(mut self) -> SavResult<W> {
        self.flush()?;
        Ok(self.inner)
    }

    /// Flush, terminate the data and flush the wrapped writer
    ///
    /// With bias compression enabled a final unit holding the end-of-data
    /// command is written, which readers in that mode stop at.
    pub fn finish(mut self) -> SavResult<W> {
        self.flush()?;
        if self.options.bias_mode.is_enabled() {
            self.commands.push(END_OF_DATA);
            self.commands.resize(COMMAND_GROUP_SIZE, PAD);
            self.emit_unit()?;
        }
        self.inner.flush()?;
        debug!("bytecode stream finished after {} units", self.units_written);
        Ok(self.inner)
    }

    fn classify(&self, block: [u8; BLOCK_SIZE]) -> Command {
        if block == self.sysmis {
            Command::SysMissing
        } else if block == SPACES_BLOCK {
            Command::Spaces
        } else if let Some(code) = self
            .options
            .bias_mode
            .is_enabled()
            .then(|| self.options.bias_code(block))
            .flatten()
        {
            Command::Bias(code)
        } else {
            Command::Literal
        }
    }

    fn push_block(&mut self, block: [u8; BLOCK_SIZE]) -> SavResult<()> {
        let command = self.classify(block);
        if command.has_payload() {
            self.payload.extend_from_slice(&block);
        }
        self.commands.push(command.as_byte());

        if self.commands.len() == COMMAND_GROUP_SIZE {
            self.emit_unit()?;
        }
        Ok(())
    }

    fn emit_unit(&mut self) -> SavResult<()> {
        trace!(
            unit = self.units_written,
            commands = %hex::encode(&self.commands),
            literals = self.payload.len() / BLOCK_SIZE,
            "write command group"
        );
        self.inner.write_all(&self.commands)?;
        self.inner.write_all(&self.payload)?;
        self.commands.clear();
        self.payload.clear();
        self.units_written += 1;
        Ok(())
    }
}

impl<W: Write> BlockSink for ByteCodeWriter<W> {
    fn append(&mut self, data: &[u8]) -> SavResult<()> {
        Self::append(self, data)
    }

    fn flush(&mut self) -> SavResult<()> {
        Self::flush(self)
    }
}

fn to_block(bytes: &[u8]) -> [u8; BLOCK_SIZE] {
    let mut block = [0u8; BLOCK_SIZE];
    block.copy_from_slice(&bytes[..BLOCK_SIZE]);
    block
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bytecode::options::BiasMode;

    fn encode(data: &[u8]) -> Vec<u8> {
        let mut writer = ByteCodeWriter::new(Vec::new());
        writer.append(data).expect("append");
        writer.into_inner().expect("flush")
    }

    #[test]
    fn test_short_string_becomes_one_literal_unit() {
        let encoded = encode(b"ab");
        let mut expected = vec![253, 0, 0, 0, 0, 0, 0, 0];
        expected.extend_from_slice(b"ab      ");
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_spaces_and_sysmis_have_no_payload() {
        let mut data = b"        ".to_vec();
        data.extend_from_slice(&(-f64::MAX).to_le_bytes());
        let encoded = encode(&data);
        assert_eq!(encoded, vec![254, 255, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_foreign_nan_is_literal() {
        let nan = f64::from_bits(0x7FF8_0000_0000_0001).to_le_bytes();
        let encoded = encode(&nan);
        assert_eq!(encoded[0], 253);
        assert_eq!(&encoded[8..], nan.as_slice());
    }

    #[test]
    fn test_full_group_emitted_without_flush() {
        let mut writer = ByteCodeWriter::new(Vec::new());
        writer.append(&[b'x'; 64]).expect("append");
        assert_eq!(writer.units_written(), 1);
        assert_eq!(writer.get_ref().len(), 8 + 64);
        assert_eq!(&writer.get_ref()[..8], &[253u8; 8]);
    }

    #[test]
    fn test_split_appends_join_blocks() {
        let mut writer = ByteCodeWriter::new(Vec::new());
        writer.append(b"abc").expect("append");
        writer.append(b"de").expect("append");
        writer.append(b"fghij").expect("append");
        let encoded = writer.into_inner().expect("flush");

        let mut expected = vec![253, 253, 0, 0, 0, 0, 0, 0];
        expected.extend_from_slice(b"abcdefgh");
        expected.extend_from_slice(b"ij      ");
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_flush_is_idempotent() {
        let mut writer = ByteCodeWriter::new(Vec::new());
        writer.flush().expect("flush");
        writer.flush().expect("flush");
        assert!(writer.get_ref().is_empty());

        writer.append(b"again").expect("append");
        writer.flush().expect("flush");
        writer.flush().expect("flush");
        assert_eq!(writer.get_ref().len(), 16);
        assert_eq!(writer.units_written(), 1);
    }

    #[test]
    fn test_bias_compression_when_enabled() {
        let options = ByteCodeOptions::new().with_bias_mode(BiasMode::Enabled);
        let mut writer = ByteCodeWriter::with_options(Vec::new(), options);
        writer.append(&1.0f64.to_le_bytes()).expect("append");
        writer.append(&0.5f64.to_le_bytes()).expect("append");
        let encoded = writer.finish().expect("finish");

        let mut expected = vec![101, 253, 0, 0, 0, 0, 0, 0];
        expected.extend_from_slice(&0.5f64.to_le_bytes());
        expected.extend_from_slice(&[252, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_integers_stay_literal_by_default() {
        let encoded = encode(&1.0f64.to_le_bytes());
        assert_eq!(encoded[0], 253);
    }

    #[test]
    fn test_finish_without_bias_writes_no_marker() {
        let writer = ByteCodeWriter::new(Vec::new());
        assert!(writer.finish().expect("finish").is_empty());
    }
}
