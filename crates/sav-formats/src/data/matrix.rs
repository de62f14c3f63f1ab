//! Case matrix codec
//!
//! Each case is a row of cells, one per logical variable. Numbers take one
//! 8-byte block. Strings are split into segments of at most 255 bytes, each
//! padded with spaces to a multiple of 8. Every cell is flushed through the
//! block transport on its own, so a cell always ends on a unit boundary in
//! compressed data.

use std::io::{Cursor, Read, Write};

use binrw::{BinRead, BinWrite, Endian};
use tracing::{debug, trace, warn};

use super::cell::{CaseRow, Cell};
use super::context::{CaseContext, CellLayout, Resolved};
use super::raw::{RawBlockReader, RawBlockWriter};
use crate::bytecode::{
    BLOCK_SIZE, BlockSink, BlockSource, ByteCodeOptions, ByteCodeReader, ByteCodeWriter,
    SPACES_BLOCK,
};
use crate::error::{SavError, SavResult};
use crate::segment::{SLOT_SIZE, round_up, segment_read_widths};

/// Record type code that introduces case data
pub const DATA_RECORD_TYPE: i32 = 999;

/// Record type and filler preceding the case data
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
pub struct DataRecordPreamble {
    /// Always [`DATA_RECORD_TYPE`]
    pub record_type: i32,
    /// Always zero
    pub filler: i32,
}

impl Default for DataRecordPreamble {
    fn default() -> Self {
        Self {
            record_type: DATA_RECORD_TYPE,
            filler: 0,
        }
    }
}

impl DataRecordPreamble {
    /// Encoded size in bytes
    pub const SIZE: usize = 8;

    /// Read and check the preamble
    pub fn read_from<R: Read>(reader: &mut R, endian: Endian) -> SavResult<Self> {
        let mut buf = [0u8; Self::SIZE];
        reader.read_exact(&mut buf)?;
        let preamble = Self::read_options(&mut Cursor::new(&buf), endian, ())?;

        if preamble.record_type != DATA_RECORD_TYPE {
            return Err(SavError::MalformedRecord(format!(
                "expected data record type {DATA_RECORD_TYPE}, got {}",
                preamble.record_type
            )));
        }
        if preamble.filler != 0 {
            return Err(SavError::MalformedRecord(format!(
                "non-zero data record filler {}",
                preamble.filler
            )));
        }
        Ok(preamble)
    }

    /// Write the preamble
    pub fn write_to<W: Write>(&self, writer: &mut W, endian: Endian) -> SavResult<()> {
        let mut cursor = Cursor::new(Vec::with_capacity(Self::SIZE));
        self.write_options(&mut cursor, endian, ())?;
        writer.write_all(&cursor.into_inner())?;
        Ok(())
    }
}

/// Block transport chosen by the header compression flag
#[derive(Debug)]
pub enum CaseSource<R: Read> {
    /// Bytecode-compressed data
    Compressed(ByteCodeReader<R>),
    /// Uncompressed data
    Raw(RawBlockReader<R>),
}

impl<R: Read> CaseSource<R> {
    fn open(reader: R, compressed: bool, options: ByteCodeOptions) -> Self {
        if compressed {
            Self::Compressed(ByteCodeReader::with_options(reader, options))
        } else {
            Self::Raw(RawBlockReader::new(reader))
        }
    }

    /// Return the wrapped reader
    pub fn into_inner(self) -> R {
        match self {
            Self::Compressed(reader) => reader.into_inner(),
            Self::Raw(reader) => reader.into_inner(),
        }
    }
}

impl<R: Read> BlockSource for CaseSource<R> {
    fn read_bytes(&mut self, len: usize) -> SavResult<Vec<u8>> {
        match self {
            Self::Compressed(reader) => reader.read_bytes(len),
            Self::Raw(reader) => reader.read_bytes(len),
        }
    }

    fn at_end(&mut self) -> SavResult<bool> {
        match self {
            Self::Compressed(reader) => reader.at_end(),
            Self::Raw(reader) => reader.at_end(),
        }
    }
}

/// Block transport chosen by the header compression flag
#[derive(Debug)]
pub enum CaseSink<W: Write> {
    /// Bytecode-compressed data
    Compressed(ByteCodeWriter<W>),
    /// Uncompressed data
    Raw(RawBlockWriter<W>),
}

impl<W: Write> CaseSink<W> {
    fn open(writer: W, compressed: bool, options: ByteCodeOptions) -> Self {
        if compressed {
            Self::Compressed(ByteCodeWriter::with_options(writer, options))
        } else {
            Self::Raw(RawBlockWriter::new(writer))
        }
    }

    /// Flush everything and return the wrapped writer
    pub fn finish(self) -> SavResult<W> {
        match self {
            Self::Compressed(writer) => writer.finish(),
            Self::Raw(writer) => writer.finish(),
        }
    }
}

impl<W: Write> BlockSink for CaseSink<W> {
    fn append(&mut self, data: &[u8]) -> SavResult<()> {
        match self {
            Self::Compressed(writer) => BlockSink::append(writer, data),
            Self::Raw(writer) => writer.append(data),
        }
    }

    fn flush(&mut self) -> SavResult<()> {
        match self {
            Self::Compressed(writer) => BlockSink::flush(writer),
            Self::Raw(writer) => writer.flush(),
        }
    }
}

/// Decodes cases one row at a time
#[derive(Debug)]
pub struct CaseReader<R: Read> {
    source: CaseSource<R>,
    layout: Vec<CellLayout>,
    options: ByteCodeOptions,
    sysmis: [u8; BLOCK_SIZE],
    remaining: Option<usize>,
    cases_read: usize,
    failed: bool,
}

impl<R: Read> CaseReader<R> {
    /// Reader for case data starting at the current position of `reader`
    ///
    /// The context is checked before anything is read.
    pub fn new(context: &CaseContext, reader: R) -> SavResult<Self> {
        Ok(Self::from_resolved(context.resolve()?, reader))
    }

    /// Reader for a data record, starting at its type code
    pub fn with_preamble(context: &CaseContext, mut reader: R) -> SavResult<Self> {
        let resolved = context.resolve()?;
        DataRecordPreamble::read_from(&mut reader, resolved.header.endian)?;
        Ok(Self::from_resolved(resolved, reader))
    }

    fn from_resolved(resolved: Resolved, reader: R) -> Self {
        let Resolved {
            header,
            layout,
            options,
        } = resolved;
        debug!(
            cells = layout.len(),
            compressed = header.compressed,
            case_count = header.case_count,
            "reading cases"
        );
        Self {
            source: CaseSource::open(reader, header.compressed, options),
            sysmis: options.sysmis_block(),
            layout,
            options,
            remaining: header.cases(),
            cases_read: 0,
            failed: false,
        }
    }

    /// Cell layout of each case
    pub fn layout(&self) -> &[CellLayout] {
        &self.layout
    }

    /// Number of cases decoded so far
    pub fn cases_read(&self) -> usize {
        self.cases_read
    }

    /// Return the wrapped reader
    pub fn into_inner(self) -> R {
        self.source.into_inner()
    }

    /// Decode the next case, `None` after the last one
    ///
    /// With an unknown case count the data ends at a clean end of stream
    /// between cases. A stream ending inside a case is an error.
    pub fn read_case(&mut self) -> SavResult<Option<CaseRow>> {
        match self.remaining {
            Some(0) => return Ok(None),
            None if self.layout.is_empty() || self.source.at_end()? => {
                debug!(cases = self.cases_read, "end of case data");
                return Ok(None);
            }
            _ => {}
        }

        let mut row = Vec::with_capacity(self.layout.len());
        for index in 0..self.layout.len() {
            let cell = self.read_cell(index)?;
            row.push(cell);
        }

        if let Some(remaining) = &mut self.remaining {
            *remaining -= 1;
        }
        self.cases_read += 1;
        trace!(case = self.cases_read, "decoded case");
        Ok(Some(row))
    }

    fn read_cell(&mut self, index: usize) -> SavResult<Cell> {
        match &self.layout[index] {
            CellLayout::Numeric { name } => {
                let bytes = read_exact(&mut self.source, BLOCK_SIZE, name)?;
                let mut block = [0u8; BLOCK_SIZE];
                block.copy_from_slice(&bytes);
                if block == self.sysmis {
                    Ok(Cell::Missing)
                } else {
                    Ok(Cell::Number(self.options.decode_f64(block)))
                }
            }
            CellLayout::String { name, width } => {
                let mut value = Vec::with_capacity(*width);
                for segment_width in segment_read_widths(*width) {
                    let bytes =
                        read_exact(&mut self.source, round_up(segment_width, SLOT_SIZE), name)?;
                    value.extend_from_slice(&bytes[..segment_width]);
                }
                let end = value.iter().rposition(|&b| b != b' ').map_or(0, |p| p + 1);
                value.truncate(end);
                Ok(Cell::Text(value))
            }
        }
    }
}

impl<R: Read> Iterator for CaseReader<R> {
    type Item = SavResult<CaseRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = self.read_case().transpose();
        if matches!(result, Some(Err(_))) {
            self.failed = true;
        }
        result
    }
}

fn read_exact<S: BlockSource>(source: &mut S, len: usize, name: &str) -> SavResult<Vec<u8>> {
    let bytes = source.read_bytes(len)?;
    if bytes.len() != len {
        warn!(variable = name, expected = len, got = bytes.len(), "case data truncated");
        return Err(SavError::unexpected_eof(
            &format!("cell of {name}"),
            len,
            bytes.len(),
        ));
    }
    Ok(bytes)
}

/// Encodes cases one row at a time
#[derive(Debug)]
pub struct CaseWriter<W: Write> {
    sink: CaseSink<W>,
    layout: Vec<CellLayout>,
    options: ByteCodeOptions,
    sysmis: [u8; BLOCK_SIZE],
    sysmis_bits: u64,
    expected: Option<usize>,
    cases_written: usize,
}

impl<W: Write> CaseWriter<W> {
    /// Writer for case data at the current position of `writer`
    ///
    /// The context is checked before anything is written.
    pub fn new(context: &CaseContext, writer: W) -> SavResult<Self> {
        Ok(Self::from_resolved(context.resolve()?, writer))
    }

    /// Writer that first emits the data record preamble
    pub fn with_preamble(context: &CaseContext, mut writer: W) -> SavResult<Self> {
        let resolved = context.resolve()?;
        DataRecordPreamble::default().write_to(&mut writer, resolved.header.endian)?;
        Ok(Self::from_resolved(resolved, writer))
    }

    fn from_resolved(resolved: Resolved, writer: W) -> Self {
        let Resolved {
            header,
            layout,
            options,
        } = resolved;
        debug!(
            cells = layout.len(),
            compressed = header.compressed,
            case_count = header.case_count,
            "writing cases"
        );
        Self {
            sink: CaseSink::open(writer, header.compressed, options),
            sysmis: options.sysmis_block(),
            sysmis_bits: header.sysmis.to_bits(),
            layout,
            options,
            expected: header.cases(),
            cases_written: 0,
        }
    }

    /// Cell layout of each case
    pub fn layout(&self) -> &[CellLayout] {
        &self.layout
    }

    /// Number of cases encoded so far
    pub fn cases_written(&self) -> usize {
        self.cases_written
    }

    /// Encode one case
    ///
    /// The whole row is checked against the layout before any of it is
    /// written.
    pub fn write_case(&mut self, row: &[Cell]) -> SavResult<()> {
        if let Some(expected) = self.expected
            && self.cases_written >= expected
        {
            return Err(SavError::MalformedRecord(format!(
                "header declares {expected} cases, got more"
            )));
        }
        self.check_row(row)?;

        for (index, cell) in row.iter().enumerate() {
            self.write_cell(index, cell)?;
        }
        self.cases_written += 1;
        trace!(case = self.cases_written, "encoded case");
        Ok(())
    }

    /// Flush, check the case count and return the wrapped writer
    pub fn finish(self) -> SavResult<W> {
        if let Some(expected) = self.expected
            && expected != self.cases_written
        {
            return Err(SavError::MalformedRecord(format!(
                "header declares {expected} cases, {} written",
                self.cases_written
            )));
        }
        debug!(cases = self.cases_written, "finished case data");
        self.sink.finish()
    }

    fn check_row(&self, row: &[Cell]) -> SavResult<()> {
        if row.len() != self.layout.len() {
            return Err(SavError::MalformedRecord(format!(
                "case has {} cells, expected {}",
                row.len(),
                self.layout.len()
            )));
        }
        for (cell, layout) in row.iter().zip(&self.layout) {
            let fits = match layout {
                CellLayout::Numeric { .. } => !cell.is_text(),
                CellLayout::String { .. } => !matches!(cell, Cell::Number(_)),
            };
            if !fits {
                return Err(mismatch(layout, cell));
            }
        }
        Ok(())
    }

    fn write_cell(&mut self, index: usize, cell: &Cell) -> SavResult<()> {
        match (&self.layout[index], cell) {
            (CellLayout::Numeric { .. }, Cell::Missing) => write_block(&mut self.sink, self.sysmis),
            (CellLayout::Numeric { .. }, Cell::Number(value)) => {
                let block = if value.to_bits() == self.sysmis_bits {
                    self.sysmis
                } else {
                    self.options.encode_f64(*value)
                };
                write_block(&mut self.sink, block)
            }
            (CellLayout::String { width, .. }, Cell::Text(bytes)) => {
                write_string(&mut self.sink, &bytes[..bytes.len().min(*width)], *width)
            }
            (CellLayout::String { width, .. }, Cell::Missing) => {
                write_string(&mut self.sink, &[], *width)
            }
            (layout, cell) => Err(mismatch(layout, cell)),
        }
    }
}

fn mismatch(layout: &CellLayout, cell: &Cell) -> SavError {
    SavError::MalformedRecord(format!("cell {cell:?} does not fit variable {}", layout.name()))
}

fn write_block<S: BlockSink>(sink: &mut S, block: [u8; BLOCK_SIZE]) -> SavResult<()> {
    sink.append(&block)?;
    sink.flush()
}

fn write_string<S: BlockSink>(sink: &mut S, value: &[u8], width: usize) -> SavResult<()> {
    let mut rest = value;
    for segment_width in segment_read_widths(width) {
        let take = segment_width.min(rest.len());
        let mut segment = Vec::with_capacity(segment_width);
        segment.extend_from_slice(&rest[..take]);
        segment.resize(segment_width, b' ');
        sink.append(&segment)?;
        let alignment = round_up(segment_width, SLOT_SIZE) - segment_width;
        sink.append(&SPACES_BLOCK[..alignment])?;
        sink.flush()?;
        rest = &rest[take..];
    }
    Ok(())
}

/// Decode every case
pub fn read_cases<R: Read>(context: &CaseContext, reader: R) -> SavResult<Vec<CaseRow>> {
    CaseReader::new(context, reader)?.collect()
}

/// Encode every case and return the writer
///
/// A known header case count must match the number of rows; this is checked
/// before anything is written.
pub fn write_cases<W: Write>(context: &CaseContext, rows: &[CaseRow], writer: W) -> SavResult<W> {
    check_case_count(context, rows.len())?;
    let mut cases = CaseWriter::new(context, writer)?;
    for row in rows {
        cases.write_case(row)?;
    }
    cases.finish()
}

/// Decode a data record: preamble, then every case
pub fn read_data_record<R: Read>(context: &CaseContext, reader: R) -> SavResult<Vec<CaseRow>> {
    CaseReader::with_preamble(context, reader)?.collect()
}

/// Encode a data record: preamble, then every case
pub fn write_data_record<W: Write>(
    context: &CaseContext,
    rows: &[CaseRow],
    writer: W,
) -> SavResult<W> {
    check_case_count(context, rows.len())?;
    let mut cases = CaseWriter::with_preamble(context, writer)?;
    for row in rows {
        cases.write_case(row)?;
    }
    cases.finish()
}

fn check_case_count(context: &CaseContext, rows: usize) -> SavResult<()> {
    if let Some(expected) = context.header().and_then(|h| h.cases())
        && expected != rows
    {
        return Err(SavError::MalformedRecord(format!(
            "header declares {expected} cases, {rows} supplied"
        )));
    }
    Ok(())
}
