//! Variable descriptor record (record type 2)

use binrw::io::{Read, Seek, SeekFrom, Write};
use binrw::{BinRead, BinResult, BinWrite, Endian};

use super::variable::Format;
use crate::error::{SavError, SavResult};
use crate::segment::round_up;

/// Record type code of a variable descriptor
pub const VARIABLE_RECORD_TYPE: i32 = 2;

/// Width marking an 8-byte continuation of an older-style long string
pub const CONTINUATION_WIDTH: i32 = -1;

/// Length of the fixed short-name field
pub const SHORT_NAME_LEN: usize = 8;

/// One variable descriptor as stored in the record stream
///
/// Very long strings appear as a primary descriptor followed by one
/// descriptor per extra segment; see
/// [`segmentation`](crate::dictionary::segmentation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRecord {
    /// Width: 0 numeric, 1..=255 string, -1 continuation slot
    pub width: i32,
    /// Missing value declaration: 0 none, 1..=3 discrete, -2/-3 range
    pub missing_values_format: i32,
    /// Print format
    pub print: Format,
    /// Write format
    pub write: Format,
    /// Short name, right-padded with spaces
    pub name: [u8; SHORT_NAME_LEN],
    /// Variable label
    pub label: Option<Vec<u8>>,
    /// Raw missing values, one 8-byte element each
    pub missing_values: Vec<[u8; 8]>,
}

impl VariableRecord {
    /// Create a descriptor without label or missing values
    pub fn new(name: &str, width: i32, print: Format, write: Format) -> Self {
        Self {
            width,
            missing_values_format: 0,
            print,
            write,
            name: pad_name(name),
            label: None,
            missing_values: Vec::new(),
        }
    }

    /// Short name with padding removed
    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }

    /// Raw short-name bytes with padding removed
    pub fn name_bytes(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .rposition(|&b| b != b' ' && b != 0)
            .map_or(0, |p| p + 1);
        &self.name[..end]
    }

    /// Whether this is an 8-byte continuation slot of an older-style long string
    pub fn is_continuation(&self) -> bool {
        self.width == CONTINUATION_WIDTH
    }

    /// Whether cells described by this record are numbers
    pub fn is_numeric(&self) -> bool {
        self.width == 0
    }

    /// Width as stored, rejecting negative values
    pub fn width(&self) -> SavResult<usize> {
        usize::try_from(self.width).map_err(|_| SavError::InvalidWidth(self.width))
    }
}

/// Encode a short name into the fixed 8-byte field
pub fn pad_name(name: &str) -> [u8; SHORT_NAME_LEN] {
    let mut field = [b' '; SHORT_NAME_LEN];
    let bytes = name.as_bytes();
    let len = bytes.len().min(SHORT_NAME_LEN);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

fn custom_error(pos: u64, err: SavError) -> binrw::Error {
    binrw::Error::Custom {
        pos,
        err: Box::new(err),
    }
}

impl BinRead for VariableRecord {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let pos = reader.stream_position()?;
        let record_type = i32::read_options(reader, endian, ())?;
        if record_type != VARIABLE_RECORD_TYPE {
            return Err(custom_error(
                pos,
                SavError::MalformedRecord(format!(
                    "expected variable record type {VARIABLE_RECORD_TYPE}, got {record_type}"
                )),
            ));
        }

        let width = i32::read_options(reader, endian, ())?;
        let has_label = u32::read_options(reader, endian, ())?;
        let missing_values_format = i32::read_options(reader, endian, ())?;
        let print = Format::from_u32(u32::read_options(reader, endian, ())?);
        let write = Format::from_u32(u32::read_options(reader, endian, ())?);
        let name = <[u8; SHORT_NAME_LEN]>::read_options(reader, endian, ())?;

        let label = if has_label == 0 {
            None
        } else {
            let len = u32::read_options(reader, endian, ())? as usize;
            let mut text = vec![0u8; len];
            reader.read_exact(&mut text)?;
            let padding = (round_up(len, 4) - len) as i64;
            reader.seek(SeekFrom::Current(padding))?;
            Some(text)
        };

        if !matches!(missing_values_format, -3..=3) {
            return Err(custom_error(
                pos,
                SavError::MalformedRecord(format!(
                    "invalid missing value format {missing_values_format}"
                )),
            ));
        }
        let mut missing_values = Vec::new();
        for _ in 0..missing_values_format.unsigned_abs() {
            missing_values.push(<[u8; 8]>::read_options(reader, endian, ())?);
        }

        Ok(Self {
            width,
            missing_values_format,
            print,
            write,
            name,
            label,
            missing_values,
        })
    }
}

impl BinWrite for VariableRecord {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        VARIABLE_RECORD_TYPE.write_options(writer, endian, ())?;
        self.width.write_options(writer, endian, ())?;
        u32::from(self.label.is_some()).write_options(writer, endian, ())?;
        self.missing_values_format.write_options(writer, endian, ())?;
        self.print.to_u32().write_options(writer, endian, ())?;
        self.write.to_u32().write_options(writer, endian, ())?;
        writer.write_all(&self.name)?;

        if let Some(label) = &self.label {
            (label.len() as u32).write_options(writer, endian, ())?;
            writer.write_all(label)?;
            let padding = round_up(label.len(), 4) - label.len();
            writer.write_all(&[b' '; 3][..padding])?;
        }

        for value in &self.missing_values {
            writer.write_all(value)?;
        }
        Ok(())
    }
}

impl crate::SavFormat for VariableRecord {
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        let mut cursor = std::io::Cursor::new(data);
        Ok(Self::read_options(&mut cursor, Endian::Little, ())?)
    }

    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        self.write_options(&mut cursor, Endian::Little, ())?;
        Ok(cursor.into_inner())
    }
}
