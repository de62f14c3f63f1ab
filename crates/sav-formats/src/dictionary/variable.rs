//! Logical variables and their print/write formats

use serde::{Deserialize, Serialize};

use crate::segment;

/// Format type code for strings (`A`)
pub const FORMAT_A: u8 = 1;
/// Format type code for hexadecimal strings (`AHEX`)
pub const FORMAT_AHEX: u8 = 2;
/// Format type code for plain numbers (`F`)
pub const FORMAT_F: u8 = 5;
/// Format type code for dates (`DATE`)
pub const FORMAT_DATE: u8 = 20;
/// Format type code for date-times (`DATETIME`)
pub const FORMAT_DATETIME: u8 = 22;

/// Print or write format, packed on disk as `type << 16 | width << 8 | decimals`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Format {
    /// Format type code
    pub format_type: u8,
    /// Display width
    pub width: u8,
    /// Decimal places
    pub decimals: u8,
}

impl Format {
    /// String format `A<width>`; widths past 255 are capped
    pub fn string(width: usize) -> Self {
        Self {
            format_type: FORMAT_A,
            width: width.min(usize::from(u8::MAX)) as u8,
            decimals: 0,
        }
    }

    /// Numeric format `F<width>.<decimals>`
    pub const fn numeric(width: u8, decimals: u8) -> Self {
        Self {
            format_type: FORMAT_F,
            width,
            decimals,
        }
    }

    /// Unpack from the on-disk representation
    pub const fn from_u32(packed: u32) -> Self {
        Self {
            format_type: (packed >> 16) as u8,
            width: (packed >> 8) as u8,
            decimals: packed as u8,
        }
    }

    /// Pack into the on-disk representation
    pub const fn to_u32(self) -> u32 {
        (self.format_type as u32) << 16 | (self.width as u32) << 8 | self.decimals as u32
    }

    /// Whether values in this format are strings
    pub const fn is_string(self) -> bool {
        matches!(self.format_type, FORMAT_A | FORMAT_AHEX)
    }

    /// Whether values in this format are numbers
    pub const fn is_numeric(self) -> bool {
        !self.is_string()
    }
}

impl Default for Format {
    fn default() -> Self {
        Self::numeric(8, 2)
    }
}

/// A logical variable: one cell per case, however many segments it needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Short name as stored in the descriptor (at most 8 bytes)
    pub name: String,
    /// Logical width: 0 for numbers, the byte length for strings
    pub width: usize,
    /// Print format
    pub print: Format,
    /// Write format
    pub write: Format,
    /// Variable label
    #[serde(default)]
    pub label: Option<String>,
}

impl Variable {
    /// Numeric variable with the default `F8.2` format
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            width: 0,
            print: Format::default(),
            write: Format::default(),
            label: None,
        }
    }

    /// String variable of `width` bytes
    pub fn string(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            width,
            print: Format::string(width),
            write: Format::string(width),
            label: None,
        }
    }

    /// Set the variable label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set both print and write format
    pub fn with_format(mut self, format: Format) -> Self {
        self.print = format;
        self.write = format;
        self
    }

    /// Whether cells of this variable are numbers
    pub fn is_numeric(&self) -> bool {
        self.write.is_numeric()
    }

    /// Whether this variable is split into several segments
    pub fn is_very_long(&self) -> bool {
        segment::is_spanning(self.width)
    }

    /// Number of 8-byte slots this variable contributes to a case
    pub fn octs(&self) -> usize {
        if self.is_numeric() {
            1
        } else {
            segment::width_to_octs(self.width)
        }
    }
}
