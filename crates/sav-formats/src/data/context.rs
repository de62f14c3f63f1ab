//! Inputs shared by the case reader and writer
//!
//! Everything the codec needs from the surrounding file is passed in a
//! [`CaseContext`]. Missing pieces are reported as
//! [`SavError::MalformedRecord`] before the stream is touched.

use binrw::Endian;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bytecode::{BiasMode, ByteCodeOptions, DEFAULT_BIAS, serde_endian};
use crate::dictionary::{Dictionary, VariableRecord, VeryLongStringMap};
use crate::error::{SavError, SavResult};
use crate::segment::segment_count;

/// Case count value meaning "not recorded"
pub const UNKNOWN_CASE_COUNT: i32 = -1;

/// File header fields that affect case data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Whether case data is bytecode compressed
    #[serde(default = "default_compressed")]
    pub compressed: bool,
    /// Compression bias
    #[serde(default = "default_bias")]
    pub bias: f64,
    /// Number of cases, `-1` when unknown
    #[serde(default = "default_case_count")]
    pub case_count: i32,
    /// Numbers with this exact bit pattern are written as system-missing.
    /// The default quiet NaN only matches itself.
    #[serde(
        with = "serde_sysmis",
        default = "default_sysmis",
        skip_serializing_if = "is_default_sysmis"
    )]
    pub sysmis: f64,
    /// Byte order of numeric data
    #[serde(with = "serde_endian", default = "default_endian")]
    pub endian: Endian,
}

const fn default_compressed() -> bool {
    true
}

const fn default_bias() -> f64 {
    DEFAULT_BIAS
}

const fn default_case_count() -> i32 {
    UNKNOWN_CASE_COUNT
}

const fn default_sysmis() -> f64 {
    f64::NAN
}

const fn default_endian() -> Endian {
    Endian::Little
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_default_sysmis(value: &f64) -> bool {
    value.to_bits() == default_sysmis().to_bits()
}

/// Sysmis as a JSON number when finite, otherwise as `{"bits": u64}` so NaN
/// payloads and infinities survive
mod serde_sysmis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Value(f64),
        Bits { bits: u64 },
    }

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            Repr::Value(*value)
        } else {
            Repr::Bits { bits: value.to_bits() }
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Value(value) => value,
            Repr::Bits { bits } => f64::from_bits(bits),
        })
    }
}

impl Default for Header {
    fn default() -> Self {
        Self {
            compressed: default_compressed(),
            bias: default_bias(),
            case_count: default_case_count(),
            sysmis: default_sysmis(),
            endian: default_endian(),
        }
    }
}

impl Header {
    /// Create a header with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression flag
    pub fn with_compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Set the compression bias
    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    /// Set the case count (`-1` for unknown)
    pub fn with_case_count(mut self, case_count: i32) -> Self {
        self.case_count = case_count;
        self
    }

    /// Set the number written as system-missing
    pub fn with_sysmis(mut self, sysmis: f64) -> Self {
        self.sysmis = sysmis;
        self
    }

    /// Set the byte order
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Case count, `None` when unknown
    pub fn cases(&self) -> Option<usize> {
        usize::try_from(self.case_count).ok()
    }

    /// Validate the header
    pub fn validate(&self) -> Result<(), String> {
        if self.case_count < UNKNOWN_CASE_COUNT {
            return Err(format!("invalid case count {}", self.case_count));
        }
        if !self.bias.is_finite() {
            return Err("bias must be finite".to_string());
        }
        Ok(())
    }

    /// Bytecode options for this header
    pub fn bytecode_options(&self, bias_mode: BiasMode) -> ByteCodeOptions {
        ByteCodeOptions::new()
            .with_endian(self.endian)
            .with_bias(self.bias)
            .with_bias_mode(bias_mode)
    }
}

/// Shape of one output cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellLayout {
    /// 8-byte number
    Numeric {
        /// Variable name
        name: String,
    },
    /// String of the given true width
    String {
        /// Variable name
        name: String,
        /// True width in bytes
        width: usize,
    },
}

impl CellLayout {
    /// Variable name
    pub fn name(&self) -> &str {
        match self {
            Self::Numeric { name } | Self::String { name, .. } => name,
        }
    }
}

/// Header, descriptors and width map for one pass over case data
#[derive(Debug, Clone, Default)]
pub struct CaseContext {
    header: Option<Header>,
    variables: Option<Vec<VariableRecord>>,
    very_long_strings: Option<VeryLongStringMap>,
    bias_mode: BiasMode,
}

/// Fully resolved context, ready to drive a reader or writer
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub header: Header,
    pub layout: Vec<CellLayout>,
    pub options: ByteCodeOptions,
}

impl CaseContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with header and dictionary in place
    pub fn from_dictionary(header: Header, dictionary: &Dictionary) -> Self {
        Self::new()
            .with_header(header)
            .with_variables(dictionary.records().to_vec())
            .with_very_long_strings(dictionary.very_long_strings().clone())
    }

    /// Set the header
    pub fn with_header(mut self, header: Header) -> Self {
        self.header = Some(header);
        self
    }

    /// Set the descriptors, primary and continuation, in record order
    pub fn with_variables(mut self, variables: Vec<VariableRecord>) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Set the very long string width map
    pub fn with_very_long_strings(mut self, map: VeryLongStringMap) -> Self {
        self.very_long_strings = Some(map);
        self
    }

    /// Set the bias-range behaviour
    pub fn with_bias_mode(mut self, bias_mode: BiasMode) -> Self {
        self.bias_mode = bias_mode;
        self
    }

    /// Header, if set
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Descriptors, if set
    pub fn variables(&self) -> Option<&[VariableRecord]> {
        self.variables.as_deref()
    }

    /// Width map, if set
    pub fn very_long_strings(&self) -> Option<&VeryLongStringMap> {
        self.very_long_strings.as_ref()
    }

    /// Bias-range behaviour
    pub fn bias_mode(&self) -> BiasMode {
        self.bias_mode
    }

    /// Check that every input is present and consistent
    pub fn validate(&self) -> SavResult<()> {
        self.resolve().map(|_| ())
    }

    /// Cell layout of one case
    pub fn layout(&self) -> SavResult<Vec<CellLayout>> {
        let variables = self
            .variables
            .as_deref()
            .ok_or_else(|| missing("variable list"))?;
        let map = self
            .very_long_strings
            .as_ref()
            .ok_or_else(|| missing("very long string map"))?;
        cell_layout(variables, map)
    }

    pub(crate) fn resolve(&self) -> SavResult<Resolved> {
        let header = self.header.ok_or_else(|| missing("header"))?;
        header.validate().map_err(|e| {
            warn!(error = %e, "rejected header");
            SavError::MalformedRecord(e)
        })?;
        let layout = self.layout()?;
        Ok(Resolved {
            header,
            layout,
            options: header.bytecode_options(self.bias_mode),
        })
    }
}

fn missing(what: &str) -> SavError {
    warn!(missing = what, "incomplete case context");
    SavError::MalformedRecord(format!("case context has no {what}"))
}

/// Map descriptors to cells
///
/// Old-style `-1` continuation slots are skipped. A very long string claims
/// the descriptors of its extra segments.
fn cell_layout(variables: &[VariableRecord], map: &VeryLongStringMap) -> SavResult<Vec<CellLayout>> {
    let mut layout = Vec::new();
    let mut records = variables.iter().filter(|r| !r.is_continuation());

    while let Some(record) = records.next() {
        let name = record.name();
        if record.is_numeric() {
            layout.push(CellLayout::Numeric { name });
            continue;
        }

        let width = map.width_or(record.name_bytes(), record.width()?);
        for segment in 1..segment_count(width) {
            if records.next().is_none() {
                return Err(SavError::MalformedRecord(format!(
                    "variable {name} of width {width} is missing segment {segment}"
                )));
            }
        }
        layout.push(CellLayout::String { name, width });
    }

    Ok(layout)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dictionary::{CONTINUATION_WIDTH, Format, Variable};

    #[test]
    fn test_header_defaults() {
        let header = Header::default();
        assert!(header.compressed);
        assert_eq!(header.bias, 100.0);
        assert_eq!(header.cases(), None);
        assert!(header.sysmis.is_nan());
        assert_eq!(header.with_case_count(3).cases(), Some(3));
        assert!(Header::new().with_case_count(-2).validate().is_err());
        assert!(Header::new().with_bias(f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_header_serde() {
        let header: Header = serde_json::from_str(r#"{"case_count": 10, "endian": "Big"}"#)
            .expect("deserialize");
        assert_eq!(header.case_count, 10);
        assert_eq!(header.endian, Endian::Big);
        assert!(header.compressed);
        assert!(header.sysmis.is_nan());

        let json = serde_json::to_string(&Header::default()).expect("serialize");
        assert!(!json.contains("sysmis"));
        let back: Header = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.case_count, UNKNOWN_CASE_COUNT);
        assert_eq!(back.sysmis.to_bits(), f64::NAN.to_bits());
    }

    #[test]
    fn test_sysmis_serde_keeps_bits() {
        let payload = f64::from_bits(0x7FF8_0000_0000_0001);
        let json = serde_json::to_string(&Header::new().with_sysmis(payload)).expect("serialize");
        assert!(json.contains("sysmis"));
        let back: Header = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.sysmis.to_bits(), 0x7FF8_0000_0000_0001);

        for sysmis in [-1.0, -f64::MAX, f64::NEG_INFINITY] {
            let json = serde_json::to_string(&Header::new().with_sysmis(sysmis)).expect("serialize");
            let back: Header = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(back.sysmis.to_bits(), sysmis.to_bits());
        }

        let header: Header = serde_json::from_str(r#"{"sysmis": -1.0}"#).expect("deserialize");
        assert_eq!(header.sysmis, -1.0);
    }

    #[test]
    fn test_missing_pieces() {
        let dictionary = Dictionary::from_variables(&[Variable::numeric("X")]);
        let full = CaseContext::from_dictionary(Header::default(), &dictionary);
        assert!(full.validate().is_ok());

        let no_header = CaseContext::new()
            .with_variables(dictionary.records().to_vec())
            .with_very_long_strings(VeryLongStringMap::new());
        assert!(matches!(no_header.validate(), Err(SavError::MalformedRecord(_))));

        let no_variables = CaseContext::new()
            .with_header(Header::default())
            .with_very_long_strings(VeryLongStringMap::new());
        assert!(matches!(no_variables.validate(), Err(SavError::MalformedRecord(_))));

        let no_map = CaseContext::new()
            .with_header(Header::default())
            .with_variables(dictionary.records().to_vec());
        assert!(matches!(no_map.validate(), Err(SavError::MalformedRecord(_))));
    }

    #[test]
    fn test_layout_collapses_segments() {
        let dictionary = Dictionary::from_variables(&[
            Variable::numeric("ID"),
            Variable::string("LONG", 3000),
            Variable::string("SHORT", 10),
        ]);
        let context = CaseContext::from_dictionary(Header::default(), &dictionary);
        let layout = context.layout().expect("layout");

        assert_eq!(
            layout,
            vec![
                CellLayout::Numeric { name: "ID".into() },
                CellLayout::String { name: "LONG".into(), width: 3000 },
                CellLayout::String { name: "SHORT".into(), width: 10 },
            ]
        );
    }

    #[test]
    fn test_layout_skips_old_style_continuations() {
        let records = vec![
            VariableRecord::new("S", 20, Format::string(20), Format::string(20)),
            VariableRecord::new("", CONTINUATION_WIDTH, Format::string(20), Format::string(20)),
            VariableRecord::new("", CONTINUATION_WIDTH, Format::string(20), Format::string(20)),
            VariableRecord::new("N", 0, Format::default(), Format::default()),
        ];
        let layout = cell_layout(&records, &VeryLongStringMap::new()).expect("layout");
        assert_eq!(layout.len(), 2);
        assert_eq!(layout[1].name(), "N");
    }

    #[test]
    fn test_layout_missing_segment() {
        let records = vec![VariableRecord::new("LONG", 255, Format::string(255), Format::string(255))];
        let map: VeryLongStringMap = [("LONG".to_string(), 600)].into_iter().collect();
        assert!(matches!(cell_layout(&records, &map), Err(SavError::MalformedRecord(_))));
    }

    #[test]
    fn test_layout_for_name_longer_than_short_name() {
        let dictionary = Dictionary::from_variables(&[Variable::string("LONGNAME1", 600)]);
        assert_eq!(dictionary.records().len(), 3);

        let context = CaseContext::from_dictionary(Header::default(), &dictionary);
        assert_eq!(
            context.layout().expect("layout"),
            vec![CellLayout::String { name: "LONGNAME".into(), width: 600 }]
        );
    }

    #[test]
    fn test_layout_for_legacy_code_page_names() {
        let mut first = VariableRecord::new("", 255, Format::string(255), Format::string(255));
        first.name = *b"A\xD1      ";
        let mut second = first.clone();
        second.name = *b"A\xC9      ";
        let records = vec![
            first,
            VariableRecord::new("A\u{d1}0", 45, Format::string(45), Format::string(45)),
            second,
            VariableRecord::new("A\u{c9}0", 255, Format::string(255), Format::string(255)),
            VariableRecord::new("A\u{c9}1", 255, Format::string(255), Format::string(255)),
            VariableRecord::new("A\u{c9}2", 244, Format::string(244), Format::string(244)),
        ];
        let map = VeryLongStringMap::from_text(b"A\xD1=00300\0\tA\xC9=01000\0\t").expect("map");

        let widths: Vec<_> = cell_layout(&records, &map)
            .expect("layout")
            .iter()
            .map(|cell| match cell {
                CellLayout::String { width, .. } => *width,
                CellLayout::Numeric { .. } => 0,
            })
            .collect();
        assert_eq!(widths, vec![300, 1000]);
    }

    #[test]
    fn test_negative_width_rejected() {
        let records = vec![VariableRecord::new("BAD", -5, Format::default(), Format::default())];
        assert!(matches!(
            cell_layout(&records, &VeryLongStringMap::new()),
            Err(SavError::InvalidWidth(-5))
        ));
    }
}
