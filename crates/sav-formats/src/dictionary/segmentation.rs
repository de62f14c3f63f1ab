//! Descriptor emission for very long string segments
//!
//! The primary descriptor of a very long string carries segment 0. Every
//! further segment gets its own descriptor so that older readers see a valid
//! sequence of ordinary string variables.

use tracing::trace;

use super::record::{SHORT_NAME_LEN, VariableRecord};
use super::variable::{Format, Variable};
use crate::segment::{self, REAL_CHUNK};

/// Characters of the parent name kept in a segment name
pub const SEGMENT_NAME_PREFIX: usize = 5;

/// Name of segment `index` of the variable called `parent`
///
/// The upper-cased prefix is cut short when needed so that prefix and index
/// together fit the short-name field. Only unique among the segments of one
/// parent: two variables sharing their first five characters produce
/// identical segment names.
pub fn segment_name(parent: &str, index: usize) -> String {
    let suffix = index.to_string();
    let budget = SHORT_NAME_LEN.saturating_sub(suffix.len());
    let mut name = String::with_capacity(SHORT_NAME_LEN);
    for upper in parent
        .chars()
        .take(SEGMENT_NAME_PREFIX)
        .flat_map(char::to_uppercase)
    {
        if name.len() + upper.len_utf8() > budget {
            break;
        }
        name.push(upper);
    }
    name.push_str(&suffix);
    name
}

/// Descriptor for the primary (first) segment, width capped at 255
pub fn primary_record(variable: &Variable) -> VariableRecord {
    let width = if variable.is_numeric() {
        0
    } else {
        variable.width.min(REAL_CHUNK) as i32
    };
    let mut record = VariableRecord::new(&variable.name, width, variable.print, variable.write);
    record.label = variable.label.as_ref().map(|l| l.as_bytes().to_vec());
    record
}

/// Descriptors for segments 1.. of a very long string
///
/// Empty unless the variable spans several segments.
pub fn continuation_records(variable: &Variable) -> Vec<VariableRecord> {
    if variable.is_numeric() || !segment::is_spanning(variable.width) {
        return Vec::new();
    }

    let format = Format::string(1);
    segment::segments(variable.width)
        .skip(1)
        .map(|seg| {
            let name = segment_name(&variable.name, seg.index);
            trace!(parent = %variable.name, %name, width = seg.width, "segment descriptor");
            VariableRecord::new(&name, seg.width as i32, format, format)
        })
        .collect()
}

/// Primary descriptor followed by all continuation descriptors
pub fn variable_records(variable: &Variable) -> Vec<VariableRecord> {
    let mut records = vec![primary_record(variable)];
    records.extend(continuation_records(variable));
    records
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_name() {
        assert_eq!(segment_name("longer1", 1), "LONGE1");
        assert_eq!(segment_name("ab", 11), "AB11");
        // prefix is counted in characters, not bytes
        assert_eq!(segment_name("ñandúes", 2), "ÑANDÚ2");
    }

    #[test]
    fn test_segment_name_fits_short_name_field() {
        // ÑANDÚ is 7 bytes, so a two-digit index pushes out the Ú
        assert_eq!(segment_name("ñandúes", 11), "ÑAND11");
        assert_ne!(segment_name("ñandúes", 11), segment_name("ñandúes", 1));
        assert_eq!(segment_name("straße", 10), "STRASS10");
        assert_eq!(segment_name("straße", 100), "STRAS100");

        for index in 1..=120 {
            let name = segment_name("ñandúes", index);
            assert!(name.len() <= SHORT_NAME_LEN, "{name} is too long");
            assert_eq!(
                VariableRecord::new(&name, 1, Format::string(1), Format::string(1)).name(),
                name
            );
        }
    }

    #[test]
    fn test_short_string_has_no_continuations() {
        assert!(continuation_records(&Variable::string("S", 255)).is_empty());
        assert!(continuation_records(&Variable::numeric("N")).is_empty());
        assert_eq!(variable_records(&Variable::string("S", 100)).len(), 1);
    }

    #[test]
    fn test_continuations_for_3000_bytes() {
        let variable = Variable::string("LONGVAR", 3000).with_label("long text");
        let records = variable_records(&variable);
        assert_eq!(records.len(), 12);

        let primary = &records[0];
        assert_eq!(primary.width, 255);
        assert_eq!(primary.name(), "LONGVAR");
        assert_eq!(primary.label.as_deref(), Some(b"long text".as_slice()));

        for (i, record) in records.iter().enumerate().skip(1) {
            assert_eq!(record.name(), format!("LONGV{i}"));
            assert!(record.label.is_none());
            assert_eq!(record.missing_values_format, 0);
            assert_eq!(record.print.to_u32(), 0x0001_0100);
            assert_eq!(record.write.to_u32(), 0x0001_0100);
        }

        assert!(records[1..11].iter().all(|r| r.width == 255));
        assert_eq!(records[11].width, 232);
    }

    #[test]
    fn test_boundary_width_256() {
        let records = variable_records(&Variable::string("EDGE", 256));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].width, 255);
        assert_eq!(records[1].width, 8);
        assert_eq!(records[1].name(), "EDGE1");
    }
}
