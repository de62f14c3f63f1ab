//! Variable metadata consumed and produced by the case-data codec
//!
//! The record stream stores variables as [`VariableRecord`] descriptors. A
//! logical [`Variable`] maps to one descriptor, or to several when it is a very
//! long string. The true widths of very long strings live in a
//! [`VeryLongStringMap`] written as a separate info record.
//!
//! # Example
//!
//! ```
//! use sav_formats::dictionary::{Dictionary, Variable};
//!
//! let dictionary = Dictionary::from_variables(&[
//!     Variable::numeric("AGE"),
//!     Variable::string("NOTES", 600),
//! ]);
//!
//! // AGE, NOTES and two NOTES continuation segments
//! assert_eq!(dictionary.records().len(), 4);
//! assert_eq!(dictionary.very_long_strings().get("NOTES"), Some(600));
//! ```

mod record;
pub mod segmentation;
mod variable;
mod very_long_string;

pub use record::{
    CONTINUATION_WIDTH, SHORT_NAME_LEN, VARIABLE_RECORD_TYPE, VariableRecord, pad_name,
};
pub use variable::{
    FORMAT_A, FORMAT_AHEX, FORMAT_DATE, FORMAT_DATETIME, FORMAT_F, Format, Variable,
};
pub use very_long_string::{VERY_LONG_STRING_SUBTYPE, VeryLongStringMap};

use tracing::debug;

/// Physical descriptors plus the width map for a list of logical variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    records: Vec<VariableRecord>,
    very_long_strings: VeryLongStringMap,
    nominal_case_size: usize,
}

impl Dictionary {
    /// Expand logical variables into descriptors, in order
    pub fn from_variables(variables: &[Variable]) -> Self {
        let mut dictionary = Self::default();

        for variable in variables {
            let records = segmentation::variable_records(variable);
            // keyed like the descriptor the reader will look it up by
            if !variable.is_numeric()
                && variable.is_very_long()
                && let Some(primary) = records.first()
            {
                dictionary
                    .very_long_strings
                    .insert(primary.name_bytes(), variable.width);
            }
            dictionary.records.extend(records);
            dictionary.nominal_case_size += variable.octs();
        }

        debug!(
            variables = variables.len(),
            records = dictionary.records.len(),
            very_long = dictionary.very_long_strings.len(),
            "built dictionary"
        );
        dictionary
    }

    /// Wrap descriptors and a width map read from a file
    pub fn from_records(records: Vec<VariableRecord>, very_long_strings: VeryLongStringMap) -> Self {
        let nominal_case_size = records.iter().map(record_octs).sum();
        Self {
            records,
            very_long_strings,
            nominal_case_size,
        }
    }

    /// Descriptors in record-stream order
    pub fn records(&self) -> &[VariableRecord] {
        &self.records
    }

    /// True widths of very long strings
    pub fn very_long_strings(&self) -> &VeryLongStringMap {
        &self.very_long_strings
    }

    /// Number of 8-byte slots per case
    pub fn nominal_case_size(&self) -> usize {
        self.nominal_case_size
    }

    /// Split into descriptors and width map
    pub fn into_parts(self) -> (Vec<VariableRecord>, VeryLongStringMap) {
        (self.records, self.very_long_strings)
    }
}

/// Slots a descriptor accounts for; `-1` slots are covered by their primary
fn record_octs(record: &VariableRecord) -> usize {
    if record.is_continuation() {
        0
    } else {
        (record.width.max(1) as usize).div_ceil(crate::segment::SLOT_SIZE)
    }
}
