//! Case data: the matrix of cells following the data record type code
//!
//! A [`CaseContext`] carries the header fields, the variable descriptors and
//! the very long string width map. [`CaseReader`] and [`CaseWriter`] then
//! turn rows of [`Cell`]s into blocks and back, using bytecode compression or
//! plain blocks depending on [`Header::compressed`].
//!
//! # Example
//!
//! ```
//! use sav_formats::data::{CaseContext, Cell, Header, read_cases, write_cases};
//! use sav_formats::dictionary::{Dictionary, Variable};
//!
//! let dictionary = Dictionary::from_variables(&[
//!     Variable::numeric("AGE"),
//!     Variable::string("NAME", 12),
//! ]);
//! let context = CaseContext::from_dictionary(Header::new().with_case_count(2), &dictionary);
//!
//! let rows = vec![
//!     vec![Cell::Number(34.0), Cell::from("Ada")],
//!     vec![Cell::Missing, Cell::from("Grace Hopper")],
//! ];
//! let data = write_cases(&context, &rows, Vec::new()).expect("write");
//! assert_eq!(read_cases(&context, data.as_slice()).expect("read"), rows);
//! ```

mod cell;
mod context;
mod matrix;
mod raw;

pub use cell::{CaseRow, Cell};
pub use context::{CaseContext, CellLayout, Header, UNKNOWN_CASE_COUNT};
pub use matrix::{
    CaseReader, CaseSink, CaseSource, CaseWriter, DATA_RECORD_TYPE, DataRecordPreamble,
    read_cases, read_data_record, write_cases, write_data_record,
};
pub use raw::{RawBlockReader, RawBlockWriter};
