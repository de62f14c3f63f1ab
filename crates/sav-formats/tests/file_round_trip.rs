#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Data record written to and read back from a file on disk

use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};

use pretty_assertions::assert_eq;
use sav_formats::data::{
    CaseContext, Cell, DATA_RECORD_TYPE, Header, read_data_record, write_data_record,
};
use sav_formats::dictionary::{Dictionary, Variable, VeryLongStringMap};
use sav_formats::SavError;
use tempfile::tempfile;

fn dictionary() -> Dictionary {
    Dictionary::from_variables(&[
        Variable::numeric("WAVE"),
        Variable::string("ANSWER", 400).with_label("free text answer"),
        Variable::numeric("WEIGHT"),
    ])
}

fn rows(count: usize) -> Vec<Vec<Cell>> {
    (0..count)
        .map(|i| {
            let answer = format!("answer {i} ").repeat(i % 30 + 1);
            let weight = if i % 5 == 0 { Cell::Missing } else { Cell::Number(i as f64 / 3.0) };
            vec![Cell::Number(i as f64), Cell::from(answer.trim_end()), weight]
        })
        .collect()
}

fn write_then_read(header: Header) {
    let rows = rows(250);
    let context = CaseContext::from_dictionary(header, &dictionary());

    let mut file = tempfile().expect("temp file");
    {
        let writer = BufWriter::new(&mut file);
        let mut writer = write_data_record(&context, &rows, writer).expect("write");
        writer.flush().expect("flush");
    }
    file.seek(SeekFrom::Start(0)).expect("rewind");

    let back = read_data_record(&context, BufReader::new(&file)).expect("read");
    assert_eq!(back.len(), rows.len());
    assert_eq!(back, rows);
}

#[test]
fn compressed_file_round_trip() {
    write_then_read(Header::new().with_case_count(250));
}

#[test]
fn uncompressed_file_round_trip() {
    write_then_read(Header::new().with_compressed(false).with_case_count(250));
}

#[test]
fn unknown_count_file_round_trip() {
    write_then_read(Header::new().with_endian(binrw::Endian::Big));
}

#[test]
fn width_map_survives_text_round_trip() {
    let dictionary = dictionary();
    let text = dictionary.very_long_strings().to_text();
    assert_eq!(text, b"ANSWER=00400\0\t".to_vec());

    let (records, _) = dictionary.clone().into_parts();
    let parsed = VeryLongStringMap::from_text(&text).expect("parse");
    let rebuilt = Dictionary::from_records(records, parsed);
    assert_eq!(rebuilt.nominal_case_size(), dictionary.nominal_case_size());

    // without the map the 400-byte string looks like a 255-byte one and
    // leaves its segment descriptor unclaimed
    let (records, _) = dictionary.into_parts();
    let context = CaseContext::new()
        .with_header(Header::new())
        .with_variables(records)
        .with_very_long_strings(VeryLongStringMap::new());
    assert_eq!(context.layout().expect("layout").len(), 4);
}

#[test]
fn wrong_record_type_rejected() {
    let context = CaseContext::from_dictionary(Header::new(), &dictionary());
    let mut data = (DATA_RECORD_TYPE + 1).to_le_bytes().to_vec();
    data.extend_from_slice(&[0; 4]);
    assert!(matches!(
        read_data_record(&context, data.as_slice()),
        Err(SavError::MalformedRecord(_))
    ));

    let short = DATA_RECORD_TYPE.to_le_bytes();
    assert!(matches!(
        read_data_record(&context, short.as_slice()),
        Err(SavError::Stream(_))
    ));
}
