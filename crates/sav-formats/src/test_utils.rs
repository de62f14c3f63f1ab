//! Round-trip helpers shared by the record test modules

use crate::SavFormat;
use std::fmt::Debug;

/// Build `original`, parse the bytes back and compare
pub fn test_round_trip<T>(original: &T) -> Result<(), Box<dyn std::error::Error>>
where
    T: SavFormat + PartialEq + Debug,
{
    let data = original.build()?;
    let parsed = T::parse(&data)?;

    if original != &parsed {
        return Err(format!(
            "Round-trip verification failed:\nOriginal: {original:?}\nParsed: {parsed:?}"
        )
        .into());
    }

    // the rebuilt bytes must be stable too
    T::verify_round_trip(&data)
}

/// Parse `data`, rebuild, reparse and compare the two parsed values
pub fn test_round_trip_with_data<T>(data: &[u8]) -> Result<(), Box<dyn std::error::Error>>
where
    T: SavFormat + PartialEq + Debug,
{
    let parsed = T::parse(data)?;
    let reparsed = T::parse(&parsed.build()?)?;

    if parsed != reparsed {
        return Err(format!(
            "Round-trip with data failed:\nParsed: {parsed:?}\nReparsed: {reparsed:?}"
        )
        .into());
    }
    Ok(())
}

/// Check that parsing `invalid_data` fails
pub fn test_invalid_data_rejected<T>(invalid_data: &[u8]) -> Result<(), Box<dyn std::error::Error>>
where
    T: SavFormat,
{
    match T::parse(invalid_data) {
        Ok(_) => Err("Expected parsing to fail for invalid data, but it succeeded".into()),
        Err(_) => Ok(()),
    }
}

/// Assert that a value survives build then parse
#[macro_export]
macro_rules! assert_round_trip {
    ($value:expr) => {
        $crate::test_utils::test_round_trip(&$value).expect("Round-trip should succeed")
    };
}

/// Assert that bytes survive parse, build, parse
#[macro_export]
macro_rules! assert_round_trip_data {
    ($type:ty, $data:expr) => {
        $crate::test_utils::test_round_trip_with_data::<$type>($data)
            .expect("Round-trip with data should succeed")
    };
}

/// Assert that invalid bytes are rejected
#[macro_export]
macro_rules! assert_invalid_data_rejected {
    ($type:ty, $data:expr) => {
        $crate::test_utils::test_invalid_data_rejected::<$type>($data)
            .expect("Invalid data should be rejected")
    };
}
