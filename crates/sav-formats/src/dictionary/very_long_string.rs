//! Very long string width map (info record subtype 14)
//!
//! Descriptors cap widths at 255, so the real width of every very long string
//! is stored separately as text: `NAME=00300\0\t` per variable, the width
//! zero-padded to five digits.

use std::collections::HashMap;

use crate::error::{SavError, SavResult};

/// Info record subtype carrying the width map
pub const VERY_LONG_STRING_SUBTYPE: i32 = 14;

/// Map from short variable name to true string width
///
/// Names are kept as the raw bytes of the descriptor's short-name field, so
/// names in legacy code pages stay distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VeryLongStringMap {
    entries: Vec<(Vec<u8>, usize)>,
    index: HashMap<Vec<u8>, usize>,
}

impl VeryLongStringMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the true width of `name`, replacing any earlier entry
    pub fn insert(&mut self, name: impl Into<Vec<u8>>, width: usize) {
        let name = name.into();
        if let Some(&slot) = self.index.get(&name) {
            self.entries[slot].1 = width;
        } else {
            self.index.insert(name.clone(), self.entries.len());
            self.entries.push((name, width));
        }
    }

    /// True width of `name`, if it is a very long string
    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<usize> {
        self.index
            .get(name.as_ref())
            .map(|&slot| self.entries[slot].1)
    }

    /// Width to use for `name`, falling back to the descriptor width
    pub fn width_or(&self, name: impl AsRef<[u8]>, fallback: usize) -> usize {
        self.get(name).unwrap_or(fallback)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], usize)> {
        self.entries
            .iter()
            .map(|(name, width)| (name.as_slice(), *width))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse the record text
    ///
    /// Entries are separated by tabs; NUL terminators and trailing padding are
    /// ignored.
    pub fn from_text(text: &[u8]) -> SavResult<Self> {
        let mut map = Self::new();

        for item in text.split(|&b| b == b'\t') {
            let item = trim_padding(item);
            if item.is_empty() {
                continue;
            }
            let shown = String::from_utf8_lossy(item);
            let split = item
                .iter()
                .position(|&b| b == b'=')
                .ok_or_else(|| SavError::InvalidWidthMap(format!("missing '=' in {shown:?}")))?;
            let width = std::str::from_utf8(&item[split + 1..])
                .map_err(|e| SavError::InvalidWidthMap(format!("bad width in {shown:?}: {e}")))?
                .parse::<usize>()
                .map_err(|e| SavError::InvalidWidthMap(format!("bad width in {shown:?}: {e}")))?;
            map.insert(trim_padding(&item[..split]), width);
        }

        Ok(map)
    }

    /// Serialize to the record text
    pub fn to_text(&self) -> Vec<u8> {
        let mut text = Vec::new();
        for (name, width) in &self.entries {
            text.extend_from_slice(name);
            text.extend_from_slice(format!("={width:05}\0\t").as_bytes());
        }
        text
    }
}

fn trim_padding(bytes: &[u8]) -> &[u8] {
    let is_padding = |b: &u8| *b == 0 || b.is_ascii_whitespace();
    let start = bytes.iter().position(|b| !is_padding(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_padding(b)).map_or(start, |p| p + 1);
    &bytes[start..end]
}

impl<N: Into<Vec<u8>>> FromIterator<(N, usize)> for VeryLongStringMap {
    fn from_iter<I: IntoIterator<Item = (N, usize)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, width) in iter {
            map.insert(name, width);
        }
        map
    }
}

impl crate::SavFormat for VeryLongStringMap {
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::from_text(data)?)
    }

    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        Ok(self.to_text())
    }
}
