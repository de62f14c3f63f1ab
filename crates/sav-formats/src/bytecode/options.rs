//! Bytecode codec configuration
//!
//! The options travel with each codec instance rather than being read from a
//! shared context, so the same process can handle files with different byte
//! orders or bias values side by side.

use binrw::Endian;
use serde::{Deserialize, Serialize};

use super::BLOCK_SIZE;

/// Bias value written by virtually every producer
pub const DEFAULT_BIAS: f64 = 100.0;

/// Eight ASCII spaces
pub const SPACES_BLOCK: [u8; BLOCK_SIZE] = [b' '; BLOCK_SIZE];

/// Handling of command bytes in the biased small-integer range (1..=252)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasMode {
    /// Bias-range bytes are rejected with `UnsupportedEncoding`
    #[default]
    Unsupported,
    /// Bias-range bytes decode to `code - bias`; 252 marks the end of data.
    /// The encoder also emits bias codes for integral values.
    Enabled,
}

impl BiasMode {
    /// Whether bias codes are accepted and produced
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Configuration shared by [`ByteCodeReader`](super::ByteCodeReader) and
/// [`ByteCodeWriter`](super::ByteCodeWriter)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ByteCodeOptions {
    /// Byte order of numeric blocks
    #[serde(with = "serde_endian", default = "default_endian")]
    pub endian: Endian,
    /// Compression bias from the file header
    #[serde(default = "default_bias")]
    pub bias: f64,
    /// Bias-range behaviour
    #[serde(default)]
    pub bias_mode: BiasMode,
}

const fn default_endian() -> Endian {
    Endian::Little
}

const fn default_bias() -> f64 {
    DEFAULT_BIAS
}

impl Default for ByteCodeOptions {
    fn default() -> Self {
        Self {
            endian: default_endian(),
            bias: DEFAULT_BIAS,
            bias_mode: BiasMode::default(),
        }
    }
}

impl ByteCodeOptions {
    /// Create options with defaults (little endian, bias 100, bias codes rejected)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the byte order
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Set the bias value
    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    /// Set the bias-range behaviour
    pub fn with_bias_mode(mut self, mode: BiasMode) -> Self {
        self.bias_mode = mode;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.bias.is_finite() {
            return Err(format!("bias must be finite, got {}", self.bias));
        }
        Ok(())
    }

    /// The canonical system-missing block: `-f64::MAX` in this byte order
    pub fn sysmis_block(&self) -> [u8; BLOCK_SIZE] {
        self.encode_f64(-f64::MAX)
    }

    /// Encode a double in this byte order
    pub fn encode_f64(&self, value: f64) -> [u8; BLOCK_SIZE] {
        match self.endian {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }

    /// Decode a double in this byte order
    pub fn decode_f64(&self, block: [u8; BLOCK_SIZE]) -> f64 {
        match self.endian {
            Endian::Big => f64::from_be_bytes(block),
            Endian::Little => f64::from_le_bytes(block),
        }
    }

    /// Block produced by bias code `code`
    pub fn bias_block(&self, code: u8) -> [u8; BLOCK_SIZE] {
        self.encode_f64(f64::from(code) - self.bias)
    }

    /// Bias code that reproduces `block` bit for bit, if there is one
    pub fn bias_code(&self, block: [u8; BLOCK_SIZE]) -> Option<u8> {
        let value = self.decode_f64(block);
        if !value.is_finite() {
            return None;
        }
        let code = value + self.bias;
        if code.fract() != 0.0 || !(1.0..=251.0).contains(&code) {
            return None;
        }
        let code = code as u8;
        (self.bias_block(code) == block).then_some(code)
    }
}

/// Serde helpers for `binrw::Endian`, which has no serde support of its own
pub mod serde_endian {
    use binrw::Endian;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    enum Repr {
        Big,
        Little,
    }

    /// Serialize as `"Big"` / `"Little"`
    pub fn serialize<S: Serializer>(endian: &Endian, serializer: S) -> Result<S::Ok, S::Error> {
        match endian {
            Endian::Big => Repr::Big,
            Endian::Little => Repr::Little,
        }
        .serialize(serializer)
    }

    /// Deserialize from `"Big"` / `"Little"`
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Endian, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Big => Endian::Big,
            Repr::Little => Endian::Little,
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sysmis_block_is_most_negative_double() {
        let little = ByteCodeOptions::new();
        assert_eq!(little.sysmis_block(), (-f64::MAX).to_le_bytes());
        assert_eq!(
            little.sysmis_block(),
            [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xEF, 0xFF]
        );

        let big = ByteCodeOptions::new().with_endian(Endian::Big);
        assert_eq!(
            big.sysmis_block(),
            [0xFF, 0xEF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_bias_code_exact() {
        let options = ByteCodeOptions::new();
        assert_eq!(options.bias_code(0.0f64.to_le_bytes()), Some(100));
        assert_eq!(options.bias_code((-99.0f64).to_le_bytes()), Some(1));
        assert_eq!(options.bias_code(151.0f64.to_le_bytes()), Some(251));

        // 252 is reserved for the end-of-data marker
        assert_eq!(options.bias_code(152.0f64.to_le_bytes()), None);
        assert_eq!(options.bias_code((-100.0f64).to_le_bytes()), None);
        assert_eq!(options.bias_code(1.5f64.to_le_bytes()), None);
        assert_eq!(options.bias_code(f64::NAN.to_le_bytes()), None);

        // -0.0 decodes through 100 - 100 = +0.0, a different bit pattern
        assert_eq!(options.bias_code((-0.0f64).to_le_bytes()), None);
    }

    #[test]
    fn test_validate() {
        assert!(ByteCodeOptions::new().validate().is_ok());
        assert!(ByteCodeOptions::new().with_bias(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_options_serde() {
        let options = ByteCodeOptions::new()
            .with_endian(Endian::Big)
            .with_bias_mode(BiasMode::Enabled);
        let json = serde_json::to_string(&options).expect("serialize");
        assert!(json.contains("\"Big\""));
        assert!(json.contains("\"enabled\""));

        let parsed: ByteCodeOptions = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, options);

        let defaults: ByteCodeOptions = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(defaults, ByteCodeOptions::default());
    }
}
