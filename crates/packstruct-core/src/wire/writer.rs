use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::error::WireError;
use super::token::{DigitOrder, Fill, WireToken, float_bytes, resolve_endian};
use crate::modifier::{Endian, Precision};
use crate::value::Value;

/// Accumulates encoded fields in order.
///
/// # Examples
/// ```
/// use packstruct_core::{Endian, Signedness, Value};
/// use packstruct_core::wire::{IntWidth, WireToken, WireWriter};
///
/// let mut writer = WireWriter::new();
/// let token = WireToken::Int {
///     width: IntWidth::W16,
///     signedness: Signedness::Unsigned,
///     endian: Endian::Big,
/// };
/// writer.write(&token, Some(&Value::Int(0x0102))).unwrap();
/// writer.write(&WireToken::Pad(1), None).unwrap();
/// assert_eq!(writer.into_bytes(), vec![0x01, 0x02, 0x00]);
/// ```
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Encode one field. A missing value encodes the token's zero value;
    /// padding ignores the value entirely.
    ///
    /// # Errors
    /// Returns `WireError` when the value kind does not fit the token, a
    /// hex/bit digit is invalid, or the field cannot be allocated.
    pub fn write(&mut self, token: &WireToken, value: Option<&Value>) -> Result<(), WireError> {
        if let Some(len) = token.byte_len() {
            self.buf
                .try_reserve(len)
                .map_err(|_| WireError::Oversized { len })?;
        }
        match *token {
            WireToken::Pad(n) => self.buf.resize(self.buf.len() + n, 0),
            WireToken::Int { width, endian, .. } => {
                let raw = match value {
                    Some(v) => int_bits(token, v)?,
                    None => 0,
                };
                self.put_uint(raw, width.bytes(), endian);
            }
            WireToken::Float { precision, endian } => {
                let value = match value {
                    Some(v) => v.as_f64().ok_or_else(|| mismatch(token, v))?,
                    None => 0.0,
                };
                let raw = match precision {
                    Precision::Single => u64::from((value as f32).to_bits()),
                    Precision::Double => value.to_bits(),
                };
                self.put_uint(raw, float_bytes(precision), endian);
            }
            WireToken::Bytes { fill, len } => {
                let bytes = match value {
                    Some(v) => v.as_bytes().ok_or_else(|| mismatch(token, v))?,
                    None => &[][..],
                };
                let pad = match fill {
                    Fill::Space => b' ',
                    Fill::Null => 0,
                };
                self.put_fixed(bytes, len.unwrap_or(1), pad);
            }
            WireToken::Hex { order, len } => {
                let len = len.unwrap_or(1);
                let digits = digits_of(token, value, 16)?;
                for pair in 0..len {
                    let first = digits.get(2 * pair).copied().unwrap_or(0);
                    let second = digits.get(2 * pair + 1).copied().unwrap_or(0);
                    self.buf.push(match order {
                        DigitOrder::HighFirst => (first << 4) | second,
                        DigitOrder::LowFirst => first | (second << 4),
                    });
                }
            }
            WireToken::Bits { order, len } => {
                let len = len.unwrap_or(1);
                let digits = digits_of(token, value, 2)?;
                for byte in 0..len {
                    let mut out = 0u8;
                    for i in 0..8 {
                        if digits.get(8 * byte + i).copied().unwrap_or(0) == 1 {
                            out |= match order {
                                DigitOrder::HighFirst => 0x80 >> i,
                                DigitOrder::LowFirst => 1 << i,
                            };
                        }
                    }
                    self.buf.push(out);
                }
            }
            WireToken::Base64 { len } => {
                let text = match value {
                    Some(v) => STANDARD.encode(v.as_bytes().ok_or_else(|| mismatch(token, v))?),
                    None => String::new(),
                };
                match len {
                    Some(n) => self.put_fixed(text.as_bytes(), n, 0),
                    None => self.buf.extend_from_slice(text.as_bytes()),
                }
            }
        }
        Ok(())
    }

    fn put_uint(&mut self, raw: u64, len: usize, endian: Endian) {
        match resolve_endian(endian) {
            Endian::Little => self.buf.extend_from_slice(&raw.to_le_bytes()[..len]),
            _ => self.buf.extend_from_slice(&raw.to_be_bytes()[8 - len..]),
        }
    }

    /// Truncate or pad `bytes` to exactly `len`.
    fn put_fixed(&mut self, bytes: &[u8], len: usize, pad: u8) {
        let kept = &bytes[..bytes.len().min(len)];
        self.buf.extend_from_slice(kept);
        self.buf.resize(self.buf.len() + (len - kept.len()), pad);
    }
}

fn mismatch(token: &WireToken, value: &Value) -> WireError {
    WireError::TypeMismatch {
        token: token.to_string(),
        found: value.kind(),
    }
}

/// Two's-complement bits of an integer value; floats truncate toward zero.
fn int_bits(token: &WireToken, value: &Value) -> Result<u64, WireError> {
    match value {
        Value::Int(v) => Ok(*v as u64),
        Value::UInt(v) => Ok(*v),
        Value::Float(v) => Ok(v.trunc() as i64 as u64),
        other => Err(mismatch(token, other)),
    }
}

fn digits_of(token: &WireToken, value: Option<&Value>, radix: u32) -> Result<Vec<u8>, WireError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let text = value.as_str().ok_or_else(|| mismatch(token, value))?;
    text.chars()
        .map(|c| {
            c.to_digit(radix)
                .map(|d| d as u8)
                .ok_or_else(|| WireError::InvalidDigit {
                    token: token.to_string(),
                    digit: c,
                })
        })
        .collect()
}
