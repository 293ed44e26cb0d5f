use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::error::WireError;
use super::reader::WireReader;
use super::token::{DigitOrder, Fill, IntWidth, WireToken, float_bytes};
use crate::modifier::{Precision, Signedness};
use crate::value::Value;

/// Decode `payload` against a token list, one slot per token.
///
/// Padding tokens yield `None`. Bytes past the last token are ignored.
///
/// # Errors
/// Returns `WireError::Truncated` when the payload ends before the tokens do.
pub fn decode(tokens: &[WireToken], payload: &[u8]) -> Result<Vec<Option<Value>>, WireError> {
    let mut reader = WireReader::new(payload);
    tokens
        .iter()
        .map(|token| decode_token(token, &mut reader))
        .collect()
}

fn decode_token(token: &WireToken, reader: &mut WireReader<'_>) -> Result<Option<Value>, WireError> {
    let value = match *token {
        WireToken::Pad(n) => {
            reader.take(n)?;
            return Ok(None);
        }
        WireToken::Int {
            width,
            signedness,
            endian,
        } => {
            let raw = reader.read_uint(width.bytes(), endian)?;
            match signedness {
                Signedness::Signed => Value::Int(sign_extend(raw, width)),
                Signedness::Unsigned => Value::from(raw),
            }
        }
        WireToken::Float { precision, endian } => {
            let raw = reader.read_uint(float_bytes(precision), endian)?;
            match precision {
                Precision::Single => Value::Float(f64::from(f32::from_bits(raw as u32))),
                Precision::Double => Value::Float(f64::from_bits(raw)),
            }
        }
        WireToken::Bytes { fill, len } => {
            let bytes = reader.take(len.unwrap_or(1))?;
            let kept = match fill {
                Fill::Space => trim_trailing(bytes, |b| b == b' ' || b == 0),
                Fill::Null => bytes,
            };
            Value::from_raw(kept.to_vec())
        }
        WireToken::Hex { order, len } => {
            let bytes = reader.take(len.unwrap_or(1))?;
            Value::Str(hex_digits(bytes, order))
        }
        WireToken::Bits { order, len } => {
            let bytes = reader.take(len.unwrap_or(1))?;
            Value::Str(bit_digits(bytes, order))
        }
        WireToken::Base64 { len } => {
            let text = match len {
                Some(n) => reader.take(n)?,
                None => reader.take_rest(),
            };
            let text = trim_trailing(text, |b| b.is_ascii_whitespace() || b == 0);
            let decoded = STANDARD
                .decode(text)
                .map_err(|e| WireError::InvalidBase64(e.to_string()))?;
            Value::from_raw(decoded)
        }
    };
    Ok(Some(value))
}

fn sign_extend(raw: u64, width: IntWidth) -> i64 {
    let shift = 64 - 8 * width.bytes() as u32;
    ((raw << shift) as i64) >> shift
}

fn trim_trailing(bytes: &[u8], strip: impl Fn(u8) -> bool) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !strip(*b))
        .map_or(0, |idx| idx + 1);
    &bytes[..end]
}

fn hex_digits(bytes: &[u8], order: DigitOrder) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let (first, second) = match order {
            DigitOrder::HighFirst => (b >> 4, b & 0x0f),
            DigitOrder::LowFirst => (b & 0x0f, b >> 4),
        };
        out.push(char::from_digit(first.into(), 16).unwrap_or('0'));
        out.push(char::from_digit(second.into(), 16).unwrap_or('0'));
    }
    out
}

fn bit_digits(bytes: &[u8], order: DigitOrder) -> String {
    let mut out = String::with_capacity(bytes.len() * 8);
    for b in bytes {
        for i in 0..8 {
            let bit = match order {
                DigitOrder::HighFirst => (b >> (7 - i)) & 1,
                DigitOrder::LowFirst => (b >> i) & 1,
            };
            out.push(if bit == 1 { '1' } else { '0' });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::Endian;

    #[test]
    fn decodes_signed_and_unsigned() {
        let tokens = [
            WireToken::Int {
                width: IntWidth::W16,
                signedness: Signedness::Signed,
                endian: Endian::Big,
            },
            WireToken::Int {
                width: IntWidth::W8,
                signedness: Signedness::Unsigned,
                endian: Endian::Native,
            },
        ];
        let values = decode(&tokens, &[0xff, 0xfe, 0xff]).unwrap();
        assert_eq!(values, vec![Some(Value::Int(-2)), Some(Value::Int(255))]);
    }

    #[test]
    fn padding_yields_no_value() {
        let tokens = [WireToken::Pad(2)];
        assert_eq!(decode(&tokens, &[0, 0]).unwrap(), vec![None]);
    }

    #[test]
    fn space_filled_strings_are_trimmed() {
        let tokens = [
            WireToken::Bytes {
                fill: Fill::Space,
                len: Some(6),
            },
            WireToken::Bytes {
                fill: Fill::Null,
                len: Some(3),
            },
        ];
        let values = decode(&tokens, b"ab \0  c\0\0").unwrap();
        assert_eq!(values[0], Some(Value::from("ab")));
        assert_eq!(values[1], Some(Value::from("c\0\0")));
    }

    #[test]
    fn hex_and_bit_orders() {
        let hex_high = WireToken::Hex {
            order: DigitOrder::HighFirst,
            len: Some(2),
        };
        let hex_low = WireToken::Hex {
            order: DigitOrder::LowFirst,
            len: Some(2),
        };
        let bits_low = WireToken::Bits {
            order: DigitOrder::LowFirst,
            len: Some(1),
        };
        let values = decode(&[hex_high, hex_low, bits_low], &[0x1f, 0xa0, 0x1f, 0xa0, 0x01]).unwrap();
        assert_eq!(values[0], Some(Value::from("1fa0")));
        assert_eq!(values[1], Some(Value::from("f10a")));
        assert_eq!(values[2], Some(Value::from("10000000")));
    }

    #[test]
    fn unsized_base64_spans_rest() {
        let tokens = [WireToken::Base64 { len: None }];
        let values = decode(&tokens, b"aGk=\n").unwrap();
        assert_eq!(values[0], Some(Value::from("hi")));
    }

    #[test]
    fn floats_decode_by_precision() {
        let tokens = [
            WireToken::Float {
                precision: Precision::Single,
                endian: Endian::Little,
            },
            WireToken::Float {
                precision: Precision::Double,
                endian: Endian::Big,
            },
        ];
        let mut payload = 1.5f32.to_le_bytes().to_vec();
        payload.extend_from_slice(&(-0.25f64).to_be_bytes());
        let values = decode(&tokens, &payload).unwrap();
        assert_eq!(values, vec![Some(Value::Float(1.5)), Some(Value::Float(-0.25))]);
    }

    #[test]
    fn short_payload_is_truncated() {
        let tokens = [WireToken::Pad(4)];
        assert_eq!(
            decode(&tokens, &[0; 3]).unwrap_err(),
            WireError::Truncated {
                needed: 4,
                actual: 3
            }
        );
    }
}
