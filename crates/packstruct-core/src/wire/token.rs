use std::fmt;

use crate::modifier::{Endian, Precision, Signedness};

/// Width of a fixed-size integer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(IntWidth::W8),
            16 => Some(IntWidth::W16),
            32 => Some(IntWidth::W32),
            64 => Some(IntWidth::W64),
            _ => None,
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            IntWidth::W8 => 1,
            IntWidth::W16 => 2,
            IntWidth::W32 => 4,
            IntWidth::W64 => 8,
        }
    }

    fn letter(self) -> char {
        match self {
            IntWidth::W8 => 'C',
            IntWidth::W16 => 'S',
            IntWidth::W32 => 'L',
            IntWidth::W64 => 'Q',
        }
    }
}

/// Pad byte of a fixed-length byte string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// `A`: space padded, trailing spaces and NULs stripped on decode.
    Space,
    /// `a`: NUL padded, decoded verbatim.
    Null,
}

/// Digit order of hex and bit strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitOrder {
    HighFirst,
    LowFirst,
}

impl DigitOrder {
    pub fn for_endian(endian: Endian) -> Self {
        match endian {
            Endian::Little => DigitOrder::LowFirst,
            Endian::Big | Endian::Native => DigitOrder::HighFirst,
        }
    }
}

/// Minimal codec descriptor for one field.
///
/// The textual form follows the signed/unsigned case-flip convention: an
/// uppercase letter is the unsigned (or canonical) form and its lowercase is
/// the signed (or alternate) form. `<` and `>` mark little and big endian;
/// 8-bit integers never carry a byte-order suffix.
///
/// # Examples
/// ```
/// use packstruct_core::{Endian, Signedness};
/// use packstruct_core::wire::{IntWidth, WireToken};
///
/// let token = WireToken::Int {
///     width: IntWidth::W32,
///     signedness: Signedness::Signed,
///     endian: Endian::Little,
/// };
/// assert_eq!(token.to_string(), "l<");
/// assert_eq!(token.byte_len(), Some(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireToken {
    Pad(usize),
    Int {
        width: IntWidth,
        signedness: Signedness,
        endian: Endian,
    },
    Float {
        precision: Precision,
        endian: Endian,
    },
    Bytes {
        fill: Fill,
        len: Option<usize>,
    },
    Hex {
        order: DigitOrder,
        len: Option<usize>,
    },
    Bits {
        order: DigitOrder,
        len: Option<usize>,
    },
    /// Base64 text. Without a length it spans the rest of the input.
    Base64 {
        len: Option<usize>,
    },
}

impl WireToken {
    /// Encoded size in bytes; `None` for an unsized base64 field.
    pub fn byte_len(&self) -> Option<usize> {
        match *self {
            WireToken::Pad(n) => Some(n),
            WireToken::Int { width, .. } => Some(width.bytes()),
            WireToken::Float { precision, .. } => Some(float_bytes(precision)),
            WireToken::Bytes { len, .. }
            | WireToken::Hex { len, .. }
            | WireToken::Bits { len, .. } => Some(len.unwrap_or(1)),
            WireToken::Base64 { len } => len,
        }
    }

    /// Whether the token consumes bytes without producing a value.
    pub fn is_pad(&self) -> bool {
        matches!(self, WireToken::Pad(_))
    }
}

pub(crate) fn float_bytes(precision: Precision) -> usize {
    match precision {
        Precision::Single => 4,
        Precision::Double => 8,
    }
}

/// Collapse `Native` to the host byte order.
pub(crate) fn resolve_endian(endian: Endian) -> Endian {
    match endian {
        Endian::Native if cfg!(target_endian = "little") => Endian::Little,
        Endian::Native => Endian::Big,
        other => other,
    }
}

fn case_flip(letter: char, lower: bool) -> char {
    if lower {
        letter.to_ascii_lowercase()
    } else {
        letter
    }
}

fn endian_suffix(endian: Endian) -> &'static str {
    match endian {
        Endian::Little => "<",
        Endian::Big => ">",
        Endian::Native => "",
    }
}

fn write_len(f: &mut fmt::Formatter<'_>, len: Option<usize>) -> fmt::Result {
    match len {
        Some(n) => write!(f, "{n}"),
        None => Ok(()),
    }
}

impl fmt::Display for WireToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            WireToken::Pad(1) => f.write_str("x"),
            WireToken::Pad(n) => write!(f, "x{n}"),
            WireToken::Int {
                width,
                signedness,
                endian,
            } => {
                let letter = case_flip(width.letter(), signedness == Signedness::Signed);
                if width == IntWidth::W8 {
                    write!(f, "{letter}")
                } else {
                    write!(f, "{letter}{}", endian_suffix(endian))
                }
            }
            WireToken::Float { precision, endian } => {
                let letter = match (precision, endian) {
                    (Precision::Single, Endian::Native) => 'F',
                    (Precision::Double, Endian::Native) => 'D',
                    (Precision::Single, Endian::Little) => 'e',
                    (Precision::Double, Endian::Little) => 'E',
                    (Precision::Single, Endian::Big) => 'g',
                    (Precision::Double, Endian::Big) => 'G',
                };
                write!(f, "{letter}")
            }
            WireToken::Bytes { fill, len } => {
                f.write_str(if fill == Fill::Space { "A" } else { "a" })?;
                write_len(f, len)
            }
            WireToken::Hex { order, len } => {
                f.write_str(if order == DigitOrder::HighFirst { "H" } else { "h" })?;
                write_len(f, len)
            }
            WireToken::Bits { order, len } => {
                f.write_str(if order == DigitOrder::HighFirst { "B" } else { "b" })?;
                write_len(f, len)
            }
            WireToken::Base64 { .. } => f.write_str("m"),
        }
    }
}
