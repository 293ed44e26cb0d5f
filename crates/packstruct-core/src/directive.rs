//! Field directives.
//!
//! A [`Directive`] is the template of one named field: its modifiers, an
//! optional explicit size, and the tags folded from both at finalize time.
//! Sizes are either literal (bits for numeric fields, bytes for strings and
//! padding) or a [`SizeRef`] to an earlier field plus an offset, resolved
//! against a per-call context of known values.
//!
//! Directives never hold a current value; everything call-specific is passed
//! in through the context record.

use std::ops::{Add, Sub};

use log::debug;

use crate::error::LayoutError;
use crate::modifier::{BaseType, Endian, Modifier, Precision, Signedness, StringType, Tag};
use crate::value::Record;
use crate::wire::{DigitOrder, Fill, IntWidth, WireToken};

/// Name that marks a padding field.
pub const NULL_FIELD: &str = "null";

/// Symbolic size: the value of another field plus an offset.
///
/// # Examples
/// ```
/// use packstruct_core::SizeRef;
///
/// let size = SizeRef::new("len") - 4;
/// assert_eq!(size.reference(), "len");
/// assert_eq!(size.offset(), -4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeRef {
    reference: String,
    offset: i64,
}

impl SizeRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            offset: 0,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Same reference with `delta` added to the offset.
    pub fn offset_by(mut self, delta: i64) -> Self {
        self.offset += delta;
        self
    }
}

impl Add<i64> for SizeRef {
    type Output = SizeRef;

    fn add(self, delta: i64) -> SizeRef {
        self.offset_by(delta)
    }
}

impl Sub<i64> for SizeRef {
    type Output = SizeRef;

    fn sub(self, delta: i64) -> SizeRef {
        self.offset_by(-delta)
    }
}

impl Add<i64> for &Directive {
    type Output = SizeRef;

    fn add(self, delta: i64) -> SizeRef {
        self.reference() + delta
    }
}

impl Sub<i64> for &Directive {
    type Output = SizeRef;

    fn sub(self, delta: i64) -> SizeRef {
        self.reference() - delta
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Size {
    Literal(u32),
    Symbolic(SizeRef),
}

/// Canonical tag set of a finalized directive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    pub endian: Endian,
    pub signedness: Signedness,
    pub precision: Precision,
    pub base_type: Option<BaseType>,
    pub string_type: Option<StringType>,
    pub size: Option<Size>,
}

/// Definition of one named field.
///
/// # Examples
/// ```
/// use packstruct_core::{Directive, Record};
///
/// let mut size = Directive::new("size");
/// size.with("little_endian").with("signed").sized(32);
/// size.finalize().unwrap();
/// assert_eq!(size.wire_token(&Record::new()).unwrap().to_string(), "l<");
/// ```
#[derive(Debug, Clone)]
pub struct Directive {
    name: String,
    modifiers: Vec<Modifier>,
    size: Option<Size>,
    tags: Tags,
    finalized: bool,
    cached: Option<WireToken>,
}

impl Directive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: Vec::new(),
            size: None,
            tags: Tags::default(),
            finalized: false,
            cached: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    /// Folded tags; only meaningful once finalized.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Whether the explicit size refers to another field.
    pub fn is_symbolic(&self) -> bool {
        matches!(self.size, Some(Size::Symbolic(_)))
    }

    /// Reference to this field for sizing a later one.
    pub fn reference(&self) -> SizeRef {
        SizeRef::new(self.name.clone())
    }

    /// Append a modifier. Classification is deferred to [`Directive::finalize`].
    pub fn with(&mut self, modifier: impl Into<Modifier>) -> &mut Self {
        self.modifiers.push(modifier.into());
        self.invalidate();
        self
    }

    /// Literal size: bits for numeric fields, bytes for strings and padding.
    pub fn sized(&mut self, size: u32) -> &mut Self {
        self.size = Some(Size::Literal(size));
        self.invalidate();
        self
    }

    /// Size taken from another field's value at pack/unpack time.
    pub fn sized_by(&mut self, size: SizeRef) -> &mut Self {
        self.size = Some(Size::Symbolic(size));
        self.invalidate();
        self
    }

    fn invalidate(&mut self) {
        self.finalized = false;
        self.cached = None;
    }

    /// Fold modifiers into tags and cache the wire token when the size is static.
    ///
    /// Later modifiers override earlier ones; a size implied by a compound
    /// modifier applies only when no explicit size was set.
    ///
    /// # Errors
    /// Returns `LayoutError::UnknownModifier` for an unclassifiable token and
    /// `LayoutError::UnrepresentableSize` for an unmapped static bit width.
    pub fn finalize(&mut self) -> Result<(), LayoutError> {
        if self.finalized {
            return Ok(());
        }

        let mut tags = Tags::default();
        let mut implied = None;
        for modifier in &self.modifiers {
            for tag in modifier.tags()? {
                match *tag {
                    Tag::Endian(endian) => tags.endian = endian,
                    Tag::Signedness(signedness) => tags.signedness = signedness,
                    Tag::BaseType(base_type) => tags.base_type = Some(base_type),
                    Tag::Precision(precision) => tags.precision = precision,
                    Tag::StringType(string_type) => tags.string_type = Some(string_type),
                    Tag::Size(bits) => implied = Some(bits),
                }
            }
        }
        tags.size = self.size.clone().or(implied.map(Size::Literal));
        self.tags = tags;

        self.cached = if self.is_symbolic() {
            None
        } else {
            Some(self.resolve(&Record::new())?)
        };
        self.finalized = true;
        debug!(
            "finalized field '{}' ({} modifiers, cached token: {:?})",
            self.name,
            self.modifiers.len(),
            self.cached.map(|t| t.to_string())
        );
        Ok(())
    }

    /// Wire token for this field given the values known so far.
    ///
    /// # Errors
    /// Returns `LayoutError::NotFinalized` before [`Directive::finalize`], and
    /// `LayoutError::UnresolvedSize` when a symbolic size refers to a field
    /// missing from `context`.
    pub fn wire_token(&self, context: &Record) -> Result<WireToken, LayoutError> {
        if !self.finalized {
            return Err(LayoutError::NotFinalized {
                field: self.name.clone(),
            });
        }
        match self.cached {
            Some(token) => Ok(token),
            None => self.resolve(context),
        }
    }

    /// Storage size in bytes implied by the wire token.
    ///
    /// # Errors
    /// Same as [`Directive::wire_token`], plus `LayoutError::UnboundedField`
    /// for an unsized base64 field.
    pub fn byte_length(&self, context: &Record) -> Result<usize, LayoutError> {
        self.wire_token(context)?
            .byte_len()
            .ok_or_else(|| LayoutError::UnboundedField {
                field: self.name.clone(),
            })
    }

    fn effective_size(&self, context: &Record) -> Result<Option<usize>, LayoutError> {
        let size_ref = match &self.tags.size {
            None => return Ok(None),
            Some(Size::Literal(n)) => return Ok(Some(*n as usize)),
            Some(Size::Symbolic(size_ref)) => size_ref,
        };

        let value = context
            .get(size_ref.reference())
            .ok_or_else(|| LayoutError::UnresolvedSize {
                field: self.name.clone(),
                reference: size_ref.reference().to_string(),
            })?;
        let invalid = |value: String| LayoutError::InvalidSize {
            field: self.name.clone(),
            reference: size_ref.reference().to_string(),
            value,
        };
        let base = value.as_i128().ok_or_else(|| invalid(value.to_string()))?;
        let total = base + i128::from(size_ref.offset());
        usize::try_from(total)
            .map(Some)
            .map_err(|_| invalid(total.to_string()))
    }

    fn resolve(&self, context: &Record) -> Result<WireToken, LayoutError> {
        let size = self.effective_size(context)?;
        let Tags {
            endian,
            signedness,
            precision,
            base_type,
            string_type,
            ..
        } = self.tags;

        let token = match base_type {
            None if self.name == NULL_FIELD => WireToken::Pad(size.unwrap_or(1)),
            Some(BaseType::Null) => WireToken::Pad(size.unwrap_or(1)),
            None => match size.unwrap_or(8) {
                0 => WireToken::Pad(1),
                bits => {
                    let width = u32::try_from(bits)
                        .ok()
                        .and_then(IntWidth::from_bits)
                        .ok_or_else(|| LayoutError::UnrepresentableSize {
                            field: self.name.clone(),
                            bits,
                        })?;
                    WireToken::Int {
                        width,
                        signedness,
                        endian,
                    }
                }
            },
            Some(BaseType::Int16) => fixed_int(IntWidth::W16, signedness, endian),
            Some(BaseType::Int32) => fixed_int(IntWidth::W32, signedness, endian),
            Some(BaseType::Int64) => fixed_int(IntWidth::W64, signedness, endian),
            Some(BaseType::String) => match string_type {
                None => WireToken::Bytes {
                    fill: if endian == Endian::Little {
                        Fill::Null
                    } else {
                        Fill::Space
                    },
                    len: size,
                },
                Some(StringType::Hex) => WireToken::Hex {
                    order: DigitOrder::for_endian(endian),
                    len: size,
                },
                Some(StringType::Bit) => WireToken::Bits {
                    order: DigitOrder::for_endian(endian),
                    len: size,
                },
                Some(StringType::Base64) => WireToken::Base64 { len: size },
            },
            Some(BaseType::Float) => WireToken::Float { precision, endian },
        };
        Ok(token)
    }
}

fn fixed_int(width: IntWidth, signedness: Signedness, endian: Endian) -> WireToken {
    WireToken::Int {
        width,
        signedness,
        endian,
    }
}
