//! Record layouts.
//!
//! A [`Layout`] is an ordered list of directives; declaration order is wire
//! order. Construction needs `&mut Layout` and ends with
//! [`Layout::finalize`]; the pack and unpack operations take `&self` and keep
//! all per-call state (decoded context, token list, byte accumulator) local,
//! so a finalized layout can be shared between threads.
//!
//! Unpacking walks the directives one at a time because a later field's size
//! may be the value of an earlier one. After each directive the whole
//! accumulated token list is decoded again from the start of the input; only
//! the newest slot is kept.

use log::{debug, trace};

use crate::directive::{Directive, NULL_FIELD, SizeRef};
use crate::error::LayoutError;
use crate::registry::{FieldDecl, SizeDecl};
use crate::source::{ByteSource, SourceError};
use crate::value::Record;
use crate::wire::{self, WireError, WireToken, WireWriter};

/// Ordered set of directives describing one record.
///
/// # Examples
/// ```
/// use packstruct_core::{Layout, Record, Value};
///
/// let mut layout = Layout::new();
/// layout.declare("len")?.with("little_endian").with("uint32");
/// let len = layout.field("len")?.reference();
/// layout.declare("body")?.with("string").sized_by(len);
/// layout.declare("null")?;
/// layout.finalize()?;
///
/// let mut values = Record::new();
/// values.insert("len".into(), Value::Int(5));
/// values.insert("body".into(), Value::from("hello"));
///
/// let bytes = layout.pack(&values)?;
/// assert_eq!(bytes.len(), 4 + 5 + 1);
/// assert_eq!(layout.unpack(&bytes)?, values);
/// # Ok::<(), packstruct_core::LayoutError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Layout {
    directives: Vec<Directive>,
    finalized: bool,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and finalize a layout from declaration triples.
    ///
    /// # Errors
    /// Returns the first declaration or finalize error.
    pub fn from_fields(fields: &[FieldDecl]) -> Result<Self, LayoutError> {
        let mut layout = Layout::new();
        for field in fields {
            let directive = layout.declare(&field.name)?;
            for modifier in &field.modifiers {
                directive.with(modifier.as_str());
            }
            match &field.size {
                Some(SizeDecl::Literal(n)) => {
                    directive.sized(*n);
                }
                Some(SizeDecl::Field { field: reference, offset }) => {
                    directive.sized_by(SizeRef::new(reference.clone()) + *offset);
                }
                None => {}
            }
        }
        layout.finalize()?;
        Ok(layout)
    }

    /// Append a new field.
    ///
    /// # Errors
    /// Returns `LayoutError::DuplicateField` when a non-padding name is
    /// already declared, and `LayoutError::AlreadyFinalized` after
    /// [`Layout::finalize`].
    pub fn declare(&mut self, name: &str) -> Result<&mut Directive, LayoutError> {
        if self.finalized {
            return Err(LayoutError::AlreadyFinalized);
        }
        if name != NULL_FIELD && self.has_field(name) {
            return Err(LayoutError::DuplicateField {
                name: name.to_string(),
            });
        }
        let index = self.directives.len();
        self.directives.push(Directive::new(name));
        Ok(&mut self.directives[index])
    }

    /// Look up a declared field, typically to size a later one.
    pub fn field(&self, name: &str) -> Result<&Directive, LayoutError> {
        self.directives
            .iter()
            .find(|d| d.name() == name)
            .ok_or_else(|| LayoutError::UnknownField {
                name: name.to_string(),
            })
    }

    pub fn field_mut(&mut self, name: &str) -> Result<&mut Directive, LayoutError> {
        if self.finalized {
            return Err(LayoutError::AlreadyFinalized);
        }
        self.directives
            .iter_mut()
            .find(|d| d.name() == name)
            .ok_or_else(|| LayoutError::UnknownField {
                name: name.to_string(),
            })
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.directives.iter().any(|d| d.name() == name)
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.directives.iter().map(Directive::name)
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Finalize every directive and close the layout to further declarations.
    ///
    /// # Errors
    /// Returns the first directive's finalize error.
    pub fn finalize(&mut self) -> Result<(), LayoutError> {
        for directive in &mut self.directives {
            directive.finalize()?;
        }
        self.finalized = true;
        debug!("finalized layout with {} fields", self.directives.len());
        Ok(())
    }

    /// Total encoded length when no field has a data-dependent size.
    pub fn static_len(&self) -> Option<usize> {
        let context = Record::new();
        self.directives.iter().try_fold(0usize, |total, d| {
            total.checked_add(d.byte_length(&context).ok()?)
        })
    }

    /// Space-separated wire tokens for `context`.
    ///
    /// # Errors
    /// Returns `LayoutError::UnresolvedSize` when a symbolic size refers to a
    /// field missing from `context`.
    pub fn render(&self, context: &Record) -> Result<String, LayoutError> {
        let tokens = self
            .directives
            .iter()
            .map(|d| d.wire_token(context).map(|t| t.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tokens.join(" "))
    }

    /// Encode `values` in declaration order.
    ///
    /// Declared fields missing from `values` encode as their token's zero
    /// value; keys that match no field are ignored. `values` also serves as
    /// the context for symbolic sizes.
    ///
    /// # Errors
    /// Returns `LayoutError::MissingDependency` when a symbolic size refers to
    /// a field absent from `values`, and `LayoutError::Encode` when a value
    /// does not fit its token.
    pub fn pack(&self, values: &Record) -> Result<Vec<u8>, LayoutError> {
        let mut writer = WireWriter::new();
        for directive in &self.directives {
            let token = directive.wire_token(values).map_err(|err| match err {
                LayoutError::UnresolvedSize { field, reference } => {
                    LayoutError::MissingDependency { field, reference }
                }
                other => other,
            })?;
            writer
                .write(&token, values.get(directive.name()))
                .map_err(|source| LayoutError::Encode {
                    field: directive.name().to_string(),
                    source,
                })?;
        }
        debug!(
            "packed {} fields into {} bytes",
            self.directives.len(),
            writer.len()
        );
        Ok(writer.into_bytes())
    }

    /// Decode `buffer` directive by directive.
    ///
    /// # Errors
    /// Returns `LayoutError::TruncatedInput` when the buffer is shorter than
    /// the fields processed so far require, and `LayoutError::UnresolvedSize`
    /// for a reference to a field that is not decoded yet.
    pub fn unpack(&self, buffer: &[u8]) -> Result<Record, LayoutError> {
        let mut tokens = Vec::with_capacity(self.directives.len());
        let mut decoded = Record::new();
        let mut needed: usize = 0;

        for directive in &self.directives {
            let token = directive.wire_token(&decoded)?;
            needed = needed.saturating_add(token.byte_len().unwrap_or(0));
            if buffer.len() < needed {
                return Err(LayoutError::TruncatedInput {
                    field: directive.name().to_string(),
                    needed,
                    actual: buffer.len(),
                });
            }
            tokens.push(token);
            decode_newest(&tokens, buffer, directive, &mut decoded)?;
        }

        decoded.remove(NULL_FIELD);
        debug!("unpacked {} fields from {} bytes", decoded.len(), buffer.len());
        Ok(decoded)
    }

    /// Decode from `source`, reading exactly each field's byte length in turn.
    ///
    /// # Errors
    /// Returns `LayoutError::EndOfStream` when the source runs out before a
    /// field is complete, `LayoutError::UnboundedField` for an unsized base64
    /// field, and `LayoutError::Source` for other source failures.
    pub fn unpack_from_stream<S: ByteSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<Record, LayoutError> {
        let mut tokens = Vec::with_capacity(self.directives.len());
        let mut accumulated = Vec::new();
        let mut decoded = Record::new();

        for directive in &self.directives {
            let token = directive.wire_token(&decoded)?;
            let len = directive.byte_length(&decoded)?;
            let chunk = source.read_exact_bytes(len).map_err(|err| match err {
                SourceError::Exhausted {
                    requested,
                    received,
                } => LayoutError::EndOfStream {
                    field: directive.name().to_string(),
                    requested,
                    received,
                },
                other => LayoutError::Source(other),
            })?;
            accumulated.extend_from_slice(&chunk);
            tokens.push(token);
            decode_newest(&tokens, &accumulated, directive, &mut decoded)?;
        }

        decoded.remove(NULL_FIELD);
        debug!(
            "unpacked {} fields from a {} byte stream",
            decoded.len(),
            accumulated.len()
        );
        Ok(decoded)
    }

    /// Decode `buffer` in one pass. Only valid when no size is symbolic.
    ///
    /// # Errors
    /// Returns `LayoutError::SymbolicSize` when a field has a data-dependent
    /// size, and `LayoutError::TruncatedInput` for a short buffer.
    pub fn fast_unpack(&self, buffer: &[u8]) -> Result<Record, LayoutError> {
        if let Some(directive) = self.directives.iter().find(|d| d.is_symbolic()) {
            return Err(LayoutError::SymbolicSize {
                field: directive.name().to_string(),
            });
        }

        let context = Record::new();
        let tokens = self
            .directives
            .iter()
            .map(|d| d.wire_token(&context))
            .collect::<Result<Vec<_>, _>>()?;

        let mut needed: usize = 0;
        for (directive, token) in self.directives.iter().zip(&tokens) {
            needed = needed.saturating_add(token.byte_len().unwrap_or(0));
            if buffer.len() < needed {
                return Err(LayoutError::TruncatedInput {
                    field: directive.name().to_string(),
                    needed,
                    actual: buffer.len(),
                });
            }
        }

        let values = wire::decode(&tokens, buffer).map_err(LayoutError::Decode)?;
        let mut decoded: Record = self
            .directives
            .iter()
            .zip(values)
            .filter_map(|(d, v)| v.map(|v| (d.name().to_string(), v)))
            .collect();
        decoded.remove(NULL_FIELD);
        Ok(decoded)
    }
}

/// Decode `payload` against the whole token list and keep the newest slot.
fn decode_newest(
    tokens: &[WireToken],
    payload: &[u8],
    directive: &Directive,
    decoded: &mut Record,
) -> Result<(), LayoutError> {
    let mut values = wire::decode(tokens, payload).map_err(|err| match err {
        WireError::Truncated { needed, actual } => LayoutError::TruncatedInput {
            field: directive.name().to_string(),
            needed,
            actual,
        },
        other => LayoutError::Decode(other),
    })?;
    if let Some(Some(value)) = values.pop() {
        trace!(
            "field '{}' = {} ({} tokens, {} bytes)",
            directive.name(),
            value,
            tokens.len(),
            payload.len()
        );
        decoded.insert(directive.name().to_string(), value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::source::ReaderSource;
    use crate::value::Value;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// size, id, type (32-bit little-endian signed), body sized by size, pad.
    fn something() -> Layout {
        let mut layout = Layout::new();
        for name in ["size", "id", "type"] {
            layout
                .declare(name)
                .unwrap()
                .with("little_endian")
                .with("signed")
                .sized(32);
        }
        let size = layout.field("size").unwrap().reference();
        layout.declare("body").unwrap().with("string").sized_by(size);
        layout.declare("null").unwrap();
        layout.finalize().unwrap();
        layout
    }

    const PACKED: &[u8] = b"\x0b\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00\x00hello world\x00";

    fn something_values() -> Record {
        record(&[
            ("size", Value::Int(11)),
            ("id", Value::Int(1)),
            ("type", Value::Int(0)),
            ("body", Value::from("hello world")),
        ])
    }

    #[test]
    fn declares_in_order() {
        let layout = something();
        assert_eq!(layout.len(), 5);
        assert_eq!(
            layout.names().collect::<Vec<_>>(),
            ["size", "id", "type", "body", "null"]
        );
        assert!(layout.has_field("body"));
        assert!(!layout.has_field("missing"));
    }

    #[test]
    fn renders_with_context() {
        let layout = something();
        let context = record(&[("size", Value::Int(0))]);
        assert_eq!(layout.render(&context).unwrap(), "l< l< l< A0 x");
        assert!(matches!(
            layout.render(&Record::new()).unwrap_err(),
            LayoutError::UnresolvedSize { .. }
        ));
    }

    #[test]
    fn packs_correctly() {
        assert_eq!(something().pack(&something_values()).unwrap(), PACKED);
    }

    #[test]
    fn unpacks_correctly() {
        assert_eq!(something().unpack(PACKED).unwrap(), something_values());
    }

    #[test]
    fn streams_correctly() {
        let mut source = ReaderSource::new(Cursor::new(PACKED.to_vec()));
        assert_eq!(
            something().unpack_from_stream(&mut source).unwrap(),
            something_values()
        );
        assert_eq!(source.consumed(), PACKED.len() as u64);
    }

    #[test]
    fn stream_stops_at_end_of_source() {
        let mut source = ReaderSource::new(Cursor::new(PACKED[..14].to_vec()));
        let err = something().unpack_from_stream(&mut source).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::EndOfStream { ref field, requested: 11, received: 2 } if field == "body"
        ));
    }

    #[test]
    fn fast_unpack_rejects_symbolic_sizes() {
        let err = something().fast_unpack(PACKED).unwrap_err();
        assert!(matches!(err, LayoutError::SymbolicSize { ref field } if field == "body"));
    }

    #[test]
    fn duplicate_names_are_rejected_except_padding() {
        let mut layout = Layout::new();
        layout.declare("a").unwrap();
        assert!(matches!(
            layout.declare("a").unwrap_err(),
            LayoutError::DuplicateField { .. }
        ));
        layout.declare("null").unwrap();
        layout.declare("null").unwrap();
        assert_eq!(layout.len(), 3);
    }

    #[test]
    fn finalized_layouts_are_closed() {
        let mut layout = something();
        assert!(layout.is_finalized());
        assert!(matches!(
            layout.declare("extra").unwrap_err(),
            LayoutError::AlreadyFinalized
        ));
        assert!(matches!(
            layout.field_mut("size").unwrap_err(),
            LayoutError::AlreadyFinalized
        ));
    }

    #[test]
    fn unfinalized_layout_cannot_pack() {
        let mut layout = Layout::new();
        layout.declare("a").unwrap().with("uint16");
        assert!(matches!(
            layout.pack(&Record::new()).unwrap_err(),
            LayoutError::NotFinalized { .. }
        ));
    }

    #[test]
    fn field_lookup_reports_unknown_names() {
        let layout = something();
        assert!(matches!(
            layout.field("nope").unwrap_err(),
            LayoutError::UnknownField { .. }
        ));
    }

    #[test]
    fn size_can_be_indexed_after_declaration() {
        let mut layout = Layout::new();
        layout.declare("count").unwrap().with("uint16").with("big");
        layout.declare("tag").unwrap().with("string");
        let count = layout.field("count").unwrap() + 1;
        layout.field_mut("tag").unwrap().sized_by(count);
        layout.finalize().unwrap();

        let values = record(&[("count", Value::Int(2)), ("tag", Value::from("abc"))]);
        let bytes = layout.pack(&values).unwrap();
        assert_eq!(bytes, b"\x00\x02abc");
        assert_eq!(layout.unpack(&bytes).unwrap(), values);
    }

    #[test]
    fn static_len_sums_fixed_fields() {
        let mut layout = Layout::new();
        layout.declare("a").unwrap().with("uint32");
        layout.declare("b").unwrap().with("float").with("double");
        layout.declare("null").unwrap().sized(3);
        layout.finalize().unwrap();
        assert_eq!(layout.static_len(), Some(15));
        assert_eq!(something().static_len(), None);
    }

    #[test]
    fn encode_errors_name_the_field() {
        let mut layout = Layout::new();
        layout.declare("n").unwrap().with("uint16");
        layout.finalize().unwrap();
        let err = layout
            .pack(&record(&[("n", Value::from("text"))]))
            .unwrap_err();
        assert!(matches!(err, LayoutError::Encode { ref field, .. } if field == "n"));
    }

    #[test]
    fn layouts_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Layout>();
    }
}
