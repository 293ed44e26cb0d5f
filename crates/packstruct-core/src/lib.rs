//! packstruct core library: declarative binary record layouts.
//!
//! A [`Layout`] is declared once as an ordered list of named fields
//! ([`Directive`]s), each refined by [`Modifier`] tokens such as
//! `little_endian`, `unsigned`, `double`, `hex` or `uint32`. From that
//! declaration the crate derives a wire token per field, a packer for
//! name→value records, and decoders for whole buffers, incremental byte
//! streams, and (for layouts without data-dependent sizes) a single-pass
//! fast path.
//!
//! A field may be sized by the runtime value of an earlier field plus a
//! fixed offset. Such layouts are decoded directive by directive, re-decoding
//! the accumulated prefix each step, and streams are read exactly one field
//! length at a time.
//!
//! Invariants:
//! - Declaration order is wire order; there is no implicit padding.
//! - Directives are templates and never hold per-call values.
//! - Fields named `null` are padding and never appear in decoded records.
//!
//! # Examples
//! ```
//! use packstruct_core::{Layout, Record, Value};
//!
//! let mut layout = Layout::new();
//! layout.declare("len")?.with("little_endian").with("uint32");
//! let body_len = layout.field("len")? - 4;
//! layout.declare("body")?.with("string").sized_by(body_len);
//! layout.finalize()?;
//!
//! let mut values = Record::new();
//! values.insert("len".into(), Value::Int(15));
//! values.insert("body".into(), Value::from("hello world"));
//!
//! let bytes = layout.pack(&values)?;
//! assert_eq!(bytes.len(), 4 + 11);
//! assert_eq!(layout.unpack(&bytes)?, values);
//! # Ok::<(), packstruct_core::LayoutError>(())
//! ```

pub mod directive;
pub mod error;
pub mod layout;
pub mod modifier;
pub mod registry;
pub mod source;
pub mod value;
pub mod wire;

pub use directive::{Directive, NULL_FIELD, Size, SizeRef, Tags};
pub use error::LayoutError;
pub use layout::Layout;
pub use modifier::{BaseType, Endian, Modifier, Precision, Signedness, StringType, Tag};
pub use registry::{FieldDecl, LayoutDecl, RegistryDecl, SizeDecl, StructRegistry};
pub use source::{ByteSource, ReaderSource, SourceError};
pub use value::{Record, Value};
