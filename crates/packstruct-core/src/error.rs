use thiserror::Error;

use crate::source::SourceError;
use crate::wire::WireError;

/// Errors returned while declaring, packing, or unpacking a layout.
///
/// Every variant is a local, non-retryable failure: pack and unpack either
/// return a complete result or one of these, never a partial record.
///
/// # Examples
/// ```
/// use packstruct_core::LayoutError;
///
/// let err = LayoutError::UnknownModifier { token: "bogus".to_string() };
/// assert!(err.to_string().contains("unknown modifier"));
/// ```
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("unknown modifier: {token}")]
    UnknownModifier { token: String },
    #[error("field '{field}' is sized by '{reference}', which has no value")]
    MissingDependency { field: String, reference: String },
    #[error("field '{field}' is sized by '{reference}', which is not decoded yet")]
    UnresolvedSize { field: String, reference: String },
    #[error("input truncated at field '{field}': need {needed} bytes, got {actual}")]
    TruncatedInput {
        field: String,
        needed: usize,
        actual: usize,
    },
    #[error("end of stream at field '{field}': requested {requested} bytes, received {received}")]
    EndOfStream {
        field: String,
        requested: usize,
        received: usize,
    },
    #[error("cannot represent {bits}-bit field '{field}'")]
    UnrepresentableSize { field: String, bits: usize },
    #[error("field '{field}' resolved an invalid size from '{reference}': {value}")]
    InvalidSize {
        field: String,
        reference: String,
        value: String,
    },
    #[error("field '{field}' has a data-dependent size; fast unpack is not possible")]
    SymbolicSize { field: String },
    #[error("field '{field}' has no size and cannot be read from a stream")]
    UnboundedField { field: String },
    #[error("field '{name}' is already declared")]
    DuplicateField { name: String },
    #[error("field '{name}' is not declared")]
    UnknownField { name: String },
    #[error("layout '{name}' is not registered")]
    UnknownLayout { name: String },
    #[error("no unnamed layout and {count} named layouts registered")]
    AmbiguousLayout { count: usize },
    #[error("field '{field}' is not finalized")]
    NotFinalized { field: String },
    #[error("layout is finalized; declarations are closed")]
    AlreadyFinalized,
    #[error("cannot encode field '{field}': {source}")]
    Encode {
        field: String,
        #[source]
        source: WireError,
    },
    #[error("decode error: {0}")]
    Decode(WireError),
    #[error("byte source error: {0}")]
    Source(#[from] SourceError),
}
