use thiserror::Error;

/// Errors returned by the token codec.
///
/// # Examples
/// ```
/// use packstruct_core::wire::WireError;
///
/// let err = WireError::Truncated { needed: 4, actual: 2 };
/// assert!(err.to_string().contains("need 4 bytes"));
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WireError {
    #[error("buffer too short: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },
    #[error("token '{token}' cannot encode a {found} value")]
    TypeMismatch { token: String, found: &'static str },
    #[error("token '{token}' got invalid digit {digit:?}")]
    InvalidDigit { token: String, digit: char },
    #[error("cannot allocate a {len} byte field")]
    Oversized { len: usize },
    #[error("invalid base64 data: {0}")]
    InvalidBase64(String),
}
