use std::io::Read;

use thiserror::Error;

/// Provider of bytes for incremental decoding.
///
/// Implementations block until `len` bytes are available or fail; there is
/// no other requirement. Timeouts and cancellation belong to the provider.
pub trait ByteSource {
    fn read_exact_bytes(&mut self, len: usize) -> Result<Vec<u8>, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("source exhausted: requested {requested} bytes, received {received}")]
    Exhausted { requested: usize, received: usize },
}

/// [`ByteSource`] over any `std::io::Read`.
///
/// # Examples
/// ```
/// use std::io::Cursor;
///
/// use packstruct_core::{ByteSource, ReaderSource};
///
/// let mut source = ReaderSource::new(Cursor::new(vec![1u8, 2, 3]));
/// assert_eq!(source.read_exact_bytes(2)?, vec![1, 2]);
/// assert_eq!(source.consumed(), 2);
/// # Ok::<(), packstruct_core::SourceError>(())
/// ```
pub struct ReaderSource<R> {
    inner: R,
    consumed: u64,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, consumed: 0 }
    }

    /// Total bytes handed out so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn read_exact_bytes(&mut self, len: usize) -> Result<Vec<u8>, SourceError> {
        // The buffer grows with received data, never with `len` up front.
        let mut buf = Vec::new();
        (&mut self.inner).take(len as u64).read_to_end(&mut buf)?;
        if buf.len() < len {
            return Err(SourceError::Exhausted {
                requested: len,
                received: buf.len(),
            });
        }
        self.consumed += len as u64;
        Ok(buf)
    }
}
