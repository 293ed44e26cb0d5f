//! Wire token codec.
//!
//! Each field of a layout resolves to one [`WireToken`], the minimal
//! descriptor of its width, signedness, byte order and string encoding.
//! The module follows a layered structure:
//! - `token`: typed descriptors and their textual form (`l<`, `A11`, `x`, ...)
//! - `reader`: bounds-checked byte access
//! - `parser`: decoding a token list against a byte buffer
//! - `writer`: encoding values token by token
//! - `error`: codec errors
//!
//! The codec is pure; resolving sizes and walking a layout in declaration
//! order is the job of [`crate::Layout`].

pub mod error;
pub mod parser;
pub mod reader;
pub mod token;
pub mod writer;

pub use error::WireError;
pub use parser::decode;
pub use token::{DigitOrder, Fill, IntWidth, WireToken};
pub use writer::WireWriter;
