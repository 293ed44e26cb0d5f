//! Modifier classification.
//!
//! A modifier is one declared token such as `little_endian`, `unsigned`,
//! `double`, `hex` or `uint32`. Classification maps the token to one or more
//! [`Tag`]s; compound integer tokens contribute both a signedness and a bit
//! width. The vocabulary is closed: anything else is an
//! [`LayoutError::UnknownModifier`].

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Native,
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signedness {
    #[default]
    Signed,
    Unsigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    Int16,
    Int32,
    Int64,
    String,
    Float,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Single,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringType {
    Hex,
    Base64,
    Bit,
}

/// One `(category, value)` contribution of a modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Endian(Endian),
    Signedness(Signedness),
    BaseType(BaseType),
    Precision(Precision),
    StringType(StringType),
    /// Bit width implied by a compound token such as `uint32`.
    Size(u32),
}

/// A declared modifier token with its classification memoized on first use.
///
/// # Examples
/// ```
/// use packstruct_core::{Endian, Modifier, Tag};
///
/// let m = Modifier::new("little_endian");
/// assert_eq!(m.tags().unwrap(), &[Tag::Endian(Endian::Little)]);
/// ```
#[derive(Debug, Clone)]
pub struct Modifier {
    name: String,
    memo: OnceLock<Option<Vec<Tag>>>,
}

impl Modifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            memo: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Classified tags, computed once and cached.
    ///
    /// # Errors
    /// Returns `LayoutError::UnknownModifier` when the token is outside the
    /// vocabulary; the failure is cached as well.
    pub fn tags(&self) -> Result<&[Tag], LayoutError> {
        self.memo
            .get_or_init(|| classify(&self.name))
            .as_deref()
            .ok_or_else(|| LayoutError::UnknownModifier {
                token: self.name.clone(),
            })
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Modifier {
    fn from(name: &str) -> Self {
        Modifier::new(name)
    }
}

impl From<String> for Modifier {
    fn from(name: String) -> Self {
        Modifier::new(name)
    }
}

/// Classify a token without memoization.
pub fn classify(token: &str) -> Option<Vec<Tag>> {
    let tags = match token {
        "little_endian" | "little" | "lsb" | "low" => vec![Tag::Endian(Endian::Little)],
        "big_endian" | "big" | "msb" | "high" | "network" => vec![Tag::Endian(Endian::Big)],
        "signed" => vec![Tag::Signedness(Signedness::Signed)],
        "unsigned" | "spaced" => vec![Tag::Signedness(Signedness::Unsigned)],
        "short" => vec![Tag::BaseType(BaseType::Int16)],
        "int" => vec![Tag::BaseType(BaseType::Int32)],
        "long" => vec![Tag::BaseType(BaseType::Int64)],
        "string" | "char" => vec![Tag::BaseType(BaseType::String)],
        "float" => vec![Tag::BaseType(BaseType::Float)],
        "null" => vec![
            Tag::Signedness(Signedness::Signed),
            Tag::BaseType(BaseType::Null),
        ],
        "double" => vec![Tag::Precision(Precision::Double)],
        "hex" => vec![Tag::StringType(StringType::Hex)],
        "base64" => vec![Tag::StringType(StringType::Base64)],
        "bit" | "binary" => vec![Tag::StringType(StringType::Bit)],
        other => return classify_sized_int(other),
    };
    Some(tags)
}

/// `{u|}int{16|32|64}`
fn classify_sized_int(token: &str) -> Option<Vec<Tag>> {
    let (signedness, rest) = match token.strip_prefix('u') {
        Some(rest) => (Signedness::Unsigned, rest),
        None => (Signedness::Signed, token),
    };
    let bits = match rest.strip_prefix("int")? {
        "16" => 16,
        "32" => 32,
        "64" => 64,
        _ => return None,
    };
    Some(vec![Tag::Signedness(signedness), Tag::Size(bits)])
}
