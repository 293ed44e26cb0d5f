//! Host integration: named layouts and declarative layout files.
//!
//! A host registers one or more layouts through a builder closure, or loads
//! them from a JSON declaration, and later looks one up by name (or takes the
//! sole unnamed one). Every registered layout is finalized.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::layout::Layout;

/// Explicit size of a declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeDecl {
    Literal(u32),
    Field {
        field: String,
        #[serde(default)]
        offset: i64,
    },
}

/// One `(name, modifiers, size)` declaration triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeDecl>,
}

impl FieldDecl {
    pub fn new(name: &str, modifiers: &[&str], size: Option<SizeDecl>) -> Self {
        Self {
            name: name.to_string(),
            modifiers: modifiers.iter().map(|m| m.to_string()).collect(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub fields: Vec<FieldDecl>,
}

/// Contents of a layout file.
///
/// # Examples
/// ```
/// use packstruct_core::RegistryDecl;
///
/// let decl = RegistryDecl::from_json(
///     r#"{"layouts": [{"name": "frame", "fields": [
///         {"name": "len", "modifiers": ["uint16", "big"]},
///         {"name": "body", "modifiers": ["string"], "size": {"field": "len", "offset": -2}}
///     ]}]}"#,
/// )?;
/// assert_eq!(decl.layouts[0].fields.len(), 2);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDecl {
    pub layouts: Vec<LayoutDecl>,
}

impl RegistryDecl {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Named layouts of one host.
///
/// # Examples
/// ```
/// use packstruct_core::StructRegistry;
///
/// let mut registry = StructRegistry::new();
/// registry.define(Some("header"), |layout| {
///     layout.declare("magic")?.with("uint32").with("big");
///     layout.declare("version")?.with("unsigned").sized(8);
///     Ok(())
/// })?;
/// assert_eq!(registry.resolve(None)?.render(&Default::default())?, "L> C");
/// # Ok::<(), packstruct_core::LayoutError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct StructRegistry {
    named: BTreeMap<String, Layout>,
    unnamed: Option<Layout>,
}

impl StructRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a layout with `build`, finalize it and register it under `name`
    /// (or as the unnamed layout). Replaces any layout of the same name.
    ///
    /// # Errors
    /// Returns the builder's error or the finalize error; nothing is
    /// registered in that case.
    pub fn define<F>(&mut self, name: Option<&str>, build: F) -> Result<&Layout, LayoutError>
    where
        F: FnOnce(&mut Layout) -> Result<(), LayoutError>,
    {
        let mut layout = Layout::new();
        build(&mut layout)?;
        layout.finalize()?;
        Ok(self.insert(name, layout))
    }

    /// Register an already finalized layout.
    pub fn insert(&mut self, name: Option<&str>, layout: Layout) -> &Layout {
        debug!(
            "registering layout '{}' with {} fields",
            name.unwrap_or("<unnamed>"),
            layout.len()
        );
        match name {
            Some(name) => {
                self.named.insert(name.to_string(), layout);
                &self.named[name]
            }
            None => &*self.unnamed.insert(layout),
        }
    }

    /// Build a registry from a layout file declaration.
    ///
    /// # Errors
    /// Returns the first layout's declaration or finalize error.
    pub fn from_decl(decl: &RegistryDecl) -> Result<Self, LayoutError> {
        let mut registry = StructRegistry::new();
        for layout in &decl.layouts {
            let built = Layout::from_fields(&layout.fields)?;
            registry.insert(layout.name.as_deref(), built);
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&Layout> {
        self.named.get(name)
    }

    pub fn unnamed(&self) -> Option<&Layout> {
        self.unnamed.as_ref()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.named.len() + usize::from(self.unnamed.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Layout by name; without a name, the unnamed layout or the only one.
    ///
    /// # Errors
    /// Returns `LayoutError::UnknownLayout` for an unregistered name and
    /// `LayoutError::AmbiguousLayout` when no name is given and the choice
    /// is not unique.
    pub fn resolve(&self, name: Option<&str>) -> Result<&Layout, LayoutError> {
        match name {
            Some(name) => self.get(name).ok_or_else(|| LayoutError::UnknownLayout {
                name: name.to_string(),
            }),
            None => {
                if let Some(layout) = &self.unnamed {
                    return Ok(layout);
                }
                let mut layouts = self.named.values();
                match (layouts.next(), layouts.next()) {
                    (Some(layout), None) => Ok(layout),
                    _ => Err(LayoutError::AmbiguousLayout {
                        count: self.named.len(),
                    }),
                }
            }
        }
    }
}
