//! Program metadata consumed by the binding core.
//!
//! The binding core does not compile shaders on the draw path. It only reads
//! the attribute name to location table of a program for compatibility checks
//! and vertex array signatures.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::ProgramHandle;

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a [`GlProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(u64);

impl ProgramId {
    fn next() -> Self {
        Self(NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An input attribute declared by a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramAttribute {
    /// Shader location.
    pub location: u32,
}

/// A program's attribute table and, once linked, its native handle.
///
/// # Example
///
/// ```
/// use vellum_graphics::shader::GlProgram;
///
/// let program = GlProgram::new()
///     .with_attribute("aPosition", 0)
///     .with_attribute("aColor", 1);
/// assert_eq!(program.attribute("aColor").map(|a| a.location), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct GlProgram {
    id: ProgramId,
    attributes: BTreeMap<String, ProgramAttribute>,
    handle: Option<ProgramHandle>,
}

impl GlProgram {
    /// Create a program with no attributes.
    pub fn new() -> Self {
        Self {
            id: ProgramId::next(),
            attributes: BTreeMap::new(),
            handle: None,
        }
    }

    /// Declare an input attribute at `location`.
    pub fn with_attribute(mut self, name: impl Into<String>, location: u32) -> Self {
        self.attributes
            .insert(name.into(), ProgramAttribute { location });
        self
    }

    pub(crate) fn with_handle(mut self, handle: ProgramHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Unique identity.
    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// Native handle, if the program was linked by a context.
    pub fn handle(&self) -> Option<ProgramHandle> {
        self.handle
    }

    /// Get a declared attribute.
    pub fn attribute(&self, name: &str) -> Option<&ProgramAttribute> {
        self.attributes.get(name)
    }

    /// Declared attributes, by name.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &ProgramAttribute)> {
        self.attributes.iter().map(|(name, attr)| (name.as_str(), attr))
    }
}

impl Default for GlProgram {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(GlProgram: Send, Sync);
