//! Core error types.

use thiserror::Error;

/// Errors raised by the data model.
///
/// These are contract violations: they point at a setup bug in the caller and
/// are never produced by a missing GPU capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A buffer slot that does not exist was addressed.
    #[error("buffer slot {index} does not exist (geometry has {len} buffers)")]
    BufferSlotOutOfRange {
        /// Requested slot.
        index: usize,
        /// Number of slots in the geometry.
        len: usize,
    },
    /// Index data is not made of 16-bit or 32-bit unsigned integers.
    #[error("invalid index buffer: {0}")]
    InvalidIndexBuffer(String),
    /// A buffer was created with neither data nor a size.
    #[error("buffer {0:?} has zero size")]
    ZeroSizedBuffer(String),
    /// A vertex format name could not be parsed.
    #[error("unknown vertex format: {0}")]
    UnknownVertexFormat(String),
    /// An attribute has no buffer and the geometry has no default vertex buffer.
    #[error("attribute {0:?} has no buffer and the geometry has no vertex buffer")]
    MissingVertexBuffer(String),
    /// An attribute name is not declared on the geometry.
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),
}
