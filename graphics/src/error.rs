//! Graphics error types.

use thiserror::Error;
use vellum_core::CoreError;

/// Errors that can occur in the graphics system.
///
/// Only contract violations and native failures are errors. Missing optional
/// capabilities are handled by emulation or a one-time warning instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicsError {
    /// The bound program reads an attribute the geometry does not declare.
    #[error("geometry {geometry:?} is missing attribute {attribute:?} required by the program")]
    MissingAttribute {
        /// Name of the missing attribute.
        attribute: String,
        /// Label of the geometry, if any.
        geometry: Option<String>,
    },
    /// A draw was issued for a geometry that is not the bound one.
    #[error("geometry is not bound")]
    GeometryNotBound,
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// Failed to create a native object.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// A shader failed to compile or link.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),
    /// A requested feature is not supported.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A data-model contract was violated.
    #[error(transparent)]
    Core(#[from] CoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::MissingAttribute {
            attribute: "aUV".to_string(),
            geometry: Some("quad".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "geometry Some(\"quad\") is missing attribute \"aUV\" required by the program"
        );

        let err = GraphicsError::InitializationFailed("no GL context".to_string());
        assert_eq!(err.to_string(), "initialization failed: no GL context");
    }

    #[test]
    fn test_core_error_is_transparent() {
        let err: GraphicsError = CoreError::BufferSlotOutOfRange { index: 2, len: 1 }.into();
        assert_eq!(
            err.to_string(),
            "buffer slot 2 does not exist (geometry has 1 buffers)"
        );
    }
}
