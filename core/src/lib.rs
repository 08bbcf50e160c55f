//! # Vellum Core
//!
//! GPU-agnostic data model for the Vellum renderer: buffers with update
//! versioning, vertex attributes, geometries with shared layouts, multi-draw
//! batches and buffer copy operations.

pub mod buffer;
pub mod copy;
pub mod error;
pub mod geometry;
pub mod pool;
pub mod resource;

pub use error::CoreError;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core version.
pub fn init() {
    log::info!("Vellum Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
