//! # Vellum Graphics
//!
//! GPU binding core of the Vellum renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GlContext`] - Per-context caches of native buffers and vertex arrays,
//!   capability queries and draw dispatch
//! - [`GlBackend`] - Trait for native command surfaces, with a recording
//!   [`DummyBackend`] and a `glow` backend
//! - [`system`] - Buffer and geometry systems, and the instanced attribute
//!   sync programs that emulate base instances
//! - [`copy`] - GPU-side buffer copies and relocatable element storage
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use vellum_graphics::{DrawRequest, DummyBackend, GlContext, ProgramSource};
//! use vellum_core::geometry::{Geometry, GeometryDescriptor, VertexFormat};
//!
//! let mut ctx = GlContext::new(Arc::new(DummyBackend::new()));
//! let program = ctx
//!     .create_program(&ProgramSource::new("void main() {}", "void main() {}").with_attribute("aPosition", 0))
//!     .unwrap();
//!
//! let mut triangle = Geometry::new(
//!     GeometryDescriptor::new()
//!         .with_vertex_buffer(vec![0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0])
//!         .with_attribute("aPosition", VertexFormat::Float32x2),
//! )
//! .unwrap();
//!
//! ctx.draw_request(DrawRequest::new(&mut triangle, &program)).unwrap();
//! ```

pub mod backend;
pub mod context;
pub mod copy;
pub mod encoder;
pub mod error;
pub mod shader;
pub mod system;

// Re-export main types for convenience
pub use backend::dummy::DummyBackend;
#[cfg(feature = "gl-backend")]
pub use backend::glow_backend::GlowBackend;
#[cfg(feature = "wgpu-backend")]
pub use backend::wgpu_impl::{WgpuBufferCopier, WgpuContext};
pub use backend::{Capabilities, GlBackend, ProgramSource};
pub use context::{ContextParameters, GlContext};
pub use copy::{BufferCopier, GrowableBuffer, NativeBufferCopier, TransformFeedbackCopier};
pub use encoder::{DrawRequest, MultiDrawRequest};
pub use error::GraphicsError;
pub use shader::GlProgram;

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
pub fn init() {
    log::info!("Vellum Graphics v{} initialized", VERSION);
}
