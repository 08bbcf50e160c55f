//! CPU-side geometry types.
//!
//! - [`VertexFormat`] - Attribute data formats with integer routing
//! - [`Attribute`] / [`GeometryLayout`] - Named attributes and their packing
//! - [`Geometry`] / [`GeometryDescriptor`] - Buffers plus a shared layout
//! - [`MultiDrawBuffer`] - Batched draw ranges
//!
//! These types are re-exported by `vellum-graphics` for convenience.

mod attribute;
mod data;
mod format;
mod layout;
mod multi_draw;

pub use attribute::Attribute;
pub use data::{
    AttributeDescriptor, AttributeSource, Geometry, GeometryDescriptor, IndexFormat,
    PrimitiveTopology,
};
pub use format::{ScalarType, VertexFormat};
pub use layout::GeometryLayout;
pub use multi_draw::{DrawRange, MultiDrawBuffer};
