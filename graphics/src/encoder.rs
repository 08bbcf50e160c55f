//! Draw requests.
//!
//! A request bundles everything one draw needs so callers issue it with a
//! single [`GlContext::draw_request`](crate::context::GlContext::draw_request)
//! call. Unset fields fall back to the geometry:
//!
//! - `topology`: [`Geometry::topology`]
//! - `size`: the index count, or [`Geometry::get_size`] for non-indexed geometry
//! - `start`: 0
//! - `instance_count`: [`Geometry::instance_count`]
//!
//! Setting `base_instance` issues an instanced draw starting at that instance,
//! natively or through attribute re-pointing.

use vellum_core::geometry::{Geometry, MultiDrawBuffer, PrimitiveTopology};

use crate::shader::GlProgram;

/// A single draw.
#[derive(Debug)]
pub struct DrawRequest<'a> {
    /// Geometry to draw.
    pub geometry: &'a mut Geometry,
    /// Program to draw with.
    pub program: &'a GlProgram,
    /// Topology override.
    pub topology: Option<PrimitiveTopology>,
    /// Vertex or index count.
    pub size: Option<u32>,
    /// First vertex or index.
    pub start: Option<u32>,
    /// Instance count.
    pub instance_count: Option<u32>,
    /// First instance.
    pub base_instance: Option<u32>,
}

impl<'a> DrawRequest<'a> {
    /// Draw `geometry` with `program` using the geometry's defaults.
    pub fn new(geometry: &'a mut Geometry, program: &'a GlProgram) -> Self {
        Self {
            geometry,
            program,
            topology: None,
            size: None,
            start: None,
            instance_count: None,
            base_instance: None,
        }
    }

    /// Override the topology.
    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = Some(topology);
        self
    }

    /// Draw `size` vertices or indices starting at `start`.
    pub fn with_range(mut self, start: u32, size: u32) -> Self {
        self.start = Some(start);
        self.size = Some(size);
        self
    }

    /// Override the instance count.
    pub fn with_instance_count(mut self, instance_count: u32) -> Self {
        self.instance_count = Some(instance_count);
        self
    }

    /// Start at `base_instance`.
    pub fn with_base_instance(mut self, base_instance: u32) -> Self {
        self.base_instance = Some(base_instance);
        self
    }
}

/// Many ranges of one geometry.
#[derive(Debug)]
pub struct MultiDrawRequest<'a> {
    /// Geometry to draw.
    pub geometry: &'a mut Geometry,
    /// Program to draw with.
    pub program: &'a GlProgram,
    /// Ranges to draw.
    pub multi: &'a MultiDrawBuffer,
    /// Topology override.
    pub topology: Option<PrimitiveTopology>,
}

impl<'a> MultiDrawRequest<'a> {
    /// Draw every range of `multi`.
    pub fn new(geometry: &'a mut Geometry, program: &'a GlProgram, multi: &'a MultiDrawBuffer) -> Self {
        Self {
            geometry,
            program,
            multi,
            topology: None,
        }
    }

    /// Override the topology.
    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = Some(topology);
        self
    }
}
