//! Native command surface.
//!
//! The binding core never talks to a GPU API directly. Every native call goes
//! through the [`GlBackend`] trait, a thin WebGL2/GLES3-shaped interface with
//! opaque integer handles.
//!
//! # Available Backends
//!
//! - [`dummy`]: records every call and simulates buffer memory, vertex array
//!   state, buffer copies and transform feedback capture. Used by tests.
//! - `glow_backend` (feature `gl-backend`): OpenGL 3.3+ / GLES 3.0 via `glow`.
//! - `wgpu_impl` (feature `wgpu-backend`): a WebGPU-style buffer context with
//!   native buffer copies via `wgpu`.

pub mod dummy;

#[cfg(feature = "gl-backend")]
pub mod glow_backend;

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_impl;

use std::collections::BTreeMap;

use vellum_core::geometry::{IndexFormat, PrimitiveTopology, ScalarType, VertexFormat};

use crate::error::GraphicsError;

macro_rules! native_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u32);
        )*
    };
}

native_handle! {
    /// Native buffer object.
    BufferHandle,
    /// Native vertex array object.
    VertexArrayHandle,
    /// Native linked program.
    ProgramHandle,
    /// Native transform feedback object.
    TransformFeedbackHandle,
}

/// Buffer binding point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BufferTarget {
    /// Vertex attribute source.
    Array,
    /// Index source. Part of the bound vertex array's state.
    ElementArray,
    /// Uniform block source.
    Uniform,
    /// Copy source.
    CopyRead,
    /// Copy destination and upload staging point.
    CopyWrite,
    /// Transform feedback capture.
    TransformFeedback,
}

/// Usage hint passed with full uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UsageHint {
    /// Uploaded once, drawn many times.
    Static,
    /// Uploaded often.
    #[default]
    Dynamic,
}

/// Primitive assembly mode of a native draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    /// `GL_POINTS`
    Points,
    /// `GL_LINES`
    Lines,
    /// `GL_LINE_STRIP`
    LineStrip,
    /// `GL_TRIANGLES`
    Triangles,
    /// `GL_TRIANGLE_STRIP`
    TriangleStrip,
}

impl From<PrimitiveTopology> for DrawMode {
    fn from(topology: PrimitiveTopology) -> Self {
        match topology {
            PrimitiveTopology::PointList => Self::Points,
            PrimitiveTopology::LineList => Self::Lines,
            PrimitiveTopology::LineStrip => Self::LineStrip,
            PrimitiveTopology::TriangleList => Self::Triangles,
            PrimitiveTopology::TriangleStrip => Self::TriangleStrip,
        }
    }
}

/// Arguments of a `vertexAttribPointer` / `vertexAttribIPointer` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttribPointer {
    /// Components per vertex (1 to 4).
    pub components: u32,
    /// Component type.
    pub scalar: ScalarType,
    /// Normalize integer components (float pointer only).
    pub normalized: bool,
    /// Byte stride.
    pub stride: u32,
    /// Byte offset into the bound array buffer.
    pub offset: u64,
}

impl AttribPointer {
    /// Pointer for `format` at the given stride and offset.
    pub fn new(format: VertexFormat, stride: u32, offset: u64) -> Self {
        Self {
            components: format.components(),
            scalar: format.scalar(),
            normalized: format.is_normalized(),
            stride,
            offset,
        }
    }

    /// Size in bytes of one attribute value.
    pub fn value_size(&self) -> u32 {
        self.components * self.scalar.size()
    }
}

/// Optional native capabilities, queried once per context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// 32-bit index buffers.
    pub uint32_indices: bool,
    /// Instanced draws with attribute divisors.
    pub instancing: bool,
    /// Instanced draws with a base instance.
    pub base_instance: bool,
    /// Multi-draw with per-range instance counts and base instances.
    pub multi_draw_base_instance: bool,
    /// Buffer-to-buffer copies.
    pub copy_buffer: bool,
    /// Transform feedback capture.
    pub transform_feedback: bool,
}

impl Capabilities {
    /// Every optional capability.
    pub const fn all() -> Self {
        Self {
            uint32_indices: true,
            instancing: true,
            base_instance: true,
            multi_draw_base_instance: true,
            copy_buffer: true,
            transform_feedback: true,
        }
    }

    /// Baseline WebGL2 / GLES 3.0 without extensions.
    pub const fn webgl2() -> Self {
        Self {
            uint32_indices: true,
            instancing: true,
            base_instance: false,
            multi_draw_base_instance: false,
            copy_buffer: true,
            transform_feedback: true,
        }
    }

    /// No optional capability.
    pub const fn none() -> Self {
        Self {
            uint32_indices: false,
            instancing: false,
            base_instance: false,
            multi_draw_base_instance: false,
            copy_buffer: false,
            transform_feedback: false,
        }
    }

    /// Keep only the capabilities present in both sets.
    pub fn intersect(self, other: Self) -> Self {
        Self {
            uint32_indices: self.uint32_indices && other.uint32_indices,
            instancing: self.instancing && other.instancing,
            base_instance: self.base_instance && other.base_instance,
            multi_draw_base_instance: self.multi_draw_base_instance
                && other.multi_draw_base_instance,
            copy_buffer: self.copy_buffer && other.copy_buffer,
            transform_feedback: self.transform_feedback && other.transform_feedback,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Sources and fixed bindings for a native program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramSource {
    /// Vertex stage source (GLSL ES 3.00).
    pub vertex: String,
    /// Fragment stage source (GLSL ES 3.00).
    pub fragment: String,
    /// Attribute locations bound before linking.
    pub attribute_locations: BTreeMap<String, u32>,
    /// Varyings captured by transform feedback, interleaved, in order.
    pub feedback_varyings: Vec<String>,
}

impl ProgramSource {
    /// Create a program source.
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
            ..Default::default()
        }
    }

    /// Bind `name` to `location` before linking.
    pub fn with_attribute(mut self, name: impl Into<String>, location: u32) -> Self {
        self.attribute_locations.insert(name.into(), location);
        self
    }

    /// Capture `name` with transform feedback.
    pub fn with_feedback_varying(mut self, name: impl Into<String>) -> Self {
        self.feedback_varyings.push(name.into());
        self
    }
}

/// WebGL2/GLES3-shaped native command surface.
///
/// Methods mirror the native calls one to one; state caching happens above
/// this trait, never inside it.
pub trait GlBackend {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Query optional capabilities.
    fn capabilities(&self) -> Capabilities;

    // ------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------

    /// Create a buffer object.
    fn create_buffer(&self) -> Result<BufferHandle, GraphicsError>;

    /// Delete a buffer object.
    fn delete_buffer(&self, buffer: BufferHandle);

    /// Bind a buffer to a binding point.
    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>);

    /// Allocate and fill the buffer bound to `target`.
    fn buffer_data(&self, target: BufferTarget, data: &[u8], hint: UsageHint);

    /// Allocate `size` uninitialised bytes for the buffer bound to `target`.
    fn allocate_buffer(&self, target: BufferTarget, size: u64, hint: UsageHint);

    /// Overwrite part of the buffer bound to `target`.
    fn buffer_sub_data(&self, target: BufferTarget, offset: u64, data: &[u8]);

    /// Bind a range of a buffer to an indexed binding point.
    fn bind_buffer_range(
        &self,
        target: BufferTarget,
        index: u32,
        buffer: Option<BufferHandle>,
        offset: u64,
        size: u64,
    );

    /// Copy bytes between the buffers bound to two targets.
    fn copy_buffer_sub_data(
        &self,
        read: BufferTarget,
        write: BufferTarget,
        read_offset: u64,
        write_offset: u64,
        size: u64,
    );

    // ------------------------------------------------------------------
    // Vertex arrays
    // ------------------------------------------------------------------

    /// Create a vertex array object.
    fn create_vertex_array(&self) -> Result<VertexArrayHandle, GraphicsError>;

    /// Delete a vertex array object.
    fn delete_vertex_array(&self, vao: VertexArrayHandle);

    /// Bind a vertex array object.
    fn bind_vertex_array(&self, vao: Option<VertexArrayHandle>);

    /// Enable an attribute location.
    fn enable_vertex_attrib_array(&self, location: u32);

    /// Disable an attribute location.
    fn disable_vertex_attrib_array(&self, location: u32);

    /// Point a float (or normalized) attribute at the bound array buffer.
    fn vertex_attrib_pointer(&self, location: u32, pointer: &AttribPointer);

    /// Point an integer attribute at the bound array buffer.
    fn vertex_attrib_ipointer(&self, location: u32, pointer: &AttribPointer);

    /// Set the instance divisor of an attribute location.
    fn vertex_attrib_divisor(&self, location: u32, divisor: u32);

    // ------------------------------------------------------------------
    // Draws
    // ------------------------------------------------------------------

    /// `drawArrays`
    fn draw_arrays(&self, mode: DrawMode, first: u32, count: u32);

    /// `drawArraysInstanced`
    fn draw_arrays_instanced(&self, mode: DrawMode, first: u32, count: u32, instance_count: u32);

    /// `drawElements`
    fn draw_elements(&self, mode: DrawMode, count: u32, format: IndexFormat, byte_offset: u64);

    /// `drawElementsInstanced`
    fn draw_elements_instanced(
        &self,
        mode: DrawMode,
        count: u32,
        format: IndexFormat,
        byte_offset: u64,
        instance_count: u32,
    );

    /// `drawArraysInstancedBaseInstance`
    fn draw_arrays_instanced_base_instance(
        &self,
        mode: DrawMode,
        first: u32,
        count: u32,
        instance_count: u32,
        base_instance: u32,
    );

    /// `drawElementsInstancedBaseVertexBaseInstance` with a zero base vertex.
    fn draw_elements_instanced_base_instance(
        &self,
        mode: DrawMode,
        count: u32,
        format: IndexFormat,
        byte_offset: u64,
        instance_count: u32,
        base_instance: u32,
    );

    /// `multiDrawArraysInstancedBaseInstance`
    fn multi_draw_arrays_instanced_base_instance(
        &self,
        _mode: DrawMode,
        _firsts: &[u32],
        _counts: &[u32],
        _instance_counts: &[u32],
        _base_instances: &[u32],
    ) {
        log::error!("{}: multi-draw with base instance is not supported", self.name());
    }

    /// `multiDrawElementsInstancedBaseVertexBaseInstance` with zero base vertices.
    #[allow(clippy::too_many_arguments)]
    fn multi_draw_elements_instanced_base_instance(
        &self,
        _mode: DrawMode,
        _counts: &[u32],
        _format: IndexFormat,
        _byte_offsets: &[u64],
        _instance_counts: &[u32],
        _base_instances: &[u32],
    ) {
        log::error!("{}: multi-draw with base instance is not supported", self.name());
    }

    // ------------------------------------------------------------------
    // Programs and transform feedback
    // ------------------------------------------------------------------

    /// Compile and link a program.
    fn create_program(&self, source: &ProgramSource) -> Result<ProgramHandle, GraphicsError>;

    /// Make a program current.
    fn use_program(&self, program: Option<ProgramHandle>);

    /// Delete a program.
    fn delete_program(&self, program: ProgramHandle);

    /// Create a transform feedback object.
    fn create_transform_feedback(&self) -> Result<TransformFeedbackHandle, GraphicsError>;

    /// Delete a transform feedback object.
    fn delete_transform_feedback(&self, feedback: TransformFeedbackHandle);

    /// Bind a transform feedback object.
    fn bind_transform_feedback(&self, feedback: Option<TransformFeedbackHandle>);

    /// Start capturing primitives of `mode`.
    fn begin_transform_feedback(&self, mode: DrawMode);

    /// Stop capturing.
    fn end_transform_feedback(&self);

    /// Enable or disable `RASTERIZER_DISCARD`.
    fn set_rasterizer_discard(&self, enabled: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_intersect() {
        let caps = Capabilities::all().intersect(Capabilities::webgl2());
        assert_eq!(caps, Capabilities::webgl2());
        assert_eq!(Capabilities::none().intersect(Capabilities::all()), Capabilities::none());
    }

    #[test]
    fn test_attrib_pointer_from_format() {
        let pointer = AttribPointer::new(VertexFormat::Unorm8x4, 12, 8);
        assert_eq!(pointer.components, 4);
        assert_eq!(pointer.scalar, ScalarType::U8);
        assert!(pointer.normalized);
        assert_eq!(pointer.value_size(), 4);
    }
}
