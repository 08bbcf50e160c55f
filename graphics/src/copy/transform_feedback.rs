//! Buffer copies through transform feedback.
//!
//! A pass-through vertex stage forwards every input attribute to an output
//! varying. With rasterization discarded and the varyings captured into the
//! destination range, drawing `n` points copies `n` vertices worth of bytes.

use std::fmt::Write as _;

use vellum_core::buffer::Buffer;
use vellum_core::copy::BufferCopyOperation;
use vellum_core::geometry::VertexFormat;

use crate::backend::{
    AttribPointer, BufferTarget, DrawMode, ProgramHandle, ProgramSource, TransformFeedbackHandle,
    VertexArrayHandle,
};
use crate::context::GlContext;
use crate::error::GraphicsError;

use super::BufferCopier;

/// Split `stride_floats` into equal attributes of the widest size in
/// 4, 3, 2, 1 floats that divides it.
///
/// ```
/// use vellum_graphics::copy::pack_stride;
///
/// assert_eq!(pack_stride(8), vec![4, 4]);
/// assert_eq!(pack_stride(6), vec![3, 3]);
/// assert_eq!(pack_stride(5), vec![1, 1, 1, 1, 1]);
/// ```
pub fn pack_stride(stride_floats: u32) -> Vec<u32> {
    let Some(width) = [4, 3, 2, 1]
        .into_iter()
        .find(|width| stride_floats % width == 0)
    else {
        return Vec::new();
    };
    vec![width; (stride_floats / width) as usize]
}

fn float_format(width: u32) -> VertexFormat {
    match width {
        1 => VertexFormat::Float32,
        2 => VertexFormat::Float32x2,
        3 => VertexFormat::Float32x3,
        _ => VertexFormat::Float32x4,
    }
}

fn glsl_type(width: u32) -> &'static str {
    match width {
        1 => "float",
        2 => "vec2",
        3 => "vec3",
        _ => "vec4",
    }
}

#[derive(Debug, Clone, Copy)]
struct FeedbackResources {
    program: ProgramHandle,
    vao: VertexArrayHandle,
    feedback: TransformFeedbackHandle,
}

/// Copies elements by capturing a pass-through vertex stage.
///
/// The copier is built for a fixed stride in floats. Requests whose stride is
/// a multiple of it are drawn as several copier vertices per element; any
/// other stride is refused.
#[derive(Debug)]
pub struct TransformFeedbackCopier {
    stride_floats: u32,
    layout: Vec<u32>,
    resources: Option<FeedbackResources>,
}

impl TransformFeedbackCopier {
    /// Create a copier for elements of `stride_floats` 32-bit floats.
    pub fn new(stride_floats: u32) -> Self {
        Self {
            stride_floats,
            layout: pack_stride(stride_floats),
            resources: None,
        }
    }

    /// Configured stride in floats.
    pub fn stride_floats(&self) -> u32 {
        self.stride_floats
    }

    /// Configured stride in bytes.
    pub fn stride_bytes(&self) -> u32 {
        self.stride_floats * 4
    }

    /// Width in floats of each pass-through attribute.
    pub fn layout(&self) -> &[u32] {
        &self.layout
    }

    /// Program sources of the pass-through stage.
    pub fn program_source(&self) -> ProgramSource {
        let mut vertex = String::from("#version 300 es\n");
        for (i, width) in self.layout.iter().enumerate() {
            let _ = writeln!(vertex, "in {} aIn{i};", glsl_type(*width));
            let _ = writeln!(vertex, "out {} vOut{i};", glsl_type(*width));
        }
        vertex.push_str("void main() {\n");
        for i in 0..self.layout.len() {
            let _ = writeln!(vertex, "    vOut{i} = aIn{i};");
        }
        vertex.push_str("    gl_Position = vec4(2.0, 2.0, 2.0, 1.0);\n}\n");

        let fragment = "#version 300 es\nprecision lowp float;\nout vec4 fragColor;\nvoid main() {\n    fragColor = vec4(0.0);\n}\n";

        (0..self.layout.len()).fold(ProgramSource::new(vertex, fragment), |source, i| {
            source
                .with_attribute(format!("aIn{i}"), i as u32)
                .with_feedback_varying(format!("vOut{i}"))
        })
    }

    fn ensure_resources(&mut self, ctx: &GlContext) -> Result<FeedbackResources, GraphicsError> {
        if let Some(resources) = self.resources {
            return Ok(resources);
        }
        let backend = ctx.backend();
        let program = backend.create_program(&self.program_source())?;
        let vao = backend.create_vertex_array()?;
        let feedback = backend.create_transform_feedback()?;
        log::trace!(
            "TransformFeedbackCopier: created {program:?}, {vao:?} and {feedback:?} for stride {}",
            self.stride_floats
        );
        let resources = FeedbackResources {
            program,
            vao,
            feedback,
        };
        self.resources = Some(resources);
        Ok(resources)
    }

    /// Delete the copier's native objects.
    pub fn destroy(&mut self, ctx: &mut GlContext) {
        if let Some(resources) = self.resources.take() {
            let backend = ctx.backend();
            backend.delete_program(resources.program);
            backend.delete_vertex_array(resources.vao);
            backend.delete_transform_feedback(resources.feedback);
            ctx.invalidate_bindings();
        }
    }
}

impl BufferCopier<GlContext> for TransformFeedbackCopier {
    fn name(&self) -> &'static str {
        "transform-feedback"
    }

    fn do_copy(
        &mut self,
        ctx: &mut GlContext,
        src: &Buffer,
        dst: &Buffer,
        stride_bytes: u32,
        ops: &[BufferCopyOperation],
        count: usize,
    ) -> bool {
        let copier_stride = self.stride_bytes();
        if copier_stride == 0 || stride_bytes == 0 || stride_bytes % copier_stride != 0 {
            log::debug!(
                "TransformFeedbackCopier: refusing stride {stride_bytes}, not a multiple of {copier_stride}"
            );
            return false;
        }
        if !ctx.capabilities().transform_feedback {
            log::debug!("TransformFeedbackCopier: transform feedback is not supported");
            return false;
        }

        let resources = match self.ensure_resources(ctx) {
            Ok(resources) => resources,
            Err(err) => {
                log::error!("TransformFeedbackCopier: {err}");
                return false;
            }
        };
        let (src_handle, dst_handle) = match (ctx.ensure_buffer(src), ctx.ensure_buffer(dst)) {
            (Ok(src), Ok(dst)) => (src, dst),
            (Err(err), _) | (_, Err(err)) => {
                log::error!("TransformFeedbackCopier: {err}");
                return false;
            }
        };

        let per_element = stride_bytes / copier_stride;
        let backend = ctx.backend();
        backend.use_program(Some(resources.program));
        backend.bind_vertex_array(Some(resources.vao));
        backend.bind_buffer(BufferTarget::Array, Some(src_handle));

        let mut offset = 0u64;
        for (location, width) in self.layout.iter().enumerate() {
            let location = location as u32;
            let pointer = AttribPointer::new(float_format(*width), copier_stride, offset);
            backend.enable_vertex_attrib_array(location);
            backend.vertex_attrib_pointer(location, &pointer);
            backend.vertex_attrib_divisor(location, 0);
            offset += pointer.value_size() as u64;
        }

        backend.set_rasterizer_discard(true);
        backend.bind_transform_feedback(Some(resources.feedback));
        let stride = stride_bytes as u64;
        for op in ops.iter().take(count) {
            backend.bind_buffer_range(
                BufferTarget::TransformFeedback,
                0,
                Some(dst_handle),
                op.dst as u64 * stride,
                op.count as u64 * stride,
            );
            backend.begin_transform_feedback(DrawMode::Points);
            backend.draw_arrays(DrawMode::Points, op.src * per_element, op.count * per_element);
            backend.end_transform_feedback();
        }
        backend.bind_buffer_range(BufferTarget::TransformFeedback, 0, None, 0, 0);
        backend.bind_transform_feedback(None);
        backend.set_rasterizer_discard(false);
        backend.bind_vertex_array(None);

        ctx.invalidate_bindings();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_stride() {
        assert_eq!(pack_stride(4), vec![4]);
        assert_eq!(pack_stride(12), vec![4, 4, 4]);
        assert_eq!(pack_stride(9), vec![3, 3, 3]);
        assert_eq!(pack_stride(2), vec![2]);
        assert_eq!(pack_stride(7), vec![1; 7]);
        assert!(pack_stride(0).is_empty());
    }

    #[test]
    fn test_program_source_passes_through() {
        let copier = TransformFeedbackCopier::new(6);
        let source = copier.program_source();
        assert!(source.vertex.contains("in vec3 aIn1;"));
        assert!(source.vertex.contains("vOut1 = aIn1;"));
        assert_eq!(source.feedback_varyings, vec!["vOut0", "vOut1"]);
        assert_eq!(source.attribute_locations.get("aIn1"), Some(&1));
    }
}
