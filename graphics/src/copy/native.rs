//! Buffer copies through `copyBufferSubData`.

use vellum_core::buffer::Buffer;
use vellum_core::copy::BufferCopyOperation;

use crate::backend::BufferTarget;
use crate::context::GlContext;

use super::BufferCopier;

/// Copies each operation with one native sub-range copy.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBufferCopier;

impl NativeBufferCopier {
    /// Create a native copier.
    pub fn new() -> Self {
        Self
    }
}

impl BufferCopier<GlContext> for NativeBufferCopier {
    fn name(&self) -> &'static str {
        "native"
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
        if !ctx.capabilities().copy_buffer {
            ctx.warnings().warn(
                "copy-buffer",
                "buffer-to-buffer copies are not supported by this context",
            );
            return false;
        }
        if stride_bytes == 0 {
            log::debug!("NativeBufferCopier: refusing zero stride");
            return false;
        }

        let (src_handle, dst_handle) = match (ctx.ensure_buffer(src), ctx.ensure_buffer(dst)) {
            (Ok(src), Ok(dst)) => (src, dst),
            (Err(err), _) | (_, Err(err)) => {
                log::error!("NativeBufferCopier: {err}");
                return false;
            }
        };

        let backend = ctx.backend();
        backend.bind_buffer(BufferTarget::CopyRead, Some(src_handle));
        backend.bind_buffer(BufferTarget::CopyWrite, Some(dst_handle));

        let stride = stride_bytes as u64;
        for op in ops.iter().take(count) {
            backend.copy_buffer_sub_data(
                BufferTarget::CopyRead,
                BufferTarget::CopyWrite,
                op.src as u64 * stride,
                op.dst as u64 * stride,
                op.count as u64 * stride,
            );
        }
        true
    }
}
