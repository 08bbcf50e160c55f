//! GPU-side buffer copies.
//!
//! A [`BufferCopier`] moves stride-sized elements between two buffers without
//! a CPU readback. Copiers are tried in priority order by callers such as
//! [`GrowableBuffer`]; a copier that cannot perform a request returns `false`
//! and leaves the destination untouched so the next one can take over.
//!
//! - [`TransformFeedbackCopier`]: captures a pass-through vertex stage
//! - [`NativeBufferCopier`]: `copyBufferSubData`
//! - `WgpuBufferCopier` (feature `wgpu-backend`): `copy_buffer_to_buffer`

mod native;
mod recycle;
mod transform_feedback;

pub use native::NativeBufferCopier;
pub use recycle::{BlockId, BufferBlock, GrowableBuffer};
pub use transform_feedback::{pack_stride, TransformFeedbackCopier};

use vellum_core::buffer::Buffer;
use vellum_core::copy::BufferCopyOperation;

/// Copies elements between buffers of context `C`.
pub trait BufferCopier<C: ?Sized> {
    /// Copier name, for logging.
    fn name(&self) -> &'static str;

    /// Copy the first `count` operations from `src` to `dst`.
    ///
    /// Offsets and counts of each operation are in elements of
    /// `stride_bytes` bytes. `src` and `dst` must be different buffers.
    /// Returns `false`, without touching `dst`, if this copier cannot
    /// perform the request.
    fn do_copy(
        &mut self,
        ctx: &mut C,
        src: &Buffer,
        dst: &Buffer,
        stride_bytes: u32,
        ops: &[BufferCopyOperation],
        count: usize,
    ) -> bool;
}
