//! Rendering context.
//!
//! A [`GlContext`] owns everything native for one command stream: the backend,
//! the capability set queried once at creation, the one-time warning registry,
//! the dispose queue data-model objects notify, and the buffer and geometry
//! systems. Every draw and copy issued through a context executes in call
//! order; caching only elides calls whose native state already matches.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use vellum_core::buffer::Buffer;
use vellum_core::geometry::{Geometry, MultiDrawBuffer, PrimitiveTopology};
use vellum_core::resource::{BufferId, DisposeEvent, DisposeQueue, GeometryId};

use crate::backend::{BufferHandle, Capabilities, GlBackend, ProgramHandle, ProgramSource};
use crate::encoder::{DrawRequest, MultiDrawRequest};
use crate::error::GraphicsError;
use crate::shader::GlProgram;
use crate::system::{GlBufferSystem, GlGeometrySystem};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a [`GlContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

/// Registry of warnings already logged by one context.
#[derive(Debug, Default)]
pub struct WarnOnce {
    issued: Mutex<HashSet<&'static str>>,
}

impl WarnOnce {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `message` unless a warning with `key` was already logged.
    ///
    /// Returns `true` if the warning was logged by this call.
    pub fn warn(&self, key: &'static str, message: &str) -> bool {
        if !self.issued.lock().insert(key) {
            return false;
        }
        log::warn!("{message}");
        true
    }

    /// Keys of every warning logged so far, sorted.
    pub fn issued(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.issued.lock().iter().copied().collect();
        keys.sort_unstable();
        keys
    }
}

/// Context creation parameters.
///
/// # Example
///
/// ```
/// use vellum_graphics::context::ContextParameters;
///
/// let params = ContextParameters::new()
///     .with_label("overlay")
///     .without_base_instance();
/// assert!(!params.capability_mask.base_instance);
/// assert!(!params.capability_mask.multi_draw_base_instance);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextParameters {
    /// Debug label.
    pub label: Option<String>,
    /// Capabilities allowed on top of what the backend reports.
    pub capability_mask: Capabilities,
}

impl ContextParameters {
    /// Allow every capability the backend reports.
    pub fn new() -> Self {
        Self {
            label: None,
            capability_mask: Capabilities::all(),
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Restrict capabilities to `mask`.
    pub fn with_capability_mask(mut self, mask: Capabilities) -> Self {
        self.capability_mask = mask;
        self
    }

    /// Force the emulated base-instance path, including for multi-draw.
    pub fn without_base_instance(mut self) -> Self {
        self.capability_mask.base_instance = false;
        self.capability_mask.multi_draw_base_instance = false;
        self
    }

    /// Force the per-range multi-draw loop.
    pub fn without_multi_draw(mut self) -> Self {
        self.capability_mask.multi_draw_base_instance = false;
        self
    }

    /// Treat 32-bit index buffers as unsupported.
    pub fn without_uint32_indices(mut self) -> Self {
        self.capability_mask.uint32_indices = false;
        self
    }

    /// Disable native buffer-to-buffer copies.
    pub fn without_native_copy(mut self) -> Self {
        self.capability_mask.copy_buffer = false;
        self
    }
}

impl Default for ContextParameters {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared by the systems of one context.
pub(crate) struct ContextShared {
    pub(crate) backend: Arc<dyn GlBackend>,
    pub(crate) caps: Capabilities,
    pub(crate) warnings: WarnOnce,
    pub(crate) queue: Arc<DisposeQueue>,
}

/// A rendering context bound to one native command stream.
pub struct GlContext {
    id: ContextId,
    label: Option<String>,
    shared: ContextShared,
    buffers: GlBufferSystem,
    geometry: GlGeometrySystem,
    active_program: Option<ProgramHandle>,
}

impl GlContext {
    /// Create a context with default parameters.
    pub fn new(backend: Arc<dyn GlBackend>) -> Self {
        Self::with_parameters(backend, ContextParameters::new())
    }

    /// Create a context. Capabilities are queried from the backend once and
    /// intersected with the parameters' mask.
    pub fn with_parameters(backend: Arc<dyn GlBackend>, params: ContextParameters) -> Self {
        let caps = backend.capabilities().intersect(params.capability_mask);
        let queue = DisposeQueue::new();
        let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));

        log::info!(
            "GlContext: {:?} ({:?}) on {} with {:?}",
            params.label,
            id,
            backend.name(),
            caps
        );

        Self {
            id,
            label: params.label,
            shared: ContextShared {
                backend,
                caps,
                warnings: WarnOnce::new(),
                queue: Arc::clone(&queue),
            },
            buffers: GlBufferSystem::new(queue),
            geometry: GlGeometrySystem::new(),
            active_program: None,
        }
    }

    /// Unique identity.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Debug label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Effective capabilities.
    pub fn capabilities(&self) -> Capabilities {
        self.shared.caps
    }

    /// The native backend.
    pub fn backend(&self) -> &Arc<dyn GlBackend> {
        &self.shared.backend
    }

    /// Keys of the capability warnings logged so far.
    pub fn warnings_issued(&self) -> Vec<&'static str> {
        self.shared.warnings.issued()
    }

    pub(crate) fn warnings(&self) -> &WarnOnce {
        &self.shared.warnings
    }

    /// Queue receiving dispose events of objects used by this context.
    pub fn dispose_queue(&self) -> &Arc<DisposeQueue> {
        &self.shared.queue
    }

    /// Buffer mirrors of this context.
    pub fn buffer_system(&self) -> &GlBufferSystem {
        &self.buffers
    }

    /// Geometry bindings of this context.
    pub fn geometry_system(&self) -> &GlGeometrySystem {
        &self.geometry
    }

    // ------------------------------------------------------------------
    // Programs
    // ------------------------------------------------------------------

    /// Compile and link a program. Attribute locations bound in `source`
    /// become the program's attribute table.
    pub fn create_program(&mut self, source: &ProgramSource) -> Result<GlProgram, GraphicsError> {
        let handle = self.shared.backend.create_program(source)?;
        let program = source
            .attribute_locations
            .iter()
            .fold(GlProgram::new(), |program, (name, location)| {
                program.with_attribute(name.clone(), *location)
            })
            .with_handle(handle);
        Ok(program)
    }

    /// Make `program` current unless it already is.
    ///
    /// Programs without a native handle only carry metadata and are ignored.
    pub fn use_program(&mut self, program: &GlProgram) {
        let Some(handle) = program.handle() else {
            return;
        };
        if self.active_program != Some(handle) {
            self.shared.backend.use_program(Some(handle));
            self.active_program = Some(handle);
        }
    }

    /// Delete a program created by this context.
    pub fn delete_program(&mut self, program: &GlProgram) {
        let Some(handle) = program.handle() else {
            return;
        };
        if self.active_program == Some(handle) {
            self.active_program = None;
        }
        self.shared.backend.delete_program(handle);
    }

    // ------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------

    /// Get the native handle of a buffer, uploading pending changes.
    pub fn ensure_buffer(&mut self, buffer: &Buffer) -> Result<BufferHandle, GraphicsError> {
        self.buffers.ensure(self.shared.backend.as_ref(), buffer)
    }

    /// Evict a buffer from this context only.
    ///
    /// Geometries using it turn stale and are regenerated on their next bind.
    pub fn release_buffer(&mut self, buffer: BufferId) {
        let backend = self.shared.backend.as_ref();
        self.buffers.dispose_buffer(backend, buffer, false);
        self.geometry
            .on_buffer_disposed(backend, &mut self.buffers, buffer);
    }

    /// Release a geometry's vertex arrays and buffer references.
    pub fn release_geometry(&mut self, geometry: GeometryId) {
        let backend = self.shared.backend.as_ref();
        self.geometry
            .dispose_geometry(backend, &mut self.buffers, geometry, false);
    }

    /// Release native handles of every destroyed object. Returns the number
    /// of events handled.
    pub fn flush_disposals(&mut self) -> usize {
        let events = self.shared.queue.drain();
        for event in &events {
            match *event {
                DisposeEvent::Buffer(id) => self.release_buffer(id),
                DisposeEvent::Geometry(id) => self.release_geometry(id),
            }
        }
        if !events.is_empty() {
            log::debug!("GlContext: handled {} dispose events", events.len());
        }
        events.len()
    }

    /// Drop every native record without deleting anything. The next binds
    /// recreate buffers and vertex arrays.
    pub fn context_lost(&mut self) {
        log::warn!("GlContext: {:?} ({:?}) lost", self.label, self.id);
        self.geometry.context_lost();
        self.buffers
            .dispose_all(self.shared.backend.as_ref(), true);
        self.active_program = None;
        self.shared.queue.drain();
    }

    /// Forget cached bindings after native state was changed behind the
    /// context's back. The bound geometry must be bound again before drawing.
    pub fn invalidate_bindings(&mut self) {
        self.geometry.invalidate();
        self.buffers.set_bound_array(None);
        self.active_program = None;
    }

    // ------------------------------------------------------------------
    // Binding and draws
    // ------------------------------------------------------------------

    /// Bind `geometry` for drawing with `program`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::MissingAttribute`] if the program reads an
    /// attribute the geometry does not declare.
    pub fn bind_geometry(&mut self, geometry: &mut Geometry, program: &GlProgram) -> Result<(), GraphicsError> {
        self.geometry
            .bind(&self.shared, &mut self.buffers, geometry, program)
    }

    /// Draw the bound geometry. See [`DrawRequest`] for the defaults.
    pub fn draw(
        &mut self,
        geometry: &Geometry,
        topology: Option<PrimitiveTopology>,
        size: Option<u32>,
        start: Option<u32>,
        instance_count: Option<u32>,
    ) -> Result<(), GraphicsError> {
        self.geometry.draw(
            &self.shared,
            &mut self.buffers,
            geometry,
            topology,
            size,
            start,
            instance_count,
        )
    }

    /// Instanced draw of the bound geometry starting at `base_instance`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_bi(
        &mut self,
        geometry: &Geometry,
        topology: Option<PrimitiveTopology>,
        size: Option<u32>,
        start: Option<u32>,
        instance_count: Option<u32>,
        base_instance: u32,
    ) -> Result<(), GraphicsError> {
        self.geometry.draw_bi(
            &self.shared,
            &mut self.buffers,
            geometry,
            topology,
            size,
            start,
            instance_count,
            base_instance,
        )
    }

    /// Draw every range of `multi` with the bound geometry.
    pub fn multi_draw(
        &mut self,
        geometry: &Geometry,
        multi: &MultiDrawBuffer,
        topology: Option<PrimitiveTopology>,
    ) -> Result<(), GraphicsError> {
        self.geometry
            .multi_draw(&self.shared, &mut self.buffers, geometry, multi, topology)
    }

    /// Use the program, bind the geometry and draw.
    pub fn draw_request(&mut self, request: DrawRequest<'_>) -> Result<(), GraphicsError> {
        self.use_program(request.program);
        self.bind_geometry(&mut *request.geometry, request.program)?;
        let geometry = &*request.geometry;
        match request.base_instance {
            Some(base_instance) => self.draw_bi(
                geometry,
                request.topology,
                request.size,
                request.start,
                request.instance_count,
                base_instance,
            ),
            None => self.draw(
                geometry,
                request.topology,
                request.size,
                request.start,
                request.instance_count,
            ),
        }
    }

    /// Use the program, bind the geometry and draw every range.
    pub fn multi_draw_request(&mut self, request: MultiDrawRequest<'_>) -> Result<(), GraphicsError> {
        self.use_program(request.program);
        self.bind_geometry(&mut *request.geometry, request.program)?;
        self.multi_draw(&*request.geometry, request.multi, request.topology)
    }
}

impl std::fmt::Debug for GlContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlContext")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("backend", &self.shared.backend.name())
            .field("capabilities", &self.shared.caps)
            .field("buffers", &self.buffers.len())
            .finish()
    }
}
