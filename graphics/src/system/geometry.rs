//! Vertex array caching, geometry binding and draw dispatch.
//!
//! Each geometry gets one record per context. A record caches vertex arrays by
//! signature, the ordered `name=location` list of the attributes a program
//! reads, so programs with identical attribute locations share a vertex array.
//!
//! A record holds one reference on every buffer of its geometry. When one of
//! those buffers is evicted the record turns stale and drops its references;
//! the next bind takes them again and regenerates the attribute bindings of
//! the most recently used vertex array in place, deleting the others.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use vellum_core::geometry::{Attribute, Geometry, IndexFormat, MultiDrawBuffer, PrimitiveTopology};
use vellum_core::resource::{BufferId, GeometryId};
use vellum_core::CoreError;

use crate::backend::{AttribPointer, BufferHandle, BufferTarget, DrawMode, GlBackend, VertexArrayHandle};
use crate::context::ContextShared;
use crate::error::GraphicsError;
use crate::shader::{GlProgram, ProgramAttribute, ProgramId};

use super::buffer::GlBufferSystem;
use super::instance_sync::{InstanceSyncProgram, SyncAttribute};

#[derive(Debug)]
struct VaoEntry {
    handle: VertexArrayHandle,
    locations: Vec<u32>,
    sync: Option<Arc<InstanceSyncProgram>>,
    base_instance: u32,
}

#[derive(Debug, Default)]
struct GeometryRecord {
    vaos: HashMap<Arc<str>, VaoEntry>,
    by_program: HashMap<ProgramId, Arc<str>>,
    last_signature: Option<Arc<str>>,
    buffer_ids: Vec<BufferId>,
    handles: Vec<BufferHandle>,
    holds_refs: bool,
    stale: bool,
    layout_version: Option<u64>,
}

#[derive(Debug, Clone)]
struct BoundGeometry {
    geometry: GeometryId,
    signature: Arc<str>,
}

enum Indexing {
    NonIndexed,
    Indexed(IndexFormat),
    Unsupported,
}

/// Geometry bindings of one context.
#[derive(Debug, Default)]
pub struct GlGeometrySystem {
    records: HashMap<GeometryId, GeometryRecord>,
    bound: Option<BoundGeometry>,
    active_vao: Option<VertexArrayHandle>,
    byte_offsets: Vec<u64>,
}

impl GlGeometrySystem {
    /// Create an empty system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Vertex array used for `geometry` with `program`, if one was built.
    pub fn vertex_array(&self, geometry: GeometryId, program: &GlProgram) -> Option<VertexArrayHandle> {
        let record = self.records.get(&geometry)?;
        let signature = record.by_program.get(&program.id())?;
        record.vaos.get(signature).map(|entry| entry.handle)
    }

    /// Number of cached vertex arrays for `geometry`.
    pub fn vertex_array_count(&self, geometry: GeometryId) -> usize {
        self.records
            .get(&geometry)
            .map_or(0, |record| record.vaos.len())
    }

    /// Whether the geometry's buffers were evicted since its last bind.
    pub fn is_stale(&self, geometry: GeometryId) -> Option<bool> {
        self.records.get(&geometry).map(|record| record.stale)
    }

    /// Check if `geometry` is the bound geometry.
    pub fn is_bound(&self, geometry: GeometryId) -> bool {
        self.bound
            .as_ref()
            .is_some_and(|bound| bound.geometry == geometry)
    }

    /// The vertex array last bound by this system.
    pub fn active_vertex_array(&self) -> Option<VertexArrayHandle> {
        self.active_vao
    }

    /// Sync program of the vertex array used for `geometry` with `program`.
    pub fn sync_program(
        &self,
        geometry: GeometryId,
        program: &GlProgram,
    ) -> Option<Arc<InstanceSyncProgram>> {
        let record = self.records.get(&geometry)?;
        let signature = record.by_program.get(&program.id())?;
        record.vaos.get(signature)?.sync.clone()
    }

    /// Bind `geometry` for drawing with `program`.
    pub(crate) fn bind(
        &mut self,
        shared: &ContextShared,
        buffers: &mut GlBufferSystem,
        geometry: &mut Geometry,
        program: &GlProgram,
    ) -> Result<(), GraphicsError> {
        geometry.check_attributes();
        check_compatibility(geometry, program)?;

        let mut record = match self.records.remove(&geometry.id()) {
            Some(record) => record,
            None => {
                geometry.subscribe(&shared.queue);
                GeometryRecord::default()
            }
        };
        let result = self.bind_record(shared, buffers, geometry, program, &mut record);
        self.records.insert(geometry.id(), record);
        result
    }

    fn bind_record(
        &mut self,
        shared: &ContextShared,
        buffers: &mut GlBufferSystem,
        geometry: &Geometry,
        program: &GlProgram,
        record: &mut GeometryRecord,
    ) -> Result<(), GraphicsError> {
        let backend = shared.backend.as_ref();

        let handles = geometry
            .buffers()
            .iter()
            .map(|buffer| buffers.ensure(backend, buffer))
            .collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<BufferId> = geometry.buffers().iter().map(|buffer| buffer.id()).collect();

        let mut regen = record.stale;
        if !record.holds_refs {
            for id in &ids {
                buffers.inc_ref(*id);
            }
            record.holds_refs = true;
        } else if record.buffer_ids != ids {
            for id in &ids {
                buffers.inc_ref(*id);
            }
            for id in &record.buffer_ids {
                buffers.dec_ref(backend, *id);
            }
        }
        if record.handles != handles && !record.vaos.is_empty() {
            regen = true;
        }
        record.buffer_ids = ids;
        record.handles = handles;
        record.stale = false;

        let layout_version = Some(geometry.layout_version());
        let layout_changed = record.layout_version != layout_version;
        record.layout_version = layout_version;
        if layout_changed && !record.vaos.is_empty() {
            log::debug!(
                "GlGeometrySystem: layout of {:?} changed, dropping {} vertex arrays",
                geometry.id(),
                record.vaos.len()
            );
            record.last_signature = None;
            self.drop_vaos(backend, record);
            regen = false;
        }

        let signature = match record.by_program.get(&program.id()) {
            Some(signature) if !regen => Arc::clone(signature),
            _ => Arc::from(signature_of(geometry, program)),
        };

        if regen {
            let kept = record
                .last_signature
                .take()
                .and_then(|last| record.vaos.remove(&last));
            self.drop_vaos(backend, record);
            if let Some(mut entry) = kept {
                log::trace!(
                    "GlGeometrySystem: regenerating {:?} for {:?} as {signature}",
                    entry.handle,
                    geometry.id()
                );
                self.bind_vao(backend, entry.handle);
                activate(shared, buffers, geometry, program, &record.handles, &mut entry, true);
                record.vaos.insert(Arc::clone(&signature), entry);
            }
        }

        let handle = match record.vaos.entry(Arc::clone(&signature)) {
            Entry::Occupied(entry) => entry.get().handle,
            Entry::Vacant(slot) => {
                let handle = backend.create_vertex_array()?;
                log::trace!(
                    "GlGeometrySystem: created {:?} for {:?} as {signature}",
                    handle,
                    geometry.id()
                );
                let mut entry = VaoEntry {
                    handle,
                    locations: Vec::new(),
                    sync: None,
                    base_instance: 0,
                };
                if self.active_vao != Some(handle) {
                    backend.bind_vertex_array(Some(handle));
                    self.active_vao = Some(handle);
                }
                activate(shared, buffers, geometry, program, &record.handles, &mut entry, false);
                slot.insert(entry);
                handle
            }
        };

        record.by_program.insert(program.id(), Arc::clone(&signature));
        record.last_signature = Some(Arc::clone(&signature));
        self.bind_vao(backend, handle);
        self.bound = Some(BoundGeometry {
            geometry: geometry.id(),
            signature,
        });
        Ok(())
    }

    fn bind_vao(&mut self, backend: &dyn GlBackend, handle: VertexArrayHandle) {
        if self.active_vao != Some(handle) {
            backend.bind_vertex_array(Some(handle));
            self.active_vao = Some(handle);
        }
    }

    fn drop_vaos(&mut self, backend: &dyn GlBackend, record: &mut GeometryRecord) {
        for (_, entry) in record.vaos.drain() {
            if self.active_vao == Some(entry.handle) {
                self.active_vao = None;
            }
            backend.delete_vertex_array(entry.handle);
        }
        record.by_program.clear();
    }

    fn check_draw(&self, shared: &ContextShared, geometry: &Geometry) -> Result<Indexing, GraphicsError> {
        if !self.is_bound(geometry.id()) {
            return Err(GraphicsError::GeometryNotBound);
        }
        if geometry.index_slot().is_none() {
            return Ok(Indexing::NonIndexed);
        }
        let format = geometry.index_format().ok_or_else(|| {
            CoreError::InvalidIndexBuffer(format!(
                "index buffer of {:?} holds no u16 or u32 data",
                geometry.label()
            ))
        })?;
        if format == IndexFormat::Uint32 && !shared.caps.uint32_indices {
            shared.warnings.warn(
                "uint32-indices",
                "32-bit index buffers are not supported by this context, skipping draws that use them",
            );
            return Ok(Indexing::Unsupported);
        }
        Ok(Indexing::Indexed(format))
    }

    fn check_instancing(shared: &ContextShared) -> bool {
        if !shared.caps.instancing {
            shared.warnings.warn(
                "instancing",
                "instanced draws are not supported by this context, skipping them",
            );
        }
        shared.caps.instancing
    }

    /// Re-point instance attributes of the bound vertex array at `base_instance`.
    fn sync_base_instance(&mut self, shared: &ContextShared, buffers: &mut GlBufferSystem, base_instance: u32) {
        let Some(bound) = &self.bound else {
            return;
        };
        let Some(record) = self.records.get_mut(&bound.geometry) else {
            return;
        };
        let Some(entry) = record.vaos.get_mut(&bound.signature) else {
            return;
        };
        if entry.base_instance == base_instance {
            return;
        }
        if let Some(sync) = &entry.sync {
            let last = sync.run(
                shared.backend.as_ref(),
                base_instance,
                &record.handles,
                buffers.bound_array(),
            );
            buffers.set_bound_array(last);
        }
        entry.base_instance = base_instance;
    }

    /// Draw the bound geometry.
    ///
    /// `size` defaults to the index count, or to [`Geometry::get_size`] for
    /// non-indexed geometry. `instance_count` defaults to the geometry's.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn draw(
        &mut self,
        shared: &ContextShared,
        buffers: &mut GlBufferSystem,
        geometry: &Geometry,
        topology: Option<PrimitiveTopology>,
        size: Option<u32>,
        start: Option<u32>,
        instance_count: Option<u32>,
    ) -> Result<(), GraphicsError> {
        let index_format = match self.check_draw(shared, geometry)? {
            Indexing::Unsupported => return Ok(()),
            Indexing::Indexed(format) => Some(format),
            Indexing::NonIndexed => None,
        };
        let mode = DrawMode::from(topology.unwrap_or(geometry.topology()));
        let size = size.unwrap_or_else(|| default_size(geometry));
        let start = start.unwrap_or(0);
        let backend = shared.backend.as_ref();

        if !geometry.instanced() {
            match index_format {
                Some(format) => {
                    backend.draw_elements(mode, size, format, byte_offset(start, format));
                }
                None => backend.draw_arrays(mode, start, size),
            }
            return Ok(());
        }

        if !Self::check_instancing(shared) {
            return Ok(());
        }
        let instance_count = instance_count.unwrap_or(geometry.instance_count());
        self.sync_base_instance(shared, buffers, 0);
        draw_instanced(backend, mode, index_format, start, size, instance_count);
        Ok(())
    }

    /// Instanced draw starting at `base_instance`.
    ///
    /// Uses the native base-instance call when available. Otherwise the
    /// instance attributes are re-pointed (only when the base changed) and a
    /// regular instanced draw is issued.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn draw_bi(
        &mut self,
        shared: &ContextShared,
        buffers: &mut GlBufferSystem,
        geometry: &Geometry,
        topology: Option<PrimitiveTopology>,
        size: Option<u32>,
        start: Option<u32>,
        instance_count: Option<u32>,
        base_instance: u32,
    ) -> Result<(), GraphicsError> {
        let index_format = match self.check_draw(shared, geometry)? {
            Indexing::Unsupported => return Ok(()),
            Indexing::Indexed(format) => Some(format),
            Indexing::NonIndexed => None,
        };
        if !Self::check_instancing(shared) {
            return Ok(());
        }
        let mode = DrawMode::from(topology.unwrap_or(geometry.topology()));
        let size = size.unwrap_or_else(|| default_size(geometry));
        let start = start.unwrap_or(0);
        let instance_count = instance_count.unwrap_or(geometry.instance_count());
        let backend = shared.backend.as_ref();

        if shared.caps.base_instance {
            draw_base_instance(backend, mode, index_format, start, size, instance_count, base_instance);
        } else {
            self.sync_base_instance(shared, buffers, base_instance);
            draw_instanced(backend, mode, index_format, start, size, instance_count);
        }
        Ok(())
    }

    /// Draw every range of `multi` with the bound geometry.
    ///
    /// Offsets are in indices for indexed geometry, vertices otherwise.
    pub(crate) fn multi_draw(
        &mut self,
        shared: &ContextShared,
        buffers: &mut GlBufferSystem,
        geometry: &Geometry,
        multi: &MultiDrawBuffer,
        topology: Option<PrimitiveTopology>,
    ) -> Result<(), GraphicsError> {
        let index_format = match self.check_draw(shared, geometry)? {
            Indexing::Unsupported => return Ok(()),
            Indexing::Indexed(format) => Some(format),
            Indexing::NonIndexed => None,
        };
        if multi.is_empty() || !Self::check_instancing(shared) {
            return Ok(());
        }
        let mode = DrawMode::from(topology.unwrap_or(geometry.topology()));
        let backend = shared.backend.as_ref();

        if shared.caps.multi_draw_base_instance {
            match index_format {
                Some(format) => {
                    self.byte_offsets.clear();
                    self.byte_offsets
                        .extend(multi.offsets().iter().map(|&offset| byte_offset(offset, format)));
                    backend.multi_draw_elements_instanced_base_instance(
                        mode,
                        multi.counts(),
                        format,
                        &self.byte_offsets,
                        multi.instance_counts(),
                        multi.base_instances(),
                    );
                }
                None => backend.multi_draw_arrays_instanced_base_instance(
                    mode,
                    multi.offsets(),
                    multi.counts(),
                    multi.instance_counts(),
                    multi.base_instances(),
                ),
            }
            return Ok(());
        }

        for range in multi.ranges() {
            if shared.caps.base_instance {
                draw_base_instance(
                    backend,
                    mode,
                    index_format,
                    range.offset,
                    range.count,
                    range.instance_count,
                    range.base_instance,
                );
            } else {
                self.sync_base_instance(shared, buffers, range.base_instance);
                draw_instanced(
                    backend,
                    mode,
                    index_format,
                    range.offset,
                    range.count,
                    range.instance_count,
                );
            }
        }
        Ok(())
    }

    /// Forget a geometry. Unless the context was lost, its vertex arrays are
    /// deleted and its buffer references released.
    pub(crate) fn dispose_geometry(
        &mut self,
        backend: &dyn GlBackend,
        buffers: &mut GlBufferSystem,
        geometry: GeometryId,
        context_lost: bool,
    ) -> bool {
        let Some(mut record) = self.records.remove(&geometry) else {
            return false;
        };
        if self.is_bound(geometry) {
            self.bound = None;
        }
        for (_, entry) in record.vaos.drain() {
            if self.active_vao == Some(entry.handle) {
                self.active_vao = None;
            }
            if !context_lost {
                backend.delete_vertex_array(entry.handle);
            }
        }
        if !context_lost && record.holds_refs {
            for id in &record.buffer_ids {
                buffers.dec_ref(backend, *id);
            }
        }
        log::trace!("GlGeometrySystem: released {geometry:?}");
        true
    }

    /// Mark every geometry using `buffer` stale and drop its buffer references.
    pub(crate) fn on_buffer_disposed(
        &mut self,
        backend: &dyn GlBackend,
        buffers: &mut GlBufferSystem,
        buffer: BufferId,
    ) {
        for (geometry, record) in self.records.iter_mut() {
            if !record.buffer_ids.contains(&buffer) {
                continue;
            }
            record.stale = true;
            if record.holds_refs {
                for id in record.buffer_ids.iter().filter(|id| **id != buffer) {
                    buffers.dec_ref(backend, *id);
                }
                record.holds_refs = false;
            }
            if self
                .bound
                .as_ref()
                .is_some_and(|bound| bound.geometry == *geometry)
            {
                self.bound = None;
            }
            log::debug!("GlGeometrySystem: {geometry:?} is stale after {buffer:?} was evicted");
        }
    }

    /// Drop every record without native deletes.
    pub(crate) fn context_lost(&mut self) {
        self.records.clear();
        self.bound = None;
        self.active_vao = None;
    }

    /// Forget the cached vertex array binding after foreign state changes.
    pub(crate) fn invalidate(&mut self) {
        self.bound = None;
        self.active_vao = None;
    }
}

fn attribute_location(attribute: &Attribute, program: Option<&ProgramAttribute>) -> Option<u32> {
    attribute
        .location
        .or_else(|| program.map(|attr| attr.location))
}

/// Ordered `name=location` list of the attributes `program` reads.
fn signature_of(geometry: &Geometry, program: &GlProgram) -> String {
    let mut signature = String::new();
    for (name, attr) in geometry.layout().iter() {
        if let Some(location) = attribute_location(attr, program.attribute(name)) {
            let _ = write!(signature, "{name}={location};");
        }
    }
    signature
}

fn check_compatibility(geometry: &Geometry, program: &GlProgram) -> Result<(), GraphicsError> {
    for (name, _) in program.attributes() {
        if !geometry.has_attribute(name) {
            return Err(GraphicsError::MissingAttribute {
                attribute: name.to_string(),
                geometry: geometry.label().map(str::to_string),
            });
        }
    }
    Ok(())
}

/// Record the attribute pointers of `geometry` into the bound vertex array.
fn activate(
    shared: &ContextShared,
    buffers: &mut GlBufferSystem,
    geometry: &Geometry,
    program: &GlProgram,
    handles: &[BufferHandle],
    entry: &mut VaoEntry,
    regen: bool,
) {
    let backend = shared.backend.as_ref();
    let mut locations = Vec::new();
    let mut instance_attributes = Vec::new();

    for (name, attr) in geometry.layout().iter() {
        let Some(location) = attribute_location(attr, program.attribute(name)) else {
            continue;
        };
        let Some(&handle) = handles.get(attr.buffer_index) else {
            log::error!("GlGeometrySystem: attribute {name:?} reads missing buffer slot {}", attr.buffer_index);
            continue;
        };

        buffers.bind_array(backend, handle);
        backend.enable_vertex_attrib_array(location);
        let pointer = AttribPointer::new(attr.format, attr.stride(), attr.offset() as u64);
        if attr.format.is_integer() {
            backend.vertex_attrib_ipointer(location, &pointer);
        } else {
            backend.vertex_attrib_pointer(location, &pointer);
        }

        if attr.instance {
            if shared.caps.instancing {
                backend.vertex_attrib_divisor(location, 1);
                instance_attributes.push(SyncAttribute {
                    slot: attr.buffer_index,
                    format: attr.format,
                    stride: match attr.stride() {
                        0 => attr.format.size(),
                        stride => stride,
                    },
                    offset: attr.offset(),
                    location,
                });
            } else {
                shared.warnings.warn(
                    "instance-attributes",
                    "instance-rate attributes are not supported by this context",
                );
            }
        } else if regen {
            backend.vertex_attrib_divisor(location, 0);
        }
        locations.push(location);
    }

    if regen {
        for location in entry.locations.iter().filter(|l| !locations.contains(l)) {
            backend.disable_vertex_attrib_array(*location);
        }
    }

    match geometry.index_slot().and_then(|slot| handles.get(slot)) {
        Some(&handle) => backend.bind_buffer(BufferTarget::ElementArray, Some(handle)),
        None if regen => backend.bind_buffer(BufferTarget::ElementArray, None),
        None => {}
    }

    entry.locations = locations;
    entry.base_instance = 0;
    entry.sync = if instance_attributes.is_empty() {
        None
    } else {
        Some(InstanceSyncProgram::get_or_compile(&instance_attributes))
    };
}

fn default_size(geometry: &Geometry) -> u32 {
    geometry
        .index_count()
        .unwrap_or_else(|| geometry.get_size())
}

fn byte_offset(start: u32, format: IndexFormat) -> u64 {
    start as u64 * format.size() as u64
}

fn draw_instanced(
    backend: &dyn GlBackend,
    mode: DrawMode,
    index_format: Option<IndexFormat>,
    start: u32,
    size: u32,
    instance_count: u32,
) {
    match index_format {
        Some(format) => backend.draw_elements_instanced(
            mode,
            size,
            format,
            byte_offset(start, format),
            instance_count,
        ),
        None => backend.draw_arrays_instanced(mode, start, size, instance_count),
    }
}

fn draw_base_instance(
    backend: &dyn GlBackend,
    mode: DrawMode,
    index_format: Option<IndexFormat>,
    start: u32,
    size: u32,
    instance_count: u32,
    base_instance: u32,
) {
    match index_format {
        Some(format) => backend.draw_elements_instanced_base_instance(
            mode,
            size,
            format,
            byte_offset(start, format),
            instance_count,
            base_instance,
        ),
        None => backend.draw_arrays_instanced_base_instance(
            mode,
            start,
            size,
            instance_count,
            base_instance,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::geometry::{GeometryDescriptor, VertexFormat};

    fn quad() -> Geometry {
        Geometry::new(
            GeometryDescriptor::new()
                .with_label("quad")
                .with_vertex_buffer(vec![0.0f32; 16])
                .with_attribute("aPosition", VertexFormat::Float32x2)
                .with_attribute("aUV", VertexFormat::Float32x2),
        )
        .unwrap()
    }

    #[test]
    fn test_signature_follows_declaration_order() {
        let geometry = quad();
        let program = GlProgram::new()
            .with_attribute("aUV", 3)
            .with_attribute("aPosition", 1);
        assert_eq!(signature_of(&geometry, &program), "aPosition=1;aUV=3;");
    }

    #[test]
    fn test_signature_skips_unused_attributes() {
        let geometry = quad();
        let program = GlProgram::new().with_attribute("aPosition", 0);
        assert_eq!(signature_of(&geometry, &program), "aPosition=0;");
    }

    #[test]
    fn test_compatibility_names_missing_attribute() {
        let geometry = quad();
        let program = GlProgram::new()
            .with_attribute("aPosition", 0)
            .with_attribute("aColor", 1);
        let err = check_compatibility(&geometry, &program).unwrap_err();
        assert_eq!(
            err,
            GraphicsError::MissingAttribute {
                attribute: "aColor".to_string(),
                geometry: Some("quad".to_string()),
            }
        );
    }
}
