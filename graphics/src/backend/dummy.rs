//! Dummy GL backend for testing and development.
//!
//! This backend doesn't talk to a GPU. It records every native call and
//! simulates the parts of GL state the binding core depends on: buffer
//! memory, vertex array attribute state, buffer-to-buffer copies and
//! transform feedback capture of pass-through vertex stages. Tests assert on
//! the recorded call sequence and on the resulting buffer bytes.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use vellum_core::geometry::IndexFormat;

use crate::error::GraphicsError;

use super::{
    AttribPointer, BufferHandle, BufferTarget, Capabilities, DrawMode, GlBackend, ProgramHandle,
    ProgramSource, TransformFeedbackHandle, UsageHint, VertexArrayHandle,
};

/// A recorded native call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlCommand {
    /// `createBuffer`
    CreateBuffer(BufferHandle),
    /// `deleteBuffer`
    DeleteBuffer(BufferHandle),
    /// `bindBuffer`
    BindBuffer(BufferTarget, Option<BufferHandle>),
    /// `bufferData` with contents.
    BufferData {
        /// Binding point.
        target: BufferTarget,
        /// Bytes uploaded.
        size: u64,
    },
    /// `bufferData` with a size only.
    AllocateBuffer {
        /// Binding point.
        target: BufferTarget,
        /// Bytes allocated.
        size: u64,
    },
    /// `bufferSubData`
    BufferSubData {
        /// Binding point.
        target: BufferTarget,
        /// Byte offset.
        offset: u64,
        /// Bytes uploaded.
        size: u64,
    },
    /// `bindBufferRange`
    BindBufferRange {
        /// Binding point.
        target: BufferTarget,
        /// Binding index.
        index: u32,
        /// Buffer.
        buffer: Option<BufferHandle>,
        /// Byte offset.
        offset: u64,
        /// Byte size.
        size: u64,
    },
    /// `copyBufferSubData`
    CopyBufferSubData {
        /// Source byte offset.
        read_offset: u64,
        /// Destination byte offset.
        write_offset: u64,
        /// Bytes copied.
        size: u64,
    },
    /// `createVertexArray`
    CreateVertexArray(VertexArrayHandle),
    /// `deleteVertexArray`
    DeleteVertexArray(VertexArrayHandle),
    /// `bindVertexArray`
    BindVertexArray(Option<VertexArrayHandle>),
    /// `enableVertexAttribArray`
    EnableAttrib(u32),
    /// `disableVertexAttribArray`
    DisableAttrib(u32),
    /// `vertexAttribPointer` or `vertexAttribIPointer`
    AttribPointer {
        /// Attribute location.
        location: u32,
        /// Pointer arguments.
        pointer: AttribPointer,
        /// Issued through the integer entry point.
        integer: bool,
    },
    /// `vertexAttribDivisor`
    AttribDivisor {
        /// Attribute location.
        location: u32,
        /// Divisor.
        divisor: u32,
    },
    /// Any draw call.
    Draw(DrawCall),
    /// `createProgram` + link
    CreateProgram(ProgramHandle),
    /// `useProgram`
    UseProgram(Option<ProgramHandle>),
    /// `deleteProgram`
    DeleteProgram(ProgramHandle),
    /// `createTransformFeedback`
    CreateTransformFeedback(TransformFeedbackHandle),
    /// `deleteTransformFeedback`
    DeleteTransformFeedback(TransformFeedbackHandle),
    /// `bindTransformFeedback`
    BindTransformFeedback(Option<TransformFeedbackHandle>),
    /// `beginTransformFeedback`
    BeginTransformFeedback(DrawMode),
    /// `endTransformFeedback`
    EndTransformFeedback,
    /// `enable/disable(RASTERIZER_DISCARD)`
    RasterizerDiscard(bool),
}

/// Attribute state captured at draw time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAttribute {
    /// Attribute location.
    pub location: u32,
    /// Array buffer the pointer was recorded against.
    pub buffer: Option<BufferHandle>,
    /// Pointer arguments.
    pub pointer: AttribPointer,
    /// Set through the integer entry point.
    pub integer: bool,
    /// Instance divisor.
    pub divisor: u32,
}

/// A draw call with a snapshot of the vertex state it read.
///
/// Multi-draw calls are recorded as one `DrawCall` per range with `multi` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    /// Primitive mode.
    pub mode: DrawMode,
    /// First vertex, or first index for indexed draws.
    pub first: u32,
    /// Vertex or index count.
    pub count: u32,
    /// Index format for indexed draws.
    pub index_format: Option<IndexFormat>,
    /// Instance count for instanced draws.
    pub instance_count: Option<u32>,
    /// Native base instance, if the call carried one.
    pub base_instance: Option<u32>,
    /// Part of a native multi-draw.
    pub multi: bool,
    /// Bound vertex array.
    pub vao: Option<VertexArrayHandle>,
    /// Current program.
    pub program: Option<ProgramHandle>,
    /// Enabled attributes, by location.
    pub attributes: Vec<BoundAttribute>,
    /// Bound element buffer.
    pub element_buffer: Option<BufferHandle>,
}

impl DrawCall {
    /// Check if this draw is indexed.
    pub fn is_indexed(&self) -> bool {
        self.index_format.is_some()
    }

    /// Check if this draw is instanced.
    pub fn is_instanced(&self) -> bool {
        self.instance_count.is_some()
    }

    /// Get the attribute bound at `location`.
    pub fn attribute(&self, location: u32) -> Option<&BoundAttribute> {
        self.attributes.iter().find(|attr| attr.location == location)
    }

    /// Byte offset of the first instance's value for the attribute at
    /// `location`, after applying the native base instance.
    pub fn instance_start(&self, location: u32) -> Option<u64> {
        let attr = self.attribute(location)?;
        let base = self.base_instance.unwrap_or(0) as u64;
        Some(attr.pointer.offset + base * attr.pointer.stride as u64)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct AttribState {
    enabled: bool,
    buffer: Option<BufferHandle>,
    pointer: Option<AttribPointer>,
    integer: bool,
    divisor: u32,
}

#[derive(Debug, Clone, Default)]
struct VaoState {
    attributes: BTreeMap<u32, AttribState>,
    element_buffer: Option<BufferHandle>,
}

#[derive(Debug, Clone, Default)]
struct FeedbackState {
    ranges: HashMap<u32, (BufferHandle, u64, u64)>,
}

#[derive(Debug, Default)]
struct DummyState {
    next_handle: u32,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    bindings: HashMap<BufferTarget, BufferHandle>,
    vaos: HashMap<VertexArrayHandle, VaoState>,
    default_vao: VaoState,
    current_vao: Option<VertexArrayHandle>,
    programs: HashMap<ProgramHandle, ProgramSource>,
    current_program: Option<ProgramHandle>,
    feedbacks: HashMap<TransformFeedbackHandle, FeedbackState>,
    default_feedback: FeedbackState,
    current_feedback: Option<TransformFeedbackHandle>,
    capturing: Option<DrawMode>,
    rasterizer_discard: bool,
    commands: Vec<GlCommand>,
}

impl DummyState {
    fn next_handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn vao(&self) -> &VaoState {
        self.current_vao
            .and_then(|vao| self.vaos.get(&vao))
            .unwrap_or(&self.default_vao)
    }

    fn vao_mut(&mut self) -> &mut VaoState {
        match self.current_vao.and_then(|vao| self.vaos.get_mut(&vao)) {
            Some(state) => state,
            None => &mut self.default_vao,
        }
    }

    fn feedback_mut(&mut self) -> &mut FeedbackState {
        match self
            .current_feedback
            .and_then(|feedback| self.feedbacks.get_mut(&feedback))
        {
            Some(state) => state,
            None => &mut self.default_feedback,
        }
    }

    fn feedback(&self) -> &FeedbackState {
        self.current_feedback
            .and_then(|feedback| self.feedbacks.get(&feedback))
            .unwrap_or(&self.default_feedback)
    }

    fn bound(&self, target: BufferTarget) -> Option<BufferHandle> {
        match target {
            BufferTarget::ElementArray => self.vao().element_buffer,
            _ => self.bindings.get(&target).copied(),
        }
    }

    fn bound_storage(&mut self, target: BufferTarget) -> Option<&mut Vec<u8>> {
        let handle = self.bound(target);
        match handle {
            Some(handle) => self.buffers.get_mut(&handle),
            None => {
                log::error!("DummyBackend: no buffer bound to {target:?}");
                None
            }
        }
    }

    fn attribute_mut(&mut self, location: u32) -> &mut AttribState {
        self.vao_mut().attributes.entry(location).or_default()
    }

    fn set_pointer(&mut self, location: u32, pointer: &AttribPointer, integer: bool) {
        let buffer = self.bound(BufferTarget::Array);
        let attr = self.attribute_mut(location);
        attr.buffer = buffer;
        attr.pointer = Some(*pointer);
        attr.integer = integer;
        self.commands.push(GlCommand::AttribPointer {
            location,
            pointer: *pointer,
            integer,
        });
    }

    fn snapshot_draw(
        &self,
        mode: DrawMode,
        first: u32,
        count: u32,
        index_format: Option<IndexFormat>,
        instance_count: Option<u32>,
        base_instance: Option<u32>,
    ) -> DrawCall {
        let vao = self.vao();
        let attributes = vao
            .attributes
            .iter()
            .filter(|(_, attr)| attr.enabled)
            .filter_map(|(location, attr)| {
                attr.pointer.map(|pointer| BoundAttribute {
                    location: *location,
                    buffer: attr.buffer,
                    pointer,
                    integer: attr.integer,
                    divisor: attr.divisor,
                })
            })
            .collect();

        DrawCall {
            mode,
            first,
            count,
            index_format,
            instance_count,
            base_instance,
            multi: false,
            vao: self.current_vao,
            program: self.current_program,
            attributes,
            element_buffer: vao.element_buffer,
        }
    }

    fn record_draw(&mut self, draw: DrawCall) {
        if self.capturing.is_some() && draw.index_format.is_none() {
            self.capture(&draw);
        }
        self.commands.push(GlCommand::Draw(draw));
    }

    /// Pass-through capture: every enabled attribute value is written out, in
    /// location order, interleaved per vertex.
    fn capture(&mut self, draw: &DrawCall) {
        let Some((buffer, offset, size)) = self.feedback().ranges.get(&0).copied() else {
            log::error!("DummyBackend: transform feedback active without a bound range");
            return;
        };

        let mut captured = Vec::new();
        for vertex in draw.first..draw.first + draw.count {
            for attr in &draw.attributes {
                let Some(source) = attr.buffer.and_then(|b| self.buffers.get(&b)) else {
                    continue;
                };
                let start = (attr.pointer.offset + vertex as u64 * attr.pointer.stride as u64) as usize;
                let end = start + attr.pointer.value_size() as usize;
                match source.get(start..end) {
                    Some(bytes) => captured.extend_from_slice(bytes),
                    None => captured.extend(std::iter::repeat(0).take(end - start)),
                }
            }
        }
        captured.truncate(size as usize);

        if let Some(target) = self.buffers.get_mut(&buffer) {
            let start = offset as usize;
            let end = (start + captured.len()).min(target.len());
            if start < end {
                target[start..end].copy_from_slice(&captured[..end - start]);
            }
        }
    }
}

/// Dummy GL backend.
#[derive(Debug)]
pub struct DummyBackend {
    caps: Capabilities,
    state: Mutex<DummyState>,
}

impl DummyBackend {
    /// Create a dummy backend with every optional capability.
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::all())
    }

    /// Create a dummy backend advertising `caps`.
    pub fn with_capabilities(caps: Capabilities) -> Self {
        Self {
            caps,
            state: Mutex::new(DummyState::default()),
        }
    }

    /// Every call recorded so far.
    pub fn commands(&self) -> Vec<GlCommand> {
        self.state.lock().commands.clone()
    }

    /// Forget recorded calls, keeping simulated state.
    pub fn clear_commands(&self) {
        self.state.lock().commands.clear();
    }

    /// Count recorded calls matching `predicate`.
    pub fn count_commands(&self, predicate: impl Fn(&GlCommand) -> bool) -> usize {
        self.state
            .lock()
            .commands
            .iter()
            .filter(|command| predicate(command))
            .count()
    }

    /// Every draw recorded so far.
    pub fn draws(&self) -> Vec<DrawCall> {
        self.state
            .lock()
            .commands
            .iter()
            .filter_map(|command| match command {
                GlCommand::Draw(draw) => Some(draw.clone()),
                _ => None,
            })
            .collect()
    }

    /// Simulated contents of a buffer.
    pub fn buffer_bytes(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.state.lock().buffers.get(&buffer).cloned()
    }

    /// Number of live buffer objects.
    pub fn live_buffers(&self) -> usize {
        self.state.lock().buffers.len()
    }

    /// Number of live vertex array objects.
    pub fn live_vertex_arrays(&self) -> usize {
        self.state.lock().vaos.len()
    }

    /// Attribute state of a vertex array at `location`.
    pub fn vao_attribute(&self, vao: VertexArrayHandle, location: u32) -> Option<BoundAttribute> {
        let state = self.state.lock();
        let attr = state.vaos.get(&vao)?.attributes.get(&location)?;
        let pointer = attr.pointer?;
        Some(BoundAttribute {
            location,
            buffer: attr.buffer,
            pointer,
            integer: attr.integer,
            divisor: attr.divisor,
        })
    }

    /// Source of a linked program.
    pub fn program_source(&self, program: ProgramHandle) -> Option<ProgramSource> {
        self.state.lock().programs.get(&program).cloned()
    }

    /// Whether rasterization is currently discarded.
    pub fn rasterizer_discard(&self) -> bool {
        self.state.lock().rasterizer_discard
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GlBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn create_buffer(&self) -> Result<BufferHandle, GraphicsError> {
        let mut state = self.state.lock();
        let handle = BufferHandle(state.next_handle());
        state.buffers.insert(handle, Vec::new());
        state.commands.push(GlCommand::CreateBuffer(handle));
        log::trace!("DummyBackend: creating buffer {handle:?}");
        Ok(handle)
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        let mut state = self.state.lock();
        state.buffers.remove(&buffer);
        state.bindings.retain(|_, bound| *bound != buffer);
        state.commands.push(GlCommand::DeleteBuffer(buffer));
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<BufferHandle>) {
        let mut state = self.state.lock();
        match target {
            BufferTarget::ElementArray => state.vao_mut().element_buffer = buffer,
            _ => match buffer {
                Some(buffer) => {
                    state.bindings.insert(target, buffer);
                }
                None => {
                    state.bindings.remove(&target);
                }
            },
        }
        state.commands.push(GlCommand::BindBuffer(target, buffer));
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], _hint: UsageHint) {
        let mut state = self.state.lock();
        if let Some(storage) = state.bound_storage(target) {
            *storage = data.to_vec();
        }
        state.commands.push(GlCommand::BufferData {
            target,
            size: data.len() as u64,
        });
    }

    fn allocate_buffer(&self, target: BufferTarget, size: u64, _hint: UsageHint) {
        let mut state = self.state.lock();
        if let Some(storage) = state.bound_storage(target) {
            *storage = vec![0; size as usize];
        }
        state.commands.push(GlCommand::AllocateBuffer { target, size });
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: u64, data: &[u8]) {
        let mut state = self.state.lock();
        if let Some(storage) = state.bound_storage(target) {
            let start = offset as usize;
            match storage.get_mut(start..start + data.len()) {
                Some(range) => range.copy_from_slice(data),
                None => log::error!("DummyBackend: bufferSubData out of range"),
            }
        }
        state.commands.push(GlCommand::BufferSubData {
            target,
            offset,
            size: data.len() as u64,
        });
    }

    fn bind_buffer_range(
        &self,
        target: BufferTarget,
        index: u32,
        buffer: Option<BufferHandle>,
        offset: u64,
        size: u64,
    ) {
        let mut state = self.state.lock();
        if target == BufferTarget::TransformFeedback {
            let feedback = state.feedback_mut();
            match buffer {
                Some(buffer) => {
                    feedback.ranges.insert(index, (buffer, offset, size));
                }
                None => {
                    feedback.ranges.remove(&index);
                }
            }
        }
        match buffer {
            Some(buffer) => {
                state.bindings.insert(target, buffer);
            }
            None => {
                state.bindings.remove(&target);
            }
        }
        state.commands.push(GlCommand::BindBufferRange {
            target,
            index,
            buffer,
            offset,
            size,
        });
    }

    fn copy_buffer_sub_data(
        &self,
        read: BufferTarget,
        write: BufferTarget,
        read_offset: u64,
        write_offset: u64,
        size: u64,
    ) {
        let mut state = self.state.lock();
        let source = state
            .bound(read)
            .and_then(|handle| state.buffers.get(&handle))
            .and_then(|bytes| {
                bytes
                    .get(read_offset as usize..(read_offset + size) as usize)
                    .map(<[u8]>::to_vec)
            });
        match (source, state.bound_storage(write)) {
            (Some(bytes), Some(target)) => {
                let start = write_offset as usize;
                match target.get_mut(start..start + bytes.len()) {
                    Some(range) => range.copy_from_slice(&bytes),
                    None => log::error!("DummyBackend: copyBufferSubData write out of range"),
                }
            }
            _ => log::error!("DummyBackend: copyBufferSubData read out of range"),
        }
        state.commands.push(GlCommand::CopyBufferSubData {
            read_offset,
            write_offset,
            size,
        });
    }

    fn create_vertex_array(&self) -> Result<VertexArrayHandle, GraphicsError> {
        let mut state = self.state.lock();
        let handle = VertexArrayHandle(state.next_handle());
        state.vaos.insert(handle, VaoState::default());
        state.commands.push(GlCommand::CreateVertexArray(handle));
        log::trace!("DummyBackend: creating vertex array {handle:?}");
        Ok(handle)
    }

    fn delete_vertex_array(&self, vao: VertexArrayHandle) {
        let mut state = self.state.lock();
        state.vaos.remove(&vao);
        if state.current_vao == Some(vao) {
            state.current_vao = None;
        }
        state.commands.push(GlCommand::DeleteVertexArray(vao));
    }

    fn bind_vertex_array(&self, vao: Option<VertexArrayHandle>) {
        let mut state = self.state.lock();
        state.current_vao = vao;
        state.commands.push(GlCommand::BindVertexArray(vao));
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        let mut state = self.state.lock();
        state.attribute_mut(location).enabled = true;
        state.commands.push(GlCommand::EnableAttrib(location));
    }

    fn disable_vertex_attrib_array(&self, location: u32) {
        let mut state = self.state.lock();
        state.attribute_mut(location).enabled = false;
        state.commands.push(GlCommand::DisableAttrib(location));
    }

    fn vertex_attrib_pointer(&self, location: u32, pointer: &AttribPointer) {
        self.state.lock().set_pointer(location, pointer, false);
    }

    fn vertex_attrib_ipointer(&self, location: u32, pointer: &AttribPointer) {
        self.state.lock().set_pointer(location, pointer, true);
    }

    fn vertex_attrib_divisor(&self, location: u32, divisor: u32) {
        let mut state = self.state.lock();
        state.attribute_mut(location).divisor = divisor;
        state
            .commands
            .push(GlCommand::AttribDivisor { location, divisor });
    }

    fn draw_arrays(&self, mode: DrawMode, first: u32, count: u32) {
        let mut state = self.state.lock();
        let draw = state.snapshot_draw(mode, first, count, None, None, None);
        state.record_draw(draw);
    }

    fn draw_arrays_instanced(&self, mode: DrawMode, first: u32, count: u32, instance_count: u32) {
        let mut state = self.state.lock();
        let draw = state.snapshot_draw(mode, first, count, None, Some(instance_count), None);
        state.record_draw(draw);
    }

    fn draw_elements(&self, mode: DrawMode, count: u32, format: IndexFormat, byte_offset: u64) {
        let mut state = self.state.lock();
        let first = (byte_offset / format.size() as u64) as u32;
        let draw = state.snapshot_draw(mode, first, count, Some(format), None, None);
        state.record_draw(draw);
    }

    fn draw_elements_instanced(
        &self,
        mode: DrawMode,
        count: u32,
        format: IndexFormat,
        byte_offset: u64,
        instance_count: u32,
    ) {
        let mut state = self.state.lock();
        let first = (byte_offset / format.size() as u64) as u32;
        let draw = state.snapshot_draw(mode, first, count, Some(format), Some(instance_count), None);
        state.record_draw(draw);
    }

    fn draw_arrays_instanced_base_instance(
        &self,
        mode: DrawMode,
        first: u32,
        count: u32,
        instance_count: u32,
        base_instance: u32,
    ) {
        let mut state = self.state.lock();
        let draw = state.snapshot_draw(
            mode,
            first,
            count,
            None,
            Some(instance_count),
            Some(base_instance),
        );
        state.record_draw(draw);
    }

    fn draw_elements_instanced_base_instance(
        &self,
        mode: DrawMode,
        count: u32,
        format: IndexFormat,
        byte_offset: u64,
        instance_count: u32,
        base_instance: u32,
    ) {
        let mut state = self.state.lock();
        let first = (byte_offset / format.size() as u64) as u32;
        let draw = state.snapshot_draw(
            mode,
            first,
            count,
            Some(format),
            Some(instance_count),
            Some(base_instance),
        );
        state.record_draw(draw);
    }

    fn multi_draw_arrays_instanced_base_instance(
        &self,
        mode: DrawMode,
        firsts: &[u32],
        counts: &[u32],
        instance_counts: &[u32],
        base_instances: &[u32],
    ) {
        let mut state = self.state.lock();
        for i in 0..firsts.len() {
            let mut draw = state.snapshot_draw(
                mode,
                firsts[i],
                counts[i],
                None,
                Some(instance_counts[i]),
                Some(base_instances[i]),
            );
            draw.multi = true;
            state.record_draw(draw);
        }
    }

    fn multi_draw_elements_instanced_base_instance(
        &self,
        mode: DrawMode,
        counts: &[u32],
        format: IndexFormat,
        byte_offsets: &[u64],
        instance_counts: &[u32],
        base_instances: &[u32],
    ) {
        let mut state = self.state.lock();
        for i in 0..counts.len() {
            let first = (byte_offsets[i] / format.size() as u64) as u32;
            let mut draw = state.snapshot_draw(
                mode,
                first,
                counts[i],
                Some(format),
                Some(instance_counts[i]),
                Some(base_instances[i]),
            );
            draw.multi = true;
            state.record_draw(draw);
        }
    }

    fn create_program(&self, source: &ProgramSource) -> Result<ProgramHandle, GraphicsError> {
        if source.vertex.trim().is_empty() {
            return Err(GraphicsError::ShaderCompilationFailed(
                "empty vertex stage".to_string(),
            ));
        }
        let mut state = self.state.lock();
        let handle = ProgramHandle(state.next_handle());
        state.programs.insert(handle, source.clone());
        state.commands.push(GlCommand::CreateProgram(handle));
        log::trace!("DummyBackend: linking program {handle:?}");
        Ok(handle)
    }

    fn use_program(&self, program: Option<ProgramHandle>) {
        let mut state = self.state.lock();
        state.current_program = program;
        state.commands.push(GlCommand::UseProgram(program));
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut state = self.state.lock();
        state.programs.remove(&program);
        if state.current_program == Some(program) {
            state.current_program = None;
        }
        state.commands.push(GlCommand::DeleteProgram(program));
    }

    fn create_transform_feedback(&self) -> Result<TransformFeedbackHandle, GraphicsError> {
        let mut state = self.state.lock();
        let handle = TransformFeedbackHandle(state.next_handle());
        state.feedbacks.insert(handle, FeedbackState::default());
        state
            .commands
            .push(GlCommand::CreateTransformFeedback(handle));
        Ok(handle)
    }

    fn delete_transform_feedback(&self, feedback: TransformFeedbackHandle) {
        let mut state = self.state.lock();
        state.feedbacks.remove(&feedback);
        if state.current_feedback == Some(feedback) {
            state.current_feedback = None;
        }
        state
            .commands
            .push(GlCommand::DeleteTransformFeedback(feedback));
    }

    fn bind_transform_feedback(&self, feedback: Option<TransformFeedbackHandle>) {
        let mut state = self.state.lock();
        state.current_feedback = feedback;
        state
            .commands
            .push(GlCommand::BindTransformFeedback(feedback));
    }

    fn begin_transform_feedback(&self, mode: DrawMode) {
        let mut state = self.state.lock();
        state.capturing = Some(mode);
        state.commands.push(GlCommand::BeginTransformFeedback(mode));
    }

    fn end_transform_feedback(&self) {
        let mut state = self.state.lock();
        state.capturing = None;
        state.commands.push(GlCommand::EndTransformFeedback);
    }

    fn set_rasterizer_discard(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.rasterizer_discard = enabled;
        state.commands.push(GlCommand::RasterizerDiscard(enabled));
    }
}

static_assertions::assert_impl_all!(DummyBackend: Send, Sync);
