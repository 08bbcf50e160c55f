//! OpenGL 3.3+ / GLES 3.0 backend built on `glow`.
//!
//! Native objects are kept in handle tables so the binding core only ever
//! sees the integer handles of [`super`]. The backend does not cache any
//! state; every trait call is one GL call.

use std::collections::HashMap;

use glow::HasContext;
use parking_lot::Mutex;
use vellum_core::geometry::{IndexFormat, ScalarType};

use super::{
    AttribPointer, BufferHandle, BufferTarget, Capabilities, DrawMode, GlBackend, ProgramHandle,
    ProgramSource, TransformFeedbackHandle, UsageHint, VertexArrayHandle,
};
use crate::error::GraphicsError;

struct Table<T> {
    objects: HashMap<u32, T>,
    next: u32,
}

impl<T: Copy> Table<T> {
    fn new() -> Self {
        Self {
            objects: HashMap::new(),
            next: 1,
        }
    }

    fn insert(&mut self, object: T) -> u32 {
        let handle = self.next;
        self.next += 1;
        self.objects.insert(handle, object);
        handle
    }

    fn get(&self, handle: u32) -> Option<T> {
        self.objects.get(&handle).copied()
    }

    fn remove(&mut self, handle: u32) -> Option<T> {
        self.objects.remove(&handle)
    }
}

struct Objects {
    buffers: Table<glow::Buffer>,
    vertex_arrays: Table<glow::VertexArray>,
    programs: Table<glow::Program>,
    feedbacks: Table<glow::TransformFeedback>,
}

/// `glow`-backed [`GlBackend`].
pub struct GlowBackend {
    gl: glow::Context,
    capabilities: Capabilities,
    desktop: bool,
    objects: Mutex<Objects>,
}

impl GlowBackend {
    /// Wrap a current GL context.
    ///
    /// The context must stay current on the calling thread for the lifetime
    /// of the backend.
    pub fn new(gl: glow::Context) -> Self {
        let version = gl.version();
        let desktop = !version.is_embedded;
        let extensions = gl.supported_extensions();
        let base_instance = (desktop && (version.major, version.minor) >= (4, 2))
            || extensions.contains("GL_ARB_base_instance")
            || extensions.contains("GL_EXT_base_instance");

        let capabilities = Capabilities {
            base_instance,
            multi_draw_base_instance: false,
            ..Capabilities::webgl2()
        };

        log::info!(
            "GlowBackend: GL {}.{}{} ({:?})",
            version.major,
            version.minor,
            if desktop { "" } else { " ES" },
            capabilities
        );

        Self {
            gl,
            capabilities,
            desktop,
            objects: Mutex::new(Objects {
                buffers: Table::new(),
                vertex_arrays: Table::new(),
                programs: Table::new(),
                feedbacks: Table::new(),
            }),
        }
    }

    /// The wrapped context.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    fn buffer(&self, handle: Option<BufferHandle>) -> Option<glow::Buffer> {
        handle.and_then(|h| self.objects.lock().buffers.get(h.0))
    }

    fn vertex_array(&self, handle: Option<VertexArrayHandle>) -> Option<glow::VertexArray> {
        handle.and_then(|h| self.objects.lock().vertex_arrays.get(h.0))
    }

    fn translate_source(&self, source: &str) -> String {
        if self.desktop {
            source.replacen("#version 300 es", "#version 330 core", 1)
        } else {
            source.to_owned()
        }
    }

    unsafe fn compile_shader(
        &self,
        stage: u32,
        source: &str,
    ) -> Result<glow::Shader, GraphicsError> {
        let gl = &self.gl;
        let shader = gl
            .create_shader(stage)
            .map_err(GraphicsError::ShaderCompilationFailed)?;
        gl.shader_source(shader, &self.translate_source(source));
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(GraphicsError::ShaderCompilationFailed(log));
        }
        Ok(shader)
    }
}

fn target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
        BufferTarget::Uniform => glow::UNIFORM_BUFFER,
        BufferTarget::CopyRead => glow::COPY_READ_BUFFER,
        BufferTarget::CopyWrite => glow::COPY_WRITE_BUFFER,
        BufferTarget::TransformFeedback => glow::TRANSFORM_FEEDBACK_BUFFER,
    }
}

fn usage(hint: UsageHint) -> u32 {
    match hint {
        UsageHint::Static => glow::STATIC_DRAW,
        UsageHint::Dynamic => glow::DYNAMIC_DRAW,
    }
}

fn mode(mode: DrawMode) -> u32 {
    match mode {
        DrawMode::Points => glow::POINTS,
        DrawMode::Lines => glow::LINES,
        DrawMode::LineStrip => glow::LINE_STRIP,
        DrawMode::Triangles => glow::TRIANGLES,
        DrawMode::TriangleStrip => glow::TRIANGLE_STRIP,
    }
}

fn index_type(format: IndexFormat) -> u32 {
    match format {
        IndexFormat::Uint16 => glow::UNSIGNED_SHORT,
        IndexFormat::Uint32 => glow::UNSIGNED_INT,
    }
}

fn scalar_type(scalar: ScalarType) -> u32 {
    match scalar {
        ScalarType::F32 => glow::FLOAT,
        ScalarType::F16 => glow::HALF_FLOAT,
        ScalarType::U32 => glow::UNSIGNED_INT,
        ScalarType::I32 => glow::INT,
        ScalarType::U16 => glow::UNSIGNED_SHORT,
        ScalarType::I16 => glow::SHORT,
        ScalarType::U8 => glow::UNSIGNED_BYTE,
        ScalarType::I8 => glow::BYTE,
    }
}

impl GlBackend for GlowBackend {
    fn name(&self) -> &'static str {
        "Glow Backend"
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    // ------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------

    fn create_buffer(&self) -> Result<BufferHandle, GraphicsError> {
        let buffer = unsafe { self.gl.create_buffer() }
            .map_err(GraphicsError::ResourceCreationFailed)?;
        Ok(BufferHandle(self.objects.lock().buffers.insert(buffer)))
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        if let Some(buffer) = self.objects.lock().buffers.remove(buffer.0) {
            unsafe { self.gl.delete_buffer(buffer) };
        }
    }

    fn bind_buffer(&self, buffer_target: BufferTarget, buffer: Option<BufferHandle>) {
        let buffer = self.buffer(buffer);
        unsafe { self.gl.bind_buffer(target(buffer_target), buffer) };
    }

    fn buffer_data(&self, buffer_target: BufferTarget, data: &[u8], hint: UsageHint) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(target(buffer_target), data, usage(hint))
        };
    }

    fn allocate_buffer(&self, buffer_target: BufferTarget, size: u64, hint: UsageHint) {
        let Some(size) = gl_int(size, "allocate_buffer size") else {
            return;
        };
        unsafe {
            self.gl
                .buffer_data_size(target(buffer_target), size, usage(hint))
        };
    }

    fn buffer_sub_data(&self, buffer_target: BufferTarget, offset: u64, data: &[u8]) {
        let Some(offset) = gl_int(offset, "buffer_sub_data offset") else {
            return;
        };
        unsafe {
            self.gl
                .buffer_sub_data_u8_slice(target(buffer_target), offset, data)
        };
    }

    fn bind_buffer_range(
        &self,
        buffer_target: BufferTarget,
        index: u32,
        buffer: Option<BufferHandle>,
        offset: u64,
        size: u64,
    ) {
        let (Some(offset), Some(size)) = (
            gl_int(offset, "bind_buffer_range offset"),
            gl_int(size, "bind_buffer_range size"),
        ) else {
            return;
        };
        let buffer = self.buffer(buffer);
        unsafe {
            self.gl
                .bind_buffer_range(target(buffer_target), index, buffer, offset, size)
        };
    }

    fn copy_buffer_sub_data(
        &self,
        read: BufferTarget,
        write: BufferTarget,
        read_offset: u64,
        write_offset: u64,
        size: u64,
    ) {
        let (Some(read_offset), Some(write_offset), Some(size)) = (
            gl_int(read_offset, "copy_buffer_sub_data read offset"),
            gl_int(write_offset, "copy_buffer_sub_data write offset"),
            gl_int(size, "copy_buffer_sub_data size"),
        ) else {
            return;
        };
        unsafe {
            self.gl.copy_buffer_sub_data(
                target(read),
                target(write),
                read_offset,
                write_offset,
                size,
            )
        };
    }

    // ------------------------------------------------------------------
    // Vertex arrays
    // ------------------------------------------------------------------

    fn create_vertex_array(&self) -> Result<VertexArrayHandle, GraphicsError> {
        let vao = unsafe { self.gl.create_vertex_array() }
            .map_err(GraphicsError::ResourceCreationFailed)?;
        Ok(VertexArrayHandle(self.objects.lock().vertex_arrays.insert(vao)))
    }

    fn delete_vertex_array(&self, vao: VertexArrayHandle) {
        if let Some(vao) = self.objects.lock().vertex_arrays.remove(vao.0) {
            unsafe { self.gl.delete_vertex_array(vao) };
        }
    }

    fn bind_vertex_array(&self, vao: Option<VertexArrayHandle>) {
        let vao = self.vertex_array(vao);
        unsafe { self.gl.bind_vertex_array(vao) };
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(location) };
    }

    fn disable_vertex_attrib_array(&self, location: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(location) };
    }

    fn vertex_attrib_pointer(&self, location: u32, pointer: &AttribPointer) {
        unsafe {
            self.gl.vertex_attrib_pointer_f32(
                location,
                pointer.components as i32,
                scalar_type(pointer.scalar),
                pointer.normalized,
                pointer.stride as i32,
                pointer.offset as i32,
            )
        };
    }

    fn vertex_attrib_ipointer(&self, location: u32, pointer: &AttribPointer) {
        unsafe {
            self.gl.vertex_attrib_pointer_i32(
                location,
                pointer.components as i32,
                scalar_type(pointer.scalar),
                pointer.stride as i32,
                pointer.offset as i32,
            )
        };
    }

    fn vertex_attrib_divisor(&self, location: u32, divisor: u32) {
        unsafe { self.gl.vertex_attrib_divisor(location, divisor) };
    }

    // ------------------------------------------------------------------
    // Draws
    // ------------------------------------------------------------------

    fn draw_arrays(&self, draw_mode: DrawMode, first: u32, count: u32) {
        unsafe { self.gl.draw_arrays(mode(draw_mode), first as i32, count as i32) };
    }

    fn draw_arrays_instanced(&self, draw_mode: DrawMode, first: u32, count: u32, instance_count: u32) {
        unsafe {
            self.gl.draw_arrays_instanced(
                mode(draw_mode),
                first as i32,
                count as i32,
                instance_count as i32,
            )
        };
    }

    fn draw_elements(&self, draw_mode: DrawMode, count: u32, format: IndexFormat, byte_offset: u64) {
        unsafe {
            self.gl.draw_elements(
                mode(draw_mode),
                count as i32,
                index_type(format),
                byte_offset as i32,
            )
        };
    }

    fn draw_elements_instanced(
        &self,
        draw_mode: DrawMode,
        count: u32,
        format: IndexFormat,
        byte_offset: u64,
        instance_count: u32,
    ) {
        unsafe {
            self.gl.draw_elements_instanced(
                mode(draw_mode),
                count as i32,
                index_type(format),
                byte_offset as i32,
                instance_count as i32,
            )
        };
    }

    fn draw_arrays_instanced_base_instance(
        &self,
        draw_mode: DrawMode,
        first: u32,
        count: u32,
        instance_count: u32,
        base_instance: u32,
    ) {
        unsafe {
            self.gl.draw_arrays_instanced_base_instance(
                mode(draw_mode),
                first as i32,
                count as i32,
                instance_count as i32,
                base_instance,
            )
        };
    }

    fn draw_elements_instanced_base_instance(
        &self,
        draw_mode: DrawMode,
        count: u32,
        format: IndexFormat,
        byte_offset: u64,
        instance_count: u32,
        base_instance: u32,
    ) {
        unsafe {
            self.gl.draw_elements_instanced_base_vertex_base_instance(
                mode(draw_mode),
                count as i32,
                index_type(format),
                byte_offset as i32,
                instance_count as i32,
                0,
                base_instance,
            )
        };
    }

    // ------------------------------------------------------------------
    // Programs and transform feedback
    // ------------------------------------------------------------------

    fn create_program(&self, source: &ProgramSource) -> Result<ProgramHandle, GraphicsError> {
        let gl = &self.gl;
        unsafe {
            let vertex = self.compile_shader(glow::VERTEX_SHADER, &source.vertex)?;
            let fragment = match self.compile_shader(glow::FRAGMENT_SHADER, &source.fragment) {
                Ok(fragment) => fragment,
                Err(err) => {
                    gl.delete_shader(vertex);
                    return Err(err);
                }
            };

            let program = match gl.create_program() {
                Ok(program) => program,
                Err(err) => {
                    gl.delete_shader(vertex);
                    gl.delete_shader(fragment);
                    return Err(GraphicsError::ResourceCreationFailed(err));
                }
            };
            gl.attach_shader(program, vertex);
            gl.attach_shader(program, fragment);
            for (name, location) in &source.attribute_locations {
                gl.bind_attrib_location(program, *location, name);
            }
            if !source.feedback_varyings.is_empty() {
                let varyings: Vec<&str> =
                    source.feedback_varyings.iter().map(String::as_str).collect();
                gl.transform_feedback_varyings(program, &varyings, glow::INTERLEAVED_ATTRIBS);
            }
            gl.link_program(program);

            gl.detach_shader(program, vertex);
            gl.detach_shader(program, fragment);
            gl.delete_shader(vertex);
            gl.delete_shader(fragment);

            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(GraphicsError::ShaderCompilationFailed(log));
            }
            Ok(ProgramHandle(self.objects.lock().programs.insert(program)))
        }
    }

    fn use_program(&self, program: Option<ProgramHandle>) {
        let program = program.and_then(|p| self.objects.lock().programs.get(p.0));
        unsafe { self.gl.use_program(program) };
    }

    fn delete_program(&self, program: ProgramHandle) {
        if let Some(program) = self.objects.lock().programs.remove(program.0) {
            unsafe { self.gl.delete_program(program) };
        }
    }

    fn create_transform_feedback(&self) -> Result<TransformFeedbackHandle, GraphicsError> {
        let feedback = unsafe { self.gl.create_transform_feedback() }
            .map_err(GraphicsError::ResourceCreationFailed)?;
        Ok(TransformFeedbackHandle(
            self.objects.lock().feedbacks.insert(feedback),
        ))
    }

    fn delete_transform_feedback(&self, feedback: TransformFeedbackHandle) {
        if let Some(feedback) = self.objects.lock().feedbacks.remove(feedback.0) {
            unsafe { self.gl.delete_transform_feedback(feedback) };
        }
    }

    fn bind_transform_feedback(&self, feedback: Option<TransformFeedbackHandle>) {
        let feedback = feedback.and_then(|f| self.objects.lock().feedbacks.get(f.0));
        unsafe { self.gl.bind_transform_feedback(glow::TRANSFORM_FEEDBACK, feedback) };
    }

    fn begin_transform_feedback(&self, draw_mode: DrawMode) {
        unsafe { self.gl.begin_transform_feedback(mode(draw_mode)) };
    }

    fn end_transform_feedback(&self) {
        unsafe { self.gl.end_transform_feedback() };
    }

    fn set_rasterizer_discard(&self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(glow::RASTERIZER_DISCARD);
            } else {
                self.gl.disable(glow::RASTERIZER_DISCARD);
            }
        }
    }
}

impl std::fmt::Debug for GlowBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowBackend")
            .field("desktop", &self.desktop)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Byte sizes and offsets as GL integers. Values past `i32::MAX` are
/// logged and the call is skipped.
fn gl_int(value: u64, what: &str) -> Option<i32> {
    match i32::try_from(value) {
        Ok(value) => Some(value),
        Err(_) => {
            log::error!("GlowBackend: {what} {value} exceeds the GL integer range, skipping");
            None
        }
    }
}
