//! Common utilities for binding and copy integration tests.
//!
//! Every test runs against the recording [`DummyBackend`], configured either
//! with every native capability or with the baseline WebGL2 set so the
//! emulated paths are exercised.

#![allow(dead_code)]

use std::sync::Arc;

use vellum_core::buffer::{Buffer, BufferUsage};
use vellum_core::geometry::{
    AttributeDescriptor, Geometry, GeometryDescriptor, PrimitiveTopology, VertexFormat,
};
use vellum_graphics::backend::dummy::DummyBackend;
use vellum_graphics::{Capabilities, ContextParameters, GlContext, GlProgram, ProgramSource};

// ============================================================================
// Setup
// ============================================================================

/// Route `log` output to the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Native capability set a test context is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caps {
    /// Every optional capability, including native multi-draw.
    Native,
    /// Native base instance, multi-draw emulated with per-range draws.
    BaseInstanceOnly,
    /// WebGL2 baseline: base instance emulated with sync programs.
    Emulated,
}

impl Caps {
    /// Capabilities reported by the backend.
    pub fn capabilities(self) -> Capabilities {
        match self {
            Caps::Native => Capabilities::all(),
            Caps::BaseInstanceOnly => Capabilities {
                multi_draw_base_instance: false,
                ..Capabilities::all()
            },
            Caps::Emulated => Capabilities::webgl2(),
        }
    }
}

/// A recording backend and a context on it.
pub struct TestContext {
    pub backend: Arc<DummyBackend>,
    pub ctx: GlContext,
}

impl TestContext {
    /// Create a context with the given capabilities.
    pub fn new(caps: Caps) -> Self {
        init_logging();
        let backend = Arc::new(DummyBackend::with_capabilities(caps.capabilities()));
        let ctx = GlContext::with_parameters(
            backend.clone(),
            ContextParameters::new().with_label(format!("{caps:?}")),
        );
        Self { backend, ctx }
    }

    /// Create a context with parameter overrides on top of every capability.
    pub fn with_parameters(params: ContextParameters) -> Self {
        init_logging();
        let backend = Arc::new(DummyBackend::new());
        let ctx = GlContext::with_parameters(backend.clone(), params);
        Self { backend, ctx }
    }

    /// Link a program binding each attribute name to its location.
    pub fn program(&mut self, attributes: &[(&str, u32)]) -> GlProgram {
        let source = attributes.iter().fold(
            ProgramSource::new(
                "#version 300 es\nvoid main() {}\n",
                "#version 300 es\nvoid main() {}\n",
            ),
            |source, (name, location)| source.with_attribute(*name, *location),
        );
        self.ctx
            .create_program(&source)
            .expect("program creation should succeed")
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Interleaved triangle: `aPosition: float32x2`, `aColor: float32x3`.
pub fn triangle() -> Geometry {
    #[rustfmt::skip]
    let vertices = vec![
        0.0f32, 0.0,   1.0, 0.0, 0.0,
        1.0,    0.0,   0.0, 1.0, 0.0,
        0.0,    1.0,   0.0, 0.0, 1.0,
    ];
    Geometry::new(
        GeometryDescriptor::new()
            .with_label("triangle")
            .with_vertex_buffer(vertices)
            .with_attribute("aPosition", VertexFormat::Float32x2)
            .with_attribute("aColor", VertexFormat::Float32x3),
    )
    .expect("triangle geometry")
}

/// Indexed quad with a per-instance `aOffset: sint32x2` attribute over
/// `instances` instances.
pub fn instanced_quads(instances: u32) -> (Geometry, Arc<Buffer>) {
    let offsets: Vec<i32> = (0..instances as i32).flat_map(|i| [i, -i]).collect();
    let instance_buffer = Buffer::from_data(offsets, BufferUsage::VERTEX);
    let geometry = Geometry::new(
        GeometryDescriptor::new()
            .with_label("quads")
            .with_vertex_buffer(vec![0.0f32, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0])
            .with_index_buffer(vec![0u16, 1, 2, 0, 2, 3])
            .with_attribute("aPosition", VertexFormat::Float32x2)
            .with_attribute(
                "aOffset",
                AttributeDescriptor::new(VertexFormat::Sint32x2)
                    .with_buffer(Arc::clone(&instance_buffer))
                    .per_instance(),
            )
            .with_topology(PrimitiveTopology::TriangleList)
            .with_instancing(instances),
    )
    .expect("instanced geometry");
    (geometry, instance_buffer)
}

/// Locations used with [`instanced_quads`].
pub const QUAD_ATTRIBUTES: &[(&str, u32)] = &[("aPosition", 0), ("aOffset", 1)];

/// Location of the instance attribute in [`QUAD_ATTRIBUTES`].
pub const INSTANCE_LOCATION: u32 = 1;

/// Byte stride of the instance attribute of [`instanced_quads`].
pub const INSTANCE_STRIDE: u64 = 8;
