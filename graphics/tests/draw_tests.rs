//! Binding and draw dispatch tests.
//!
//! Draws are issued against the recording dummy backend and checked through
//! the recorded native calls. Capability-dependent paths are parameterized
//! with `rstest` over native and emulated capability sets.

mod common;

use std::sync::Arc;

use rstest::rstest;

use common::{
    Caps, INSTANCE_LOCATION, INSTANCE_STRIDE, QUAD_ATTRIBUTES, TestContext, instanced_quads,
    triangle,
};
use vellum_core::buffer::{Buffer, BufferUsage};
use vellum_core::geometry::{
    AttributeDescriptor, DrawRange, Geometry, GeometryDescriptor, MultiDrawBuffer,
    PrimitiveTopology, VertexFormat,
};
use vellum_graphics::backend::{BufferTarget, DrawMode};
use vellum_graphics::backend::dummy::GlCommand;
use vellum_graphics::{ContextParameters, DrawRequest, GraphicsError, MultiDrawRequest};

fn vao_creations(test: &TestContext) -> usize {
    test.backend
        .count_commands(|c| matches!(c, GlCommand::CreateVertexArray(_)))
}

// ============================================================================
// Attribute Packing
// ============================================================================

#[test]
fn test_packed_offsets_follow_declaration_order() {
    let mut geometry = Geometry::new(
        GeometryDescriptor::new()
            .with_vertex_buffer(vec![0.0f32; 27])
            .with_attribute("aPosition", VertexFormat::Float32x2)
            .with_attribute("aColor", VertexFormat::Unorm8x4)
            .with_attribute("aUv", VertexFormat::Float32x3),
    )
    .unwrap();

    let packed: Vec<(u32, u32)> = ["aPosition", "aColor", "aUv"]
        .iter()
        .map(|name| {
            let attr = geometry.attribute(name).unwrap();
            (attr.offset(), attr.stride())
        })
        .collect();
    assert_eq!(packed, vec![(0, 24), (8, 24), (12, 24)]);

    assert!(!geometry.check_attributes());
    assert_eq!(geometry.attribute("aUv").unwrap().offset(), 12);
}

// ============================================================================
// End-to-End Draws
// ============================================================================

#[test]
fn test_triangle_draws_three_vertices() {
    let mut test = TestContext::new(Caps::Native);
    let program = test.program(&[("aPosition", 0)]);
    let mut geometry = triangle();

    test.ctx
        .draw_request(DrawRequest::new(&mut geometry, &program))
        .unwrap();

    let draws = test.backend.draws();
    assert_eq!(draws.len(), 1);
    let draw = &draws[0];
    assert_eq!(draw.mode, DrawMode::Triangles);
    assert_eq!((draw.first, draw.count), (0, 3));
    assert!(!draw.is_indexed());
    assert!(!draw.is_instanced());
    assert_eq!(draw.attributes.len(), 1);
    assert_eq!(draw.attribute(0).unwrap().pointer.stride, 20);
}

#[test]
fn test_indexed_draw_defaults_to_index_count() {
    let mut test = TestContext::new(Caps::Native);
    let program = test.program(&[("aPosition", 0)]);
    let mut geometry = Geometry::new(
        GeometryDescriptor::new()
            .with_vertex_buffer(vec![0.0f32; 8])
            .with_index_buffer(vec![0u16, 1, 2, 0, 2, 3])
            .with_attribute("aPosition", VertexFormat::Float32x2),
    )
    .unwrap();

    test.ctx
        .draw_request(DrawRequest::new(&mut geometry, &program))
        .unwrap();
    test.ctx
        .draw_request(DrawRequest::new(&mut geometry, &program).with_range(3, 3))
        .unwrap();

    let draws = test.backend.draws();
    assert!(draws[0].is_indexed());
    assert_eq!((draws[0].first, draws[0].count), (0, 6));
    assert_eq!((draws[1].first, draws[1].count), (3, 3));
    assert!(draws[0].element_buffer.is_some());
}

#[test]
fn test_topology_override() {
    let mut test = TestContext::new(Caps::Native);
    let program = test.program(&[("aPosition", 0)]);
    let mut geometry = triangle();

    test.ctx
        .draw_request(
            DrawRequest::new(&mut geometry, &program).with_topology(PrimitiveTopology::LineStrip),
        )
        .unwrap();

    assert_eq!(test.backend.draws()[0].mode, DrawMode::LineStrip);
}

#[test]
fn test_draw_without_bind_fails() {
    let mut test = TestContext::new(Caps::Native);
    let geometry = triangle();

    let err = test.ctx.draw(&geometry, None, None, None, None).unwrap_err();
    assert!(matches!(err, GraphicsError::GeometryNotBound));
    assert!(test.backend.draws().is_empty());
}

// ============================================================================
// Compatibility
// ============================================================================

#[test]
fn test_missing_attribute_is_named() {
    let mut test = TestContext::new(Caps::Native);
    let program = test.program(&[("aPosition", 0), ("aNormal", 1)]);
    let mut geometry = triangle();

    let err = test.ctx.bind_geometry(&mut geometry, &program).unwrap_err();
    match err {
        GraphicsError::MissingAttribute {
            attribute,
            geometry,
        } => {
            assert_eq!(attribute, "aNormal");
            assert_eq!(geometry.as_deref(), Some("triangle"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(vao_creations(&test), 0);
}

#[test]
fn test_superset_of_attributes_binds() {
    let mut test = TestContext::new(Caps::Native);
    let program = test.program(&[("aColor", 3)]);
    let mut geometry = triangle();

    test.ctx.bind_geometry(&mut geometry, &program).unwrap();
    test.ctx.draw(&geometry, None, None, None, None).unwrap();

    let draw = &test.backend.draws()[0];
    assert_eq!(draw.attribute(3).unwrap().pointer.offset, 8);
    assert!(draw.attribute(0).is_none());
}

// ============================================================================
// Vertex Array Caching
// ============================================================================

#[test]
fn test_rebinding_reuses_vertex_array() {
    let mut test = TestContext::new(Caps::Native);
    let program = test.program(&[("aPosition", 0), ("aColor", 1)]);
    let mut geometry = triangle();

    test.ctx.bind_geometry(&mut geometry, &program).unwrap();
    let first = test.ctx.geometry_system().active_vertex_array();
    test.ctx.bind_geometry(&mut geometry, &program).unwrap();

    assert_eq!(vao_creations(&test), 1);
    assert_eq!(test.ctx.geometry_system().active_vertex_array(), first);
    assert_eq!(
        test.backend
            .count_commands(|c| matches!(c, GlCommand::BindVertexArray(_))),
        1
    );
}

#[test]
fn test_same_locations_share_vertex_array() {
    let mut test = TestContext::new(Caps::Native);
    let first = test.program(&[("aPosition", 0), ("aColor", 1)]);
    let second = test.program(&[("aPosition", 0), ("aColor", 1)]);
    let moved = test.program(&[("aPosition", 1), ("aColor", 0)]);
    let mut geometry = triangle();

    test.ctx.bind_geometry(&mut geometry, &first).unwrap();
    test.ctx.bind_geometry(&mut geometry, &second).unwrap();
    assert_eq!(vao_creations(&test), 1);

    let systems = test.ctx.geometry_system();
    assert_eq!(
        systems.vertex_array(geometry.id(), &first),
        systems.vertex_array(geometry.id(), &second)
    );

    test.ctx.bind_geometry(&mut geometry, &moved).unwrap();
    assert_eq!(vao_creations(&test), 2);
    assert_eq!(test.ctx.geometry_system().vertex_array_count(geometry.id()), 2);
}

#[test]
fn test_swap_buffer_keeps_layout_and_reads_new_data() {
    let mut test = TestContext::new(Caps::Native);
    let program = test.program(&[("aPosition", 0), ("aColor", 1)]);
    let mut geometry = triangle();

    test.ctx.bind_geometry(&mut geometry, &program).unwrap();
    test.ctx.draw(&geometry, None, None, None, None).unwrap();

    let replacement = Buffer::from_data(vec![2.0f32; 15], BufferUsage::VERTEX);
    let old = geometry.swap_buffer(0, Arc::clone(&replacement)).unwrap();
    assert_ne!(old.id(), replacement.id());
    assert_eq!(geometry.attribute("aColor").unwrap().offset(), 8);
    assert_eq!(geometry.attribute("aColor").unwrap().stride(), 20);

    test.ctx.bind_geometry(&mut geometry, &program).unwrap();
    test.ctx.draw(&geometry, None, None, None, None).unwrap();

    let new_handle = test.ctx.buffer_system().handle(replacement.id()).unwrap();
    let draw = test.backend.draws().pop().unwrap();
    assert_eq!(draw.attribute(0).unwrap().buffer, Some(new_handle));
    assert_eq!(draw.attribute(1).unwrap().buffer, Some(new_handle));
    assert_eq!(draw.attribute(1).unwrap().pointer.offset, 8);
    assert_eq!(test.ctx.buffer_system().ref_count(old.id()), None);
    assert_eq!(test.ctx.buffer_system().ref_count(replacement.id()), Some(1));
}

#[test]
fn test_stale_geometry_regenerates_in_place() {
    let mut test = TestContext::new(Caps::Native);
    let program = test.program(&[("aPosition", 0), ("aColor", 1)]);
    let other = test.program(&[("aPosition", 1), ("aColor", 0)]);
    let mut geometry = triangle();

    test.ctx.bind_geometry(&mut geometry, &other).unwrap();
    test.ctx.bind_geometry(&mut geometry, &program).unwrap();
    let kept = test.ctx.geometry_system().vertex_array(geometry.id(), &program);
    assert_eq!(vao_creations(&test), 2);

    let buffer_id = geometry.buffers()[0].id();
    test.ctx.release_buffer(buffer_id);
    assert_eq!(test.ctx.geometry_system().is_stale(geometry.id()), Some(true));

    test.ctx.bind_geometry(&mut geometry, &program).unwrap();
    test.ctx.draw(&geometry, None, None, None, None).unwrap();

    assert_eq!(vao_creations(&test), 2);
    assert_eq!(
        test.ctx.geometry_system().vertex_array(geometry.id(), &program),
        kept
    );
    assert_eq!(test.ctx.geometry_system().vertex_array_count(geometry.id()), 1);
    assert_eq!(test.ctx.geometry_system().is_stale(geometry.id()), Some(false));

    let new_handle = test.ctx.buffer_system().handle(buffer_id).unwrap();
    let draw = test.backend.draws().pop().unwrap();
    assert_eq!(draw.vao, kept);
    assert_eq!(draw.attribute(0).unwrap().buffer, Some(new_handle));
}

#[test]
fn test_attribute_change_rebuilds_vertex_array_after_early_check() {
    let mut test = TestContext::new(Caps::Native);
    let program = test.program(&[("aPosition", 0)]);
    let mut geometry = triangle();

    test.ctx.bind_geometry(&mut geometry, &program).unwrap();
    test.ctx.draw(&geometry, None, None, None, None).unwrap();
    let before = test.backend.draws().pop().unwrap();
    assert_eq!(before.attribute(0).unwrap().pointer.components, 2);

    geometry
        .add_attribute("aPosition", VertexFormat::Float32x3)
        .unwrap();
    assert!(geometry.check_attributes());

    test.ctx.bind_geometry(&mut geometry, &program).unwrap();
    test.ctx.draw(&geometry, None, None, None, None).unwrap();

    let after = test.backend.draws().pop().unwrap();
    let position = after.attribute(0).unwrap();
    assert_eq!(position.pointer.components, 3);
    assert_eq!(position.pointer.stride, 24);
    assert_ne!(after.vao, before.vao);
    assert_eq!(test.ctx.geometry_system().vertex_array_count(geometry.id()), 1);
}

#[test]
fn test_attribute_change_reaches_every_context() {
    let mut first = TestContext::new(Caps::Native);
    let mut second = TestContext::new(Caps::Emulated);
    let first_program = first.program(&[("aPosition", 0)]);
    let second_program = second.program(&[("aPosition", 0)]);
    let mut geometry = triangle();

    first.ctx.bind_geometry(&mut geometry, &first_program).unwrap();
    second.ctx.bind_geometry(&mut geometry, &second_program).unwrap();

    geometry
        .add_attribute("aPosition", VertexFormat::Float32x3)
        .unwrap();

    for (test, program) in [(&mut first, &first_program), (&mut second, &second_program)] {
        test.ctx.bind_geometry(&mut geometry, program).unwrap();
        test.ctx.draw(&geometry, None, None, None, None).unwrap();
        let draw = test.backend.draws().pop().unwrap();
        assert_eq!(draw.attribute(0).unwrap().pointer.components, 3);
    }
}

// ============================================================================
// Instancing
// ============================================================================

#[test]
fn test_proto_clones_draw_instanced() {
    let mut test = TestContext::new(Caps::Native);
    let program = test.program(QUAD_ATTRIBUTES);
    let (proto, _instances) = instanced_quads(25);

    let mut clone = Geometry::new(GeometryDescriptor::with_proto(&proto)).unwrap();
    clone.set_instance_count(25);
    assert!(clone.shares_layout_with(&proto));

    test.ctx
        .draw_request(DrawRequest::new(&mut clone, &program))
        .unwrap();

    let draw = &test.backend.draws()[0];
    assert_eq!(draw.instance_count, Some(25));
    assert!(draw.is_indexed());
    assert_eq!(draw.count, 6);

    let instance = draw.attribute(INSTANCE_LOCATION).unwrap();
    assert_eq!(instance.divisor, 1);
    assert!(instance.integer);
    assert_eq!(instance.pointer.stride as u64, INSTANCE_STRIDE);
    assert_eq!(draw.attribute(0).unwrap().divisor, 0);
}

#[test]
fn test_instancing_unsupported_skips_with_one_warning() {
    let mut test = TestContext::with_parameters(
        ContextParameters::new().with_capability_mask(vellum_graphics::Capabilities {
            instancing: false,
            base_instance: false,
            multi_draw_base_instance: false,
            ..vellum_graphics::Capabilities::all()
        }),
    );
    let program = test.program(QUAD_ATTRIBUTES);
    let (mut geometry, _instances) = instanced_quads(4);

    for _ in 0..3 {
        test.ctx
            .draw_request(DrawRequest::new(&mut geometry, &program))
            .unwrap();
    }

    assert!(test.backend.draws().is_empty());
    assert_eq!(
        test.ctx.warnings_issued(),
        vec!["instance-attributes", "instancing"]
    );
}

#[rstest]
#[case::native(Caps::Native)]
#[case::emulated(Caps::Emulated)]
fn test_base_instance_offsets_instance_attributes(#[case] caps: Caps) {
    let mut test = TestContext::new(caps);
    let program = test.program(QUAD_ATTRIBUTES);
    let (mut geometry, _instances) = instanced_quads(16);

    test.ctx
        .draw_request(
            DrawRequest::new(&mut geometry, &program)
                .with_instance_count(4)
                .with_base_instance(5),
        )
        .unwrap();

    let draw = &test.backend.draws()[0];
    assert_eq!(draw.instance_count, Some(4));
    assert_eq!(
        draw.instance_start(INSTANCE_LOCATION),
        Some(5 * INSTANCE_STRIDE)
    );
    assert_eq!(draw.attribute(0).unwrap().pointer.offset, 0);
    assert_eq!(draw.base_instance.is_some(), caps == Caps::Native);
}

#[test]
fn test_emulated_base_instance_repoints_only_on_change() {
    let mut test = TestContext::new(Caps::Emulated);
    let program = test.program(QUAD_ATTRIBUTES);
    let (mut geometry, _instances) = instanced_quads(16);

    test.ctx.bind_geometry(&mut geometry, &program).unwrap();
    let sync = test
        .ctx
        .geometry_system()
        .sync_program(geometry.id(), &program)
        .unwrap();
    assert_eq!(sync.buffer_switches(), 0);

    let pointer_calls = |test: &TestContext| {
        test.backend
            .count_commands(|c| matches!(c, GlCommand::AttribPointer { location, .. } if *location == INSTANCE_LOCATION))
    };
    let after_bind = pointer_calls(&test);

    test.ctx.draw_bi(&geometry, None, None, None, Some(2), 3).unwrap();
    test.ctx.draw_bi(&geometry, None, None, None, Some(2), 3).unwrap();
    assert_eq!(pointer_calls(&test), after_bind + 1);

    test.ctx.draw(&geometry, None, None, None, None).unwrap();
    assert_eq!(pointer_calls(&test), after_bind + 2);

    let draws = test.backend.draws();
    assert_eq!(draws[0].instance_start(INSTANCE_LOCATION), Some(3 * INSTANCE_STRIDE));
    assert_eq!(draws[1].instance_start(INSTANCE_LOCATION), Some(3 * INSTANCE_STRIDE));
    assert_eq!(draws[2].instance_start(INSTANCE_LOCATION), Some(0));
    assert!(draws.iter().all(|draw| draw.base_instance.is_none()));
}

#[test]
fn test_emulated_base_instance_across_instance_buffers() {
    let mut test = TestContext::new(Caps::Emulated);
    let program = test.program(&[("aPosition", 0), ("aOffset", 1), ("aScale", 2)]);
    let offsets = Buffer::from_data(vec![0i32; 32], BufferUsage::VERTEX);
    let scales = Buffer::from_data(vec![1.0f32; 16], BufferUsage::VERTEX);
    let mut geometry = Geometry::new(
        GeometryDescriptor::new()
            .with_vertex_buffer(vec![0.0f32, 0.0, 1.0, 0.0, 1.0, 1.0])
            .with_attribute("aPosition", VertexFormat::Float32x2)
            .with_attribute(
                "aOffset",
                AttributeDescriptor::new(VertexFormat::Sint32x2)
                    .with_buffer(Arc::clone(&offsets))
                    .per_instance(),
            )
            .with_attribute(
                "aScale",
                AttributeDescriptor::new(VertexFormat::Float32)
                    .with_buffer(Arc::clone(&scales))
                    .per_instance(),
            )
            .with_instancing(16),
    )
    .unwrap();

    test.ctx.bind_geometry(&mut geometry, &program).unwrap();
    let sync = test
        .ctx
        .geometry_system()
        .sync_program(geometry.id(), &program)
        .unwrap();
    assert_eq!(sync.buffer_switches(), 1);

    let offsets_handle = test.ctx.buffer_system().handle(offsets.id()).unwrap();
    let scales_handle = test.ctx.buffer_system().handle(scales.id()).unwrap();
    let array_binds = |test: &TestContext| {
        test.backend.count_commands(|c| {
            matches!(c, GlCommand::BindBuffer(BufferTarget::Array, Some(_)))
        })
    };

    let before = array_binds(&test);
    test.ctx.draw_bi(&geometry, None, None, None, Some(2), 4).unwrap();
    assert_eq!(array_binds(&test), before + 2);

    let repeated = array_binds(&test);
    test.ctx.draw_bi(&geometry, None, None, None, Some(2), 4).unwrap();
    assert_eq!(array_binds(&test), repeated);

    test.ctx.draw_bi(&geometry, None, None, None, Some(2), 7).unwrap();

    let draws = test.backend.draws();
    for (draw, base) in draws.iter().zip([4u64, 4, 7]) {
        let offset = draw.attribute(1).unwrap();
        let scale = draw.attribute(2).unwrap();
        assert_eq!(offset.buffer, Some(offsets_handle));
        assert_eq!(scale.buffer, Some(scales_handle));
        assert_eq!(offset.pointer.offset, base * 8);
        assert_eq!(scale.pointer.offset, base * 4);
        assert!(offset.integer);
        assert!(!scale.integer);
    }
}

// ============================================================================
// Index Formats
// ============================================================================

#[test]
fn test_uint32_indices_skip_and_warn_once() {
    let mut test =
        TestContext::with_parameters(ContextParameters::new().without_uint32_indices());
    let program = test.program(&[("aPosition", 0)]);
    let mut wide = Geometry::new(
        GeometryDescriptor::new()
            .with_vertex_buffer(vec![0.0f32; 6])
            .with_index_buffer(vec![0u32, 1, 2])
            .with_attribute("aPosition", VertexFormat::Float32x2),
    )
    .unwrap();
    let mut narrow = triangle();

    test.ctx
        .draw_request(DrawRequest::new(&mut wide, &program))
        .unwrap();
    test.ctx
        .draw_request(DrawRequest::new(&mut wide, &program))
        .unwrap();
    test.ctx
        .draw_request(DrawRequest::new(&mut narrow, &program))
        .unwrap();

    assert_eq!(test.backend.draws().len(), 1);
    assert_eq!(test.ctx.warnings_issued(), vec!["uint32-indices"]);
}

// ============================================================================
// Multi-Draw
// ============================================================================

fn eight_ranges() -> MultiDrawBuffer {
    let mut multi = MultiDrawBuffer::new();
    for (i, base) in [0u32, 4, 4, 1, 9, 9, 2, 0].into_iter().enumerate() {
        let i = i as u32;
        multi.push(DrawRange::new(i % 2 * 3, 3).with_instances(base, i + 1));
    }
    multi
}

#[rstest]
#[case::native(Caps::Native)]
#[case::base_instance(Caps::BaseInstanceOnly)]
#[case::emulated(Caps::Emulated)]
fn test_multi_draw_ranges_use_their_base_instance(#[case] caps: Caps) {
    let mut test = TestContext::new(caps);
    let program = test.program(QUAD_ATTRIBUTES);
    let (mut geometry, _instances) = instanced_quads(16);
    let multi = eight_ranges();

    test.ctx
        .multi_draw_request(MultiDrawRequest::new(&mut geometry, &program, &multi))
        .unwrap();

    let draws = test.backend.draws();
    assert_eq!(draws.len(), multi.count());
    for (draw, range) in draws.iter().zip(multi.ranges()) {
        assert_eq!((draw.first, draw.count), (range.offset, range.count));
        assert_eq!(draw.instance_count, Some(range.instance_count));
        assert_eq!(
            draw.instance_start(INSTANCE_LOCATION),
            Some(range.base_instance as u64 * INSTANCE_STRIDE)
        );
    }
    assert_eq!(draws.iter().all(|draw| draw.multi), caps == Caps::Native);
}

#[test]
fn test_multi_draw_parity_between_paths() {
    let multi = eight_ranges();
    let starts = |caps: Caps| {
        let mut test = TestContext::new(caps);
        let program = test.program(QUAD_ATTRIBUTES);
        let (mut geometry, _instances) = instanced_quads(16);
        test.ctx
            .multi_draw_request(MultiDrawRequest::new(&mut geometry, &program, &multi))
            .unwrap();
        test.backend
            .draws()
            .iter()
            .map(|draw| {
                (
                    draw.first,
                    draw.count,
                    draw.instance_count,
                    draw.instance_start(INSTANCE_LOCATION),
                )
            })
            .collect::<Vec<_>>()
    };

    let native = starts(Caps::Native);
    assert_eq!(starts(Caps::BaseInstanceOnly), native);
    assert_eq!(starts(Caps::Emulated), native);
}

#[test]
fn test_virtual_instances_become_ranges() {
    let mut test = TestContext::new(Caps::Native);
    let program = test.program(&[("aPosition", 0)]);
    let mut geometry = Geometry::new(
        GeometryDescriptor::new()
            .with_vertex_buffer(vec![0.0f32; 24])
            .with_attribute("aPosition", VertexFormat::Float32x2)
            .with_virtual_instance(3, 0)
            .with_instancing(1),
    )
    .unwrap();

    let mut multi = MultiDrawBuffer::new();
    multi.push(geometry.virtual_range(1, 2));
    multi.push(geometry.virtual_range(3, 1));

    test.ctx
        .multi_draw_request(MultiDrawRequest::new(&mut geometry, &program, &multi))
        .unwrap();

    let ranges: Vec<(u32, u32)> = test
        .backend
        .draws()
        .iter()
        .map(|draw| (draw.first, draw.count))
        .collect();
    assert_eq!(ranges, vec![(3, 6), (9, 3)]);
}

#[test]
fn test_empty_multi_draw_is_a_no_op() {
    let mut test = TestContext::new(Caps::Emulated);
    let program = test.program(QUAD_ATTRIBUTES);
    let (mut geometry, _instances) = instanced_quads(4);
    let multi = MultiDrawBuffer::new();

    test.ctx
        .multi_draw_request(MultiDrawRequest::new(&mut geometry, &program, &multi))
        .unwrap();
    assert!(test.backend.draws().is_empty());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_destroyed_buffers_are_released_on_flush() {
    let mut test = TestContext::new(Caps::Native);
    let program = test.program(&[("aPosition", 0)]);
    let mut geometry = triangle();
    test.ctx.bind_geometry(&mut geometry, &program).unwrap();
    assert_eq!(test.backend.live_buffers(), 1);

    geometry.destroy();
    assert_eq!(test.ctx.flush_disposals(), 1);
    assert_eq!(test.backend.live_buffers(), 0);
    assert_eq!(test.backend.live_vertex_arrays(), 0);
    assert!(!test.ctx.geometry_system().is_bound(geometry.id()));
}

#[test]
fn test_context_loss_rebuilds_on_next_bind() {
    let mut test = TestContext::new(Caps::Native);
    let program = test.program(&[("aPosition", 0)]);
    let mut geometry = triangle();
    test.ctx.bind_geometry(&mut geometry, &program).unwrap();

    test.ctx.context_lost();
    test.backend.clear_commands();
    test.ctx.bind_geometry(&mut geometry, &program).unwrap();

    assert_eq!(vao_creations(&test), 1);
    assert_eq!(
        test.backend
            .count_commands(|c| matches!(c, GlCommand::CreateBuffer(_))),
        1
    );
}
