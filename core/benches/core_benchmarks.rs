use criterion::{Criterion, black_box, criterion_group, criterion_main};

use vellum_core::copy::CopyBatch;
use vellum_core::geometry::{
    Attribute, Geometry, GeometryDescriptor, GeometryLayout, MultiDrawBuffer, VertexFormat,
};
use vellum_core::pool::Pool;

// ---------------------------------------------------------------------------
// Attribute packing
// ---------------------------------------------------------------------------

fn bench_check_attributes(c: &mut Criterion) {
    let formats = [
        VertexFormat::Float32x2,
        VertexFormat::Float32x3,
        VertexFormat::Unorm8x4,
        VertexFormat::Float32x4,
        VertexFormat::Sint32x2,
    ];
    c.bench_function("check_attributes_5", |b| {
        b.iter(|| {
            let mut layout = GeometryLayout::new();
            for (i, format) in formats.iter().enumerate() {
                layout.add(format!("a{i}"), Attribute::new(*format));
            }
            black_box(layout.check_attributes())
        });
    });
}

fn bench_geometry_from_proto(c: &mut Criterion) {
    let proto = Geometry::new(
        GeometryDescriptor::new()
            .with_vertex_buffer(vec![0.0f32; 1024])
            .with_attribute("aPosition", VertexFormat::Float32x2)
            .with_attribute("aColor", VertexFormat::Unorm8x4),
    )
    .expect("prototype geometry");

    c.bench_function("geometry_from_proto", |b| {
        b.iter(|| Geometry::new(GeometryDescriptor::with_proto(black_box(&proto))));
    });
}

// ---------------------------------------------------------------------------
// Batching
// ---------------------------------------------------------------------------

fn bench_multi_draw_fill(c: &mut Criterion) {
    let quads = Geometry::new(
        GeometryDescriptor::new()
            .with_vertex_buffer(vec![0.0f32; 2048])
            .with_index_buffer((0..1536u32).map(|i| (i % 1024) as u16).collect::<Vec<u16>>())
            .with_attribute("aPosition", VertexFormat::Float32x2)
            .with_virtual_instance(4, 6),
    )
    .expect("batched geometry");
    let mut multi = MultiDrawBuffer::with_capacity(256);
    c.bench_function("multi_draw_push_virtual_256", |b| {
        b.iter(|| {
            multi.clear();
            for i in 0..256 {
                multi.push_virtual(&quads, black_box(i), 1, i % 8, 1);
            }
            black_box(multi.count())
        });
    });
}

fn bench_copy_batch(c: &mut Criterion) {
    let mut pool = Pool::<CopyBatch>::new();
    c.bench_function("copy_batch_compact_1024", |b| {
        b.iter(|| {
            let mut batch = pool.acquire();
            let mut dst = 0;
            for block in 0..1024u32 {
                if block % 3 != 0 {
                    batch.push(block * 4, dst, 4);
                    dst += 4;
                }
            }
            let ops = black_box(batch.len());
            pool.release(batch);
            ops
        });
    });
}

criterion_group!(
    benches,
    bench_check_attributes,
    bench_geometry_from_proto,
    bench_multi_draw_fill,
    bench_copy_batch,
);
criterion_main!(benches);
