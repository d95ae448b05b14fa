use criterion::{Criterion, black_box, criterion_group, criterion_main};

use stratus_core::math::Vec3;
use stratus_core::scene::{Light, MeshHandle, PointLight, Scene, Transform};

// ---------------------------------------------------------------------------
// Scene snapshot
// ---------------------------------------------------------------------------

fn build_scene(count: u32, depth: u32) -> Scene {
    let mut scene = Scene::new();
    let mut parent = None;
    for i in 0..count {
        let entity = scene.spawn(format!("entity_{i}"));
        scene.set_transform(
            entity,
            Transform::from_translation(Vec3::new(i as f32, 0.0, 0.0)),
        );
        scene.set_mesh(entity, Some(MeshHandle(i)));
        if i % 16 == 0 {
            scene.set_light(
                entity,
                Some(Light::Point(PointLight {
                    color: Vec3::new(1.0, 1.0, 1.0),
                    intensity: 1.0,
                    range: 10.0,
                })),
            );
        }
        if i % depth != 0 {
            scene.set_parent(entity, parent);
        }
        parent = Some(entity);
    }
    scene
}

fn bench_snapshot_flat(c: &mut Criterion) {
    let scene = build_scene(1024, 1);
    c.bench_function("scene_snapshot_1024_flat", |b| {
        b.iter(|| black_box(scene.snapshot()));
    });
}

fn bench_snapshot_nested(c: &mut Criterion) {
    let scene = build_scene(1024, 8);
    c.bench_function("scene_snapshot_1024_depth_8", |b| {
        b.iter(|| black_box(scene.snapshot()));
    });
}

criterion_group!(benches, bench_snapshot_flat, bench_snapshot_nested);
criterion_main!(benches);
