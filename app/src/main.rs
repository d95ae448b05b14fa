//! `stratus-headless`: run the stock frame loop without a window system.

use std::process::ExitCode;

use stratus_app::{App, AppArgs, AppContext, AppHandler, AssetRequest, DefaultAppArgs};
use stratus_core::math::{Vec3, quat_from_rotation_y};
use stratus_core::scene::{Light, MeshHandle, PointLight, SpotLight, Transform};
use stratus_graphics::FrameOutcome;

/// Orbit radius of the camera.
const ORBIT_RADIUS: f32 = 12.0;

/// A procedurally generated mesh; only its size matters to the loop.
struct ProceduralMesh {
    name: String,
    vertex_count: u32,
}

fn grid_mesh(name: &str, resolution: u32) -> Result<ProceduralMesh, String> {
    if resolution == 0 {
        return Err(format!("{name}: grid resolution must be positive"));
    }
    Ok(ProceduralMesh {
        name: name.to_string(),
        vertex_count: (resolution + 1) * (resolution + 1),
    })
}

/// Demo scene: a terrain tile, a ring of cubes and a few lights.
#[derive(Default)]
struct DemoScene {
    meshes: u32,
    presented: u64,
}

impl AppHandler for DemoScene {
    type Asset = ProceduralMesh;

    fn asset_requests(&mut self) -> Vec<AssetRequest<ProceduralMesh>> {
        vec![
            AssetRequest::new("terrain", || grid_mesh("terrain", 64)),
            AssetRequest::new("cube", || {
                Ok(ProceduralMesh {
                    name: "cube".to_string(),
                    vertex_count: 24,
                })
            }),
            AssetRequest::new("pillar", || grid_mesh("pillar", 8)),
        ]
    }

    fn on_init(&mut self, ctx: &mut AppContext, assets: Vec<ProceduralMesh>) {
        for mesh in &assets {
            log::debug!("Mesh '{}' with {} vertices", mesh.name, mesh.vertex_count);
        }
        self.meshes = assets.len() as u32;

        let scene = ctx.scene_mut();
        let ground = scene.spawn("ground");
        scene.set_transform(ground, Transform::identity().with_uniform_scale(50.0));
        scene.set_mesh(ground, Some(MeshHandle(0)));

        let ring = scene.spawn("ring");
        for i in 0..12 {
            let angle = i as f32 / 12.0 * std::f32::consts::TAU;
            let cube = scene.spawn(format!("cube_{i}"));
            scene.set_transform(
                cube,
                Transform::from_translation(Vec3::new(angle.cos() * 6.0, 1.0, angle.sin() * 6.0))
                    .with_rotation(quat_from_rotation_y(angle)),
            );
            scene.set_mesh(cube, Some(MeshHandle(1 + i % (self.meshes.max(2) - 1))));
            scene.set_parent(cube, Some(ring));

            if i % 3 == 0 {
                scene.set_light(
                    cube,
                    Some(Light::Point(PointLight {
                        color: Vec3::new(1.0, 0.6, 0.3),
                        intensity: 8.0,
                        range: 6.0,
                    })),
                );
            }
        }

        let lamp = scene.spawn("lamp");
        scene.set_transform(lamp, Transform::from_translation(Vec3::new(0.0, 8.0, 0.0)));
        scene.set_light(
            lamp,
            Some(Light::Spot(SpotLight {
                color: Vec3::new(1.0, 1.0, 1.0),
                intensity: 20.0,
                range: 20.0,
                inner_angle: 20.0_f32.to_radians(),
                outer_angle: 30.0_f32.to_radians(),
            })),
        );
    }

    fn on_update(&mut self, ctx: &mut AppContext) -> bool {
        let angle = ctx.elapsed_time() * 0.25;
        let camera = ctx.camera_mut();
        camera.position = Vec3::new(angle.cos() * ORBIT_RADIUS, 5.0, angle.sin() * ORBIT_RADIUS);
        camera.target = Vec3::zeros();
        true
    }

    fn on_resize(&mut self, ctx: &mut AppContext) {
        log::info!("Resized to {}x{}", ctx.width(), ctx.height());
    }

    fn on_frame(&mut self, ctx: &mut AppContext, outcome: &FrameOutcome) {
        match outcome {
            FrameOutcome::Presented { slot, .. } => {
                self.presented += 1;
                log::trace!("Frame {} presented from slot {:?}", ctx.frame_number(), slot);
            }
            FrameOutcome::Skipped => log::debug!("Frame {} skipped", ctx.frame_number()),
            _ => {}
        }
    }
}

fn main() -> ExitCode {
    let args = DefaultAppArgs::parse();
    stratus_app::init_logging(args.log_filter());

    stratus_core::init();
    stratus_graphics::init();
    stratus_app::init();

    if args.max_frames().is_none() {
        log::warn!("No --max-frames given; the loop runs until interrupted");
    }

    let mut app = match App::new(DemoScene::default(), args) {
        Ok(app) => app,
        Err(error) => {
            log::error!("Failed to start: {}", error);
            return ExitCode::FAILURE;
        }
    };

    let result = app.run();
    let total_gpu_ms = app.renderer().metrics().total_gpu_time_ms();
    let presented = app.handler().presented;
    if let Err(error) = app.shutdown() {
        log::error!("Shutdown failed: {}", error);
        return ExitCode::FAILURE;
    }

    match result {
        Ok(summary) => {
            log::info!(
                "Presented {} of {} iterations; last frame GPU time {:.3} ms",
                presented,
                summary.iterations,
                total_gpu_ms
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            log::error!("Frame loop failed: {}", error);
            ExitCode::FAILURE
        }
    }
}
