//! Main application struct and frame loop.

use std::sync::Arc;

use stratus_graphics::{
    DummyBackend, Extent3d, FrameOutcome, GraphicsDevice, HeadlessSurface, Renderer, WindowState,
};

use crate::args::AppArgs;
use crate::assets::load_all;
use crate::context::AppContext;
use crate::error::AppError;
use crate::handler::AppHandler;
use crate::window::{ScriptedEvent, ScriptedWindow};

/// Images in the offscreen surface when no frame count is requested.
pub const DEFAULT_SURFACE_IMAGES: u32 = 2;

/// Counts of loop outcomes over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Iterations that did not close the loop.
    pub iterations: u64,
    pub presented: u64,
    pub skipped: u64,
    pub resized: u64,
}

/// Headless application driving the stock renderer.
///
/// The `App` struct is generic over:
/// - `H`: The handler type that implements [`AppHandler`]
/// - `A`: The arguments type that implements [`AppArgs`]
///
/// # Example
///
/// ```ignore
/// use stratus_app::{App, AppArgs, DefaultAppArgs};
///
/// let args = DefaultAppArgs::parse();
/// let summary = App::new(MyHandler, args)?.run()?;
/// ```
pub struct App<H, A>
where
    H: AppHandler,
    A: AppArgs,
{
    handler: H,
    args: A,
    renderer: Renderer<HeadlessSurface>,
    window: ScriptedWindow,
    context: AppContext,
}

impl<H, A> App<H, A>
where
    H: AppHandler,
    A: AppArgs,
{
    /// Create the software device, the offscreen surface and the renderer.
    pub fn new(handler: H, args: A) -> Result<Self, AppError> {
        let (width, height) = (args.width(), args.height());
        let device = GraphicsDevice::new(Arc::new(DummyBackend::new()));
        let surface = HeadlessSurface::new(
            Extent3d::new_2d(width, height),
            args.frames_in_flight().unwrap_or(DEFAULT_SURFACE_IMAGES),
        );
        let mut renderer = Renderer::new(device, surface, args.renderer_config())?;
        if args.acquire_failures() > 0 {
            renderer
                .surface_mut()
                .fail_next_acquires(args.acquire_failures());
        }

        let mut window = ScriptedWindow::new(width, height);
        if let Some((frame, width, height)) = args.resize_at() {
            window = window.with_event(frame, ScriptedEvent::Resize { width, height });
        }

        log::info!(
            "App: {}x{} with {} frame slots",
            width,
            height,
            renderer.scheduler().ring_size()
        );

        Ok(Self {
            context: AppContext::new(width, height, args.frame_time()),
            handler,
            args,
            renderer,
            window,
        })
    }

    /// Load assets, then run the loop until the window closes.
    pub fn run(&mut self) -> Result<RunSummary, AppError> {
        let requests = self.handler.asset_requests();
        let assets = load_all(requests, self.args.asset_workers())?;
        self.handler.on_init(&mut self.context, assets);

        let max_frames = self.args.max_frames();
        let mut summary = RunSummary::default();

        loop {
            let frame = self.context.frame_number;
            self.window.advance(frame);
            if max_frames.is_some_and(|max| frame >= max) {
                self.window.request_close();
            }
            if !self.window.close_requested() && !self.handler.on_update(&mut self.context) {
                log::info!("App: handler stopped the loop at frame {}", frame);
                self.window.request_close();
            }

            let snapshot = self.context.scene.snapshot();
            let outcome = self.renderer.render_frame(
                &mut self.window,
                &self.context.camera,
                &snapshot,
                self.context.delta_time,
            )?;

            match outcome {
                FrameOutcome::CloseRequested => break,
                FrameOutcome::Presented { .. } => summary.presented += 1,
                FrameOutcome::Skipped => summary.skipped += 1,
                FrameOutcome::Resized(extent) => {
                    summary.resized += 1;
                    self.context.resize(extent.width, extent.height);
                    self.handler.on_resize(&mut self.context);
                }
            }
            self.handler.on_frame(&mut self.context, &outcome);
            summary.iterations += 1;
            self.context.advance();
        }

        self.handler.on_shutdown(&mut self.context);
        log::info!(
            "App: {} iterations, {} presented, {} skipped, {} resized",
            summary.iterations,
            summary.presented,
            summary.skipped,
            summary.resized
        );
        Ok(summary)
    }

    pub fn renderer(&self) -> &Renderer<HeadlessSurface> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<HeadlessSurface> {
        &mut self.renderer
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Wait for the device and release every resource.
    pub fn shutdown(self) -> Result<(), AppError> {
        self.renderer.shutdown()?;
        Ok(())
    }
}
