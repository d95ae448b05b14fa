//! Application handler trait.

use stratus_graphics::FrameOutcome;

use crate::assets::AssetRequest;
use crate::context::AppContext;

/// Trait for application logic driven by the headless loop.
///
/// # Lifecycle
///
/// 1. `asset_requests` - Called once; the requests are decoded in parallel
/// 2. `on_init` - Called once with every decoded asset, in request order
/// 3. `on_update` - Called every iteration before the frame is rendered
/// 4. `on_resize` - Called after the surface was recreated
/// 5. `on_frame` - Called with the outcome of every iteration
/// 6. `on_shutdown` - Called when the loop ends
///
/// # Example
///
/// ```ignore
/// use stratus_app::{AppContext, AppHandler};
///
/// struct Spinner;
///
/// impl AppHandler for Spinner {
///     type Asset = ();
///
///     fn on_update(&mut self, ctx: &mut AppContext) -> bool {
///         let t = ctx.elapsed_time();
///         ctx.camera_mut().position.x = t.cos() * 5.0;
///         true
///     }
/// }
/// ```
pub trait AppHandler {
    /// Decoded asset type.
    type Asset: Send;

    /// Assets to decode before the loop starts.
    fn asset_requests(&mut self) -> Vec<AssetRequest<Self::Asset>> {
        Vec::new()
    }

    /// Called once all assets are decoded.
    ///
    /// Use this to populate the scene.
    fn on_init(&mut self, _ctx: &mut AppContext, _assets: Vec<Self::Asset>) {}

    /// Called every iteration before drawing.
    ///
    /// Returns `true` to continue running, `false` to exit.
    fn on_update(&mut self, _ctx: &mut AppContext) -> bool {
        true
    }

    /// Called after the surface and size-dependent resources were recreated.
    ///
    /// The new size is available in `ctx.width()` and `ctx.height()`.
    fn on_resize(&mut self, _ctx: &mut AppContext) {}

    /// Called with the outcome of every iteration that did not close.
    fn on_frame(&mut self, _ctx: &mut AppContext, _outcome: &FrameOutcome) {}

    /// Called when the loop ends.
    fn on_shutdown(&mut self, _ctx: &mut AppContext) {}
}
