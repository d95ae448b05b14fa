//! Command line arguments trait and default implementation.
//!
//! Uses clap for CLI parsing with help text (`--help`) and validation.

use stratus_graphics::RendererConfig;

/// Trait for the options the headless driver reads.
///
/// Every method has a default, so custom implementations only override the
/// options they care about.
pub trait AppArgs: Sized {
    /// Parse command line arguments.
    fn parse() -> Self;

    /// Initial drawable width.
    ///
    /// Default: 1280
    fn width(&self) -> u32 {
        1280
    }

    /// Initial drawable height.
    ///
    /// Default: 720
    fn height(&self) -> u32 {
        720
    }

    /// Loop iterations to run before closing.
    ///
    /// Default: `None` (run until the handler stops)
    fn max_frames(&self) -> Option<u64> {
        None
    }

    /// Frame slots to request; `None` follows the surface.
    fn frames_in_flight(&self) -> Option<u32> {
        None
    }

    /// Iteration at which the window is resized, with the new size.
    fn resize_at(&self) -> Option<(u64, u32, u32)> {
        None
    }

    /// Number of initial acquires that report no image.
    fn acquire_failures(&self) -> u32 {
        0
    }

    /// Samples kept per metric category.
    ///
    /// Default: 2000
    fn history_capacity(&self) -> usize {
        2000
    }

    /// Simulated seconds per loop iteration.
    ///
    /// Default: 1/60
    fn frame_time(&self) -> f32 {
        1.0 / 60.0
    }

    /// Threads used by the asset join point.
    ///
    /// Default: 4
    fn asset_workers(&self) -> usize {
        4
    }

    /// `env_logger` filter directive.
    ///
    /// Default: "info"
    fn log_filter(&self) -> &str {
        "info"
    }

    /// Renderer configuration derived from these arguments.
    fn renderer_config(&self) -> RendererConfig {
        let config = RendererConfig::default().with_history_capacity(self.history_capacity());
        match self.frames_in_flight() {
            Some(frames) => config.with_frames_in_flight(frames),
            None => config,
        }
    }
}

/// Default command line arguments implementation.
///
/// # Examples
///
/// ```bash
/// # Show help
/// ./stratus-headless --help
///
/// # Render 120 frames at 1920x1080 with three frame slots
/// ./stratus-headless --max-frames 120 --width 1920 --height 1080 --frames-in-flight 3
///
/// # Resize to 800x600 on iteration 30 and drop the first two acquires
/// ./stratus-headless --resize-at 30 --resize-to 800x600 --acquire-failures 2
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultAppArgs {
    width: u32,
    height: u32,
    max_frames: Option<u64>,
    frames_in_flight: Option<u32>,
    resize_at: Option<(u64, u32, u32)>,
    acquire_failures: u32,
    history_capacity: usize,
    frame_time: f32,
    asset_workers: usize,
    log_filter: String,
}

impl Default for DefaultAppArgs {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            max_frames: None,
            frames_in_flight: None,
            resize_at: None,
            acquire_failures: 0,
            history_capacity: 2000,
            frame_time: 1.0 / 60.0,
            asset_workers: 4,
            log_filter: "info".to_string(),
        }
    }
}

impl DefaultAppArgs {
    /// Set the initial drawable size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the maximum number of loop iterations.
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Request a number of frame slots.
    pub fn with_frames_in_flight(mut self, frames: u32) -> Self {
        self.frames_in_flight = Some(frames);
        self
    }

    /// Resize the window to `width`x`height` at iteration `frame`.
    pub fn with_resize_at(mut self, frame: u64, width: u32, height: u32) -> Self {
        self.resize_at = Some((frame, width, height));
        self
    }

    /// Make the first `count` acquires fail.
    pub fn with_acquire_failures(mut self, count: u32) -> Self {
        self.acquire_failures = count;
        self
    }

    /// Set the per-category metric history.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Set the asset worker count.
    pub fn with_asset_workers(mut self, workers: usize) -> Self {
        self.asset_workers = workers;
        self
    }
}

// ============================================================================
// Native implementation using clap
// ============================================================================

mod native {
    use super::*;
    use clap::Parser;

    /// Stratus headless frame-loop driver.
    #[derive(Parser, Debug)]
    #[command(
        name = "stratus-headless",
        about = "Run the Stratus frame loop against a software device",
        long_about = "Runs the stock deferred frame on the software backend with an \
            offscreen surface.\n\n\
            EXAMPLES:\n\
              # Smoke test\n\
              ./stratus-headless --max-frames 10\n\
            \n\
              # Exercise resize and skipped frames\n\
              ./stratus-headless --max-frames 60 --resize-at 20 --resize-to 640x360 --acquire-failures 3",
        version
    )]
    pub(super) struct ClapArgs {
        /// Initial drawable width in pixels.
        #[arg(long, default_value = "1280")]
        pub width: u32,

        /// Initial drawable height in pixels.
        #[arg(long, default_value = "720")]
        pub height: u32,

        /// Exit after N loop iterations.
        #[arg(long)]
        pub max_frames: Option<u64>,

        /// Frame slots in the uniform ring (defaults to the surface's limit).
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        pub frames_in_flight: Option<u32>,

        /// Iteration at which the window is resized.
        #[arg(long, requires = "resize_to")]
        pub resize_at: Option<u64>,

        /// New drawable size, as WIDTHxHEIGHT.
        #[arg(long, requires = "resize_at", value_parser = parse_size)]
        pub resize_to: Option<(u32, u32)>,

        /// Number of initial acquires that report no image.
        #[arg(long, default_value = "0")]
        pub acquire_failures: u32,

        /// Samples kept per GPU timing category.
        #[arg(long, default_value = "2000")]
        pub history_capacity: usize,

        /// Simulated frames per second.
        #[arg(long, default_value = "60", value_parser = clap::value_parser!(u32).range(1..))]
        pub fps: u32,

        /// Threads used to decode assets before the loop starts.
        #[arg(long, default_value = "4")]
        pub asset_workers: usize,

        /// Log filter passed to env_logger (e.g. "debug" or "stratus_graphics=trace").
        #[arg(long, default_value = "info")]
        pub log: String,
    }

    pub(super) fn parse_size(value: &str) -> Result<(u32, u32), String> {
        let (width, height) = value
            .split_once('x')
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
        let width = width
            .trim()
            .parse()
            .map_err(|e| format!("invalid width '{width}': {e}"))?;
        let height = height
            .trim()
            .parse()
            .map_err(|e| format!("invalid height '{height}': {e}"))?;
        Ok((width, height))
    }

    impl From<ClapArgs> for DefaultAppArgs {
        fn from(args: ClapArgs) -> Self {
            let resize_at = match (args.resize_at, args.resize_to) {
                (Some(frame), Some((width, height))) => Some((frame, width, height)),
                _ => None,
            };

            Self {
                width: args.width,
                height: args.height,
                max_frames: args.max_frames,
                frames_in_flight: args.frames_in_flight,
                resize_at,
                acquire_failures: args.acquire_failures,
                history_capacity: args.history_capacity,
                frame_time: 1.0 / args.fps as f32,
                asset_workers: args.asset_workers,
                log_filter: args.log,
            }
        }
    }
}

impl DefaultAppArgs {
    /// Parse from an explicit argument list instead of the process arguments.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        use clap::Parser;
        Ok(native::ClapArgs::try_parse_from(args)?.into())
    }
}

impl AppArgs for DefaultAppArgs {
    fn parse() -> Self {
        use clap::Parser;
        native::ClapArgs::parse().into()
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn max_frames(&self) -> Option<u64> {
        self.max_frames
    }

    fn frames_in_flight(&self) -> Option<u32> {
        self.frames_in_flight
    }

    fn resize_at(&self) -> Option<(u64, u32, u32)> {
        self.resize_at
    }

    fn acquire_failures(&self) -> u32 {
        self.acquire_failures
    }

    fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    fn frame_time(&self) -> f32 {
        self.frame_time
    }

    fn asset_workers(&self) -> usize {
        self.asset_workers
    }

    fn log_filter(&self) -> &str {
        &self.log_filter
    }
}
