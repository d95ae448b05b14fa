//! # Stratus App
//!
//! Headless driver for the Stratus renderer.
//!
//! This crate runs the stock frame loop against the software device and an
//! offscreen surface. Window events come from a frame-indexed script, which
//! makes resize and skipped-frame paths reproducible from the command line.
//!
//! ## Overview
//!
//! - [`AppHandler`] - Trait for scene setup and per-frame logic
//! - [`AppArgs`] - Trait for the driver options, with a clap implementation
//! - [`App`] - Owns the renderer and runs the loop
//! - [`load_all`] - Parallel asset decoding that completes before the loop
//!
//! ## Example
//!
//! ```ignore
//! use stratus_app::{App, AppArgs, AppHandler, DefaultAppArgs};
//!
//! struct Empty;
//!
//! impl AppHandler for Empty {
//!     type Asset = ();
//! }
//!
//! let args = DefaultAppArgs::parse();
//! stratus_app::init_logging(args.log_filter());
//! let summary = App::new(Empty, args)?.run()?;
//! ```

mod app;
mod args;
pub mod assets;
mod context;
mod error;
mod handler;
pub mod window;

pub use app::{App, DEFAULT_SURFACE_IMAGES, RunSummary};
pub use args::{AppArgs, DefaultAppArgs};
pub use assets::{AssetError, AssetRequest, load_all};
pub use context::AppContext;
pub use error::AppError;
pub use handler::AppHandler;
pub use window::{ScriptedEvent, ScriptedWindow};

/// App library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the app subsystem.
pub fn init() {
    log::info!("Stratus App v{} initialized", VERSION);
}

/// Install `env_logger` with `filter` unless `RUST_LOG` overrides it.
///
/// Calling this more than once is harmless.
pub fn init_logging(filter: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .try_init();
}
