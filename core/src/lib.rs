//! # Stratus Core
//!
//! Engine-agnostic building blocks shared by the renderer and the app:
//!
//! - [`math`] - nalgebra aliases, projection helpers and wire conversions
//! - [`camera`] - perspective camera model
//! - [`scene`] - entity arena with structure-of-arrays components
//! - [`profiling`] - optional Tracy instrumentation macros

pub mod camera;
pub mod math;
pub mod profiling;
pub mod scene;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core library version.
pub fn init() {
    log::info!("Stratus Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
