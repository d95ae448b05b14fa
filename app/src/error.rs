//! Driver error type.

use stratus_graphics::GraphicsError;

use crate::assets::AssetError;

/// Errors that stop the headless driver.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("renderer error: {0}")]
    Graphics(#[from] GraphicsError),

    #[error("asset loading failed: {0}")]
    Asset(#[from] AssetError),
}
