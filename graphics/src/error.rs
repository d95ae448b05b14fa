//! Graphics error types.
//!
//! [`GraphicsError`] is the crate-wide error. Narrower errors raised by the
//! pass graph, the resource registry and the backend convert into it, so
//! callers can propagate everything with `?`.

use thiserror::Error;

use crate::backend::BackendError;
use crate::graph::GraphError;
use crate::resources::RegistryError;
use crate::scheduler::FrameStage;

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphicsError {
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The pass graph is misconfigured.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// A registry declaration or lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The backend rejected an operation.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// A pass body failed; the frame is abandoned.
    #[error("pass '{pass}' failed: {source}")]
    PassFailed {
        pass: String,
        #[source]
        source: Box<GraphicsError>,
    },
    /// A frame stage was invoked out of order.
    #[error("frame stage {requested:?} requested while in {current:?}")]
    InvalidFrameStage {
        current: FrameStage,
        requested: FrameStage,
    },
    /// The surface was lost and needs to be recreated.
    #[error("surface lost, needs recreation")]
    SurfaceLost,
}

impl GraphicsError {
    /// Returns `true` for configuration errors, which must abort startup.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Graph(err) => err.is_configuration(),
            Self::Registry(err) => err.is_configuration(),
            _ => false,
        }
    }
}
