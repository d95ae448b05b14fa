//! Pipeline hot-reload seam.
//!
//! Shader and pipeline compilation live outside the frame orchestration.
//! The renderer only asks a [`PipelineReloader`] to reload everything once
//! per loop iteration and logs the outcome. A failed reload never aborts a
//! frame: the previously compiled pipelines stay in use.

/// Outcome of one reload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadStatus {
    /// Nothing changed on disk.
    Unchanged,
    /// At least one pipeline was rebuilt.
    Reloaded,
    /// Compilation failed; the old pipelines remain active.
    Failed(String),
}

/// Something that can rebuild pipelines on request.
pub trait PipelineReloader: Send {
    /// Reload every pipeline whose sources changed.
    fn reload_all(&mut self) -> ReloadStatus;
}

impl<F> PipelineReloader for F
where
    F: FnMut() -> ReloadStatus + Send,
{
    fn reload_all(&mut self) -> ReloadStatus {
        self()
    }
}

/// Log a reload outcome at the matching level.
///
/// Returns `true` if the reload failed.
pub fn report_reload(status: &ReloadStatus) -> bool {
    match status {
        ReloadStatus::Unchanged => false,
        ReloadStatus::Reloaded => {
            log::info!("Pipelines reloaded");
            false
        }
        ReloadStatus::Failed(reason) => {
            log::error!("Pipeline reload failed, keeping previous pipelines: {}", reason);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_reloader() {
        let mut calls = 0;
        let mut reloader = move || {
            calls += 1;
            if calls == 2 {
                ReloadStatus::Failed("syntax error".to_string())
            } else {
                ReloadStatus::Unchanged
            }
        };
        assert_eq!(reloader.reload_all(), ReloadStatus::Unchanged);
        assert!(report_reload(&reloader.reload_all()));
        assert!(!report_reload(&ReloadStatus::Reloaded));
    }
}
