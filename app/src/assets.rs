//! Asset loading join point.
//!
//! Requests are decoded on a bounded set of scoped worker threads. The call
//! returns only after every worker has been joined, so the frame loop never
//! observes a partially loaded asset set.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use parking_lot::Mutex;

/// Errors that can occur while loading assets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    /// The decode function of a request reported a failure.
    #[error("failed to decode asset '{name}': {reason}")]
    Decode { name: String, reason: String },

    /// A worker panicked while decoding a request.
    #[error("asset worker panicked while decoding '{name}'")]
    WorkerPanicked { name: String },
}

type DecodeFn<T> = Box<dyn FnOnce() -> Result<T, String> + Send>;

/// A named unit of work producing one decoded asset.
pub struct AssetRequest<T> {
    name: String,
    decode: DecodeFn<T>,
}

impl<T> AssetRequest<T> {
    /// Create a request that runs `decode` on a worker thread.
    pub fn new<F>(name: impl Into<String>, decode: F) -> Self
    where
        F: FnOnce() -> Result<T, String> + Send + 'static,
    {
        Self {
            name: name.into(),
            decode: Box::new(decode),
        }
    }

    /// Name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> fmt::Debug for AssetRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetRequest")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Decode every request on at most `workers` threads.
///
/// Returns the decoded assets in request order, or the failure of the
/// lowest-indexed request that failed. Once a failure is seen, requests not
/// yet started are skipped.
pub fn load_all<T: Send>(
    requests: Vec<AssetRequest<T>>,
    workers: usize,
) -> Result<Vec<T>, AssetError> {
    stratus_core::profile_function!();

    let count = requests.len();
    if count == 0 {
        return Ok(Vec::new());
    }
    let workers = workers.clamp(1, count);
    log::info!("Loading {} assets on {} workers", count, workers);

    let names: Vec<String> = requests.iter().map(|r| r.name.clone()).collect();
    let queue: Mutex<VecDeque<(usize, AssetRequest<T>)>> =
        Mutex::new(requests.into_iter().enumerate().collect());
    let results: Mutex<Vec<Option<Result<T, AssetError>>>> =
        Mutex::new((0..count).map(|_| None).collect());
    let failed = AtomicBool::new(false);

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let queue = &queue;
                let results = &results;
                let failed = &failed;
                scope.spawn(move || {
                    stratus_core::profile_scope!("asset_worker");
                    while !failed.load(Ordering::Acquire) {
                        let Some((index, request)) = queue.lock().pop_front() else {
                            break;
                        };
                        log::trace!("Worker {} decoding '{}'", worker, request.name);
                        let AssetRequest { name, decode } = request;
                        let result = decode().map_err(|reason| AssetError::Decode { name, reason });
                        if result.is_err() {
                            failed.store(true, Ordering::Release);
                        }
                        results.lock()[index] = Some(result);
                    }
                })
            })
            .collect();

        for handle in handles {
            if handle.join().is_err() {
                failed.store(true, Ordering::Release);
            }
        }
    });

    let mut assets = Vec::with_capacity(count);
    for (index, slot) in results.into_inner().into_iter().enumerate() {
        match slot {
            Some(Ok(asset)) => assets.push(asset),
            Some(Err(error)) => {
                log::error!("{}", error);
                return Err(error);
            }
            None => {
                let error = AssetError::WorkerPanicked {
                    name: names[index].clone(),
                };
                log::error!("{}", error);
                return Err(error);
            }
        }
    }

    log::info!("Loaded {} assets", assets.len());
    Ok(assets)
}
