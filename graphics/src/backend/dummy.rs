//! Software GPU backend for testing and headless runs.
//!
//! This backend doesn't touch GPU hardware. It keeps buffers as byte
//! vectors and images as a single texel value, executes the recorded
//! commands that have observable effects (clears, copies, buffer writes,
//! host kernels) and advances a virtual clock so timestamp queries produce
//! plausible durations.
//!
//! By default a submission executes and completes immediately. With
//! [`DummyBackend::with_manual_completion`] submissions stay pending until
//! waited on, which models frames still in flight.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use super::kernel::{SoftTexture, SoftwareMemory};
use super::{Backend, BackendError, HostKernel, KernelContext, ResourceId, SubmissionIndex};
use crate::command::{Command, CommandStream};
use crate::types::{BufferDescriptor, TextureDescriptor};

/// Nanoseconds per virtual clock tick.
const TICK_NS: f32 = 1000.0;

/// A submission kept for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    pub index: SubmissionIndex,
    pub commands: Vec<Command>,
}

#[derive(Debug, Default)]
struct DummyState {
    memory: SoftwareMemory,
    next_submission: u64,
    completed: Option<SubmissionIndex>,
    pending: VecDeque<(SubmissionIndex, CommandStream)>,
    log: VecDeque<SubmissionRecord>,
    timestamps: HashMap<u32, u64>,
    clock: u64,
}

/// Software GPU backend.
pub struct DummyBackend {
    state: Mutex<DummyState>,
    kernels: RwLock<HashMap<String, Arc<dyn HostKernel>>>,
    manual_completion: bool,
    log_capacity: usize,
    timestamps_enabled: AtomicBool,
}

impl fmt::Debug for DummyBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyBackend")
            .field("manual_completion", &self.manual_completion)
            .field("kernels", &self.kernels.read().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyBackend {
    /// Default number of submissions kept in the inspection log.
    pub const DEFAULT_LOG_CAPACITY: usize = 64;

    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DummyState::default()),
            kernels: RwLock::new(HashMap::new()),
            manual_completion: false,
            log_capacity: Self::DEFAULT_LOG_CAPACITY,
            timestamps_enabled: AtomicBool::new(true),
        }
    }

    /// Keep submissions pending until `wait_for`/`wait_idle`.
    pub fn with_manual_completion(mut self, manual: bool) -> Self {
        self.manual_completion = manual;
        self
    }

    /// Set how many submissions the inspection log keeps.
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Enable or disable timestamp resolution.
    ///
    /// While disabled, every query reads back as unresolved.
    pub fn set_timestamps_enabled(&self, enabled: bool) {
        self.timestamps_enabled.store(enabled, Ordering::Release);
    }

    /// Submissions executed so far, oldest first (bounded by the log capacity).
    pub fn submission_log(&self) -> Vec<SubmissionRecord> {
        self.state.lock().log.iter().cloned().collect()
    }

    /// Number of submitted streams that have not executed yet.
    pub fn pending_submissions(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Number of live textures.
    pub fn live_texture_count(&self) -> usize {
        self.state.lock().memory.textures.len()
    }

    /// Number of live buffers.
    pub fn live_buffer_count(&self) -> usize {
        self.state.lock().memory.buffers.len()
    }

    /// Whether a texture with this id is alive.
    pub fn has_texture(&self, id: ResourceId) -> bool {
        self.state.lock().memory.textures.contains_key(&id)
    }

    /// Current texel value of a texture (`None` if the texture is unknown).
    pub fn texture_value(&self, id: ResourceId) -> Option<Option<[f32; 4]>> {
        self.state
            .lock()
            .memory
            .textures
            .get(&id)
            .map(|texture| texture.contents)
    }

    /// Overwrite a texture's contents directly, bypassing the command stream.
    pub fn set_texture_value(
        &self,
        id: ResourceId,
        value: Option<[f32; 4]>,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        let texture = state
            .memory
            .textures
            .get_mut(&id)
            .ok_or(BackendError::UnknownTexture(id))?;
        texture.contents = value;
        Ok(())
    }

    fn execute_until(&self, state: &mut DummyState, last: SubmissionIndex) -> Result<(), BackendError> {
        while let Some((index, _)) = state.pending.front() {
            if *index > last {
                break;
            }
            let Some((index, stream)) = state.pending.pop_front() else {
                break;
            };
            self.execute(state, index, stream)?;
        }
        Ok(())
    }

    fn execute(
        &self,
        state: &mut DummyState,
        index: SubmissionIndex,
        stream: CommandStream,
    ) -> Result<(), BackendError> {
        log::trace!(
            "DummyBackend: executing submission {} ({} commands)",
            index.0,
            stream.len()
        );
        let timestamps = self.timestamps_enabled.load(Ordering::Acquire);
        state.timestamps.clear();

        for command in stream.iter() {
            state.clock += command_cost(command);
            match command {
                Command::WriteTimestamp { query } => {
                    if timestamps {
                        let clock = state.clock;
                        state.timestamps.insert(*query, clock);
                    }
                }
                Command::ClearTexture { texture, value } => {
                    let target = state
                        .memory
                        .textures
                        .get_mut(texture)
                        .ok_or(BackendError::UnknownTexture(*texture))?;
                    target.contents = value.as_texel();
                }
                Command::DiscardTexture { texture } => {
                    if let Some(target) = state.memory.textures.get_mut(texture) {
                        target.contents = None;
                    }
                }
                Command::CopyTexture { src, dst } => {
                    let source = state
                        .memory
                        .textures
                        .get(src)
                        .ok_or(BackendError::UnknownTexture(*src))?;
                    let (size, format, contents) = (
                        source.descriptor.size,
                        source.descriptor.format,
                        source.contents,
                    );
                    let target = state
                        .memory
                        .textures
                        .get_mut(dst)
                        .ok_or(BackendError::UnknownTexture(*dst))?;
                    if target.descriptor.size != size || target.descriptor.format != format {
                        return Err(BackendError::CopyMismatch(format!(
                            "{src} ({size:?}, {format:?}) -> {dst} ({:?}, {:?})",
                            target.descriptor.size, target.descriptor.format
                        )));
                    }
                    target.contents = contents;
                }
                Command::CopyBuffer {
                    src,
                    src_offset,
                    dst,
                    dst_offset,
                    size,
                } => {
                    let source = state
                        .memory
                        .buffers
                        .get(src)
                        .ok_or(BackendError::UnknownBuffer(*src))?;
                    let range = checked_range(*src_offset, *size, source.len())?;
                    let bytes = source[range].to_vec();
                    let target = state
                        .memory
                        .buffers
                        .get_mut(dst)
                        .ok_or(BackendError::UnknownBuffer(*dst))?;
                    let range = checked_range(*dst_offset, *size, target.len())?;
                    target[range].copy_from_slice(&bytes);
                }
                Command::WriteBuffer {
                    buffer,
                    offset,
                    data,
                } => {
                    let target = state
                        .memory
                        .buffers
                        .get_mut(buffer)
                        .ok_or(BackendError::UnknownBuffer(*buffer))?;
                    let range = checked_range(*offset, data.len() as u64, target.len())?;
                    target[range].copy_from_slice(data);
                }
                Command::Dispatch {
                    pipeline,
                    groups,
                    bindings,
                    push_constants,
                } => {
                    let kernel = self.kernels.read().get(pipeline).cloned();
                    if let Some(kernel) = kernel {
                        let mut ctx = KernelContext::new(
                            pipeline,
                            *groups,
                            bindings,
                            push_constants,
                            &mut state.memory,
                        );
                        kernel.dispatch(&mut ctx)?;
                    }
                }
                Command::BeginPass { .. }
                | Command::EndPass
                | Command::Barrier(_)
                | Command::Draw { .. } => {}
            }
        }

        state.completed = Some(index);
        if self.log_capacity > 0 {
            if state.log.len() == self.log_capacity {
                state.log.pop_front();
            }
            state.log.push_back(SubmissionRecord {
                index,
                commands: stream.into_commands(),
            });
        }
        Ok(())
    }
}

fn command_cost(command: &Command) -> u64 {
    match command {
        Command::Draw { instance_count, .. } => 40 * u64::from((*instance_count).max(1)),
        Command::Dispatch { .. } => 25,
        Command::CopyTexture { .. } | Command::CopyBuffer { .. } => 10,
        Command::ClearTexture { .. } | Command::WriteBuffer { .. } => 5,
        Command::Barrier(_) => 1,
        _ => 0,
    }
}

fn checked_range(
    offset: u64,
    size: u64,
    capacity: usize,
) -> Result<std::ops::Range<usize>, BackendError> {
    let capacity = capacity as u64;
    match offset.checked_add(size) {
        Some(end) if end <= capacity => Ok(offset as usize..end as usize),
        _ => Err(BackendError::OutOfBounds {
            offset,
            size,
            capacity,
        }),
    }
}

impl Backend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_texture(
        &self,
        id: ResourceId,
        descriptor: &TextureDescriptor,
    ) -> Result<(), BackendError> {
        if descriptor.size.is_empty() {
            return Err(BackendError::ResourceCreationFailed(format!(
                "texture {:?} has zero size",
                descriptor.label
            )));
        }
        log::trace!(
            "DummyBackend: creating texture {:?} {} ({}x{}, {} mips)",
            descriptor.label,
            id,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.mip_level_count
        );
        self.state.lock().memory.textures.insert(
            id,
            SoftTexture {
                descriptor: descriptor.clone(),
                contents: None,
            },
        );
        Ok(())
    }

    fn destroy_texture(&self, id: ResourceId) {
        log::trace!("DummyBackend: destroying texture {}", id);
        self.state.lock().memory.textures.remove(&id);
    }

    fn create_buffer(
        &self,
        id: ResourceId,
        descriptor: &BufferDescriptor,
    ) -> Result<(), BackendError> {
        log::trace!(
            "DummyBackend: creating buffer {:?} {} (size: {})",
            descriptor.label,
            id,
            descriptor.size
        );
        self.state
            .lock()
            .memory
            .buffers
            .insert(id, vec![0; descriptor.size as usize]);
        Ok(())
    }

    fn destroy_buffer(&self, id: ResourceId) {
        log::trace!("DummyBackend: destroying buffer {}", id);
        self.state.lock().memory.buffers.remove(&id);
    }

    fn write_buffer(&self, id: ResourceId, offset: u64, data: &[u8]) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        let buffer = state
            .memory
            .buffers
            .get_mut(&id)
            .ok_or(BackendError::UnknownBuffer(id))?;
        let range = checked_range(offset, data.len() as u64, buffer.len())?;
        buffer[range].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, id: ResourceId, offset: u64, size: u64) -> Result<Vec<u8>, BackendError> {
        let state = self.state.lock();
        let buffer = state
            .memory
            .buffers
            .get(&id)
            .ok_or(BackendError::UnknownBuffer(id))?;
        let range = checked_range(offset, size, buffer.len())?;
        Ok(buffer[range].to_vec())
    }

    fn submit(&self, stream: CommandStream) -> Result<SubmissionIndex, BackendError> {
        let mut state = self.state.lock();
        let index = SubmissionIndex(state.next_submission);
        state.next_submission += 1;
        if self.manual_completion {
            state.pending.push_back((index, stream));
        } else {
            self.execute(&mut state, index, stream)?;
        }
        Ok(index)
    }

    fn completed_submission(&self) -> Option<SubmissionIndex> {
        self.state.lock().completed
    }

    fn wait_for(&self, submission: SubmissionIndex) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        self.execute_until(&mut state, submission)
    }

    fn wait_idle(&self) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        let last = match state.pending.back() {
            Some((index, _)) => *index,
            None => return Ok(()),
        };
        self.execute_until(&mut state, last)
    }

    fn timestamp_period_ns(&self) -> f32 {
        TICK_NS
    }

    fn read_timestamps(&self, first_query: u32, count: u32) -> Vec<Option<u64>> {
        let state = self.state.lock();
        (first_query..first_query.saturating_add(count))
            .map(|query| state.timestamps.get(&query).copied())
            .collect()
    }

    fn register_kernel(&self, pipeline: &str, kernel: Arc<dyn HostKernel>) -> bool {
        log::debug!("DummyBackend: registered host kernel '{}'", pipeline);
        self.kernels.write().insert(pipeline.to_string(), kernel);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Binding;
    use crate::types::{BufferUsage, ClearValue, TextureFormat, TextureUsage};

    fn texture_desc(width: u32, height: u32) -> TextureDescriptor {
        TextureDescriptor::new_2d(
            width,
            height,
            TextureFormat::Rgba16Float,
            TextureUsage::COPY_SRC | TextureUsage::COPY_DST,
        )
    }

    fn stream(commands: Vec<Command>) -> CommandStream {
        CommandStream::from(commands)
    }

    #[test]
    fn test_buffer_write_and_read() {
        let backend = DummyBackend::new();
        let id = ResourceId::new(1);
        backend
            .create_buffer(id, &BufferDescriptor::new(16, BufferUsage::MAP_WRITE))
            .unwrap();
        backend.write_buffer(id, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(backend.read_buffer(id, 4, 4).unwrap(), vec![1, 2, 3, 4]);
        assert!(matches!(
            backend.write_buffer(id, 14, &[0; 4]),
            Err(BackendError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_zero_sized_texture_fails() {
        let backend = DummyBackend::new();
        let result = backend.create_texture(ResourceId::new(1), &texture_desc(0, 4));
        assert!(matches!(result, Err(BackendError::ResourceCreationFailed(_))));
    }

    #[test]
    fn test_timestamps_resolve_after_execution() {
        let backend = DummyBackend::new();
        let submitted = backend
            .submit(stream(vec![
                Command::WriteTimestamp { query: 0 },
                Command::Draw {
                    pipeline: "gbuffer".into(),
                    vertex_count: 3,
                    instance_count: 1,
                },
                Command::WriteTimestamp { query: 1 },
            ]))
            .unwrap();
        assert_eq!(backend.completed_submission(), Some(submitted));
        let stamps = backend.read_timestamps(0, 3);
        let (begin, end) = (stamps[0].unwrap(), stamps[1].unwrap());
        assert_eq!(end - begin, 40);
        assert_eq!(stamps[2], None);
    }

    #[test]
    fn test_disabled_timestamps_are_unresolved() {
        let backend = DummyBackend::new();
        backend.set_timestamps_enabled(false);
        backend
            .submit(stream(vec![Command::WriteTimestamp { query: 0 }]))
            .unwrap();
        assert_eq!(backend.read_timestamps(0, 1), vec![None]);
    }

    #[test]
    fn test_manual_completion_defers_execution() {
        let backend = DummyBackend::new().with_manual_completion(true);
        let first = backend.submit(CommandStream::default()).unwrap();
        let second = backend.submit(CommandStream::default()).unwrap();
        assert_eq!(backend.pending_submissions(), 2);
        assert_eq!(backend.completed_submission(), None);

        backend.wait_for(first).unwrap();
        assert_eq!(backend.completed_submission(), Some(first));
        backend.wait_idle().unwrap();
        assert_eq!(backend.completed_submission(), Some(second));
        assert_eq!(backend.pending_submissions(), 0);
    }

    #[test]
    fn test_clear_and_copy_texture() {
        let backend = DummyBackend::new();
        let (a, b) = (ResourceId::new(1), ResourceId::new(2));
        backend.create_texture(a, &texture_desc(4, 4)).unwrap();
        backend.create_texture(b, &texture_desc(4, 4)).unwrap();

        backend
            .submit(stream(vec![
                Command::ClearTexture {
                    texture: a,
                    value: ClearValue::color(0.5, 0.5, 0.5, 1.0),
                },
                Command::CopyTexture { src: a, dst: b },
            ]))
            .unwrap();
        assert_eq!(backend.texture_value(b), Some(Some([0.5, 0.5, 0.5, 1.0])));
    }

    #[test]
    fn test_copy_texture_size_mismatch() {
        let backend = DummyBackend::new();
        let (a, b) = (ResourceId::new(1), ResourceId::new(2));
        backend.create_texture(a, &texture_desc(4, 4)).unwrap();
        backend.create_texture(b, &texture_desc(2, 2)).unwrap();
        assert!(matches!(
            backend.submit(stream(vec![Command::CopyTexture { src: a, dst: b }])),
            Err(BackendError::CopyMismatch(_))
        ));
    }

    #[test]
    fn test_registered_kernel_runs_on_dispatch() {
        let backend = DummyBackend::new();
        let buffer = ResourceId::new(7);
        backend
            .create_buffer(buffer, &BufferDescriptor::new(4, BufferUsage::STORAGE))
            .unwrap();
        let kernel = |ctx: &mut KernelContext<'_>| -> Result<(), BackendError> {
            let value: u32 = ctx.push_constants()?;
            ctx.buffer_mut(0)?.copy_from_slice(&value.to_le_bytes());
            Ok(())
        };
        assert!(backend.register_kernel("fill", Arc::new(kernel)));

        backend
            .submit(stream(vec![Command::Dispatch {
                pipeline: "fill".into(),
                groups: [1, 1, 1],
                bindings: vec![Binding::Buffer(buffer)],
                push_constants: 42u32.to_le_bytes().to_vec(),
            }]))
            .unwrap();
        assert_eq!(backend.read_buffer(buffer, 0, 4).unwrap(), 42u32.to_le_bytes());
    }

    #[test]
    fn test_submission_log_is_bounded() {
        let backend = DummyBackend::new().with_log_capacity(2);
        for _ in 0..5 {
            backend.submit(CommandStream::default()).unwrap();
        }
        let log = backend.submission_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].index, SubmissionIndex(3));
        assert_eq!(log[1].index, SubmissionIndex(4));
    }
}
