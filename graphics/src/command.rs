//! Recorded GPU commands.
//!
//! Pass bodies do not talk to the backend. They record into a
//! [`CommandEncoder`], and the finished [`CommandStream`] is submitted once
//! per frame by the scheduler.
//!
//! ```text
//! BeginPass("ssao generation")
//!   Barrier(depth: RAW ColorAttachment -> Sampled)
//!   WriteTimestamp(12)
//!   Dispatch("ssao", [120, 68, 1])
//!   WriteTimestamp(13)
//! EndPass
//! ```

use crate::backend::ResourceId;
use crate::graph::Barrier;
use crate::resources::{Buffer, Texture};
use crate::types::ClearValue;

/// A resource bound to a dispatch, in binding-slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Texture(ResourceId),
    Buffer(ResourceId),
}

/// A single recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start of a pass.
    BeginPass { name: String },
    /// End of the current pass.
    EndPass,
    /// Synchronization barrier inserted by the compiled graph.
    Barrier(Barrier),
    /// Write the GPU clock into a timestamp query.
    WriteTimestamp { query: u32 },
    /// Fill every texel of a texture.
    ClearTexture { texture: ResourceId, value: ClearValue },
    /// Mark a texture's contents as undefined.
    DiscardTexture { texture: ResourceId },
    /// Copy a whole texture into another of identical size and format.
    CopyTexture { src: ResourceId, dst: ResourceId },
    /// Copy a byte range between buffers.
    CopyBuffer {
        src: ResourceId,
        src_offset: u64,
        dst: ResourceId,
        dst_offset: u64,
        size: u64,
    },
    /// Upload inline data into a buffer.
    WriteBuffer {
        buffer: ResourceId,
        offset: u64,
        data: Vec<u8>,
    },
    /// Draw with a graphics pipeline.
    Draw {
        pipeline: String,
        vertex_count: u32,
        instance_count: u32,
    },
    /// Dispatch a compute pipeline.
    Dispatch {
        pipeline: String,
        groups: [u32; 3],
        bindings: Vec<Binding>,
        push_constants: Vec<u8>,
    },
}

/// A finished, submittable list of commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandStream {
    commands: Vec<Command>,
}

impl CommandStream {
    /// All commands in recording order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterate over the commands.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Consume the stream into its commands.
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

impl From<Vec<Command>> for CommandStream {
    fn from(commands: Vec<Command>) -> Self {
        Self { commands }
    }
}

/// Records commands for one frame.
#[derive(Debug, Default)]
pub struct CommandEncoder {
    stream: CommandStream,
}

impl CommandEncoder {
    /// Create an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, command: Command) {
        log::trace!("CommandEncoder: {:?}", command);
        self.stream.commands.push(command);
    }

    /// Mark the start of a pass.
    pub fn begin_pass(&mut self, name: &str) {
        self.push(Command::BeginPass {
            name: name.to_string(),
        });
    }

    /// Mark the end of the current pass.
    pub fn end_pass(&mut self) {
        self.push(Command::EndPass);
    }

    /// Record a barrier.
    pub fn barrier(&mut self, barrier: Barrier) {
        self.push(Command::Barrier(barrier));
    }

    /// Write a timestamp query.
    pub fn write_timestamp(&mut self, query: u32) {
        self.push(Command::WriteTimestamp { query });
    }

    /// Clear a texture.
    pub fn clear_texture(&mut self, texture: &Texture, value: ClearValue) {
        self.push(Command::ClearTexture {
            texture: texture.id(),
            value,
        });
    }

    /// Discard a texture's contents.
    pub fn discard_texture(&mut self, texture: &Texture) {
        self.push(Command::DiscardTexture {
            texture: texture.id(),
        });
    }

    /// Copy `src` into `dst`.
    pub fn copy_texture(&mut self, src: &Texture, dst: &Texture) {
        self.push(Command::CopyTexture {
            src: src.id(),
            dst: dst.id(),
        });
    }

    /// Copy `size` bytes between buffers.
    pub fn copy_buffer(
        &mut self,
        src: &Buffer,
        src_offset: u64,
        dst: &Buffer,
        dst_offset: u64,
        size: u64,
    ) {
        self.push(Command::CopyBuffer {
            src: src.id(),
            src_offset,
            dst: dst.id(),
            dst_offset,
            size,
        });
    }

    /// Upload inline data.
    pub fn write_buffer(&mut self, buffer: &Buffer, offset: u64, data: &[u8]) {
        self.push(Command::WriteBuffer {
            buffer: buffer.id(),
            offset,
            data: data.to_vec(),
        });
    }

    /// Record a draw.
    pub fn draw(&mut self, pipeline: &str, vertex_count: u32, instance_count: u32) {
        self.push(Command::Draw {
            pipeline: pipeline.to_string(),
            vertex_count,
            instance_count,
        });
    }

    /// Record a compute dispatch.
    pub fn dispatch(
        &mut self,
        pipeline: &str,
        groups: [u32; 3],
        bindings: Vec<Binding>,
        push_constants: &[u8],
    ) {
        self.push(Command::Dispatch {
            pipeline: pipeline.to_string(),
            groups,
            bindings,
            push_constants: push_constants.to_vec(),
        });
    }

    /// Commands recorded so far.
    pub fn commands(&self) -> &[Command] {
        self.stream.commands()
    }

    /// Finish recording.
    pub fn finish(self) -> CommandStream {
        self.stream
    }
}
