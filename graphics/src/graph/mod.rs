//! Pass graph infrastructure.
//!
//! The pass graph provides a declarative way to describe a frame's GPU work.
//! Passes declare the registry resources they read and write; the compiler
//! derives from those declarations alone:
//!
//! - a pass order consistent with every data dependency, with insertion
//!   order as the tie-break between independent passes,
//! - the synchronization barriers between conflicting accesses,
//! - configuration errors for uses the registry cannot satisfy.
//!
//! # Example
//!
//! ```ignore
//! use stratus_graphics::graph::{Pass, PassGraph, ResourceRole};
//!
//! let mut graph = PassGraph::new();
//! graph.add_pass(
//!     Pass::graphics("tone mapping", |ctx| {
//!         ctx.encoder().draw("tonemap", 3, 1);
//!         Ok(())
//!     })
//!     .reads("resolved", ResourceRole::Sampled)
//!     .writes("swapchain", ResourceRole::ColorAttachment),
//! )?;
//! let compiled = graph.compile(&registry)?;
//! graph.execute(&compiled, &frame, &registry, &mut encoder, &mut ())?;
//! ```
//!
//! Rebuilding is explicit: when the topology changes (an optional effect is
//! toggled), clear the graph, add the passes again and recompile. A
//! [`CompiledGraph`] from before the change is rejected by
//! [`PassGraph::execute`].

mod compiler;
mod context;
mod pass;
mod resource_usage;

use thiserror::Error;

pub use compiler::{Barrier, BarrierKind};
pub use context::PassContext;
pub use pass::{Pass, PassBody, PassKind};
pub use resource_usage::{Access, MipRange, ResourceRole, ResourceUse};

use crate::command::CommandEncoder;
use crate::error::GraphicsError;
use crate::resources::ResourceRegistry;
use crate::uniforms::FrameContext;

/// Handle to a pass in the pass graph.
///
/// `PassHandle` is `Copy` and cheap to pass around. It is only valid within
/// the `PassGraph` that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassHandle(u32);

impl PassHandle {
    fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Insertion index of the pass.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Errors raised while building or compiling a pass graph.
///
/// Every variant is a configuration error: the graph cannot be executed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Two passes share a name.
    #[error("duplicate pass name '{0}'")]
    DuplicatePass(String),
    /// A pass uses a resource the registry does not know.
    #[error("pass '{pass}' uses undeclared resource '{resource}'")]
    UnknownResource { pass: String, resource: String },
    /// A role that does not fit the resource kind.
    #[error("pass '{pass}' uses '{resource}' as {role:?}, which does not fit its kind")]
    KindMismatch {
        pass: String,
        resource: String,
        role: ResourceRole,
    },
    /// The resource's usage flags do not cover the role.
    #[error("pass '{pass}' uses '{resource}' as {role:?} without the matching usage flag")]
    MissingUsage {
        pass: String,
        resource: String,
        role: ResourceRole,
    },
    /// The access is not possible in the role.
    #[error("pass '{pass}' cannot {access:?} '{resource}' as {role:?}")]
    AccessNotAllowed {
        pass: String,
        resource: String,
        role: ResourceRole,
        access: Access,
    },
    /// A transient resource has no history to read.
    #[error("pass '{pass}' reads history of transient resource '{resource}'")]
    HistoryOfTransient { pass: String, resource: String },
    /// A mip range outside the image.
    #[error(
        "pass '{pass}' uses mips {base}..{count:?} of '{resource}', which has {levels} levels"
    )]
    MipOutOfRange {
        pass: String,
        resource: String,
        base: u32,
        count: Option<u32>,
        levels: u32,
    },
    /// A full-chain image used before the registry knows its size.
    #[error("pass '{pass}' uses '{resource}' whose mip count is unknown until realized")]
    UnresolvedMips { pass: String, resource: String },
    /// The dependencies form a cycle.
    ///
    /// `reads_before_write` lists `(pass, resource)` reads inside the cycle
    /// that no earlier pass writes, so they wait on the last writer. A pass
    /// that wants the previous frame's contents declares the read with
    /// [`Pass::reads_history`] instead.
    #[error(
        "cyclic dependency between passes {passes:?}{}",
        describe_reads_before_write(.reads_before_write)
    )]
    CyclicDependency {
        passes: Vec<String>,
        reads_before_write: Vec<(String, String)>,
    },
    /// A dependency refers to a pass that is not in the graph.
    #[error("invalid dependency {dependent} -> {dependency}")]
    InvalidDependency { dependent: usize, dependency: usize },
    /// A pass body looked up a resource it did not declare.
    #[error("pass '{pass}' accessed undeclared resource '{resource}'")]
    UndeclaredUse { pass: String, resource: String },
    /// The compiled graph was built before the graph last changed.
    #[error("compiled graph is stale, recompile after rebuilding")]
    StaleCompilation,
}

impl GraphError {
    /// Returns `true` for configuration errors, which must abort startup.
    pub fn is_configuration(&self) -> bool {
        true
    }
}

fn describe_reads_before_write(reads: &[(String, String)]) -> String {
    if reads.is_empty() {
        return String::new();
    }
    let reads: Vec<String> = reads
        .iter()
        .map(|(pass, resource)| format!("'{pass}' reads '{resource}'"))
        .collect();
    format!(
        "; {} before any earlier pass writes it (declare previous-frame reads with reads_history)",
        reads.join(", ")
    )
}

/// Hooks around every executed pass.
///
/// Metric instrumentation implements this to write timestamps; the graph
/// itself does not depend on any metrics.
pub trait PassObserver {
    /// Called after the pass's barriers are recorded, before its body.
    fn before_pass(&mut self, _pass: &Pass, _encoder: &mut CommandEncoder) {}

    /// Called after the pass's body succeeded.
    fn after_pass(&mut self, _pass: &Pass, _encoder: &mut CommandEncoder) {}
}

impl PassObserver for () {}

/// A compiled pass graph ready for execution.
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    order: Vec<PassHandle>,
    barriers: Vec<Vec<Barrier>>,
    revision: u64,
}

impl CompiledGraph {
    /// Pass execution order.
    pub fn pass_order(&self) -> &[PassHandle] {
        &self.order
    }

    /// Barriers recorded before the pass at `position` in the order.
    pub fn barriers_at(&self, position: usize) -> &[Barrier] {
        self.barriers.get(position).map_or(&[], Vec::as_slice)
    }

    /// Barriers recorded before the given pass.
    pub fn barriers_for(&self, handle: PassHandle) -> &[Barrier] {
        self.position(handle)
            .map_or(&[], |position| self.barriers_at(position))
    }

    /// Position of a pass in the order.
    pub fn position(&self, handle: PassHandle) -> Option<usize> {
        self.order.iter().position(|&h| h == handle)
    }

    /// Total number of barriers.
    pub fn barrier_count(&self) -> usize {
        self.barriers.iter().map(Vec::len).sum()
    }
}

/// The pass graph describes a frame's GPU work.
///
/// # Construction
///
/// Build a graph by adding passes:
///
/// ```ignore
/// let mut graph = PassGraph::new();
/// let geometry = graph.add_pass(Pass::graphics("geometry", body))?;
/// let lighting = graph.add_pass(Pass::graphics("lighting", body))?;
/// graph.add_dependency(lighting, geometry)?;
/// ```
#[derive(Debug, Default)]
pub struct PassGraph {
    /// All passes in insertion order.
    passes: Vec<Pass>,
    /// Explicit dependency edges stored as (dependent, dependency) pairs.
    edges: Vec<(PassHandle, PassHandle)>,
    revision: u64,
}

impl PassGraph {
    /// Create a new empty pass graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fully configured pass.
    ///
    /// Fails if a pass with the same name exists.
    pub fn add_pass(&mut self, pass: Pass) -> Result<PassHandle, GraphError> {
        if self.find(pass.name()).is_some() {
            return Err(GraphError::DuplicatePass(pass.name().to_string()));
        }
        log::trace!("PassGraph: added pass '{}'", pass.name());
        let handle = PassHandle::from_index(self.passes.len());
        self.passes.push(pass);
        self.revision += 1;
        Ok(handle)
    }

    /// Add an explicit dependency: `dependent` runs after `dependency`.
    pub fn add_dependency(
        &mut self,
        dependent: PassHandle,
        dependency: PassHandle,
    ) -> Result<(), GraphError> {
        let count = self.passes.len();
        if dependent.index() >= count || dependency.index() >= count || dependent == dependency {
            return Err(GraphError::InvalidDependency {
                dependent: dependent.index(),
                dependency: dependency.index(),
            });
        }

        // Check for duplicates
        let exists = self
            .edges
            .iter()
            .any(|&(d, dep)| d == dependent && dep == dependency);
        if !exists {
            self.edges.push((dependent, dependency));
            self.revision += 1;
        }
        Ok(())
    }

    /// Get explicit dependencies of a pass.
    pub fn dependencies(&self, handle: PassHandle) -> impl Iterator<Item = PassHandle> + '_ {
        self.edges
            .iter()
            .filter(move |&&(dependent, _)| dependent == handle)
            .map(|&(_, dependency)| dependency)
    }

    /// Find a pass by name.
    pub fn find(&self, name: &str) -> Option<PassHandle> {
        self.passes
            .iter()
            .position(|pass| pass.name() == name)
            .map(PassHandle::from_index)
    }

    /// Get a pass.
    pub fn pass(&self, handle: PassHandle) -> Option<&Pass> {
        self.passes.get(handle.index())
    }

    /// Get all passes in insertion order.
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// Get the number of passes in the graph.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Compile the graph against the registry.
    ///
    /// Every configuration error is detected here, never during execution.
    pub fn compile(&self, registry: &ResourceRegistry) -> Result<CompiledGraph, GraphError> {
        stratus_core::profile_function!();
        compiler::compile(&self.passes, &self.edges, registry, self.revision)
    }

    /// Run every pass body in compiled order.
    ///
    /// Transient images are discarded first. Each pass is wrapped in
    /// begin/end markers with its barriers in front of the body. A failing
    /// body aborts the execution and is reported as
    /// [`GraphicsError::PassFailed`].
    pub fn execute(
        &mut self,
        compiled: &CompiledGraph,
        frame: &FrameContext,
        registry: &ResourceRegistry,
        encoder: &mut CommandEncoder,
        observer: &mut dyn PassObserver,
    ) -> Result<(), GraphicsError> {
        stratus_core::profile_function!();
        if compiled.revision != self.revision || compiled.order.len() != self.passes.len() {
            return Err(GraphError::StaleCompilation.into());
        }

        registry.discard_transients(encoder);

        for (position, handle) in compiled.order.iter().enumerate() {
            let pass = &mut self.passes[handle.index()];
            stratus_core::profile_scope_dynamic!(pass.name());
            log::trace!("PassGraph: executing '{}'", pass.name());

            encoder.begin_pass(pass.name());
            for barrier in compiled.barriers_at(position) {
                encoder.barrier(barrier.clone());
            }
            observer.before_pass(pass, encoder);

            let Pass {
                name, uses, body, ..
            } = &mut *pass;
            let mut ctx = PassContext::new(name, uses, frame, registry, encoder);
            if let Err(source) = body.as_mut()(&mut ctx) {
                log::error!("PassGraph: pass '{}' failed: {}", name, source);
                return Err(GraphicsError::PassFailed {
                    pass: name.clone(),
                    source: Box::new(source),
                });
            }

            observer.after_pass(pass, encoder);
            encoder.end_pass();
        }
        Ok(())
    }

    /// Clear all passes from the graph.
    pub fn clear(&mut self) {
        self.passes.clear();
        self.edges.clear();
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::DummyBackend;
    use crate::command::Command;
    use crate::device::GraphicsDevice;
    use crate::resources::{ImageDeclaration, MipPolicy, ResourceLifetime};
    use crate::types::{BufferUsage, Extent3d, TextureFormat, TextureUsage};

    fn usage() -> TextureUsage {
        TextureUsage::RENDER_ATTACHMENT
            | TextureUsage::TEXTURE_BINDING
            | TextureUsage::STORAGE_BINDING
            | TextureUsage::COPY_SRC
            | TextureUsage::COPY_DST
    }

    fn registry(names: &[&str]) -> ResourceRegistry {
        let device = GraphicsDevice::new(Arc::new(DummyBackend::new()));
        let mut registry = ResourceRegistry::new(device);
        for name in names {
            registry
                .declare(name, TextureFormat::Rgba16Float, usage(), ResourceLifetime::Persistent)
                .unwrap();
        }
        registry
    }

    fn noop(name: &str) -> Pass {
        Pass::graphics(name, |_| Ok(()))
    }

    fn names(graph: &PassGraph, compiled: &CompiledGraph) -> Vec<String> {
        compiled
            .pass_order()
            .iter()
            .map(|&h| graph.pass(h).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_add_pass() {
        let mut graph = PassGraph::new();
        let handle = graph.add_pass(noop("test_pass")).unwrap();
        assert_eq!(graph.pass_count(), 1);
        assert_eq!(graph.passes()[0].name(), "test_pass");
        assert_eq!(graph.find("test_pass"), Some(handle));
    }

    #[test]
    fn test_duplicate_pass_rejected() {
        let mut graph = PassGraph::new();
        graph.add_pass(noop("bloom")).unwrap();
        assert_eq!(
            graph.add_pass(noop("bloom")).unwrap_err(),
            GraphError::DuplicatePass("bloom".into())
        );
    }

    #[test]
    fn test_clear() {
        let mut graph = PassGraph::new();
        graph.add_pass(noop("test_pass")).unwrap();
        graph.clear();
        assert_eq!(graph.pass_count(), 0);
    }

    #[test]
    fn test_add_dependency() {
        let mut graph = PassGraph::new();
        let pass1 = graph.add_pass(noop("geometry")).unwrap();
        let pass2 = graph.add_pass(noop("lighting")).unwrap();

        graph.add_dependency(pass2, pass1).unwrap();
        graph.add_dependency(pass2, pass1).unwrap();

        assert_eq!(graph.dependencies(pass2).collect::<Vec<_>>(), vec![pass1]);
        assert!(graph.add_dependency(pass1, pass1).is_err());
    }

    #[test]
    fn test_explicit_dependency_orders_passes() {
        let registry = registry(&[]);
        let mut graph = PassGraph::new();
        let first = graph.add_pass(noop("first")).unwrap();
        let second = graph.add_pass(noop("second")).unwrap();
        graph.add_dependency(first, second).unwrap();

        let compiled = graph.compile(&registry).unwrap();
        assert_eq!(compiled.pass_order(), &[second, first]);
    }

    #[test]
    fn test_independent_passes_keep_insertion_order() {
        let registry = registry(&["a", "b", "c"]);
        let mut graph = PassGraph::new();
        for name in ["a", "b", "c"] {
            graph
                .add_pass(noop(&format!("write {name}")).writes(name, ResourceRole::ColorAttachment))
                .unwrap();
        }
        let compiled = graph.compile(&registry).unwrap();
        assert_eq!(names(&graph, &compiled), vec!["write a", "write b", "write c"]);
        assert_eq!(compiled.barrier_count(), 0);
    }

    #[test]
    fn test_reader_before_writer_in_insertion_order() {
        let registry = registry(&["x"]);
        let mut graph = PassGraph::new();
        graph
            .add_pass(noop("B").reads("x", ResourceRole::Sampled))
            .unwrap();
        graph
            .add_pass(noop("A").writes("x", ResourceRole::ColorAttachment))
            .unwrap();

        let compiled = graph.compile(&registry).unwrap();
        assert_eq!(names(&graph, &compiled), vec!["A", "B"]);
        let barriers = compiled.barriers_at(1);
        assert_eq!(barriers.len(), 1);
        assert_eq!(barriers[0].kind, BarrierKind::ReadAfterWrite);
        assert_eq!(barriers[0].src_role, ResourceRole::ColorAttachment);
        assert_eq!(barriers[0].dst_role, ResourceRole::Sampled);
    }

    #[test]
    fn test_write_after_read_ordering() {
        let registry = registry(&["x"]);
        let mut graph = PassGraph::new();
        graph
            .add_pass(noop("produce").writes("x", ResourceRole::ColorAttachment))
            .unwrap();
        graph
            .add_pass(noop("overwrite").writes("x", ResourceRole::ColorAttachment))
            .unwrap();
        graph
            .add_pass(noop("consume").reads("x", ResourceRole::Sampled))
            .unwrap();

        let compiled = graph.compile(&registry).unwrap();
        assert_eq!(names(&graph, &compiled), vec!["produce", "overwrite", "consume"]);
        assert_eq!(compiled.barriers_at(1)[0].kind, BarrierKind::WriteAfterWrite);
    }

    #[test]
    fn test_history_read_runs_before_writer() {
        let registry = registry(&["resolved", "previous color"]);
        let mut graph = PassGraph::new();
        graph
            .add_pass(
                noop("copy")
                    .reads("resolved", ResourceRole::TransferSrc)
                    .writes("previous color", ResourceRole::TransferDst),
            )
            .unwrap();
        graph
            .add_pass(
                noop("taa")
                    .reads_history("previous color", ResourceRole::Sampled)
                    .writes("resolved", ResourceRole::Storage),
            )
            .unwrap();

        let compiled = graph.compile(&registry).unwrap();
        assert_eq!(names(&graph, &compiled), vec!["taa", "copy"]);
    }

    #[test]
    fn test_unknown_resource_is_configuration_error() {
        let registry = registry(&[]);
        let mut graph = PassGraph::new();
        graph
            .add_pass(noop("ssao").reads("depth", ResourceRole::Sampled))
            .unwrap();
        let err = graph.compile(&registry).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownResource {
                pass: "ssao".into(),
                resource: "depth".into()
            }
        );
        assert!(GraphicsError::from(err).is_configuration());
    }

    #[test]
    fn test_cycle_detected() {
        let registry = registry(&[]);
        let mut graph = PassGraph::new();
        let a = graph.add_pass(noop("a")).unwrap();
        let b = graph.add_pass(noop("b")).unwrap();
        graph.add_dependency(a, b).unwrap();
        graph.add_dependency(b, a).unwrap();
        assert_eq!(
            graph.compile(&registry).unwrap_err(),
            GraphError::CyclicDependency {
                passes: vec!["a".into(), "b".into()],
                reads_before_write: Vec::new(),
            }
        );
    }

    #[test]
    fn test_ping_pong_cycle_names_the_early_read() {
        let registry = registry(&["x", "y"]);
        let mut graph = PassGraph::new();
        graph
            .add_pass(
                noop("p")
                    .reads("x", ResourceRole::Sampled)
                    .writes("y", ResourceRole::ColorAttachment),
            )
            .unwrap();
        graph
            .add_pass(
                noop("q")
                    .reads("y", ResourceRole::Sampled)
                    .writes("x", ResourceRole::ColorAttachment),
            )
            .unwrap();

        let err = graph.compile(&registry).unwrap_err();
        assert_eq!(
            err,
            GraphError::CyclicDependency {
                passes: vec!["p".into(), "q".into()],
                reads_before_write: vec![("p".into(), "x".into())],
            }
        );
        let message = err.to_string();
        assert!(message.contains("'p' reads 'x'"));
        assert!(message.contains("reads_history"));
    }

    #[test]
    fn test_ping_pong_with_history_read_compiles() {
        let registry = registry(&["x", "y"]);
        let mut graph = PassGraph::new();
        graph
            .add_pass(
                noop("p")
                    .reads_history("x", ResourceRole::Sampled)
                    .writes("y", ResourceRole::ColorAttachment),
            )
            .unwrap();
        graph
            .add_pass(
                noop("q")
                    .reads("y", ResourceRole::Sampled)
                    .writes("x", ResourceRole::ColorAttachment),
            )
            .unwrap();

        let compiled = graph.compile(&registry).unwrap();
        assert_eq!(names(&graph, &compiled), vec!["p", "q"]);
    }

    #[test]
    fn test_role_and_usage_validation() {
        let mut registry = registry(&["color"]);
        registry
            .declare_buffer("exposure", 64, BufferUsage::STORAGE, ResourceLifetime::Persistent)
            .unwrap();
        registry
            .declare("scratch", TextureFormat::R16Float, usage(), ResourceLifetime::Transient)
            .unwrap();

        let compile_one = |pass: Pass| {
            let mut graph = PassGraph::new();
            graph.add_pass(pass).unwrap();
            graph.compile(&registry)
        };

        assert!(matches!(
            compile_one(noop("p").reads("exposure", ResourceRole::Sampled)),
            Err(GraphError::KindMismatch { .. })
        ));
        assert!(matches!(
            compile_one(noop("p").reads("exposure", ResourceRole::Uniform)),
            Err(GraphError::MissingUsage { .. })
        ));
        assert!(matches!(
            compile_one(noop("p").writes("color", ResourceRole::Sampled)),
            Err(GraphError::AccessNotAllowed { .. })
        ));
        assert!(matches!(
            compile_one(noop("p").reads_history("scratch", ResourceRole::Sampled)),
            Err(GraphError::HistoryOfTransient { .. })
        ));
        assert!(matches!(
            compile_one(noop("p").with_use(ResourceUse::read("color", ResourceRole::Sampled).mip(1))),
            Err(GraphError::MipOutOfRange { .. })
        ));
    }

    #[test]
    fn test_full_chain_needs_realize() {
        let mut registry = registry(&[]);
        registry
            .declare_image(
                "dof",
                ImageDeclaration::new(TextureFormat::Rgba16Float, usage(), ResourceLifetime::Persistent)
                    .with_mips(MipPolicy::FullChain),
            )
            .unwrap();
        let mut graph = PassGraph::new();
        graph
            .add_pass(noop("mip mapping").with_use(
                ResourceUse::read_write("dof", ResourceRole::Storage).with_mips(MipRange::all()),
            ))
            .unwrap();
        assert!(matches!(
            graph.compile(&registry),
            Err(GraphError::UnresolvedMips { .. })
        ));

        registry.realize(Extent3d::new_2d(64, 32)).unwrap();
        assert!(graph.compile(&registry).is_ok());
    }

    #[test]
    fn test_per_mip_dependencies() {
        let mut registry = registry(&[]);
        registry
            .declare_image(
                "bloom",
                ImageDeclaration::new(TextureFormat::Rgba16Float, usage(), ResourceLifetime::Persistent)
                    .with_mips(MipPolicy::Fixed(3)),
            )
            .unwrap();
        let mut graph = PassGraph::new();
        graph
            .add_pass(noop("down 1").with_use(
                ResourceUse::write("bloom", ResourceRole::ColorAttachment).mip(1),
            ).with_use(ResourceUse::read("bloom", ResourceRole::Sampled).mip(0)))
            .unwrap();
        graph
            .add_pass(noop("down 0").with_use(
                ResourceUse::write("bloom", ResourceRole::ColorAttachment).mip(0),
            ))
            .unwrap();
        graph
            .add_pass(noop("unrelated").with_use(
                ResourceUse::write("bloom", ResourceRole::ColorAttachment).mip(2),
            ))
            .unwrap();

        let compiled = graph.compile(&registry).unwrap();
        assert_eq!(names(&graph, &compiled), vec!["down 0", "down 1", "unrelated"]);
    }

    #[test]
    fn test_execute_records_barriers_and_runs_bodies() {
        let mut registry = registry(&["x"]);
        registry.realize(Extent3d::new_2d(4, 4)).unwrap();
        let mut graph = PassGraph::new();
        graph
            .add_pass(
                Pass::graphics("consume", |ctx| {
                    let x = ctx.texture("x")?.clone();
                    ctx.encoder().copy_texture(&x, &x);
                    Ok(())
                })
                .reads("x", ResourceRole::Sampled),
            )
            .unwrap();
        graph
            .add_pass(noop("produce").writes("x", ResourceRole::ColorAttachment))
            .unwrap();

        let compiled = graph.compile(&registry).unwrap();
        let mut encoder = CommandEncoder::new();
        graph
            .execute(&compiled, &FrameContext::default(), &registry, &mut encoder, &mut ())
            .unwrap();

        let commands = encoder.finish().into_commands();
        assert_eq!(commands[0], Command::BeginPass { name: "produce".into() });
        assert_eq!(commands[1], Command::EndPass);
        assert_eq!(commands[2], Command::BeginPass { name: "consume".into() });
        assert!(matches!(&commands[3], Command::Barrier(b) if b.kind == BarrierKind::ReadAfterWrite));
        assert!(matches!(commands[4], Command::CopyTexture { .. }));
    }

    #[test]
    fn test_undeclared_lookup_fails_the_pass() {
        let mut registry = registry(&["x", "y"]);
        registry.realize(Extent3d::new_2d(4, 4)).unwrap();
        let mut graph = PassGraph::new();
        graph
            .add_pass(
                Pass::graphics("sneaky", |ctx| {
                    ctx.texture("y")?;
                    Ok(())
                })
                .writes("x", ResourceRole::ColorAttachment),
            )
            .unwrap();

        let compiled = graph.compile(&registry).unwrap();
        let err = graph
            .execute(
                &compiled,
                &FrameContext::default(),
                &registry,
                &mut CommandEncoder::new(),
                &mut (),
            )
            .unwrap_err();
        let GraphicsError::PassFailed { pass, source } = err else {
            panic!("expected a pass failure");
        };
        assert_eq!(pass, "sneaky");
        assert!(matches!(*source, GraphicsError::Graph(GraphError::UndeclaredUse { .. })));
    }

    #[test]
    fn test_stale_compilation_rejected() {
        let registry = registry(&[]);
        let mut graph = PassGraph::new();
        graph.add_pass(noop("a")).unwrap();
        let compiled = graph.compile(&registry).unwrap();
        graph.add_pass(noop("b")).unwrap();

        let err = graph
            .execute(
                &compiled,
                &FrameContext::default(),
                &registry,
                &mut CommandEncoder::new(),
                &mut (),
            )
            .unwrap_err();
        assert_eq!(err, GraphicsError::Graph(GraphError::StaleCompilation));
    }
}
