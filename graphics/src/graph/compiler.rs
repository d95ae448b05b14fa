//! Pass graph compilation: validation, ordering and barrier placement.
//!
//! Compilation runs in three stages:
//!
//! 1. **Validation.** Every declared use is checked against the registry:
//!    the resource must exist, its kind and usage flags must fit the role,
//!    history reads need a non-transient resource and mip ranges must be in
//!    bounds.
//! 2. **Ordering.** Uses are expanded into subresources (resource, mip
//!    level). Writes to a subresource are versioned in insertion order, and
//!    each access becomes edges against those versions:
//!    - a write follows the previous writer,
//!    - a read follows the latest preceding writer and precedes the next
//!      one; with no preceding writer it follows the last writer,
//!    - a history read precedes the first writer.
//!
//!    The order is a topological sort that always picks the ready pass with
//!    the lowest insertion index, so independent passes keep insertion order.
//! 3. **Barriers.** The compiled order is walked with the last access of
//!    every subresource, and each use that conflicts with it gets a barrier.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};
use std::ops::Range;

use super::pass::Pass;
use super::resource_usage::{Access, ResourceRole};
use super::{CompiledGraph, GraphError, PassHandle};
use crate::resources::{DeclaredUsage, RegistryError, ResourceLifetime, ResourceRegistry};

/// Kind of hazard a barrier resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarrierKind {
    /// A read after a write.
    ReadAfterWrite,
    /// A write after a read.
    WriteAfterRead,
    /// A write after a write.
    WriteAfterWrite,
    /// A read after a read in a different role.
    LayoutTransition,
}

/// A synchronization barrier placed before a pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Barrier {
    /// Registry name of the resource.
    pub resource: String,
    /// The hazard being resolved.
    pub kind: BarrierKind,
    /// First affected mip level.
    pub base_mip: u32,
    /// Number of affected mip levels.
    pub mip_count: u32,
    /// Role of the previous access.
    pub src_role: ResourceRole,
    /// Role of the upcoming access.
    pub dst_role: ResourceRole,
}

type Subresource = (usize, u32);

#[derive(Debug, Clone, Copy, Default)]
struct MergedAccess {
    read: bool,
    write: bool,
    history: bool,
}

#[derive(Debug, Clone, Copy)]
struct LastAccess {
    write: bool,
    role: ResourceRole,
}

/// A validated use with its resolved mip range.
#[derive(Debug, Clone)]
struct ResolvedUse {
    resource: usize,
    access: Access,
    role: ResourceRole,
    mips: Range<u32>,
}

pub(super) fn compile(
    passes: &[Pass],
    explicit: &[(PassHandle, PassHandle)],
    registry: &ResourceRegistry,
    revision: u64,
) -> Result<CompiledGraph, GraphError> {
    let mut seen = HashSet::new();
    for pass in passes {
        if !seen.insert(pass.name()) {
            return Err(GraphError::DuplicatePass(pass.name().to_string()));
        }
    }

    let mut resources: Vec<&str> = Vec::new();
    let mut resource_ids: HashMap<&str, usize> = HashMap::new();
    let mut resolved: Vec<Vec<ResolvedUse>> = Vec::with_capacity(passes.len());
    for pass in passes {
        let mut uses = Vec::with_capacity(pass.uses().len());
        for usage in pass.uses() {
            let mips = validate_use(pass, usage, registry)?;
            let resource = *resource_ids.entry(usage.resource.as_str()).or_insert_with(|| {
                resources.push(usage.resource.as_str());
                resources.len() - 1
            });
            uses.push(ResolvedUse {
                resource,
                access: usage.access,
                role: usage.role,
                mips,
            });
        }
        resolved.push(uses);
    }

    // Per subresource, the accessing passes in insertion order.
    let mut accesses: HashMap<Subresource, Vec<(usize, MergedAccess)>> = HashMap::new();
    for (pass, uses) in resolved.iter().enumerate() {
        for usage in uses {
            for mip in usage.mips.clone() {
                let list = accesses.entry((usage.resource, mip)).or_default();
                if list.last().is_none_or(|(last, _)| *last != pass) {
                    list.push((pass, MergedAccess::default()));
                }
                if let Some((_, merged)) = list.last_mut() {
                    merged.read |= usage.access.is_read() && !usage.access.is_history();
                    merged.write |= usage.access.is_write();
                    merged.history |= usage.access.is_history();
                }
            }
        }
    }

    // Reads with no earlier writer, bound to the last writer instead.
    let mut reads_before_write: BTreeSet<(usize, usize)> = BTreeSet::new();
    let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); passes.len()];
    let mut add_edge = |from: usize, to: usize| {
        if from != to {
            successors[from].insert(to);
        }
    };

    for (&(resource, _), list) in &accesses {
        let writers: Vec<usize> = list
            .iter()
            .filter(|(_, access)| access.write)
            .map(|(pass, _)| *pass)
            .collect();
        for &(pass, access) in list {
            let previous = writers.iter().rev().find(|&&w| w < pass).copied();
            let next = writers.iter().find(|&&w| w > pass).copied();
            if access.write {
                if let Some(previous) = previous {
                    add_edge(previous, pass);
                }
            } else if access.read {
                match (previous, writers.last()) {
                    (Some(previous), _) => {
                        add_edge(previous, pass);
                        if let Some(next) = next {
                            add_edge(pass, next);
                        }
                    }
                    (None, Some(&last)) => {
                        reads_before_write.insert((pass, resource));
                        add_edge(last, pass);
                    }
                    (None, None) => {}
                }
            }
            if access.history {
                if let Some(&first) = writers.iter().find(|&&w| w != pass) {
                    add_edge(pass, first);
                }
            }
        }
    }

    for &(dependent, dependency) in explicit {
        add_edge(dependency.index(), dependent.index());
    }

    let order = topological_order(&successors).map_err(|stuck| {
        let reads_before_write = reads_before_write
            .iter()
            .filter(|(pass, _)| stuck.contains(pass))
            .map(|&(pass, resource)| (passes[pass].name().to_string(), resources[resource].to_string()))
            .collect();
        GraphError::CyclicDependency {
            passes: stuck.iter().map(|&pass| passes[pass].name().to_string()).collect(),
            reads_before_write,
        }
    })?;

    let mut state: HashMap<Subresource, LastAccess> = HashMap::new();
    let mut barriers = Vec::with_capacity(order.len());
    for &pass in &order {
        let uses = &resolved[pass];
        let mut pass_barriers = Vec::new();
        for usage in uses {
            let hazard = usage.mips.clone().find_map(|mip| {
                let last = state.get(&(usage.resource, mip))?;
                hazard_kind(last, usage.access, usage.role).map(|kind| (kind, last.role))
            });
            if let Some((kind, src_role)) = hazard {
                pass_barriers.push(Barrier {
                    resource: resources[usage.resource].to_string(),
                    kind,
                    base_mip: usage.mips.start,
                    mip_count: usage.mips.end - usage.mips.start,
                    src_role,
                    dst_role: usage.role,
                });
            }
        }

        let mut touched: HashMap<Subresource, LastAccess> = HashMap::new();
        for usage in uses {
            for mip in usage.mips.clone() {
                let entry = touched.entry((usage.resource, mip)).or_insert(LastAccess {
                    write: false,
                    role: usage.role,
                });
                entry.write |= usage.access.is_write();
                entry.role = usage.role;
            }
        }
        state.extend(touched);
        barriers.push(pass_barriers);
    }

    log::debug!(
        "PassGraph: compiled {} passes over {} resources",
        order.len(),
        resources.len()
    );

    Ok(CompiledGraph {
        order: order.into_iter().map(PassHandle::from_index).collect(),
        barriers,
        revision,
    })
}

fn validate_use(
    pass: &Pass,
    usage: &super::ResourceUse,
    registry: &ResourceRegistry,
) -> Result<Range<u32>, GraphError> {
    let unknown = || GraphError::UnknownResource {
        pass: pass.name().to_string(),
        resource: usage.resource.clone(),
    };
    let info = registry.info(&usage.resource).map_err(|_| unknown())?;

    if !usage.role.accepts(info.usage.kind()) {
        return Err(GraphError::KindMismatch {
            pass: pass.name().to_string(),
            resource: usage.resource.clone(),
            role: usage.role,
        });
    }
    let covered = match info.usage {
        DeclaredUsage::Image(flags) => flags.contains(usage.role.texture_usage()),
        DeclaredUsage::Buffer(flags) => flags.contains(usage.role.buffer_usage()),
    };
    if !covered {
        return Err(GraphError::MissingUsage {
            pass: pass.name().to_string(),
            resource: usage.resource.clone(),
            role: usage.role,
        });
    }
    if !usage.role.allows(usage.access) {
        return Err(GraphError::AccessNotAllowed {
            pass: pass.name().to_string(),
            resource: usage.resource.clone(),
            role: usage.role,
            access: usage.access,
        });
    }
    if usage.access.is_history() && info.lifetime == ResourceLifetime::Transient {
        return Err(GraphError::HistoryOfTransient {
            pass: pass.name().to_string(),
            resource: usage.resource.clone(),
        });
    }

    let DeclaredUsage::Image(_) = info.usage else {
        return Ok(0..1);
    };
    let levels = match registry.mip_levels(&usage.resource) {
        Ok(levels) => levels,
        Err(RegistryError::NotRealized(_)) => {
            return Err(GraphError::UnresolvedMips {
                pass: pass.name().to_string(),
                resource: usage.resource.clone(),
            });
        }
        Err(_) => return Err(unknown()),
    };
    usage
        .mips
        .resolve(levels)
        .ok_or_else(|| GraphError::MipOutOfRange {
            pass: pass.name().to_string(),
            resource: usage.resource.clone(),
            base: usage.mips.base,
            count: usage.mips.count,
            levels,
        })
}

/// Kahn's sort, lowest index first. On a cycle, returns the passes that
/// could not be ordered.
fn topological_order(successors: &[BTreeSet<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let mut in_degree = vec![0usize; successors.len()];
    for targets in successors {
        for &target in targets {
            in_degree[target] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(pass, _)| Reverse(pass))
        .collect();

    let mut order = Vec::with_capacity(successors.len());
    while let Some(Reverse(pass)) = ready.pop() {
        order.push(pass);
        for &next in &successors[pass] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() < successors.len() {
        return Err(in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree > 0)
            .map(|(pass, _)| pass)
            .collect());
    }
    Ok(order)
}

fn hazard_kind(last: &LastAccess, access: Access, role: ResourceRole) -> Option<BarrierKind> {
    match (last.write, access.is_read(), access.is_write()) {
        (true, true, _) => Some(BarrierKind::ReadAfterWrite),
        (true, false, _) => Some(BarrierKind::WriteAfterWrite),
        (false, _, true) => Some(BarrierKind::WriteAfterRead),
        (false, _, false) if last.role != role => Some(BarrierKind::LayoutTransition),
        _ => None,
    }
}
