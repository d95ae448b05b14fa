//! Entity arena for the renderer's scene collaborator.
//!
//! Entities are slots in an arena addressed by [`Entity`] handles carrying a
//! generation counter. Components live in parallel columns indexed by the
//! slot, and the hierarchy is a plain `parent` index column: nothing in the
//! scene owns anything else through pointers.
//!
//! ```text
//! slot:        0        1        2        3
//! generation:  1        3        1        2
//! alive:       yes      yes      no       yes
//! transform:   Some     Some     None     Some
//! parent:      None     Some(0)  None     Some(1)
//! light:       None     Some     None     None
//! ```
//!
//! The renderer never reads the arena directly. Each frame it receives a
//! [`SceneSnapshot`] with world-space object matrices and light lists.
//!
//! # Example
//!
//! ```
//! use stratus_core::math::Vec3;
//! use stratus_core::scene::{Scene, Transform};
//!
//! let mut scene = Scene::new();
//! let root = scene.spawn("root");
//! scene.set_transform(root, Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)));
//! let child = scene.spawn("child");
//! scene.set_parent(child, Some(root));
//!
//! let world = scene.world_matrix(child).unwrap();
//! assert_eq!(world[(0, 3)], 1.0);
//! ```

mod components;

pub use components::{Light, MeshHandle, PointLight, SpotLight, Transform};

use crate::math::{Mat4, Vec3, Vec4};

/// Generation-checked handle to an entity slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// Slot index in the arena.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// A light resolved to world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPointLight {
    pub position: Vec3,
    pub light: PointLight,
}

/// A spot light resolved to world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldSpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    pub light: SpotLight,
}

/// Per-frame view of the scene consumed by the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneSnapshot {
    /// World matrices of every entity with a mesh, in slot order.
    pub objects: Vec<Mat4>,
    pub point_lights: Vec<WorldPointLight>,
    pub spot_lights: Vec<WorldSpotLight>,
}

/// Arena of entities with structure-of-arrays components.
#[derive(Debug, Default)]
pub struct Scene {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    names: Vec<String>,
    transforms: Vec<Transform>,
    parents: Vec<Option<u32>>,
    meshes: Vec<Option<MeshHandle>>,
    lights: Vec<Option<Light>>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a new entity with an identity transform.
    ///
    /// Freed slots are reused with a bumped generation, so stale handles to
    /// the previous occupant stop resolving.
    pub fn spawn(&mut self, name: impl Into<String>) -> Entity {
        let name = name.into();
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            self.names[slot] = name;
            self.transforms[slot] = Transform::identity();
            self.parents[slot] = None;
            self.meshes[slot] = None;
            self.lights[slot] = None;
            return Entity {
                index,
                generation: self.generations[slot],
            };
        }

        let index = self.generations.len() as u32;
        self.generations.push(1);
        self.alive.push(true);
        self.names.push(name);
        self.transforms.push(Transform::identity());
        self.parents.push(None);
        self.meshes.push(None);
        self.lights.push(None);
        Entity {
            index,
            generation: 1,
        }
    }

    /// Despawn an entity. Children are detached, not despawned.
    ///
    /// Returns `false` if the handle is stale.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        let Some(slot) = self.slot(entity) else {
            return false;
        };
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.meshes[slot] = None;
        self.lights[slot] = None;
        for parent in &mut self.parents {
            if *parent == Some(entity.index) {
                *parent = None;
            }
        }
        self.free.push(entity.index);
        log::trace!("Scene: despawned '{}' (slot {})", self.names[slot], slot);
        true
    }

    /// Check whether the handle refers to a live entity.
    pub fn contains(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.alive.iter().filter(|alive| **alive).count()
    }

    /// Returns `true` if no entity is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entity name.
    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.slot(entity).map(|slot| self.names[slot].as_str())
    }

    /// Local transform.
    pub fn transform(&self, entity: Entity) -> Option<&Transform> {
        self.slot(entity).map(|slot| &self.transforms[slot])
    }

    /// Replace the local transform. Ignored for stale handles.
    pub fn set_transform(&mut self, entity: Entity, transform: Transform) {
        if let Some(slot) = self.slot(entity) {
            self.transforms[slot] = transform;
        }
    }

    /// Attach a mesh.
    pub fn set_mesh(&mut self, entity: Entity, mesh: Option<MeshHandle>) {
        if let Some(slot) = self.slot(entity) {
            self.meshes[slot] = mesh;
        }
    }

    /// Attach a light.
    pub fn set_light(&mut self, entity: Entity, light: Option<Light>) {
        if let Some(slot) = self.slot(entity) {
            self.lights[slot] = light;
        }
    }

    /// Set or clear the parent.
    ///
    /// Returns `false` (and leaves the hierarchy untouched) if either handle
    /// is stale or the link would create a cycle.
    pub fn set_parent(&mut self, child: Entity, parent: Option<Entity>) -> bool {
        let Some(child_slot) = self.slot(child) else {
            return false;
        };
        let parent_index = match parent {
            None => None,
            Some(parent) => {
                if self.slot(parent).is_none() {
                    return false;
                }
                // Walk up from the new parent; meeting the child means a cycle.
                let mut cursor = Some(parent.index);
                while let Some(index) = cursor {
                    if index == child.index {
                        return false;
                    }
                    cursor = self.parents[index as usize];
                }
                Some(parent.index)
            }
        };
        self.parents[child_slot] = parent_index;
        true
    }

    /// Parent of an entity, if any.
    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        let slot = self.slot(entity)?;
        self.parents[slot].map(|index| Entity {
            index,
            generation: self.generations[index as usize],
        })
    }

    /// World matrix: the product of local transforms from the root down.
    pub fn world_matrix(&self, entity: Entity) -> Option<Mat4> {
        let slot = self.slot(entity)?;
        Some(self.world_matrix_of_slot(slot))
    }

    fn world_matrix_of_slot(&self, slot: usize) -> Mat4 {
        let mut matrix = self.transforms[slot].matrix();
        let mut cursor = self.parents[slot];
        while let Some(index) = cursor {
            let parent = index as usize;
            matrix = self.transforms[parent].matrix() * matrix;
            cursor = self.parents[parent];
        }
        matrix
    }

    /// Build the per-frame snapshot consumed by the renderer.
    pub fn snapshot(&self) -> SceneSnapshot {
        let mut snapshot = SceneSnapshot::default();
        for slot in 0..self.alive.len() {
            if !self.alive[slot] {
                continue;
            }
            let needs_world = self.meshes[slot].is_some() || self.lights[slot].is_some();
            if !needs_world {
                continue;
            }
            let world = self.world_matrix_of_slot(slot);
            if self.meshes[slot].is_some() {
                snapshot.objects.push(world);
            }
            let position = (world * Vec4::new(0.0, 0.0, 0.0, 1.0)).xyz();
            match self.lights[slot] {
                Some(Light::Point(light)) => {
                    snapshot
                        .point_lights
                        .push(WorldPointLight { position, light });
                }
                Some(Light::Spot(light)) => {
                    let direction = (world * Vec4::new(0.0, 0.0, -1.0, 0.0)).xyz();
                    let direction = direction.try_normalize(1e-6).unwrap_or_else(|| -Vec3::z());
                    snapshot.spot_lights.push(WorldSpotLight {
                        position,
                        direction,
                        light,
                    });
                }
                None => {}
            }
        }
        snapshot
    }

    fn slot(&self, entity: Entity) -> Option<usize> {
        let slot = entity.index as usize;
        (slot < self.alive.len()
            && self.alive[slot]
            && self.generations[slot] == entity.generation)
            .then_some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::quat_from_rotation_y;

    fn point_light() -> Light {
        Light::Point(PointLight {
            color: Vec3::new(1.0, 1.0, 1.0),
            intensity: 2.0,
            range: 10.0,
        })
    }

    #[test]
    fn test_spawn_and_despawn() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        let b = scene.spawn("b");
        assert_eq!(scene.len(), 2);
        assert!(scene.despawn(a));
        assert!(!scene.contains(a));
        assert!(scene.contains(b));
        assert!(!scene.despawn(a));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        scene.despawn(a);
        let c = scene.spawn("c");
        assert_eq!(c.index(), a.index());
        assert_ne!(c.generation(), a.generation());
        assert_eq!(scene.name(a), None);
        assert_eq!(scene.name(c), Some("c"));
    }

    #[test]
    fn test_world_matrix_composes_parents() {
        let mut scene = Scene::new();
        let root = scene.spawn("root");
        let child = scene.spawn("child");
        scene.set_transform(root, Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        scene.set_transform(child, Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        assert!(scene.set_parent(child, Some(root)));

        let world = scene.world_matrix(child).unwrap();
        assert_eq!(world[(0, 3)], 1.0);
        assert_eq!(world[(1, 3)], 2.0);
        assert_eq!(scene.parent(child), Some(root));
    }

    #[test]
    fn test_set_parent_rejects_cycles() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        let b = scene.spawn("b");
        assert!(scene.set_parent(b, Some(a)));
        assert!(!scene.set_parent(a, Some(b)));
        assert!(!scene.set_parent(a, Some(a)));
    }

    #[test]
    fn test_despawn_detaches_children() {
        let mut scene = Scene::new();
        let a = scene.spawn("a");
        let b = scene.spawn("b");
        scene.set_parent(b, Some(a));
        scene.despawn(a);
        assert_eq!(scene.parent(b), None);
    }

    #[test]
    fn test_snapshot_collects_objects_and_lights() {
        let mut scene = Scene::new();
        let mesh = scene.spawn("mesh");
        scene.set_mesh(mesh, Some(MeshHandle(7)));
        let lamp = scene.spawn("lamp");
        scene.set_transform(lamp, Transform::from_translation(Vec3::new(0.0, 3.0, 0.0)));
        scene.set_light(lamp, Some(point_light()));
        let spot = scene.spawn("spot");
        scene.set_transform(
            spot,
            Transform::identity().with_rotation(quat_from_rotation_y(std::f32::consts::FRAC_PI_2)),
        );
        scene.set_light(
            spot,
            Some(Light::Spot(SpotLight {
                color: Vec3::new(1.0, 0.0, 0.0),
                intensity: 1.0,
                range: 5.0,
                inner_angle: 0.2,
                outer_angle: 0.4,
            })),
        );
        scene.spawn("empty");

        let snapshot = scene.snapshot();
        assert_eq!(snapshot.objects.len(), 1);
        assert_eq!(snapshot.point_lights.len(), 1);
        assert_eq!(snapshot.point_lights[0].position, Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(snapshot.spot_lights.len(), 1);
        let direction = snapshot.spot_lights[0].direction;
        assert!((direction - Vec3::new(-1.0, 0.0, 0.0)).norm() < 1e-5);
    }
}
