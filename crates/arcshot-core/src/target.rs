//! Static targets.
//!
//! Targets are fixed bodies in the TARGET group with sensor colliders: the
//! engine reports every overlap with a projectile as a contact but never
//! pushes back, which is what lets shots pierce through.

use std::collections::HashMap;

use bevy::math::Vec3;
use rapier3d::prelude::*;
use slotmap::{Key, SlotMap, new_key_type};

use crate::groups::BodyTag;
use crate::physics::{PhysicsWorld, to_vector};
use crate::render::{RenderBackend, VisualGeometry, VisualId, VisualKind};

new_key_type! {
    /// Generational handle of a target.
    pub struct TargetKey;
}

/// Shape and value shared by every target of a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetTemplate {
    pub half_extents: Vec3,
    pub points: u32,
}

impl Default for TargetTemplate {
    fn default() -> Self {
        Self {
            half_extents: Vec3::new(0.4, 0.4, 0.1),
            points: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Target {
    pub position: Vec3,
    pub alive: bool,
    pub points: u32,
    body: Option<RigidBodyHandle>,
    visual: Option<VisualId>,
}

/// Result of a successful [`TargetRegistry::destroy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DestroyedTarget {
    pub key: TargetKey,
    pub position: Vec3,
    pub points: u32,
    /// Alive targets left after this one.
    pub remaining: usize,
}

/// Owns the targets of the current session.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: SlotMap<TargetKey, Target>,
    by_body: HashMap<RigidBodyHandle, TargetKey>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates one alive target per placement.
    pub fn create_all<R: RenderBackend + ?Sized>(
        &mut self,
        world: &mut PhysicsWorld,
        render: &mut R,
        placements: &[Vec3],
        template: TargetTemplate,
    ) {
        let he = template.half_extents;
        for &position in placements {
            let key = self.targets.insert(Target {
                position,
                alive: true,
                points: template.points,
                body: None,
                visual: None,
            });

            let body = world.add_rigid_body(
                RigidBodyBuilder::fixed()
                    .translation(to_vector(position))
                    .build(),
            );
            let collider = ColliderBuilder::cuboid(he.x, he.y, he.z)
                .sensor(true)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .active_hooks(ActiveHooks::FILTER_INTERSECTION_PAIR)
                .user_data(BodyTag::target(key.data().as_ffi()).encode())
                .build();
            world.add_collider(collider, body);
            let visual = render.create_visual(
                VisualKind::Target,
                position,
                VisualGeometry::Cuboid { half_extents: he },
            );

            if let Some(target) = self.targets.get_mut(key) {
                target.body = Some(body);
                target.visual = Some(visual);
            }
            self.by_body.insert(body, key);
        }
        tracing::info!("[target] created {} targets", placements.len());
    }

    /// Destroys a target. Returns `None` if it is unknown or already dead.
    pub fn destroy<R: RenderBackend + ?Sized>(
        &mut self,
        world: &mut PhysicsWorld,
        render: &mut R,
        key: TargetKey,
    ) -> Option<DestroyedTarget> {
        let target = self.targets.get_mut(key).filter(|t| t.alive)?;
        target.alive = false;
        let position = target.position;
        let points = target.points;

        if let Some(body) = target.body.take() {
            self.by_body.remove(&body);
            world.remove_rigid_body(body);
        }
        if let Some(visual) = target.visual.take() {
            render.destroy_visual(visual);
        }

        let remaining = self.alive_count();
        tracing::debug!("[target] destroyed {key:?}, {remaining} remaining");
        Some(DestroyedTarget {
            key,
            position,
            points,
            remaining,
        })
    }

    /// Resolves an engine body to an alive target.
    pub fn resolve(&self, body: RigidBodyHandle) -> Option<TargetKey> {
        self.by_body.get(&body).copied()
    }

    pub fn alive_count(&self) -> usize {
        self.targets.values().filter(|t| t.alive).count()
    }

    /// Destroys every remaining target, forgets all of them and creates a
    /// fresh batch.
    pub fn clear_and_respawn<R: RenderBackend + ?Sized>(
        &mut self,
        world: &mut PhysicsWorld,
        render: &mut R,
        placements: &[Vec3],
        template: TargetTemplate,
    ) {
        let keys: Vec<_> = self.targets.keys().collect();
        for key in keys {
            self.destroy(world, render, key);
        }
        self.targets.clear();
        self.by_body.clear();
        self.create_all(world, render, placements, template);
    }

    pub fn get(&self, key: TargetKey) -> Option<&Target> {
        self.targets.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetKey, &Target)> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::VisualQueue;

    fn placements(n: usize) -> Vec<Vec3> {
        (0..n).map(|i| Vec3::new(i as f32, 1.0, -10.0)).collect()
    }

    #[test]
    fn test_create_all() {
        let mut world = PhysicsWorld::new();
        let mut render = VisualQueue::new();
        let mut registry = TargetRegistry::new();

        registry.create_all(&mut world, &mut render, &placements(3), TargetTemplate::default());

        assert_eq!(registry.alive_count(), 3);
        assert_eq!(world.body_count(), 3);
        assert_eq!(render.live_count(), 3);
        assert!(registry.iter().all(|(_, t)| t.alive && t.points == 50));
    }

    #[test]
    fn test_target_colliders_are_sensors() {
        let mut world = PhysicsWorld::new();
        let mut render = VisualQueue::new();
        let mut registry = TargetRegistry::new();
        registry.create_all(&mut world, &mut render, &placements(2), TargetTemplate::default());

        assert_eq!(world.collider_set.len(), 2);
        for (_, collider) in world.collider_set.iter() {
            assert!(collider.is_sensor());
            assert!(collider.active_events().contains(ActiveEvents::COLLISION_EVENTS));
        }
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut world = PhysicsWorld::new();
        let mut render = VisualQueue::new();
        let mut registry = TargetRegistry::new();
        registry.create_all(&mut world, &mut render, &placements(2), TargetTemplate::default());

        let (key, body) = {
            let (key, target) = registry.iter().next().unwrap();
            (key, target.body.unwrap())
        };
        assert_eq!(registry.resolve(body), Some(key));

        let destroyed = registry.destroy(&mut world, &mut render, key).unwrap();
        assert_eq!(destroyed.remaining, 1);
        assert_eq!(destroyed.points, 50);
        assert_eq!(registry.resolve(body), None);
        assert!(!registry.get(key).unwrap().alive);

        assert_eq!(registry.destroy(&mut world, &mut render, key), None);
        assert_eq!(registry.alive_count(), 1);
        assert_eq!(world.body_count(), 1);
        assert_eq!(render.live_count(), 1);
    }

    #[test]
    fn test_clear_and_respawn() {
        let mut world = PhysicsWorld::new();
        let mut render = VisualQueue::new();
        let mut registry = TargetRegistry::new();
        let spots = placements(4);
        registry.create_all(&mut world, &mut render, &spots, TargetTemplate::default());

        let first = registry.iter().next().map(|(k, _)| k).unwrap();
        registry.destroy(&mut world, &mut render, first);
        assert_eq!(registry.alive_count(), 3);

        registry.clear_and_respawn(&mut world, &mut render, &spots, TargetTemplate::default());
        assert_eq!(registry.alive_count(), 4);
        assert_eq!(registry.len(), 4);
        assert_eq!(world.body_count(), 4);
        assert_eq!(render.live_count(), 4);
        assert!(registry.get(first).is_none());
    }
}
