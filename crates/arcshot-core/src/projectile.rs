//! Projectile lifecycle: spawn, age and despawn.
//!
//! Projectiles live in a slot map; a reverse map from the engine's body handle
//! lets contact events find them. Both maps are always updated together, in
//! [`ProjectileManager::spawn`] and [`ProjectileManager::remove`] only.

use std::collections::{HashMap, HashSet};

use bevy::math::{Quat, Vec3};
use rapier3d::prelude::*;
use slotmap::{Key, SlotMap, new_key_type};

use crate::config::ProjectileConfig;
use crate::error::FireError;
use crate::groups::BodyTag;
use crate::physics::{PhysicsWorld, to_vector};
use crate::render::{RenderBackend, VisualGeometry, VisualId, VisualKind, VisualTransform};
use crate::trajectory::UNIT_TOLERANCE;

new_key_type! {
    /// Generational handle of an in-flight projectile.
    pub struct ProjectileKey;
}

/// Why a projectile left the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Lived longer than the configured maximum lifetime.
    Expired,
    /// Touched terrain and was marked for removal.
    WorldContact,
    /// Fell below the kill floor (missed or tunneled through terrain).
    BelowFloor,
}

/// A projectile removed during [`ProjectileManager::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    pub key: ProjectileKey,
    pub reason: RemovalReason,
}

/// An in-flight projectile.
#[derive(Debug, Clone)]
pub struct Projectile {
    pub body: RigidBodyHandle,
    pub visual: VisualId,
    /// Transform mirrored from the physics body on each update.
    pub position: Vec3,
    pub rotation: Quat,
    /// Seconds since spawn.
    pub age: f32,
}

/// Owns every in-flight projectile.
#[derive(Debug, Default)]
pub struct ProjectileManager {
    projectiles: SlotMap<ProjectileKey, Projectile>,
    by_body: HashMap<RigidBodyHandle, ProjectileKey>,
    pending_removal: HashSet<ProjectileKey>,
    config: ProjectileConfig,
}

impl ProjectileManager {
    pub fn new(config: ProjectileConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Replaces the configuration; applies to later spawns and updates.
    pub fn set_config(&mut self, config: ProjectileConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &ProjectileConfig {
        &self.config
    }

    /// Spawns a projectile at `origin` moving along `direction` at `speed`.
    ///
    /// `direction` must be a unit vector and `speed` positive.
    pub fn spawn<R: RenderBackend + ?Sized>(
        &mut self,
        world: &mut PhysicsWorld,
        render: &mut R,
        origin: Vec3,
        direction: Vec3,
        speed: f32,
    ) -> Result<ProjectileKey, FireError> {
        if !origin.is_finite()
            || !(speed > 0.0 && speed.is_finite())
            || (direction.length() - 1.0).abs() > UNIT_TOLERANCE
        {
            return Err(FireError::InvalidShot);
        }
        let limit = self.config.max_active as usize;
        if self.projectiles.len() >= limit {
            return Err(FireError::TooManyProjectiles { limit });
        }

        let radius = self.config.radius;
        let rigid_body = RigidBodyBuilder::dynamic()
            .translation(to_vector(origin))
            .linvel(to_vector(direction * speed))
            .build();
        let body = world.add_rigid_body(rigid_body);

        let visual = render.create_visual(
            VisualKind::Projectile,
            origin,
            VisualGeometry::Sphere { radius },
        );
        let key = self.projectiles.insert(Projectile {
            body,
            visual,
            position: origin,
            rotation: Quat::IDENTITY,
            age: 0.0,
        });

        let collider = ColliderBuilder::ball(radius)
            .density(1.0)
            .restitution(0.3)
            .friction(0.5)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS)
            .user_data(BodyTag::projectile(key.data().as_ffi()).encode())
            .build();
        world.add_collider(collider, body);
        self.by_body.insert(body, key);

        tracing::debug!("[projectile] spawned {key:?} at {origin} speed {speed:.1}");
        Ok(key)
    }

    /// Resolves an engine body to a live projectile.
    pub fn resolve(&self, body: RigidBodyHandle) -> Option<ProjectileKey> {
        self.by_body.get(&body).copied()
    }

    /// Marks a projectile for removal at the next [`ProjectileManager::update`].
    /// Unknown keys are ignored.
    pub fn mark_for_removal(&mut self, key: ProjectileKey) {
        if self.projectiles.contains_key(key) {
            self.pending_removal.insert(key);
        }
    }

    pub fn is_marked(&self, key: ProjectileKey) -> bool {
        self.pending_removal.contains(&key)
    }

    /// Ages every projectile by `dt`, mirrors body transforms into visuals and
    /// removes projectiles that expired, were marked, or fell below the kill
    /// floor (checked in that order).
    pub fn update<R: RenderBackend + ?Sized>(
        &mut self,
        world: &mut PhysicsWorld,
        render: &mut R,
        dt: f32,
    ) -> Vec<Removal> {
        let mut removals = Vec::new();

        for (key, projectile) in &mut self.projectiles {
            projectile.age += dt;
            if let Some((position, rotation)) = world.body_pose(projectile.body) {
                projectile.position = position;
                projectile.rotation = rotation;
            }
            render.set_transform(
                projectile.visual,
                VisualTransform {
                    translation: projectile.position,
                    rotation: projectile.rotation,
                },
            );

            let reason = if projectile.age > self.config.max_lifetime_sec {
                Some(RemovalReason::Expired)
            } else if self.pending_removal.contains(&key) {
                Some(RemovalReason::WorldContact)
            } else if projectile.position.y < self.config.kill_floor_y {
                Some(RemovalReason::BelowFloor)
            } else {
                None
            };
            if let Some(reason) = reason {
                removals.push(Removal { key, reason });
            }
        }

        for removal in &removals {
            tracing::debug!("[projectile] removing {:?} ({:?})", removal.key, removal.reason);
            self.remove(world, render, removal.key);
        }
        removals
    }

    /// Releases a projectile's body and visual. Returns false if the key was
    /// unknown or already removed.
    pub fn remove<R: RenderBackend + ?Sized>(
        &mut self,
        world: &mut PhysicsWorld,
        render: &mut R,
        key: ProjectileKey,
    ) -> bool {
        self.pending_removal.remove(&key);
        let Some(projectile) = self.projectiles.remove(key) else {
            return false;
        };
        self.by_body.remove(&projectile.body);
        world.remove_rigid_body(projectile.body);
        render.destroy_visual(projectile.visual);
        true
    }

    /// Removes every projectile immediately.
    pub fn clear<R: RenderBackend + ?Sized>(&mut self, world: &mut PhysicsWorld, render: &mut R) {
        let keys: Vec<_> = self.projectiles.keys().collect();
        for key in keys {
            self.remove(world, render, key);
        }
        self.pending_removal.clear();
    }

    pub fn get(&self, key: ProjectileKey) -> Option<&Projectile> {
        self.projectiles.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProjectileKey, &Projectile)> {
        self.projectiles.iter()
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    /// True when the active map and the body lookup map hold exactly the same
    /// projectiles.
    pub fn is_consistent(&self) -> bool {
        self.projectiles.len() == self.by_body.len()
            && self
                .projectiles
                .iter()
                .all(|(key, p)| self.by_body.get(&p.body) == Some(&key))
            && self.pending_removal.iter().all(|k| self.projectiles.contains_key(*k))
    }

    #[cfg(test)]
    pub(crate) fn set_age(&mut self, key: ProjectileKey, age: f32) {
        if let Some(projectile) = self.projectiles.get_mut(key) {
            projectile.age = age;
        }
    }
}
