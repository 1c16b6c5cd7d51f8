//! Static terrain and target layout.
//!
//! The shooter stands near the origin facing -Z. The arena is a ground slab
//! plus one platform per tier, each tier further away and higher than the
//! last. Every terrain body is a world body: a projectile touching one is
//! despawned.

use std::collections::HashMap;

use bevy::math::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rapier3d::prelude::*;

use crate::config::TargetsConfig;
use crate::groups::BodyTag;
use crate::physics::{PhysicsWorld, to_vector};

/// Identity of a terrain body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldBodyId(pub u32);

/// Half extents of the ground slab, whose top face is at y = 0.
pub const GROUND_HALF_EXTENTS: Vec3 = Vec3::new(60.0, 0.5, 60.0);

const PLATFORM_HALF_THICKNESS: f32 = 0.25;
const PLATFORM_HALF_DEPTH: f32 = 1.0;

/// A static box in the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slab {
    pub id: WorldBodyId,
    pub center: Vec3,
    pub half_extents: Vec3,
    body: RigidBodyHandle,
}

impl Slab {
    /// Height of the top face.
    pub fn top(&self) -> f32 {
        self.center.y + self.half_extents.y
    }
}

/// Terrain bodies of the current layout.
#[derive(Debug, Default)]
pub struct Arena {
    slabs: Vec<Slab>,
    by_body: HashMap<RigidBodyHandle, WorldBodyId>,
}

impl Arena {
    /// Builds the ground and one platform per tier.
    pub fn build(world: &mut PhysicsWorld, config: &TargetsConfig) -> Self {
        let mut arena = Self::default();
        arena.add_slab(world, Vec3::new(0.0, -GROUND_HALF_EXTENTS.y, 0.0), GROUND_HALF_EXTENTS);

        for tier in 0..config.tier_count() {
            let (distance, top) = tier_geometry(config, tier);
            let half_extents = Vec3::new(
                config.platform_width / 2.0,
                PLATFORM_HALF_THICKNESS,
                PLATFORM_HALF_DEPTH,
            );
            let center = Vec3::new(0.0, top - PLATFORM_HALF_THICKNESS, -distance);
            arena.add_slab(world, center, half_extents);
        }

        tracing::info!("[arena] built {} world bodies", arena.slabs.len());
        arena
    }

    /// Removes the current terrain and builds it again from `config`.
    pub fn rebuild(&mut self, world: &mut PhysicsWorld, config: &TargetsConfig) {
        for slab in self.slabs.drain(..) {
            world.remove_rigid_body(slab.body);
        }
        *self = Self::build(world, config);
    }

    fn add_slab(&mut self, world: &mut PhysicsWorld, center: Vec3, half_extents: Vec3) {
        #[allow(clippy::cast_possible_truncation)]
        let id = WorldBodyId(self.slabs.len() as u32);
        let body = world.add_rigid_body(
            RigidBodyBuilder::fixed()
                .translation(to_vector(center))
                .build(),
        );
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .friction(0.8)
            .active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS)
            .user_data(BodyTag::world(u64::from(id.0)).encode())
            .build();
        world.add_collider(collider, body);

        self.by_body.insert(body, id);
        self.slabs.push(Slab {
            id,
            center,
            half_extents,
            body,
        });
    }

    /// Resolves an engine body to a world body.
    pub fn world_body(&self, body: RigidBodyHandle) -> Option<WorldBodyId> {
        self.by_body.get(&body).copied()
    }

    pub fn slabs(&self) -> &[Slab] {
        &self.slabs
    }
}

/// Distance from the shooter and platform top height of a tier.
#[allow(clippy::cast_precision_loss)]
fn tier_geometry(config: &TargetsConfig, tier: u32) -> (f32, f32) {
    let tiers = config.tier_count();
    let fraction = if tiers > 1 {
        tier as f32 / (tiers - 1) as f32
    } else {
        0.0
    };
    let distance = config.min_distance + (config.max_distance - config.min_distance) * fraction;
    let top = config.tier_rise * (tier + 1) as f32;
    (distance, top)
}

/// Target centers for `config`, deterministic in `config.seed`.
///
/// Each platform is split into `per_tier` equal slots along x and one target
/// is jittered inside each slot, so targets never overlap.
#[allow(clippy::cast_precision_loss)]
pub fn target_placements(config: &TargetsConfig) -> Vec<Vec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let he: Vec3 = config.half_extents.into();
    let (tiers, per_tier) = (config.tier_count(), config.targets_per_tier());
    let slot_width = config.platform_width / per_tier as f32;
    let jitter = ((slot_width / 2.0 - he.x) * 0.5).max(0.0);

    let mut placements = Vec::with_capacity(tiers.saturating_mul(per_tier) as usize);
    for tier in 0..tiers {
        let (distance, top) = tier_geometry(config, tier);
        for slot in 0..per_tier {
            let base_x = -config.platform_width / 2.0 + slot_width * (slot as f32 + 0.5);
            let x = base_x + rng.random_range(-jitter..=jitter);
            placements.push(Vec3::new(x, top + he.y, -distance));
        }
    }
    placements
}
