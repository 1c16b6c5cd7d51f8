//! Collision groups and per-body tagging.
//!
//! Every body in the world belongs to exactly one group and carries a mask of
//! the groups it may touch. Both are packed into the collider's `user_data`
//! together with a small id, so engine hooks can classify a pair without
//! reaching back into the game registries.

use bitflags::bitflags;

bitflags! {
    /// Capability mask over the closed set of body categories.
    ///
    /// A single flag names a membership; a union names the set of categories
    /// a body accepts contacts from.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CollisionGroups: u32 {
        const PROJECTILE = 1;
        const TARGET = 1 << 1;
        const WORLD = 1 << 2;
    }
}

impl CollisionGroups {
    /// Mask used by projectiles: targets and terrain, never other projectiles.
    pub const PROJECTILE_MASK: Self = Self::TARGET.union(Self::WORLD);
    /// Mask used by targets and terrain: only projectiles.
    pub const STATIC_MASK: Self = Self::PROJECTILE;

    /// Returns true if two bodies accept each other.
    pub fn interacts(a: BodyTag, b: BodyTag) -> bool {
        a.mask.intersects(b.group) && b.mask.intersects(a.group)
    }
}

/// Group, mask and id of a single body, as stored in engine user data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyTag {
    pub group: CollisionGroups,
    pub mask: CollisionGroups,
    pub id: u64,
}

impl BodyTag {
    pub fn new(group: CollisionGroups, mask: CollisionGroups, id: u64) -> Self {
        Self { group, mask, id }
    }

    pub fn projectile(id: u64) -> Self {
        Self::new(CollisionGroups::PROJECTILE, CollisionGroups::PROJECTILE_MASK, id)
    }

    pub fn target(id: u64) -> Self {
        Self::new(CollisionGroups::TARGET, CollisionGroups::STATIC_MASK, id)
    }

    pub fn world(id: u64) -> Self {
        Self::new(CollisionGroups::WORLD, CollisionGroups::STATIC_MASK, id)
    }

    /// Encodes the tag as `mask << 96 | group << 64 | id`.
    pub fn encode(self) -> u128 {
        (u128::from(self.mask.bits()) << 96)
            | (u128::from(self.group.bits()) << 64)
            | u128::from(self.id)
    }

    /// Decodes a tag. Returns `None` for untagged bodies (`user_data == 0`)
    /// and for data whose group bits are not exactly one known flag.
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode(user_data: u128) -> Option<Self> {
        if user_data == 0 {
            return None;
        }
        let group = CollisionGroups::from_bits((user_data >> 64) as u32)?;
        let mask = CollisionGroups::from_bits_truncate((user_data >> 96) as u32);
        if group.bits().count_ones() != 1 {
            return None;
        }
        Some(Self {
            group,
            mask,
            id: user_data as u64,
        })
    }
}
