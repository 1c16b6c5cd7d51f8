//! Game configuration.
//!
//! Configuration is JSON with camelCase keys. Loading is lenient: every field
//! is read on its own, so a missing field keeps its previous value and a
//! malformed one is reported and replaced by the previous (last-known-good)
//! value instead of failing the whole document.

use std::ops::RangeInclusive;
use std::path::Path;

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

/// Plain xyz triple used in the JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3Config {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3Config {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<Vec3Config> for Vec3 {
    fn from(v: Vec3Config) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for Vec3Config {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectileConfig {
    pub initial_speed: f32,
    pub radius: f32,
    pub max_lifetime_sec: f32,
    /// Projectiles below this height are removed (tunneling fallback).
    pub kill_floor_y: f32,
    pub max_active: u32,
    /// Distance from the shooter position at which projectiles appear.
    pub muzzle_offset: f32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            initial_speed: 18.0,
            radius: 0.12,
            max_lifetime_sec: 8.0,
            kill_floor_y: -5.0,
            max_active: 32,
            muzzle_offset: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhysicsConfig {
    pub gravity: Vec3Config,
    /// Upper bound on the frame delta fed to physics, ages and the timer.
    pub max_frame_dt: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3Config::new(0.0, -9.8, 0.0),
            max_frame_dt: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrajectoryConfig {
    pub segment_length: f32,
    pub max_points: u32,
    pub max_time_sec: f32,
    pub ground_threshold: f32,
    pub min_dt: f32,
    pub max_dt: f32,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            segment_length: 0.35,
            max_points: 120,
            max_time_sec: 4.0,
            ground_threshold: 0.0,
            min_dt: 0.001,
            max_dt: 0.1,
        }
    }
}

/// Largest accepted `targets.tiers`.
pub const MAX_TIERS: u32 = 16;
/// Largest accepted `targets.perTier`.
pub const MAX_PER_TIER: u32 = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetsConfig {
    pub min_distance: f32,
    pub max_distance: f32,
    pub points_per_hit: u32,
    pub half_extents: Vec3Config,
    pub tiers: u32,
    pub per_tier: u32,
    /// Height gained by each successive platform tier.
    pub tier_rise: f32,
    /// Width of each platform along x.
    pub platform_width: f32,
    pub seed: u64,
}

impl TargetsConfig {
    /// Number of platform tiers, bounded to `1..=MAX_TIERS`.
    pub fn tier_count(&self) -> u32 {
        self.tiers.clamp(1, MAX_TIERS)
    }

    /// Targets per tier, bounded to `1..=MAX_PER_TIER`.
    pub fn targets_per_tier(&self) -> u32 {
        self.per_tier.clamp(1, MAX_PER_TIER)
    }
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            min_distance: 8.0,
            max_distance: 20.0,
            points_per_hit: 50,
            half_extents: Vec3Config::new(0.4, 0.4, 0.1),
            tiers: 3,
            per_tier: 3,
            tier_rise: 1.5,
            platform_width: 8.0,
            seed: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub time_limit_sec: f32,
    pub low_time_warning_sec: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_limit_sec: 60.0,
            low_time_warning_sec: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShooterConfig {
    pub position: Vec3Config,
    pub min_pitch_deg: f32,
    pub max_pitch_deg: f32,
}

impl Default for ShooterConfig {
    fn default() -> Self {
        Self {
            position: Vec3Config::new(0.0, 1.6, 0.0),
            min_pitch_deg: -30.0,
            max_pitch_deg: 60.0,
        }
    }
}

/// Complete game configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub projectile: ProjectileConfig,
    pub physics: PhysicsConfig,
    pub trajectory: TrajectoryConfig,
    pub targets: TargetsConfig,
    pub session: SessionConfig,
    pub shooter: ShooterConfig,
}

impl GameConfig {
    /// Reads and parses a config file over the built-in defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text)?;
        Ok(Self::default().merged_with(&value))
    }

    /// Like [`GameConfig::load`], but any fetch or parse failure falls back to
    /// built-in defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("[config] {err}; using built-in defaults");
                Self::default()
            }
        }
    }

    /// Parses `text` field by field over `self`, which acts as the
    /// last-known-good configuration.
    pub fn from_json_str_with_fallback(&self, text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.merged_with(&value),
            Err(err) => {
                tracing::warn!("[config] invalid JSON ({err}); keeping previous configuration");
                self.clone()
            }
        }
    }

    /// Serializes the configuration as pretty JSON.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Returns a copy of `self` with every valid field of `value` applied.
    pub fn merged_with(&self, value: &Value) -> Self {
        if !value.is_object() {
            tracing::warn!("[config] root is not an object; keeping previous configuration");
            return self.clone();
        }
        let r = FieldReader { root: value };
        let base = self;

        let b = &base.projectile;
        let projectile = ProjectileConfig {
            initial_speed: r.f32(&["projectile", "initialSpeed"], b.initial_speed, positive),
            radius: r.f32(&["projectile", "radius"], b.radius, positive),
            max_lifetime_sec: r.f32(
                &["projectile", "maxLifetimeSec"],
                b.max_lifetime_sec,
                positive,
            ),
            kill_floor_y: r.f32(&["projectile", "killFloorY"], b.kill_floor_y, any),
            max_active: r.u32(&["projectile", "maxActive"], b.max_active, 1..=u32::MAX),
            muzzle_offset: r.f32(&["projectile", "muzzleOffset"], b.muzzle_offset, non_negative),
        };

        let b = &base.physics;
        let physics = PhysicsConfig {
            gravity: r.vec3(&["physics", "gravity"], b.gravity),
            max_frame_dt: r.f32(&["physics", "maxFrameDt"], b.max_frame_dt, positive),
        };

        let b = &base.trajectory;
        let mut trajectory = TrajectoryConfig {
            segment_length: r.f32(&["trajectory", "segmentLength"], b.segment_length, positive),
            max_points: r.u32(&["trajectory", "maxPoints"], b.max_points, 2..=u32::MAX),
            max_time_sec: r.f32(&["trajectory", "maxTimeSec"], b.max_time_sec, positive),
            ground_threshold: r.f32(&["trajectory", "groundThreshold"], b.ground_threshold, any),
            min_dt: r.f32(&["trajectory", "minDt"], b.min_dt, positive),
            max_dt: r.f32(&["trajectory", "maxDt"], b.max_dt, positive),
        };
        if trajectory.max_dt < trajectory.min_dt {
            tracing::warn!(
                "[config] trajectory.maxDt {} < minDt {}; keeping previous step bounds",
                trajectory.max_dt,
                trajectory.min_dt
            );
            trajectory.min_dt = base.trajectory.min_dt;
            trajectory.max_dt = base.trajectory.max_dt;
        }

        let b = &base.targets;
        let mut targets = TargetsConfig {
            min_distance: r.f32(&["targets", "minDistance"], b.min_distance, positive),
            max_distance: r.f32(&["targets", "maxDistance"], b.max_distance, positive),
            points_per_hit: r.u32(&["targets", "pointsPerHit"], b.points_per_hit, 0..=u32::MAX),
            half_extents: r.vec3(&["targets", "halfExtents"], b.half_extents),
            tiers: r.u32(&["targets", "tiers"], b.tiers, 1..=MAX_TIERS),
            per_tier: r.u32(&["targets", "perTier"], b.per_tier, 1..=MAX_PER_TIER),
            tier_rise: r.f32(&["targets", "tierRise"], b.tier_rise, non_negative),
            platform_width: r.f32(&["targets", "platformWidth"], b.platform_width, positive),
            seed: r.u64(&["targets", "seed"], b.seed),
        };
        if targets.max_distance < targets.min_distance {
            tracing::warn!(
                "[config] targets.maxDistance {} < minDistance {}; keeping previous range",
                targets.max_distance,
                targets.min_distance
            );
            targets.min_distance = base.targets.min_distance;
            targets.max_distance = base.targets.max_distance;
        }
        let he = targets.half_extents;
        if !(he.x > 0.0 && he.y > 0.0 && he.z > 0.0) {
            tracing::warn!("[config] targets.halfExtents must be positive; keeping previous size");
            targets.half_extents = base.targets.half_extents;
        }

        let b = &base.session;
        let session = SessionConfig {
            time_limit_sec: r.f32(&["session", "timeLimitSec"], b.time_limit_sec, positive),
            low_time_warning_sec: r.f32(
                &["session", "lowTimeWarningSec"],
                b.low_time_warning_sec,
                non_negative,
            ),
        };

        let b = &base.shooter;
        let mut shooter = ShooterConfig {
            position: r.vec3(&["shooter", "position"], b.position),
            min_pitch_deg: r.f32(&["shooter", "minPitchDeg"], b.min_pitch_deg, pitch_limit),
            max_pitch_deg: r.f32(&["shooter", "maxPitchDeg"], b.max_pitch_deg, pitch_limit),
        };
        if shooter.max_pitch_deg < shooter.min_pitch_deg {
            tracing::warn!("[config] shooter pitch limits inverted; keeping previous limits");
            shooter.min_pitch_deg = base.shooter.min_pitch_deg;
            shooter.max_pitch_deg = base.shooter.max_pitch_deg;
        }

        Self {
            projectile,
            physics,
            trajectory,
            targets,
            session,
            shooter,
        }
    }
}

fn positive(v: f32) -> bool {
    v > 0.0
}

fn non_negative(v: f32) -> bool {
    v >= 0.0
}

fn any(_: f32) -> bool {
    true
}

fn pitch_limit(v: f32) -> bool {
    (-89.0..=89.0).contains(&v)
}

/// Reads individual fields from a JSON document, falling back per field.
struct FieldReader<'a> {
    root: &'a Value,
}

impl<'a> FieldReader<'a> {
    fn lookup(&self, path: &[&str]) -> Option<&'a Value> {
        let mut current = self.root;
        for (depth, key) in path.iter().enumerate() {
            let Value::Object(map) = current else {
                tracing::warn!(
                    "[config] {} is not an object; ignoring its fields",
                    path[..depth].join(".")
                );
                return None;
            };
            current = map.get(*key)?;
        }
        Some(current)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn f32(&self, path: &[&str], current: f32, valid: fn(f32) -> bool) -> f32 {
        let Some(value) = self.lookup(path) else {
            return current;
        };
        match value.as_f64().map(|v| v as f32) {
            Some(v) if v.is_finite() && valid(v) => v,
            _ => {
                tracing::warn!(
                    "[config] {}: invalid value {value}; keeping {current}",
                    path.join(".")
                );
                current
            }
        }
    }

    fn u32(&self, path: &[&str], current: u32, valid: RangeInclusive<u32>) -> u32 {
        let Some(value) = self.lookup(path) else {
            return current;
        };
        match value.as_u64().and_then(|v| u32::try_from(v).ok()) {
            Some(v) if valid.contains(&v) => v,
            _ => {
                tracing::warn!(
                    "[config] {}: invalid value {value}; keeping {current}",
                    path.join(".")
                );
                current
            }
        }
    }

    fn u64(&self, path: &[&str], current: u64) -> u64 {
        let Some(value) = self.lookup(path) else {
            return current;
        };
        value.as_u64().unwrap_or_else(|| {
            tracing::warn!("[config] {}: invalid value {value}; keeping {current}", path.join("."));
            current
        })
    }

    fn vec3(&self, path: &[&str], current: Vec3Config) -> Vec3Config {
        let axis = |name: &'static str, current: f32| {
            let mut full = path.to_vec();
            full.push(name);
            self.f32(&full, current, any)
        };
        Vec3Config {
            x: axis("x", current.x),
            y: axis("y", current.y),
            z: axis("z", current.z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_document_keeps_defaults() {
        let config = GameConfig::default().from_json_str_with_fallback("{}");
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn test_partial_document_overrides_only_given_fields() {
        let config = GameConfig::default().merged_with(&json!({
            "projectile": { "initialSpeed": 25.0 },
            "physics": { "gravity": { "y": -20.0 } },
            "session": { "timeLimitSec": 30 }
        }));

        assert_eq!(config.projectile.initial_speed, 25.0);
        assert_eq!(config.physics.gravity, Vec3Config::new(0.0, -20.0, 0.0));
        assert_eq!(config.session.time_limit_sec, 30.0);
        assert_eq!(config.trajectory, TrajectoryConfig::default());
    }

    #[test]
    fn test_malformed_fields_fall_back_individually() {
        let config = GameConfig::default().merged_with(&json!({
            "projectile": { "initialSpeed": "fast", "radius": 0.2 },
            "trajectory": { "maxPoints": -3, "segmentLength": 0.5 },
            "targets": "lots"
        }));

        assert_eq!(config.projectile.initial_speed, 18.0);
        assert_eq!(config.projectile.radius, 0.2);
        assert_eq!(config.trajectory.max_points, 120);
        assert_eq!(config.trajectory.segment_length, 0.5);
        assert_eq!(config.targets, TargetsConfig::default());
    }

    #[test]
    fn test_fallback_uses_last_known_good() {
        let first = GameConfig::default().merged_with(&json!({
            "projectile": { "initialSpeed": 30.0 }
        }));
        let second =
            first.from_json_str_with_fallback(r#"{ "projectile": { "initialSpeed": 0 } }"#);
        assert_eq!(second.projectile.initial_speed, 30.0);

        let third = first.from_json_str_with_fallback("not json");
        assert_eq!(third, first);
    }

    #[test]
    fn test_inverted_ranges_are_rejected() {
        let config = GameConfig::default().merged_with(&json!({
            "targets": { "minDistance": 30.0, "maxDistance": 10.0 },
            "trajectory": { "minDt": 0.5, "maxDt": 0.01 }
        }));
        assert_eq!(config.targets.min_distance, 8.0);
        assert_eq!(config.targets.max_distance, 20.0);
        assert_eq!(config.trajectory.min_dt, 0.001);
        assert_eq!(config.trajectory.max_dt, 0.1);
    }

    #[test]
    fn test_oversized_layout_is_rejected() {
        let config = GameConfig::default()
            .from_json_str_with_fallback(r#"{"targets":{"tiers":70000,"perTier":70000}}"#);
        assert_eq!(config.targets.tiers, 3);
        assert_eq!(config.targets.per_tier, 3);

        let config = GameConfig::default().merged_with(&json!({
            "targets": { "tiers": MAX_TIERS, "perTier": MAX_PER_TIER + 1 }
        }));
        assert_eq!(config.targets.tiers, MAX_TIERS);
        assert_eq!(config.targets.per_tier, 3);
    }

    #[test]
    fn test_layout_counts_are_bounded() {
        let mut targets = TargetsConfig {
            tiers: u32::MAX,
            per_tier: 0,
            ..TargetsConfig::default()
        };
        assert_eq!(targets.tier_count(), MAX_TIERS);
        assert_eq!(targets.targets_per_tier(), 1);

        targets.per_tier = 5;
        assert_eq!(targets.targets_per_tier(), 5);
    }

    #[test]
    fn test_serialized_keys_match_lenient_reader() {
        let mut custom = GameConfig::default();
        custom.projectile.initial_speed = 22.0;
        custom.targets.tiers = 4;
        custom.shooter.position = Vec3Config::new(1.0, 2.0, 3.0);

        let parsed = GameConfig::default().from_json_str_with_fallback(&custom.to_json_string());
        assert_eq!(parsed, custom);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("arcshot-config-does-not-exist.json");
        assert!(matches!(GameConfig::load(&path), Err(ConfigError::Io { .. })));
        assert_eq!(GameConfig::load_or_default(&path), GameConfig::default());
    }
}
