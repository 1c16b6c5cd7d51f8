//! Session state machine and per-frame driver.

use std::fmt;

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::arena::{Arena, target_placements};
use crate::collision::{CollisionRouter, PiercingHooks, RouteContext, RouteOutcome};
use crate::config::{GameConfig, TargetsConfig};
use crate::error::FireError;
use crate::physics::PhysicsWorld;
use crate::projectile::{ProjectileKey, ProjectileManager, Removal};
use crate::render::RenderBackend;
use crate::score::ScoreAccumulator;
use crate::target::{TargetKey, TargetRegistry, TargetTemplate};
use crate::trajectory;

/// Why a session ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// The timer ran out.
    Timeout,
    /// Every target was destroyed.
    Win,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Win => "win",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Firing and scoring are enabled.
    #[default]
    Playing,
    /// Firing is rejected and target hits no longer score. Physics keeps
    /// running so in-flight projectiles still land and despawn.
    Ended(EndReason),
}

impl SessionState {
    pub fn is_playing(self) -> bool {
        self == Self::Playing
    }
}

/// Notifications for the UI collaborator, collected until drained.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TargetDestroyed {
        key: TargetKey,
        position: Vec3,
        points: u32,
        remaining: usize,
    },
    /// Text to float at a world position, e.g. `+50` over a destroyed target.
    FloatingText { text: String, position: Vec3 },
    Ended { reason: EndReason, final_score: u32 },
}

/// A complete game: physics, projectiles, targets, terrain, score and timer.
///
/// Every mutation goes through [`GameSession::tick`] or one of the input
/// methods; nothing else holds references into the session.
pub struct GameSession<R: RenderBackend> {
    config: GameConfig,
    /// Target layout the current arena was built from.
    layout: TargetsConfig,
    world: PhysicsWorld,
    render: R,
    arena: Arena,
    projectiles: ProjectileManager,
    targets: TargetRegistry,
    score: ScoreAccumulator,
    state: SessionState,
    time_remaining: f32,
    yaw: f32,
    pitch: f32,
    preview: Vec<Vec3>,
    events: Vec<SessionEvent>,
}

impl<R: RenderBackend> fmt::Debug for GameSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("state", &self.state)
            .field("score", &self.score.value())
            .field("time_remaining", &self.time_remaining)
            .field("projectiles", &self.projectiles.len())
            .field("alive_targets", &self.targets.alive_count())
            .finish_non_exhaustive()
    }
}

/// Clamps a frame delta to `[0, max]`; non-finite deltas become 0.
pub fn sanitize_dt(dt: f32, max: f32) -> f32 {
    if dt.is_finite() { dt.clamp(0.0, max.max(0.0)) } else { 0.0 }
}

/// Unit aim vector for yaw/pitch in radians. Zero yaw and pitch aim along -Z;
/// positive yaw turns toward -X, positive pitch raises the shot.
pub fn aim_vector(yaw: f32, pitch: f32) -> Vec3 {
    let (sin_yaw, cos_yaw) = yaw.sin_cos();
    let (sin_pitch, cos_pitch) = pitch.sin_cos();
    Vec3::new(-sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch)
}

impl<R: RenderBackend> GameSession<R> {
    /// Builds the arena, spawns the targets and starts playing.
    pub fn new(config: GameConfig, mut render: R) -> Self {
        let mut world = PhysicsWorld::with_gravity(config.physics.gravity.into());
        let arena = Arena::build(&mut world, &config.targets);
        let mut targets = TargetRegistry::new();
        targets.create_all(
            &mut world,
            &mut render,
            &target_placements(&config.targets),
            target_template(&config.targets),
        );

        let mut session = Self {
            layout: config.targets.clone(),
            world,
            render,
            arena,
            projectiles: ProjectileManager::new(config.projectile.clone()),
            targets,
            score: ScoreAccumulator::new(),
            state: SessionState::Playing,
            time_remaining: config.session.time_limit_sec,
            yaw: 0.0,
            pitch: 0.0,
            preview: Vec::new(),
            events: Vec::new(),
            config,
        };
        session.refresh_preview();
        tracing::info!(
            "[session] started with {} targets, {:.0}s on the clock",
            session.targets.alive_count(),
            session.time_remaining
        );
        session
    }

    /// Fires from the muzzle along `aim`, or along the current aim direction
    /// when `None`. A rejected shot changes nothing.
    pub fn fire_projectile(&mut self, aim: Option<Vec3>) -> Result<ProjectileKey, FireError> {
        if !self.state.is_playing() {
            return Err(FireError::SessionEnded);
        }
        let direction = aim
            .unwrap_or_else(|| self.aim_direction())
            .try_normalize()
            .ok_or(FireError::InvalidShot)?;
        let origin = self.muzzle_position(direction);
        let speed = self.config.projectile.initial_speed;
        self.projectiles
            .spawn(&mut self.world, &mut self.render, origin, direction, speed)
    }

    /// Sets the aim in radians. Pitch is clamped to the shooter limits.
    pub fn set_aim_direction(&mut self, yaw: f32, pitch: f32) {
        if !(yaw.is_finite() && pitch.is_finite()) {
            tracing::debug!("[session] ignoring non-finite aim ({yaw}, {pitch})");
            return;
        }
        let shooter = &self.config.shooter;
        self.yaw = yaw;
        self.pitch = pitch.clamp(
            shooter.min_pitch_deg.to_radians(),
            shooter.max_pitch_deg.to_radians(),
        );
        self.refresh_preview();
    }

    pub fn aim_direction(&self) -> Vec3 {
        aim_vector(self.yaw, self.pitch)
    }

    /// Current (yaw, pitch) in radians.
    pub fn aim_angles(&self) -> (f32, f32) {
        (self.yaw, self.pitch)
    }

    /// Spawn point of a shot along `direction`.
    pub fn muzzle_position(&self, direction: Vec3) -> Vec3 {
        Vec3::from(self.config.shooter.position) + direction * self.config.projectile.muzzle_offset
    }

    /// Advances the session by one frame.
    pub fn tick(&mut self, dt: f32) {
        let dt = sanitize_dt(dt, self.config.physics.max_frame_dt);

        let contacts = self.world.step_with_events(dt, &PiercingHooks);
        if !contacts.is_empty() {
            let outcomes = {
                let mut ctx = RouteContext {
                    world: &mut self.world,
                    render: &mut self.render,
                    projectiles: &mut self.projectiles,
                    targets: &mut self.targets,
                    arena: &self.arena,
                    score: &mut self.score,
                    scoring_enabled: self.state.is_playing(),
                };
                CollisionRouter::route_all(&mut ctx, &contacts)
            };
            for outcome in outcomes {
                if let RouteOutcome::TargetDestroyed(destroyed) = outcome {
                    self.events.push(SessionEvent::FloatingText {
                        text: format!("+{}", destroyed.points),
                        position: destroyed.position,
                    });
                    self.events.push(SessionEvent::TargetDestroyed {
                        key: destroyed.key,
                        position: destroyed.position,
                        points: destroyed.points,
                        remaining: destroyed.remaining,
                    });
                    if destroyed.remaining == 0 {
                        self.end(EndReason::Win);
                    }
                }
            }
        }

        let removals: Vec<Removal> = self.projectiles.update(&mut self.world, &mut self.render, dt);
        if !removals.is_empty() {
            tracing::trace!("[session] {} projectiles removed", removals.len());
        }
        self.refresh_preview();

        if !self.state.is_playing() {
            return;
        }
        if !self.targets.is_empty() && self.targets.alive_count() == 0 {
            self.end(EndReason::Win);
            return;
        }
        self.time_remaining = (self.time_remaining - dt).max(0.0);
        if self.time_remaining <= 0.0 {
            self.end(EndReason::Timeout);
        }
    }

    fn end(&mut self, reason: EndReason) {
        if !self.state.is_playing() {
            return;
        }
        self.state = SessionState::Ended(reason);
        let final_score = self.score.value();
        tracing::info!("[session] ended ({reason}) with score {final_score}");
        self.events.push(SessionEvent::Ended { reason, final_score });
    }

    /// Starts a fresh round: projectiles cleared, targets respawned, score
    /// and timer reset. Terrain is rebuilt if the target layout changed.
    pub fn reset(&mut self) {
        self.projectiles.clear(&mut self.world, &mut self.render);
        if self.layout != self.config.targets {
            self.arena.rebuild(&mut self.world, &self.config.targets);
            self.layout = self.config.targets.clone();
        }
        self.targets.clear_and_respawn(
            &mut self.world,
            &mut self.render,
            &target_placements(&self.config.targets),
            target_template(&self.config.targets),
        );
        self.score.reset();
        self.time_remaining = self.config.session.time_limit_sec;
        self.state = SessionState::Playing;
        self.refresh_preview();
        tracing::info!("[session] reset");
    }

    /// Merges a JSON document over the current configuration. Invalid fields
    /// keep their previous values.
    ///
    /// Projectile and physics values apply from the next spawn or tick; target
    /// layout and time limit apply at the next [`GameSession::reset`].
    pub fn reload_config(&mut self, text: &str) {
        let config = self.config.from_json_str_with_fallback(text);
        if config == self.config {
            return;
        }
        self.world.gravity = config.physics.gravity.into();
        self.projectiles.set_config(config.projectile.clone());
        self.config = config;
        let (yaw, pitch) = (self.yaw, self.pitch);
        self.set_aim_direction(yaw, pitch);
        tracing::info!("[config] reloaded");
    }

    fn refresh_preview(&mut self) {
        let direction = self.aim_direction();
        self.preview = trajectory::predict(
            self.muzzle_position(direction),
            direction,
            self.config.projectile.initial_speed,
            self.world.gravity,
            &self.config.trajectory,
        );
    }

    pub fn score(&self) -> u32 {
        self.score.value()
    }

    pub fn time_remaining(&self) -> f32 {
        self.time_remaining
    }

    /// Overrides the clock, floored at 0.
    pub fn set_time_remaining(&mut self, seconds: f32) {
        self.time_remaining = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True once the clock reaches the low-time warning threshold.
    pub fn is_time_low(&self) -> bool {
        self.time_remaining <= self.config.session.low_time_warning_sec
    }

    /// Predicted arc of the next shot along the current aim.
    pub fn trajectory_preview(&self) -> &[Vec3] {
        &self.preview
    }

    /// Takes every event raised since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn projectiles(&self) -> &ProjectileManager {
        &self.projectiles
    }

    pub fn targets(&self) -> &TargetRegistry {
        &self.targets
    }

    pub fn render(&self) -> &R {
        &self.render
    }

    pub fn render_mut(&mut self) -> &mut R {
        &mut self.render
    }
}

fn target_template(config: &TargetsConfig) -> TargetTemplate {
    TargetTemplate {
        half_extents: config.half_extents.into(),
        points: config.points_per_hit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Vec3Config;
    use crate::physics::PHYSICS_DT;
    use crate::render::VisualQueue;

    fn config(per_tier: u32) -> GameConfig {
        let mut config = GameConfig::default();
        config.physics.gravity = Vec3Config::new(0.0, 0.0, 0.0);
        config.targets.tiers = 1;
        config.targets.per_tier = per_tier;
        config
    }

    fn session(per_tier: u32) -> GameSession<VisualQueue> {
        GameSession::new(config(per_tier), VisualQueue::new())
    }

    fn alive_positions(session: &GameSession<VisualQueue>) -> Vec<Vec3> {
        session
            .targets()
            .iter()
            .filter(|(_, t)| t.alive)
            .map(|(_, t)| t.position)
            .collect()
    }

    /// Fires straight at `target` and ticks until the shot has had time to
    /// arrive.
    fn shoot_at(session: &mut GameSession<VisualQueue>, target: Vec3) {
        let from = Vec3::from(session.config().shooter.position);
        session.fire_projectile(Some(target - from)).unwrap();
        for _ in 0..60 {
            session.tick(PHYSICS_DT);
        }
    }

    #[test]
    fn test_new_session() {
        let session = session(3);
        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(session.score(), 0);
        assert_eq!(session.targets().alive_count(), 3);
        assert_eq!(session.time_remaining(), 60.0);
        assert!(!session.is_time_low());
    }

    #[test]
    fn test_win_trigger() {
        let mut session = session(1);
        let target = alive_positions(&session)[0];

        shoot_at(&mut session, target);

        assert_eq!(session.state(), SessionState::Ended(EndReason::Win));
        assert_eq!(session.score(), 50);
        let events = session.drain_events();
        assert!(events.contains(&SessionEvent::Ended {
            reason: EndReason::Win,
            final_score: 50
        }));
        assert!(events.contains(&SessionEvent::FloatingText {
            text: "+50".to_string(),
            position: target
        }));
    }

    #[test]
    fn test_score_accumulates_over_targets() {
        let mut session = session(3);
        for target in alive_positions(&session) {
            shoot_at(&mut session, target);
        }

        assert_eq!(session.score(), 150);
        assert_eq!(session.state(), SessionState::Ended(EndReason::Win));
        let floating = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::FloatingText { .. }))
            .count();
        assert_eq!(floating, 3);
    }

    #[test]
    fn test_timeout_trigger() {
        let mut session = session(3);
        session.set_time_remaining(0.01);
        session.tick(0.05);

        assert_eq!(session.state(), SessionState::Ended(EndReason::Timeout));
        assert_eq!(session.time_remaining(), 0.0);
        assert_eq!(
            session.drain_events(),
            vec![SessionEvent::Ended {
                reason: EndReason::Timeout,
                final_score: 0
            }]
        );

        // Ending is reported once.
        session.tick(0.05);
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_dt_is_clamped() {
        let mut session = session(3);
        session.tick(1.0);
        assert!((session.time_remaining() - (60.0 - 0.05)).abs() < 1e-4);

        let before = session.time_remaining();
        session.tick(f32::NAN);
        session.tick(-1.0);
        session.tick(f32::INFINITY);
        assert_eq!(session.time_remaining(), before);
        assert_eq!(sanitize_dt(0.01, 0.05), 0.01);
    }

    #[test]
    fn test_fire_while_ended_is_rejected() {
        let mut session = session(3);
        session.set_time_remaining(0.0);
        session.tick(PHYSICS_DT);
        let bodies = session.world().body_count();

        assert_eq!(session.fire_projectile(None), Err(FireError::SessionEnded));
        assert!(session.projectiles().is_empty());
        assert_eq!(session.world().body_count(), bodies);
    }

    #[test]
    fn test_fire_rejects_zero_aim() {
        let mut session = session(3);
        assert_eq!(session.fire_projectile(Some(Vec3::ZERO)), Err(FireError::InvalidShot));
        assert!(session.projectiles().is_empty());
    }

    #[test]
    fn test_reset_restores_everything() {
        let mut session = session(3);
        let target = alive_positions(&session)[0];
        shoot_at(&mut session, target);
        session.fire_projectile(None).unwrap();
        session.set_time_remaining(0.0);
        session.tick(PHYSICS_DT);
        assert!(!session.state().is_playing());

        session.reset();

        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(session.score(), 0);
        assert_eq!(session.time_remaining(), 60.0);
        assert_eq!(session.targets().alive_count(), 3);
        assert_eq!(session.targets().len(), 3);
        assert!(session.projectiles().is_empty());
        assert!(session.projectiles().is_consistent());
        // Ground, one platform and three targets.
        assert_eq!(session.world().body_count(), 5);
    }

    #[test]
    fn test_ended_session_does_not_score() {
        let mut session = session(1);
        let target = alive_positions(&session)[0];
        let from = Vec3::from(session.config().shooter.position);
        session.fire_projectile(Some(target - from)).unwrap();
        session.set_time_remaining(0.0);
        for _ in 0..60 {
            session.tick(PHYSICS_DT);
        }

        assert_eq!(session.state(), SessionState::Ended(EndReason::Timeout));
        assert_eq!(session.score(), 0);
        assert_eq!(session.targets().alive_count(), 1);
    }

    #[test]
    fn test_aim_and_preview() {
        let mut session = session(3);
        assert!((session.aim_direction() - Vec3::NEG_Z).length() < 1e-6);

        session.set_aim_direction(0.3, 10.0);
        let (_, pitch) = session.aim_angles();
        assert!((pitch - 60.0_f32.to_radians()).abs() < 1e-6);
        assert!((session.aim_direction().length() - 1.0).abs() < 1e-5);

        let preview = session.trajectory_preview();
        assert_eq!(preview[0], session.muzzle_position(session.aim_direction()));
        assert!(preview.len() > 2);
    }

    #[test]
    fn test_low_time_warning() {
        let mut session = session(3);
        session.set_time_remaining(10.0);
        assert!(session.is_time_low());
        session.set_time_remaining(10.5);
        assert!(!session.is_time_low());
    }

    #[test]
    fn test_reload_config_keeps_last_good_values() {
        let mut session = session(3);
        session.reload_config(
            r#"{"projectile":{"initialSpeed":25},"session":{"timeLimitSec":"soon"}}"#,
        );

        assert_eq!(session.config().projectile.initial_speed, 25.0);
        assert_eq!(session.config().session.time_limit_sec, 60.0);

        session.reload_config("not json");
        assert_eq!(session.config().projectile.initial_speed, 25.0);
    }

    #[test]
    fn test_reload_layout_applies_on_reset() {
        let mut session = session(3);
        session.reload_config(r#"{"targets":{"perTier":4},"session":{"timeLimitSec":30}}"#);
        assert_eq!(session.targets().len(), 3);
        assert_eq!(session.time_remaining(), 60.0);

        session.reset();
        assert_eq!(session.targets().alive_count(), 4);
        assert_eq!(session.time_remaining(), 30.0);
    }

    #[test]
    fn test_handles_stay_consistent_while_playing() {
        let mut session = session(3);
        for frame in 0..300 {
            if frame % 15 == 0 {
                let yaw = (frame as f32 * 0.01).sin() * 0.4;
                session.set_aim_direction(yaw, 0.05);
                let _ = session.fire_projectile(None);
            }
            session.tick(PHYSICS_DT);
            assert!(session.projectiles().is_consistent(), "inconsistent at frame {frame}");
        }
    }
}
