//! Scripted headless session.
//!
//! Usage: `arcshot-headless [config.json]`
//!
//! Aims at the alive targets in turn, fires on an interval and logs the result
//! once the session ends.

use arcshot_core::session::SessionEvent;
use arcshot_core::{GameConfig, GameSession, NullRender, PHYSICS_DT};
use bevy::math::Vec3;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const FIRE_INTERVAL_SEC: f32 = 0.4;

/// Yaw and pitch that put a shot from `from` onto `to`, preferring the flat
/// arc. Falls back to 45° when the target is out of range.
fn ballistic_aim(from: Vec3, to: Vec3, speed: f32, gravity: f32) -> (f32, f32) {
    let offset = to - from;
    let yaw = (-offset.x).atan2(-offset.z);
    let x = offset.x.hypot(offset.z);
    let y = offset.y;

    if gravity <= f32::EPSILON || x <= f32::EPSILON {
        return (yaw, y.atan2(x));
    }
    let v2 = speed * speed;
    let discriminant = v2 * v2 - gravity * (gravity * x * x + 2.0 * y * v2);
    if discriminant < 0.0 {
        return (yaw, std::f32::consts::FRAC_PI_4);
    }
    (yaw, ((v2 - discriminant.sqrt()) / (gravity * x)).atan())
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => GameConfig::load_or_default(path),
        None => GameConfig::default(),
    };
    let speed = config.projectile.initial_speed;
    let gravity = -config.physics.gravity.y;
    let shooter = Vec3::from(config.shooter.position);
    let max_frames = ((config.session.time_limit_sec + 5.0) / PHYSICS_DT).ceil();

    let mut session = GameSession::new(config, NullRender::default());
    let mut since_shot = FIRE_INTERVAL_SEC;
    let mut shots = 0_usize;
    let mut frame = 0.0_f32;

    while frame < max_frames {
        frame += 1.0;
        since_shot += PHYSICS_DT;

        if session.state().is_playing() && since_shot >= FIRE_INTERVAL_SEC {
            let alive: Vec<Vec3> = session
                .targets()
                .iter()
                .filter(|(_, t)| t.alive)
                .map(|(_, t)| t.position)
                .collect();
            if !alive.is_empty() {
                let target = alive[shots % alive.len()];
                let (yaw, pitch) = ballistic_aim(shooter, target, speed, gravity);
                session.set_aim_direction(yaw, pitch);
                match session.fire_projectile(None) {
                    Ok(_) => shots += 1,
                    Err(err) => tracing::debug!("[headless] shot rejected: {err}"),
                }
                since_shot = 0.0;
            }
        }

        session.tick(PHYSICS_DT);

        for event in session.drain_events() {
            if let SessionEvent::Ended { reason, final_score } = event {
                tracing::info!(
                    "[headless] session ended: {reason}, score {final_score}, {shots} shots, \
                     {:.1}s left",
                    session.time_remaining()
                );
                return;
            }
        }
    }

    tracing::warn!("[headless] stopped after {frame} frames without an end event");
}
