//! Ballistic trajectory prediction for the aim preview.
//!
//! Points follow `P(t) = P0 + V0·t + ½·g·t²`. The time step adapts to the
//! instantaneous speed `|V0 + g·t|` so that consecutive points sit roughly
//! `segment_length` apart in world space, whether the projectile is skimming
//! along near the apex or dropping steeply.

use bevy::math::Vec3;

use crate::config::TrajectoryConfig;

/// Speeds below this are treated as this value when deriving a time step.
const MIN_SPEED: f32 = 1e-4;

/// Tolerance on `|direction| == 1`.
pub const UNIT_TOLERANCE: f32 = 1e-3;

/// Position along the arc at time `t`.
pub fn position_at(origin: Vec3, velocity: Vec3, gravity: Vec3, t: f32) -> Vec3 {
    origin + velocity * t + 0.5 * gravity * t * t
}

/// Predicts the arc of a shot.
///
/// The first point is always `origin`. Sampling stops once a point at or
/// below `ground_threshold` has been emitted, once `max_points` points exist,
/// or when the next sample would lie beyond `max_time_sec`.
///
/// `direction` must be a unit vector and `speed` positive; otherwise only the
/// origin is returned.
pub fn predict(
    origin: Vec3,
    direction: Vec3,
    speed: f32,
    gravity: Vec3,
    config: &TrajectoryConfig,
) -> Vec<Vec3> {
    let max_points = config.max_points.max(1) as usize;
    let mut points = Vec::with_capacity(max_points.min(256));
    points.push(origin);

    if !(speed > 0.0 && speed.is_finite()) || (direction.length() - 1.0).abs() > UNIT_TOLERANCE {
        return points;
    }

    let velocity = direction * speed;
    let min_dt = config.min_dt.max(f32::EPSILON);
    let max_dt = config.max_dt.max(min_dt);
    let mut t = 0.0_f32;

    while points.len() < max_points {
        let speed_now = (velocity + gravity * t).length().max(MIN_SPEED);
        let dt = (config.segment_length / speed_now).clamp(min_dt, max_dt);
        t += dt;
        if t > config.max_time_sec {
            break;
        }

        let point = position_at(origin, velocity, gravity, t);
        points.push(point);
        if point.y <= config.ground_threshold {
            break;
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TrajectoryConfig {
        TrajectoryConfig {
            segment_length: 0.35,
            max_points: 400,
            max_time_sec: 5.0,
            ground_threshold: 0.0,
            min_dt: 0.001,
            max_dt: 0.1,
        }
    }

    const ORIGIN: Vec3 = Vec3::new(0.0, 1.6, 0.0);
    const GRAVITY: Vec3 = Vec3::new(0.0, -9.8, 0.0);

    fn spacings(points: &[Vec3]) -> Vec<f32> {
        points.windows(2).map(|w| w[0].distance(w[1])).collect()
    }

    #[test]
    fn test_starts_at_origin() {
        let points = predict(ORIGIN, Vec3::NEG_Z, 18.0, GRAVITY, &config());
        assert_eq!(points[0], ORIGIN);
        assert!(points.len() > 2);
    }

    #[test]
    fn test_deterministic() {
        let a = predict(ORIGIN, Vec3::NEG_Z, 18.0, GRAVITY, &config());
        let b = predict(ORIGIN, Vec3::NEG_Z, 18.0, GRAVITY, &config());
        assert_eq!(a, b);
    }

    #[test]
    fn test_adaptive_spacing_slow_and_fast() {
        for speed in [5.0, 40.0] {
            let points = predict(ORIGIN, Vec3::NEG_Z, speed, GRAVITY, &config());
            assert!(points.len() > 3, "speed {speed}: too few points");
            for (i, d) in spacings(&points).into_iter().enumerate() {
                assert!((d - 0.35).abs() < 0.05, "speed {speed}: segment {i} has length {d}");
            }
        }
    }

    #[test]
    fn test_fast_shots_sample_finer_in_time() {
        let slow = predict(ORIGIN, Vec3::NEG_Z, 5.0, GRAVITY, &config());
        let fast = predict(ORIGIN, Vec3::NEG_Z, 40.0, GRAVITY, &config());
        // Both reach the ground; the fast arc covers far more distance with
        // the same spacing, so it needs more points.
        assert!(slow.last().unwrap().y <= 0.0);
        assert!(fast.last().unwrap().y <= 0.0);
        assert!(fast.len() > slow.len());
    }

    #[test]
    fn test_stops_at_ground() {
        let points = predict(ORIGIN, Vec3::NEG_Z, 10.0, GRAVITY, &config());
        let (last, rest) = points.split_last().unwrap();
        assert!(last.y <= 0.0);
        assert!(rest.iter().all(|p| p.y > 0.0));
    }

    #[test]
    fn test_respects_max_points() {
        let cfg = TrajectoryConfig {
            max_points: 10,
            ..config()
        };
        let points = predict(ORIGIN, Vec3::NEG_Z, 18.0, GRAVITY, &cfg);
        assert_eq!(points.len(), 10);
    }

    #[test]
    fn test_respects_max_time() {
        let cfg = TrajectoryConfig {
            max_time_sec: 0.2,
            ..config()
        };
        let up = Vec3::new(0.0, 1.0, -1.0).normalize();
        let points = predict(ORIGIN, up, 18.0, GRAVITY, &cfg);
        let last = points.last().unwrap();
        // Still airborne, and the horizontal reach fits the time budget.
        assert!(last.y > 0.0);
        let reach = ORIGIN.z - last.z;
        assert!(reach <= 18.0 * up.z.abs() * 0.2 + 1e-3);
    }

    #[test]
    fn test_invalid_inputs_yield_origin_only() {
        assert_eq!(predict(ORIGIN, Vec3::NEG_Z, 0.0, GRAVITY, &config()), vec![ORIGIN]);
        let not_unit = Vec3::new(0.0, 0.0, -2.0);
        assert_eq!(predict(ORIGIN, not_unit, 10.0, GRAVITY, &config()), vec![ORIGIN]);
        assert_eq!(predict(ORIGIN, Vec3::ZERO, 10.0, GRAVITY, &config()), vec![ORIGIN]);
    }

    #[test]
    fn test_position_at_matches_kinematics() {
        let p = position_at(Vec3::ZERO, Vec3::new(1.0, 2.0, 0.0), GRAVITY, 2.0);
        assert!((p - Vec3::new(2.0, 4.0 - 19.6, 0.0)).length() < 1e-5);
    }
}
