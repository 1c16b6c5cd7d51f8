//! Arcshot Core Library
//!
//! Physics-driven target shooting using `Rapier3D`: projectiles follow
//! ballistic arcs, pierce through the targets they destroy and despawn on
//! terrain, while a timed session tracks score and win/timeout.
//!
//! The core is engine-agnostic and draws nothing; a [`render::RenderBackend`]
//! receives visual requests. The [`bevy`] module hosts a session inside a
//! Bevy app.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod arena;
pub mod collision;
pub mod config;
pub mod error;
pub mod groups;
pub mod physics;
pub mod projectile;
pub mod render;
pub mod score;
pub mod session;
pub mod target;
pub mod trajectory;

// Bevy integration
pub mod bevy;

pub use arena::{Arena, WorldBodyId, target_placements};
pub use collision::{CollisionRouter, ContactEquation, PiercingHooks, RouteOutcome};
pub use config::GameConfig;
pub use error::{ConfigError, FireError};
pub use groups::{BodyTag, CollisionGroups};
pub use physics::{ContactEvent, PHYSICS_DT, PhysicsWorld, default_gravity};
pub use projectile::{ProjectileKey, ProjectileManager, RemovalReason};
pub use render::{NullRender, RenderBackend, VisualId, VisualQueue};
pub use score::ScoreAccumulator;
pub use session::{EndReason, GameSession, SessionEvent, SessionState};
pub use target::{TargetKey, TargetRegistry};
