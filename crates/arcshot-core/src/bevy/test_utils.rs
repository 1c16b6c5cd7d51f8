//! Test utilities for headless Bevy integration tests.
//!
//! Provides `TestApp`, a wrapper around `bevy::app::App` that uses
//! `MinimalPlugins` + `ArcshotPlugin` for testing the session without a
//! rendering or windowing backend.

use bevy::prelude::*;

use crate::bevy::plugin::ArcshotPlugin;
use crate::bevy::{
    CommandQueue, SessionEndedEvent, SessionRes, SessionStatus, ShooterCommand,
    ShotRejectedEvent, Visual,
};
use crate::config::GameConfig;
use crate::physics::PHYSICS_DT;
use crate::render::{VisualKind, VisualQueue};
use crate::session::GameSession;

/// Messages observed by the test app, collected in `PostUpdate`.
#[derive(Resource, Default)]
pub(crate) struct ReceivedMessages {
    pub ended: Vec<SessionEndedEvent>,
    pub rejected: Vec<ShotRejectedEvent>,
}

fn collect_messages(
    mut ended: MessageReader<SessionEndedEvent>,
    mut rejected: MessageReader<ShotRejectedEvent>,
    mut received: ResMut<ReceivedMessages>,
) {
    received.ended.extend(ended.read().cloned());
    received.rejected.extend(rejected.read().cloned());
}

/// A headless Bevy app wrapper for testing.
pub(crate) struct TestApp {
    pub app: App,
}

impl TestApp {
    /// Create a new test app with the default configuration.
    pub fn new() -> Self {
        Self::with_config(GameConfig::default())
    }

    pub fn with_config(config: GameConfig) -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(ArcshotPlugin {
            config,
            command_queue: None,
        });
        app.init_resource::<ReceivedMessages>();
        app.add_systems(PostUpdate, collect_messages);
        // Pause virtual time so that only explicit step_physics calls
        // advance the session.
        app.world_mut().resource_mut::<Time<Virtual>>().pause();
        // Run one update to apply the initial visual commands
        app.update();
        Self { app }
    }

    /// Run a single frame update.
    pub fn update(&mut self) {
        self.app.update();
    }

    /// Advance the session by exactly `n` fixed timesteps.
    pub fn step_physics(&mut self, n: usize) {
        let dt = std::time::Duration::from_secs_f32(PHYSICS_DT);
        for _ in 0..n {
            self.app
                .world_mut()
                .resource_mut::<Time<Fixed>>()
                .accumulate_overstep(dt);
            self.app.update();
        }
    }

    /// Push a command to the command queue.
    pub fn push_command(&mut self, cmd: ShooterCommand) {
        self.app.world().resource::<CommandQueue>().push(cmd);
    }

    pub fn session(&self) -> &GameSession<VisualQueue> {
        &self.app.world().resource::<SessionRes>().0
    }

    pub fn session_mut(&mut self) -> &mut GameSession<VisualQueue> {
        &mut self.app.world_mut().resource_mut::<SessionRes>().into_inner().0
    }

    pub fn status(&self) -> SessionStatus {
        self.app.world().resource::<SessionStatus>().clone()
    }

    /// Translations of every projectile entity.
    pub fn projectile_translations(&mut self) -> Vec<Vec3> {
        let world = self.app.world_mut();
        let mut query = world.query::<(&Visual, &Transform)>();
        query
            .iter(world)
            .filter(|(visual, _)| visual.kind == VisualKind::Projectile)
            .map(|(_, transform)| transform.translation)
            .collect()
    }

    /// Get a reference to the World.
    pub fn world(&self) -> &World {
        self.app.world()
    }

    /// Get a mutable reference to the World.
    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }
}
