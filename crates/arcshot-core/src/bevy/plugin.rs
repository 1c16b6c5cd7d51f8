//! Bevy plugin hosting a session.
//!
//! Headless by construction: visuals are plain entities carrying a
//! [`Visual`](crate::bevy::Visual) and a `Transform`; a frontend attaches
//! meshes to them however it likes.

use bevy::prelude::*;

use crate::bevy::events::*;
use crate::bevy::resources::*;
use crate::bevy::systems;
use crate::config::GameConfig;
use crate::physics::PHYSICS_DT;

/// Runs a [`crate::session::GameSession`] inside a Bevy app.
pub struct ArcshotPlugin {
    pub config: GameConfig,
    /// Queue shared with the embedding host; a fresh one is created if `None`.
    pub command_queue: Option<CommandQueue>,
}

impl Default for ArcshotPlugin {
    fn default() -> Self {
        Self {
            config: GameConfig::default(),
            command_queue: None,
        }
    }
}

impl Plugin for ArcshotPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_seconds(f64::from(PHYSICS_DT)));

        app.insert_resource(SessionRes::new(self.config.clone()))
            .insert_resource(SessionStatus::default())
            .insert_resource(VisualEntityMap::default())
            .insert_resource(self.command_queue.clone().unwrap_or_default());

        app.add_message::<SessionEndedEvent>()
            .add_message::<FloatingTextEvent>()
            .add_message::<TargetDestroyedEvent>()
            .add_message::<ShotRejectedEvent>();

        app.add_systems(FixedUpdate, systems::tick_session);
        app.add_systems(
            Update,
            (
                systems::process_commands,
                systems::apply_visual_commands,
                systems::publish_session_events,
                systems::sync_session_status,
            )
                .chain(),
        );
    }
}
