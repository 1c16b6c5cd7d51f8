//! ECS Resources.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bevy::prelude::*;
use parking_lot::Mutex;

use crate::config::GameConfig;
use crate::render::{VisualId, VisualQueue};
use crate::session::{GameSession, SessionState};

/// The running session. Its render backend queues visual requests for
/// [`crate::bevy::systems::apply_visual_commands`].
#[derive(Resource, Debug)]
pub struct SessionRes(pub GameSession<VisualQueue>);

impl SessionRes {
    pub fn new(config: GameConfig) -> Self {
        Self(GameSession::new(config, VisualQueue::new()))
    }
}

/// Snapshot of the session for UI systems, refreshed every frame.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct SessionStatus {
    pub score: u32,
    pub time_remaining: f32,
    pub state: SessionState,
    /// The clock should be styled as running out.
    pub time_low: bool,
    pub trajectory_preview: Vec<Vec3>,
}

/// Maps visual ids to the entities mirroring them.
#[derive(Resource, Debug, Default)]
pub struct VisualEntityMap {
    pub entities: HashMap<VisualId, Entity>,
}

impl VisualEntityMap {
    pub fn get(&self, id: VisualId) -> Option<Entity> {
        self.entities.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Input and control requests from outside the ECS.
#[derive(Debug, Clone, PartialEq)]
pub enum ShooterCommand {
    /// Fire along `direction`, or along the current aim when `None`.
    Fire { direction: Option<Vec3> },
    /// Aim in radians.
    SetAim { yaw: f32, pitch: f32 },
    Reset,
    /// Merge a JSON configuration over the current one.
    ReloadConfig { json: String },
}

/// Thread-safe command queue.
///
/// Input handlers or an embedding host push commands that are processed by
/// Bevy systems on the next frame.
#[derive(Resource, Clone, Default)]
pub struct CommandQueue {
    inner: Arc<Mutex<VecDeque<ShooterCommand>>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a command to be processed.
    pub fn push(&self, command: ShooterCommand) {
        self.inner.lock().push_back(command);
    }

    /// Drain all pending commands.
    pub fn drain(&self) -> Vec<ShooterCommand> {
        self.inner.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}
