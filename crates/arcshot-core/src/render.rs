//! Rendering boundary.
//!
//! The core never draws anything; it asks a [`RenderBackend`] to create,
//! move and destroy visual representations. [`VisualQueue`] records those
//! requests as commands for a frontend (such as the Bevy plugin) to apply,
//! and [`NullRender`] discards them for headless runs.

use std::collections::HashMap;

use bevy::math::{Quat, Vec3};

/// Identifier of a visual representation owned by the render backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualId(pub u64);

/// What a visual represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    Projectile,
    Target,
}

/// Geometry of a visual, in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisualGeometry {
    Sphere { radius: f32 },
    Cuboid { half_extents: Vec3 },
}

/// World transform mirrored from a physics body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualTransform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl VisualTransform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Operations the core needs from the rendering collaborator.
pub trait RenderBackend {
    fn create_visual(
        &mut self,
        kind: VisualKind,
        position: Vec3,
        geometry: VisualGeometry,
    ) -> VisualId;

    fn destroy_visual(&mut self, id: VisualId);

    fn set_transform(&mut self, id: VisualId, transform: VisualTransform);
}

/// Backend that hands out ids and does nothing else.
#[derive(Debug, Default)]
pub struct NullRender {
    next_id: u64,
}

impl RenderBackend for NullRender {
    fn create_visual(
        &mut self,
        _kind: VisualKind,
        _position: Vec3,
        _geometry: VisualGeometry,
    ) -> VisualId {
        self.next_id += 1;
        VisualId(self.next_id)
    }

    fn destroy_visual(&mut self, _id: VisualId) {}

    fn set_transform(&mut self, _id: VisualId, _transform: VisualTransform) {}
}

/// A recorded render request.
#[derive(Debug, Clone, PartialEq)]
pub enum VisualCommand {
    Create {
        id: VisualId,
        kind: VisualKind,
        position: Vec3,
        geometry: VisualGeometry,
    },
    Destroy {
        id: VisualId,
    },
    SetTransform {
        id: VisualId,
        transform: VisualTransform,
    },
}

/// Backend that queues commands until a frontend drains them.
///
/// Transform updates for the same visual within one drain window collapse
/// into the latest one. A visual created and destroyed within one window
/// leaves no command at all, so a queue that is never drained only holds
/// the visuals still alive plus the destroys of visuals a frontend has seen.
#[derive(Debug, Default)]
pub struct VisualQueue {
    next_id: u64,
    /// Submission order; `None` marks a command cancelled before the drain.
    commands: Vec<Option<VisualCommand>>,
    cancelled: usize,
    /// Slot of the undrained `Create` of each visual.
    creates: HashMap<VisualId, usize>,
    /// Slot of the pending `SetTransform` of each visual.
    transforms: HashMap<VisualId, usize>,
    live: usize,
}

impl VisualQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains all pending commands in submission order.
    pub fn drain(&mut self) -> Vec<VisualCommand> {
        self.creates.clear();
        self.transforms.clear();
        self.cancelled = 0;
        std::mem::take(&mut self.commands).into_iter().flatten().collect()
    }

    /// Number of pending commands.
    pub fn pending(&self) -> usize {
        self.commands.len() - self.cancelled
    }

    /// Number of visuals created and not yet destroyed.
    pub fn live_count(&self) -> usize {
        self.live
    }

    fn push(&mut self, command: VisualCommand) -> usize {
        self.commands.push(Some(command));
        self.commands.len() - 1
    }

    fn cancel(&mut self, slot: usize) {
        if let Some(command) = self.commands.get_mut(slot)
            && command.take().is_some()
        {
            self.cancelled += 1;
        }
    }

    /// Drops cancelled slots once they make up half the buffer.
    fn compact(&mut self) {
        if self.cancelled * 2 < self.commands.len() {
            return;
        }
        self.commands.retain(Option::is_some);
        self.cancelled = 0;
        self.creates.clear();
        self.transforms.clear();
        for (slot, command) in self.commands.iter().enumerate() {
            match command {
                Some(VisualCommand::Create { id, .. }) => {
                    self.creates.insert(*id, slot);
                }
                Some(VisualCommand::SetTransform { id, .. }) => {
                    self.transforms.insert(*id, slot);
                }
                _ => {}
            }
        }
    }
}

impl RenderBackend for VisualQueue {
    fn create_visual(
        &mut self,
        kind: VisualKind,
        position: Vec3,
        geometry: VisualGeometry,
    ) -> VisualId {
        self.next_id += 1;
        let id = VisualId(self.next_id);
        self.live += 1;
        let slot = self.push(VisualCommand::Create {
            id,
            kind,
            position,
            geometry,
        });
        self.creates.insert(id, slot);
        id
    }

    fn destroy_visual(&mut self, id: VisualId) {
        self.live = self.live.saturating_sub(1);
        if let Some(slot) = self.transforms.remove(&id) {
            self.cancel(slot);
        }
        match self.creates.remove(&id) {
            // Never seen by a frontend: nothing to undo.
            Some(slot) => self.cancel(slot),
            None => {
                self.push(VisualCommand::Destroy { id });
            }
        }
        self.compact();
    }

    fn set_transform(&mut self, id: VisualId, transform: VisualTransform) {
        if let Some(&slot) = self.transforms.get(&id)
            && let Some(Some(VisualCommand::SetTransform { transform: last, .. })) =
                self.commands.get_mut(slot)
        {
            *last = transform;
            return;
        }
        let slot = self.push(VisualCommand::SetTransform { id, transform });
        self.transforms.insert(id, slot);
    }
}
