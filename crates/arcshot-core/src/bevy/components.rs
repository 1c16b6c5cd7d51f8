//! ECS Components.

use bevy::prelude::*;

use crate::render::{VisualGeometry, VisualId, VisualKind};

/// Entity mirroring a projectile or target owned by the session.
#[derive(Component, Debug, Clone, Copy)]
pub struct Visual {
    pub id: VisualId,
    pub kind: VisualKind,
    pub geometry: VisualGeometry,
}
