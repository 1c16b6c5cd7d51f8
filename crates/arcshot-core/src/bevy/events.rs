//! ECS Events (Messages) published from the session.

use bevy::prelude::*;

use crate::error::FireError;
use crate::session::EndReason;

/// Message fired once when the session enters the Ended state.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct SessionEndedEvent {
    pub reason: EndReason,
    pub final_score: u32,
}

/// Message asking the UI to float `text` at a world position.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct FloatingTextEvent {
    pub text: String,
    pub position: Vec3,
}

/// Message fired for each destroyed target.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct TargetDestroyedEvent {
    pub position: Vec3,
    pub points: u32,
    /// Alive targets left.
    pub remaining: usize,
}

/// Message fired when a fire command was rejected.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct ShotRejectedEvent {
    pub error: FireError,
}
