//! Systems driving the session from Bevy.

use bevy::prelude::*;

use crate::bevy::{
    CommandQueue, FloatingTextEvent, SessionEndedEvent, SessionRes, SessionStatus,
    ShooterCommand, ShotRejectedEvent, TargetDestroyedEvent, Visual, VisualEntityMap,
};
use crate::render::VisualCommand;
use crate::session::SessionEvent;

/// Applies queued input commands to the session.
pub fn process_commands(
    command_queue: Res<CommandQueue>,
    session: Option<ResMut<SessionRes>>,
    mut rejected: MessageWriter<ShotRejectedEvent>,
) {
    let Some(mut session) = session else {
        if !command_queue.is_empty() {
            tracing::warn!("[command] no session; dropping {} commands", command_queue.len());
            command_queue.clear();
        }
        return;
    };

    for command in command_queue.drain() {
        match command {
            ShooterCommand::Fire { direction } => {
                if let Err(error) = session.0.fire_projectile(direction) {
                    tracing::debug!("[command] Fire rejected: {error}");
                    rejected.write(ShotRejectedEvent { error });
                }
            }
            ShooterCommand::SetAim { yaw, pitch } => {
                session.0.set_aim_direction(yaw, pitch);
            }
            ShooterCommand::Reset => {
                tracing::info!("[command] Reset");
                session.0.reset();
            }
            ShooterCommand::ReloadConfig { json } => {
                tracing::info!("[command] ReloadConfig ({} bytes)", json.len());
                session.0.reload_config(&json);
            }
        }
    }
}

/// Advances the session by the fixed timestep.
pub fn tick_session(time: Res<Time>, session: Option<ResMut<SessionRes>>) {
    if let Some(mut session) = session {
        session.0.tick(time.delta_secs());
    }
}

/// Mirrors queued visual requests onto entities.
pub fn apply_visual_commands(
    mut commands: Commands,
    session: Option<ResMut<SessionRes>>,
    mut entities: ResMut<VisualEntityMap>,
) {
    let Some(mut session) = session else {
        return;
    };

    for command in session.0.render_mut().drain() {
        match command {
            VisualCommand::Create {
                id,
                kind,
                position,
                geometry,
            } => {
                let entity = commands
                    .spawn((Visual { id, kind, geometry }, Transform::from_translation(position)))
                    .id();
                entities.entities.insert(id, entity);
            }
            VisualCommand::Destroy { id } => {
                if let Some(entity) = entities.entities.remove(&id) {
                    commands.entity(entity).try_despawn();
                }
            }
            VisualCommand::SetTransform { id, transform } => {
                if let Some(entity) = entities.get(id) {
                    commands.entity(entity).try_insert(
                        Transform::from_translation(transform.translation)
                            .with_rotation(transform.rotation),
                    );
                }
            }
        }
    }
}

/// Republishes session events as messages.
pub fn publish_session_events(
    session: Option<ResMut<SessionRes>>,
    mut ended: MessageWriter<SessionEndedEvent>,
    mut floating: MessageWriter<FloatingTextEvent>,
    mut destroyed: MessageWriter<TargetDestroyedEvent>,
) {
    let Some(mut session) = session else {
        return;
    };

    for event in session.0.drain_events() {
        match event {
            SessionEvent::Ended { reason, final_score } => {
                ended.write(SessionEndedEvent { reason, final_score });
            }
            SessionEvent::FloatingText { text, position } => {
                floating.write(FloatingTextEvent { text, position });
            }
            SessionEvent::TargetDestroyed {
                position,
                points,
                remaining,
                ..
            } => {
                destroyed.write(TargetDestroyedEvent {
                    position,
                    points,
                    remaining,
                });
            }
        }
    }
}

/// Copies the UI-facing session values into [`SessionStatus`].
pub fn sync_session_status(session: Option<Res<SessionRes>>, mut status: ResMut<SessionStatus>) {
    let Some(session) = session else {
        return;
    };
    let session = &session.0;
    status.score = session.score();
    status.time_remaining = session.time_remaining();
    status.state = session.state();
    status.time_low = session.is_time_low();
    status.trajectory_preview.clear();
    status.trajectory_preview.extend_from_slice(session.trajectory_preview());
}
