//! Physics simulation using `Rapier3D`.
//!
//! The world is stepped with the frame's (clamped) delta. Engine callbacks run
//! inside [`PhysicsWorld::step_with_events`]: the caller's hooks may only filter
//! pairs and toggle their solver response, and begin-of-contact notifications
//! (sensor overlaps included) are buffered and handed back after the step so
//! no body is removed while the solver iterates.

use std::fmt;

use bevy::math::{Quat, Vec3};
use parking_lot::Mutex;
use rapier3d::prelude::*;

/// Reference step used by tests and the headless runner (60Hz).
pub const PHYSICS_DT: f32 = 1.0 / 60.0;

/// Default gravity vector (m/s²).
pub fn default_gravity() -> Vec3 {
    Vec3::new(0.0, -9.8, 0.0)
}

pub(crate) fn to_vector(v: Vec3) -> Vector {
    Vector::new(v.x, v.y, v.z)
}

/// Begin-of-contact notification between two rigid bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub body_a: RigidBodyHandle,
    pub body_b: RigidBodyHandle,
}

/// Collects `Started` collision events during a step.
///
/// Rapier requires event handlers to be `Sync`, hence the mutex; it is never
/// contended since the pipeline runs on the caller's thread.
#[derive(Default)]
struct ContactCollector {
    events: Mutex<Vec<ContactEvent>>,
}

impl ContactCollector {
    fn into_events(self) -> Vec<ContactEvent> {
        self.events.into_inner()
    }
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        let CollisionEvent::Started(h1, h2, _flags) = event else {
            return;
        };
        let parent = |handle: ColliderHandle| colliders.get(handle).and_then(Collider::parent);
        if let (Some(body_a), Some(body_b)) = (parent(h1), parent(h2)) {
            self.events.lock().push(ContactEvent { body_a, body_b });
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Physics world containing all `Rapier3D` components.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub gravity: Vec3,
    pub frame: u64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("frame", &self.frame)
            .field("rigid_body_count", &self.rigid_body_set.len())
            .field("collider_count", &self.collider_set.len())
            .field("gravity", &self.gravity)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Creates a new physics world with default gravity.
    pub fn new() -> Self {
        Self::with_gravity(default_gravity())
    }

    /// Creates a new physics world with custom gravity.
    pub fn with_gravity(gravity: Vec3) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: PHYSICS_DT,
            ..Default::default()
        };

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity,
            frame: 0,
        }
    }

    /// Advances the simulation by `dt` seconds and returns the contacts that
    /// began during the step.
    ///
    /// A non-positive `dt` leaves the world untouched.
    pub fn step_with_events(&mut self, dt: f32, hooks: &dyn PhysicsHooks) -> Vec<ContactEvent> {
        if dt <= 0.0 {
            return Vec::new();
        }
        self.integration_parameters.dt = dt;

        let collector = ContactCollector::default();
        self.physics_pipeline.step(
            to_vector(self.gravity),
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            hooks,
            &collector,
        );
        self.frame += 1;

        collector.into_events()
    }

    /// Adds a rigid body to the world and returns its handle.
    pub fn add_rigid_body(&mut self, rigid_body: RigidBody) -> RigidBodyHandle {
        self.rigid_body_set.insert(rigid_body)
    }

    /// Adds a collider attached to a rigid body.
    pub fn add_collider(&mut self, collider: Collider, parent: RigidBodyHandle) -> ColliderHandle {
        self.collider_set
            .insert_with_parent(collider, parent, &mut self.rigid_body_set)
    }

    /// Removes a rigid body and its attached colliders.
    pub fn remove_rigid_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Gets an immutable reference to a rigid body.
    pub fn get_rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    /// Returns the translation and orientation of a body.
    pub fn body_pose(&self, handle: RigidBodyHandle) -> Option<(Vec3, Quat)> {
        let body = self.get_rigid_body(handle)?;
        let t = body.translation();
        let r = body.rotation();
        Some((Vec3::new(t.x, t.y, t.z), Quat::from_xyzw(r.x, r.y, r.z, r.w)))
    }

    /// Returns the linear velocity of a body.
    pub fn body_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        let v = self.get_rigid_body(handle)?.linvel();
        Some(Vec3::new(v.x, v.y, v.z))
    }

    /// Returns the number of rigid bodies in the world.
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Returns the current simulation frame number.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// Resets the physics world to an empty state, keeping gravity.
    pub fn reset(&mut self) {
        *self = Self::with_gravity(self.gravity);
    }
}
