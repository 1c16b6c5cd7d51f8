//! Contact classification and routing.
//!
//! Two phases per step:
//!
//! 1. Pre-solve, inside the engine step. [`PiercingHooks`] decodes the
//!    [`BodyTag`] of both colliders, drops pairs whose masks do not accept
//!    each other and lets [`CollisionRouter::on_pre_solve`] disable the solver
//!    response of projectile/target pairs. Target volumes are sensors, so the
//!    engine reports the overlap as a contact and the projectile flies
//!    through.
//! 2. Contact begin, after the step. Each buffered [`ContactEvent`] is
//!    routed: a projectile touching an alive target destroys it and scores, a
//!    projectile touching terrain is marked for removal. Nothing is removed
//!    here that the solver could still be using.

use rapier3d::prelude::*;

use crate::arena::Arena;
use crate::groups::{BodyTag, CollisionGroups};
use crate::physics::{ContactEvent, PhysicsWorld};
use crate::projectile::{ProjectileKey, ProjectileManager};
use crate::render::RenderBackend;
use crate::score::ScoreAccumulator;
use crate::target::{DestroyedTarget, TargetRegistry};

/// Solver-side view of one contact pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEquation {
    pub a: CollisionGroups,
    pub b: CollisionGroups,
    /// When false the solver produces no response for this pair.
    pub enabled: bool,
}

impl ContactEquation {
    pub fn new(a: CollisionGroups, b: CollisionGroups) -> Self {
        Self { a, b, enabled: true }
    }
}

/// What routing one contact did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteOutcome {
    /// An alive target was destroyed and its points credited.
    TargetDestroyed(DestroyedTarget),
    /// A projectile touched terrain and will be removed on the next
    /// lifecycle update.
    ProjectileMarked(ProjectileKey),
    /// Stale handles, already-dead targets, unrelated pairs, or target hits
    /// while scoring is disabled.
    Ignored,
}

/// Game state a contact may touch, borrowed for the duration of routing.
pub struct RouteContext<'a, R: RenderBackend + ?Sized> {
    pub world: &'a mut PhysicsWorld,
    pub render: &'a mut R,
    pub projectiles: &'a mut ProjectileManager,
    pub targets: &'a mut TargetRegistry,
    pub arena: &'a Arena,
    pub score: &'a mut ScoreAccumulator,
    /// Target hits are ignored when false (session ended).
    pub scoring_enabled: bool,
}

/// Routes engine contacts to game rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionRouter;

impl CollisionRouter {
    /// Disables every projectile/target equation, in either order.
    pub fn on_pre_solve(equations: &mut [ContactEquation]) {
        for equation in equations.iter_mut().filter(|e| is_piercing_pair(e.a, e.b)) {
            equation.enabled = false;
        }
    }

    /// Routes a single begin-of-contact event.
    pub fn on_contact_begin<R: RenderBackend + ?Sized>(
        ctx: &mut RouteContext<'_, R>,
        event: ContactEvent,
    ) -> RouteOutcome {
        // Check both orderings
        let (projectile, other) = if let Some(key) = ctx.projectiles.resolve(event.body_a) {
            (key, event.body_b)
        } else if let Some(key) = ctx.projectiles.resolve(event.body_b) {
            (key, event.body_a)
        } else {
            tracing::trace!("[collision] no live projectile in {event:?}");
            return RouteOutcome::Ignored;
        };
        Self::route_projectile_contact(ctx, projectile, other)
    }

    /// Routes a contact between a known projectile and any other body.
    pub fn route_projectile_contact<R: RenderBackend + ?Sized>(
        ctx: &mut RouteContext<'_, R>,
        projectile: ProjectileKey,
        other: RigidBodyHandle,
    ) -> RouteOutcome {
        if let Some(target) = ctx.targets.resolve(other) {
            if !ctx.scoring_enabled {
                return RouteOutcome::Ignored;
            }
            return match ctx.targets.destroy(ctx.world, ctx.render, target) {
                Some(destroyed) => {
                    ctx.score.add(destroyed.points);
                    tracing::info!(
                        "[collision] projectile {projectile:?} hit target {:?} (+{}, score {})",
                        destroyed.key,
                        destroyed.points,
                        ctx.score.value()
                    );
                    RouteOutcome::TargetDestroyed(destroyed)
                }
                None => RouteOutcome::Ignored,
            };
        }

        if ctx.arena.world_body(other).is_some() {
            ctx.projectiles.mark_for_removal(projectile);
            return RouteOutcome::ProjectileMarked(projectile);
        }

        tracing::trace!("[collision] {projectile:?} touched unknown body {other:?}");
        RouteOutcome::Ignored
    }

    /// Routes every event of a step, in order.
    pub fn route_all<R: RenderBackend + ?Sized>(
        ctx: &mut RouteContext<'_, R>,
        events: &[ContactEvent],
    ) -> Vec<RouteOutcome> {
        events
            .iter()
            .map(|&event| Self::on_contact_begin(ctx, event))
            .filter(|outcome| *outcome != RouteOutcome::Ignored)
            .collect()
    }
}

fn is_piercing_pair(a: CollisionGroups, b: CollisionGroups) -> bool {
    (a.contains(CollisionGroups::PROJECTILE) && b.contains(CollisionGroups::TARGET))
        || (a.contains(CollisionGroups::TARGET) && b.contains(CollisionGroups::PROJECTILE))
}

/// Engine hooks applying group filtering and the piercing rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct PiercingHooks;

fn collider_tag(colliders: &ColliderSet, handle: ColliderHandle) -> Option<BodyTag> {
    colliders.get(handle).and_then(|c| BodyTag::decode(c.user_data))
}

impl PhysicsHooks for PiercingHooks {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        let (Some(a), Some(b)) = (
            collider_tag(context.colliders, context.collider1),
            collider_tag(context.colliders, context.collider2),
        ) else {
            return Some(SolverFlags::COMPUTE_IMPULSES);
        };
        if !CollisionGroups::interacts(a, b) {
            return None;
        }
        let mut equations = [ContactEquation::new(a.group, b.group)];
        CollisionRouter::on_pre_solve(&mut equations);
        // Contacts of a disabled pair are still tracked and reported.
        if equations[0].enabled {
            Some(SolverFlags::COMPUTE_IMPULSES)
        } else {
            Some(SolverFlags::empty())
        }
    }

    fn filter_intersection_pair(&self, context: &PairFilterContext) -> bool {
        match (
            collider_tag(context.colliders, context.collider1),
            collider_tag(context.colliders, context.collider2),
        ) {
            (Some(a), Some(b)) => CollisionGroups::interacts(a, b),
            _ => true,
        }
    }
}
