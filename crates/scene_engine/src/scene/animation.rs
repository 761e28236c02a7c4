//! # Animation Drivers
//!
//! A driver owns exactly one group. Each tick it receives that group's current
//! local transform and the elapsed milliseconds and returns the replacement
//! transform. The [`Animator`] turns the results into
//! [`SceneCommand::SetLocalTransform`] commands, so drivers never touch the
//! graph directly.

use super::commands::SceneCommand;
use super::{NodeKey, SceneGraph};
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};

/// Per-tick transform update for one group
pub trait AnimationDriver {
    /// Group this driver animates
    fn target(&self) -> NodeKey;

    /// Whether the driver currently runs
    fn is_active(&self) -> bool;

    /// Flip the active state
    fn toggle_active(&mut self);

    /// Produce the group's next local transform
    fn advance(&mut self, current: &Mat4, delta_ms: f64) -> Mat4;
}

/// Spins a group around an axis at a fixed angular speed
#[derive(Debug, Clone)]
pub struct RotationDriver {
    target: NodeKey,
    axis: Vec3,
    degrees_per_second: f64,
    active: bool,
}

impl RotationDriver {
    /// Quarter turn per second around `axis`
    pub fn new(target: NodeKey, axis: Vec3) -> Self {
        Self {
            target,
            axis,
            degrees_per_second: 90.0,
            active: true,
        }
    }

    /// Override the angular speed
    #[must_use]
    pub fn with_speed(mut self, degrees_per_second: f64) -> Self {
        self.degrees_per_second = degrees_per_second;
        self
    }
}

impl AnimationDriver for RotationDriver {
    fn target(&self) -> NodeKey {
        self.target
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn toggle_active(&mut self) {
        self.active = !self.active;
    }

    fn advance(&mut self, current: &Mat4, delta_ms: f64) -> Mat4 {
        Mat4::rotation(&self.axis, self.degrees_per_second * delta_ms / 1000.0) * current
    }
}

/// Moves a group back and forth along an axis
///
/// The phase advances by `delta_ms / 200` and each tick translates by
/// `axis * sin(phase) / 10 * distance`, so the motion accumulates into a
/// smooth oscillation.
#[derive(Debug, Clone)]
pub struct BouncingDriver {
    target: NodeKey,
    axis: Vec3,
    distance: f64,
    phase: f64,
    active: bool,
}

impl BouncingDriver {
    /// Bounce along `axis`, scaled by `distance`
    pub fn new(target: NodeKey, axis: Vec3, distance: f64) -> Self {
        Self {
            target,
            axis,
            distance,
            phase: 0.0,
            active: true,
        }
    }
}

impl AnimationDriver for BouncingDriver {
    fn target(&self) -> NodeKey {
        self.target
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn toggle_active(&mut self) {
        self.active = !self.active;
    }

    fn advance(&mut self, current: &Mat4, delta_ms: f64) -> Mat4 {
        self.phase += delta_ms / 200.0;
        let offset = self.axis * (self.phase.sin() / 10.0 * self.distance);
        Mat4::translation(&offset) * current
    }
}

/// Runs a set of drivers against a scene graph
#[derive(Default)]
pub struct Animator {
    drivers: Vec<Box<dyn AnimationDriver>>,
}

impl Animator {
    /// Empty animator
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver
    pub fn add(&mut self, driver: impl AnimationDriver + 'static) {
        self.drivers.push(Box::new(driver));
    }

    /// Number of registered drivers
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Whether no drivers are registered
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Toggle every driver targeting `group`
    pub fn toggle(&mut self, group: NodeKey) {
        for driver in self.drivers.iter_mut().filter(|d| d.target() == group) {
            driver.toggle_active();
        }
    }

    /// Advance every active driver and queue the resulting commands
    ///
    /// Drivers sharing a group chain within the tick. The graph only
    /// changes once [`SceneGraph::apply_commands`] runs. Returns the number of
    /// commands queued.
    pub fn tick(&mut self, graph: &SceneGraph, delta_ms: f64) -> usize {
        let mut latest: Vec<(NodeKey, Mat4)> = Vec::new();

        for driver in self.drivers.iter_mut().filter(|d| d.is_active()) {
            let target = driver.target();
            let current = latest
                .iter()
                .rev()
                .find(|(key, _)| *key == target)
                .map(|(_, m)| *m)
                .or_else(|| graph.local_transform(target).copied());

            let Some(current) = current else {
                log::warn!("Animation target {:?} is not a group", target);
                continue;
            };
            latest.push((target, driver.advance(&current, delta_ms)));
        }

        for (group, transform) in &latest {
            graph.submit(SceneCommand::SetLocalTransform {
                group: *group,
                transform: *transform,
            });
        }
        latest.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::utils;
    use approx::assert_relative_eq;

    fn graph_with_group() -> (SceneGraph, NodeKey) {
        let mut graph = SceneGraph::new("root");
        let group = graph.add_group(graph.root(), "animated", Mat4::identity()).unwrap();
        (graph, group)
    }

    #[test]
    fn test_rotation_quarter_turn_per_second() {
        let (mut graph, group) = graph_with_group();
        let mut animator = Animator::new();
        animator.add(RotationDriver::new(group, Vec3::y()));

        assert_eq!(animator.tick(&graph, 500.0), 1);
        assert_eq!(animator.tick(&graph, 500.0), 1);
        // Both commands were computed from the identity transform
        graph.apply_commands();
        let after_half = *graph.local_transform(group).unwrap();
        let p = utils::transform_point(&after_half, &Vec3::x());
        assert_relative_eq!(p, Vec3::new(0.5_f64.sqrt(), 0.0, -(0.5_f64.sqrt())), epsilon = 1e-12);

        animator.tick(&graph, 500.0);
        graph.apply_commands();
        let after_full = *graph.local_transform(group).unwrap();
        let p = utils::transform_point(&after_full, &Vec3::x());
        assert_relative_eq!(p, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_inactive_driver_queues_nothing() {
        let (graph, group) = graph_with_group();
        let mut animator = Animator::new();
        animator.add(RotationDriver::new(group, Vec3::y()));
        animator.toggle(group);
        assert_eq!(animator.tick(&graph, 16.0), 0);
    }

    #[test]
    fn test_bouncing_offsets_along_axis() {
        let mut driver = BouncingDriver::new(NodeKey::default(), Vec3::y(), 2.0);
        let next = driver.advance(&Mat4::identity(), 100.0);
        let offset = utils::origin_of(&next);
        assert_relative_eq!(offset, Vec3::new(0.0, 0.5_f64.sin() / 10.0 * 2.0, 0.0), epsilon = 1e-12);
    }
}
