// Proximity-gated dance for the articulated robot

use glam::{Mat4, Vec3};
use log::{debug, info};

use super::PhaseClock;
use crate::assembly::DancerRig;
use crate::error::Result;
use crate::math;
use crate::scene::SceneGraph;

/// Tuning for the dance. Angles are in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct DanceParams {
    pub lift_start: f32,
    /// Angular rate of the base bounce, radians per second.
    pub lift_rate: f32,
    pub yaw_start: f32,
    /// Body pieces 1, 2 and 3 (about X, Z and Y).
    pub body_angles: [f32; 3],
    /// Both arms, about X.
    pub arm_angles: [f32; 2],
    pub arm_rate: f32,
    pub head_scale_start: f32,
    pub head_scale_base: f32,
    pub proximity_threshold: f32,
}

impl Default for DanceParams {
    fn default() -> Self {
        Self {
            lift_start: 0.0,
            lift_rate: 3.0,
            yaw_start: 90.0,
            body_angles: [30.0, -30.0, 45.0],
            arm_angles: [60.0, -60.0],
            arm_rate: 3.0,
            head_scale_start: 1.0,
            head_scale_base: 2.0,
            proximity_threshold: 8.0,
        }
    }
}

impl DanceParams {
    /// Pose the robot is assembled in, before it ever dances.
    pub fn rest_pose(&self) -> DancePose {
        DancePose {
            lift: self.lift_start,
            yaw: self.yaw_start,
            body: self.body_angles,
            arms: self.arm_angles,
            head_scale: self.head_scale_start,
        }
    }

    /// Joint values after `elapsed` seconds of dancing.
    ///
    /// Every joint is its own function of `elapsed`; none reads another.
    pub fn pose_at(&self, elapsed: f64) -> DancePose {
        let e = elapsed as f32;
        let [body1, body2, body3] = self.body_angles;
        let [arm1, arm2] = self.arm_angles;
        DancePose {
            lift: self.lift_start + (e * self.lift_rate).sin().abs(),
            yaw: self.yaw_start * e,
            body: [body1 * e.sin() / 2.0, body2 * e.cos() / 2.0, body3 * e],
            arms: [arm1 * e * self.arm_rate, arm2 * e * self.arm_rate],
            head_scale: self.head_scale_base + self.head_scale_start * e.sin(),
        }
    }
}

/// One frame of the dance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DancePose {
    pub lift: f32,
    pub yaw: f32,
    pub body: [f32; 3],
    pub arms: [f32; 2],
    pub head_scale: f32,
}

impl DancePose {
    pub fn lift_matrix(&self) -> Mat4 {
        math::translate(0.0, self.lift, 0.0)
    }

    pub fn yaw_matrix(&self) -> Mat4 {
        math::rotate_y(self.yaw)
    }

    pub fn body_matrices(&self) -> [Mat4; 3] {
        [
            math::rotate_x(self.body[0]),
            math::rotate_z(self.body[1]),
            math::rotate_y(self.body[2]),
        ]
    }

    pub fn arm_matrices(&self) -> [Mat4; 2] {
        [math::rotate_x(self.arms[0]), math::rotate_x(self.arms[1])]
    }

    pub fn head_matrix(&self) -> Mat4 {
        math::scale(self.head_scale, self.head_scale, self.head_scale)
    }
}

/// Makes the dancer dance while another object is close, or on demand.
///
/// The dance is either active or paused. Without a manual override the state
/// follows the distance between `anchor` and the position passed to
/// [`ProximityDanceController::tick`]: strictly closer than the threshold
/// means active. While paused the joints keep their last pose and the phase
/// clock stops, so resuming continues the same motion.
#[derive(Debug)]
pub struct ProximityDanceController {
    rig: DancerRig,
    params: DanceParams,
    anchor: Vec3,
    threshold: f32,
    clock: PhaseClock,
    manual_override: bool,
}

impl ProximityDanceController {
    pub fn new(rig: DancerRig, anchor: Vec3, params: DanceParams, now: f64) -> Self {
        Self {
            rig,
            anchor,
            threshold: params.proximity_threshold,
            params,
            clock: PhaseClock::new(now),
            manual_override: false,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.clock.is_paused()
    }

    pub fn is_overridden(&self) -> bool {
        self.manual_override
    }

    pub fn proximity_threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_proximity_threshold(&mut self, distance: f32) {
        debug!("dance proximity threshold {} -> {distance}", self.threshold);
        self.threshold = distance;
    }

    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    pub fn params(&self) -> &DanceParams {
        &self.params
    }

    /// Seconds of dancing so far, pauses excluded.
    pub fn phase_time(&self, now: f64) -> f64 {
        self.clock.elapsed(now)
    }

    /// Advances the dance to `now`.
    ///
    /// `external` is the position of whatever the dancer reacts to. It is
    /// ignored while the manual override is on; `None` leaves the state as is.
    pub fn tick(&mut self, graph: &mut SceneGraph, now: f64, external: Option<Vec3>) -> Result<()> {
        if !self.manual_override {
            if let Some(position) = external {
                let near = self.anchor.distance(position) < self.threshold;
                self.set_active(near, now);
            }
        }

        if self.is_active() {
            let pose = self.params.pose_at(self.clock.elapsed(now));
            self.apply(graph, &pose)?;
        }
        Ok(())
    }

    /// Flips the manual override. Turning it on also flips the dance on or off.
    pub fn toggle_manual(&mut self, now: f64) {
        self.manual_override = !self.manual_override;
        if self.manual_override {
            self.set_active(!self.is_active(), now);
        }
        info!(
            "dance override {}, dancing: {}",
            if self.manual_override { "on" } else { "off" },
            self.is_active()
        );
    }

    fn set_active(&mut self, active: bool, now: f64) {
        if active == self.is_active() {
            return;
        }
        if active {
            self.clock.resume(now);
            debug!("dance resumed at phase {:.3}s", self.clock.elapsed(now));
        } else {
            self.clock.pause(now);
            debug!("dance paused at phase {:.3}s", self.clock.elapsed(now));
        }
    }

    fn apply(&self, graph: &mut SceneGraph, pose: &DancePose) -> Result<()> {
        let rig = &self.rig;
        graph.set_local(rig.lift, pose.lift_matrix())?;
        graph.set_local(rig.yaw, pose.yaw_matrix())?;
        for (key, matrix) in rig.body.iter().zip(pose.body_matrices()) {
            graph.set_local(*key, matrix)?;
        }
        for (key, matrix) in rig.arms.iter().zip(pose.arm_matrices()) {
            graph.set_local(*key, matrix)?;
        }
        graph.set_local(rig.head_scale, pose.head_matrix())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::assembly::assemble_dancer;
    use crate::scene::Renderable;

    struct Inert;

    impl Renderable for Inert {
        fn render(&mut self, _world: &Mat4) {}
        fn release(&mut self) {}
    }

    fn dancer(now: f64) -> (SceneGraph, ProximityDanceController) {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        let parts = (0..12).map(|_| Box::new(Inert) as Box<dyn Renderable>).collect();
        let params = DanceParams::default();
        let rig = assemble_dancer(&mut graph, root, parts, Vec3::ZERO, &params).unwrap();
        graph.update();
        (graph, ProximityDanceController::new(rig, Vec3::ZERO, params, now))
    }

    fn assert_pose(graph: &SceneGraph, rig: &DancerRig, pose: &DancePose) {
        assert!(graph.local(rig.lift).unwrap().abs_diff_eq(pose.lift_matrix(), 1e-5));
        assert!(graph.local(rig.yaw).unwrap().abs_diff_eq(pose.yaw_matrix(), 1e-5));
        for (key, expected) in rig.body.iter().zip(pose.body_matrices()) {
            assert!(graph.local(*key).unwrap().abs_diff_eq(expected, 1e-5));
        }
        for (key, expected) in rig.arms.iter().zip(pose.arm_matrices()) {
            assert!(graph.local(*key).unwrap().abs_diff_eq(expected, 1e-5));
        }
        assert!(graph.local(rig.head_scale).unwrap().abs_diff_eq(pose.head_matrix(), 1e-5));
    }

    #[test]
    fn pose_formulas() {
        let params = DanceParams::default();
        let start = params.pose_at(0.0);
        assert_abs_diff_eq!(start.lift, 0.0);
        assert_abs_diff_eq!(start.yaw, 0.0);
        assert_abs_diff_eq!(start.body[1], -15.0);
        assert_abs_diff_eq!(start.head_scale, 2.0);

        let pose = params.pose_at(2.0);
        assert_abs_diff_eq!(pose.lift, 6.0f32.sin().abs(), epsilon = 1e-6);
        assert_abs_diff_eq!(pose.yaw, 180.0);
        assert_abs_diff_eq!(pose.body[0], 15.0 * 2.0f32.sin(), epsilon = 1e-5);
        assert_abs_diff_eq!(pose.body[2], 90.0);
        assert_abs_diff_eq!(pose.arms[0], 360.0);
        assert_abs_diff_eq!(pose.arms[1], -360.0);
        assert_abs_diff_eq!(pose.head_scale, 2.0 + 2.0f32.sin(), epsilon = 1e-6);
    }

    #[test]
    fn proximity_boundary_is_exclusive() {
        let (mut graph, mut dance) = dancer(0.0);

        dance.tick(&mut graph, 1.0, Some(Vec3::new(7.9, 0.0, 0.0))).unwrap();
        assert!(dance.is_active());

        dance.tick(&mut graph, 2.0, Some(Vec3::new(8.1, 0.0, 0.0))).unwrap();
        assert!(!dance.is_active());

        dance.tick(&mut graph, 3.0, Some(Vec3::new(0.0, 0.0, 7.9))).unwrap();
        assert!(dance.is_active());

        dance.tick(&mut graph, 4.0, Some(Vec3::new(8.0, 0.0, 0.0))).unwrap();
        assert!(!dance.is_active());
    }

    #[test]
    fn resume_continues_from_the_paused_phase() {
        let near = Some(Vec3::new(1.0, 0.0, 0.0));
        let far = Some(Vec3::new(50.0, 0.0, 0.0));
        let (t0, t1, t2) = (100.0, 101.5, 107.0);
        let (mut graph, mut dance) = dancer(t0);

        dance.tick(&mut graph, t0, near).unwrap();
        let frozen = dance.params().pose_at(0.0);
        assert_pose(&graph, &dance.rig, &frozen);

        dance.tick(&mut graph, t1, far).unwrap();
        assert!(!dance.is_active());
        assert_pose(&graph, &dance.rig, &frozen);

        dance.tick(&mut graph, 104.0, far).unwrap();
        assert_pose(&graph, &dance.rig, &frozen);

        dance.tick(&mut graph, t2, near).unwrap();
        assert!(dance.is_active());
        assert_abs_diff_eq!(dance.phase_time(t2), t1 - t0);
        assert_pose(&graph, &dance.rig, &dance.params().pose_at(t1 - t0));

        dance.tick(&mut graph, t2 + 0.25, near).unwrap();
        assert_abs_diff_eq!(dance.phase_time(t2 + 0.25), t1 - t0 + 0.25);
    }

    #[test]
    fn manual_override_ignores_distance() {
        let near = Some(Vec3::ZERO);
        let (mut graph, mut dance) = dancer(0.0);
        dance.tick(&mut graph, 1.0, near).unwrap();
        assert!(dance.is_active());

        dance.toggle_manual(2.0);
        assert!(dance.is_overridden());
        assert!(!dance.is_active());
        dance.tick(&mut graph, 3.0, near).unwrap();
        assert!(!dance.is_active());

        // second toggle hands control back to proximity
        dance.toggle_manual(4.0);
        assert!(!dance.is_overridden());
        dance.tick(&mut graph, 5.0, near).unwrap();
        assert!(dance.is_active());
        // paused from 2.0 to 5.0
        assert_abs_diff_eq!(dance.phase_time(5.0), 2.0);
    }

    #[test]
    fn missing_position_keeps_state() {
        let (mut graph, mut dance) = dancer(0.0);
        dance.tick(&mut graph, 1.0, Some(Vec3::splat(100.0))).unwrap();
        assert!(!dance.is_active());
        dance.tick(&mut graph, 2.0, None).unwrap();
        assert!(!dance.is_active());
    }

    #[test]
    fn threshold_can_be_changed() {
        let (mut graph, mut dance) = dancer(0.0);
        let position = Some(Vec3::new(10.0, 0.0, 0.0));
        dance.tick(&mut graph, 1.0, position).unwrap();
        assert!(!dance.is_active());

        dance.set_proximity_threshold(12.0);
        assert_abs_diff_eq!(dance.proximity_threshold(), 12.0);
        dance.tick(&mut graph, 2.0, position).unwrap();
        assert!(dance.is_active());
    }
}
