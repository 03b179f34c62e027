// Square-track patrol with a turn-and-hop at every corner

use glam::{Mat4, Vec3};
use log::{debug, info};

use super::PhaseClock;
use crate::assembly::{PatrolRig, PATROL_ANTENNA_SIZE, PATROL_BODY_SIZE, PATROL_CASING_SIZE};
use crate::error::Result;
use crate::light::Spotlight;
use crate::math;
use crate::scene::SceneGraph;

/// Tuning for the patrol. Distances are per tick, angles in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct PatrolParams {
    pub track_half_length: f32,
    pub speed: f32,
    pub turn_speed: f32,
    pub start_heading: f32,
    /// Peak height of the hop made while turning.
    pub hop_height: f32,
    /// Height of the spotlight above the robot's origin.
    pub light_height: f32,
    /// Radius of the small circle the spotlight traces around the turret.
    pub light_orbit: f32,
    /// Horizontal spread of the spotlight's aim.
    pub light_spread: f32,
}

impl Default for PatrolParams {
    fn default() -> Self {
        Self {
            track_half_length: 6.4,
            speed: 0.05,
            turn_speed: 2.0,
            start_heading: 360.0,
            hop_height: 2.0,
            light_height: PATROL_BODY_SIZE + PATROL_ANTENNA_SIZE + PATROL_CASING_SIZE / 3.0,
            light_orbit: 0.25,
            light_spread: 1.5,
        }
    }
}

impl PatrolParams {
    /// The robot starts at the +X edge of the track, about to head along +Z.
    pub fn start_position(&self) -> Vec3 {
        Vec3::new(self.track_half_length, 0.0, 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatrolMode {
    Traveling,
    Turning,
}

/// Heading of the spinning turret after `elapsed` seconds, in (-180, 180].
pub fn turret_angle(elapsed: f64) -> f32 {
    let angle = elapsed.sin().atan2(elapsed.cos()).to_degrees() as f32;
    math::wrap_degrees(angle)
}

/// Drives the patrolling robot around its track.
///
/// While traveling, one of x or z advances by `speed` each tick. Crossing
/// either end of the track pulls the robot back inside by one step and starts
/// a turn. During a turn x and z stay put; the heading sweeps down by
/// `turn_speed` per tick while the body makes a single hop, and the turn ends
/// exactly 90 degrees below where it began.
///
/// The turret spins on its own phase clock whatever the body is doing.
#[derive(Debug)]
pub struct PatrolController {
    rig: PatrolRig,
    params: PatrolParams,
    position: Vec3,
    axis: Axis,
    sign: f32,
    mode: PatrolMode,
    heading: f32,
    turn_reference: f32,
    speed: f32,
    turn_speed: f32,
    paused: bool,
    turret: PhaseClock,
}

impl PatrolController {
    pub fn new(rig: PatrolRig, params: PatrolParams, now: f64) -> Self {
        Self {
            rig,
            position: params.start_position(),
            axis: Axis::Z,
            sign: 1.0,
            mode: PatrolMode::Traveling,
            heading: params.start_heading,
            turn_reference: params.start_heading,
            speed: params.speed,
            turn_speed: params.turn_speed,
            paused: false,
            turret: PhaseClock::new(now),
            params,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    /// Current hop height; zero while traveling.
    pub fn hop(&self) -> f32 {
        self.position.y
    }

    pub fn mode(&self) -> PatrolMode {
        self.mode
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// +1 or -1: direction of travel along [`PatrolController::axis`].
    pub fn sign(&self) -> f32 {
        self.sign
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Degrees left to turn; zero while traveling.
    pub fn turn_remaining(&self) -> f32 {
        match self.mode {
            PatrolMode::Turning => self.heading - (self.turn_reference - 90.0),
            PatrolMode::Traveling => 0.0,
        }
    }

    pub fn turret_heading(&self, now: f64) -> f32 {
        turret_angle(self.turret.elapsed(now))
    }

    /// Stops or restarts both travel and turning.
    ///
    /// The turret's phase clock is paused alongside, so the turret picks up
    /// where it stopped.
    pub fn set_paused(&mut self, paused: bool, now: f64) {
        if paused == self.paused {
            return;
        }
        self.paused = paused;
        if paused {
            self.speed = 0.0;
            self.turn_speed = 0.0;
            self.turret.pause(now);
        } else {
            self.speed = self.params.speed;
            self.turn_speed = self.params.turn_speed;
            self.turret.resume(now);
        }
        info!("patrol {}", if paused { "stopped" } else { "moving" });
    }

    /// Advances one step and writes the robot's transforms.
    ///
    /// The spotlight is only moved while the robot is not paused.
    pub fn tick(
        &mut self,
        graph: &mut SceneGraph,
        now: f64,
        paused: bool,
        spotlight: &mut dyn Spotlight,
    ) -> Result<()> {
        self.set_paused(paused, now);

        if self.mode == PatrolMode::Traveling {
            self.travel();
        }
        // a turn starts in the same tick the track end is crossed
        if self.mode == PatrolMode::Turning {
            self.turn();
        }

        if !self.paused {
            let elapsed = self.turret.elapsed(now);
            graph.set_local(self.rig.turret, math::rotate_y(turret_angle(elapsed)))?;
            self.aim_spotlight(elapsed, spotlight);
        }

        graph.set_local(self.rig.heading, math::rotate_y(self.heading))?;
        graph.set_local(self.rig.position, Mat4::from_translation(self.position))
    }

    fn travel(&mut self) {
        let half = self.params.track_half_length.max(0.0);
        let speed = self.speed;
        let coord = match self.axis {
            Axis::X => &mut self.position.x,
            Axis::Z => &mut self.position.z,
        };
        *coord += self.sign * speed;

        let past_end = *coord > half;
        if !past_end && *coord >= -half {
            return;
        }

        let corrected = if past_end { half - speed } else { -half + speed };
        *coord = corrected.clamp(-half, half);

        // leaving Z reverses the sense of travel, leaving X keeps it
        let (axis, sign) = match self.axis {
            Axis::Z => (Axis::X, if past_end { -1.0 } else { 1.0 }),
            Axis::X => (Axis::Z, if past_end { 1.0 } else { -1.0 }),
        };
        debug!(
            "patrol reached track end at {}, turning onto {:?}{}",
            self.position,
            axis,
            if sign > 0.0 { "+" } else { "-" }
        );
        self.axis = axis;
        self.sign = sign;
        self.mode = PatrolMode::Turning;
    }

    fn turn(&mut self) {
        // hop height follows the heading at the start of the step
        self.position.y = self.params.hop_height * (2.0 * self.heading.to_radians()).sin().abs();
        self.heading -= self.turn_speed;

        let target = self.turn_reference - 90.0;
        if self.heading <= target {
            self.heading = target;
            self.turn_reference = target;
            self.position.y = 0.0;
            self.mode = PatrolMode::Traveling;
            debug!("patrol finished turn at heading {target}");
        }
        if self.heading <= 0.0 {
            self.heading += 360.0;
            self.turn_reference += 360.0;
            self.position.y = 0.0;
        }
    }

    fn aim_spotlight(&self, elapsed: f64, spotlight: &mut dyn Spotlight) {
        let (sin, cos) = (elapsed.sin() as f32, elapsed.cos() as f32);
        let p = &self.params;
        spotlight.set_position(Vec3::new(
            self.position.x + p.light_orbit * sin,
            self.position.y + p.light_height,
            self.position.z + p.light_orbit * cos,
        ));
        spotlight.set_direction(Vec3::new(p.light_spread * sin, -1.0, p.light_spread * cos));
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::assembly::assemble_patrol;
    use crate::scene::Renderable;

    struct Inert;

    impl Renderable for Inert {
        fn render(&mut self, _world: &Mat4) {}
        fn release(&mut self) {}
    }

    #[derive(Default)]
    struct RecordingLight {
        position: Option<Vec3>,
        direction: Option<Vec3>,
        updates: usize,
    }

    impl Spotlight for RecordingLight {
        fn set_position(&mut self, position: Vec3) {
            self.position = Some(position);
            self.updates += 1;
        }

        fn set_direction(&mut self, direction: Vec3) {
            self.direction = Some(direction);
        }
    }

    fn patrol(params: PatrolParams) -> (SceneGraph, PatrolController) {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        let parts = (0..5).map(|_| Box::new(Inert) as Box<dyn Renderable>).collect();
        let rig = assemble_patrol(&mut graph, root, parts, &params).unwrap();
        graph.update();
        (graph, PatrolController::new(rig, params, 0.0))
    }

    /// Ticks until the mode changes, returning the number of ticks taken.
    fn run_until_mode(
        graph: &mut SceneGraph,
        patrol: &mut PatrolController,
        light: &mut RecordingLight,
        mode: PatrolMode,
    ) -> usize {
        for step in 1..=10_000 {
            patrol.tick(graph, step as f64 * 0.016, false, light).unwrap();
            if patrol.mode() == mode {
                return step;
            }
        }
        panic!("patrol never entered {mode:?}");
    }

    #[test]
    fn starts_along_positive_z() {
        let (mut graph, mut patrol) = patrol(PatrolParams::default());
        let mut light = RecordingLight::default();
        patrol.tick(&mut graph, 0.0, false, &mut light).unwrap();
        assert_abs_diff_eq!(patrol.position().z, 0.05);
        assert_abs_diff_eq!(patrol.position().x, 6.4);
        assert_eq!(patrol.mode(), PatrolMode::Traveling);

        let origin = graph.local(patrol.rig.position).unwrap().transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(patrol.position(), 1e-6));
    }

    #[test]
    fn turn_starts_inside_the_track() {
        let params = PatrolParams::default();
        let (mut graph, mut patrol) = patrol(params.clone());
        let mut light = RecordingLight::default();

        run_until_mode(&mut graph, &mut patrol, &mut light, PatrolMode::Turning);
        let half = params.track_half_length;
        assert_abs_diff_eq!(patrol.position().z, half - params.speed);
        assert!((-half..=half).contains(&patrol.position().z));
        assert_abs_diff_eq!(patrol.position().x, half);
        assert_eq!((patrol.axis(), patrol.sign()), (Axis::X, -1.0));
    }

    #[test]
    fn turn_freezes_xz_and_ends_ninety_degrees_lower() {
        let (mut graph, mut patrol) = patrol(PatrolParams::default());
        let mut light = RecordingLight::default();

        run_until_mode(&mut graph, &mut patrol, &mut light, PatrolMode::Turning);
        let entry_heading = 360.0;
        let corner = patrol.position();
        let mut peak: f32 = 0.0;
        for step in 0..10_000 {
            patrol.tick(&mut graph, 100.0 + step as f64, false, &mut light).unwrap();
            assert_abs_diff_eq!(patrol.position().x, corner.x);
            assert_abs_diff_eq!(patrol.position().z, corner.z);
            peak = peak.max(patrol.hop());
            if patrol.mode() == PatrolMode::Traveling {
                break;
            }
        }

        assert_eq!(patrol.mode(), PatrolMode::Traveling);
        assert_eq!(patrol.heading(), entry_heading - 90.0);
        assert_eq!(patrol.hop(), 0.0);
        assert_eq!(patrol.turn_remaining(), 0.0);
        assert!(peak > 1.9, "hop peaked at {peak}");
    }

    #[test]
    fn uneven_turn_speed_snaps_to_target() {
        let params = PatrolParams {
            turn_speed: 7.0,
            ..PatrolParams::default()
        };
        let (mut graph, mut patrol) = patrol(params);
        let mut light = RecordingLight::default();

        run_until_mode(&mut graph, &mut patrol, &mut light, PatrolMode::Turning);
        run_until_mode(&mut graph, &mut patrol, &mut light, PatrolMode::Traveling);
        assert_eq!(patrol.heading(), 270.0);
        assert_eq!(patrol.hop(), 0.0);
    }

    #[test]
    fn full_circuit_visits_each_leg_and_wraps_heading() {
        let (mut graph, mut patrol) = patrol(PatrolParams::default());
        let mut light = RecordingLight::default();
        let mut legs = Vec::new();
        let mut headings = Vec::new();

        for _ in 0..4 {
            run_until_mode(&mut graph, &mut patrol, &mut light, PatrolMode::Turning);
            legs.push((patrol.axis(), patrol.sign()));
            run_until_mode(&mut graph, &mut patrol, &mut light, PatrolMode::Traveling);
            headings.push(patrol.heading());
        }

        assert_eq!(
            legs,
            [(Axis::X, -1.0), (Axis::Z, -1.0), (Axis::X, 1.0), (Axis::Z, 1.0)]
        );
        assert_eq!(headings, [270.0, 180.0, 90.0, 360.0]);
    }

    #[test]
    fn pause_freezes_body_turret_and_light() {
        let (mut graph, mut patrol) = patrol(PatrolParams::default());
        let mut light = RecordingLight::default();

        patrol.tick(&mut graph, 1.0, false, &mut light).unwrap();
        let position = patrol.position();
        let turret = graph.local(patrol.rig.turret).unwrap();
        let turret_heading = patrol.turret_heading(1.0);
        assert_eq!(light.updates, 1);

        patrol.tick(&mut graph, 2.0, true, &mut light).unwrap();
        patrol.tick(&mut graph, 30.0, true, &mut light).unwrap();
        assert!(patrol.is_paused());
        assert_eq!(patrol.position(), position);
        assert_eq!(graph.local(patrol.rig.turret).unwrap(), turret);
        assert_eq!(light.updates, 1);

        // the turret resumes from the phase it was paused at
        patrol.tick(&mut graph, 40.0, false, &mut light).unwrap();
        assert_abs_diff_eq!(patrol.turret_heading(40.0), turret_angle(2.0), epsilon = 1e-4);
        assert!(turret_heading != patrol.turret_heading(40.0));
        assert_abs_diff_eq!(patrol.position().z, position.z + 0.05, epsilon = 1e-6);
        assert_eq!(light.updates, 2);
    }

    #[test]
    fn pause_mid_turn_holds_heading() {
        let (mut graph, mut patrol) = patrol(PatrolParams::default());
        let mut light = RecordingLight::default();
        run_until_mode(&mut graph, &mut patrol, &mut light, PatrolMode::Turning);
        patrol.tick(&mut graph, 500.0, false, &mut light).unwrap();
        let heading = patrol.heading();

        patrol.tick(&mut graph, 501.0, true, &mut light).unwrap();
        assert_eq!(patrol.heading(), heading);
        let hop = patrol.hop();

        for step in 0..10 {
            patrol.tick(&mut graph, 502.0 + step as f64, true, &mut light).unwrap();
        }
        assert_eq!(patrol.heading(), heading);
        assert_eq!(patrol.hop(), hop);
        assert_eq!(patrol.mode(), PatrolMode::Turning);
    }

    #[test]
    fn turn_begins_on_the_crossing_tick() {
        let params = PatrolParams::default();
        let (mut graph, mut patrol) = patrol(params.clone());
        let mut light = RecordingLight::default();

        run_until_mode(&mut graph, &mut patrol, &mut light, PatrolMode::Turning);
        // the first turning step already ran, with the hop taken from 360
        assert_eq!(patrol.heading(), params.start_heading - params.turn_speed);
        assert_abs_diff_eq!(patrol.hop(), 0.0, epsilon = 1e-4);

        let before = patrol.heading();
        patrol.tick(&mut graph, 100.0, false, &mut light).unwrap();
        let expected = params.hop_height * (2.0 * before.to_radians()).sin().abs();
        assert_abs_diff_eq!(patrol.hop(), expected, epsilon = 1e-6);
        assert_eq!(patrol.heading(), before - params.turn_speed);
    }

    #[test]
    fn turret_heading_is_bounded_and_ignores_body_state() {
        for i in -2000..2000 {
            let e = i as f64 * 0.01;
            let angle = turret_angle(e);
            assert!(angle > -180.0 && angle <= 180.0, "{angle} at {e}");
        }
        assert_abs_diff_eq!(turret_angle(std::f64::consts::PI), 180.0, epsilon = 1e-3);
        assert_abs_diff_eq!(turret_angle(-std::f64::consts::FRAC_PI_2), -90.0, epsilon = 1e-3);

        let (mut graph_a, mut traveling) = patrol(PatrolParams::default());
        let (mut graph_b, mut turning) = patrol(PatrolParams::default());
        let mut light = RecordingLight::default();
        run_until_mode(&mut graph_b, &mut turning, &mut light, PatrolMode::Turning);

        traveling.tick(&mut graph_a, 3.0, false, &mut light).unwrap();
        turning.tick(&mut graph_b, 3.0, false, &mut light).unwrap();
        assert_eq!(turning.mode(), PatrolMode::Turning);
        assert_eq!(
            graph_a.local(traveling.rig.turret).unwrap(),
            graph_b.local(turning.rig.turret).unwrap()
        );
    }

    #[test]
    fn spotlight_follows_robot() {
        let (mut graph, mut patrol) = patrol(PatrolParams::default());
        let mut light = RecordingLight::default();
        patrol.tick(&mut graph, 0.0, false, &mut light).unwrap();

        let p = patrol.position();
        let expected = Vec3::new(p.x, 1.0 + 2.5 + 0.25, p.z + 0.25);
        assert!(light.position.unwrap().abs_diff_eq(expected, 1e-5));
        assert!(light.direction.unwrap().abs_diff_eq(Vec3::new(0.0, -1.0, 1.5), 1e-6));
    }

    #[test]
    fn zero_length_track_stays_on_the_spot() {
        let params = PatrolParams {
            track_half_length: 0.0,
            ..PatrolParams::default()
        };
        let (mut graph, mut patrol) = patrol(params);
        let mut light = RecordingLight::default();
        for step in 0..500 {
            patrol.tick(&mut graph, step as f64, false, &mut light).unwrap();
            assert_eq!(patrol.position().x, 0.0);
            assert_eq!(patrol.position().z, 0.0);
        }
    }
}
