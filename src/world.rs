// World module for the robot room
//
// Every rig under one root, and the per-frame sequence.

use glam::Vec3;
use log::{debug, info, trace};

use crate::animation::{
    DanceParams, GlobeSpinController, PatrolController, PatrolParams, ProximityDanceController,
};
use crate::assembly::{self, PartRole, DANCER_PARTS, GLOBE_PARTS, PATROL_PARTS, ROOM_PARTS};
use crate::error::Result;
use crate::light::{self, PointLight, SpotLight};
use crate::scene::{Renderable, SceneGraph};

/// Where the dancer stands.
pub const DANCER_ANCHOR: Vec3 = Vec3::new(-2.0, 0.0, -2.0);
/// Earth yaw at start-up, in degrees.
pub const GLOBE_START_ANGLE: f32 = 45.0;

/// Creates the renderable for one part of a rig.
pub trait PartFactory {
    fn make_part(&mut self, rig: &str, role: &PartRole) -> Box<dyn Renderable>;
}

impl<F> PartFactory for F
where
    F: FnMut(&str, &PartRole) -> Box<dyn Renderable>,
{
    fn make_part(&mut self, rig: &str, role: &PartRole) -> Box<dyn Renderable> {
        self(rig, role)
    }
}

fn make_parts(factory: &mut dyn PartFactory, rig: &str, roles: &[PartRole]) -> Vec<Box<dyn Renderable>> {
    roles.iter().map(|role| factory.make_part(rig, role)).collect()
}

pub struct World {
    graph: SceneGraph,
    globe: GlobeSpinController,
    dance: ProximityDanceController,
    patrol: PatrolController,
    patrol_paused: bool,
    spotlight: SpotLight,
    global_light: PointLight,
}

impl World {
    pub fn new(factory: &mut dyn PartFactory, now: f64) -> Result<Self> {
        Self::with_params(factory, DanceParams::default(), PatrolParams::default(), now)
    }

    pub fn with_params(
        factory: &mut dyn PartFactory,
        dance_params: DanceParams,
        patrol_params: PatrolParams,
        now: f64,
    ) -> Result<Self> {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();

        assembly::assemble_room(&mut graph, root, make_parts(factory, "room", &ROOM_PARTS))?;
        let globe = assembly::assemble_globe(
            &mut graph,
            root,
            make_parts(factory, "globe", &GLOBE_PARTS),
            GLOBE_START_ANGLE,
        )?;
        let dancer = assembly::assemble_dancer(
            &mut graph,
            root,
            make_parts(factory, "dancer", &DANCER_PARTS),
            DANCER_ANCHOR,
            &dance_params,
        )?;
        let patrol = assembly::assemble_patrol(
            &mut graph,
            root,
            make_parts(factory, "patrol", &PATROL_PARTS),
            &patrol_params,
        )?;

        graph.update();
        debug!("scene graph assembled:\n{}", graph.describe(false));

        Ok(Self {
            graph,
            globe: GlobeSpinController::new(globe, GlobeSpinController::DEFAULT_RATE, now),
            dance: ProximityDanceController::new(dancer, DANCER_ANCHOR, dance_params, now),
            patrol: PatrolController::new(patrol, patrol_params, now),
            patrol_paused: false,
            spotlight: SpotLight::default(),
            global_light: PointLight::default(),
        })
    }

    /// Runs one frame: tick every controller, propagate, draw.
    ///
    /// The dancer reacts to where the patrol robot stood at the end of the
    /// previous frame.
    pub fn frame(&mut self, now: f64) -> Result<()> {
        self.globe.tick(&mut self.graph, now)?;
        self.dance.tick(&mut self.graph, now, Some(self.patrol.position()))?;
        self.patrol.tick(&mut self.graph, now, self.patrol_paused, &mut self.spotlight)?;

        self.graph.update();
        self.graph.draw();
        trace!(
            "frame at {now:.3}: patrol {} dancing {}",
            self.patrol.position(),
            self.dance.is_active()
        );
        Ok(())
    }

    pub fn toggle_dance(&mut self, now: f64) {
        self.dance.toggle_manual(now);
    }

    /// Takes effect on the next frame.
    pub fn toggle_patrol(&mut self) {
        self.patrol_paused = !self.patrol_paused;
        info!("patrol {} requested", if self.patrol_paused { "stop" } else { "start" });
    }

    pub fn adjust_threshold(&mut self, delta: f32) {
        let threshold = (self.dance.proximity_threshold() + delta).max(0.0);
        self.dance.set_proximity_threshold(threshold);
        info!("dance proximity threshold {threshold}");
    }

    pub fn adjust_spotlight(&mut self, delta: f32) {
        light::adjust_intensity(&mut self.spotlight.intensity, delta);
        info!("spotlight intensity {}", self.spotlight.intensity);
    }

    pub fn adjust_global_light(&mut self, delta: f32) {
        light::adjust_intensity(&mut self.global_light.intensity, delta);
        info!("global light intensity {}", self.global_light.intensity);
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn dance(&self) -> &ProximityDanceController {
        &self.dance
    }

    pub fn patrol(&self) -> &PatrolController {
        &self.patrol
    }

    pub fn globe(&self) -> &GlobeSpinController {
        &self.globe
    }

    pub fn is_patrol_paused(&self) -> bool {
        self.patrol_paused
    }

    pub fn spotlight(&self) -> &SpotLight {
        &self.spotlight
    }

    pub fn global_light(&self) -> &PointLight {
        &self.global_light
    }

    /// Releases every part's resources. Safe to call more than once.
    pub fn shutdown(&mut self) {
        info!("releasing {} scene nodes", self.graph.node_count());
        self.graph.release();
    }
}
