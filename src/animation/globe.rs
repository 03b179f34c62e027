use log::trace;

use super::PhaseClock;
use crate::assembly::GlobeRig;
use crate::error::Result;
use crate::math;
use crate::scene::SceneGraph;

/// Spins the earth about its axis at a constant rate.
#[derive(Debug)]
pub struct GlobeSpinController {
    rig: GlobeRig,
    degrees_per_second: f32,
    clock: PhaseClock,
}

impl GlobeSpinController {
    pub const DEFAULT_RATE: f32 = 45.0;

    pub fn new(rig: GlobeRig, degrees_per_second: f32, now: f64) -> Self {
        Self {
            rig,
            degrees_per_second,
            clock: PhaseClock::new(now),
        }
    }

    pub fn angle(&self, now: f64) -> f32 {
        self.degrees_per_second * self.clock.elapsed(now) as f32
    }

    pub fn tick(&mut self, graph: &mut SceneGraph, now: f64) -> Result<()> {
        let angle = self.angle(now);
        trace!("globe at {angle:.1} degrees");
        graph.set_local(self.rig.spin, math::rotate_y(angle))
    }
}
