// Animation module for the robot room
//
// Controllers hold the keys of the transform nodes they own and overwrite
// their local transforms on `tick`. World transforms are only recomputed by
// `SceneGraph::update`.

mod clock;
mod dance;
mod globe;
mod patrol;

pub use clock::PhaseClock;
pub use dance::{DanceParams, DancePose, ProximityDanceController};
pub use globe::GlobeSpinController;
pub use patrol::{turret_angle, Axis, PatrolController, PatrolMode, PatrolParams};
