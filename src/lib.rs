// Robot Room: an animated scene graph library
//
// A scene graph of composed transforms, and the controllers that make a
// globe spin, one robot dance and another patrol. Rendering is left to the
// caller through `scene::Renderable`; the `robot-room` binary supplies a
// wgpu implementation.

pub mod animation;
pub mod assembly;
pub mod error;
pub mod light;
pub mod math;
pub mod scene;
pub mod world;

pub use error::{Result, SceneError};
pub use scene::{NodeKey, Renderable, SceneGraph};
pub use world::{PartFactory, World};
