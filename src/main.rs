// Robot Room: an animated scene graph in a window

// Module declarations
mod mesh;
mod renderer;

use winit::event_loop::EventLoop;

#[tokio::main]
async fn main() {
    // Initialize logging, filtered by RUST_LOG
    env_logger::init();

    let event_loop = EventLoop::new().expect("Failed to create event loop");

    let renderer = renderer::Renderer::new(&event_loop).await;

    log::info!("keys: WASD orbit, 1 dance, 2 patrol, =/- threshold, [/] spotlight, ,/. room light, Esc quit");
    renderer.run(event_loop);
}
