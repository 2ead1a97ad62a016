use std::time::Instant;

use env_logger::Env;
use glam::Vec3;
use pathtracer_shared::TracerConfig;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::EventLoop,
    window::WindowBuilder,
};

mod accumulation;
mod buffers;
mod camera;
mod compute;
mod error;
mod input;
mod math;
mod pipeline;
mod renderer;
mod scene;

use accumulation::should_accumulate;
use camera::Camera;
use compute::PathTracer;
use error::RendererError;
use input::InputState;
use scene::Scene;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = pollster::block_on(run()) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), RendererError> {
    let event_loop = EventLoop::new();
    let (width, height) = TracerConfig::INITIAL_WINDOW_SIZE;
    let window = WindowBuilder::new()
        .with_title("GPU Path Tracer")
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|e| RendererError::UnsupportedBackend(e.to_string()))?;

    let scene = Scene::populate(scene::default_scene);
    let mut tracer = PathTracer::new(&window, &scene).await?;

    let mut camera = Camera::with_aspect_ratio(tracer.aspect_ratio());
    camera.set_position(Vec3::new(0.0, 0.0, -6.0));

    let mut input = InputState::new();
    let mut last_frame = Instant::now();

    event_loop.run(move |event, _, control_flow| {
        match event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => match event {
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(VirtualKeyCode::Escape),
                            ..
                        },
                    ..
                } => {
                    let size = tracer.size();
                    log::info!(
                        "Exiting at {}x{} after {} accumulated samples",
                        size.width,
                        size.height,
                        tracer.accumulation().frame_index()
                    );
                    control_flow.set_exit();
                }
                WindowEvent::Resized(physical_size) => {
                    tracer.resize(*physical_size, &mut camera);
                }
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                    tracer.resize(**new_inner_size, &mut camera);
                }
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state,
                            virtual_keycode: Some(key),
                            ..
                        },
                    ..
                } => {
                    input.handle_keyboard(*key, *state);
                }
                WindowEvent::MouseInput { button, state, .. } => {
                    input.handle_mouse_input(*button, *state);
                }
                WindowEvent::CursorMoved { position, .. } => {
                    input.handle_cursor_moved(*position);
                }
                WindowEvent::Focused(false) => {
                    input.clear();
                }
                _ => {}
            },
            Event::RedrawRequested(window_id) if window_id == window.id() => {
                let now = Instant::now();
                let delta_seconds = now.duration_since(last_frame).as_secs_f32();
                last_frame = now;

                let input_applied = input.apply(&mut camera, delta_seconds);
                camera.settle(delta_seconds);
                let accumulate = should_accumulate(&camera, input_applied, TracerConfig::SETTLE_THRESHOLD);

                if let Err(e) = tracer.render_frame(&mut camera, accumulate) {
                    log::error!("Frame failed: {}", e);
                    control_flow.set_exit_with_code(1);
                }
            }
            Event::MainEventsCleared => {
                window.request_redraw();
            }
            _ => {}
        }
    })
}
