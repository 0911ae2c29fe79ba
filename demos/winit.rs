use std::sync::Arc;

use futures::executor::block_on;
use stardust::{scroll_progress, Backdrop, BackdropConfig, Theme};
use winit::event::{ElementState, Event, MouseScrollDelta, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::Key;
use winit::window::WindowBuilder;

/// Simulated page height driven by the mouse wheel, standing in for the
/// host page's scroll range.
const CONTENT_EXTENT: f32 = 4000.0;

pub fn main() {
    env_logger::init();
    let event_loop = EventLoop::new().expect("To create the event loop");
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("stardust backdrop")
            .with_transparent(true)
            .build(&event_loop)
            .unwrap(),
    );

    let window_size = window.inner_size();
    let scale_factor = window.scale_factor();
    let physical_size = (window_size.width, window_size.height);

    let mut backdrop = block_on(Backdrop::attach(
        window.clone(),
        physical_size,
        scale_factor,
        BackdropConfig {
            theme: Theme::Dark,
            ..BackdropConfig::default()
        },
    ))
    .expect("To attach the backdrop");

    let mut dark = true;
    let mut enabled = true;
    let mut scroll_offset: f32 = 0.0;

    let _ = event_loop.run(move |event, event_loop_window_target| match event {
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == window.id() => match event {
            WindowEvent::CloseRequested => {
                backdrop.dispose();
                event_loop_window_target.exit();
            }
            WindowEvent::Resized(physical_size) => {
                backdrop.resize((physical_size.width, physical_size.height));
                window.request_redraw();
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                backdrop.change_scale_factor(*scale_factor);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(window.scale_factor());
                backdrop.pointer_moved(logical.x, logical.y);
            }
            WindowEvent::CursorLeft { .. } => {
                backdrop.pointer_left();
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y * 40.0,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32,
                };
                let viewport = window.inner_size().height as f32;
                scroll_offset = (scroll_offset - lines).clamp(0.0, CONTENT_EXTENT - viewport);
                backdrop.scroll_changed(scroll_progress(scroll_offset, CONTENT_EXTENT, viewport));
            }
            WindowEvent::Occluded(occluded) => {
                backdrop.set_visible(!occluded);
                if !occluded {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match event.logical_key.as_ref() {
                    // Flip the theme attribute the way the host page would.
                    Key::Character("t") => {
                        dark = !dark;
                        backdrop.observe_theme(if dark { "dark" } else { "light" });
                    }
                    // The external pause/resume toggle.
                    Key::Character(" ") | Key::Character("p") => {
                        enabled = !enabled;
                        backdrop.set_enabled(enabled);
                        if enabled {
                            window.request_redraw();
                        }
                    }
                    _ => {}
                }
            }
            WindowEvent::RedrawRequested => {
                match backdrop.render_frame() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = window.inner_size();
                        backdrop.resize((size.width, size.height));
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => event_loop_window_target.exit(),
                    Err(e) => eprintln!("{e:?}"),
                }
                if backdrop.is_running() {
                    window.request_redraw();
                }
            }
            _ => {}
        },
        _ => {}
    });
}
