//! Window host: owns the event loop and drives a [`SceneController`].

use crate::config::SculptConfig;
use crate::error::{SculptError, SculptResult};
use crate::gpu::GpuContext;
use crate::scene::{RenderMode, SceneController};
use crate::shaders::ShaderLibrary;
use crate::tool::PointerInput;
use web_time::Instant;
use winit::event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::Key;
use winit::window::Window;

/// Pixels of trackpad scroll per wheel notch.
const PIXELS_PER_NOTCH: f32 = 120.0;
const BRUSH_RADIUS_STEP: f32 = 1.25;

/// Button and modifier state, mapped to sculpt/rotate/zoom intents.
///
/// Left drags sculpt, Alt+left or right drags rotate and Alt+right drags zoom.
#[derive(Clone, Copy, Debug, Default)]
struct PointerTracker {
    x: f32,
    y: f32,
    left: bool,
    right: bool,
    alt: bool,
}

impl PointerTracker {
    fn input(&self, zoom_delta: f32) -> PointerInput {
        PointerInput {
            x: self.x,
            y: self.y,
            sculpt: self.left && !self.alt,
            rotate: (self.left && self.alt) || (self.right && !self.alt),
            zoom: self.right && self.alt,
            zoom_delta,
        }
    }
}

fn wheel_notches(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_NOTCH,
    }
}

fn handle_key(scene: &mut SceneController, event: &KeyEvent) -> SculptResult<()> {
    if event.state != ElementState::Pressed {
        return Ok(());
    }
    match event.logical_key.as_ref() {
        Key::Character("1") => scene.set_tool_index(0)?,
        Key::Character("2") => scene.set_tool_index(1)?,
        Key::Character("s") => scene.enable_shadows(!scene.shadows_enabled()),
        Key::Character("w") => {
            let mode = match scene.render_mode() {
                RenderMode::Solid => RenderMode::Wireframe,
                RenderMode::Wireframe => RenderMode::Solid,
            };
            scene.set_render_mode(mode)?;
        }
        Key::Character("[") => scene.set_brush_radius(scene.tool().brush_radius() / BRUSH_RADIUS_STEP),
        Key::Character("]") => scene.set_brush_radius(scene.tool().brush_radius() * BRUSH_RADIUS_STEP),
        _ => {}
    }
    Ok(())
}

/// Open the sculpt session in `window` and run until it is closed.
///
/// `setup` runs once on the freshly seeded scene, before the first frame.
pub async fn run(
    event_loop: EventLoop<()>,
    window: Window,
    config: SculptConfig,
    shaders: ShaderLibrary,
    setup: impl FnOnce(&mut SceneController) -> SculptResult<()>,
) -> SculptResult<()> {
    let mut size = window.inner_size();
    size.width = size.width.max(1);
    size.height = size.height.max(1);

    let instance = wgpu::Instance::default();
    let surface = instance.create_surface(&window)?;
    let gpu = GpuContext::with_instance(instance, Some(&surface)).await?;

    let mut surface_config = surface
        .get_default_config(&gpu.adapter, size.width, size.height)
        .ok_or(SculptError::SurfaceUnsupported)?;
    surface.configure(&gpu.device, &surface_config);
    log::info!("Surface format {:?}", surface_config.format);

    let mut scene = SceneController::new(gpu, config, shaders, surface_config.format, size.width, size.height)?;
    setup(&mut scene)?;

    let mut pointer = PointerTracker::default();
    let mut last_frame = Instant::now();

    let window = &window;
    event_loop.run(move |event, target| {
        let Event::WindowEvent { event, .. } = event else {
            return;
        };
        match event {
            WindowEvent::Resized(new_size) => {
                surface_config.width = new_size.width.max(1);
                surface_config.height = new_size.height.max(1);
                surface.configure(&scene.gpu().device, &surface_config);
                scene.resize(surface_config.width, surface_config.height);
                window.request_redraw();
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                pointer.alt = modifiers.state().alt_key();
            }
            WindowEvent::CursorMoved { position, .. } => {
                pointer.x = position.x as f32;
                pointer.y = position.y as f32;
                scene.handle_pointer(pointer.input(0.0));
            }
            WindowEvent::CursorLeft { .. } => scene.clear_hover(),
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => pointer.left = pressed,
                    MouseButton::Right => pointer.right = pressed,
                    _ => return,
                }
                scene.handle_pointer(pointer.input(0.0));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                scene.handle_pointer(pointer.input(wheel_notches(delta)));
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let Err(err) = handle_key(&mut scene, &event) {
                    log::error!("{err}");
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(last_frame).as_secs_f64();
                last_frame = now;

                match surface.get_current_texture() {
                    Ok(frame) => {
                        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
                        let result = scene.tick(dt, &view);
                        log::trace!("{result:?}");
                        frame.present();
                    }
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        log::warn!("Surface lost or outdated, reconfiguring");
                        surface.configure(&scene.gpu().device, &surface_config);
                    }
                    Err(err) => log::error!("Skipping frame: {err}"),
                }
                window.request_redraw();
            }
            WindowEvent::CloseRequested => target.exit(),
            _ => {}
        }
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(left: bool, right: bool, alt: bool) -> PointerTracker {
        PointerTracker {
            left,
            right,
            alt,
            ..Default::default()
        }
    }

    #[test]
    fn buttons_map_to_one_intent() {
        let sculpt = tracker(true, false, false).input(0.0);
        assert!(sculpt.sculpt && !sculpt.rotate && !sculpt.zoom);

        let alt_left = tracker(true, false, true).input(0.0);
        assert!(!alt_left.sculpt && alt_left.rotate && !alt_left.zoom);

        let right = tracker(false, true, false).input(0.0);
        assert!(!right.sculpt && right.rotate && !right.zoom);

        let alt_right = tracker(false, true, true).input(0.0);
        assert!(!alt_right.sculpt && !alt_right.rotate && alt_right.zoom);
    }

    #[test]
    fn wheel_pixels_convert_to_notches() {
        let delta = MouseScrollDelta::PixelDelta(winit::dpi::PhysicalPosition::new(0.0, 240.0));
        assert_eq!(wheel_notches(delta), 2.0);
        assert_eq!(wheel_notches(MouseScrollDelta::LineDelta(0.0, -1.0)), -1.0);
    }
}
