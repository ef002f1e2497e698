//! Native playback window (feature `window`).
//!
//! egui must own the main thread, so [`run_window`] opens the window there
//! and runs the playback session on a second thread. The two sides meet in
//! the middle:
//!
//! - [`WindowRenderer`] is the session's [`Renderer`]. It parks the latest
//!   frame, its placement and the overlay lines in a shared scene and asks
//!   egui for a repaint.
//! - The window forwards key presses, close requests and size changes as
//!   [`PlayerEvent`]s over a channel whose receiving end is the session's
//!   [`EventSource`](crate::EventSource).
//!
//! Closing the window drops the event sender, which the session reads as
//! `Quit`. When the session returns on its own the window is closed.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
};

use crossbeam_channel::{Receiver, Sender};
use eframe::egui::{self, Color32, ColorImage, FontId, Key, Pos2, Rect, TextureHandle, Vec2};

use crate::{
    error::PlaybackError,
    input::PlayerEvent,
    render::{OVERLAY_LINE_ORIGINS, OverlayInfo, Renderer},
    source::Frame,
};

const OVERLAY_FONT_SIZE: f32 = 20.0;
/// Margin of the box behind each overlay line, in points.
const OVERLAY_BACKING_PADDING: f32 = 2.0;
/// Half-transparent, so bright frames keep the text readable.
const OVERLAY_BACKING_ALPHA: u8 = 128;

/// The state shared between the session thread and the window.
#[derive(Default)]
struct Scene {
    pending: Option<Frame>,
    placement: Option<(Vec2, Pos2)>,
    overlay: Option<[String; 4]>,
}

/// [`Renderer`] that hands frames to the egui window.
pub struct WindowRenderer {
    scene: Arc<Mutex<Scene>>,
    context: egui::Context,
}

impl Renderer for WindowRenderer {
    fn render(&mut self, frame: Frame, target_size: (u32, u32), position: (i32, i32)) {
        let mut scene = lock(&self.scene);
        scene.pending = Some(frame);
        scene.placement = Some((
            Vec2::new(target_size.0 as f32, target_size.1 as f32),
            Pos2::new(position.0 as f32, position.1 as f32),
        ));
    }

    fn overlay(&mut self, info: &OverlayInfo) {
        lock(&self.scene).overlay = Some(info.lines());
    }

    fn resize(&mut self, width: u32, height: u32) {
        log::debug!("Window resized to {width}x{height}");
    }

    fn present(&mut self) {
        self.context.request_repaint();
    }
}

struct PlayerApp {
    scene: Arc<Mutex<Scene>>,
    events: Sender<PlayerEvent>,
    texture: Option<TextureHandle>,
    last_size: Option<(u32, u32)>,
}

impl PlayerApp {
    fn forward_input(&mut self, ctx: &egui::Context) {
        let (skip, quit, close_requested, size) = ctx.input(|input| {
            (
                input.key_pressed(Key::S),
                input.key_pressed(Key::Q) || input.key_pressed(Key::Escape),
                input.viewport().close_requested(),
                input.screen_rect().size(),
            )
        });

        let size = (size.x.round() as u32, size.y.round() as u32);
        if self.last_size != Some(size) {
            self.last_size = Some(size);
            let _ = self.events.send(PlayerEvent::Resize(size.0, size.1));
        }
        if skip {
            let _ = self.events.send(PlayerEvent::Skip);
        }
        if quit {
            let _ = self.events.send(PlayerEvent::Quit);
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        } else if close_requested {
            let _ = self.events.send(PlayerEvent::Quit);
        }
    }

    fn upload(&mut self, ctx: &egui::Context, frame: Frame) {
        let (width, height) = frame.dimensions();
        let image = ColorImage::from_rgb([width as usize, height as usize], frame.as_raw());
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture("frame", image, egui::TextureOptions::LINEAR));
            }
        }
    }

    fn paint(&mut self, ctx: &egui::Context) {
        let (pending, placement, overlay) = {
            let mut scene = lock(&self.scene);
            (scene.pending.take(), scene.placement, scene.overlay.clone())
        };
        if let Some(frame) = pending {
            self.upload(ctx, frame);
        }

        let painter = ctx.layer_painter(egui::LayerId::background());
        painter.rect_filled(ctx.screen_rect(), 0.0, Color32::BLACK);

        if let (Some(texture), Some((size, position))) = (&self.texture, placement) {
            let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
            painter.image(
                texture.id(),
                Rect::from_min_size(position, size),
                uv,
                Color32::WHITE,
            );
        }

        if let Some(lines) = overlay {
            for (line, (x, y)) in lines.into_iter().zip(OVERLAY_LINE_ORIGINS) {
                let origin = Pos2::new(x as f32, y as f32);
                let galley = painter.layout_no_wrap(
                    line,
                    FontId::proportional(OVERLAY_FONT_SIZE),
                    Color32::WHITE,
                );
                painter.rect_filled(
                    overlay_backing(origin, galley.size()),
                    0.0,
                    Color32::from_black_alpha(OVERLAY_BACKING_ALPHA),
                );
                painter.galley(origin, galley, Color32::WHITE);
            }
        }
    }
}

impl eframe::App for PlayerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.forward_input(ctx);
        self.paint(ctx);
    }
}

/// Open a window of `initial_size` and run `session` beside it.
///
/// `session` runs on its own thread with the window's renderer and event
/// receiver; its return value is handed back once both have finished.
///
/// # Errors
///
/// Returns [`PlaybackError::WindowError`] if the window cannot be created or
/// the session thread panics.
pub fn run_window<T, F>(title: &str, initial_size: (u32, u32), session: F) -> Result<T, PlaybackError>
where
    T: Send + 'static,
    F: FnOnce(WindowRenderer, Receiver<PlayerEvent>) -> T + Send + 'static,
{
    let (result_sender, result_receiver) = crossbeam_channel::bounded(1);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([initial_size.0 as f32, initial_size.1 as f32])
            .with_title(title),
        ..Default::default()
    };

    eframe::run_native(
        title,
        options,
        Box::new(move |cc| {
            let context = cc.egui_ctx.clone();
            let scene = Arc::new(Mutex::new(Scene::default()));
            let (event_sender, event_receiver) = crossbeam_channel::unbounded();

            let renderer = WindowRenderer {
                scene: Arc::clone(&scene),
                context: context.clone(),
            };
            thread::Builder::new()
                .name("playback-session".to_string())
                .spawn(move || {
                    let result = session(renderer, event_receiver);
                    let _ = result_sender.send(result);
                    context.send_viewport_cmd(egui::ViewportCommand::Close);
                })?;

            Ok(Box::new(PlayerApp {
                scene,
                events: event_sender,
                texture: None,
                last_size: None,
            }))
        }),
    )
    .map_err(|error| PlaybackError::WindowError(error.to_string()))?;

    result_receiver
        .recv()
        .map_err(|_| PlaybackError::WindowError("playback session ended unexpectedly".to_string()))
}

/// Box drawn behind a line of `text_size` anchored at `origin`.
fn overlay_backing(origin: Pos2, text_size: Vec2) -> Rect {
    Rect::from_min_size(origin, text_size).expand(OVERLAY_BACKING_PADDING)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
