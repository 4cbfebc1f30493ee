//! Browser host: owns the running session, wires keyboard events into the
//! input snapshot and drives tick, cast and draw from `requestAnimationFrame`.

use std::cell::{Cell, RefCell};

use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{window, CanvasRenderingContext2d, HtmlCanvasElement, ImageData, KeyboardEvent};

use crate::config::{EngineConfig, RaycastConfig};
use crate::grid::Grid;
use crate::input::InputState;
use crate::raycast::RaycastResult;
use crate::render::{self, FrameBuffer, MinimapLayout};
use crate::world::{FixedStep, World};

/// Gap between the canvas corner and the minimap, in pixels
const MINIMAP_MARGIN: u32 = 8;
/// Roughly this many rays of the fan are drawn on the minimap
const MINIMAP_RAYS: usize = 24;

type LoopClosure = RefCell<Option<Closure<dyn FnMut(f64)>>>;
type Listeners = RefCell<Vec<(&'static str, Closure<dyn FnMut(web_sys::Event)>)>>;

thread_local! {
    static SESSION: RefCell<Option<Session>> = const { RefCell::new(None) };
    static LOOP: LoopClosure = const { RefCell::new(None) };
    static FRAME_ID: Cell<Option<i32>> = const { Cell::new(None) };
    static LISTENERS: Listeners = const { RefCell::new(Vec::new()) };
}

struct Session {
    world: World,
    input: InputState,
    config: EngineConfig,
    clock: FixedStep,
    buffer: FrameBuffer,
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    last_cast: RaycastResult,
}

impl Session {
    fn new(canvas_id: &str, config: EngineConfig) -> Result<Self, JsValue> {
        let document = window()
            .ok_or("No window")?
            .document()
            .ok_or("No document")?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| format!("Canvas #{} not found", canvas_id))?
            .dyn_into::<HtmlCanvasElement>()?;
        fit_canvas(&canvas);
        let context = canvas
            .get_context("2d")?
            .ok_or("Failed to get 2d context")?
            .dyn_into::<CanvasRenderingContext2d>()?;

        let grid = Grid::from_tags(&config.layout_rows())?;
        let world = World::new(grid, config.spawn, config.movement.clone())?;

        Ok(Session {
            world,
            input: InputState::new(),
            clock: FixedStep::new(config.tick_ms),
            buffer: FrameBuffer::new(canvas.width(), canvas.height()),
            canvas,
            context,
            config,
            last_cast: RaycastResult::default(),
        })
    }

    fn frame(&mut self, now_ms: f64) {
        let ticks = self.clock.advance(now_ms);
        if ticks > 0 {
            let intent = self.input.intent();
            for _ in 0..ticks {
                self.world.tick(intent);
            }
        }
        if let Err(e) = self.render() {
            log::error!("frame failed: {:?}", e);
        }
    }

    fn render(&mut self) -> Result<(), JsValue> {
        let config = frame_raycast(&self.config, self.buffer.width);
        self.last_cast = self.world.cast(&config)?;

        render::draw_scene(&mut self.buffer, &self.last_cast);
        if let Some(layout) = minimap_layout(
            self.config.minimap_scale,
            self.buffer.height,
            self.last_cast.len(),
        ) {
            render::draw_minimap(
                &mut self.buffer,
                self.world.grid(),
                self.world.pose(),
                &self.last_cast,
                &layout,
            );
        }
        self.present()
    }

    fn present(&self) -> Result<(), JsValue> {
        if self.buffer.width == 0 || self.buffer.height == 0 {
            return Ok(());
        }
        let image = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(&self.buffer.pixels),
            self.buffer.width,
            self.buffer.height,
        )?;
        self.context.put_image_data(&image, 0.0, 0.0)
    }

    fn resize(&mut self) {
        fit_canvas(&self.canvas);
        self.buffer.resize(self.canvas.width(), self.canvas.height());
    }
}

/// Raycast settings for one frame; optionally one ray per pixel column
fn frame_raycast(config: &EngineConfig, width: u32) -> RaycastConfig {
    let mut raycast = config.raycast.clone();
    if config.ray_per_column {
        raycast.ray_count = (width as usize).max(1);
    }
    raycast
}

fn minimap_layout(scale: f64, height: u32, rays: usize) -> Option<MinimapLayout> {
    let cell_px = height as f64 * scale;
    if cell_px <= 0.0 {
        return None;
    }
    Some(MinimapLayout {
        origin_x: MINIMAP_MARGIN,
        origin_y: MINIMAP_MARGIN,
        cell_px,
        ray_stride: (rays / MINIMAP_RAYS).max(1),
    })
}

/// Match the drawing buffer to the element's laid-out size
fn fit_canvas(canvas: &HtmlCanvasElement) {
    let (w, h) = (canvas.client_width(), canvas.client_height());
    if w > 0 && h > 0 {
        canvas.set_width(w as u32);
        canvas.set_height(h as u32);
    }
}

fn with_session<R>(f: impl FnOnce(&mut Session) -> R) -> Option<R> {
    SESSION.with(|s| s.borrow_mut().as_mut().map(f))
}

fn request_frame() -> Result<(), JsValue> {
    let w = window().ok_or("No window")?;
    LOOP.with(|l| {
        if let Some(ref cb) = *l.borrow() {
            let id = w.request_animation_frame(cb.as_ref().unchecked_ref())?;
            FRAME_ID.with(|f| f.set(Some(id)));
        }
        Ok(())
    })
}

fn start_loop() -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(move |ts: f64| {
        if with_session(|session| session.frame(ts)).is_none() {
            return;
        }
        if let Err(e) = request_frame() {
            log::error!("requestAnimationFrame failed: {:?}", e);
        }
    }) as Box<dyn FnMut(f64)>);

    LOOP.with(|l| *l.borrow_mut() = Some(closure));
    request_frame()
}

fn key_listener(pressed: bool) -> Closure<dyn FnMut(web_sys::Event)> {
    Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |e: web_sys::Event| {
        let Some(key) = e.dyn_ref::<KeyboardEvent>() else {
            return;
        };
        let code = key.code();
        let bound = with_session(|session| {
            if pressed {
                session.input.key_down(&code)
            } else {
                session.input.key_up(&code)
            }
        });
        // Keep arrow keys from scrolling the page
        if bound == Some(true) {
            e.prevent_default();
        }
    }))
}

fn install_listeners() -> Result<(), JsValue> {
    let w = window().ok_or("No window")?;
    let blur = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(|_e: web_sys::Event| {
        with_session(|session| session.input.clear());
    }));
    let resize = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(|_e: web_sys::Event| {
        with_session(|session| session.resize());
    }));

    let listeners = [
        ("keydown", key_listener(true)),
        ("keyup", key_listener(false)),
        ("blur", blur),
        ("resize", resize),
    ];
    for (event, cb) in listeners {
        w.add_event_listener_with_callback(event, cb.as_ref().unchecked_ref())?;
        LISTENERS.with(|l| l.borrow_mut().push((event, cb)));
    }
    Ok(())
}

fn uninstall_listeners() {
    let listeners = LISTENERS.with(|l| std::mem::take(&mut *l.borrow_mut()));
    let Some(w) = window() else {
        return;
    };
    for (event, cb) in listeners {
        let _ = w.remove_event_listener_with_callback(event, cb.as_ref().unchecked_ref());
    }
}

/// Start (or restart) the raycaster on the canvas with id `canvas_id`.
///
/// `config_json` is an optional `EngineConfig` document; missing fields take
/// their defaults.
#[wasm_bindgen]
pub fn start_raycaster(canvas_id: &str, config_json: Option<String>) -> Result<(), JsValue> {
    crate::logger::init(log::LevelFilter::Info);
    let config = match config_json {
        Some(json) => EngineConfig::from_json(&json)?,
        None => EngineConfig::default(),
    };

    stop_raycaster();
    let session = Session::new(canvas_id, config)?;
    SESSION.with(|s| *s.borrow_mut() = Some(session));

    if let Err(e) = install_listeners().and_then(|_| start_loop()) {
        stop_raycaster();
        return Err(e);
    }
    log::info!("raycaster running on #{}", canvas_id);
    Ok(())
}

#[wasm_bindgen]
pub fn stop_raycaster() {
    if let Some(id) = FRAME_ID.with(|f| f.take()) {
        if let Some(w) = window() {
            let _ = w.cancel_animation_frame(id);
        }
    }
    LOOP.with(|l| *l.borrow_mut() = None);
    uninstall_listeners();

    if SESSION.with(|s| s.borrow_mut().take()).is_some() {
        log::info!("raycaster stopped");
    }
}

/// `[x, y, angle]` of the viewer, empty when nothing is running
#[wasm_bindgen]
pub fn raycaster_pose() -> js_sys::Array {
    let out = js_sys::Array::new();
    if let Some(pose) = with_session(|session| session.world.pose()) {
        out.push(&JsValue::from_f64(pose.x));
        out.push(&JsValue::from_f64(pose.y));
        out.push(&JsValue::from_f64(pose.angle));
    }
    out
}

/// Distances from the most recent frame, left to right
#[wasm_bindgen]
pub fn raycaster_distances() -> Vec<f64> {
    with_session(|session| session.last_cast.distances()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_per_column_follows_width() {
        let config = EngineConfig::default();
        assert_eq!(frame_raycast(&config, 640).ray_count, 640);
        assert_eq!(frame_raycast(&config, 0).ray_count, 1);

        let fixed = EngineConfig {
            ray_per_column: false,
            ..EngineConfig::default()
        };
        assert_eq!(frame_raycast(&fixed, 640).ray_count, 320);
    }

    #[test]
    fn test_minimap_layout() {
        assert_eq!(minimap_layout(0.0, 480, 640), None);

        let layout = minimap_layout(0.05, 400, 640).unwrap();
        assert_eq!(layout.cell_px, 20.0);
        assert_eq!(layout.ray_stride, 640 / MINIMAP_RAYS);
        assert_eq!((layout.origin_x, layout.origin_y), (MINIMAP_MARGIN, MINIMAP_MARGIN));

        assert_eq!(minimap_layout(0.05, 400, 3).unwrap().ray_stride, 1);
    }

    #[test]
    fn test_accessors_without_session() {
        assert!(raycaster_distances().is_empty());
        assert!(with_session(|s| s.world.ticks()).is_none());
    }
}
