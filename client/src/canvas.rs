use std::cell::{Cell, RefCell};
use std::rc::Rc;

use borderpaint_engine::{ClickOutcome, EditMode, MapEngine};
use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, PointerEvent, WheelEvent};

use crate::app::{
    ActiveTool, BrushColor, Commands, HoverInfo, Hovered, Language, Layers, Locales, MapCommand,
    MapStatus, MousePos, PresetEditing, PresetNames, Status,
};
use crate::canvas_surface::CanvasSurface;
use crate::data;
use crate::render_loop::RenderScheduler;

/// Quiet time after the last wheel or pinch event before the gesture counts as over.
const INTERACTION_SETTLE_MS: u32 = 140;
const KEY_ZOOM_FACTOR: f64 = 1.5;

type SharedEngine = Rc<RefCell<MapEngine>>;
type SurfacePair = (CanvasSurface, CanvasSurface);

struct ResizeBinding {
    window: web_sys::Window,
    _handler: Closure<dyn Fn()>,
}

thread_local! {
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

fn device_pixel_ratio() -> f64 {
    web_sys::window()
        .map(|w| w.device_pixel_ratio())
        .filter(|dpr| dpr.is_finite() && *dpr >= 1.0)
        .unwrap_or(1.0)
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
}

/// Tooltip contents for the engine's current hover target.
fn hover_info(engine: &MapEngine, lang: &str) -> Option<HoverInfo> {
    let id = engine.hovered()?;
    let region = engine.feature(id)?;
    Some(HoverInfo {
        id: id.to_string(),
        name: engine
            .display_name(id, lang)
            .unwrap_or(region.name.as_str())
            .to_string(),
        owner: region.owner.clone(),
        color: engine.colors().get(id).map(str::to_string),
    })
}

fn pending_count(engine: &MapEngine) -> Option<usize> {
    match engine.mode() {
        EditMode::PresetEdit { pending } => Some(pending.len()),
        EditMode::Paint => None,
    }
}

fn preset_names(engine: &MapEngine) -> Vec<(String, String)> {
    let presets = engine.presets();
    presets
        .names()
        .map(|name| (name.to_string(), presets.label(name).to_string()))
        .collect()
}

#[component]
pub fn MapCanvas() -> impl IntoView {
    let Hovered(hovered) = expect_context();
    let ActiveTool(tool) = expect_context();
    let BrushColor(brush) = expect_context();
    let Language(lang) = expect_context();
    let Layers(layers) = expect_context();
    let Status(status) = expect_context();
    let Locales(locales) = expect_context();
    let PresetNames(presets) = expect_context();
    let PresetEditing(editing) = expect_context();
    let Commands(commands) = expect_context();
    let MousePos(mouse_pos) = expect_context();

    let color_canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let lines_canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    let engine: SharedEngine = Rc::new(RefCell::new(MapEngine::default()));
    let scheduler = RenderScheduler::new();
    engine.borrow_mut().set_redraw_hook({
        let scheduler = scheduler.clone();
        move |redraw| scheduler.request(redraw)
    });

    // Cached surfaces; dropped whenever the backing stores are resized.
    let surfaces: Rc<RefCell<Option<SurfacePair>>> = Rc::new(RefCell::new(None));

    scheduler.set_render_fn({
        let engine = engine.clone();
        let surfaces = surfaces.clone();
        move || {
            let (Some(color_canvas), Some(lines_canvas)) = (
                color_canvas_ref.get_untracked(),
                lines_canvas_ref.get_untracked(),
            ) else {
                return;
            };
            let color_canvas: &HtmlCanvasElement = &color_canvas;
            let lines_canvas: &HtmlCanvasElement = &lines_canvas;

            let Some(parent) = color_canvas.parent_element() else {
                return;
            };
            let w = parent.client_width() as f64;
            let h = parent.client_height() as f64;
            if w <= 0.0 || h <= 0.0 {
                return;
            }
            let dpr = device_pixel_ratio();
            let pw = (w * dpr).round().max(1.0) as u32;
            let ph = (h * dpr).round().max(1.0) as u32;
            if color_canvas.width() != pw || color_canvas.height() != ph {
                color_canvas.set_width(pw);
                color_canvas.set_height(ph);
                lines_canvas.set_width(pw);
                lines_canvas.set_height(ph);
                // Canvas resize resets 2D context state
                surfaces.borrow_mut().take();
            }

            let Ok(mut engine) = engine.try_borrow_mut() else {
                return;
            };
            engine.resize(w, h);

            let mut slot = surfaces.borrow_mut();
            if slot.is_none() {
                let (Some(color_ctx), Some(lines_ctx)) =
                    (context_2d(color_canvas), context_2d(lines_canvas))
                else {
                    return;
                };
                *slot = Some((
                    CanvasSurface::new(color_ctx, w, h, dpr),
                    CanvasSurface::new(lines_ctx, w, h, dpr),
                ));
            }
            if let Some((color, lines)) = slot.as_mut() {
                engine.render(color, lines);
            }
        }
    });

    // Push engine state back out to the reactive UI after any mutation.
    let sync_ui = move |engine: &MapEngine| {
        let info = hover_info(engine, lang.get_untracked());
        if hovered.with_untracked(|h| *h != info) {
            hovered.set(info);
        }
        if engine.is_ready() {
            let next = MapStatus::Ready {
                regions: engine.data().regions.len(),
                colored: engine.colors().len(),
            };
            if status.with_untracked(|s| *s != next) {
                status.set(next);
            }
        }
        let pending = pending_count(engine);
        if editing.get_untracked() != pending {
            editing.set(pending);
        }
        if brush.with_untracked(|b| b != engine.current_color()) {
            brush.set(engine.current_color().to_string());
        }
    };

    // Fetch the topology first, then the optional tables.
    let load_started = Rc::new(Cell::new(false));
    Effect::new({
        let engine = engine.clone();
        let scheduler = scheduler.clone();
        move || {
            if load_started.get() || color_canvas_ref.get().is_none() {
                return;
            }
            load_started.set(true);
            let engine = engine.clone();
            let scheduler = scheduler.clone();

            wasm_bindgen_futures::spawn_local(async move {
                match data::fetch_topology().await {
                    Ok(text) => {
                        let ready = engine.borrow_mut().load_json(&text);
                        let engine_ref = engine.borrow();
                        if ready {
                            data::log_info(&format!(
                                "map loaded: {} regions, skipped layers: {:?}",
                                engine_ref.data().regions.len(),
                                engine_ref.skipped_layers()
                            ));
                            sync_ui(&engine_ref);
                        } else {
                            let reason = engine_ref
                                .load_error()
                                .map(|e| e.to_string())
                                .unwrap_or_else(|| "no regions in topology".to_string());
                            data::log_warn(&format!("map load failed: {reason}"));
                            status.set(MapStatus::Failed(reason));
                        }
                    }
                    Err(e) => {
                        data::log_warn(&format!("topology fetch failed: {e}"));
                        status.set(MapStatus::Failed(e));
                    }
                }
                scheduler.flush();

                match data::fetch_presets().await {
                    Ok(table) => {
                        let mut engine = engine.borrow_mut();
                        engine.set_presets(table);
                        presets.set(preset_names(&engine));
                    }
                    Err(e) => data::log_warn(&format!("presets unavailable: {e}")),
                }

                match data::fetch_locales().await {
                    Ok(table) => {
                        engine.borrow_mut().set_locales(table.clone());
                        locales.set(table);
                        sync_ui(&engine.borrow());
                    }
                    Err(e) => data::log_warn(&format!("locales unavailable: {e}")),
                }
            });
        }
    });

    // Toolbar state flows into the engine.
    Effect::new({
        let engine = engine.clone();
        move || {
            let t = tool.get();
            if let Ok(mut engine) = engine.try_borrow_mut() {
                engine.set_tool(t);
            }
        }
    });

    Effect::new({
        let engine = engine.clone();
        move || {
            let color = brush.get();
            if let Ok(mut engine) = engine.try_borrow_mut()
                && engine.current_color() != color
            {
                engine.set_current_color(&color);
            }
        }
    });

    Effect::new({
        let engine = engine.clone();
        let scheduler = scheduler.clone();
        move || {
            let visible = layers.get();
            if let Ok(mut engine) = engine.try_borrow_mut() {
                let mut style = engine.style().clone();
                style.show_terrain = visible.terrain;
                style.show_urban = visible.urban;
                style.show_rivers = visible.rivers;
                style.show_special_zones = visible.special_zones;
                if style != *engine.style() {
                    engine.set_style(style);
                }
            }
            scheduler.flush();
        }
    });

    Effect::new({
        let engine = engine.clone();
        move || {
            lang.track();
            if let Ok(engine) = engine.try_borrow() {
                sync_ui(&engine);
            }
        }
    });

    Effect::new({
        let engine = engine.clone();
        let scheduler = scheduler.clone();
        move || {
            commands.track();
            let queue = commands.try_update_untracked(std::mem::take).unwrap_or_default();
            if queue.is_empty() {
                return;
            }
            let Ok(mut engine) = engine.try_borrow_mut() else {
                return;
            };
            for command in queue {
                apply_command(&mut engine, command, presets);
            }
            sync_ui(&engine);
            drop(engine);
            scheduler.flush();
        }
    });

    // Window resizes change the container size; the frame body picks it up.
    Effect::new({
        let scheduler = scheduler.clone();
        move || {
            let Some(window) = web_sys::window() else {
                return;
            };
            RESIZE_BINDING.with(|slot| {
                if let Some(old) = slot.borrow_mut().take() {
                    let _ = old.window.remove_event_listener_with_callback(
                        "resize",
                        old._handler.as_ref().unchecked_ref(),
                    );
                }
            });
            let scheduler = scheduler.clone();
            let handler = Closure::<dyn Fn()>::new(move || scheduler.mark_dirty());
            if window
                .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
                .is_ok()
            {
                RESIZE_BINDING.with(|slot| {
                    *slot.borrow_mut() = Some(ResizeBinding {
                        window: window.clone(),
                        _handler: handler,
                    });
                });
            }
        }
    });

    // --- Input handlers ---

    let local_point = move |client_x: f64, client_y: f64| -> (f64, f64) {
        color_canvas_ref
            .get_untracked()
            .map(|el| {
                let rect = el.get_bounding_client_rect();
                (client_x - rect.left(), client_y - rect.top())
            })
            .unwrap_or((client_x, client_y))
    };

    // Wheel and pinch have no "up" event; a quiet period ends the gesture.
    let settle_timer: Rc<RefCell<Option<Timeout>>> = Rc::new(RefCell::new(None));
    let arm_settle = {
        let engine = engine.clone();
        let scheduler = scheduler.clone();
        let settle_timer = settle_timer.clone();
        move || {
            let engine = engine.clone();
            let scheduler = scheduler.clone();
            let timeout = Timeout::new(INTERACTION_SETTLE_MS, move || {
                if let Ok(mut engine) = engine.try_borrow_mut() {
                    engine.end_gesture();
                }
                scheduler.flush();
            });
            // Replacing the handle cancels the previous timer.
            *settle_timer.borrow_mut() = Some(timeout);
        }
    };

    let on_wheel = {
        let engine = engine.clone();
        let scheduler = scheduler.clone();
        let arm_settle = arm_settle.clone();
        move |e: WheelEvent| {
            e.prevent_default();
            let (x, y) = local_point(e.client_x() as f64, e.client_y() as f64);
            if let Ok(mut engine) = engine.try_borrow_mut() {
                engine.wheel(e.delta_y(), x, y);
            }
            scheduler.flush();
            arm_settle();
        }
    };

    let on_pointer_down = {
        let engine = engine.clone();
        move |e: PointerEvent| {
            if e.button() != 0 {
                return;
            }
            let (x, y) = local_point(e.client_x() as f64, e.client_y() as f64);
            if let Ok(mut engine) = engine.try_borrow_mut() {
                engine.pointer_down(x, y);
            }
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
            }
        }
    };

    let on_pointer_move = {
        let engine = engine.clone();
        let scheduler = scheduler.clone();
        move |e: PointerEvent| {
            let (x, y) = local_point(e.client_x() as f64, e.client_y() as f64);
            if let Ok(mut engine) = engine.try_borrow_mut() {
                if engine.pointer_move(x, y, now_ms()) {
                    sync_ui(&engine);
                }
                if engine.hovered().is_some() {
                    mouse_pos.set((e.client_x() as f64, e.client_y() as f64));
                }
            }
            scheduler.flush();
        }
    };

    let on_pointer_up = {
        let engine = engine.clone();
        let scheduler = scheduler.clone();
        move |e: PointerEvent| {
            let (x, y) = local_point(e.client_x() as f64, e.client_y() as f64);
            if let Ok(mut engine) = engine.try_borrow_mut() {
                match engine.pointer_up(x, y) {
                    Some(ClickOutcome::Missed) | None => {}
                    Some(outcome) => {
                        if let ClickOutcome::Sampled { color: None, id } = &outcome {
                            data::log_info(&format!("{id} has no color to sample"));
                        }
                        sync_ui(&engine);
                    }
                }
            }
            scheduler.flush();
        }
    };

    let on_pointer_leave = {
        let engine = engine.clone();
        let scheduler = scheduler.clone();
        move |_: PointerEvent| {
            if let Ok(mut engine) = engine.try_borrow_mut() {
                engine.pointer_leave();
                sync_ui(&engine);
            }
            scheduler.flush();
        }
    };

    let pinch_dist = Rc::new(Cell::new(0.0f64));

    let on_touch_start = {
        let pinch_dist = pinch_dist.clone();
        let engine = engine.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                // Two fingers zoom instead of dragging with the first one.
                if let Ok(mut engine) = engine.try_borrow_mut() {
                    engine.pointer_leave();
                }
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                pinch_dist.set(dx.hypot(dy));
            }
        }
    };

    let on_touch_move = {
        let pinch_dist = pinch_dist.clone();
        let engine = engine.clone();
        let scheduler = scheduler.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                let new_dist = dx.hypot(dy);
                let old_dist = pinch_dist.get();

                if old_dist > 0.0 && new_dist > 0.0 {
                    let mid_x = (t0.client_x() + t1.client_x()) as f64 / 2.0;
                    let mid_y = (t0.client_y() + t1.client_y()) as f64 / 2.0;
                    let (x, y) = local_point(mid_x, mid_y);
                    if let Ok(mut engine) = engine.try_borrow_mut() {
                        engine.zoom_by(new_dist / old_dist, x, y);
                    }
                    scheduler.flush();
                    arm_settle();
                }

                pinch_dist.set(new_dist);
            }
        }
    };

    // Two-canvas stack: fills below, lines above.
    view! {
        <div
            style="position: absolute; inset: 0; overflow: hidden;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:touchstart=on_touch_start
            on:touchmove=on_touch_move
        >
            <canvas
                node_ref=color_canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: crosshair;"
            />
            <canvas
                node_ref=lines_canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; pointer-events: none;"
            />
        </div>
    }
}

fn apply_command(
    engine: &mut MapEngine,
    command: MapCommand,
    presets: RwSignal<Vec<(String, String)>>,
) {
    match command {
        MapCommand::ClearAll => engine.clear_all(),
        MapCommand::AutoFillCountries => {
            engine.auto_fill_countries();
        }
        MapCommand::ApplyPreset(name) => {
            let color = engine.current_color().to_string();
            if engine.apply_preset(&name, &color).is_none() {
                data::log_warn(&format!("unknown preset `{name}`"));
            }
        }
        MapCommand::BeginPresetEdit => engine.begin_preset_edit(),
        MapCommand::CommitPresetEdit(name) => {
            engine.commit_preset_edit(&name);
            presets.set(preset_names(engine));
        }
        MapCommand::CancelPresetEdit => engine.cancel_preset_edit(),
        MapCommand::ResetView => engine.reset_view(),
        MapCommand::ZoomIn => zoom_centered(engine, KEY_ZOOM_FACTOR),
        MapCommand::ZoomOut => zoom_centered(engine, 1.0 / KEY_ZOOM_FACTOR),
    }
}

fn zoom_centered(engine: &mut MapEngine, factor: f64) {
    let (w, h) = engine.size();
    engine.zoom_by(factor, w / 2.0, h / 2.0);
    engine.end_gesture();
}
