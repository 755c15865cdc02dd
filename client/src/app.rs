use leptos::prelude::*;
use wasm_bindgen::JsCast;

use std::cell::RefCell;

use borderpaint_engine::{LocaleTable, Tool};

use crate::canvas::MapCanvas;

pub(crate) const DEFAULT_BRUSH: &str = "#c0392b";
pub(crate) const LANGUAGES: [&str; 2] = ["en", "zh"];

struct KeydownBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

thread_local! {
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
}

/// What the tooltip shows for the region under the pointer.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct HoverInfo {
    pub id: String,
    pub name: String,
    pub owner: Option<String>,
    pub color: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum MapStatus {
    Loading,
    Ready { regions: usize, colored: usize },
    Failed(String),
}

/// Visibility of the decorative layers; the structural lines are always drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LayerVisibility {
    pub terrain: bool,
    pub urban: bool,
    pub rivers: bool,
    pub special_zones: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            terrain: true,
            urban: true,
            rivers: true,
            special_zones: true,
        }
    }
}

/// One-shot requests from the toolbar and keyboard, drained by the canvas.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum MapCommand {
    ClearAll,
    AutoFillCountries,
    ApplyPreset(String),
    BeginPresetEdit,
    CommitPresetEdit(String),
    CancelPresetEdit,
    ResetView,
    ZoomIn,
    ZoomOut,
}

/// Newtype wrappers so each signal gets a distinct context slot.
#[derive(Clone, Copy)]
pub(crate) struct Hovered(pub RwSignal<Option<HoverInfo>>);
#[derive(Clone, Copy)]
pub(crate) struct ActiveTool(pub RwSignal<Tool>);
#[derive(Clone, Copy)]
pub(crate) struct BrushColor(pub RwSignal<String>);
#[derive(Clone, Copy)]
pub(crate) struct Language(pub RwSignal<&'static str>);
#[derive(Clone, Copy)]
pub(crate) struct Layers(pub RwSignal<LayerVisibility>);
#[derive(Clone, Copy)]
pub(crate) struct Status(pub RwSignal<MapStatus>);
#[derive(Clone, Copy)]
pub(crate) struct Locales(pub RwSignal<LocaleTable>);
/// `(name, label)` pairs of the loaded preset groups.
#[derive(Clone, Copy)]
pub(crate) struct PresetNames(pub RwSignal<Vec<(String, String)>>);
/// `Some(pending count)` while preset editing is active.
#[derive(Clone, Copy)]
pub(crate) struct PresetEditing(pub RwSignal<Option<usize>>);
#[derive(Clone, Copy)]
pub(crate) struct Commands(pub RwSignal<Vec<MapCommand>>);
#[derive(Clone, Copy)]
pub(crate) struct MousePos(pub RwSignal<(f64, f64)>);

impl Commands {
    pub(crate) fn push(&self, command: MapCommand) {
        self.0.update(|queue| queue.push(command));
    }
}

/// Root application component. Provides global reactive signals via context.
#[component]
pub fn App() -> impl IntoView {
    let hovered = Hovered(RwSignal::new(None));
    let tool = ActiveTool(RwSignal::new(Tool::Fill));
    let brush = BrushColor(RwSignal::new(DEFAULT_BRUSH.to_string()));
    let lang = Language(RwSignal::new(LANGUAGES[0]));
    let layers = Layers(RwSignal::new(LayerVisibility::default()));
    let status = Status(RwSignal::new(MapStatus::Loading));
    let locales = Locales(RwSignal::new(LocaleTable::default()));
    let presets = PresetNames(RwSignal::new(Vec::new()));
    let editing = PresetEditing(RwSignal::new(None));
    let commands = Commands(RwSignal::new(Vec::new()));
    let mouse_pos = MousePos(RwSignal::new((0.0, 0.0)));

    provide_context(hovered);
    provide_context(tool);
    provide_context(brush);
    provide_context(lang);
    provide_context(layers);
    provide_context(status);
    provide_context(locales);
    provide_context(presets);
    provide_context(editing);
    provide_context(commands);
    provide_context(mouse_pos);

    // Global keyboard shortcuts
    Effect::new(move || {
        use wasm_bindgen::prelude::*;

        let Some(window) = web_sys::window() else {
            return;
        };

        KEYDOWN_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "keydown",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });

        let handler =
            Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
                let key = e.key();
                let target_tag = e
                    .target()
                    .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
                    .map(|el| el.tag_name())
                    .unwrap_or_default();

                // Don't intercept when typing in an input
                if target_tag == "INPUT" || target_tag == "SELECT" {
                    return;
                }

                match key.as_str() {
                    "f" => tool.0.set(Tool::Fill),
                    "e" => tool.0.set(Tool::Eraser),
                    "i" => tool.0.set(Tool::Eyedropper),
                    "Escape" => {
                        if editing.0.get_untracked().is_some() {
                            commands.push(MapCommand::CancelPresetEdit);
                        }
                    }
                    "r" | "0" => commands.push(MapCommand::ResetView),
                    "+" | "=" => {
                        e.prevent_default();
                        commands.push(MapCommand::ZoomIn);
                    }
                    "-" => {
                        e.prevent_default();
                        commands.push(MapCommand::ZoomOut);
                    }
                    _ => {}
                }
            });

        if window
            .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            KEYDOWN_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(KeydownBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    view! {
        <div style="width: 100%; height: 100%; position: relative; overflow: hidden; background: #aad3df;">
            <MapCanvas />
            <Toolbar />
            <StatusBadge />
        </div>
        <Tooltip />
    }
}

fn ui_label(locales: Locales, lang: Language, key: &'static str) -> impl Fn() -> String {
    move || {
        let lang = lang.0.get();
        locales.0.with(|l| l.ui(key, lang).to_string())
    }
}

const BUTTON_STYLE: &str = "padding: 4px 8px; background: #ffffff; border: 1px solid #b8b2a6; border-radius: 4px; cursor: pointer; font: 12px system-ui, sans-serif; color: #333;";
const ACTIVE_BUTTON_STYLE: &str = "padding: 4px 8px; background: #333; border: 1px solid #333; border-radius: 4px; cursor: pointer; font: 12px system-ui, sans-serif; color: #fff;";

/// Floating controls: tools, brush color, bulk actions, presets, layers and language.
#[component]
fn Toolbar() -> impl IntoView {
    let ActiveTool(tool) = expect_context();
    let BrushColor(brush) = expect_context();
    let Language(lang) = expect_context();
    let Layers(layers) = expect_context();
    let PresetNames(presets) = expect_context();
    let PresetEditing(editing) = expect_context();
    let commands: Commands = expect_context();
    let locales: Locales = expect_context();
    let selected_preset: RwSignal<String> = RwSignal::new(String::new());
    let new_preset_name: RwSignal<String> = RwSignal::new(String::new());

    let tool_buttons = [
        (Tool::Fill, "fill"),
        (Tool::Eraser, "eraser"),
        (Tool::Eyedropper, "eyedropper"),
    ]
    .into_iter()
    .map(|(t, key)| {
        view! {
            <button
                style=move || if tool.get() == t { ACTIVE_BUTTON_STYLE } else { BUTTON_STYLE }
                on:click=move |_| tool.set(t)
            >
                {ui_label(locales, Language(lang), key)}
            </button>
        }
    })
    .collect_view();

    let layer_toggle = |key: &'static str, get: fn(&LayerVisibility) -> bool, flip: fn(&mut LayerVisibility)| {
        view! {
            <label style="display: inline-flex; align-items: center; gap: 3px; font: 12px system-ui, sans-serif;">
                <input
                    type="checkbox"
                    prop:checked=move || layers.with(get)
                    on:change=move |_| layers.update(flip)
                />
                {ui_label(locales, Language(lang), key)}
            </label>
        }
    };

    view! {
        <div style="position: absolute; top: 12px; left: 12px; z-index: 10; display: flex; flex-wrap: wrap; gap: 6px; align-items: center; max-width: calc(100% - 24px); padding: 8px; background: rgba(255,255,255,0.92); border: 1px solid #b8b2a6; border-radius: 6px; box-shadow: 0 2px 8px rgba(0,0,0,0.15);">
            {tool_buttons}
            <input
                type="color"
                prop:value=move || brush.get()
                on:input=move |ev| brush.set(event_target_value(&ev))
            />
            <button style=BUTTON_STYLE on:click=move |_| commands.push(MapCommand::AutoFillCountries)>
                {ui_label(locales, Language(lang), "auto_fill")}
            </button>
            <button style=BUTTON_STYLE on:click=move |_| commands.push(MapCommand::ClearAll)>
                {ui_label(locales, Language(lang), "clear_all")}
            </button>
            {move || {
                let names = presets.get();
                (!names.is_empty()).then(|| {
                    let options = names
                        .into_iter()
                        .map(|(name, label)| view! { <option value=name>{label}</option> })
                        .collect_view();
                    view! {
                        <select on:change=move |ev| selected_preset.set(event_target_value(&ev))>
                            <option value="">"-"</option>
                            {options}
                        </select>
                        <button
                            style=BUTTON_STYLE
                            on:click=move |_| {
                                let name = selected_preset.get_untracked();
                                if !name.is_empty() {
                                    commands.push(MapCommand::ApplyPreset(name));
                                }
                            }
                        >
                            {ui_label(locales, Language(lang), "apply_preset")}
                        </button>
                    }
                })
            }}
            {move || match editing.get() {
                None => view! {
                    <button style=BUTTON_STYLE on:click=move |_| commands.push(MapCommand::BeginPresetEdit)>
                        {ui_label(locales, Language(lang), "edit_preset")}
                    </button>
                }
                .into_any(),
                Some(pending) => view! {
                    <input
                        type="text"
                        placeholder="preset name"
                        style="width: 110px; font: 12px system-ui, sans-serif;"
                        prop:value=move || new_preset_name.get()
                        on:input=move |ev| new_preset_name.set(event_target_value(&ev))
                    />
                    <span style="font: 12px system-ui, sans-serif; color: #b35c00;">{format!("{pending}")}</span>
                    <button
                        style=ACTIVE_BUTTON_STYLE
                        on:click=move |_| {
                            let name = new_preset_name.get_untracked().trim().to_string();
                            if !name.is_empty() {
                                commands.push(MapCommand::CommitPresetEdit(name));
                                new_preset_name.set(String::new());
                            }
                        }
                    >
                        {ui_label(locales, Language(lang), "save_preset")}
                    </button>
                    <button style=BUTTON_STYLE on:click=move |_| commands.push(MapCommand::CancelPresetEdit)>
                        {ui_label(locales, Language(lang), "cancel")}
                    </button>
                }
                .into_any(),
            }}
            {layer_toggle("terrain", |l| l.terrain, |l| l.terrain = !l.terrain)}
            {layer_toggle("urban", |l| l.urban, |l| l.urban = !l.urban)}
            {layer_toggle("rivers", |l| l.rivers, |l| l.rivers = !l.rivers)}
            {layer_toggle("special_zones", |l| l.special_zones, |l| l.special_zones = !l.special_zones)}
            <select on:change=move |ev| {
                let value = event_target_value(&ev);
                if let Some(code) = LANGUAGES.into_iter().find(|code| *code == value) {
                    lang.set(code);
                }
            }>
                {LANGUAGES
                    .into_iter()
                    .map(|code| view! { <option value=code selected=move || lang.get() == code>{code}</option> })
                    .collect_view()}
            </select>
            <button style=BUTTON_STYLE on:click=move |_| commands.push(MapCommand::ResetView)>
                {ui_label(locales, Language(lang), "reset_view")}
            </button>
        </div>
    }
}

#[component]
fn StatusBadge() -> impl IntoView {
    let Status(status) = expect_context();

    view! {
        <div style="position: absolute; bottom: 12px; left: 12px; z-index: 10; padding: 4px 8px; background: rgba(255,255,255,0.85); border-radius: 4px; font: 11px 'JetBrains Mono', monospace; color: #444;">
            {move || match status.get() {
                MapStatus::Loading => "loading map…".to_string(),
                MapStatus::Ready { regions, colored } => format!("{colored} / {regions} regions colored"),
                MapStatus::Failed(reason) => format!("map unavailable: {reason}"),
            }}
        </div>
    }
}

/// Tooltip that follows the mouse cursor when hovering a region.
#[component]
fn Tooltip() -> impl IntoView {
    let Hovered(hovered) = expect_context();
    let MousePos(mouse_pos) = expect_context();

    view! {
        {move || {
            let Some(info) = hovered.get() else {
                return view! { <div style="display:none;" /> }.into_any();
            };
            let (x, y) = mouse_pos.get();
            let swatch = info.color.clone().unwrap_or_else(|| "transparent".to_string());
            view! {
                <div
                    style:left=format!("{}px", x + 16.0)
                    style:top=format!("{}px", y - 8.0)
                    style="position: fixed; pointer-events: none; z-index: 100; background: #ffffff; border: 1px solid #b8b2a6; border-radius: 6px; overflow: hidden; box-shadow: 0 4px 16px rgba(0,0,0,0.2); max-width: 240px; display: flex; flex-direction: row;"
                >
                    <div style=format!("width: 4px; flex-shrink: 0; background: {swatch};") />
                    <div style="padding: 6px 10px; font: 12px system-ui, sans-serif; color: #222;">
                        <div style="font-weight: 700;">{info.name.clone()}</div>
                        <div style="color: #777; font-family: 'JetBrains Mono', monospace; font-size: 11px;">
                            {match info.owner.clone() {
                                Some(owner) => format!("{} · {owner}", info.id),
                                None => info.id.clone(),
                            }}
                        </div>
                    </div>
                </div>
            }
            .into_any()
        }}
    }
}
