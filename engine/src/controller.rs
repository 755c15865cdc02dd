use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::colors::{country_color, normalize_color};
use crate::render::{InvalidationReason, MapEngine, Redraw};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Tool {
    #[default]
    Fill,
    Eraser,
    Eyedropper,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum EditMode {
    #[default]
    Paint,
    /// Clicks toggle membership in `pending` instead of touching the color map.
    PresetEdit { pending: BTreeSet<String> },
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Phase {
    #[default]
    Idle,
    /// A pan or zoom is in flight.
    Gesture,
}

/// Minimum spacing between processed hover moves, independent of frame pacing.
#[derive(Clone, Copy, Debug, Default)]
pub struct HoverThrottle {
    last_ms: Option<f64>,
}

impl HoverThrottle {
    pub fn accept(&mut self, now_ms: f64, interval_ms: f64) -> bool {
        if let Some(last) = self.last_ms
            && now_ms - last < interval_ms
            && now_ms >= last
        {
            return false;
        }
        self.last_ms = Some(now_ms);
        true
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Drag {
    origin: (f64, f64),
    last: (f64, f64),
    panning: bool,
}

#[derive(Clone, Debug)]
pub struct Interaction {
    pub(crate) phase: Phase,
    pub(crate) drag: Option<Drag>,
    pub(crate) tool: Tool,
    pub(crate) mode: EditMode,
    pub(crate) current_color: String,
    pub(crate) hover: HoverThrottle,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            drag: None,
            tool: Tool::Fill,
            mode: EditMode::Paint,
            current_color: "#c0392b".to_string(),
            hover: HoverThrottle::default(),
        }
    }
}

/// What a click on the map did.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClickOutcome {
    Missed,
    Painted(String),
    Erased(String),
    Sampled { id: String, color: Option<String> },
    Toggled { id: String, pending: bool },
}

impl MapEngine {
    /// Every color mutation ends here. The `ColorState` setters already dropped the
    /// hash memo if content changed; a no-op keeps it and only requests a frame.
    fn colors_changed(&mut self, changed: usize) {
        if changed > 0 {
            debug!(changed, colored = self.colors.len(), "color map updated");
        }
        self.invalidate(InvalidationReason::Colors);
    }

    pub fn paint(&mut self, id: &str, color: &str) -> bool {
        if !self.index.contains(id) {
            return false;
        }
        let changed = self.colors.set(id, color);
        self.colors_changed(usize::from(changed));
        changed
    }

    pub fn erase(&mut self, id: &str) -> bool {
        let changed = self.colors.remove(id);
        self.colors_changed(usize::from(changed));
        changed
    }

    pub fn sample(&self, id: &str) -> Option<String> {
        self.colors.get(id).map(str::to_string)
    }

    pub fn clear_all(&mut self) {
        let count = self.colors.len();
        self.colors.clear();
        self.colors_changed(count);
    }

    /// Paint every region whose owner code appears in `palette`. Returns how many changed.
    pub fn apply_country_palette(&mut self, palette: &HashMap<String, String>) -> usize {
        let mut changed = 0;
        for region in &self.data.regions {
            let Some(color) = region.owner.as_ref().and_then(|owner| palette.get(owner)) else {
                continue;
            };
            if self.colors.set(&region.id, color) {
                changed += 1;
            }
        }
        self.colors_changed(changed);
        changed
    }

    /// The fill used for an owner code: an override if one was set, else the hashed color.
    pub fn country_color(&self, code: &str) -> String {
        self.country_colors
            .get(code)
            .cloned()
            .unwrap_or_else(|| country_color(code))
    }

    pub fn set_country_color(&mut self, code: &str, color: &str) {
        self.country_colors
            .insert(code.to_string(), normalize_color(color));
    }

    pub fn reset_country_colors(&mut self) {
        self.country_colors.clear();
    }

    /// Color every owned region in its country's color.
    pub fn auto_fill_countries(&mut self) -> usize {
        let owners: BTreeSet<String> = self
            .data
            .regions
            .iter()
            .filter_map(|r| r.owner.clone())
            .collect();
        let palette: HashMap<String, String> = owners
            .into_iter()
            .map(|code| {
                let color = self.country_color(&code);
                (code, color)
            })
            .collect();
        let changed = self.apply_country_palette(&palette);
        info!(countries = palette.len(), changed, "auto-filled countries");
        changed
    }

    /// Paint every region of a named preset group. `None` if the preset is unknown.
    pub fn apply_preset(&mut self, name: &str, color: &str) -> Option<usize> {
        let ids = self.presets.group(name)?.to_vec();
        let mut changed = 0;
        for id in ids.iter().filter(|id| self.index.contains(id)) {
            if self.colors.set(id, color) {
                changed += 1;
            }
        }
        self.colors_changed(changed);
        Some(changed)
    }

    pub fn tool(&self) -> Tool {
        self.interaction.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.interaction.tool = tool;
    }

    pub fn current_color(&self) -> &str {
        &self.interaction.current_color
    }

    pub fn set_current_color(&mut self, color: &str) {
        self.interaction.current_color = normalize_color(color);
    }

    pub fn mode(&self) -> &EditMode {
        &self.interaction.mode
    }

    pub fn begin_preset_edit(&mut self) {
        self.interaction.mode = EditMode::PresetEdit {
            pending: BTreeSet::new(),
        };
        self.invalidate(InvalidationReason::Style);
    }

    /// Flip pending membership. Returns whether `id` is pending afterwards;
    /// `false` outside preset editing or for unknown ids.
    pub fn toggle_pending(&mut self, id: &str) -> bool {
        if !self.index.contains(id) {
            return false;
        }
        let EditMode::PresetEdit { pending } = &mut self.interaction.mode else {
            return false;
        };
        let now_pending = if pending.remove(id) {
            false
        } else {
            pending.insert(id.to_string());
            true
        };
        self.invalidate(InvalidationReason::Style);
        now_pending
    }

    /// Store the pending set as preset `name` and leave editing. Returns the group size.
    pub fn commit_preset_edit(&mut self, name: &str) -> usize {
        let mode = std::mem::take(&mut self.interaction.mode);
        let EditMode::PresetEdit { pending } = mode else {
            return 0;
        };
        let count = self.presets.insert_group(name, pending);
        info!(preset = name, regions = count, "preset saved");
        self.invalidate(InvalidationReason::Style);
        count
    }

    pub fn cancel_preset_edit(&mut self) {
        if matches!(self.interaction.mode, EditMode::PresetEdit { .. }) {
            self.interaction.mode = EditMode::Paint;
            self.invalidate(InvalidationReason::Style);
        }
    }

    /// Resolve the region under the pointer and apply the current tool or mode.
    pub fn click(&mut self, sx: f64, sy: f64) -> ClickOutcome {
        let Some(id) = self.query(sx, sy).map(str::to_string) else {
            return ClickOutcome::Missed;
        };

        if matches!(self.interaction.mode, EditMode::PresetEdit { .. }) {
            let pending = self.toggle_pending(&id);
            return ClickOutcome::Toggled { id, pending };
        }

        match self.interaction.tool {
            Tool::Fill => {
                let color = self.interaction.current_color.clone();
                self.paint(&id, &color);
                ClickOutcome::Painted(id)
            }
            Tool::Eraser => {
                self.erase(&id);
                ClickOutcome::Erased(id)
            }
            Tool::Eyedropper => {
                let color = self.sample(&id);
                if let Some(color) = &color {
                    self.set_current_color(color);
                }
                ClickOutcome::Sampled { id, color }
            }
        }
    }

    pub fn pointer_down(&mut self, sx: f64, sy: f64) {
        if !self.is_ready() {
            return;
        }
        self.interaction.drag = Some(Drag {
            origin: (sx, sy),
            last: (sx, sy),
            panning: false,
        });
    }

    /// Pan while a button is held; otherwise track hover, throttled. Returns whether
    /// the hovered region changed.
    pub fn pointer_move(&mut self, sx: f64, sy: f64, now_ms: f64) -> bool {
        if !self.is_ready() {
            return false;
        }

        if let Some(mut drag) = self.interaction.drag {
            let (ox, oy) = drag.origin;
            let slop = self.config.click_slop_px;
            if !drag.panning && (sx - ox).hypot(sy - oy) > slop {
                drag.panning = true;
                self.interaction.phase = Phase::Gesture;
            }
            if drag.panning {
                self.transform.pan(sx - drag.last.0, sy - drag.last.1);
                drag.last = (sx, sy);
                self.interaction.drag = Some(drag);
                self.invalidate(InvalidationReason::Viewport);
            }
            return false;
        }

        if !self
            .interaction
            .hover
            .accept(now_ms, self.config.hover_interval_ms)
        {
            return false;
        }
        let hovered = self.query(sx, sy).map(str::to_string);
        self.set_hovered(hovered)
    }

    /// Finish a press. A press that never left the slop radius is a click.
    pub fn pointer_up(&mut self, sx: f64, sy: f64) -> Option<ClickOutcome> {
        let drag = self.interaction.drag.take()?;
        if drag.panning {
            self.end_gesture();
            None
        } else {
            Some(self.click(sx, sy))
        }
    }

    pub fn pointer_leave(&mut self) {
        let was_panning = self.interaction.drag.take().is_some_and(|d| d.panning);
        self.interaction.hover.reset();
        self.set_hovered(None);
        if was_panning {
            self.end_gesture();
        }
    }

    /// Wheel zoom around the cursor. The host calls [`MapEngine::end_gesture`] once the
    /// wheel has settled.
    pub fn wheel(&mut self, delta: f64, sx: f64, sy: f64) {
        if !self.is_ready() {
            return;
        }
        self.interaction.phase = Phase::Gesture;
        if self
            .transform
            .wheel(delta, self.config.zoom_sensitivity, sx, sy)
        {
            self.invalidate(InvalidationReason::Viewport);
        }
    }

    /// Pinch or programmatic zoom by `factor` around a screen point.
    pub fn zoom_by(&mut self, factor: f64, sx: f64, sy: f64) {
        if !self.is_ready() {
            return;
        }
        self.interaction.phase = Phase::Gesture;
        if self.transform.zoom_at(factor, sx, sy) {
            self.invalidate(InvalidationReason::Viewport);
        }
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if !self.is_ready() {
            return;
        }
        self.interaction.phase = Phase::Gesture;
        self.transform.pan(dx, dy);
        self.invalidate(InvalidationReason::Viewport);
    }

    /// Leave the gesture phase and ask for one full-quality frame right away.
    pub fn end_gesture(&mut self) {
        if self.interaction.phase == Phase::Idle {
            return;
        }
        self.interaction.phase = Phase::Idle;
        self.hit_dirty = true;
        self.request(Redraw::Immediate);
    }

    pub fn reset_view(&mut self) {
        self.transform.reset();
        self.invalidate(InvalidationReason::Viewport);
    }

    fn set_hovered(&mut self, hovered: Option<String>) -> bool {
        if hovered == self.hovered {
            return false;
        }
        self.hovered = hovered;
        self.invalidate(InvalidationReason::Hover);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::render::tests::{engine, screen};

    #[test]
    fn paint_erase_sample() {
        let mut engine = engine();
        assert!(engine.paint("A", "#FF0000"));
        assert_eq!(engine.sample("A").as_deref(), Some("#ff0000"));
        assert!(!engine.paint("A", "#ff0000"));
        assert!(!engine.paint("nope", "#ff0000"), "unknown ids are ignored");

        assert!(engine.erase("A"));
        assert_eq!(engine.sample("A"), None);
        assert!(!engine.erase("A"));
    }

    #[test]
    fn three_triangle_scenario() {
        let mut engine = engine();
        engine.paint("A", "#111");
        engine.paint("B", "#111");

        let dynamic = engine.borders().dynamic_borders(engine.colors());
        assert!(dynamic.contains(&1), "B|C shows");
        assert!(!dynamic.contains(&0), "A|B merges");
        assert_eq!(&*engine.borders().coastlines(), &[2, 3, 4]);
    }

    #[test]
    fn dynamic_border_follows_paint_and_ignores_no_ops() {
        let mut engine = engine();
        engine.paint("A", "#00ff00");
        let first = engine.borders().dynamic_borders(engine.colors());

        engine.paint("B", "#00ff00");
        let second = engine.borders().dynamic_borders(engine.colors());
        assert!(!Rc::ptr_eq(&first, &second));
        assert_ne!(&*first, &*second);

        engine.paint("B", "#00ff00");
        let third = engine.borders().dynamic_borders(engine.colors());
        assert!(Rc::ptr_eq(&second, &third));
    }

    #[test]
    fn no_op_mutations_keep_the_hash_memo() {
        let mut engine = engine();
        engine.paint("A", "#00ff00");
        engine.colors().content_hash();
        assert!(engine.colors().is_hash_memoized());

        assert!(!engine.paint("A", "#00ff00"));
        assert!(!engine.erase("C"));
        assert!(engine.colors().is_hash_memoized());

        assert!(engine.paint("B", "#00ff00"));
        assert!(!engine.colors().is_hash_memoized());
    }

    #[test]
    fn external_edits_are_picked_up_after_invalidation() {
        let mut engine = engine();
        let before = engine.borders().dynamic_borders(engine.colors());
        engine
            .colors_mut()
            .map_mut()
            .insert("B".into(), "#ff0000".into());
        engine
            .colors_mut()
            .map_mut()
            .insert("C".into(), "#ff0000".into());
        engine.invalidate_border_cache();

        let after = engine.borders().dynamic_borders(engine.colors());
        assert!(before.contains(&1));
        assert!(!after.contains(&1));
    }

    #[test]
    fn every_mutation_requests_a_frame() {
        let mut engine = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        engine.set_redraw_hook(move |r| sink.borrow_mut().push(r));

        engine.paint("A", "#123456");
        engine.erase("A");
        engine.clear_all();
        engine.apply_country_palette(&HashMap::new());
        assert_eq!(seen.borrow().len(), 4);
        assert!(seen.borrow().iter().all(|r| *r == Redraw::Immediate));
    }

    #[test]
    fn country_helpers() {
        let mut engine = engine();
        assert_eq!(engine.auto_fill_countries(), 2, "C has no owner code");
        assert_eq!(engine.sample("A"), Some(engine.country_color("AA")));
        assert_eq!(engine.sample("C"), None);

        engine.set_country_color("AA", "#ABCDEF");
        engine.auto_fill_countries();
        assert_eq!(engine.sample("A").as_deref(), Some("#abcdef"));

        engine.reset_country_colors();
        assert_eq!(engine.country_color("AA"), country_color("AA"));

        let palette = HashMap::from([("BB".to_string(), "#000000".to_string())]);
        assert_eq!(engine.apply_country_palette(&palette), 1);
        assert_eq!(engine.sample("B").as_deref(), Some("#000000"));

        engine.clear_all();
        assert!(engine.colors().is_empty());
    }

    #[test]
    fn presets_apply_and_edit() {
        let mut engine = engine();
        engine.set_presets(
            crate::tables::PresetTable::from_json(r#"{"groups": {"west": ["A", "B", "ZZ"]}}"#)
                .expect("presets parse"),
        );
        assert_eq!(engine.apply_preset("west", "#222222"), Some(2));
        assert_eq!(engine.apply_preset("east", "#222222"), None);

        engine.begin_preset_edit();
        let (sx, sy) = screen(&engine, 3.0, 0.3);
        assert_eq!(
            engine.click(sx, sy),
            ClickOutcome::Toggled {
                id: "C".into(),
                pending: true
            }
        );
        assert_eq!(engine.sample("C"), None, "editing never paints");
        assert!(engine.toggle_pending("B"));
        assert!(!engine.toggle_pending("B"));
        assert!(engine.toggle_pending("A"));

        assert_eq!(engine.commit_preset_edit("mine"), 2);
        assert_eq!(*engine.mode(), EditMode::Paint);
        assert_eq!(engine.presets().group("mine").map(<[String]>::len), Some(2));

        engine.begin_preset_edit();
        engine.toggle_pending("A");
        engine.cancel_preset_edit();
        assert_eq!(*engine.mode(), EditMode::Paint);
        assert!(!engine.toggle_pending("A"));
    }

    #[test]
    fn click_dispatches_on_tool() {
        let mut engine = engine();
        let (sx, sy) = screen(&engine, 1.0, 0.3);

        engine.set_current_color("#0a0a0a");
        assert_eq!(engine.click(sx, sy), ClickOutcome::Painted("A".into()));
        assert_eq!(engine.sample("A").as_deref(), Some("#0a0a0a"));

        engine.set_current_color("#ffffff");
        engine.set_tool(Tool::Eyedropper);
        engine.click(sx, sy);
        assert_eq!(engine.current_color(), "#0a0a0a");

        engine.set_tool(Tool::Eraser);
        assert_eq!(engine.click(sx, sy), ClickOutcome::Erased("A".into()));
        assert_eq!(engine.sample("A"), None);

        assert_eq!(engine.click(-5000.0, -5000.0), ClickOutcome::Missed);
    }

    #[test]
    fn drag_pans_and_short_press_clicks() {
        let mut engine = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        engine.set_redraw_hook(move |r| sink.borrow_mut().push(r));

        let (sx, sy) = screen(&engine, 1.0, 0.3);
        let before = *engine.transform();
        engine.pointer_down(sx, sy);
        engine.pointer_move(sx + 2.0, sy, 0.0);
        assert_eq!(*engine.transform(), before, "inside the slop radius nothing moves");
        assert!(matches!(
            engine.pointer_up(sx + 2.0, sy),
            Some(ClickOutcome::Painted(ref id)) if id == "A"
        ));

        seen.borrow_mut().clear();
        engine.pointer_down(sx, sy);
        for step in 1..=5 {
            engine.pointer_move(sx + 10.0 * step as f64, sy, step as f64);
        }
        assert!((engine.transform().translate_x - 50.0).abs() < 1e-9);
        assert_eq!(engine.quality(), crate::render::RenderQuality::Interactive);
        assert_eq!(*seen.borrow(), [Redraw::NextFrame], "one frame per animation frame");

        assert_eq!(engine.pointer_up(sx + 50.0, sy), None);
        assert_eq!(seen.borrow().last(), Some(&Redraw::Immediate));
        assert_eq!(engine.quality(), crate::render::RenderQuality::Full);
    }

    #[test]
    fn hover_is_throttled_and_tracked() {
        let mut engine = engine();
        let (ax, ay) = screen(&engine, 1.0, 0.3);
        let (cx, cy) = screen(&engine, 3.0, 0.3);

        assert!(engine.pointer_move(ax, ay, 100.0));
        assert_eq!(engine.hovered(), Some("A"));
        assert!(!engine.pointer_move(cx, cy, 105.0), "inside the hover interval");
        assert_eq!(engine.hovered(), Some("A"));
        assert!(engine.pointer_move(cx, cy, 200.0));
        assert_eq!(engine.hovered(), Some("C"));

        engine.pointer_leave();
        assert_eq!(engine.hovered(), None);
    }

    #[test]
    fn wheel_zoom_settles_with_a_full_frame() {
        let mut engine = engine();
        let (sx, sy) = screen(&engine, 2.0, 0.7);
        engine.wheel(-300.0, sx, sy);
        assert!(engine.transform().scale > 1.0);
        assert_eq!(engine.query(sx, sy), Some("B"));
        assert_eq!(engine.quality(), crate::render::RenderQuality::Interactive);

        engine.end_gesture();
        assert_eq!(engine.quality(), crate::render::RenderQuality::Full);
    }
}
