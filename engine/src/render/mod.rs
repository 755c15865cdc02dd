pub mod hit;
pub mod scene;
pub mod style;
pub mod surface;

use std::collections::{BTreeMap, HashMap};

use geo::{BoundingRect, Contains, Coord, CoordsIter, Point, Rect};
use tracing::{debug, error, info};

use crate::colors::{ColorState, hex, key_to_rgb};
use crate::config::EngineConfig;
use crate::controller::{EditMode, Interaction, Phase};
use crate::error::LoadError;
use crate::index::RegionIndex;
use crate::loader;
use crate::mesh::BorderCache;
use crate::projection::Projection;
use crate::region::{MapData, Region};
use crate::spatial::{Bounds, SpatialIndex};
use crate::tables::{LocaleTable, PresetTable};
use crate::topology::Topology;
use crate::viewport::ZoomTransform;

pub use hit::HitRaster;
pub use scene::{Scene, Shape};
pub use style::RenderStyle;
pub use surface::{FillStyle, LineStyle, PlanePath, Surface};

/// What changed since the last frame.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum InvalidationReason {
    Dataset,
    Resize,
    Colors,
    Viewport,
    Style,
    Hover,
}

/// How soon the host should call [`MapEngine::render`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Redraw {
    /// Coalesce into the next animation frame.
    NextFrame,
    /// Render now; the frame must not be an under-sampled intermediate.
    Immediate,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RenderQuality {
    #[default]
    Full,
    /// Used while a gesture is in flight: larger culling threshold, no terrain or urban shading.
    Interactive,
}

/// Per-frame counters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameMetrics {
    pub quality: RenderQuality,
    pub regions_drawn: u32,
    pub regions_culled: u32,
    pub colored_drawn: u32,
    pub border_arcs: u32,
    pub draw_calls: u32,
}

/// Lets at most one animation-frame request be outstanding.
#[derive(Debug, Default)]
pub struct FrameGate {
    pending: bool,
}

impl FrameGate {
    /// Returns `true` when the host has to schedule a new frame.
    pub fn request(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    pub fn complete(&mut self) {
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

type RedrawHook = Box<dyn FnMut(Redraw)>;

/// The single owner of map state: data, derived caches, color map, zoom and interaction.
///
/// Hosts hold one of these, feed it events and call [`MapEngine::render`] when the
/// redraw hook asks for it.
pub struct MapEngine {
    pub(crate) config: EngineConfig,
    pub(crate) style: RenderStyle,
    pub(crate) data: MapData,
    pub(crate) index: RegionIndex,
    pub(crate) spatial: SpatialIndex,
    pub(crate) scene: Scene,
    pub(crate) borders: BorderCache,
    pub(crate) projection: Projection,
    pub(crate) transform: ZoomTransform,
    pub(crate) size: (f64, f64),
    pub(crate) colors: ColorState,
    pub(crate) hovered: Option<String>,
    pub(crate) hit: HitRaster,
    pub(crate) hit_dirty: bool,
    pub(crate) gate: FrameGate,
    pub(crate) interaction: Interaction,
    pub(crate) presets: PresetTable,
    pub(crate) locales: LocaleTable,
    pub(crate) country_colors: HashMap<String, String>,
    pub(crate) load_error: Option<LoadError>,
    pub(crate) skipped_layers: Vec<String>,
    redraw: Option<RedrawHook>,
}

impl std::fmt::Debug for MapEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapEngine")
            .field("regions", &self.data.regions.len())
            .field("colored", &self.colors.len())
            .field("size", &self.size)
            .field("transform", &self.transform)
            .field("hovered", &self.hovered)
            .finish_non_exhaustive()
    }
}

impl Default for MapEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), RenderStyle::default())
    }
}

impl MapEngine {
    pub fn new(config: EngineConfig, style: RenderStyle) -> Self {
        Self {
            projection: Projection::new(config.projection),
            transform: ZoomTransform::new(config.min_scale, config.max_scale),
            interaction: Interaction::default(),
            config,
            style,
            data: MapData::default(),
            index: RegionIndex::default(),
            spatial: SpatialIndex::default(),
            scene: Scene::default(),
            borders: BorderCache::default(),
            size: (0.0, 0.0),
            colors: ColorState::default(),
            hovered: None,
            hit: HitRaster::default(),
            hit_dirty: true,
            gate: FrameGate::default(),
            presets: PresetTable::default(),
            locales: LocaleTable::default(),
            country_colors: HashMap::new(),
            load_error: None,
            skipped_layers: Vec::new(),
            redraw: None,
        }
    }

    /// Install the callback that asks the host for a frame.
    pub fn set_redraw_hook(&mut self, hook: impl FnMut(Redraw) + 'static) {
        self.redraw = Some(Box::new(hook));
    }

    /// Replace the dataset. Colors, hover and zoom are reset; static border caches
    /// are rebuilt. Returns whether the interactive layer is usable.
    pub fn load(&mut self, topology: &Topology) -> bool {
        let report = loader::load(topology, &self.config.layers);
        self.data = report.data;
        self.load_error = report.error;
        self.skipped_layers = report.skipped_layers;

        self.index = RegionIndex::build(&self.data.regions);
        self.borders = BorderCache::new(&self.data.regions, self.data.arcs.len());
        self.colors = ColorState::default();
        self.hovered = None;
        self.interaction = Interaction::default();
        self.transform = ZoomTransform::new(self.config.min_scale, self.config.max_scale);
        self.refit();
        self.invalidate(InvalidationReason::Dataset);
        self.is_ready()
    }

    /// Parse and load a topology document. Parse failures are logged and kept as the load error.
    pub fn load_json(&mut self, text: &str) -> bool {
        match Topology::from_json(text) {
            Ok(topology) => self.load(&topology),
            Err(err) => {
                error!(error = %err, "topology document rejected");
                self.load_error = Some(err);
                false
            }
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        let (width, height) = (width.max(0.0), height.max(0.0));
        if (width, height) == self.size {
            return;
        }
        self.size = (width, height);
        self.hit.resize(width as usize, height as usize);
        self.refit();
        self.invalidate(InvalidationReason::Resize);
    }

    /// Fit the projection to the data extent and rebuild everything that lives in
    /// the projected plane.
    fn refit(&mut self) {
        let (width, height) = self.size;
        let extent = data_extent(&self.data);

        if let Some(extent) = extent
            && width > 0.0
            && height > 0.0
        {
            self.projection
                .fit_extent(extent, width, height, self.config.fit_padding);
        }
        self.scene = Scene::build(&self.data, &self.projection);
        self.spatial = SpatialIndex::build(&self.data.regions, &self.projection);
        debug!(
            indexed = self.spatial.len(),
            scale = self.projection.scale,
            "projection refit"
        );
    }

    pub fn is_ready(&self) -> bool {
        self.data.is_ready()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: RenderStyle) {
        if style != self.style {
            self.style = style;
            self.invalidate(InvalidationReason::Style);
        }
    }

    pub fn data(&self) -> &MapData {
        &self.data
    }

    pub fn index(&self) -> &RegionIndex {
        &self.index
    }

    pub fn borders(&self) -> &BorderCache {
        &self.borders
    }

    pub fn colors(&self) -> &ColorState {
        &self.colors
    }

    /// Mutable color map for callers that edit it outside the paint helpers.
    /// Follow up with [`MapEngine::invalidate_border_cache`].
    pub fn colors_mut(&mut self) -> &mut ColorState {
        &mut self.colors
    }

    pub fn transform(&self) -> &ZoomTransform {
        &self.transform
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn size(&self) -> (f64, f64) {
        self.size
    }

    pub fn load_error(&self) -> Option<&LoadError> {
        self.load_error.as_ref()
    }

    pub fn skipped_layers(&self) -> &[String] {
        &self.skipped_layers
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn feature(&self, id: &str) -> Option<&Region> {
        self.index.feature(&self.data.regions, id)
    }

    /// Localized region name, or the raw name without a translation.
    pub fn display_name(&self, id: &str, lang: &str) -> Option<&str> {
        self.feature(id)
            .map(|region| self.locales.geo_name(&region.name, lang))
    }

    pub fn presets(&self) -> &PresetTable {
        &self.presets
    }

    pub fn set_presets(&mut self, presets: PresetTable) {
        info!(groups = presets.len(), "preset table loaded");
        self.presets = presets;
    }

    pub fn locales(&self) -> &LocaleTable {
        &self.locales
    }

    pub fn set_locales(&mut self, locales: LocaleTable) {
        self.locales = locales;
    }

    /// Region under a screen point: undo zoom and projection, narrow with the
    /// spatial index, then run an exact point-in-polygon test per candidate.
    pub fn query(&self, sx: f64, sy: f64) -> Option<&str> {
        if !self.is_ready() {
            return None;
        }
        let (px, py) = self.transform.invert(sx, sy);
        let coord = self.projection.invert(px, py)?;
        let point = Point::from(coord);
        self.spatial
            .query(px, py)
            .into_iter()
            .filter_map(|slot| self.data.regions.get(slot))
            .find(|region| region.geometry.contains(&point))
            .map(|region| region.id.as_str())
    }

    /// Required whenever the color map changed outside the paint, erase and bulk helpers.
    pub fn invalidate_border_cache(&mut self) {
        // Dropping the hash memo makes the next border lookup re-check the content.
        self.colors.map_mut();
        self.invalidate(InvalidationReason::Colors);
    }

    pub(crate) fn invalidate(&mut self, reason: InvalidationReason) {
        if reason != InvalidationReason::Viewport {
            debug!(?reason, "invalidated");
        }
        self.hit_dirty = true;
        let redraw = match self.interaction.phase {
            Phase::Gesture if reason == InvalidationReason::Viewport => {
                if !self.gate.request() {
                    return;
                }
                Redraw::NextFrame
            }
            _ => Redraw::Immediate,
        };
        self.request(redraw);
    }

    pub(crate) fn request(&mut self, redraw: Redraw) {
        if let Some(hook) = self.redraw.as_mut() {
            hook(redraw);
        }
    }

    pub fn quality(&self) -> RenderQuality {
        match self.interaction.phase {
            Phase::Gesture => RenderQuality::Interactive,
            Phase::Idle => RenderQuality::Full,
        }
    }

    fn min_area(&self, quality: RenderQuality) -> f64 {
        match quality {
            RenderQuality::Full => self.config.min_draw_area,
            RenderQuality::Interactive => self.config.min_draw_area_interactive,
        }
    }

    /// Whether a projected box lands on screen with at least `min_area` px².
    fn on_screen(&self, bounds: Option<&Bounds>, min_area: f64) -> bool {
        let Some(b) = bounds else {
            return false;
        };
        let screen = Bounds::from_corners(
            self.transform.apply(b.min_x, b.min_y),
            self.transform.apply(b.max_x, b.max_y),
        );
        let view = Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: self.size.0,
            max_y: self.size.1,
        };
        screen.intersects(&view) && screen.area() >= min_area
    }

    /// Draw both visible layers and mark the hit layer stale.
    pub fn render(&mut self, color: &mut dyn Surface, lines: &mut dyn Surface) -> FrameMetrics {
        self.gate.complete();
        let mut metrics = FrameMetrics {
            quality: self.quality(),
            ..FrameMetrics::default()
        };
        self.render_colors(color, &mut metrics);
        self.render_overlay(lines, &mut metrics);
        self.hit_dirty = true;
        metrics
    }

    fn render_colors(&self, surface: &mut dyn Surface, metrics: &mut FrameMetrics) {
        surface.clear();
        surface.fill_background(&self.style.background);
        metrics.draw_calls += 1;
        surface.set_transform(&self.transform);
        let min_area = self.min_area(metrics.quality);

        for (shapes, fill) in [
            (&self.scene.ocean, &self.style.ocean),
            (&self.scene.land, &self.style.land),
        ] {
            let visible: Vec<&Shape> = shapes
                .iter()
                .filter(|s| self.on_screen(s.bounds.as_ref(), min_area))
                .collect();
            if !visible.is_empty() {
                surface.fill_rings(&mut visible.iter().flat_map(|s| s.paths()), fill);
                metrics.draw_calls += 1;
            }
        }

        if !self.is_ready() {
            return;
        }
        let visible: Vec<usize> = self
            .scene
            .regions
            .iter()
            .enumerate()
            .filter(|(_, s)| self.on_screen(s.bounds.as_ref(), min_area))
            .map(|(slot, _)| slot)
            .collect();
        metrics.regions_drawn = visible.len() as u32;
        metrics.regions_culled = (self.scene.regions.len() - visible.len()) as u32;
        if visible.is_empty() {
            return;
        }

        let base = FillStyle::solid(&self.style.base_fill);
        surface.fill_rings(
            &mut visible.iter().flat_map(|&slot| self.scene.regions[slot].paths()),
            &base,
        );
        metrics.draw_calls += 1;

        // One fill per distinct color.
        let mut by_color: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for &slot in &visible {
            if let Some(color) = self.colors.get(&self.data.regions[slot].id) {
                by_color.entry(color).or_default().push(slot);
            }
        }
        for (color, slots) in by_color {
            surface.fill_rings(
                &mut slots.iter().flat_map(|&slot| self.scene.regions[slot].paths()),
                &FillStyle::solid(color),
            );
            metrics.colored_drawn += slots.len() as u32;
            metrics.draw_calls += 1;
        }
    }

    fn render_overlay(&self, surface: &mut dyn Surface, metrics: &mut FrameMetrics) {
        surface.clear();
        surface.set_transform(&self.transform);
        let min_area = self.min_area(metrics.quality);
        let full = metrics.quality == RenderQuality::Full;

        if full && self.style.show_terrain {
            for (class, shape) in &self.scene.terrain {
                let Some(fill) = self.style.terrain_fill(*class) else {
                    continue;
                };
                if self.on_screen(shape.bounds.as_ref(), min_area) {
                    surface.fill_rings(&mut shape.paths(), &fill);
                    metrics.draw_calls += 1;
                }
            }
        }

        if full && self.style.show_urban {
            let visible: Vec<&Shape> = self
                .scene
                .urban
                .iter()
                .filter(|s| self.on_screen(s.bounds.as_ref(), min_area))
                .collect();
            if !visible.is_empty() {
                surface.fill_rings(&mut visible.iter().flat_map(|s| s.paths()), &self.style.urban);
                metrics.draw_calls += 1;
            }
        }

        if self.style.show_rivers {
            let visible: Vec<&Shape> = self
                .scene
                .rivers
                .iter()
                .filter(|s| self.on_screen(s.bounds.as_ref(), 0.0))
                .collect();
            if !visible.is_empty() {
                surface.stroke_lines(&mut visible.iter().flat_map(|s| s.paths()), &self.style.river);
                metrics.draw_calls += 1;
            }
        }

        if self.style.show_special_zones {
            for zone in &self.scene.zones {
                if !self.on_screen(zone.shape.bounds.as_ref(), min_area) {
                    continue;
                }
                let (fill, outline) = self.style.zone_style(zone.kind);
                surface.fill_rings(&mut zone.shape.paths(), &fill);
                surface.stroke_lines(&mut zone.shape.paths(), &outline);
                metrics.draw_calls += 2;
            }
        }

        // Everything below belongs to the interactive layer.
        if !self.is_ready() {
            return;
        }
        let coastlines = self.borders.coastlines();
        self.stroke_arcs(surface, &coastlines, &self.style.coastline, metrics);
        let grid = self.borders.grid();
        self.stroke_arcs(surface, &grid, &self.style.grid, metrics);
        let dynamic = self.borders.dynamic_borders(&self.colors);
        self.stroke_arcs(surface, &dynamic, &self.style.dynamic_border, metrics);
        metrics.border_arcs = dynamic.len() as u32;

        if let EditMode::PresetEdit { pending } = &self.interaction.mode {
            let slots: Vec<usize> = pending
                .iter()
                .filter_map(|id| self.index.position(id))
                .collect();
            if !slots.is_empty() {
                surface.stroke_lines(
                    &mut slots.iter().flat_map(|&slot| self.scene.regions[slot].paths()),
                    &self.style.pending,
                );
                metrics.draw_calls += 1;
            }
        }

        if let Some(slot) = self.hovered.as_deref().and_then(|id| self.index.position(id)) {
            surface.stroke_lines(&mut self.scene.regions[slot].paths(), &self.style.hover);
            metrics.draw_calls += 1;
        }
    }

    fn stroke_arcs(
        &self,
        surface: &mut dyn Surface,
        arcs: &[usize],
        style: &LineStyle,
        metrics: &mut FrameMetrics,
    ) {
        if arcs.is_empty() {
            return;
        }
        surface.stroke_lines(
            &mut arcs
                .iter()
                .filter_map(|&arc| self.scene.arcs.get(arc))
                .map(Vec::as_slice),
            style,
        );
        metrics.draw_calls += 1;
    }

    /// Repaint the hit raster with each visible region's key color.
    fn redraw_hit(&mut self) {
        let mut hit = std::mem::take(&mut self.hit);
        hit.clear();
        hit.set_transform(&self.transform);
        let min_area = self.min_area(RenderQuality::Full);
        for (slot, shape) in self.scene.regions.iter().enumerate() {
            if !self.on_screen(shape.bounds.as_ref(), min_area) {
                continue;
            }
            let Some(key) = self.index.key_of(&self.data.regions[slot].id) else {
                continue;
            };
            let [r, g, b] = key_to_rgb(key);
            hit.fill_rings(&mut shape.paths(), &FillStyle::solid(&hex(r, g, b)));
        }
        self.hit = hit;
        self.hit_dirty = false;
    }

    /// Pixel-sampled lookup through the hit layer, redrawn first when stale.
    pub fn hit_sample(&mut self, sx: f64, sy: f64) -> Option<&str> {
        if !self.is_ready() {
            return None;
        }
        if self.hit_dirty {
            self.redraw_hit();
        }
        let key = self.hit.sample(sx, sy)?;
        self.index.id_for_key(key)
    }
}

/// Geographic extent to fit: regions and land, or any decorative layer when
/// the interactive layer did not load.
fn data_extent(data: &MapData) -> Option<Rect<f64>> {
    let primary = data
        .regions
        .iter()
        .filter_map(|r| r.bounds)
        .chain(data.land.iter().filter_map(|a| a.bounds))
        .reduce(union_rect);
    primary.or_else(|| {
        data.ocean
            .iter()
            .chain(&data.urban)
            .chain(data.physical.iter().map(|t| &t.area))
            .chain(data.special_zones.iter().map(|z| &z.area))
            .filter_map(|a| a.bounds)
            .chain(data.rivers.iter().filter_map(|line| {
                line.geometry
                    .coords_iter()
                    .all(|c| c.x.is_finite() && c.y.is_finite())
                    .then(|| line.geometry.bounding_rect())
                    .flatten()
            }))
            .reduce(union_rect)
    })
}

fn union_rect(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::loader::fixtures::THREE_TRIANGLES;
    use crate::render::surface::recording::RecordingSurface;

    pub(crate) fn engine() -> MapEngine {
        let mut engine = MapEngine::default();
        assert!(engine.load_json(THREE_TRIANGLES));
        engine.resize(400.0, 200.0);
        engine
    }

    /// Screen position of a lon/lat under the engine's current projection and zoom.
    pub(crate) fn screen(engine: &MapEngine, lon: f64, lat: f64) -> (f64, f64) {
        let (px, py) = engine
            .projection()
            .project(geo::Coord { x: lon, y: lat })
            .expect("finite");
        engine.transform().apply(px, py)
    }

    fn frame(engine: &mut MapEngine) -> (RecordingSurface, RecordingSurface, FrameMetrics) {
        let (w, h) = engine.size();
        let mut color = RecordingSurface::new(w, h);
        let mut lines = RecordingSurface::new(w, h);
        let metrics = engine.render(&mut color, &mut lines);
        (color, lines, metrics)
    }

    #[test]
    fn query_resolves_interior_points() {
        let engine = engine();
        for (id, lon, lat) in [("A", 1.0, 0.3), ("B", 2.0, 0.7), ("C", 3.0, 0.3)] {
            let (sx, sy) = screen(&engine, lon, lat);
            assert_eq!(engine.query(sx, sy), Some(id), "centroid of {id}");
        }
        let (sx, sy) = screen(&engine, 2.0, -5.0);
        assert_eq!(engine.query(sx, sy), None);
        assert_eq!(engine.query(-10_000.0, 10_000.0), None);
        assert_eq!(engine.query(f64::NAN, 0.0), None);
    }

    #[test]
    fn query_follows_pan_and_zoom() {
        let mut engine = engine();
        let (sx, sy) = screen(&engine, 3.0, 0.3);
        engine.transform.zoom_at(4.0, sx, sy);
        assert_eq!(engine.query(sx, sy), Some("C"));

        engine.transform.pan(50.0, -20.0);
        let (sx, sy) = screen(&engine, 1.0, 0.3);
        assert_eq!(engine.query(sx, sy), Some("A"));
    }

    #[test]
    fn nothing_happens_before_data_arrives() {
        let mut engine = MapEngine::default();
        engine.resize(100.0, 100.0);
        assert_eq!(engine.query(50.0, 50.0), None);
        assert_eq!(engine.hit_sample(50.0, 50.0), None);

        let (color, lines, metrics) = frame(&mut engine);
        assert_eq!(color.backgrounds.len(), 1);
        assert!(color.fills.is_empty() && lines.strokes.is_empty());
        assert_eq!(metrics.regions_drawn, 0);
    }

    #[test]
    fn missing_political_layer_is_logged_not_thrown() {
        let mut engine = MapEngine::default();
        let text = THREE_TRIANGLES.replace("\"political\"", "\"other\"");
        assert!(!engine.load_json(&text));
        assert!(matches!(engine.load_error(), Some(LoadError::MissingLayer(_))));
        assert_eq!(engine.data().rivers.len(), 1);

        // Decorative layers still draw; the interactive layer stays inert.
        engine.resize(400.0, 200.0);
        let (color, lines, metrics) = frame(&mut engine);
        assert_eq!(lines.stroked_lines_of(&engine.style.river.color), 1);
        assert_eq!(lines.stroked_lines_of(&engine.style.coastline.color), 0);
        assert!(color.fills.is_empty());
        assert_eq!(metrics.regions_drawn, 0);
        assert_eq!(engine.query(200.0, 100.0), None);
        assert!(!engine.pointer_move(200.0, 100.0, 1_000.0));

        assert!(!engine.load_json("not json"));
        assert!(matches!(engine.load_error(), Some(LoadError::Parse(_))));
    }

    #[test]
    fn layers_draw_in_order() {
        let mut engine = engine();
        engine.colors.set("A", "#123456");
        let (color, lines, metrics) = frame(&mut engine);

        assert_eq!(color.backgrounds, [engine.style.background.clone()]);
        let fills: Vec<&str> = color.fills.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(fills, [engine.style.base_fill.as_str(), "#123456"]);
        assert_eq!(color.fills[0].1, 3, "one ring per triangle");
        assert_eq!(metrics.regions_drawn, 3);
        assert_eq!(metrics.colored_drawn, 1);

        let strokes: Vec<&str> = lines.strokes.iter().map(|(c, _)| c.as_str()).collect();
        let style = &engine.style;
        assert_eq!(
            strokes,
            [
                style.river.color.as_str(),
                style.coastline.color.as_str(),
                style.grid.color.as_str(),
                style.dynamic_border.color.as_str(),
            ]
        );
        assert_eq!(lines.stroked_lines_of(&style.coastline.color), 3);
        assert_eq!(lines.stroked_lines_of(&style.dynamic_border.color), 2);
    }

    #[test]
    fn zoomed_out_regions_are_culled_but_kept() {
        let mut engine = MapEngine::new(
            EngineConfig {
                min_scale: 0.000_001,
                ..EngineConfig::default()
            },
            RenderStyle::default(),
        );
        assert!(engine.load_json(THREE_TRIANGLES));
        engine.resize(400.0, 200.0);
        engine.paint("B", "#ff0000");

        let (cx, cy) = (200.0, 100.0);
        engine.transform.zoom_at(0.000_01, cx, cy);
        let (color, _, metrics) = frame(&mut engine);

        assert_eq!(metrics.regions_drawn, 0);
        assert_eq!(metrics.regions_culled, 3);
        assert_eq!(color.fills_of("#ff0000"), 0);
        assert!(engine.feature("B").is_some());
        assert_eq!(engine.index().len(), 3);
        assert_eq!(engine.colors().get("B"), Some("#ff0000"));
    }

    #[test]
    fn offscreen_regions_are_culled() {
        let mut engine = engine();
        let (sx, sy) = screen(&engine, 1.0, 0.3);
        engine.transform.zoom_at(8.0, sx, sy);
        let (_, _, metrics) = frame(&mut engine);
        assert!(metrics.regions_culled >= 1, "C is off to the right");
        assert!(metrics.regions_drawn >= 1);
    }

    #[test]
    fn hit_layer_matches_query() {
        let mut engine = engine();
        for (lon, lat) in [(1.0, 0.3), (2.0, 0.7), (3.0, 0.3)] {
            let (sx, sy) = screen(&engine, lon, lat);
            let expected = engine.query(sx, sy).map(str::to_string);
            assert!(expected.is_some());
            assert_eq!(engine.hit_sample(sx, sy).map(str::to_string), expected);
        }
        assert!(!engine.hit_dirty);

        let _ = frame(&mut engine);
        assert!(engine.hit_dirty, "render marks the hit layer stale");
    }

    #[test]
    fn hit_layer_follows_zoom_and_pan() {
        let mut engine = engine();
        let (sx, sy) = screen(&engine, 2.0, 0.7);
        assert_eq!(engine.hit_sample(sx, sy), Some("B"));

        engine.zoom_by(2.0, sx, sy);
        engine.pan_by(40.0, -15.0);
        engine.end_gesture();
        assert!(engine.hit_dirty);

        let interior = [
            ("A", 1.0, 0.3),
            ("A", 0.8, 0.2),
            ("A", 1.5, 0.4),
            ("B", 2.0, 0.7),
            ("B", 1.7, 0.6),
            ("B", 2.3, 0.6),
            ("C", 3.0, 0.3),
            ("C", 2.6, 0.2),
        ];
        let mut compared = 0;
        for (id, lon, lat) in interior {
            let (sx, sy) = screen(&engine, lon, lat);
            if !(0.0..400.0).contains(&sx) || !(0.0..200.0).contains(&sy) {
                continue;
            }
            assert_eq!(engine.query(sx, sy), Some(id), "query at {lon},{lat}");
            assert_eq!(engine.hit_sample(sx, sy), Some(id), "hit layer at {lon},{lat}");
            compared += 1;
        }
        assert!(compared >= 4, "only {compared} points stayed on screen");
    }

    #[test]
    fn hover_outline_is_drawn_last() {
        let mut engine = engine();
        engine.hovered = Some("B".to_string());
        let (_, lines, metrics) = frame(&mut engine);
        let last = lines.strokes.last().expect("strokes");
        assert_eq!(last.0, engine.style.hover.color);
        assert_eq!(metrics.border_arcs, 2);
    }

    #[test]
    fn gesture_redraws_are_coalesced() {
        let mut engine = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        engine.set_redraw_hook(move |r| sink.borrow_mut().push(r));

        engine.interaction.phase = Phase::Gesture;
        engine.invalidate(InvalidationReason::Viewport);
        engine.invalidate(InvalidationReason::Viewport);
        assert_eq!(*seen.borrow(), [Redraw::NextFrame]);

        let (_, _, metrics) = frame(&mut engine);
        assert_eq!(metrics.quality, RenderQuality::Interactive);
        engine.invalidate(InvalidationReason::Viewport);
        assert_eq!(*seen.borrow(), [Redraw::NextFrame, Redraw::NextFrame]);
    }
}
