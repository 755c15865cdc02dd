//! Region map engine: topology loading, spatial lookup, border derivation and
//! layered rendering for a paintable map of administrative regions.

pub mod colors;
pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod index;
pub mod loader;
pub mod mesh;
pub mod projection;
pub mod region;
pub mod render;
pub mod spatial;
pub mod tables;
pub mod topology;
pub mod viewport;

pub use colors::{ColorMap, ColorState};
pub use config::{EngineConfig, LayerNames};
pub use controller::{ClickOutcome, EditMode, Tool};
pub use error::LoadError;
pub use render::{FrameMetrics, MapEngine, Redraw, RenderQuality, RenderStyle, Surface};
pub use tables::{LocaleTable, PresetTable};
pub use topology::Topology;
