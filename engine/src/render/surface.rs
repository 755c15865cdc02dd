use crate::viewport::ZoomTransform;

/// A projected (pre-zoom) polyline or ring.
pub type PlanePath = Vec<(f64, f64)>;

/// Fill color with opacity.
#[derive(Debug, Clone, PartialEq)]
pub struct FillStyle {
    pub color: String,
    pub opacity: f64,
}

impl FillStyle {
    pub fn solid(color: &str) -> Self {
        Self {
            color: color.to_string(),
            opacity: 1.0,
        }
    }
}

/// Stroke parameters. `width` is in screen pixels regardless of zoom.
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
    pub opacity: f64,
    pub dash: Option<(f64, f64)>,
}

impl LineStyle {
    pub fn new(color: &str, width: f64, opacity: f64) -> Self {
        Self {
            color: color.to_string(),
            width,
            opacity,
            dash: None,
        }
    }

    pub fn dashed(mut self, on: f64, off: f64) -> Self {
        self.dash = Some((on, off));
        self
    }
}

/// A 2D drawing target. Paths are given in the projected plane; the surface
/// applies the zoom transform last set with [`Surface::set_transform`].
///
/// Rings passed to one `fill_rings` call form a single path filled with the
/// even-odd rule, so holes punch through their exterior.
pub trait Surface {
    /// Width and height in pixels.
    fn size(&self) -> (f64, f64);

    /// Reset to transparent and drop any transform.
    fn clear(&mut self);

    /// Paint the whole surface, ignoring the transform.
    fn fill_background(&mut self, color: &str);

    fn set_transform(&mut self, transform: &ZoomTransform);

    fn fill_rings(&mut self, rings: &mut dyn Iterator<Item = &[(f64, f64)]>, fill: &FillStyle);

    fn stroke_lines(&mut self, lines: &mut dyn Iterator<Item = &[(f64, f64)]>, stroke: &LineStyle);
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    /// A surface that only counts what it was asked to draw.
    #[derive(Debug, Default)]
    pub struct RecordingSurface {
        pub width: f64,
        pub height: f64,
        pub clears: usize,
        pub backgrounds: Vec<String>,
        /// One entry per `fill_rings` call: (color, ring count).
        pub fills: Vec<(String, usize)>,
        /// One entry per `stroke_lines` call: (color, line count).
        pub strokes: Vec<(String, usize)>,
        pub transform: Option<ZoomTransform>,
    }

    impl RecordingSurface {
        pub fn new(width: f64, height: f64) -> Self {
            Self {
                width,
                height,
                ..Self::default()
            }
        }

        pub fn fills_of(&self, color: &str) -> usize {
            self.fills.iter().filter(|(c, _)| c == color).count()
        }

        pub fn stroked_lines_of(&self, color: &str) -> usize {
            self.strokes
                .iter()
                .filter(|(c, _)| c == color)
                .map(|(_, n)| n)
                .sum()
        }
    }

    impl Surface for RecordingSurface {
        fn size(&self) -> (f64, f64) {
            (self.width, self.height)
        }

        fn clear(&mut self) {
            self.clears += 1;
            self.backgrounds.clear();
            self.fills.clear();
            self.strokes.clear();
        }

        fn fill_background(&mut self, color: &str) {
            self.backgrounds.push(color.to_string());
        }

        fn set_transform(&mut self, transform: &ZoomTransform) {
            self.transform = Some(*transform);
        }

        fn fill_rings(&mut self, rings: &mut dyn Iterator<Item = &[(f64, f64)]>, fill: &FillStyle) {
            self.fills.push((fill.color.clone(), rings.count()));
        }

        fn stroke_lines(&mut self, lines: &mut dyn Iterator<Item = &[(f64, f64)]>, stroke: &LineStyle) {
            self.strokes.push((stroke.color.clone(), lines.count()));
        }
    }
}
