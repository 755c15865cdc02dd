use crate::colors::{parse_hex, rgb_to_key};
use crate::render::surface::{FillStyle, LineStyle, Surface};
use crate::viewport::ZoomTransform;

/// Software hit layer: one region key per pixel, 0 where nothing was drawn.
///
/// Filled through the same [`Surface`] calls as the color layer, with each
/// region's color encoding its key, so both share one screen transform.
#[derive(Debug, Clone, Default)]
pub struct HitRaster {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
    transform: ZoomTransform,
}

impl HitRaster {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
            transform: ZoomTransform::default(),
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) != (self.width, self.height) {
            *self = Self::new(width, height);
        }
    }

    /// Key stored at a screen pixel, if any region covers it.
    pub fn sample(&self, sx: f64, sy: f64) -> Option<u32> {
        if !(sx.is_finite() && sy.is_finite()) || sx < 0.0 || sy < 0.0 {
            return None;
        }
        let (col, row) = (sx.floor() as usize, sy.floor() as usize);
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.pixels[row * self.width + col]).filter(|&key| key != 0)
    }

    fn fill_span(&mut self, row: usize, x0: f64, x1: f64, key: u32) {
        // Pixel centers in [x0, x1).
        let start = (x0 - 0.5).ceil().max(0.0) as usize;
        let end = ((x1 - 0.5).ceil().max(0.0) as usize).min(self.width);
        if start < end {
            let base = row * self.width;
            self.pixels[base + start..base + end].fill(key);
        }
    }
}

impl Surface for HitRaster {
    fn size(&self) -> (f64, f64) {
        (self.width as f64, self.height as f64)
    }

    fn clear(&mut self) {
        self.pixels.fill(0);
        self.transform = ZoomTransform::default();
    }

    fn fill_background(&mut self, _color: &str) {}

    fn set_transform(&mut self, transform: &ZoomTransform) {
        self.transform = *transform;
    }

    fn fill_rings(&mut self, rings: &mut dyn Iterator<Item = &[(f64, f64)]>, fill: &FillStyle) {
        let Some(key) = parse_hex(&fill.color).map(|(r, g, b)| rgb_to_key([r, g, b])) else {
            return;
        };
        let screen: Vec<Vec<(f64, f64)>> = rings
            .filter(|ring| ring.len() >= 3)
            .map(|ring| {
                ring.iter()
                    .map(|&(x, y)| self.transform.apply(x, y))
                    .collect()
            })
            .collect();

        let (min_y, max_y) = screen
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| {
                (lo.min(y), hi.max(y))
            });
        if !(min_y.is_finite() && max_y.is_finite()) {
            return;
        }
        let first_row = (min_y - 0.5).ceil().max(0.0) as usize;
        let last_row = ((max_y - 0.5).floor().max(-1.0) + 1.0) as usize;

        let mut crossings = Vec::new();
        for row in first_row..last_row.min(self.height) {
            let yc = row as f64 + 0.5;
            crossings.clear();
            for ring in &screen {
                let closing = std::iter::once((ring[ring.len() - 1], ring[0]));
                for ((x0, y0), (x1, y1)) in ring.windows(2).map(|w| (w[0], w[1])).chain(closing) {
                    if (y0 <= yc) != (y1 <= yc) {
                        crossings.push(x0 + (yc - y0) * (x1 - x0) / (y1 - y0));
                    }
                }
            }
            crossings.sort_by(f64::total_cmp);
            for pair in crossings.chunks_exact(2) {
                self.fill_span(row, pair[0], pair[1], key);
            }
        }
    }

    fn stroke_lines(&mut self, _lines: &mut dyn Iterator<Item = &[(f64, f64)]>, _stroke: &LineStyle) {}
}
