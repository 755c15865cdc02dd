/// Pan/zoom composed on top of the projection: `screen = projected * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
    min_scale: f64,
    max_scale: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::new(1.0, 50.0)
    }
}

impl ZoomTransform {
    pub fn new(min_scale: f64, max_scale: f64) -> Self {
        let min_scale = min_scale.max(f64::EPSILON);
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            scale: min_scale.max(1.0).min(max_scale.max(min_scale)),
            min_scale,
            max_scale: max_scale.max(min_scale),
        }
    }

    pub fn scale_range(&self) -> (f64, f64) {
        (self.min_scale, self.max_scale)
    }

    pub fn apply(&self, px: f64, py: f64) -> (f64, f64) {
        (
            px * self.scale + self.translate_x,
            py * self.scale + self.translate_y,
        )
    }

    pub fn invert(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.translate_x) / self.scale,
            (sy - self.translate_y) / self.scale,
        )
    }

    /// Multiply the scale by `factor` (clamped), keeping the screen point under the cursor fixed.
    /// Returns whether anything changed.
    pub fn zoom_at(&mut self, factor: f64, sx: f64, sy: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let new_scale = (self.scale * factor).clamp(self.min_scale, self.max_scale);
        if new_scale == self.scale {
            return false;
        }
        let ratio = new_scale / self.scale;

        self.translate_x = sx - (sx - self.translate_x) * ratio;
        self.translate_y = sy - (sy - self.translate_y) * ratio;
        self.scale = new_scale;
        true
    }

    /// Wheel zoom; positive `delta` zooms out.
    pub fn wheel(&mut self, delta: f64, sensitivity: f64, sx: f64, sy: f64) -> bool {
        self.zoom_at((-delta * sensitivity).exp(), sx, sy)
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.translate_x += dx;
        self.translate_y += dy;
    }

    pub fn reset(&mut self) {
        self.translate_x = 0.0;
        self.translate_y = 0.0;
        self.scale = self.min_scale;
    }
}
