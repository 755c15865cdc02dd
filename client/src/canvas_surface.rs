use borderpaint_engine::colors::{parse_hex, rgba_css};
use borderpaint_engine::render::{FillStyle, LineStyle, Surface};
use borderpaint_engine::viewport::ZoomTransform;
use web_sys::{CanvasRenderingContext2d, CanvasWindingRule};

/// A 2D canvas context seen through the engine's [`Surface`] trait.
///
/// Drawing happens in CSS pixels; `dpr` maps them onto the backing store. Points
/// are transformed on the CPU so stroke widths stay constant under zoom.
pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
    width: f64,
    height: f64,
    dpr: f64,
    transform: ZoomTransform,
}

impl CanvasSurface {
    pub fn new(ctx: CanvasRenderingContext2d, width: f64, height: f64, dpr: f64) -> Self {
        Self {
            ctx,
            width,
            height,
            dpr,
            transform: ZoomTransform::default(),
        }
    }

    fn reset_pixel_transform(&self) {
        self.ctx
            .set_transform(self.dpr, 0.0, 0.0, self.dpr, 0.0, 0.0)
            .ok();
    }

    fn trace(&self, points: &[(f64, f64)], close: bool) {
        let mut iter = points.iter();
        let Some(&(x, y)) = iter.next() else {
            return;
        };
        let (sx, sy) = self.transform.apply(x, y);
        self.ctx.move_to(sx, sy);
        for &(x, y) in iter {
            let (sx, sy) = self.transform.apply(x, y);
            self.ctx.line_to(sx, sy);
        }
        if close {
            self.ctx.close_path();
        }
    }
}

fn css_color(color: &str, opacity: f64) -> String {
    match parse_hex(color) {
        Some((r, g, b)) => rgba_css(r, g, b, opacity.clamp(0.0, 1.0)),
        None => color.to_string(),
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0).ok();
        self.ctx.clear_rect(
            0.0,
            0.0,
            self.width * self.dpr,
            self.height * self.dpr,
        );
        self.reset_pixel_transform();
        self.transform = ZoomTransform::default();
    }

    fn fill_background(&mut self, color: &str) {
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_rect(0.0, 0.0, self.width, self.height);
    }

    fn set_transform(&mut self, transform: &ZoomTransform) {
        self.transform = *transform;
    }

    fn fill_rings(&mut self, rings: &mut dyn Iterator<Item = &[(f64, f64)]>, fill: &FillStyle) {
        self.ctx.begin_path();
        for ring in rings {
            self.trace(ring, true);
        }
        self.ctx
            .set_fill_style_str(&css_color(&fill.color, fill.opacity));
        self.ctx
            .fill_with_canvas_winding_rule(CanvasWindingRule::Evenodd);
    }

    fn stroke_lines(&mut self, lines: &mut dyn Iterator<Item = &[(f64, f64)]>, stroke: &LineStyle) {
        self.ctx.begin_path();
        for line in lines {
            self.trace(line, false);
        }
        self.ctx
            .set_stroke_style_str(&css_color(&stroke.color, stroke.opacity));
        self.ctx.set_line_width(stroke.width);
        self.ctx.set_line_join("round");
        self.ctx.set_line_cap("round");
        let dash = js_sys::Array::new();
        if let Some((on, off)) = stroke.dash {
            dash.push(&on.into());
            dash.push(&off.into());
        }
        self.ctx.set_line_dash(&dash).ok();
        self.ctx.stroke();
    }
}

#[cfg(test)]
mod tests {
    use super::css_color;

    #[test]
    fn hex_colors_gain_opacity() {
        assert_eq!(css_color("#ff0000", 0.5), "rgba(255,0,0,0.5)");
        assert_eq!(css_color("tomato", 0.5), "tomato");
    }
}
