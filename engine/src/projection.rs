use std::f64::consts::FRAC_PI_4;

use geo::{Coord, Rect};
use serde::Deserialize;

/// Latitude beyond which Mercator is clipped.
const MERCATOR_MAX_LAT: f64 = 85.051_128_78;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionKind {
    #[default]
    Mercator,
    Equirectangular,
}

/// Geographic (lon/lat degrees) to drawing-plane mapping. Screen y grows downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub kind: ProjectionKind,
    pub scale: f64,
    pub translate: (f64, f64),
}

impl Projection {
    pub fn new(kind: ProjectionKind) -> Self {
        Self {
            kind,
            scale: 1.0,
            translate: (0.0, 0.0),
        }
    }

    fn raw(&self, lon: f64, lat: f64) -> (f64, f64) {
        let x = lon.to_radians();
        let y = match self.kind {
            ProjectionKind::Mercator => {
                let lat = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
                (FRAC_PI_4 + lat / 2.0).tan().ln()
            }
            ProjectionKind::Equirectangular => lat.to_radians(),
        };
        (x, y)
    }

    fn raw_invert(&self, x: f64, y: f64) -> (f64, f64) {
        let lat = match self.kind {
            ProjectionKind::Mercator => 2.0 * y.exp().atan() - 2.0 * FRAC_PI_4,
            ProjectionKind::Equirectangular => y,
        };
        (x.to_degrees(), lat.to_degrees())
    }

    pub fn project(&self, coord: Coord<f64>) -> Option<(f64, f64)> {
        let (x, y) = self.raw(coord.x, coord.y);
        let px = x * self.scale + self.translate.0;
        let py = -y * self.scale + self.translate.1;
        (px.is_finite() && py.is_finite()).then_some((px, py))
    }

    /// Drawing-plane point back to lon/lat. `None` when the point has no geographic meaning.
    pub fn invert(&self, px: f64, py: f64) -> Option<Coord<f64>> {
        if !(px.is_finite() && py.is_finite()) || self.scale == 0.0 {
            return None;
        }
        let x = (px - self.translate.0) / self.scale;
        let y = -(py - self.translate.1) / self.scale;
        let (lon, lat) = self.raw_invert(x, y);
        let valid = lon.is_finite() && lat.is_finite() && lon.abs() <= 180.0 && lat.abs() <= 90.0;
        valid.then_some(Coord { x: lon, y: lat })
    }

    /// Choose scale and translate so `extent` fills `width`×`height` minus `padding` on each side.
    pub fn fit_extent(&mut self, extent: Rect<f64>, width: f64, height: f64, padding: f64) {
        let (x0, y0) = self.raw(extent.min().x, extent.min().y);
        let (x1, y1) = self.raw(extent.max().x, extent.max().y);
        let (dx, dy) = ((x1 - x0).abs(), (y1 - y0).abs());
        let avail_w = width * (1.0 - 2.0 * padding);
        let avail_h = height * (1.0 - 2.0 * padding);
        if avail_w <= 0.0 || avail_h <= 0.0 {
            return;
        }

        self.scale = match (dx > 0.0, dy > 0.0) {
            (true, true) => (avail_w / dx).min(avail_h / dy),
            (true, false) => avail_w / dx,
            (false, true) => avail_h / dy,
            (false, false) => 1.0,
        };
        let (cx, cy) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
        self.translate = (width / 2.0 - cx * self.scale, height / 2.0 + cy * self.scale);
    }
}
