use std::cell::Cell;
use std::collections::HashMap;

/// Sparse region id → CSS color. An absent key means unfilled.
pub type ColorMap = HashMap<String, String>;

/// The user's paint state plus a memoized, order-independent content hash.
///
/// Every mutation that changes content drops the memo; mutations that leave the
/// content as it was do not.
#[derive(Debug, Clone, Default)]
pub struct ColorState {
    map: ColorMap,
    hash: Cell<Option<u64>>,
}

impl ColorState {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.map.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_map(&self) -> &ColorMap {
        &self.map
    }

    /// Returns whether the stored color changed.
    pub fn set(&mut self, id: &str, color: &str) -> bool {
        let color = normalize_color(color);
        if self.map.get(id) == Some(&color) {
            return false;
        }
        self.map.insert(id.to_string(), color);
        self.hash.set(None);
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let removed = self.map.remove(id).is_some();
        if removed {
            self.hash.set(None);
        }
        removed
    }

    pub fn clear(&mut self) -> bool {
        if self.map.is_empty() {
            return false;
        }
        self.map.clear();
        self.hash.set(None);
        true
    }

    /// Direct access for callers that edit the map wholesale. The hash memo is dropped
    /// up front, since nothing can tell what the caller will change.
    pub fn map_mut(&mut self) -> &mut ColorMap {
        self.hash.set(None);
        &mut self.map
    }

    pub fn is_hash_memoized(&self) -> bool {
        self.hash.get().is_some()
    }

    /// Hash of the content sorted by id, so insertion order never matters.
    pub fn content_hash(&self) -> u64 {
        if let Some(hash) = self.hash.get() {
            return hash;
        }
        let mut entries: Vec<_> = self.map.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut lo = crc32fast::Hasher::new();
        let mut hi = crc32fast::Hasher::new_with_initial(0x9e37_79b9);
        for (id, color) in entries {
            for hasher in [&mut lo, &mut hi] {
                hasher.update(id.as_bytes());
                hasher.update(&[0x1f]);
                hasher.update(color.as_bytes());
                hasher.update(&[0x1e]);
            }
        }
        let hash = (u64::from(hi.finalize()) << 32) | u64::from(lo.finalize());
        self.hash.set(Some(hash));
        hash
    }
}

/// Lowercase and expand `#rgb` to `#rrggbb`; anything unparseable is kept trimmed.
pub fn normalize_color(color: &str) -> String {
    match parse_hex(color) {
        Some((r, g, b)) => hex(r, g, b),
        None => color.trim().to_ascii_lowercase(),
    }
}

pub fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let digits = color.trim().strip_prefix('#')?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match digits.len() {
        3 => {
            let mut it = digits.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
            Some((it.next()??, it.next()??, it.next()??))
        }
        6 => Some((
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        )),
        _ => None,
    }
}

pub fn hex(r: u8, g: u8, b: u8) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Format RGBA as a CSS color string.
pub fn rgba_css(r: u8, g: u8, b: u8, a: f64) -> String {
    format!("rgba({r},{g},{b},{a})")
}

/// Deterministic fill for an owner code: CRC32 picks the hue, saturation and
/// lightness stay in a muted band so borders remain readable on top.
pub fn country_color(code: &str) -> String {
    let hash = crc32fast::hash(code.trim().to_ascii_uppercase().as_bytes());
    let hue = f64::from(hash % 360);
    let saturation = 0.45 + f64::from((hash >> 9) % 20) / 100.0;
    let lightness = 0.55 + f64::from((hash >> 17) % 15) / 100.0;
    let (r, g, b) = hsl_to_rgb(hue, saturation, lightness);
    hex(r, g, b)
}

/// Convert HSL (h: 0..360, s/l: 0..1) to RGB.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h = h / 360.0;

    let channel = |t: f64| (hue_to_rgb(p, q, t) * 255.0).round() as u8;
    (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Region key → opaque RGB for the hit raster. Key 0 is reserved for "nothing".
pub fn key_to_rgb(key: u32) -> [u8; 3] {
    let [_, r, g, b] = key.to_be_bytes();
    [r, g, b]
}

pub fn rgb_to_key(rgb: [u8; 3]) -> u32 {
    u32::from_be_bytes([0, rgb[0], rgb[1], rgb[2]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_ignores_insertion_order() {
        let mut a = ColorState::default();
        a.set("FR_1", "#112233");
        a.set("DE_4", "#445566");

        let mut b = ColorState::default();
        b.set("DE_4", "#445566");
        b.set("FR_1", "#112233");

        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn hash_tracks_content_not_history() {
        let mut state = ColorState::default();
        let empty = state.content_hash();

        assert!(state.set("A", "#FF0000"));
        let painted = state.content_hash();
        assert_ne!(empty, painted);

        assert!(!state.set("A", "#ff0000"), "same color after normalization");
        assert_eq!(state.content_hash(), painted);

        assert!(state.remove("A"));
        assert_eq!(state.content_hash(), empty);
        assert!(!state.remove("A"));
    }

    #[test]
    fn short_hex_is_expanded() {
        assert_eq!(normalize_color("#1aF"), "#11aaff");
        assert_eq!(normalize_color(" #FF0000 "), "#ff0000");
        assert_eq!(normalize_color("Teal"), "teal");
        assert_eq!(parse_hex("#12345"), None);
    }

    #[test]
    fn country_color_is_deterministic_and_distinct() {
        assert_eq!(country_color("FR"), country_color("fr"));
        assert_ne!(country_color("FR"), country_color("DE"));
        assert!(parse_hex(&country_color("JP")).is_some());
    }

    #[test]
    fn keys_survive_the_rgb_encoding() {
        for key in [1, 255, 256, 65_535, 0x00ab_cdef] {
            assert_eq!(rgb_to_key(key_to_rgb(key)), key);
        }
    }
}
