//! Color parsing and pre-quantized color tables.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ConfigError;

/// Extra integer keys stored on each side of `[vmin, vmax]`.
const TABLE_MARGIN: i64 = 100;
/// Widest `vmax - vmin` a quantized table may cover.
pub const MAX_TABLE_SPAN: f64 = 100_000.0;

/// Errors raised while resolving colors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StyleError {
    #[error("unknown color `{0}`")]
    UnknownColor(String),
    #[error("color value {value} is outside the precomputed range {min}..={max}")]
    ColorOutOfRange { value: f64, min: i64, max: i64 },
    #[error("no color registered for category {0}")]
    UnknownCategory(i64),
}

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const WHITESMOKE: Rgba = Rgba::rgb(245, 245, 245);
    pub const GREY: Rgba = Rgba::rgb(128, 128, 128);
    pub const NAVY_BLUE: Rgba = Rgba::rgb(0, 0, 128);
    pub const ORANGE: Rgba = Rgba::rgb(255, 165, 0);
    pub const GREEN: Rgba = Rgba::rgb(0, 128, 0);
    pub const RED: Rgba = Rgba::rgb(255, 0, 0);
    pub const PINK: Rgba = Rgba::rgb(255, 192, 203);
    pub const PURPLE: Rgba = Rgba::rgb(128, 0, 128);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub const fn r(self) -> u8 {
        self.0[0]
    }

    pub const fn g(self) -> u8 {
        self.0[1]
    }

    pub const fn b(self) -> u8 {
        self.0[2]
    }

    pub const fn a(self) -> u8 {
        self.0[3]
    }

    /// Composite `self` over an opaque `base`.
    pub fn over(self, base: Rgba) -> Rgba {
        let alpha = f64::from(self.a()) / 255.0;
        let mix = |top: u8, bottom: u8| {
            (f64::from(top) * alpha + f64::from(bottom) * (1.0 - alpha)).round() as u8
        };
        Rgba::rgb(
            mix(self.r(), base.r()),
            mix(self.g(), base.g()),
            mix(self.b(), base.b()),
        )
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("aqua", [0, 255, 255]),
    ("beige", [245, 245, 220]),
    ("black", [0, 0, 0]),
    ("blue", [0, 0, 255]),
    ("brown", [165, 42, 42]),
    ("coral", [255, 127, 80]),
    ("crimson", [220, 20, 60]),
    ("cyan", [0, 255, 255]),
    ("darkblue", [0, 0, 139]),
    ("darkgray", [169, 169, 169]),
    ("darkgreen", [0, 100, 0]),
    ("darkgrey", [169, 169, 169]),
    ("darkorange", [255, 140, 0]),
    ("darkred", [139, 0, 0]),
    ("gold", [255, 215, 0]),
    ("gray", [128, 128, 128]),
    ("green", [0, 128, 0]),
    ("grey", [128, 128, 128]),
    ("indigo", [75, 0, 130]),
    ("ivory", [255, 255, 240]),
    ("lightblue", [173, 216, 230]),
    ("lightgray", [211, 211, 211]),
    ("lightgreen", [144, 238, 144]),
    ("lightgrey", [211, 211, 211]),
    ("lime", [0, 255, 0]),
    ("magenta", [255, 0, 255]),
    ("maroon", [128, 0, 0]),
    ("navy", [0, 0, 128]),
    ("navyblue", [0, 0, 128]),
    ("olive", [128, 128, 0]),
    ("orange", [255, 165, 0]),
    ("pink", [255, 192, 203]),
    ("purple", [128, 0, 128]),
    ("red", [255, 0, 0]),
    ("salmon", [250, 128, 114]),
    ("silver", [192, 192, 192]),
    ("skyblue", [135, 206, 235]),
    ("steelblue", [70, 130, 180]),
    ("tan", [210, 180, 140]),
    ("teal", [0, 128, 128]),
    ("tomato", [255, 99, 71]),
    ("turquoise", [64, 224, 208]),
    ("violet", [238, 130, 238]),
    ("white", [255, 255, 255]),
    ("whitesmoke", [245, 245, 245]),
    ("yellow", [255, 255, 0]),
];

const SHORT_CODES: &[(char, [u8; 3])] = &[
    ('b', [0, 0, 255]),
    ('g', [0, 128, 0]),
    ('r', [255, 0, 0]),
    ('c', [0, 191, 191]),
    ('m', [191, 0, 191]),
    ('y', [191, 191, 0]),
    ('k', [0, 0, 0]),
    ('w', [255, 255, 255]),
];

/// Resolve a symbolic color (named, single-letter or hex) into RGBA.
pub fn parse_color(spec: &str) -> Result<Rgba, StyleError> {
    let trimmed = spec.trim();
    if let Some(hex) = trimmed.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| StyleError::UnknownColor(spec.to_string()));
    }

    let mut chars = trimmed.chars();
    if let (Some(code), None) = (chars.next(), chars.next())
        && let Some((_, [r, g, b])) = SHORT_CODES.iter().find(|(c, _)| *c == code)
    {
        return Ok(Rgba::rgb(*r, *g, *b));
    }

    let key: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect();
    NAMED_COLORS
        .binary_search_by(|(name, _)| name.cmp(&key.as_str()))
        .map(|idx| {
            let [r, g, b] = NAMED_COLORS[idx].1;
            Rgba::rgb(r, g, b)
        })
        .map_err(|_| StyleError::UnknownColor(spec.to_string()))
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut out = [0u8; 3];
            for (slot, ch) in out.iter_mut().zip(hex.chars()) {
                let nibble = ch.to_digit(16)? as u8;
                *slot = nibble * 17;
            }
            Some(Rgba::rgb(out[0], out[1], out[2]))
        }
        6 => Some(Rgba::rgb(byte(&hex[0..2])?, byte(&hex[2..4])?, byte(&hex[4..6])?)),
        8 => Some(Rgba::new(
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
            byte(&hex[6..8])?,
        )),
        _ => None,
    }
}

/// Mapping from a sampled numeric value to a color.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorMap {
    /// Named gradient (`viridis`, `Greens`, `bwr`, ...). A `_r` suffix reverses it.
    Continuous {
        name: String,
        vmin: Option<f64>,
        vmax: Option<f64>,
    },
    /// Explicit category → color spec table.
    Categorical(BTreeMap<i64, String>),
}

impl ColorMap {
    pub fn named(name: impl Into<String>) -> Self {
        ColorMap::Continuous {
            name: name.into(),
            vmin: None,
            vmax: None,
        }
    }

    pub fn categorical<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        ColorMap::Categorical(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }

    /// Set the normalization bounds of a continuous map. No-op for categorical maps.
    pub fn with_bounds(self, lo: f64, hi: f64) -> Self {
        match self {
            ColorMap::Continuous { name, .. } => ColorMap::Continuous {
                name,
                vmin: Some(lo),
                vmax: Some(hi),
            },
            other => other,
        }
    }
}

enum Ramp {
    Gradient(colorous::Gradient),
    BlueWhiteRed,
}

impl Ramp {
    /// Resolve a gradient name; the flag reports whether it runs reversed.
    fn lookup(name: &str) -> Option<(Ramp, bool)> {
        let ramp = match name.to_ascii_lowercase().as_str() {
            "viridis" => Ramp::Gradient(colorous::VIRIDIS),
            "plasma" => Ramp::Gradient(colorous::PLASMA),
            "inferno" => Ramp::Gradient(colorous::INFERNO),
            "magma" => Ramp::Gradient(colorous::MAGMA),
            "cividis" => Ramp::Gradient(colorous::CIVIDIS),
            "turbo" => Ramp::Gradient(colorous::TURBO),
            "greens" => Ramp::Gradient(colorous::GREENS),
            "reds" => Ramp::Gradient(colorous::REDS),
            "blues" => Ramp::Gradient(colorous::BLUES),
            "greys" | "grays" => Ramp::Gradient(colorous::GREYS),
            "oranges" => Ramp::Gradient(colorous::ORANGES),
            "purples" => Ramp::Gradient(colorous::PURPLES),
            "rdbu" => Ramp::Gradient(colorous::RED_BLUE),
            "rdylbu" => Ramp::Gradient(colorous::RED_YELLOW_BLUE),
            "spectral" => Ramp::Gradient(colorous::SPECTRAL),
            "coolwarm" => return Some((Ramp::Gradient(colorous::RED_BLUE), true)),
            "bwr" => Ramp::BlueWhiteRed,
            _ => return None,
        };
        Some((ramp, false))
    }

    fn eval(&self, t: f64) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ramp::Gradient(gradient) => {
                let c = gradient.eval_continuous(t);
                Rgba::rgb(c.r, c.g, c.b)
            }
            Ramp::BlueWhiteRed => {
                let (from, to, local) = if t < 0.5 {
                    ([0.0, 0.0, 255.0], [255.0, 255.0, 255.0], t * 2.0)
                } else {
                    ([255.0, 255.0, 255.0], [255.0, 0.0, 0.0], (t - 0.5) * 2.0)
                };
                let lerp = |i: usize| (from[i] + (to[i] - from[i]) * local).round() as u8;
                Rgba::rgb(lerp(0), lerp(1), lerp(2))
            }
        }
    }
}

/// Color lookup table built once from a [`ColorMap`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTable {
    entries: TableEntries,
}

#[derive(Debug, Clone, PartialEq)]
enum TableEntries {
    Quantized { offset: i64, colors: Vec<Rgba> },
    Categorical(BTreeMap<i64, Rgba>),
}

impl ColorTable {
    pub fn build(map: &ColorMap) -> Result<Self, ConfigError> {
        match map {
            ColorMap::Continuous { name, vmin, vmax } => {
                let (suffixed, base) = match name.strip_suffix("_r") {
                    Some(base) => (true, base),
                    None => (false, name.as_str()),
                };
                let (ramp, inverted) =
                    Ramp::lookup(base).ok_or_else(|| ConfigError::InvalidColorMap(name.clone()))?;
                let reversed = suffixed != inverted;
                let (Some(vmin), Some(vmax)) = (*vmin, *vmax) else {
                    return Err(ConfigError::MissingColorBounds);
                };
                if !(vmin.is_finite() && vmax.is_finite() && vmin < vmax)
                    || vmax - vmin > MAX_TABLE_SPAN
                {
                    return Err(ConfigError::InvalidColorBounds { vmin, vmax });
                }

                let lo = vmin.floor() as i64 - TABLE_MARGIN;
                let hi = vmax.ceil() as i64 + TABLE_MARGIN;
                let span = vmax - vmin;
                let colors = (lo..=hi)
                    .map(|key| {
                        let t = ((key as f64 - vmin) / span).clamp(0.0, 1.0);
                        ramp.eval(if reversed { 1.0 - t } else { t })
                    })
                    .collect();
                Ok(Self {
                    entries: TableEntries::Quantized { offset: lo, colors },
                })
            }
            ColorMap::Categorical(entries) => {
                let colors = entries
                    .iter()
                    .map(|(key, spec)| parse_color(spec).map(|c| (*key, c)))
                    .collect::<Result<BTreeMap<_, _>, _>>()?;
                Ok(Self {
                    entries: TableEntries::Categorical(colors),
                })
            }
        }
    }

    /// Look up the color for a sampled value (truncated toward zero).
    pub fn lookup(&self, value: f64) -> Result<Rgba, StyleError> {
        match &self.entries {
            TableEntries::Quantized { offset, colors } => {
                let max = offset + colors.len() as i64 - 1;
                let out_of_range = StyleError::ColorOutOfRange {
                    value,
                    min: *offset,
                    max,
                };
                if !value.is_finite() {
                    return Err(out_of_range);
                }
                let key = value.trunc() as i64;
                usize::try_from(key - offset)
                    .ok()
                    .and_then(|idx| colors.get(idx).copied())
                    .ok_or(out_of_range)
            }
            TableEntries::Categorical(colors) => {
                let key = value.trunc() as i64;
                colors
                    .get(&key)
                    .copied()
                    .ok_or(StyleError::UnknownCategory(key))
            }
        }
    }

    /// Inclusive key range covered by a quantized table.
    pub fn key_range(&self) -> Option<(i64, i64)> {
        match &self.entries {
            TableEntries::Quantized { offset, colors } => {
                Some((*offset, offset + colors.len() as i64 - 1))
            }
            TableEntries::Categorical(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_colors_are_sorted_for_binary_search() {
        assert!(NAMED_COLORS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn parses_every_supported_form() {
        assert_eq!(parse_color("whitesmoke").expect("named"), Rgba::WHITESMOKE);
        assert_eq!(parse_color("Navy Blue").expect("spaced"), Rgba::NAVY_BLUE);
        assert_eq!(parse_color("k").expect("short code"), Rgba::BLACK);
        assert_eq!(parse_color("#f00").expect("short hex"), Rgba::RED);
        assert_eq!(
            parse_color("#00800080").expect("hex with alpha"),
            Rgba::new(0, 128, 0, 128)
        );
        assert!(matches!(
            parse_color("not-a-color"),
            Err(StyleError::UnknownColor(_))
        ));
        assert!(parse_color("#12345").is_err());
    }

    #[test]
    fn quantized_table_covers_margin_and_rejects_outside() {
        let table =
            ColorTable::build(&ColorMap::named("Greens").with_bounds(0.0, 5.0)).expect("table");
        assert_eq!(table.key_range(), Some((-100, 105)));
        let low = table.lookup(0.0).expect("vmin");
        let below = table.lookup(-50.0).expect("clamped below");
        assert_eq!(low, below);
        assert_eq!(table.lookup(4.9).expect("truncates"), table.lookup(4.0).expect("4"));
        assert!(matches!(
            table.lookup(106.0),
            Err(StyleError::ColorOutOfRange { .. })
        ));
        assert!(table.lookup(f64::NAN).is_err());
    }

    #[test]
    fn bwr_ramp_hits_blue_white_red() {
        let table = ColorTable::build(&ColorMap::named("bwr").with_bounds(0.0, 2.0)).expect("bwr");
        assert_eq!(table.lookup(0.0).expect("low"), Rgba::rgb(0, 0, 255));
        assert_eq!(table.lookup(1.0).expect("mid"), Rgba::WHITE);
        assert_eq!(table.lookup(2.0).expect("high"), Rgba::RED);
        let reversed =
            ColorTable::build(&ColorMap::named("bwr_r").with_bounds(0.0, 2.0)).expect("bwr_r");
        assert_eq!(reversed.lookup(0.0).expect("low"), Rgba::RED);
    }

    #[test]
    fn continuous_map_validation() {
        assert_eq!(
            ColorTable::build(&ColorMap::named("viridis")),
            Err(ConfigError::MissingColorBounds)
        );
        assert!(matches!(
            ColorTable::build(&ColorMap::named("nope").with_bounds(0.0, 1.0)),
            Err(ConfigError::InvalidColorMap(_))
        ));
        assert!(matches!(
            ColorTable::build(&ColorMap::named("viridis").with_bounds(3.0, 3.0)),
            Err(ConfigError::InvalidColorBounds { .. })
        ));
        assert_eq!(
            ColorTable::build(&ColorMap::named("viridis").with_bounds(0.0, 1e12)),
            Err(ConfigError::InvalidColorBounds {
                vmin: 0.0,
                vmax: 1e12
            })
        );
        assert!(
            ColorTable::build(&ColorMap::named("viridis").with_bounds(0.0, MAX_TABLE_SPAN)).is_ok()
        );
    }

    #[test]
    fn categorical_lookup_is_direct() {
        let table = ColorTable::build(&ColorMap::categorical([(0, "blue"), (1, "orange")]))
            .expect("categorical");
        assert_eq!(table.lookup(1.0).expect("orange"), Rgba::ORANGE);
        assert_eq!(table.lookup(2.0), Err(StyleError::UnknownCategory(2)));
        assert!(matches!(
            ColorTable::build(&ColorMap::categorical([(0, "mauve-ish")])),
            Err(ConfigError::Color(StyleError::UnknownColor(_)))
        ));
    }
}
