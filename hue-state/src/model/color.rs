//! Light color state
//!
//! A color holds three representations (temperature, hue/saturation and
//! CIE xy) but only the one named by `mode` is live. The others keep their
//! last values so relative edits have a starting point. Fields are private:
//! every setter switches the mode and drops the cached RGB.

use std::sync::OnceLock;

pub use hue_api::{MIREK_MAX, MIREK_MIN};

/// Neutral white used when a light has never reported a temperature
pub const DEFAULT_MIREK: u16 = 326;

/// Full hue circle in bridge units
pub const HUE_MAX: u16 = 65535;

/// Maximum saturation in bridge units
pub const SATURATION_MAX: u8 = 254;

/// D65 white point, used when chromaticity is undefined
const WHITE_XY: (f64, f64) = (0.3127, 0.3290);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    None,
    ColorTemp,
    HueSat,
    Xy,
}

/// 8-bit sRGB triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    /// `#RRGGBB`
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Color {
    mode: ColorMode,
    mirek: u16,
    hue: u16,
    saturation: u8,
    x: f64,
    y: f64,
    rgb: OnceLock<Rgb>,
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.mode == other.mode
            && self.mirek == other.mirek
            && self.hue == other.hue
            && self.saturation == other.saturation
            && self.x == other.x
            && self.y == other.y
    }
}

impl Color {
    pub fn from_mirek(mirek: u16) -> Self {
        let mut color = Self::default();
        color.set_mirek(mirek);
        color
    }

    pub fn from_xy(x: f64, y: f64) -> Self {
        let mut color = Self::default();
        color.set_xy(x, y);
        color
    }

    pub fn from_hue_sat(hue: u16, saturation: u8) -> Self {
        let mut color = Self::default();
        color.set_hue_sat(hue, saturation);
        color
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Temperature, only while in temperature mode
    pub fn mirek(&self) -> Option<u16> {
        (self.mode == ColorMode::ColorTemp).then_some(self.mirek)
    }

    /// Chromaticity, only while in xy mode
    pub fn xy(&self) -> Option<(f64, f64)> {
        (self.mode == ColorMode::Xy).then_some((self.x, self.y))
    }

    /// Hue and saturation, only while in hue/saturation mode
    pub fn hue_sat(&self) -> Option<(u16, u8)> {
        (self.mode == ColorMode::HueSat).then_some((self.hue, self.saturation))
    }

    /// Last temperature written, whatever the live mode; 0 if never set
    pub fn stored_mirek(&self) -> u16 {
        self.mirek
    }

    /// Last hue and saturation written, whatever the live mode
    pub fn stored_hue_sat(&self) -> (u16, u8) {
        (self.hue, self.saturation)
    }

    /// Starting point for a relative hue or saturation edit
    ///
    /// Uses the stored pair while the live color is still the one it
    /// produced, otherwise derives it from the preview color.
    pub fn editable_hue_sat(&self) -> (u16, u8) {
        match self.mode {
            ColorMode::HueSat => (self.hue, self.saturation),
            ColorMode::Xy => {
                let (x, y) = hs_to_xy(self.hue, self.saturation);
                if (x - self.x).abs() < 1e-6 && (y - self.y).abs() < 1e-6 {
                    (self.hue, self.saturation)
                } else {
                    rgb_to_hue_sat(self.rgb())
                }
            }
            _ => rgb_to_hue_sat(self.rgb()),
        }
    }

    /// Switch to temperature mode
    ///
    /// Returns true if anything changed.
    pub fn set_mirek(&mut self, mirek: u16) -> bool {
        let changed = self.mode != ColorMode::ColorTemp || self.mirek != mirek;
        self.mirek = mirek;
        self.mode = ColorMode::ColorTemp;
        self.invalidate();
        changed
    }

    /// Switch to xy mode
    pub fn set_xy(&mut self, x: f64, y: f64) -> bool {
        let changed = self.mode != ColorMode::Xy || self.x != x || self.y != y;
        self.x = x;
        self.y = y;
        self.mode = ColorMode::Xy;
        self.invalidate();
        changed
    }

    /// Switch to hue/saturation mode
    pub fn set_hue_sat(&mut self, hue: u16, saturation: u8) -> bool {
        let saturation = saturation.min(SATURATION_MAX);
        let changed =
            self.mode != ColorMode::HueSat || self.hue != hue || self.saturation != saturation;
        self.hue = hue;
        self.saturation = saturation;
        self.mode = ColorMode::HueSat;
        self.invalidate();
        changed
    }

    /// Record a hue/saturation edit and switch to xy mode with its
    /// chromaticity, which is what the bridge will report back
    pub fn set_hue_sat_as_xy(&mut self, hue: u16, saturation: u8) -> (f64, f64) {
        let saturation = saturation.min(SATURATION_MAX);
        let (x, y) = hs_to_xy(hue, saturation);
        self.hue = hue;
        self.saturation = saturation;
        self.set_xy(x, y);
        (x, y)
    }

    /// Preview color at full brightness, derived from the live mode
    pub fn rgb(&self) -> Rgb {
        *self.rgb.get_or_init(|| match self.mode {
            ColorMode::ColorTemp => mirek_to_rgb(self.mirek),
            ColorMode::HueSat => hsv_to_rgb(self.hue, self.saturation),
            ColorMode::Xy => xy_to_rgb(self.x, self.y),
            ColorMode::None => Rgb::WHITE,
        })
    }

    pub fn hex(&self) -> String {
        self.rgb().hex()
    }

    fn invalidate(&mut self) {
        self.rgb = OnceLock::new();
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn to_byte(unit: f64) -> u8 {
    (unit.clamp(0.0, 1.0) * 255.0) as u8
}

/// Hue (0..=65535) and saturation (0..=254) at full value
pub fn hsv_to_rgb(hue: u16, saturation: u8) -> Rgb {
    let s = f64::from(saturation) / f64::from(SATURATION_MAX);
    if s == 0.0 {
        return Rgb::WHITE;
    }

    let h = (f64::from(hue) / f64::from(HUE_MAX) * 360.0) % 360.0 / 60.0;
    let sector = h.floor();
    let f = h - sector;
    let (v, p, q, t) = (1.0, 1.0 - s, 1.0 - s * f, 1.0 - s * (1.0 - f));

    let (r, g, b) = match sector as u8 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    Rgb {
        r: to_byte(r),
        g: to_byte(g),
        b: to_byte(b),
    }
}

/// CIE xy at full luminance through the Wide RGB D65 matrix
pub fn xy_to_rgb(x: f64, y: f64) -> Rgb {
    if y <= 0.0 {
        return Rgb::WHITE;
    }

    let luminance = 1.0;
    let big_x = luminance / y * x;
    let big_z = luminance / y * (1.0 - x - y);

    let r = big_x * 1.656492 - luminance * 0.354851 - big_z * 0.255038;
    let g = -big_x * 0.707196 + luminance * 1.655397 + big_z * 0.036152;
    let b = big_x * 0.051713 - luminance * 0.121364 + big_z * 1.011530;

    // Normalize so the brightest channel is 1 before gamma
    let max = r.max(g).max(b);
    let (r, g, b) = if max > 1.0 {
        (r / max, g / max, b / max)
    } else {
        (r, g, b)
    };

    Rgb {
        r: to_byte(reverse_gamma(r)),
        g: to_byte(reverse_gamma(g)),
        b: to_byte(reverse_gamma(b)),
    }
}

/// Black-body approximation for a temperature in mirek
pub fn mirek_to_rgb(mirek: u16) -> Rgb {
    if mirek == 0 {
        return Rgb::WHITE;
    }
    let temp = 1_000_000.0 / f64::from(mirek) / 100.0;

    let r = if temp <= 66.0 {
        255.0
    } else {
        329.698727446 * (temp - 60.0).powf(-0.1332047592)
    };
    let g = if temp <= 66.0 {
        99.4708025861 * temp.ln() - 161.1195681661
    } else {
        288.1221695283 * (temp - 60.0).powf(-0.0755148492)
    };
    let b = if temp >= 66.0 {
        255.0
    } else if temp <= 19.0 {
        0.0
    } else {
        138.5177312231 * (temp - 10.0).ln() - 305.0447927307
    };

    Rgb {
        r: r.clamp(0.0, 255.0) as u8,
        g: g.clamp(0.0, 255.0) as u8,
        b: b.clamp(0.0, 255.0) as u8,
    }
}

/// sRGB to CIE xy
pub fn rgb_to_xy(rgb: Rgb) -> (f64, f64) {
    let r = apply_gamma(f64::from(rgb.r) / 255.0);
    let g = apply_gamma(f64::from(rgb.g) / 255.0);
    let b = apply_gamma(f64::from(rgb.b) / 255.0);

    let big_x = r * 0.664511 + g * 0.154324 + b * 0.162028;
    let big_y = r * 0.283881 + g * 0.668433 + b * 0.047685;
    let big_z = r * 0.000088 + g * 0.072310 + b * 0.986039;

    let sum = big_x + big_y + big_z;
    if sum == 0.0 {
        return WHITE_XY;
    }
    (big_x / sum, big_y / sum)
}

/// sRGB to hue (0..=65535) and saturation (0..=254)
pub fn rgb_to_hue_sat(rgb: Rgb) -> (u16, u8) {
    let r = f64::from(rgb.r) / 255.0;
    let g = f64::from(rgb.g) / 255.0;
    let b = f64::from(rgb.b) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    if max == 0.0 || delta == 0.0 {
        return (0, 0);
    }

    let degrees = if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let saturation = delta / max;

    (
        (degrees / 360.0 * f64::from(HUE_MAX)).round() as u16,
        (saturation * f64::from(SATURATION_MAX)).round() as u8,
    )
}

/// Hue/saturation to the xy target sent to the bridge
pub fn hs_to_xy(hue: u16, saturation: u8) -> (f64, f64) {
    let s = f64::from(saturation.min(SATURATION_MAX)) / f64::from(SATURATION_MAX);
    let h = f64::from(hue) / f64::from(HUE_MAX) * 360.0;

    let chroma = s;
    let secondary = chroma * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = 1.0 - chroma;

    let (r, g, b) = match (h / 60.0) as u32 % 6 {
        0 => (chroma, secondary, 0.0),
        1 => (secondary, chroma, 0.0),
        2 => (0.0, chroma, secondary),
        3 => (0.0, secondary, chroma),
        4 => (secondary, 0.0, chroma),
        _ => (chroma, 0.0, secondary),
    };
    let (r, g, b) = (apply_gamma(r + m), apply_gamma(g + m), apply_gamma(b + m));

    let big_x = r * 0.664511 + g * 0.154324 + b * 0.162028;
    let big_y = r * 0.283881 + g * 0.668433 + b * 0.047685;
    let big_z = r * 0.000088 + g * 0.072310 + b * 0.986039;

    let sum = big_x + big_y + big_z;
    if sum == 0.0 {
        return WHITE_XY;
    }
    (big_x / sum, big_y / sum)
}

fn apply_gamma(value: f64) -> f64 {
    if value > 0.04045 {
        ((value + 0.055) / 1.055).powf(2.4)
    } else {
        value / 12.92
    }
}

fn reverse_gamma(value: f64) -> f64 {
    if value <= 0.0031308 {
        12.92 * value
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}
