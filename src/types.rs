// Shared types module - Color values used across the engine

use anyhow::Result;
use colorgrad::Color;
use std::ops::{AddAssign, BitOrAssign};

use crate::math8::{qadd8, scale8};

// Hue landmarks on the 0-255 wheel used by `hsv`
pub const HUE_RED: u8 = 0;
pub const HUE_ORANGE: u8 = 21;
pub const HUE_YELLOW: u8 = 43;
pub const HUE_GREEN: u8 = 85;
pub const HUE_ALIEN_GREEN: u8 = 100;
pub const HUE_AQUA: u8 = 128;
pub const HUE_BLUE: u8 = 170;
pub const HUE_PURPLE: u8 = 192;
pub const HUE_PINK: u8 = 224;

// RGB color representation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.trim().trim_start_matches('#');
        // Byte slicing below needs every byte to be an ASCII hex digit
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            anyhow::bail!("Invalid hex color: {}", hex);
        }
        Ok(Rgb {
            r: u8::from_str_radix(&hex[0..2], 16)?,
            g: u8::from_str_radix(&hex[2..4], 16)?,
            b: u8::from_str_radix(&hex[4..6], 16)?,
        })
    }

    pub fn is_black(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }

    /// White minus this color.
    pub fn complement(&self) -> Rgb {
        Rgb::new(255 - self.r, 255 - self.g, 255 - self.b)
    }

    pub fn scale(&self, amount: u8) -> Rgb {
        Rgb::new(scale8(self.r, amount), scale8(self.g, amount), scale8(self.b, amount))
    }

    /// Hue of this color on the 0-255 wheel; greys report red.
    pub fn hue(&self) -> u8 {
        let (r, g, b) = (self.r as i32, self.g as i32, self.b as i32);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let chroma = max - min;
        if chroma == 0 {
            return HUE_RED;
        }
        // Sector widths of 256/6 on a 0-1536 scale
        let h = if max == r {
            ((g - b) * 256 / chroma).rem_euclid(1536)
        } else if max == g {
            (b - r) * 256 / chroma + 512
        } else {
            (r - g) * 256 / chroma + 1024
        };
        (h / 6) as u8
    }

    pub fn to_packed(&self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn from_packed(value: u32) -> Self {
        Rgb::new((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }
}

/// Hue/saturation/value to RGB on a six-sector wheel.
pub fn hsv(hue: u8, sat: u8, val: u8) -> Rgb {
    if sat == 0 {
        return Rgb::new(val, val, val);
    }
    let region = hue / 43;
    let remainder = ((hue - region * 43) as u16 * 6).min(255);
    let (v, s) = (val as u16, sat as u16);
    let p = (v * (255 - s) >> 8) as u8;
    let q = (v * (255 - ((s * remainder) >> 8)) >> 8) as u8;
    let t = (v * (255 - ((s * (255 - remainder)) >> 8)) >> 8) as u8;
    match region {
        0 => Rgb::new(val, t, p),
        1 => Rgb::new(q, val, p),
        2 => Rgb::new(p, val, t),
        3 => Rgb::new(p, q, val),
        4 => Rgb::new(t, p, val),
        _ => Rgb::new(val, p, q),
    }
}

// Smooth looping gradient through the given colors (first color repeated at the end)
pub fn cyclic_gradient(colors: &[Rgb]) -> Result<colorgrad::Gradient> {
    if colors.len() < 2 {
        anyhow::bail!("A gradient needs at least two colors, got {}", colors.len());
    }
    let mut colorgrad_colors: Vec<Color> = colors
        .iter()
        .map(|rgb| Color::from_rgba8(rgb.r, rgb.g, rgb.b, 255))
        .collect();
    colorgrad_colors.push(Color::from_rgba8(colors[0].r, colors[0].g, colors[0].b, 255));

    let gradient = colorgrad::CustomGradient::new()
        .colors(&colorgrad_colors)
        .interpolation(colorgrad::Interpolation::CatmullRom)
        .build()?;
    Ok(gradient)
}

pub fn gradient_at(gradient: &colorgrad::Gradient, t: f64) -> Rgb {
    let [r, g, b, _] = gradient.at(t.clamp(0.0, 1.0)).to_rgba8();
    Rgb::new(r, g, b)
}

/// RGBA pixel. Alpha is independent of the color channels, so a pixel can be
/// black but opaque or colored but fully transparent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba { r: 0, g: 0, b: 0, a: 0 };

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba { r, g, b, a }
    }

    pub const fn opaque(rgb: Rgb) -> Self {
        Rgba { r: rgb.r, g: rgb.g, b: rgb.b, a: 255 }
    }

    /// Parses `RRGGBB` (opaque) or `RRGGBBAA`.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            anyhow::bail!("Invalid hex color: {}", hex);
        }
        match hex.len() {
            6 => Ok(Rgba::opaque(Rgb::from_hex(hex)?)),
            8 => {
                let rgb = Rgb::from_hex(&hex[0..6])?;
                let a = u8::from_str_radix(&hex[6..8], 16)?;
                Ok(Rgba::new(rgb.r, rgb.g, rgb.b, a))
            }
            _ => anyhow::bail!("Invalid hex color: {}", hex),
        }
    }

    /// Packed as `0xAARRGGBB`.
    pub fn to_packed(&self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn from_packed(value: u32) -> Self {
        Rgba::new((value >> 16) as u8, (value >> 8) as u8, value as u8, (value >> 24) as u8)
    }

    pub fn rgb(&self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }

    pub fn set_rgb(&mut self, rgb: Rgb) {
        self.r = rgb.r;
        self.g = rgb.g;
        self.b = rgb.b;
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Nothing visible: fully transparent, or black.
    pub fn is_dark(&self) -> bool {
        self.a == 0 || self.rgb().is_black()
    }

    pub fn fade_to_black_by(&mut self, amount: u8) {
        let keep = 255 - amount;
        self.r = scale8(self.r, keep);
        self.g = scale8(self.g, keep);
        self.b = scale8(self.b, keep);
    }

    pub fn fade_to_transparent_by(&mut self, amount: u8) {
        self.a = scale8(self.a, 255 - amount);
    }

    /// Fades color and alpha together.
    pub fn decay_by(&mut self, amount: u8) {
        self.fade_to_black_by(amount);
        self.fade_to_transparent_by(amount);
    }
}

impl From<Rgb> for Rgba {
    fn from(rgb: Rgb) -> Self {
        Rgba::opaque(rgb)
    }
}

impl AddAssign for Rgba {
    fn add_assign(&mut self, rhs: Rgba) {
        self.r = qadd8(self.r, rhs.r);
        self.g = qadd8(self.g, rhs.g);
        self.b = qadd8(self.b, rhs.b);
        self.a = qadd8(self.a, rhs.a);
    }
}

impl AddAssign<Rgb> for Rgba {
    fn add_assign(&mut self, rhs: Rgb) {
        *self += Rgba::opaque(rhs);
    }
}

// Lighten: channel-wise max, always opaque afterwards
impl BitOrAssign for Rgba {
    fn bitor_assign(&mut self, rhs: Rgba) {
        self.r = self.r.max(rhs.r);
        self.g = self.g.max(rhs.g);
        self.b = self.b.max(rhs.b);
        self.a = 255;
    }
}

impl PartialEq<u32> for Rgba {
    fn eq(&self, other: &u32) -> bool {
        self.to_packed() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        assert_eq!(Rgba::from_hex("FF8000").unwrap(), Rgba::new(255, 128, 0, 255));
        assert_eq!(Rgba::from_hex("#00FF4080").unwrap(), Rgba::new(0, 255, 64, 128));
        assert!(Rgba::from_hex("FFF").is_err());
        assert!(Rgb::from_hex("GG0000").is_err());
    }

    #[test]
    fn test_hex_rejects_multibyte_and_signs() {
        // Right byte length, but slicing would split the 'é'
        assert!(Rgb::from_hex("a\u{e9}123").is_err());
        assert!(Rgba::from_hex("a\u{e9}123").is_err());
        assert!(Rgba::from_hex("a\u{e9}12345").is_err());
        assert!(Rgba::from_hex("FF00\u{e9}").is_err());
        assert!(Rgb::from_hex("+F+F+F").is_err());
    }

    #[test]
    fn test_packed_equality() {
        let px = Rgba::new(0x12, 0x34, 0x56, 0x78);
        assert!(px == 0x7812_3456u32);
        assert_eq!(Rgba::from_packed(0x7812_3456), px);
        assert!(Rgba::TRANSPARENT == 0u32);
    }

    #[test]
    fn test_add_saturates() {
        let mut px = Rgba::new(200, 10, 0, 0);
        px += Rgb::new(100, 10, 5);
        assert_eq!(px, Rgba::new(255, 20, 5, 255));
    }

    #[test]
    fn test_lighten_forces_opaque() {
        let mut px = Rgba::new(10, 200, 30, 0);
        px |= Rgba::new(50, 100, 0, 0);
        assert_eq!(px, Rgba::new(50, 200, 30, 255));
    }

    #[test]
    fn test_fades_are_independent() {
        let mut px = Rgba::new(255, 255, 255, 255);
        px.fade_to_black_by(255);
        assert!(px.rgb().is_black());
        assert_eq!(px.a, 255);

        let mut px = Rgba::new(255, 0, 0, 255);
        px.fade_to_transparent_by(255);
        assert_eq!(px.r, 255);
        assert_eq!(px.a, 0);
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv(HUE_RED, 255, 255), Rgb::new(255, 0, 0));
        assert_eq!(hsv(0, 0, 77), Rgb::new(77, 77, 77));
        let green = hsv(HUE_GREEN, 255, 255);
        assert!(green.g == 255 && green.r < 16 && green.b < 16);
        let blue = hsv(HUE_BLUE, 255, 255);
        assert!(blue.b == 255 && blue.r < 16 && blue.g < 16);
    }

    #[test]
    fn test_hue_roundtrip_is_close() {
        for hue in [HUE_RED, HUE_YELLOW, HUE_GREEN, HUE_AQUA, HUE_BLUE, HUE_PURPLE] {
            let back = hsv(hue, 255, 255).hue();
            assert!((back as i16 - hue as i16).abs() <= 3, "hue {} came back as {}", hue, back);
        }
    }

    #[test]
    fn test_cyclic_gradient_loops() {
        let grad = cyclic_gradient(&[Rgb::new(255, 0, 0), Rgb::new(0, 0, 255)]).unwrap();
        for t in [0.0, 1.0] {
            let end = gradient_at(&grad, t);
            assert!(end.r >= 250 && end.b <= 5, "{:?} at {}", end, t);
        }
        let middle = gradient_at(&grad, 0.5);
        assert!(middle.b >= 250 && middle.r <= 5, "{:?}", middle);
        assert!(cyclic_gradient(&[Rgb::WHITE]).is_err());
    }

    #[test]
    fn test_complement() {
        assert_eq!(Rgb::new(255, 128, 0).complement(), Rgb::new(0, 127, 255));
    }
}
