// Math8 module - 8-bit fixed point helpers shared by patterns and overlays

use std::f32::consts::PI;

/// Scales `value` by `scale/256`, where a scale of 255 leaves the value unchanged.
#[inline]
pub fn scale8(value: u8, scale: u8) -> u8 {
    ((value as u16 * (1 + scale as u16)) >> 8) as u8
}

#[inline]
pub fn qadd8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

/// Triangle wave: 0 -> 254 -> 0 across one byte of phase.
#[inline]
pub fn triwave8(phase: u8) -> u8 {
    let folded = if phase & 0x80 != 0 { 255 - phase } else { phase };
    folded << 1
}

/// Sine over one byte of phase, offset so the output spans 0..=255.
pub fn sin8(phase: u8) -> u8 {
    let angle = phase as f32 / 256.0 * 2.0 * PI;
    ((angle.sin() + 1.0) * 127.5).round().clamp(0.0, 255.0) as u8
}

/// Interpolates from `a` to `b` by `frac/65536`.
#[inline]
pub fn lerp16by16(a: u16, b: u16, frac: u16) -> u16 {
    if b >= a {
        a + (((b - a) as u32 * frac as u32) >> 16) as u16
    } else {
        a - (((a - b) as u32 * frac as u32) >> 16) as u16
    }
}

/// Blends `overlay` over `existing` by `amount`; 0 keeps existing, 255 takes overlay.
#[inline]
pub fn blend8(existing: u8, overlay: u8, amount: u8) -> u8 {
    match amount {
        0 => existing,
        255 => overlay,
        _ => {
            let mixed = existing as u16 * (255 - amount as u16) + overlay as u16 * amount as u16;
            ((mixed + 1 + (mixed >> 8)) >> 8) as u8
        }
    }
}
