// Packed RGB colors
//
// Colors travel through the engine as 24-bit `0x00RRGGBB` values. GDI's own
// COLORREF layout (`0x00BBGGRR`) is only seen at the edges, so conversions
// to and from it are kept here next to the rasterizer conversions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 24-bit RGB color packed as `0x00RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0x000000);
    pub const WHITE: Color = Color(0xFFFFFF);

    /// Pack three channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub const fn red(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub const fn green(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    pub const fn blue(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Convert from a GDI COLORREF (`0x00BBGGRR`).
    pub const fn from_colorref(colorref: u32) -> Self {
        let r = (colorref & 0xFF) as u8;
        let g = ((colorref >> 8) & 0xFF) as u8;
        let b = ((colorref >> 16) & 0xFF) as u8;
        Self::rgb(r, g, b)
    }

    /// Convert to a GDI COLORREF (`0x00BBGGRR`).
    pub const fn to_colorref(self) -> u32 {
        ((self.blue() as u32) << 16) | ((self.green() as u32) << 8) | self.red() as u32
    }

    /// Lowercase `#rrggbb` form.
    pub fn to_hex(self) -> String {
        format!("#{:06x}", self.0 & 0x00FF_FFFF)
    }

    /// Opaque rasterizer color.
    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.red(), self.green(), self.blue(), 255)
    }

    /// Opaque premultiplied pixel.
    pub fn to_pixel(self) -> tiny_skia::PremultipliedColorU8 {
        tiny_skia::ColorU8::from_rgba(self.red(), self.green(), self.blue(), 255).premultiply()
    }
}

impl From<u32> for Color {
    fn from(value: u32) -> Self {
        Self(value & 0x00FF_FFFF)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
