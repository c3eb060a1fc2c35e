//! gdi-canvas - Stateful GDI-style device contexts on a software rasterizer
//!
//! This library replays recorded sequences of GDI drawing calls (lines,
//! rectangles, ellipses, text, block copies, pixel writes) onto in-memory
//! pixel surfaces and exports the result as PNG, raw RGBA or a data URL.
//!
//! # Features
//!
//! - **Device contexts**: selected pen/brush/font/bitmap, background and text
//!   modes, window/viewport origins, SaveDC/RestoreDC
//! - **Raster operations**: all sixteen binary ROP2 modes, computed per pixel
//! - **Indexed DIBs**: bit-exact 1/4/8 bpp palette decoding
//! - **Hatch brushes**: synthesized 8x8 pattern tiles
//! - **Command protocol**: typed opcodes mapped onto session operations
//!
//! # Example
//!
//! ```no_run
//! use gdi_canvas::gdi::{Color, GdiSession, HatchStyle, BrushStyle, PenStyle};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = GdiSession::new();
//! let hdc = session.create_dc(None)?;
//!
//! let pen = session.create_pen(PenStyle::Dash, 1, Color::rgb(0, 0, 255))?;
//! let brush = session.create_brush(BrushStyle::Hatched, Color::rgb(255, 0, 0), HatchStyle::Cross)?;
//! session.select_object(hdc, pen)?;
//! session.select_object(hdc, brush)?;
//!
//! session.rectangle(hdc, 10, 10, 200, 120)?;
//! session.text_out(hdc, 20, 160, "Hello, GDI")?;
//!
//! std::fs::write("out.png", session.export_png(hdc)?)?;
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod gdi;

pub use common::{Error, Result};
pub use gdi::{DcId, GdiSession, ObjectId};
