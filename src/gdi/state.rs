// Device context state
//
// Everything a device context remembers between calls lives in one `Copy`
// record so it can be captured and restored in a single assignment. Drawing
// never reads mode flags from anywhere else.

use super::color::Color;
use super::objects::ObjectId;
use super::rop::RasterOp;
use serde::{Deserialize, Serialize};

/// Integer point in logical or device space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Background mix mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum BkMode {
    Transparent = 1,
    Opaque = 2,
}

impl BkMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Transparent),
            2 => Some(Self::Opaque),
            _ => None,
        }
    }
}

/// Horizontal text anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum TextAlign {
    Left = 0x0000,
    Right = 0x0002,
    Center = 0x0006,
}

impl TextAlign {
    /// Decode a TA_* flag word; vertical and reading-order bits are ignored.
    pub fn from_u32(value: u32) -> Self {
        if value & 0x0006 == 0x0006 {
            Self::Center
        } else if value & 0x0002 == 0x0002 {
            Self::Right
        } else {
            Self::Left
        }
    }

    /// Fraction of the advance width the anchor sits at.
    pub fn anchor_fraction(self) -> f32 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5,
            Self::Right => 1.0,
        }
    }
}

/// Logical-to-device mapping mode. Tracked only; mapping is always 1:1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum MapMode {
    Text = 1,
    LoMetric = 2,
    HiMetric = 3,
    LoEnglish = 4,
    HiEnglish = 5,
    Twips = 6,
    Isotropic = 7,
    Anisotropic = 8,
}

impl MapMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Text),
            2 => Some(Self::LoMetric),
            3 => Some(Self::HiMetric),
            4 => Some(Self::LoEnglish),
            5 => Some(Self::HiEnglish),
            6 => Some(Self::Twips),
            7 => Some(Self::Isotropic),
            8 => Some(Self::Anisotropic),
            _ => None,
        }
    }
}

/// Stretch-blit mode. Tracked only; resampling is always nearest neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum StretchMode {
    BlackOnWhite = 1,
    WhiteOnBlack = 2,
    ColorOnColor = 3,
    Halftone = 4,
}

impl StretchMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::BlackOnWhite),
            2 => Some(Self::WhiteOnBlack),
            3 => Some(Self::ColorOnColor),
            4 => Some(Self::Halftone),
            _ => None,
        }
    }
}

/// Polygon fill mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum PolyFillMode {
    Alternate = 1,
    Winding = 2,
}

impl PolyFillMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Alternate),
            2 => Some(Self::Winding),
            _ => None,
        }
    }

    pub fn to_fill_rule(self) -> tiny_skia::FillRule {
        match self {
            Self::Alternate => tiny_skia::FillRule::EvenOdd,
            Self::Winding => tiny_skia::FillRule::Winding,
        }
    }
}

/// Snapshot of a device context.
///
/// Pen, brush and font are always set; `bitmap` is `None` while the context
/// draws to its private surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcState {
    pub(crate) pen: ObjectId,
    pub(crate) brush: ObjectId,
    pub(crate) font: ObjectId,
    pub(crate) bitmap: Option<ObjectId>,
    pub(crate) raster_op: RasterOp,
    pub(crate) text_color: Color,
    pub(crate) bk_color: Color,
    pub(crate) bk_mode: BkMode,
    pub(crate) text_align: TextAlign,
    pub(crate) map_mode: MapMode,
    pub(crate) viewport_org: Point,
    pub(crate) window_org: Point,
    pub(crate) stretch_mode: StretchMode,
    pub(crate) poly_fill_mode: PolyFillMode,
    pub(crate) current_pos: Point,
}

impl DcState {
    /// Fresh state with the given default selections.
    pub fn new(pen: ObjectId, brush: ObjectId, font: ObjectId) -> Self {
        Self {
            pen,
            brush,
            font,
            bitmap: None,
            raster_op: RasterOp::CopyPen,
            text_color: Color::BLACK,
            bk_color: Color::WHITE,
            bk_mode: BkMode::Opaque,
            text_align: TextAlign::Left,
            map_mode: MapMode::Text,
            viewport_org: Point::default(),
            window_org: Point::default(),
            stretch_mode: StretchMode::BlackOnWhite,
            poly_fill_mode: PolyFillMode::Winding,
            current_pos: Point::default(),
        }
    }

    pub fn pen(&self) -> ObjectId {
        self.pen
    }

    pub fn brush(&self) -> ObjectId {
        self.brush
    }

    pub fn font(&self) -> ObjectId {
        self.font
    }

    pub fn bitmap(&self) -> Option<ObjectId> {
        self.bitmap
    }

    pub fn raster_op(&self) -> RasterOp {
        self.raster_op
    }

    pub fn text_color(&self) -> Color {
        self.text_color
    }

    pub fn bk_color(&self) -> Color {
        self.bk_color
    }

    pub fn bk_mode(&self) -> BkMode {
        self.bk_mode
    }

    pub fn text_align(&self) -> TextAlign {
        self.text_align
    }

    pub fn map_mode(&self) -> MapMode {
        self.map_mode
    }

    pub fn viewport_org(&self) -> Point {
        self.viewport_org
    }

    pub fn window_org(&self) -> Point {
        self.window_org
    }

    pub fn stretch_mode(&self) -> StretchMode {
        self.stretch_mode
    }

    pub fn poly_fill_mode(&self) -> PolyFillMode {
        self.poly_fill_mode
    }

    pub fn current_pos(&self) -> Point {
        self.current_pos
    }

    /// Map a logical point to device space.
    ///
    /// Saturates at the `i32` range so far-off points stay off the surface.
    pub fn to_device(&self, p: Point) -> Point {
        let map = |v: i32, window: i32, viewport: i32| {
            let mapped = i64::from(v) - i64::from(window) + i64::from(viewport);
            mapped.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
        };
        Point {
            x: map(p.x, self.window_org.x, self.viewport_org.x),
            y: map(p.y, self.window_org.y, self.viewport_org.y),
        }
    }
}

/// Saved states for SaveDC/RestoreDC
#[derive(Debug, Clone, Default)]
pub struct DcStateStack {
    stack: Vec<DcState>,
}

impl DcStateStack {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Push a state and return the new depth (the SaveDC level).
    pub fn push(&mut self, state: DcState) -> usize {
        self.stack.push(state);
        self.stack.len()
    }

    pub fn pop(&mut self) -> Option<DcState> {
        self.stack.pop()
    }

    /// Pop to a SaveDC level.
    ///
    /// A positive index names an absolute level; a negative one counts back
    /// from the most recent save. Zero and out-of-range indices leave the
    /// stack untouched.
    pub fn pop_to(&mut self, index: i32) -> Option<DcState> {
        if index < 0 {
            let count = index.unsigned_abs() as usize;
            if count <= self.stack.len() {
                self.stack.truncate(self.stack.len() - count + 1);
                return self.stack.pop();
            }
        } else if index > 0 {
            let level = index as usize;
            if level <= self.stack.len() {
                self.stack.truncate(level);
                return self.stack.pop();
            }
        }
        None
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}
