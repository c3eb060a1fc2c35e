// GDI object management
//
// Pens, brushes, fonts and bitmaps live in a single object table and are
// referred to everywhere else by `ObjectId`. Device contexts store ids, not
// objects, so one object can be selected into several contexts and deleting
// it is well defined: the entry disappears and every holder falls back to a
// default of the same kind.

use super::bitmap::Bitmap;
use super::color::Color;
use crate::common::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Pen styles from GDI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum PenStyle {
    #[default]
    Solid = 0,
    Dash = 1,
    Dot = 2,
    DashDot = 3,
    DashDotDot = 4,
    Null = 5,
    InsideFrame = 6,
}

impl PenStyle {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value & 0xFF {
            0 => Some(Self::Solid),
            1 => Some(Self::Dash),
            2 => Some(Self::Dot),
            3 => Some(Self::DashDot),
            4 => Some(Self::DashDotDot),
            5 => Some(Self::Null),
            6 => Some(Self::InsideFrame),
            _ => None,
        }
    }

    /// Dash intervals in device pixels, `None` for continuous strokes.
    pub fn dash_pattern(self) -> Option<&'static [f32]> {
        match self {
            Self::Solid | Self::InsideFrame | Self::Null => None,
            Self::Dash => Some(&[5.0, 5.0]),
            Self::Dot => Some(&[2.0, 2.0]),
            Self::DashDot => Some(&[5.0, 2.0, 2.0, 2.0]),
            Self::DashDotDot => Some(&[5.0, 2.0, 2.0, 2.0, 2.0, 2.0]),
        }
    }
}

/// Brush styles from GDI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum BrushStyle {
    #[default]
    Solid = 0,
    Null = 1,
    Hatched = 2,
}

impl BrushStyle {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Solid),
            1 => Some(Self::Null),
            2 => Some(Self::Hatched),
            _ => None,
        }
    }
}

/// Hatch styles from GDI.
///
/// Only the first six have a synthesized tile; the rest fill flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum HatchStyle {
    #[default]
    Horizontal = 0,
    Vertical = 1,
    ForwardDiagonal = 2,
    BackwardDiagonal = 3,
    Cross = 4,
    DiagonalCross = 5,
    Solid = 6,
    Dense1 = 7,
    Dense2 = 8,
    Dense3 = 9,
    Dense4 = 10,
    Dense5 = 11,
    Dense6 = 12,
    Gradient = 13,
}

impl HatchStyle {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Horizontal),
            1 => Some(Self::Vertical),
            2 => Some(Self::ForwardDiagonal),
            3 => Some(Self::BackwardDiagonal),
            4 => Some(Self::Cross),
            5 => Some(Self::DiagonalCross),
            6 => Some(Self::Solid),
            7 => Some(Self::Dense1),
            8 => Some(Self::Dense2),
            9 => Some(Self::Dense3),
            10 => Some(Self::Dense4),
            11 => Some(Self::Dense5),
            12 => Some(Self::Dense6),
            13 => Some(Self::Gradient),
            _ => None,
        }
    }
}

/// Pen object for stroking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pen {
    pub style: PenStyle,
    pub width: u32,
    pub color: Color,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            style: PenStyle::Solid,
            width: 1,
            color: Color::BLACK,
        }
    }
}

impl Pen {
    pub fn new(style: PenStyle, width: u32, color: Color) -> Self {
        Self {
            style,
            width,
            color,
        }
    }

    /// Width actually rasterized; GDI draws width 0 as a single pixel.
    pub fn device_width(&self) -> u32 {
        self.width.max(1)
    }
}

/// Brush object for filling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brush {
    pub style: BrushStyle,
    pub color: Color,
    pub hatch: HatchStyle, // only read when style is Hatched
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            style: BrushStyle::Solid,
            color: Color::WHITE,
            hatch: HatchStyle::Horizontal,
        }
    }
}

impl Brush {
    pub fn new(style: BrushStyle, color: Color, hatch: HatchStyle) -> Self {
        Self {
            style,
            color,
            hatch,
        }
    }

    pub fn solid(color: Color) -> Self {
        Self::new(BrushStyle::Solid, color, HatchStyle::Horizontal)
    }

    pub fn hatched(hatch: HatchStyle, color: Color) -> Self {
        Self::new(BrushStyle::Hatched, color, hatch)
    }

    pub fn null() -> Self {
        Self::new(BrushStyle::Null, Color::WHITE, HatchStyle::Horizontal)
    }
}

/// Font object for text rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Font {
    pub face: String,
    pub size: u32, // pixels
    pub weight: u16,
    pub italic: bool,
    pub underline: bool,
    pub strikeout: bool,
}

impl Default for Font {
    fn default() -> Self {
        Self::new("Arial", 12, 400)
    }
}

impl Font {
    pub const NORMAL: u16 = 400;
    pub const BOLD: u16 = 700;

    pub fn new(face: impl Into<String>, size: u32, weight: u16) -> Self {
        Self {
            face: face.into(),
            size,
            weight,
            italic: false,
            underline: false,
            strikeout: false,
        }
    }

    pub fn bold(face: impl Into<String>, size: u32) -> Self {
        Self::new(face, size, Self::BOLD)
    }

    pub fn italic(face: impl Into<String>, size: u32) -> Self {
        Self {
            italic: true,
            ..Self::new(face, size, Self::NORMAL)
        }
    }
}

/// Kind of a selectable object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObjectKind {
    Pen = 0,
    Brush = 1,
    Font = 2,
    Bitmap = 3,
}

impl TryFrom<u8> for ObjectKind {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Pen),
            1 => Ok(Self::Brush),
            2 => Ok(Self::Font),
            3 => Ok(Self::Bitmap),
            other => Err(Error::UnsupportedResource(other)),
        }
    }
}

/// GDI object variants
#[derive(Debug, Clone)]
pub enum GdiObject {
    Pen(Pen),
    Brush(Brush),
    Font(Font),
    Bitmap(Bitmap),
}

impl GdiObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Pen(_) => ObjectKind::Pen,
            Self::Brush(_) => ObjectKind::Brush,
            Self::Font(_) => ObjectKind::Font,
            Self::Bitmap(_) => ObjectKind::Bitmap,
        }
    }
}

/// Opaque object handle.
///
/// Handles come from a monotonically increasing counter and are never handed
/// out twice by the same table. Zero is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    object: GdiObject,
    stock: bool,
}

/// GDI object table
///
/// Objects are created with `create`, looked up by handle and removed with
/// `remove`. Stock objects carry a flag so ordinary cleanup can skip them.
#[derive(Debug, Clone)]
pub struct ObjectTable {
    objects: HashMap<ObjectId, Entry>,
    next_id: u32,
}

impl ObjectTable {
    /// Create new empty object table
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            next_id: 1,
        }
    }

    /// Create object and return its handle
    pub fn create(&mut self, object: GdiObject) -> Result<ObjectId, Error> {
        self.insert(object, false)
    }

    /// Create an object that is flagged as stock from the start
    pub fn create_stock(&mut self, object: GdiObject) -> Result<ObjectId, Error> {
        self.insert(object, true)
    }

    fn insert(&mut self, object: GdiObject, stock: bool) -> Result<ObjectId, Error> {
        // Handles are never reused, so running out is final
        let id = ObjectId(self.next_id);
        self.next_id = self.next_id.checked_add(1).ok_or(Error::HandlesExhausted)?;
        log::trace!("object {} created as {:?} (stock={})", id, object.kind(), stock);
        self.objects.insert(id, Entry { object, stock });
        Ok(id)
    }

    /// Flag an object as stock. Returns false for unknown handles.
    pub fn mark_stock(&mut self, id: ObjectId) -> bool {
        match self.objects.get_mut(&id) {
            Some(entry) => {
                entry.stock = true;
                true
            },
            None => false,
        }
    }

    pub fn is_stock(&self, id: ObjectId) -> bool {
        self.objects.get(&id).is_some_and(|entry| entry.stock)
    }

    /// Get object by handle
    pub fn get(&self, id: ObjectId) -> Option<&GdiObject> {
        self.objects.get(&id).map(|entry| &entry.object)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut GdiObject> {
        self.objects.get_mut(&id).map(|entry| &mut entry.object)
    }

    pub fn kind(&self, id: ObjectId) -> Option<ObjectKind> {
        self.get(id).map(GdiObject::kind)
    }

    pub fn pen(&self, id: ObjectId) -> Option<&Pen> {
        match self.get(id) {
            Some(GdiObject::Pen(pen)) => Some(pen),
            _ => None,
        }
    }

    pub fn brush(&self, id: ObjectId) -> Option<&Brush> {
        match self.get(id) {
            Some(GdiObject::Brush(brush)) => Some(brush),
            _ => None,
        }
    }

    pub fn font(&self, id: ObjectId) -> Option<&Font> {
        match self.get(id) {
            Some(GdiObject::Font(font)) => Some(font),
            _ => None,
        }
    }

    pub fn bitmap(&self, id: ObjectId) -> Option<&Bitmap> {
        match self.get(id) {
            Some(GdiObject::Bitmap(bitmap)) => Some(bitmap),
            _ => None,
        }
    }

    pub fn bitmap_mut(&mut self, id: ObjectId) -> Option<&mut Bitmap> {
        match self.get_mut(id) {
            Some(GdiObject::Bitmap(bitmap)) => Some(bitmap),
            _ => None,
        }
    }

    /// Delete object by handle
    pub fn remove(&mut self, id: ObjectId) -> Option<GdiObject> {
        self.objects.remove(&id).map(|entry| entry.object)
    }

    /// Check if handle exists
    pub fn exists(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for ObjectTable {
    fn default() -> Self {
        Self::new()
    }
}
