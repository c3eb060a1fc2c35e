// GDI-style device context emulation
//
// Pens, brushes, fonts and bitmaps are created in a session and selected
// into device contexts; drawing primitives then replay onto in-memory
// tiny-skia surfaces following the classic GDI state model (binary raster
// operations, background modes, text alignment, window/viewport origins).
//
// References:
// - [MS-WMF] and [MS-EMF] for the object and mode semantics
// - https://learn.microsoft.com/en-us/windows/win32/gdi/device-contexts

pub mod bitmap;
pub mod color;
pub mod command;
pub mod device_context;
pub mod dib;
pub mod hatch;
pub mod objects;
pub mod rop;
pub mod session;
pub mod state;
pub mod text;

pub use bitmap::Bitmap;
pub use color::Color;
pub use command::{Command, Opcode, Reply};
pub use device_context::{DeviceContext, Selection};
pub use dib::IndexedLayout;
pub use objects::{
    Brush, BrushStyle, Font, GdiObject, HatchStyle, ObjectId, ObjectKind, ObjectTable, Pen,
    PenStyle,
};
pub use rop::RasterOp;
pub use session::{DcId, GdiSession, SessionOptions, StockObject};
pub use state::{BkMode, DcState, MapMode, Point, PolyFillMode, StretchMode, TextAlign};
