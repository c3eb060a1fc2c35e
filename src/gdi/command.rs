//! Command protocol surface
//!
//! Recorded drawing streams are sequences of opcodes. This module maps each
//! opcode to a typed [`Command`] and each command to the session operation it
//! stands for. Byte-level framing of the stream is left to the transport.

use super::color::Color;
use super::dib::IndexedLayout;
use super::objects::{BrushStyle, HatchStyle, ObjectId, PenStyle};
use super::rop::RasterOp;
use super::session::{DcId, GdiSession};
use super::state::{DcState, Point};
use crate::common::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Wire opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Text = 0x01,
    Line = 0x02,
    Rect = 0x03,
    Ellipse = 0x04,
    BitBlt = 0x05,
    SetDibits = 0x06,
    CreatePen = 0x10,
    CreateBrush = 0x11,
    SelectObject = 0x12,
    MoveTo = 0x13,
    DeleteObject = 0x14,
    DcState = 0x15,
    SetRop2 = 0x16,
    SetPixel = 0x18,
    CreateDc = 0x20,
    CreateBitmap = 0x21,
    DeleteDc = 0x22,
    FrameEnd = 0xFF,
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        Ok(match byte {
            0x01 => Self::Text,
            0x02 => Self::Line,
            0x03 => Self::Rect,
            0x04 => Self::Ellipse,
            0x05 => Self::BitBlt,
            0x06 => Self::SetDibits,
            0x10 => Self::CreatePen,
            0x11 => Self::CreateBrush,
            0x12 => Self::SelectObject,
            0x13 => Self::MoveTo,
            0x14 => Self::DeleteObject,
            0x15 => Self::DcState,
            0x16 => Self::SetRop2,
            0x18 => Self::SetPixel,
            0x20 => Self::CreateDc,
            0x21 => Self::CreateBitmap,
            0x22 => Self::DeleteDc,
            0xFF => Self::FrameEnd,
            other => return Err(Error::UnknownOpcode(other)),
        })
    }
}

/// A decoded command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    TextOut {
        hdc: DcId,
        x: i32,
        y: i32,
        text: String,
    },
    /// Line from the current position, which then moves to (x, y).
    LineTo { hdc: DcId, x: i32, y: i32 },
    Rectangle {
        hdc: DcId,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    },
    Ellipse {
        hdc: DcId,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    },
    BitBlt {
        hdc: DcId,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        src: DcId,
        src_x: i32,
        src_y: i32,
        rop: RasterOp,
    },
    SetDibits {
        hdc: DcId,
        x: i32,
        y: i32,
        info: Vec<u8>,
        bits: Vec<u8>,
        layout: IndexedLayout,
    },
    CreatePen {
        style: PenStyle,
        width: u32,
        color: Color,
    },
    CreateBrush {
        style: BrushStyle,
        color: Color,
        hatch: HatchStyle,
    },
    SelectObject { hdc: DcId, object: ObjectId },
    /// Selection carrying the object's kind tag, checked before selecting.
    SelectTagged { hdc: DcId, kind: u8, object: ObjectId },
    MoveTo { hdc: DcId, x: i32, y: i32 },
    DeleteObject { object: ObjectId },
    GetDcState { hdc: DcId },
    SetDcState { hdc: DcId, state: DcState },
    SetRop2 { hdc: DcId, rop: RasterOp },
    SetPixel { hdc: DcId, x: i32, y: i32, color: Color },
    CreateDc { reference: Option<DcId> },
    CreateBitmap { width: u32, height: u32 },
    DeleteDc { hdc: DcId },
    FrameEnd,
}

impl Command {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::TextOut { .. } => Opcode::Text,
            Self::LineTo { .. } => Opcode::Line,
            Self::Rectangle { .. } => Opcode::Rect,
            Self::Ellipse { .. } => Opcode::Ellipse,
            Self::BitBlt { .. } => Opcode::BitBlt,
            Self::SetDibits { .. } => Opcode::SetDibits,
            Self::CreatePen { .. } => Opcode::CreatePen,
            Self::CreateBrush { .. } => Opcode::CreateBrush,
            Self::SelectObject { .. } | Self::SelectTagged { .. } => Opcode::SelectObject,
            Self::MoveTo { .. } => Opcode::MoveTo,
            Self::DeleteObject { .. } => Opcode::DeleteObject,
            Self::GetDcState { .. } | Self::SetDcState { .. } => Opcode::DcState,
            Self::SetRop2 { .. } => Opcode::SetRop2,
            Self::SetPixel { .. } => Opcode::SetPixel,
            Self::CreateDc { .. } => Opcode::CreateDc,
            Self::CreateBitmap { .. } => Opcode::CreateBitmap,
            Self::DeleteDc { .. } => Opcode::DeleteDc,
            Self::FrameEnd => Opcode::FrameEnd,
        }
    }
}

/// Result of executing a command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    Done,
    Object(ObjectId),
    /// Handle replaced by a selection; `None` for the private surface.
    Previous(Option<ObjectId>),
    Dc(DcId),
    Point(Point),
    State(DcState),
    RasterOp(RasterOp),
    Color(Color),
    Deleted(bool),
    Frame(u64),
}

impl GdiSession {
    /// Apply one command.
    pub fn execute(&mut self, command: Command) -> Result<Reply> {
        log::trace!("execute {:?}", command.opcode());
        Ok(match command {
            Command::TextOut { hdc, x, y, text } => {
                self.text_out(hdc, x, y, &text)?;
                Reply::Done
            },
            Command::LineTo { hdc, x, y } => {
                self.line_to(hdc, x, y)?;
                Reply::Done
            },
            Command::Rectangle {
                hdc,
                left,
                top,
                right,
                bottom,
            } => {
                self.rectangle(hdc, left, top, right, bottom)?;
                Reply::Done
            },
            Command::Ellipse {
                hdc,
                left,
                top,
                right,
                bottom,
            } => {
                self.ellipse(hdc, left, top, right, bottom)?;
                Reply::Done
            },
            Command::BitBlt {
                hdc,
                x,
                y,
                width,
                height,
                src,
                src_x,
                src_y,
                rop,
            } => {
                self.bit_blt(hdc, x, y, width, height, src, src_x, src_y, rop)?;
                Reply::Done
            },
            Command::SetDibits {
                hdc,
                x,
                y,
                info,
                bits,
                layout,
            } => {
                self.set_dibits(hdc, x, y, &info, &bits, &layout)?;
                Reply::Done
            },
            Command::CreatePen { style, width, color } => Reply::Object(self.create_pen(style, width, color)?),
            Command::CreateBrush { style, color, hatch } => {
                Reply::Object(self.create_brush(style, color, hatch)?)
            },
            Command::SelectObject { hdc, object } => Reply::Previous(self.select_object(hdc, object)?),
            Command::SelectTagged { hdc, kind, object } => {
                Reply::Previous(self.select_tagged(hdc, kind, object)?)
            },
            Command::MoveTo { hdc, x, y } => Reply::Point(self.move_to(hdc, x, y)?),
            Command::DeleteObject { object } => Reply::Deleted(self.delete_object(object)),
            Command::GetDcState { hdc } => Reply::State(self.get_dc_state(hdc)?),
            Command::SetDcState { hdc, state } => {
                self.set_dc_state(hdc, state)?;
                Reply::Done
            },
            Command::SetRop2 { hdc, rop } => Reply::RasterOp(self.dc_mut(hdc)?.set_rop2(rop)),
            Command::SetPixel { hdc, x, y, color } => Reply::Color(self.set_pixel(hdc, x, y, color)?),
            Command::CreateDc { reference } => Reply::Dc(self.create_dc(reference)?),
            Command::CreateBitmap { width, height } => Reply::Object(self.create_bitmap(width, height)?),
            Command::DeleteDc { hdc } => {
                self.delete_dc(hdc)?;
                Reply::Done
            },
            Command::FrameEnd => Reply::Frame(self.frame_end()),
        })
    }
}
