//! Serialized expression nodes.
//!
//! Scalar, color, curve and gradient records form a DAG rooted at preset
//! fields; children are referenced only via [`Offset`]s so the whole graph
//! is relocatable. Every record starts with a one-byte kind tag and is
//! unpadded little-endian, decoded through an explicit byte boundary so
//! the wire and flash layout never depends on host memory layout.
//!
//! Unknown tags are not fatal: decoders log and substitute the defined
//! default so a corrupt or newer-format node degrades to "dark" instead
//! of crashing the die.

use crate::buffer::{AnimBuffer, BufferError, ByteReader, FixedRecord, Offset, OffsetArray};
use crate::color::Rgb;

const SCALAR_TAG_U8: u8 = 0;
const SCALAR_TAG_U16: u8 = 1;
const SCALAR_TAG_GLOBAL: u8 = 2;
const SCALAR_TAG_LOOKUP: u8 = 3;
const SCALAR_TAG_UNARY: u8 = 4;
const SCALAR_TAG_BINARY: u8 = 5;

const COLOR_TAG_RGB: u8 = 0;
const COLOR_TAG_PALETTE: u8 = 1;
const COLOR_TAG_LOOKUP: u8 = 2;

const CURVE_TAG_TWO_POINT: u8 = 0;
const CURVE_TAG_KEYFRAMES: u8 = 1;

const GRADIENT_TAG_TWO_COLOR: u8 = 0;
const GRADIENT_TAG_RAINBOW: u8 = 1;
const GRADIENT_TAG_KEYFRAMES: u8 = 2;

const GLOBAL_CURRENT_FACE: u8 = 0;

/// Global inputs a scalar node can sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GlobalKind {
    /// Current up face, normalized to the full 16-bit parameter range.
    CurrentFace,
}

impl GlobalKind {
    fn from_raw(raw: u8, offset: u16) -> Self {
        match raw {
            GLOBAL_CURRENT_FACE => Self::CurrentFace,
            other => {
                warn_log!("unknown global input {} at 0x{:04X}", other, offset);
                Self::CurrentFace
            }
        }
    }
}

/// Unary scalar operators (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UnaryOp {
    Abs,
    Sin,
    Cos,
    Asin,
    Acos,
    Square,
    Sqrt,
}

impl UnaryOp {
    fn from_raw(raw: u8, offset: u16) -> Self {
        match raw {
            0 => Self::Abs,
            1 => Self::Sin,
            2 => Self::Cos,
            3 => Self::Asin,
            4 => Self::Acos,
            5 => Self::Square,
            6 => Self::Sqrt,
            other => {
                warn_log!("unknown unary op {} at 0x{:04X}", other, offset);
                Self::Abs
            }
        }
    }
}

/// Binary scalar operators (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
}

impl BinaryOp {
    fn from_raw(raw: u8, offset: u16) -> Self {
        match raw {
            0 => Self::Add,
            1 => Self::Sub,
            2 => Self::Mul,
            3 => Self::Div,
            4 => Self::Mod,
            5 => Self::Min,
            6 => Self::Max,
            other => {
                warn_log!("unknown binary op {} at 0x{:04X}", other, offset);
                Self::Add
            }
        }
    }
}

/// Easing kind shared by curve and gradient interpolation.
///
/// All formulas are fixed-point quadratics over the 16-bit parameter
/// domain; no floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Easing {
    Step,
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Easing {
    pub fn from_raw(raw: u8, offset: u16) -> Self {
        match raw {
            0 => Self::Step,
            1 => Self::Linear,
            2 => Self::EaseIn,
            3 => Self::EaseOut,
            4 => Self::EaseInOut,
            other => {
                warn_log!("unknown easing {} at 0x{:04X}", other, offset);
                Self::Step
            }
        }
    }

    /// Remap a 16-bit parameter through the easing curve.
    #[allow(clippy::cast_possible_truncation)]
    pub fn apply(self, t: u16) -> u16 {
        let t32 = u32::from(t);
        match self {
            Self::Step => {
                if t < 0x8000 {
                    0
                } else {
                    0xFFFF
                }
            }
            Self::Linear => t,
            Self::EaseIn => ((t32 * t32) / 0xFFFF) as u16,
            Self::EaseOut => 0xFFFF - Self::EaseIn.apply(0xFFFF - t),
            Self::EaseInOut => {
                if t < 0x8000 {
                    ((t32 * t32) >> 15) as u16
                } else {
                    let inv = u32::from(0xFFFF - t);
                    0xFFFF - ((inv * inv) >> 15) as u16
                }
            }
        }
    }
}

/// Interpolate between two values with an eased 16-bit parameter.
#[allow(clippy::cast_possible_truncation)]
pub fn interp(from: i32, to: i32, eased: u16) -> i32 {
    let delta = i64::from(to) - i64::from(from);
    (i64::from(from) + delta * i64::from(eased) / 0xFFFF) as i32
}

/// A decoded scalar expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarNode {
    /// 8-bit literal constant.
    U8(u8),
    /// 16-bit literal constant.
    U16(u16),
    /// Live global input lookup.
    Global(GlobalKind),
    /// Evaluate `input`, then evaluate `curve` at that parameter.
    Lookup {
        curve: Offset<CurveNode>,
        input: Offset<ScalarNode>,
    },
    /// Unary operator over a child scalar.
    Unary {
        op: UnaryOp,
        operand: Offset<ScalarNode>,
    },
    /// Binary operator over two child scalars.
    Binary {
        op: BinaryOp,
        lhs: Offset<ScalarNode>,
        rhs: Offset<ScalarNode>,
    },
}

impl ScalarNode {
    /// Decode a scalar node at `offset`. Unknown tags decode to a zero
    /// literal after logging.
    pub fn from_bytes(buffer: AnimBuffer<'_>, offset: Offset<Self>) -> Result<Self, BufferError> {
        let mut r = ByteReader::new(buffer, offset.raw())?;
        let tag = r.read_u8()?;
        Ok(match tag {
            SCALAR_TAG_U8 => Self::U8(r.read_u8()?),
            SCALAR_TAG_U16 => Self::U16(r.read_u16()?),
            SCALAR_TAG_GLOBAL => {
                let raw = r.read_u8()?;
                Self::Global(GlobalKind::from_raw(raw, r.start()))
            }
            SCALAR_TAG_LOOKUP => Self::Lookup {
                curve: r.read_offset()?,
                input: r.read_offset()?,
            },
            SCALAR_TAG_UNARY => {
                let op = r.read_u8()?;
                Self::Unary {
                    op: UnaryOp::from_raw(op, r.start()),
                    operand: r.read_offset()?,
                }
            }
            SCALAR_TAG_BINARY => {
                let op = r.read_u8()?;
                Self::Binary {
                    op: BinaryOp::from_raw(op, r.start()),
                    lhs: r.read_offset()?,
                    rhs: r.read_offset()?,
                }
            }
            other => {
                warn_log!("unknown scalar tag {} at 0x{:04X}", other, offset.raw());
                Self::U8(0)
            }
        })
    }
}

/// A decoded color expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorNode {
    /// RGB literal.
    Rgb(Rgb),
    /// Index into the procedural rainbow palette.
    Palette(u8),
    /// Evaluate `input`, then sample `gradient` at that parameter.
    Lookup {
        input: Offset<ScalarNode>,
        gradient: Offset<GradientNode>,
    },
}

impl ColorNode {
    /// Decode a color node at `offset`. Unknown tags decode to black
    /// after logging.
    pub fn from_bytes(buffer: AnimBuffer<'_>, offset: Offset<Self>) -> Result<Self, BufferError> {
        let mut r = ByteReader::new(buffer, offset.raw())?;
        let tag = r.read_u8()?;
        Ok(match tag {
            COLOR_TAG_RGB => {
                let red = r.read_u8()?;
                let green = r.read_u8()?;
                let blue = r.read_u8()?;
                Self::Rgb(Rgb {
                    r: red,
                    g: green,
                    b: blue,
                })
            }
            COLOR_TAG_PALETTE => Self::Palette(r.read_u8()?),
            COLOR_TAG_LOOKUP => Self::Lookup {
                input: r.read_offset()?,
                gradient: r.read_offset()?,
            },
            other => {
                warn_log!("unknown color tag {} at 0x{:04X}", other, offset.raw());
                Self::Rgb(Rgb { r: 0, g: 0, b: 0 })
            }
        })
    }
}

/// One `{ time, value }` point of a serialized curve (4 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveKeyframe {
    pub time: u16,
    pub value: u16,
}

impl FixedRecord for CurveKeyframe {
    const SIZE: usize = 4;
}

impl CurveKeyframe {
    pub fn from_bytes(
        buffer: AnimBuffer<'_>,
        offset: Offset<Self>,
    ) -> Result<Self, BufferError> {
        let mut r = ByteReader::new(buffer, offset.raw())?;
        Ok(Self {
            time: r.read_u16()?,
            value: r.read_u16()?,
        })
    }
}

/// One `{ time, color }` point of a serialized gradient (4 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientKeyframe {
    pub time: u16,
    pub color: Offset<ColorNode>,
}

impl FixedRecord for GradientKeyframe {
    const SIZE: usize = 4;
}

impl GradientKeyframe {
    pub fn from_bytes(
        buffer: AnimBuffer<'_>,
        offset: Offset<Self>,
    ) -> Result<Self, BufferError> {
        let mut r = ByteReader::new(buffer, offset.raw())?;
        Ok(Self {
            time: r.read_u16()?,
            color: r.read_offset()?,
        })
    }
}

/// A decoded curve node: scalar-valued over the 16-bit parameter domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveNode {
    /// Two-point interpolation with an easing kind.
    TwoPoint {
        easing: Easing,
        from: u16,
        to: u16,
    },
    /// Piecewise interpolation over a sorted keyframe list.
    Keyframes {
        easing: Easing,
        frames: OffsetArray<CurveKeyframe>,
    },
}

impl CurveNode {
    pub fn from_bytes(buffer: AnimBuffer<'_>, offset: Offset<Self>) -> Result<Self, BufferError> {
        let mut r = ByteReader::new(buffer, offset.raw())?;
        let tag = r.read_u8()?;
        Ok(match tag {
            CURVE_TAG_TWO_POINT => {
                let easing = r.read_u8()?;
                Self::TwoPoint {
                    easing: Easing::from_raw(easing, r.start()),
                    from: r.read_u16()?,
                    to: r.read_u16()?,
                }
            }
            CURVE_TAG_KEYFRAMES => {
                let easing = r.read_u8()?;
                let count = r.read_u8()?;
                let frames_off = r.read_u16()?;
                Self::Keyframes {
                    easing: Easing::from_raw(easing, r.start()),
                    frames: OffsetArray::new(frames_off, count),
                }
            }
            other => {
                warn_log!("unknown curve tag {} at 0x{:04X}", other, offset.raw());
                Self::TwoPoint {
                    easing: Easing::Step,
                    from: 0,
                    to: 0,
                }
            }
        })
    }
}

/// A decoded gradient node: color-valued over the 16-bit parameter domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientNode {
    /// Blend between two child colors with an easing kind.
    TwoColor {
        easing: Easing,
        from: Offset<ColorNode>,
        to: Offset<ColorNode>,
    },
    /// Sweep the hue wheel `count` times over the parameter range.
    Rainbow { count: u8 },
    /// Piecewise blend over a sorted keyframe list.
    Keyframes {
        easing: Easing,
        frames: OffsetArray<GradientKeyframe>,
    },
}

impl GradientNode {
    pub fn from_bytes(buffer: AnimBuffer<'_>, offset: Offset<Self>) -> Result<Self, BufferError> {
        let mut r = ByteReader::new(buffer, offset.raw())?;
        let tag = r.read_u8()?;
        Ok(match tag {
            GRADIENT_TAG_TWO_COLOR => {
                let easing = r.read_u8()?;
                Self::TwoColor {
                    easing: Easing::from_raw(easing, r.start()),
                    from: r.read_offset()?,
                    to: r.read_offset()?,
                }
            }
            GRADIENT_TAG_RAINBOW => Self::Rainbow {
                count: r.read_u8()?.max(1),
            },
            GRADIENT_TAG_KEYFRAMES => {
                let easing = r.read_u8()?;
                let count = r.read_u8()?;
                let frames_off = r.read_u16()?;
                Self::Keyframes {
                    easing: Easing::from_raw(easing, r.start()),
                    frames: OffsetArray::new(frames_off, count),
                }
            }
            other => {
                warn_log!("unknown gradient tag {} at 0x{:04X}", other, offset.raw());
                Self::TwoColor {
                    easing: Easing::Step,
                    from: Offset::NULL,
                    to: Offset::NULL,
                }
            }
        })
    }
}
