//! Evaluation context: resolves expression references against a primary
//! buffer, an optional override buffer/table, and global inputs.
//!
//! One context exists per playback, allocated alongside its instance.
//! Evaluation is deterministic and side-effect free for a fixed
//! (buffer, overrides, globals) triple.

use heapless::Vec;

use crate::buffer::{AnimBuffer, BufferError, Offset};
use crate::color::{BLACK, Rgb, blend_colors, palette_color, rainbow_wheel};
use crate::math8::{acos8, asin8, cos8, sin8, sqrt32};
use crate::node::{
    BinaryOp, ColorNode, CurveKeyframe, CurveNode, GlobalKind, GradientKeyframe, GradientNode,
    ScalarNode, UnaryOp, interp,
};

/// Maximum number of override pairs per context.
///
/// Override tables are tiny; a linear scan over a bounded array beats the
/// memory cost of any hash structure on this platform.
pub const MAX_OVERRIDES: usize = 4;

/// One (primary offset -> override-buffer offset) redirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OverridePair {
    /// Offset in the primary buffer being overridden.
    pub source: u16,
    /// Offset in the override buffer to read instead.
    pub replacement: u16,
}

/// Error building an override table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContextError {
    /// More than [`MAX_OVERRIDES`] pairs supplied.
    TooManyOverrides,
    /// Two pairs target the same primary offset.
    DuplicateOverride { source: u16 },
}

impl core::fmt::Display for ContextError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooManyOverrides => write!(f, "more than {MAX_OVERRIDES} overrides"),
            Self::DuplicateOverride { source } => {
                write!(f, "duplicate override for offset 0x{source:04X}")
            }
        }
    }
}

/// Global inputs available to expression nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Globals {
    /// Current up face normalized to the full 16-bit parameter range,
    /// refreshed by the accelerometer subsystem.
    pub face_norm: u16,
    /// Hardware device identifier, used by the identifier-blink effect.
    pub device_id: u32,
}

#[derive(Clone)]
struct Overrides<'a> {
    buffer: AnimBuffer<'a>,
    table: Vec<OverridePair, MAX_OVERRIDES>,
}

/// Resolves and evaluates expression references for one playback.
#[derive(Clone)]
pub struct EvalContext<'a> {
    buffer: AnimBuffer<'a>,
    overrides: Option<Overrides<'a>>,
    pub globals: Globals,
}

impl<'a> EvalContext<'a> {
    pub fn new(buffer: AnimBuffer<'a>, globals: Globals) -> Self {
        Self {
            buffer,
            overrides: None,
            globals,
        }
    }

    /// Build a context with an override buffer and table.
    ///
    /// At most one override may apply per distinct primary offset;
    /// duplicates are rejected here rather than silently shadowed.
    pub fn with_overrides(
        buffer: AnimBuffer<'a>,
        override_buffer: AnimBuffer<'a>,
        pairs: &[OverridePair],
        globals: Globals,
    ) -> Result<Self, ContextError> {
        let mut table: Vec<OverridePair, MAX_OVERRIDES> = Vec::new();
        for pair in pairs {
            if table.iter().any(|other| other.source == pair.source) {
                return Err(ContextError::DuplicateOverride {
                    source: pair.source,
                });
            }
            table
                .push(*pair)
                .map_err(|_| ContextError::TooManyOverrides)?;
        }
        Ok(Self {
            buffer,
            overrides: Some(Overrides {
                buffer: override_buffer,
                table,
            }),
            globals,
        })
    }

    /// Redirect a reference through the override table.
    ///
    /// Linear scan is intentional: the table holds at most
    /// [`MAX_OVERRIDES`] entries. An override hit reinterprets the
    /// reference against the override buffer; otherwise resolution
    /// proceeds against the primary buffer.
    fn resolve<T>(&self, offset: Offset<T>) -> (AnimBuffer<'a>, Offset<T>) {
        if let Some(overrides) = &self.overrides {
            for pair in &overrides.table {
                if pair.source == offset.raw() {
                    return (overrides.buffer, Offset::new(pair.replacement));
                }
            }
        }
        (self.buffer, offset)
    }

    /// Evaluate a scalar reference. Null or unresolvable references
    /// evaluate to 0.
    pub fn scalar(&self, offset: Offset<ScalarNode>) -> i32 {
        if offset.is_null() {
            return 0;
        }
        let (buffer, offset) = self.resolve(offset);
        let node = match ScalarNode::from_bytes(buffer, offset) {
            Ok(node) => node,
            Err(err) => return scalar_fault(err),
        };
        match node {
            ScalarNode::U8(value) => i32::from(value),
            ScalarNode::U16(value) => i32::from(value),
            ScalarNode::Global(GlobalKind::CurrentFace) => i32::from(self.globals.face_norm),
            ScalarNode::Lookup { curve, input } => {
                let param = clamp_param(self.scalar(input));
                self.curve(curve, param)
            }
            ScalarNode::Unary { op, operand } => unary(op, self.scalar(operand)),
            ScalarNode::Binary { op, lhs, rhs } => binary(op, self.scalar(lhs), self.scalar(rhs)),
        }
    }

    /// Evaluate a color reference. Null or unresolvable references
    /// evaluate to black.
    pub fn color(&self, offset: Offset<ColorNode>) -> Rgb {
        if offset.is_null() {
            return BLACK;
        }
        let (buffer, offset) = self.resolve(offset);
        let node = match ColorNode::from_bytes(buffer, offset) {
            Ok(node) => node,
            Err(err) => return color_fault(err),
        };
        match node {
            ColorNode::Rgb(rgb) => rgb,
            ColorNode::Palette(index) => palette_color(index),
            ColorNode::Lookup { input, gradient } => {
                let param = clamp_param(self.scalar(input));
                self.gradient(gradient, param)
            }
        }
    }

    /// Evaluate a curve reference at a 16-bit parameter.
    pub fn curve(&self, offset: Offset<CurveNode>, param: u16) -> i32 {
        if offset.is_null() {
            return 0;
        }
        let (buffer, offset) = self.resolve(offset);
        let node = match CurveNode::from_bytes(buffer, offset) {
            Ok(node) => node,
            Err(err) => return scalar_fault(err),
        };
        match node {
            CurveNode::TwoPoint { easing, from, to } => {
                interp(i32::from(from), i32::from(to), easing.apply(param))
            }
            CurveNode::Keyframes { easing, frames } => {
                let mut prev: Option<CurveKeyframe> = None;
                for index in 0..frames.count() {
                    let frame = match CurveKeyframe::from_bytes(buffer, frames.at(index)) {
                        Ok(frame) => frame,
                        Err(err) => return scalar_fault(err),
                    };
                    if param < frame.time {
                        return match prev {
                            None => i32::from(frame.value),
                            Some(prev) => {
                                let local = segment_param(prev.time, frame.time, param);
                                interp(
                                    i32::from(prev.value),
                                    i32::from(frame.value),
                                    easing.apply(local),
                                )
                            }
                        };
                    }
                    prev = Some(frame);
                }
                prev.map_or(0, |last| i32::from(last.value))
            }
        }
    }

    /// Evaluate a gradient reference at a 16-bit parameter.
    pub fn gradient(&self, offset: Offset<GradientNode>, param: u16) -> Rgb {
        if offset.is_null() {
            return BLACK;
        }
        let (buffer, offset) = self.resolve(offset);
        let node = match GradientNode::from_bytes(buffer, offset) {
            Ok(node) => node,
            Err(err) => return color_fault(err),
        };
        match node {
            GradientNode::TwoColor { easing, from, to } => {
                let eased = easing.apply(param);
                blend_colors(self.color(from), self.color(to), high_byte(eased))
            }
            GradientNode::Rainbow { count } => {
                #[allow(clippy::cast_possible_truncation)]
                let hue = (((u32::from(param) * u32::from(count)) >> 8) & 0xFF) as u8;
                rainbow_wheel(hue)
            }
            GradientNode::Keyframes { easing, frames } => {
                let mut prev: Option<GradientKeyframe> = None;
                for index in 0..frames.count() {
                    let frame = match GradientKeyframe::from_bytes(buffer, frames.at(index)) {
                        Ok(frame) => frame,
                        Err(err) => return color_fault(err),
                    };
                    if param < frame.time {
                        return match prev {
                            None => self.color(frame.color),
                            Some(prev) => {
                                let local = segment_param(prev.time, frame.time, param);
                                blend_colors(
                                    self.color(prev.color),
                                    self.color(frame.color),
                                    high_byte(easing.apply(local)),
                                )
                            }
                        };
                    }
                    prev = Some(frame);
                }
                prev.map_or(BLACK, |last| self.color(last.color))
            }
        }
    }
}

/// Clamp a scalar result into the 16-bit parameter domain.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_param(value: i32) -> u16 {
    value.clamp(0, 0xFFFF) as u16
}

#[allow(clippy::cast_possible_truncation)]
const fn high_byte(param: u16) -> u8 {
    (param >> 8) as u8
}

fn scalar_fault(err: BufferError) -> i32 {
    warn_log!("scalar evaluation failed: {}", err);
    0
}

fn color_fault(err: BufferError) -> Rgb {
    warn_log!("color evaluation failed: {}", err);
    BLACK
}

/// Local 16-bit parameter within a keyframe segment.
#[allow(clippy::cast_possible_truncation)]
fn segment_param(start: u16, end: u16, param: u16) -> u16 {
    let span = u32::from(end - start);
    if span == 0 {
        return 0xFFFF;
    }
    ((u32::from(param - start) * 0xFFFF) / span) as u16
}

/// Map a scalar onto the 8-bit trig table domain via its high byte.
fn to_theta(value: i32) -> u8 {
    high_byte(clamp_param(value))
}

/// Widen an 8-bit table result back to the 16-bit scalar domain.
fn from_table(value: u8) -> i32 {
    i32::from(value) << 8
}

#[allow(clippy::cast_sign_loss)]
fn unary(op: UnaryOp, value: i32) -> i32 {
    match op {
        UnaryOp::Abs => value.saturating_abs(),
        UnaryOp::Sin => from_table(sin8(to_theta(value))),
        UnaryOp::Cos => from_table(cos8(to_theta(value))),
        UnaryOp::Asin => from_table(asin8(to_theta(value))),
        UnaryOp::Acos => from_table(acos8(to_theta(value))),
        UnaryOp::Square => value.saturating_mul(value),
        UnaryOp::Sqrt => {
            // Defined for non-negative input only.
            if value < 0 {
                0
            } else {
                i32::from(sqrt32(value as u32))
            }
        }
    }
}

fn binary(op: BinaryOp, lhs: i32, rhs: i32) -> i32 {
    match op {
        BinaryOp::Add => lhs.saturating_add(rhs),
        BinaryOp::Sub => lhs.saturating_sub(rhs),
        BinaryOp::Mul => lhs.saturating_mul(rhs),
        BinaryOp::Div => {
            if rhs == 0 {
                // Division by zero saturates by the sign of the dividend.
                warn_log!("scalar division by zero");
                match lhs {
                    0 => 0,
                    l if l > 0 => i32::MAX,
                    _ => i32::MIN,
                }
            } else {
                lhs.wrapping_div(rhs)
            }
        }
        BinaryOp::Mod => {
            if rhs == 0 {
                warn_log!("scalar modulo by zero");
                0
            } else {
                lhs.wrapping_rem(rhs)
            }
        }
        BinaryOp::Min => lhs.min(rhs),
        BinaryOp::Max => lhs.max(rhs),
    }
}
