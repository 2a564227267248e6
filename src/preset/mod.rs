//! Preset records and their per-playback instances.
//!
//! A preset is an immutable, kind-tagged serialized description of an
//! effect's look; an instance is the mutable state of one active playback
//! of it. Both sides are unified as kind-tagged enums dispatched by
//! `match`, one concrete kind per submodule.
//!
//! Wire layout of every preset starts with the common 7-byte header
//! (`kind: u8`, `duration_ms: u16`, `led_mask: u32`, little-endian,
//! unpadded) followed by kind-specific fields. These bytes travel the
//! wireless link and land in flash verbatim; field order and width are
//! part of the stored-data contract.

mod blink_id;
mod flashing;
mod pattern;
mod rainbow;
mod sequence;

use embassy_time::Duration;

pub use blink_id::{BlinkIdInstance, BlinkIdPreset, build_ident_payload, crc3};
pub use flashing::{FlashingInstance, FlashingPreset};
pub use pattern::{
    NoisePlayer, PatternInstance, PatternPreset, TrackKeyframe, TrackPattern, TrackPlayer,
    TrackRecord, TracksPlayer,
};
pub use rainbow::{RainbowInstance, RainbowPreset};
pub use sequence::{SequenceInstance, SequenceItem, SequencePreset};

use crate::buffer::{AnimBuffer, BufferError, ByteReader, DataSet, Offset};
use crate::color::Rgb;
use crate::controller::Tag;
use crate::eval::EvalContext;
use crate::task::TriggerBacklog;

/// Wire size of the common preset header.
pub const PRESET_HEADER_SIZE: usize = 7;

/// Most child occurrences a sequence preset can carry.
pub const MAX_SEQUENCE_CHILDREN: usize = 8;

const PRESET_TAG_FLASHING: u8 = 0;
const PRESET_TAG_RAINBOW: u8 = 1;
const PRESET_TAG_BLINK_ID: u8 = 2;
const PRESET_TAG_SEQUENCE: u8 = 3;
const PRESET_TAG_PATTERN: u8 = 4;

/// Closed set of preset kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PresetKind {
    Flashing = PRESET_TAG_FLASHING,
    Rainbow = PRESET_TAG_RAINBOW,
    BlinkId = PRESET_TAG_BLINK_ID,
    Sequence = PRESET_TAG_SEQUENCE,
    Pattern = PRESET_TAG_PATTERN,
}

impl PresetKind {
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            PRESET_TAG_FLASHING => Self::Flashing,
            PRESET_TAG_RAINBOW => Self::Rainbow,
            PRESET_TAG_BLINK_ID => Self::BlinkId,
            PRESET_TAG_SEQUENCE => Self::Sequence,
            PRESET_TAG_PATTERN => Self::Pattern,
            _ => return None,
        })
    }
}

/// Common fields every preset carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetHeader {
    pub kind: PresetKind,
    pub duration_ms: u16,
    /// Bit per logical LED the effect is allowed to drive.
    pub led_mask: u32,
}

/// How an occurrence's contribution joins the composite frame.
///
/// The compositor always blends brightest-wins; the byte exists on the
/// wire for forward compatibility and is carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlendMode {
    Brightest,
}

impl BlendMode {
    pub(crate) fn from_raw(raw: u8, offset: u16) -> Self {
        match raw {
            0 => Self::Brightest,
            other => {
                warn_log!("unknown blend mode {} at 0x{:04X}", other, offset);
                Self::Brightest
            }
        }
    }
}

/// Kind-specific preset fields, decoded.
#[derive(Debug, Clone, Copy)]
pub enum PresetBody {
    Flashing(FlashingPreset),
    Rainbow(RainbowPreset),
    BlinkId(BlinkIdPreset),
    Sequence(SequencePreset),
    Pattern(PatternPreset),
}

/// A fully decoded preset: header plus kind-specific fields.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub header: PresetHeader,
    pub body: PresetBody,
}

impl Preset {
    /// Decode a preset record at `offset`.
    ///
    /// An unknown preset kind is an error here, not a logged default: a
    /// preset that cannot be decoded cannot be sized or played, and the
    /// caller must see that explicitly.
    pub fn from_bytes(
        buffer: AnimBuffer<'_>,
        offset: Offset<PresetHeader>,
    ) -> Result<Self, BufferError> {
        let mut r = ByteReader::new(buffer, offset.raw())?;
        let raw_kind = r.read_u8()?;
        let kind = PresetKind::from_raw(raw_kind).ok_or(BufferError::UnknownTag {
            offset: offset.raw(),
            tag: raw_kind,
        })?;
        let header = PresetHeader {
            kind,
            duration_ms: r.read_u16()?,
            led_mask: r.read_u32()?,
        };
        let body = match kind {
            PresetKind::Flashing => PresetBody::Flashing(FlashingPreset::read(&mut r)?),
            PresetKind::Rainbow => PresetBody::Rainbow(RainbowPreset::read(&mut r)?),
            PresetKind::BlinkId => PresetBody::BlinkId(BlinkIdPreset::read(&mut r)?),
            PresetKind::Sequence => PresetBody::Sequence(SequencePreset::read(&mut r)?),
            PresetKind::Pattern => PresetBody::Pattern(PatternPreset::read(&mut r)?),
        };
        Ok(Self { header, body })
    }
}

/// Live state of one active playback, one variant per preset kind.
///
/// Instances capture at start everything they need from the preset and
/// context, so a running effect is not retroactively altered by context
/// changes; only pattern and sequence kinds keep reading their backing
/// buffer while running.
#[derive(Debug, Clone)]
pub enum InstanceKind<'a> {
    Flashing(FlashingInstance),
    Rainbow(RainbowInstance),
    BlinkId(BlinkIdInstance),
    Sequence(SequenceInstance),
    Pattern(PatternInstance<'a>),
}

impl<'a> InstanceKind<'a> {
    /// Construct the instance for a decoded preset.
    ///
    /// Returns the instance and its effective playback duration, which for
    /// the identifier blink is derived from the payload length rather than
    /// the header field.
    pub fn start(
        set: DataSet<'a>,
        preset: &Preset,
        ctx: &EvalContext<'a>,
        remap_face: u8,
        tag: Tag,
        seed: u32,
    ) -> Result<(Self, Duration), BufferError> {
        let header = preset.header;
        let duration = Duration::from_millis(u64::from(header.duration_ms));
        Ok(match preset.body {
            PresetBody::Flashing(body) => (
                Self::Flashing(FlashingInstance::start(&header, &body, ctx)),
                duration,
            ),
            PresetBody::Rainbow(body) => (
                Self::Rainbow(RainbowInstance::start(&header, &body)),
                duration,
            ),
            PresetBody::BlinkId(body) => {
                let instance = BlinkIdInstance::start(&header, &body, ctx.globals.device_id);
                let duration = instance.duration();
                (Self::BlinkId(instance), duration)
            }
            PresetBody::Sequence(body) => (
                Self::Sequence(SequenceInstance::start(set, &body, ctx, remap_face, tag)?),
                duration,
            ),
            PresetBody::Pattern(body) => (
                Self::Pattern(PatternInstance::start(set, &header, &body, seed)?),
                duration,
            ),
        })
    }

    /// Reset per-repetition state when a looping playback enters a new
    /// repetition window.
    pub fn rewind(&mut self) {
        if let Self::Sequence(instance) = self {
            instance.rewind();
        }
    }

    /// Contribute one frame at `t_ms` since the start of the current
    /// repetition. Child playback requests go into `triggers` instead of
    /// starting inline.
    pub fn render(
        &mut self,
        t_ms: u32,
        ctx: &EvalContext<'a>,
        leds: &mut [Rgb],
        triggers: &mut TriggerBacklog,
    ) {
        match self {
            Self::Flashing(instance) => instance.render(t_ms, leds),
            Self::Rainbow(instance) => instance.render(t_ms, leds),
            Self::BlinkId(instance) => instance.render(t_ms, leds),
            Self::Sequence(instance) => instance.render(t_ms, triggers),
            Self::Pattern(instance) => instance.render(t_ms, ctx, leds),
        }
    }
}

/// Iterate the logical LEDs selected by a preset's mask.
pub(crate) fn masked_leds(mask: u32, count: usize) -> impl Iterator<Item = usize> {
    (0..count.min(32)).filter(move |led| mask & (1 << led) != 0)
}
