//! Pattern preset: on/off timing decoupled from color.
//!
//! A separately serialized timing pattern (explicit per-LED keyframe
//! tracks, or procedural noise) decides when each LED is lit and how far
//! through its blink it is. Color and intensity are evaluated
//! independently: color-over-time and color-over-blink gradients are
//! multiplied together, as are the two intensity curves, so timing and
//! color can be authored or overridden without touching each other.
//!
//! Wire fields after the header: `tracks: u16` (timing pattern offset),
//! `color_over_time: u16`, `color_over_blink: u16`,
//! `intensity_over_time: u16`, `intensity_over_blink: u16`.
//!
//! The timing pattern runs as a nested child instance sized and placed
//! inside the same allocation block as the pattern instance.

use crate::buffer::{AnimBuffer, BufferError, ByteReader, DataSet, FixedRecord, Offset, OffsetArray};
use crate::color::{Rgb, WHITE, mul_colors, scale_color};
use crate::eval::{EvalContext, clamp_param};
use crate::math8::scale8;
use crate::node::{CurveNode, GradientNode};
use crate::preset::{PresetHeader, masked_leds};

const TRACK_TAG_TRACKS: u8 = 0;
const TRACK_TAG_NOISE: u8 = 1;

/// Decoded pattern preset fields.
#[derive(Debug, Clone, Copy)]
pub struct PatternPreset {
    pub tracks: Offset<TrackPattern>,
    pub color_over_time: Offset<GradientNode>,
    pub color_over_blink: Offset<GradientNode>,
    pub intensity_over_time: Offset<CurveNode>,
    pub intensity_over_blink: Offset<CurveNode>,
}

impl PatternPreset {
    pub(crate) fn read(r: &mut ByteReader<'_>) -> Result<Self, BufferError> {
        Ok(Self {
            tracks: r.read_offset()?,
            color_over_time: r.read_offset()?,
            color_over_blink: r.read_offset()?,
            intensity_over_time: r.read_offset()?,
            intensity_over_blink: r.read_offset()?,
        })
    }
}

/// One serialized per-LED track (7 bytes on the wire):
/// `{ count: u8, keyframes: u16, led_mask: u32 }`.
#[derive(Debug, Clone, Copy)]
pub struct TrackRecord {
    pub keyframes: OffsetArray<TrackKeyframe>,
    pub led_mask: u32,
}

impl FixedRecord for TrackRecord {
    const SIZE: usize = 7;
}

impl TrackRecord {
    fn from_bytes(buffer: AnimBuffer<'_>, offset: Offset<Self>) -> Result<Self, BufferError> {
        let mut r = ByteReader::new(buffer, offset.raw())?;
        let count = r.read_u8()?;
        let frames = r.read_u16()?;
        Ok(Self {
            keyframes: OffsetArray::new(frames, count),
            led_mask: r.read_u32()?,
        })
    }
}

/// One `{ time: u16, intensity: u8 }` timing keyframe (3 bytes on the
/// wire). Times are in the 16-bit parameter domain over the preset
/// duration.
#[derive(Debug, Clone, Copy)]
pub struct TrackKeyframe {
    pub time: u16,
    pub intensity: u8,
}

impl FixedRecord for TrackKeyframe {
    const SIZE: usize = 3;
}

impl TrackKeyframe {
    fn from_bytes(buffer: AnimBuffer<'_>, offset: Offset<Self>) -> Result<Self, BufferError> {
        let mut r = ByteReader::new(buffer, offset.raw())?;
        Ok(Self {
            time: r.read_u16()?,
            intensity: r.read_u8()?,
        })
    }
}

/// The serialized on/off timing pattern a pattern preset nests.
#[derive(Debug, Clone, Copy)]
pub enum TrackPattern {
    /// Explicit keyframe tracks: `count: u8`, `tracks: u16`.
    Tracks { tracks: OffsetArray<TrackRecord> },
    /// Procedural noise: `frequency: u8` (blinks per second),
    /// `blink_duration_ms: u16`.
    Noise {
        frequency: u8,
        blink_duration_ms: u16,
    },
}

impl TrackPattern {
    /// Decode a timing pattern. Unknown kinds are an error: a pattern
    /// whose nested timing cannot be decoded cannot be sized.
    pub fn from_bytes(buffer: AnimBuffer<'_>, offset: Offset<Self>) -> Result<Self, BufferError> {
        let mut r = ByteReader::new(buffer, offset.raw())?;
        let tag = r.read_u8()?;
        Ok(match tag {
            TRACK_TAG_TRACKS => {
                let count = r.read_u8()?;
                let tracks = r.read_u16()?;
                Self::Tracks {
                    tracks: OffsetArray::new(tracks, count),
                }
            }
            TRACK_TAG_NOISE => Self::Noise {
                frequency: r.read_u8()?.max(1),
                blink_duration_ms: r.read_u16()?.max(1),
            },
            other => {
                return Err(BufferError::UnknownTag {
                    offset: offset.raw(),
                    tag: other,
                });
            }
        })
    }
}

/// A sampled timing value: how lit the LED is and how far through its
/// current blink it is (16-bit parameter).
#[derive(Debug, Clone, Copy, Default)]
struct TimingSample {
    level: u8,
    blink: u16,
}

/// Nested player for explicit keyframe tracks.
#[derive(Debug, Clone)]
pub struct TracksPlayer {
    tracks: OffsetArray<TrackRecord>,
}

impl TracksPlayer {
    fn sample(&self, buffer: AnimBuffer<'_>, led: usize, t_param: u16) -> TimingSample {
        for index in 0..self.tracks.count() {
            let Ok(track) = TrackRecord::from_bytes(buffer, self.tracks.at(index)) else {
                return TimingSample::default();
            };
            if track.led_mask & (1 << led) == 0 {
                continue;
            }
            return Self::sample_track(buffer, &track, t_param);
        }
        TimingSample::default()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn sample_track(
        buffer: AnimBuffer<'_>,
        track: &TrackRecord,
        t_param: u16,
    ) -> TimingSample {
        let mut prev: Option<TrackKeyframe> = None;
        for index in 0..track.keyframes.count() {
            let Ok(frame) = TrackKeyframe::from_bytes(buffer, track.keyframes.at(index)) else {
                return TimingSample::default();
            };
            if t_param < frame.time {
                return match prev {
                    None => TimingSample::default(),
                    Some(prev) => {
                        let span = u32::from(frame.time - prev.time).max(1);
                        let local = u32::from(t_param - prev.time) * 0xFFFF / span;
                        TimingSample {
                            level: lerp8(prev.intensity, frame.intensity, local),
                            blink: local as u16,
                        }
                    }
                };
            }
            prev = Some(frame);
        }
        prev.map_or_else(TimingSample::default, |last| TimingSample {
            level: last.intensity,
            blink: 0xFFFF,
        })
    }
}

/// Nested player for procedural noise.
///
/// Deterministic per seed: each blink slot picks one LED by hashing the
/// seed and slot index, so replays with the same seed are identical.
#[derive(Debug, Clone)]
pub struct NoisePlayer {
    seed: u32,
    slot_ms: u32,
    blink_ms: u32,
}

impl NoisePlayer {
    #[allow(clippy::cast_possible_truncation)]
    fn sample(&self, led: usize, led_count: usize, t_ms: u32) -> TimingSample {
        let slot = t_ms / self.slot_ms;
        let chosen = (mix(self.seed, slot) % led_count.max(1) as u32) as usize;
        if led != chosen {
            return TimingSample::default();
        }

        let pos = t_ms - slot * self.slot_ms;
        if pos >= self.blink_ms {
            return TimingSample::default();
        }
        // Triangle envelope over the blink window.
        let half = (self.blink_ms / 2).max(1);
        let level = if pos < half {
            pos * 255 / half
        } else {
            (self.blink_ms - pos) * 255 / half
        };
        TimingSample {
            level: level.min(255) as u8,
            blink: (pos * 0xFFFF / self.blink_ms) as u16,
        }
    }
}

/// The nested timing instance, one variant per [`TrackPattern`] kind.
#[derive(Debug, Clone)]
pub enum TrackPlayer {
    Tracks(TracksPlayer),
    Noise(NoisePlayer),
}

/// Per-playback pattern state: the nested timing player plus the four
/// expression references evaluated every tick.
#[derive(Debug, Clone)]
pub struct PatternInstance<'a> {
    set: DataSet<'a>,
    mask: u32,
    duration_ms: u32,
    color_over_time: Offset<GradientNode>,
    color_over_blink: Offset<GradientNode>,
    intensity_over_time: Offset<CurveNode>,
    intensity_over_blink: Offset<CurveNode>,
    player: TrackPlayer,
}

impl<'a> PatternInstance<'a> {
    pub(crate) fn start(
        set: DataSet<'a>,
        header: &PresetHeader,
        preset: &PatternPreset,
        seed: u32,
    ) -> Result<Self, BufferError> {
        let player = match TrackPattern::from_bytes(set.buffer, preset.tracks)? {
            TrackPattern::Tracks { tracks } => TrackPlayer::Tracks(TracksPlayer { tracks }),
            TrackPattern::Noise {
                frequency,
                blink_duration_ms,
            } => TrackPlayer::Noise(NoisePlayer {
                seed,
                slot_ms: (1000 / u32::from(frequency)).max(1),
                blink_ms: u32::from(blink_duration_ms),
            }),
        };
        Ok(Self {
            set,
            mask: header.led_mask,
            duration_ms: u32::from(header.duration_ms).max(1),
            color_over_time: preset.color_over_time,
            color_over_blink: preset.color_over_blink,
            intensity_over_time: preset.intensity_over_time,
            intensity_over_blink: preset.intensity_over_blink,
            player,
        })
    }

    pub(crate) fn render(&self, t_ms: u32, ctx: &EvalContext<'a>, leds: &mut [Rgb]) {
        #[allow(clippy::cast_possible_truncation)]
        let t_param = (u64::from(t_ms.min(self.duration_ms)) * 0xFFFF
            / u64::from(self.duration_ms)) as u16;
        let led_count = leds.len();

        for led in masked_leds(self.mask, led_count) {
            let sample = match &self.player {
                TrackPlayer::Tracks(player) => player.sample(self.set.buffer, led, t_param),
                TrackPlayer::Noise(player) => player.sample(led, led_count, t_ms),
            };
            if sample.level == 0 {
                continue;
            }

            let color = mul_colors(
                self.gradient_or_white(ctx, self.color_over_time, t_param),
                self.gradient_or_white(ctx, self.color_over_blink, sample.blink),
            );
            let level = scale8(
                scale8(
                    self.curve_or_full(ctx, self.intensity_over_time, t_param),
                    self.curve_or_full(ctx, self.intensity_over_blink, sample.blink),
                ),
                sample.level,
            );
            leds[led] = scale_color(color, level);
        }
    }

    /// A null gradient reference is the multiplicative identity (white),
    /// not black: unauthored axes must not darken the pattern.
    fn gradient_or_white(
        &self,
        ctx: &EvalContext<'a>,
        offset: Offset<GradientNode>,
        param: u16,
    ) -> Rgb {
        if offset.is_null() {
            WHITE
        } else {
            ctx.gradient(offset, param)
        }
    }

    /// A null curve reference is full intensity, for the same reason.
    #[allow(clippy::cast_possible_truncation)]
    fn curve_or_full(&self, ctx: &EvalContext<'a>, offset: Offset<CurveNode>, param: u16) -> u8 {
        if offset.is_null() {
            255
        } else {
            (clamp_param(ctx.curve(offset, param)) >> 8) as u8
        }
    }
}

/// Linear blend between two 8-bit values with a 16-bit parameter.
#[allow(clippy::cast_possible_truncation)]
fn lerp8(a: u8, b: u8, t: u32) -> u8 {
    let a = u32::from(a);
    let b = u32::from(b);
    ((a * (0xFFFF - t) + b * t) / 0xFFFF) as u8
}

/// Stateless integer hash used by the noise player.
fn mix(seed: u32, slot: u32) -> u32 {
    let mut x = seed ^ slot.wrapping_mul(0x9E37_79B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x7FEB_352D);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846C_A68B);
    x ^ (x >> 16)
}
