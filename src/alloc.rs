//! Playback instance allocator.
//!
//! Playback start is a two-pass operation: first a pure sizing pass over
//! the preset kind computes the exact footprint of the instance (a
//! pattern preset resolves its nested timing-pattern reference to size
//! the nested player), then a single block of that size plus the fixed
//! evaluation-context footprint is claimed from a fixed arena budget.
//! Instance and context always share one claim and one lifetime: the
//! claim is released exactly once, when the slot is destroyed.
//!
//! Allocation failure is fail-fast and non-blocking: callers get
//! [`AllocError::OutOfMemory`] and must not start the playback.

use crate::buffer::{BufferError, DataSet, Offset};
use crate::eval::EvalContext;
use crate::preset::{
    BlinkIdInstance, FlashingInstance, NoisePlayer, PatternInstance, Preset, PresetBody,
    PresetHeader, RainbowInstance, SequenceInstance, TrackPattern, TrackPlayer, TracksPlayer,
};

/// Fixed footprint of one evaluation context, placed at the tail of
/// every playback block.
pub const CONTEXT_FOOTPRINT: usize = size_of::<EvalContext<'static>>();

/// Error raised by the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AllocError {
    /// The arena cannot fit the requested block.
    OutOfMemory { requested: usize, available: usize },
}

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                available,
            } => write!(
                f,
                "out of animation memory: need {requested} bytes, {available} free"
            ),
        }
    }
}

/// Exact footprint of the polymorphic instance for a preset.
///
/// Pure over the preset bytes: decodes the preset, and for a pattern
/// additionally resolves the nested timing-pattern reference so the
/// nested player is sized by its actual kind. No allocation happens
/// here.
pub fn instance_footprint(
    set: DataSet<'_>,
    preset: Offset<PresetHeader>,
) -> Result<usize, BufferError> {
    let decoded = Preset::from_bytes(set.buffer, preset)?;
    Ok(match decoded.body {
        PresetBody::Flashing(_) => size_of::<FlashingInstance>(),
        PresetBody::Rainbow(_) => size_of::<RainbowInstance>(),
        PresetBody::BlinkId(_) => size_of::<BlinkIdInstance>(),
        PresetBody::Sequence(_) => size_of::<SequenceInstance>(),
        PresetBody::Pattern(body) => {
            let base = size_of::<PatternInstance<'static>>() - size_of::<TrackPlayer>();
            let player = match TrackPattern::from_bytes(set.buffer, body.tracks)? {
                TrackPattern::Tracks { .. } => size_of::<TracksPlayer>(),
                TrackPattern::Noise { .. } => size_of::<NoisePlayer>(),
            };
            base + player
        }
    })
}

/// A claimed block. Returned to the arena exactly once, via
/// [`AnimArena::release`].
#[derive(Debug)]
#[must_use]
pub struct ArenaClaim {
    size: usize,
}

impl ArenaClaim {
    pub const fn size(&self) -> usize {
        self.size
    }
}

/// Fixed byte budget for all live playback blocks.
///
/// Models the single contiguous allocation per playback: claims are
/// all-or-nothing and never fragment, because each block is accounted as
/// one unit.
#[derive(Debug)]
pub struct AnimArena {
    capacity: usize,
    used: usize,
}

impl AnimArena {
    pub const fn new(capacity: usize) -> Self {
        Self { capacity, used: 0 }
    }

    pub const fn available(&self) -> usize {
        self.capacity - self.used
    }

    /// Claim one block. Fails fast when the budget cannot fit it.
    pub fn claim(&mut self, size: usize) -> Result<ArenaClaim, AllocError> {
        if size > self.available() {
            return Err(AllocError::OutOfMemory {
                requested: size,
                available: self.available(),
            });
        }
        self.used += size;
        Ok(ArenaClaim { size })
    }

    /// Return a block to the budget.
    pub fn release(&mut self, claim: ArenaClaim) {
        self.used = self.used.saturating_sub(claim.size);
    }
}
