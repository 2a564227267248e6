#![no_std]

#[macro_use]
mod log;

pub mod alloc;
pub mod buffer;
pub mod color;
pub mod controller;
pub mod eval;
pub mod frame_scheduler;
pub mod math8;
pub mod node;
pub mod preset;
pub mod task;

pub use alloc::{AllocError, AnimArena, ArenaClaim, CONTEXT_FOOTPRINT, instance_footprint};
pub use buffer::{AnimBuffer, BufferError, DataSet, NULL_OFFSET, Offset, OffsetArray};
pub use controller::{
    Controller, ControllerConfig, ControllerState, FACE_WILDCARD, PlayError, REPLAY_FADE, Tag,
};
pub use eval::{ContextError, EvalContext, Globals, MAX_OVERRIDES, OverridePair};
pub use frame_scheduler::{DEFAULT_FRAME_DURATION, FrameResult, FrameScheduler};
pub use preset::{BlendMode, Preset, PresetHeader, PresetKind};
pub use task::{
    TriggerBacklog, TriggerChannel, TriggerReceiver, TriggerRequest, TriggerSender,
};

pub use color::{Hsv, Rgb};
pub use embassy_time::{Duration, Instant};

/// Abstract LED driver trait
///
/// Implement this trait to support different hardware platforms.
/// The animation engine is generic over this trait.
pub trait OutputDriver {
    /// Write colors to the LED strip, in daisy-chain order
    fn write(&mut self, colors: &[Rgb]);
}

/// Board layout collaborator
///
/// Maps logical LED indices to the physical daisy-chain order, optionally
/// remapped so the animation appears "up" on the current face.
pub trait LedLayout {
    /// Number of LEDs on the die
    fn led_count(&self) -> usize;

    /// Physical daisy-chain index for a logical LED under a face remap
    fn daisy_chain_index(&self, remap_face: u8, led: usize) -> usize;
}

/// Trivial layout where logical and physical order coincide
///
/// Useful for tests and host-side previews.
#[derive(Debug, Clone, Copy)]
pub struct IdentityLayout {
    pub count: usize,
}

impl LedLayout for IdentityLayout {
    fn led_count(&self) -> usize {
        self.count
    }

    fn daisy_chain_index(&self, _remap_face: u8, led: usize) -> usize {
        led
    }
}
