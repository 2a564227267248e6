//! Playback controller: the compositor and scheduler.
//!
//! Owns the bounded running-slot table, ticks every live instance once
//! per frame, composites their contributions with brightest-wins
//! blending, and hands the daisy-chain-ordered frame to the output
//! driver collaborator.
//!
//! Everything here runs to completion on the cooperative task queue:
//! exactly one `tick`, `play` or `stop` executes at a time, so the slot
//! table needs no locking.

use embassy_time::{Duration, Instant};

use crate::LedLayout;
use crate::alloc::{AllocError, AnimArena, ArenaClaim, CONTEXT_FOOTPRINT, instance_footprint};
use crate::buffer::{BufferError, DataSet, Offset};
use crate::color::{BLACK, Rgb, max_colors, scale_color};
use crate::eval::{ContextError, EvalContext, Globals};
use crate::math8::progress8;
use crate::preset::{InstanceKind, Preset, PresetHeader};
use crate::task::{TriggerBacklog, TriggerSender};

/// Remap face value matching any face in `stop`.
pub const FACE_WILDCARD: u8 = 0xFF;

/// Fixed fade-out window applied when a playing preset is replayed.
pub const REPLAY_FADE: Duration = Duration::from_millis(250);

/// Default slot table capacity.
pub const DEFAULT_MAX_SLOTS: usize = 20;

/// Default arena budget for instances and contexts, in bytes.
pub const DEFAULT_POOL_BYTES: usize = 2048;

/// Cancellation/grouping label attached to each playback.
///
/// Bulk fade-out targets a tag, so a whole category of in-flight effects
/// (everything triggered by motion, say) can be cancelled without the
/// caller enumerating presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tag(pub u8);

impl Tag {
    pub const NONE: Self = Self(0);
    pub const MOTION: Self = Self(1);
    pub const BATTERY: Self = Self(2);
    pub const CONNECTION: Self = Self(3);
    pub const STATUS: Self = Self(4);
}

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerState {
    Uninitialized,
    Initializing,
    /// Paused, e.g. while persistent storage is being rewritten.
    Off,
    On,
}

/// Explicit failure modes of `play`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlayError {
    /// Controller has not been initialized.
    NotReady,
    /// The slot table is full; the request did not start.
    CapacityExceeded,
    /// The arena cannot fit the instance block.
    OutOfMemory(AllocError),
    /// The preset or its graph could not be decoded.
    Buffer(BufferError),
    /// The pool's override table is invalid.
    Context(ContextError),
}

impl From<AllocError> for PlayError {
    fn from(err: AllocError) -> Self {
        Self::OutOfMemory(err)
    }
}

impl From<BufferError> for PlayError {
    fn from(err: BufferError) -> Self {
        Self::Buffer(err)
    }
}

impl From<ContextError> for PlayError {
    fn from(err: ContextError) -> Self {
        Self::Context(err)
    }
}

impl core::fmt::Display for PlayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotReady => write!(f, "controller not initialized"),
            Self::CapacityExceeded => write!(f, "slot table full"),
            Self::OutOfMemory(err) => write!(f, "{err}"),
            Self::Buffer(err) => write!(f, "{err}"),
            Self::Context(err) => write!(f, "{err}"),
        }
    }
}

/// Configuration for the controller.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    /// Global output brightness scale.
    pub brightness: u8,
    /// Arena budget in bytes.
    pub pool_bytes: usize,
    /// Hardware device identifier (identifier-blink payload).
    pub device_id: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            brightness: 255,
            pool_bytes: DEFAULT_POOL_BYTES,
            device_id: 0,
        }
    }
}

/// One entry of the running slot table.
struct Slot<'a> {
    preset: Offset<PresetHeader>,
    instance: InstanceKind<'a>,
    ctx: EvalContext<'a>,
    claim: ArenaClaim,
    start: Instant,
    duration: Duration,
    loops_left: u8,
    fade_deadline: Option<Instant>,
    fade_window: Duration,
    remap_face: u8,
    tag: Tag,
}

/// The compositor/scheduler multiplexing concurrent playbacks into one
/// LED color array.
pub struct Controller<'a, L: LedLayout, const MAX_LEDS: usize, const MAX_SLOTS: usize = 20> {
    state: ControllerState,
    layout: L,
    globals: Globals,
    brightness: u8,
    slots: heapless::Vec<Slot<'a>, MAX_SLOTS>,
    arena: AnimArena,
    frame: [Rgb; MAX_LEDS],
    triggers: Option<TriggerSender<'a>>,
    last_tick: Instant,
}

impl<'a, L: LedLayout, const MAX_LEDS: usize, const MAX_SLOTS: usize>
    Controller<'a, L, MAX_LEDS, MAX_SLOTS>
{
    pub fn new(layout: L, config: &ControllerConfig) -> Self {
        Self {
            state: ControllerState::Uninitialized,
            layout,
            globals: Globals {
                face_norm: 0,
                device_id: config.device_id,
            },
            brightness: config.brightness,
            slots: heapless::Vec::new(),
            arena: AnimArena::new(config.pool_bytes),
            frame: [BLACK; MAX_LEDS],
            triggers: None,
            last_tick: Instant::from_millis(0),
        }
    }

    /// Initialize and land in the `Off` state.
    pub fn init(&mut self) {
        self.state = ControllerState::Initializing;
        self.slots.clear();
        self.frame = [BLACK; MAX_LEDS];
        self.state = ControllerState::Off;
    }

    /// Toggle between `Off` and `On` around external pause windows.
    pub fn set_running(&mut self, running: bool) {
        match self.state {
            ControllerState::Uninitialized | ControllerState::Initializing => {}
            _ => {
                self.state = if running {
                    ControllerState::On
                } else {
                    ControllerState::Off
                };
            }
        }
    }

    pub const fn state(&self) -> ControllerState {
        self.state
    }

    /// Attach the trigger queue sender used for deferred child playback.
    pub fn set_trigger_sender(&mut self, sender: TriggerSender<'a>) {
        self.triggers = Some(sender);
    }

    /// Global output brightness scale.
    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    /// Refresh the current-face global input from the accelerometer
    /// subsystem; running playbacks see the new value immediately.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_current_face(&mut self, face: u8, face_count: u8) {
        let top = u32::from(face_count.max(2)) - 1;
        let face = u32::from(face).min(top);
        self.globals.face_norm = (face * 0xFFFF / top) as u16;
        for slot in &mut self.slots {
            slot.ctx.globals = self.globals;
        }
    }

    /// Number of occupied slots.
    pub fn running(&self) -> usize {
        self.slots.len()
    }

    /// Number of LEDs driven by the attached layout.
    pub fn led_count(&self) -> usize {
        self.layout.led_count().min(MAX_LEDS)
    }

    /// Process one frame tick and return the composited,
    /// daisy-chain-ordered color array.
    pub fn tick(&mut self, now: Instant) -> &[Rgb] {
        self.last_tick = now;
        self.frame = [BLACK; MAX_LEDS];
        let led_count = self.layout.led_count().min(MAX_LEDS);

        if self.state != ControllerState::On {
            return &self.frame[..led_count];
        }

        let mut backlog = TriggerBacklog::new();
        let mut index = 0;
        while index < self.slots.len() {
            let slot = &mut self.slots[index];

            // Past the current repetition but loops remain: advance the
            // window by one duration instead of removing.
            while slot.loops_left > 1 && now >= slot.start + slot.duration {
                slot.loops_left -= 1;
                slot.start += slot.duration;
                slot.instance.rewind();
            }

            let mut fade = 255u8;
            let mut expired = now >= slot.start + slot.duration;
            if let Some(deadline) = slot.fade_deadline {
                if now >= deadline {
                    expired = true;
                } else {
                    fade = fade_level(deadline, now, slot.fade_window);
                }
            }
            if expired {
                let slot = self.slots.remove(index);
                self.arena.release(slot.claim);
                continue;
            }

            #[allow(clippy::cast_possible_truncation)]
            let t_ms = (now - slot.start).as_millis() as u32;
            let mut scratch = [BLACK; MAX_LEDS];
            slot.instance
                .render(t_ms, &slot.ctx, &mut scratch[..led_count], &mut backlog);

            // Brightest wins per channel, so overlap never overflows.
            for led in 0..led_count {
                let mut color = scratch[led];
                if fade < 255 {
                    color = scale_color(color, fade);
                }
                let chain = self.layout.daisy_chain_index(slot.remap_face, led);
                if chain < led_count {
                    self.frame[chain] = max_colors(self.frame[chain], color);
                }
            }
            index += 1;
        }

        self.post_triggers(backlog);

        if self.brightness < 255 {
            for led in &mut self.frame[..led_count] {
                *led = scale_color(*led, self.brightness);
            }
        }
        &self.frame[..led_count]
    }

    /// Start a playback of `preset` against `set`.
    ///
    /// Re-playing a (preset, face) pair that is already running fades
    /// the existing slot out over [`REPLAY_FADE`] instead of cutting it,
    /// and does not occupy a second slot. A full table or an exhausted
    /// arena is an explicit error; the request did not start.
    pub fn play(
        &mut self,
        set: DataSet<'a>,
        preset: Offset<PresetHeader>,
        remap_face: u8,
        loop_count: u8,
        tag: Tag,
    ) -> Result<(), PlayError> {
        if matches!(
            self.state,
            ControllerState::Uninitialized | ControllerState::Initializing
        ) {
            return Err(PlayError::NotReady);
        }

        let now = self.last_tick;
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|slot| slot.preset == preset && slot.remap_face == remap_face)
        {
            slot.fade_deadline = Some(now + REPLAY_FADE);
            slot.fade_window = REPLAY_FADE;
            return Ok(());
        }

        if self.slots.is_full() {
            warn_log!("play dropped: slot table full");
            return Err(PlayError::CapacityExceeded);
        }

        let decoded = Preset::from_bytes(set.buffer, preset)?;
        let footprint = instance_footprint(set, preset)? + CONTEXT_FOOTPRINT;
        let claim = self.arena.claim(footprint)?;

        let ctx = match self.build_context(set) {
            Ok(ctx) => ctx,
            Err(err) => {
                self.arena.release(claim);
                return Err(err.into());
            }
        };
        #[allow(clippy::cast_possible_truncation)]
        let seed = self.globals.device_id ^ now.as_millis() as u32;
        let (instance, duration) =
            match InstanceKind::start(set, &decoded, &ctx, remap_face, tag, seed) {
                Ok(started) => started,
                Err(err) => {
                    self.arena.release(claim);
                    return Err(err.into());
                }
            };

        // Capacity was checked above.
        let _ = self.slots.push(Slot {
            preset,
            instance,
            ctx,
            claim,
            start: now,
            duration,
            loops_left: loop_count.max(1),
            fade_deadline: None,
            fade_window: REPLAY_FADE,
            remap_face,
            tag,
        });
        Ok(())
    }

    /// Stop the one playback matching (preset, face). [`FACE_WILDCARD`]
    /// matches any remap face. Returns whether a slot was removed.
    pub fn stop(&mut self, preset: Offset<PresetHeader>, remap_face: u8) -> bool {
        let found = self.slots.iter().position(|slot| {
            slot.preset == preset
                && (remap_face == FACE_WILDCARD || slot.remap_face == remap_face)
        });
        match found {
            Some(index) => {
                let slot = self.slots.remove(index);
                self.arena.release(slot.claim);
                true
            }
            None => false,
        }
    }

    /// Force every slot with a matching tag into the fade-out path.
    pub fn fade_out_with_tag(&mut self, tag: Tag, fade: Duration) {
        let deadline = self.last_tick + fade;
        for slot in &mut self.slots {
            if slot.tag == tag {
                slot.fade_deadline = Some(deadline);
                slot.fade_window = fade;
            }
        }
    }

    /// Stop everything and blank the frame.
    pub fn stop_all(&mut self) {
        while let Some(slot) = self.slots.pop() {
            self.arena.release(slot.claim);
        }
        self.frame = [BLACK; MAX_LEDS];
    }

    fn build_context(&self, set: DataSet<'a>) -> Result<EvalContext<'a>, ContextError> {
        match set.override_buffer {
            Some(override_buffer) => EvalContext::with_overrides(
                set.buffer,
                override_buffer,
                set.overrides,
                self.globals,
            ),
            None => Ok(EvalContext::new(set.buffer, self.globals)),
        }
    }

    fn post_triggers(&self, backlog: TriggerBacklog) {
        if backlog.is_empty() {
            return;
        }
        let Some(sender) = &self.triggers else {
            warn_log!("trigger request dropped: no task queue attached");
            return;
        };
        for request in backlog {
            if sender.post(request).is_err() {
                warn_log!("trigger request dropped: task queue full");
            }
        }
    }
}

/// Linear fade multiplier while a slot is in its forced fade-out window.
fn fade_level(deadline: Instant, now: Instant, window: Duration) -> u8 {
    progress8(deadline - now, window)
}
