//! Flashing effect: repeated trapezoidal intensity envelope.
//!
//! The duration is split into `count` equal periods; within each period
//! the intensity ramps up, holds, ramps down and stays off for the final
//! quarter. Wire fields after the header: `count: u8`, `fade: u8`,
//! `intensity: u8`, `color: u16` (color node offset).

use crate::buffer::{BufferError, ByteReader, Offset};
use crate::color::{Rgb, scale_color};
use crate::eval::EvalContext;
use crate::math8::scale8;
use crate::node::ColorNode;
use crate::preset::{PresetHeader, masked_leds};

/// Decoded flashing preset fields.
#[derive(Debug, Clone, Copy)]
pub struct FlashingPreset {
    /// Number of flashes over the preset duration.
    pub count: u8,
    /// Ramp width as a fraction of the period (255 = full trapezoid).
    pub fade: u8,
    /// Peak intensity.
    pub intensity: u8,
    /// Flash color expression.
    pub color: Offset<ColorNode>,
}

impl FlashingPreset {
    pub(crate) fn read(r: &mut ByteReader<'_>) -> Result<Self, BufferError> {
        Ok(Self {
            count: r.read_u8()?.max(1),
            fade: r.read_u8()?,
            intensity: r.read_u8()?,
            color: r.read_offset()?,
        })
    }
}

/// Per-playback flashing state.
///
/// The color expression is evaluated once at start, so overriding the
/// context later never changes a flash that is already running.
#[derive(Debug, Clone)]
pub struct FlashingInstance {
    mask: u32,
    color: Rgb,
    intensity: u8,
    count: u8,
    fade: u8,
    duration_ms: u32,
}

impl FlashingInstance {
    pub(crate) fn start(
        header: &PresetHeader,
        preset: &FlashingPreset,
        ctx: &EvalContext<'_>,
    ) -> Self {
        Self {
            mask: header.led_mask,
            color: ctx.color(preset.color),
            intensity: preset.intensity,
            count: preset.count,
            fade: preset.fade,
            duration_ms: u32::from(header.duration_ms),
        }
    }

    pub(crate) fn render(&self, t_ms: u32, leds: &mut [Rgb]) {
        let period = (self.duration_ms / u32::from(self.count)).max(1);
        let level = envelope(t_ms % period, period, self.fade);
        if level == 0 {
            return;
        }

        let color = scale_color(self.color, scale8(level, self.intensity));
        for led in masked_leds(self.mask, leds.len()) {
            leds[led] = color;
        }
    }
}

/// Trapezoidal envelope within one flash period.
#[allow(clippy::cast_possible_truncation)]
fn envelope(pos: u32, period: u32, fade: u8) -> u8 {
    let ramp = period * u32::from(fade) / 1020;
    let off_start = period - period / 4;
    let fall_start = off_start.saturating_sub(ramp);

    if pos >= off_start {
        0
    } else if pos >= fall_start {
        if ramp == 0 {
            255
        } else {
            ((off_start - pos) * 255 / ramp) as u8
        }
    } else if pos < ramp {
        (pos * 255 / ramp) as u8
    } else {
        255
    }
}

#[cfg(test)]
mod tests {
    use super::envelope;

    #[test]
    fn envelope_rises_holds_and_goes_dark() {
        // period 1000, fade 128 -> ramp 125
        assert_eq!(envelope(0, 1000, 128), 0);
        assert_eq!(envelope(500, 1000, 128), 255);
        assert_eq!(envelope(999, 1000, 128), 0);
        // off tail covers the last quarter
        assert_eq!(envelope(750, 1000, 128), 0);
    }

    #[test]
    fn zero_fade_is_a_square_pulse() {
        assert_eq!(envelope(0, 1000, 0), 255);
        assert_eq!(envelope(749, 1000, 0), 255);
        assert_eq!(envelope(750, 1000, 0), 0);
    }
}
