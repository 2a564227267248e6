//! Traveling rainbow effect.
//!
//! Base color comes from the hue wheel, cycling `count` times over the
//! duration. The traveling flag additionally offsets each LED's hue by
//! its daisy-chain position, and a global fade envelope brackets the
//! start and end of the whole run. Wire fields after the header:
//! `count: u8`, `fade: u8`, `intensity: u8`, `traveling: u8`.

use crate::buffer::{BufferError, ByteReader};
use crate::color::{Rgb, rainbow_wheel, scale_color};
use crate::math8::scale8;
use crate::preset::{PresetHeader, masked_leds};

/// Decoded traveling-rainbow preset fields.
#[derive(Debug, Clone, Copy)]
pub struct RainbowPreset {
    /// Hue wheel cycles over the duration (and along the strip when
    /// traveling).
    pub count: u8,
    /// Width of the global fade-in/fade-out envelope.
    pub fade: u8,
    /// Peak intensity.
    pub intensity: u8,
    /// Non-zero: offset each LED's hue by its chain position.
    pub traveling: bool,
}

impl RainbowPreset {
    pub(crate) fn read(r: &mut ByteReader<'_>) -> Result<Self, BufferError> {
        Ok(Self {
            count: r.read_u8()?.max(1),
            fade: r.read_u8()?,
            intensity: r.read_u8()?,
            traveling: r.read_u8()? != 0,
        })
    }
}

/// Per-playback rainbow state.
#[derive(Debug, Clone)]
pub struct RainbowInstance {
    mask: u32,
    count: u8,
    fade: u8,
    intensity: u8,
    traveling: bool,
    duration_ms: u32,
}

impl RainbowInstance {
    pub(crate) fn start(header: &PresetHeader, preset: &RainbowPreset) -> Self {
        Self {
            mask: header.led_mask,
            count: preset.count,
            fade: preset.fade,
            intensity: preset.intensity,
            traveling: preset.traveling,
            duration_ms: u32::from(header.duration_ms).max(1),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn render(&self, t_ms: u32, leds: &mut [Rgb]) {
        let level = scale8(self.global_fade(t_ms), self.intensity);
        if level == 0 {
            return;
        }

        let base_hue = (t_ms * 256 * u32::from(self.count) / self.duration_ms) & 0xFF;
        let count = leds.len().max(1) as u32;
        for led in masked_leds(self.mask, leds.len()) {
            let hue = if self.traveling {
                base_hue + led as u32 * 256 * u32::from(self.count) / count
            } else {
                base_hue
            };
            leds[led] = scale_color(rainbow_wheel((hue & 0xFF) as u8), level);
        }
    }

    /// Fade envelope bracketing the whole run.
    #[allow(clippy::cast_possible_truncation)]
    fn global_fade(&self, t_ms: u32) -> u8 {
        let ramp = self.duration_ms * u32::from(self.fade) / 510;
        if ramp == 0 {
            return 255;
        }
        if t_ms < ramp {
            return (t_ms * 255 / ramp) as u8;
        }
        let remaining = self.duration_ms.saturating_sub(t_ms);
        if remaining < ramp {
            return (remaining * 255 / ramp) as u8;
        }
        255
    }
}
