//! Identifier blink: encodes the device's hardware identifier as a
//! self-clocked blink using three rotating colors.
//!
//! Payload = identifier followed by its 3-bit CRC (generator polynomial
//! `0b1011`), framed by a fixed 3-bit header and preceded by a white
//! preamble. Each bit advances the rotating color index by 1 (bit = 0)
//! or 2 (bit = 1) positions, so a receiver can recover the bit stream
//! from color changes alone. Wire fields after the header:
//! `frames_per_blink: u8`, `frame_duration_ms: u16`, `brightness: u8`.

use embassy_time::Duration;

use crate::buffer::{BufferError, ByteReader};
use crate::color::{Rgb, WHITE, scale_color};
use crate::preset::{PresetHeader, masked_leds};

/// Fixed 3-bit frame header, sent MSB first.
const IDENT_HEADER: u8 = 0b110;

/// Bits per transmission: header + 32-bit identifier + 3-bit CRC.
const IDENT_BITS: u32 = 3 + 32 + 3;

/// White preamble before the first bit.
const PREAMBLE_MS: u32 = 400;

/// The three rotating bit colors.
const ROTATION: [Rgb; 3] = [
    Rgb { r: 255, g: 0, b: 0 },
    Rgb { r: 0, g: 255, b: 0 },
    Rgb { r: 0, g: 0, b: 255 },
];

/// 3-bit CRC of an identifier: the remainder of binary long division of
/// `identifier << 3` by the generator polynomial `0b1011`.
#[allow(clippy::cast_possible_truncation)]
pub fn crc3(identifier: u32) -> u8 {
    let mut value = u64::from(identifier) << 3;
    for bit in (3..64).rev() {
        if value >> bit & 1 == 1 {
            value ^= 0b1011u64 << (bit - 3);
        }
    }
    (value & 0b111) as u8
}

/// The 35-bit identifier payload: identifier followed by its CRC.
pub fn build_ident_payload(identifier: u32) -> u64 {
    u64::from(identifier) << 3 | u64::from(crc3(identifier))
}

/// Decoded identifier-blink preset fields.
#[derive(Debug, Clone, Copy)]
pub struct BlinkIdPreset {
    pub frames_per_blink: u8,
    pub frame_duration_ms: u16,
    pub brightness: u8,
}

impl BlinkIdPreset {
    pub(crate) fn read(r: &mut ByteReader<'_>) -> Result<Self, BufferError> {
        Ok(Self {
            frames_per_blink: r.read_u8()?.max(1),
            frame_duration_ms: r.read_u16()?.max(1),
            brightness: r.read_u8()?,
        })
    }
}

/// Per-playback identifier-blink state.
///
/// The full bit stream is assembled once at start from the device
/// identifier global.
#[derive(Debug, Clone)]
pub struct BlinkIdInstance {
    mask: u32,
    /// Header + payload + CRC, MSB first in the low [`IDENT_BITS`] bits.
    bits: u64,
    bit_ms: u32,
    brightness: u8,
}

impl BlinkIdInstance {
    pub(crate) fn start(header: &PresetHeader, preset: &BlinkIdPreset, device_id: u32) -> Self {
        let bits = u64::from(IDENT_HEADER) << 35 | build_ident_payload(device_id);
        Self {
            mask: header.led_mask,
            bits,
            bit_ms: u32::from(preset.frames_per_blink) * u32::from(preset.frame_duration_ms),
            brightness: preset.brightness,
        }
    }

    /// Effective playback duration, derived from the bit count rather
    /// than the header field.
    pub(crate) fn duration(&self) -> Duration {
        Duration::from_millis(u64::from(PREAMBLE_MS + IDENT_BITS * self.bit_ms))
    }

    pub(crate) fn render(&self, t_ms: u32, leds: &mut [Rgb]) {
        let color = if t_ms < PREAMBLE_MS {
            WHITE
        } else {
            let elapsed = t_ms - PREAMBLE_MS;
            let index = elapsed / self.bit_ms;
            if index >= IDENT_BITS {
                return;
            }
            // Self-clocking: lit for the first half of each bit period.
            if elapsed % self.bit_ms >= self.bit_ms / 2 {
                return;
            }
            ROTATION[self.color_index(index)]
        };

        let color = scale_color(color, self.brightness);
        for led in masked_leds(self.mask, leds.len()) {
            leds[led] = color;
        }
    }

    /// Rotating color index after transmitting bits `0..=index`.
    #[allow(clippy::cast_possible_truncation)]
    fn color_index(&self, index: u32) -> usize {
        let mut rotation: u32 = 0;
        for bit in 0..=index {
            let value = self.bits >> (IDENT_BITS - 1 - bit) & 1;
            rotation += 1 + value as u32;
        }
        (rotation % 3) as usize
    }
}
