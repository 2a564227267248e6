//! Procedural rainbow palette referenced by palette color nodes.
//!
//! 64 entries in three brightness tiers plus white, generated on the fly
//! so the table costs no flash. Presets index it with a single byte.

use smart_leds::hsv::hsv2rgb;

use crate::color::{Hsv, Rgb, WHITE};

/// Number of palette entries a color node can index.
pub const PALETTE_SIZE: u8 = 64;

/// Hues per brightness tier.
const TIER_LEN: u8 = 20;

/// Look up a palette entry.
///
/// Entries 0-19 are full-brightness hues around the wheel, 20-39 the same
/// hues at half brightness, 40-59 at quarter brightness, and 60-63 white.
/// Indices wrap modulo [`PALETTE_SIZE`].
pub fn palette_color(index: u8) -> Rgb {
    let index = index % PALETTE_SIZE;
    let tier = index / TIER_LEN;
    if tier >= 3 {
        return WHITE;
    }

    #[allow(clippy::cast_possible_truncation)]
    let hue = (u16::from(index % TIER_LEN) * 256 / u16::from(TIER_LEN)) as u8;
    hsv2rgb(Hsv {
        hue,
        sat: 255,
        val: 255 >> tier,
    })
}
