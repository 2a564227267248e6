use smart_leds::hsv::hsv2rgb;

use crate::{
    color::{Hsv, Rgb},
    math8::{blend8, scale8},
};

/// Blend two RGB colors
///
/// # Arguments
/// * `a` - First color
/// * `b` - Second color
/// * `amount_of_b` - Blend factor (0 = all a, 255 = all b)
#[inline]
pub fn blend_colors(a: Rgb, b: Rgb, amount_of_b: u8) -> Rgb {
    Rgb {
        r: blend8(a.r, b.r, amount_of_b),
        g: blend8(a.g, b.g, amount_of_b),
        b: blend8(a.b, b.b, amount_of_b),
    }
}

/// Component-wise maximum of two colors.
///
/// This is the compositor's blend rule: brightest wins per channel, so
/// overlapping effects can never overflow a channel.
#[inline]
pub const fn max_colors(a: Rgb, b: Rgb) -> Rgb {
    Rgb {
        r: if a.r > b.r { a.r } else { b.r },
        g: if a.g > b.g { a.g } else { b.g },
        b: if a.b > b.b { a.b } else { b.b },
    }
}

/// Component-wise product of two colors, treating each channel as 0.0-1.0.
#[inline]
pub const fn mul_colors(a: Rgb, b: Rgb) -> Rgb {
    Rgb {
        r: scale8(a.r, b.r),
        g: scale8(a.g, b.g),
        b: scale8(a.b, b.b),
    }
}

/// Scale all channels of a color by a factor (0-255 = 0.0-1.0)
#[inline]
pub const fn scale_color(color: Rgb, scale: u8) -> Rgb {
    Rgb {
        r: scale8(color.r, scale),
        g: scale8(color.g, scale),
        b: scale8(color.b, scale),
    }
}

/// Fully saturated color on the 8-bit hue wheel
#[inline]
pub fn rainbow_wheel(hue: u8) -> Rgb {
    hsv2rgb(Hsv {
        hue,
        sat: 255,
        val: 255,
    })
}
