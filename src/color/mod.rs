mod palette;
mod utils;

use smart_leds::{RGB8, hsv::Hsv as HSV};
pub use palette::{PALETTE_SIZE, palette_color};
pub use utils::{blend_colors, max_colors, mul_colors, rainbow_wheel, scale_color};

pub type Rgb = RGB8;
pub type Hsv = HSV;

pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
pub const WHITE: Rgb = Rgb {
    r: 255,
    g: 255,
    b: 255,
};
