//! Integer math helpers and fixed lookup tables.
//!
//! Everything here is integer-only so it behaves identically on hosts with
//! and without an FPU. Trigonometry goes through fixed 256-entry tables
//! over an 8-bit angle domain.

use embassy_time::Duration;

/// Scale an 8-bit value by a factor (0-255 = 0.0-1.0)
///
/// Uses integer math for efficiency on embedded systems.
#[inline]
#[allow(clippy::cast_lossless)]
pub const fn scale8(value: u8, scale: u8) -> u8 {
    ((value as u16 * (1 + scale as u16)) >> 8) as u8
}

/// Blend two 8-bit values
#[inline]
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub const fn blend8(a: u8, b: u8, amount_of_b: u8) -> u8 {
    let delta = b as i16 - a as i16;

    let mut partial: u32 = (a as u32) << 16; // a * 65536
    partial = partial.wrapping_add(
        (delta as u32)
            .wrapping_mul(amount_of_b as u32)
            .wrapping_mul(257),
    ); // (b - a) * amount_of_b * 257
    partial = partial.wrapping_add(0x8000); // + 32768 for rounding

    (partial >> 16) as u8
}

/// Calculate progress (0-255) based on elapsed time and duration
#[allow(clippy::cast_possible_truncation)]
#[inline]
pub const fn progress8(elapsed: Duration, duration: Duration) -> u8 {
    if duration.as_millis() == 0 {
        return 0;
    }
    if elapsed.as_millis() >= duration.as_millis() {
        return 255;
    }

    ((elapsed.as_millis() * 255) / duration.as_millis()) as u8
}

/// Integer square root for 32-bit values
///
/// Classic bit-by-bit method, no division.
#[allow(clippy::cast_possible_truncation)]
pub const fn sqrt32(value: u32) -> u16 {
    let mut remainder = value;
    let mut result: u32 = 0;
    let mut bit: u32 = 1 << 30;

    while bit > remainder {
        bit >>= 2;
    }
    while bit != 0 {
        if remainder >= result + bit {
            remainder -= result + bit;
            result = (result >> 1) + bit;
        } else {
            result >>= 1;
        }
        bit >>= 2;
    }

    result as u16
}

/// Sine over the 8-bit angle circle: 0 = 128, 64 = 255, 192 = 1
#[inline]
pub fn sin8(theta: u8) -> u8 {
    SIN8_TABLE[theta as usize]
}

/// Cosine via the sine table with a quarter-circle phase offset
#[inline]
pub fn cos8(theta: u8) -> u8 {
    SIN8_TABLE[theta.wrapping_add(64) as usize]
}

/// Inverse sine: input 0-255 maps -1..1, output angle 0-255 over -pi/2..pi/2
#[inline]
pub fn asin8(value: u8) -> u8 {
    ASIN8_TABLE[value as usize]
}

/// Inverse cosine: input 0-255 maps -1..1, output angle 0-255 over 0..pi
#[inline]
pub fn acos8(value: u8) -> u8 {
    ACOS8_TABLE[value as usize]
}

pub(crate) const SIN8_TABLE: [u8; 256] = [
    128, 131, 134, 137, 140, 144, 147, 150, 153, 156, 159, 162, 165, 168, 171, 174,
    177, 179, 182, 185, 188, 191, 193, 196, 199, 201, 204, 206, 209, 211, 213, 216,
    218, 220, 222, 224, 226, 228, 230, 232, 234, 235, 237, 239, 240, 241, 243, 244,
    245, 246, 248, 249, 250, 250, 251, 252, 253, 253, 254, 254, 254, 255, 255, 255,
    255, 255, 255, 255, 254, 254, 254, 253, 253, 252, 251, 250, 250, 249, 248, 246,
    245, 244, 243, 241, 240, 239, 237, 235, 234, 232, 230, 228, 226, 224, 222, 220,
    218, 216, 213, 211, 209, 206, 204, 201, 199, 196, 193, 191, 188, 185, 182, 179,
    177, 174, 171, 168, 165, 162, 159, 156, 153, 150, 147, 144, 140, 137, 134, 131,
    128, 125, 122, 119, 116, 112, 109, 106, 103, 100, 97, 94, 91, 88, 85, 82,
    79, 77, 74, 71, 68, 65, 63, 60, 57, 55, 52, 50, 47, 45, 43, 40,
    38, 36, 34, 32, 30, 28, 26, 24, 22, 21, 19, 17, 16, 15, 13, 12,
    11, 10, 8, 7, 6, 6, 5, 4, 3, 3, 2, 2, 2, 1, 1, 1,
    1, 1, 1, 1, 2, 2, 2, 3, 3, 4, 5, 6, 6, 7, 8, 10,
    11, 12, 13, 15, 16, 17, 19, 21, 22, 24, 26, 28, 30, 32, 34, 36,
    38, 40, 43, 45, 47, 50, 52, 55, 57, 60, 63, 65, 68, 71, 74, 77,
    79, 82, 85, 88, 91, 94, 97, 100, 103, 106, 109, 112, 116, 119, 122, 125,
];

pub(crate) const ASIN8_TABLE: [u8; 256] = [
    0, 10, 14, 18, 20, 23, 25, 27, 29, 31, 32, 34, 35, 37, 38, 40,
    41, 42, 44, 45, 46, 47, 48, 49, 51, 52, 53, 54, 55, 56, 57, 58,
    59, 60, 61, 61, 62, 63, 64, 65, 66, 67, 68, 69, 69, 70, 71, 72,
    73, 74, 74, 75, 76, 77, 77, 78, 79, 80, 81, 81, 82, 83, 84, 84,
    85, 86, 86, 87, 88, 89, 89, 90, 91, 91, 92, 93, 94, 94, 95, 96,
    96, 97, 98, 98, 99, 100, 100, 101, 102, 102, 103, 104, 104, 105, 106, 106,
    107, 108, 108, 109, 110, 110, 111, 112, 112, 113, 113, 114, 115, 115, 116, 117,
    117, 118, 119, 119, 120, 121, 121, 122, 122, 123, 124, 124, 125, 126, 126, 127,
    128, 128, 129, 129, 130, 131, 131, 132, 133, 133, 134, 134, 135, 136, 136, 137,
    138, 138, 139, 140, 140, 141, 142, 142, 143, 143, 144, 145, 145, 146, 147, 147,
    148, 149, 149, 150, 151, 151, 152, 153, 153, 154, 155, 155, 156, 157, 157, 158,
    159, 159, 160, 161, 161, 162, 163, 164, 164, 165, 166, 166, 167, 168, 169, 169,
    170, 171, 171, 172, 173, 174, 174, 175, 176, 177, 178, 178, 179, 180, 181, 181,
    182, 183, 184, 185, 186, 186, 187, 188, 189, 190, 191, 192, 193, 194, 194, 195,
    196, 197, 198, 199, 200, 201, 202, 203, 204, 206, 207, 208, 209, 210, 211, 213,
    214, 215, 217, 218, 220, 221, 223, 224, 226, 228, 230, 232, 235, 237, 241, 245,
];

pub(crate) const ACOS8_TABLE: [u8; 256] = [
    255, 245, 241, 237, 235, 232, 230, 228, 226, 224, 223, 221, 220, 218, 217, 215,
    214, 213, 211, 210, 209, 208, 207, 206, 204, 203, 202, 201, 200, 199, 198, 197,
    196, 195, 194, 194, 193, 192, 191, 190, 189, 188, 187, 186, 186, 185, 184, 183,
    182, 181, 181, 180, 179, 178, 178, 177, 176, 175, 174, 174, 173, 172, 171, 171,
    170, 169, 169, 168, 167, 166, 166, 165, 164, 164, 163, 162, 161, 161, 160, 159,
    159, 158, 157, 157, 156, 155, 155, 154, 153, 153, 152, 151, 151, 150, 149, 149,
    148, 147, 147, 146, 145, 145, 144, 143, 143, 142, 142, 141, 140, 140, 139, 138,
    138, 137, 136, 136, 135, 134, 134, 133, 133, 132, 131, 131, 130, 129, 129, 128,
    128, 127, 126, 126, 125, 124, 124, 123, 122, 122, 121, 121, 120, 119, 119, 118,
    117, 117, 116, 115, 115, 114, 113, 113, 112, 112, 111, 110, 110, 109, 108, 108,
    107, 106, 106, 105, 104, 104, 103, 102, 102, 101, 100, 100, 99, 98, 98, 97,
    96, 96, 95, 94, 94, 93, 92, 91, 91, 90, 89, 89, 88, 87, 86, 86,
    85, 84, 84, 83, 82, 81, 81, 80, 79, 78, 77, 77, 76, 75, 74, 74,
    73, 72, 71, 70, 69, 69, 68, 67, 66, 65, 64, 63, 62, 61, 61, 60,
    59, 58, 57, 56, 55, 54, 53, 52, 51, 49, 48, 47, 46, 45, 44, 42,
    41, 40, 38, 37, 35, 34, 32, 31, 29, 27, 25, 23, 20, 18, 14, 10,
];
