//! Internal logging shim.
//!
//! Diagnostics are compiled out unless the `esp32-log` feature is enabled,
//! in which case they go through `esp-println`.

macro_rules! warn_log {
    ($($arg:tt)*) => {{
        #[cfg(feature = "esp32-log")]
        esp_println::println!($($arg)*);
        #[cfg(not(feature = "esp32-log"))]
        let _ = core::format_args!($($arg)*);
    }};
}
