mod tests {
    use die_anim::math8::{acos8, asin8, blend8, cos8, progress8, scale8, sin8, sqrt32};
    use embassy_time::Duration;

    #[test]
    fn test_scale8() {
        assert_eq!(scale8(255, 128), 128);
        assert_eq!(scale8(0, 128), 0);
        assert_eq!(scale8(128, 128), 64);
        assert_eq!(scale8(128, 255), 128);
        assert_eq!(scale8(128, 0), 0);
    }

    #[test]
    fn test_blend8() {
        assert_eq!(blend8(255, 128, 128), 191);
        assert_eq!(blend8(0, 128, 255), 128);
        assert_eq!(blend8(255, 0, 128), 127);
        assert_eq!(blend8(255, 128, 0), 255);
    }

    #[test]
    fn test_progress8() {
        assert_eq!(
            progress8(Duration::from_millis(0), Duration::from_millis(100)),
            0
        );
        assert_eq!(
            progress8(Duration::from_millis(50), Duration::from_millis(100)),
            127
        );
        assert_eq!(
            progress8(Duration::from_millis(100), Duration::from_millis(100)),
            255
        );
    }

    #[test]
    fn test_sqrt32() {
        assert_eq!(sqrt32(0), 0);
        assert_eq!(sqrt32(1), 1);
        assert_eq!(sqrt32(4), 2);
        assert_eq!(sqrt32(10000), 100);
        assert_eq!(sqrt32(10001), 100);
        assert_eq!(sqrt32(u32::MAX), 65535);
    }

    #[test]
    fn test_sin8_landmarks() {
        assert_eq!(sin8(0), 128);
        assert_eq!(sin8(64), 255);
        assert_eq!(sin8(128), 128);
        assert_eq!(sin8(192), 1);
    }

    #[test]
    fn test_cos8_is_phase_shifted_sin8() {
        for theta in 0..=255u8 {
            assert_eq!(cos8(theta), sin8(theta.wrapping_add(64)));
        }
    }

    #[test]
    fn test_asin8_landmarks() {
        assert_eq!(asin8(0), 0);
        assert_eq!(asin8(128), 128);
        assert_eq!(asin8(255), 245);
    }

    #[test]
    fn test_acos8_landmarks() {
        assert_eq!(acos8(0), 255);
        assert_eq!(acos8(128), 128);
        assert_eq!(acos8(255), 10);
    }

    // Away from the crossover at 128, the two inverse tables must
    // disagree; they are distinct tables, not aliases of each other.
    #[test]
    fn test_asin8_and_acos8_are_distinct() {
        assert_ne!(asin8(0), acos8(0));
        assert_ne!(asin8(32), acos8(32));
        assert_ne!(asin8(255), acos8(255));
    }
}
