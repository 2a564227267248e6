mod tests {
    use die_anim::color::Rgb;
    use die_anim::controller::{Controller, ControllerConfig};
    use die_anim::frame_scheduler::{DEFAULT_FRAME_DURATION, FrameScheduler};
    use die_anim::{Duration, IdentityLayout, Instant, OutputDriver};

    #[derive(Default)]
    struct RecordingDriver {
        writes: usize,
        last_len: usize,
    }

    impl OutputDriver for &mut RecordingDriver {
        fn write(&mut self, colors: &[Rgb]) {
            self.writes += 1;
            self.last_len = colors.len();
        }
    }

    fn scheduler<'a, 'd>(
        driver: &'d mut RecordingDriver,
    ) -> FrameScheduler<'a, &'d mut RecordingDriver, IdentityLayout, 8> {
        let config = ControllerConfig::default();
        let mut controller = Controller::new(IdentityLayout { count: 4 }, &config);
        controller.init();
        controller.set_running(true);
        FrameScheduler::new(controller, driver)
    }

    #[test]
    fn test_tick_writes_one_frame_and_schedules_the_next() {
        let mut driver = RecordingDriver::default();
        let mut scheduler = scheduler(&mut driver);

        let result = scheduler.tick(Instant::from_millis(0));
        assert_eq!(result.next_deadline, Instant::from_millis(0) + DEFAULT_FRAME_DURATION);
        assert_eq!(result.sleep_duration, DEFAULT_FRAME_DURATION);

        drop(scheduler);
        assert_eq!(driver.writes, 1);
        assert_eq!(driver.last_len, 4);
    }

    #[test]
    fn test_deadlines_advance_by_whole_frames() {
        let mut driver = RecordingDriver::default();
        let mut scheduler = scheduler(&mut driver);

        let first = scheduler.tick(Instant::from_millis(0));
        let second = scheduler.tick(first.next_deadline);
        assert_eq!(
            second.next_deadline,
            first.next_deadline + DEFAULT_FRAME_DURATION
        );
    }

    #[test]
    fn test_falling_far_behind_resets_the_schedule() {
        let mut driver = RecordingDriver::default();
        let mut scheduler = scheduler(&mut driver);
        scheduler.tick(Instant::from_millis(0));

        // A long stall must not trigger a catch-up burst.
        let late = Instant::from_millis(5000);
        let result = scheduler.tick(late);
        assert_eq!(result.next_deadline, late + DEFAULT_FRAME_DURATION);
    }

    #[test]
    fn test_slightly_late_tick_keeps_the_grid() {
        let mut driver = RecordingDriver::default();
        let mut scheduler = scheduler(&mut driver);
        let first = scheduler.tick(Instant::from_millis(0));

        // A few ms late is within the drift window; the next deadline
        // stays on the original grid.
        let result = scheduler.tick(first.next_deadline + Duration::from_millis(5));
        assert_eq!(
            result.next_deadline,
            first.next_deadline + DEFAULT_FRAME_DURATION
        );
    }
}
