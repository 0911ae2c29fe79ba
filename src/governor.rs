//! Performance governor: samples the frame rate and permanently disables
//! the bloom stage under sustained degradation.
//!
//! Sampling is frame-count driven: every 60 recorded frames the elapsed
//! wall time is reduced to an FPS estimate. Three consecutive low samples
//! while bloom is enabled emit a single disable verdict. There is no
//! recovery path within a session; graceful degradation without
//! hysteresis is intentional.

use std::time::Instant;

/// Frames between FPS samples.
pub const FPS_SAMPLE_INTERVAL_FRAMES: u32 = 60;
/// Samples below this rate count toward the low streak.
pub const LOW_FPS_THRESHOLD: f32 = 45.0;
/// Consecutive low samples required before bloom is dropped.
pub const LOW_FPS_STREAK_LIMIT: u32 = 3;

/// Outcome of recording one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernorVerdict {
    /// Nothing to change this frame.
    Steady,
    /// Sustained low frame rate: the caller must disable bloom and never
    /// re-enable it for the rest of the session.
    DisableBloom,
}

/// Rolling frame-rate state. Timestamps are injected so the state machine
/// can be driven with synthetic feeds in tests.
#[derive(Debug)]
pub struct FrameGovernor {
    frames_since_sample: u32,
    last_sample_at: Instant,
    current_fps: f32,
    low_streak: u32,
}

impl FrameGovernor {
    pub fn new(now: Instant) -> Self {
        Self {
            frames_since_sample: 0,
            last_sample_at: now,
            current_fps: 60.0,
            low_streak: 0,
        }
    }

    /// Records a rendered frame. At every sample boundary the FPS
    /// estimate is refreshed and compared against the threshold;
    /// `bloom_enabled` tells the governor whether a disable verdict would
    /// still mean anything.
    pub fn record_frame(&mut self, now: Instant, bloom_enabled: bool) -> GovernorVerdict {
        self.frames_since_sample += 1;
        if self.frames_since_sample < FPS_SAMPLE_INTERVAL_FRAMES {
            return GovernorVerdict::Steady;
        }

        let elapsed_ms = now.saturating_duration_since(self.last_sample_at).as_secs_f32() * 1000.0;
        if elapsed_ms > 0.0 {
            self.current_fps = 1000.0 * self.frames_since_sample as f32 / elapsed_ms;
        }
        self.last_sample_at = now;
        self.frames_since_sample = 0;

        if self.current_fps < LOW_FPS_THRESHOLD {
            self.low_streak += 1;
            if self.low_streak >= LOW_FPS_STREAK_LIMIT && bloom_enabled {
                log::warn!(
                    "sustained low frame rate ({:.0} fps), disabling bloom",
                    self.current_fps
                );
                return GovernorVerdict::DisableBloom;
            }
        } else {
            self.low_streak = 0;
        }

        GovernorVerdict::Steady
    }

    /// The most recent FPS estimate.
    pub fn current_fps(&self) -> f32 {
        self.current_fps
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    /// Feeds `windows` sample windows at the given per-window duration,
    /// collecting any disable verdicts. `bloom_enabled` is flipped off as
    /// soon as a disable is seen, mirroring the caller's contract.
    fn feed_windows(
        governor: &mut FrameGovernor,
        start: Instant,
        windows: u32,
        window_duration: Duration,
        bloom_enabled: &mut bool,
    ) -> u32 {
        let mut disables = 0;
        let mut now = start;
        for _ in 0..windows {
            now += window_duration;
            // All frames in a window share its end timestamp; only the
            // sample boundary reads the clock.
            for _ in 0..FPS_SAMPLE_INTERVAL_FRAMES {
                if governor.record_frame(now, *bloom_enabled) == GovernorVerdict::DisableBloom {
                    disables += 1;
                    *bloom_enabled = false;
                }
            }
        }
        disables
    }

    #[test]
    fn healthy_frame_rate_never_disables_bloom() {
        let start = Instant::now();
        let mut governor = FrameGovernor::new(start);
        let mut bloom = true;
        // 60 frames per second-long window = 60 fps.
        let disables = feed_windows(&mut governor, start, 10, Duration::from_secs(1), &mut bloom);
        assert_eq!(disables, 0);
        assert!(bloom);
        assert!((governor.current_fps() - 60.0).abs() < 1.0);
    }

    #[test]
    fn sustained_low_fps_emits_exactly_one_disable() {
        let start = Instant::now();
        let mut governor = FrameGovernor::new(start);
        let mut bloom = true;
        // 60 frames spread over 2 seconds = 30 fps, below the threshold.
        let disables = feed_windows(&mut governor, start, 3, Duration::from_secs(2), &mut bloom);
        assert_eq!(disables, 1);
        assert!(!bloom);
    }

    #[test]
    fn recovery_after_disable_never_re_enables() {
        let start = Instant::now();
        let mut governor = FrameGovernor::new(start);
        let mut bloom = true;
        feed_windows(&mut governor, start, 3, Duration::from_secs(2), &mut bloom);
        assert!(!bloom);

        // Frame rate recovers fully; no further verdicts are emitted and
        // the caller keeps bloom off.
        let later = start + Duration::from_secs(6);
        let disables = feed_windows(&mut governor, later, 10, Duration::from_secs(1), &mut bloom);
        assert_eq!(disables, 0);
        assert!(!bloom);
    }

    #[test]
    fn a_good_sample_resets_the_low_streak() {
        let start = Instant::now();
        let mut governor = FrameGovernor::new(start);
        let mut bloom = true;

        // Two low windows, one good window, two low windows: the streak
        // never reaches three in a row.
        let mut now = start;
        for window_duration in [2, 2, 1, 2, 2] {
            let disables = feed_windows(
                &mut governor,
                now,
                1,
                Duration::from_secs(window_duration),
                &mut bloom,
            );
            assert_eq!(disables, 0);
            now += Duration::from_secs(window_duration);
        }
        assert!(bloom);
    }

    #[test]
    fn fps_is_sampled_only_at_window_boundaries() {
        let start = Instant::now();
        let mut governor = FrameGovernor::new(start);
        let initial_fps = governor.current_fps();

        for i in 1..FPS_SAMPLE_INTERVAL_FRAMES {
            governor.record_frame(start + Duration::from_millis(i as u64), true);
            assert_eq!(governor.current_fps(), initial_fps);
        }
    }
}
