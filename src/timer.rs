//! Countdown core: duration parsing, drift-corrected ticking, display.
//!
//! This is the pure state machine; the event loop around it lives in
//! `tasks::countdown`. Keeping the tick math free of any clock source makes
//! the drift correction testable with plain `Instant` arithmetic.

use std::time::{Duration, Instant};

/// Default time between ticks.
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// A parsed duration spec. Multi-segment specs force the matching display
/// segments on, mirroring the host's `mm:ss` / `hh:mm:ss` conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDuration {
    pub millis: u64,
    pub forces_minutes: bool,
    pub forces_hours: bool,
}

/// Parse a duration spec into milliseconds.
///
/// Digits-only specs are whole seconds. Colon-separated specs read as
/// `[hh:][mm:]ss` with empty segments counting as zero. Anything that does
/// not survive numeric parsing degrades to zero; this function never fails.
pub fn parse_time_string(spec: &str) -> ParsedDuration {
    let mut parsed = ParsedDuration {
        millis: 0,
        forces_minutes: false,
        forces_hours: false,
    };

    if !spec.is_empty() && spec.bytes().all(|b| b.is_ascii_digit()) {
        parsed.millis = seconds_to_millis(spec.parse::<f64>().unwrap_or(f64::NAN));
        return parsed;
    }

    if spec.contains(':') {
        let segments: Vec<&str> = spec.split(':').collect();
        let mut iter = segments.iter().rev();
        let mut total_seconds = iter.next().map_or(0.0, |s| parse_segment(s));
        if let Some(minutes) = iter.next() {
            parsed.forces_minutes = true;
            total_seconds += parse_segment(minutes) * 60.0;
        }
        if let Some(hours) = iter.next() {
            parsed.forces_hours = true;
            total_seconds += parse_segment(hours) * 3600.0;
        }
        parsed.millis = seconds_to_millis(total_seconds);
        return parsed;
    }

    parsed.millis = seconds_to_millis(spec.trim().parse::<f64>().unwrap_or(f64::NAN));
    parsed
}

fn parse_segment(segment: &str) -> f64 {
    let segment = segment.trim();
    if segment.is_empty() {
        0.0
    } else {
        segment.parse::<f64>().unwrap_or(f64::NAN)
    }
}

fn seconds_to_millis(seconds: f64) -> u64 {
    let millis = (seconds * 1000.0).round();
    if millis.is_finite() && millis > 0.0 {
        millis as u64
    } else {
        0
    }
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Countdown still running; the next tick is due after `next_wait`.
    Continue { remaining_ms: u64, next_wait: Duration },
    /// Countdown finished on this tick. Fires at most once per armed run.
    Complete,
}

/// The countdown state machine.
///
/// Owns the remaining time and the previous-tick timestamp; arming always
/// resets both, so a re-arm can never inherit drift from the prior run.
#[derive(Debug)]
pub struct CountdownCore {
    interval_ms: u64,
    show_minutes: bool,
    show_hours: bool,
    remaining_ms: u64,
    last_tick_at: Option<Instant>,
}

impl CountdownCore {
    pub fn new(interval_ms: u64, show_minutes: bool, show_hours: bool) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            show_minutes,
            show_hours,
            remaining_ms: 0,
            last_tick_at: None,
        }
    }

    /// Re-arm with a fresh duration spec. Returns the new remaining time.
    ///
    /// A spec written with explicit minute/hour segments keeps those display
    /// segments on for the rest of the widget's life.
    pub fn arm(&mut self, spec: &str) -> u64 {
        let parsed = parse_time_string(spec);
        self.show_minutes |= parsed.forces_minutes;
        self.show_hours |= parsed.forces_hours;
        self.remaining_ms = parsed.millis;
        self.last_tick_at = None;
        self.remaining_ms
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Advance the countdown to `now`.
    ///
    /// The first tick of a run sees zero elapsed time, so a zero-length
    /// duration never completes synchronously on arm; it completes on the
    /// first real tick after it. The returned wait compensates for timer
    /// overrun: the raw wait is `interval - (elapsed % interval)`, bumped by
    /// one full interval when it would undershoot half the interval.
    pub fn tick(&mut self, now: Instant) -> Tick {
        let elapsed_ms = match self.last_tick_at {
            Some(prev) => now.saturating_duration_since(prev).as_millis() as u64,
            None => 0,
        };
        let first_tick = self.last_tick_at.is_none();
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms);
        self.last_tick_at = Some(now);

        if !first_tick && self.remaining_ms == 0 {
            return Tick::Complete;
        }

        let mut wait_ms = self.interval_ms - (elapsed_ms % self.interval_ms);
        if wait_ms * 2 < self.interval_ms {
            wait_ms += self.interval_ms;
        }
        Tick::Continue {
            remaining_ms: self.remaining_ms,
            next_wait: Duration::from_millis(wait_ms),
        }
    }

    /// Format the remaining time as `[hh:][mm:]ss`, zero-padded.
    pub fn render(&self) -> String {
        let total_seconds = (self.remaining_ms as f64 / 1000.0).round() as u64;
        let seconds = total_seconds % 60;
        let minutes = (total_seconds / 60) % 60;
        let hours = total_seconds / 3600;

        let mut display = String::new();
        if self.show_hours {
            display.push_str(&format!("{:02}:", hours));
        }
        if self.show_hours || self.show_minutes {
            display.push_str(&format!("{:02}:", minutes));
        }
        display.push_str(&format!("{:02}", seconds));
        display
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_only_spec_is_whole_seconds() {
        assert_eq!(parse_time_string("90").millis, 90_000);
        assert!(!parse_time_string("90").forces_minutes);
        assert!(!parse_time_string("90").forces_hours);
    }

    #[test]
    fn colon_spec_forces_display_segments() {
        let parsed = parse_time_string("1:30");
        assert_eq!(parsed.millis, 90_000);
        assert!(parsed.forces_minutes);
        assert!(!parsed.forces_hours);

        let parsed = parse_time_string("01:02:03");
        assert_eq!(parsed.millis, 3_723_000);
        assert!(parsed.forces_minutes);
        assert!(parsed.forces_hours);
    }

    #[test]
    fn empty_segments_count_as_zero() {
        assert_eq!(parse_time_string("1:").millis, 60_000);
        assert_eq!(parse_time_string(":30").millis, 30_000);
    }

    #[test]
    fn non_numeric_residue_degrades_to_zero() {
        assert_eq!(parse_time_string("abc").millis, 0);
        assert_eq!(parse_time_string("1:ab").millis, 0);
        assert_eq!(parse_time_string("").millis, 0);
        assert_eq!(parse_time_string("-5").millis, 0);
    }

    #[test]
    fn fractional_seconds_are_kept() {
        assert_eq!(parse_time_string("1.5").millis, 1_500);
    }

    fn continue_parts(tick: Tick) -> (u64, Duration) {
        match tick {
            Tick::Continue {
                remaining_ms,
                next_wait,
            } => (remaining_ms, next_wait),
            Tick::Complete => panic!("expected a continuing tick"),
        }
    }

    #[test]
    fn run_completes_exactly_on_elapsed_duration() {
        let mut core = CountdownCore::new(1000, true, false);
        core.arm("2");
        let t0 = Instant::now();

        let (remaining, wait) = continue_parts(core.tick(t0));
        assert_eq!(remaining, 2000);
        assert_eq!(wait, Duration::from_millis(1000));

        let (remaining, _) = continue_parts(core.tick(t0 + Duration::from_millis(1000)));
        assert_eq!(remaining, 1000);

        assert_eq!(core.tick(t0 + Duration::from_millis(2000)), Tick::Complete);
    }

    #[test]
    fn zero_duration_does_not_complete_on_first_tick() {
        let mut core = CountdownCore::new(1000, true, false);
        core.arm("0");
        let t0 = Instant::now();

        let (remaining, _) = continue_parts(core.tick(t0));
        assert_eq!(remaining, 0);
        assert_eq!(core.tick(t0 + Duration::from_millis(1000)), Tick::Complete);
    }

    #[test]
    fn overrun_shrinks_next_wait() {
        let mut core = CountdownCore::new(1000, true, false);
        core.arm("10");
        let t0 = Instant::now();
        core.tick(t0);

        // 1400ms elapsed: wait 600ms to get back on the second boundary.
        let (_, wait) = continue_parts(core.tick(t0 + Duration::from_millis(1400)));
        assert_eq!(wait, Duration::from_millis(600));
    }

    #[test]
    fn short_wait_is_bumped_a_full_interval() {
        let mut core = CountdownCore::new(1000, true, false);
        core.arm("10");
        let t0 = Instant::now();
        core.tick(t0);

        // 1600ms elapsed: a raw 400ms wait undershoots half the interval.
        let (_, wait) = continue_parts(core.tick(t0 + Duration::from_millis(1600)));
        assert_eq!(wait, Duration::from_millis(1400));
    }

    #[test]
    fn rearm_resets_remaining_and_drift_state() {
        let mut core = CountdownCore::new(1000, true, false);
        core.arm("5");
        let t0 = Instant::now();
        core.tick(t0);
        core.tick(t0 + Duration::from_millis(3000));

        core.arm("5");
        // First tick of the new run sees zero elapsed again.
        let (remaining, _) = continue_parts(core.tick(t0 + Duration::from_millis(9000)));
        assert_eq!(remaining, 5000);
    }

    #[test]
    fn render_pads_and_honors_forced_segments() {
        let mut core = CountdownCore::new(1000, true, false);
        core.arm("90");
        assert_eq!(core.render(), "01:30");

        core.arm("01:02:03");
        assert_eq!(core.render(), "01:02:03");

        // Hour display stays forced after a multi-segment spec.
        core.arm("5");
        assert_eq!(core.render(), "00:00:05");
    }

    #[test]
    fn render_rounds_to_nearest_second() {
        let mut core = CountdownCore::new(1000, true, false);
        core.arm("2");
        let t0 = Instant::now();
        core.tick(t0);
        // 1700ms remaining rounds up to two seconds.
        core.tick(t0 + Duration::from_millis(300));
        assert_eq!(core.remaining_ms(), 1700);
        assert_eq!(core.render(), "00:02");
    }
}
