//! Self-correcting fixed-interval tick driver
//!
//! The scheduler never owns a clock. Callers feed it the current time in
//! milliseconds and it answers whether a simulation step is due. The native
//! binary drives it from `Instant`; tests drive it from a simulated clock.

use std::time::Duration;

use crate::consts::{STEP_TIME_ALPHA, TICK_INTERVAL_MS, TICK_SLACK_MS, TICK_STALL_MS};

/// Answer from [`TickScheduler::poll`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Poll {
    /// Nothing due yet, poll again after this long
    Wait(Duration),
    /// Run exactly one simulation step now
    Step,
}

#[derive(Debug, Clone)]
pub struct TickScheduler {
    interval_ms: f64,
    /// Reference clock: the time the last step was scheduled for
    timestamp_ms: f64,
    /// Moving average of step duration (diagnostics)
    step_time_avg_ms: f64,
    /// Duration of the most recent step
    last_step_ms: f64,
    steps: u64,
    stalls: u64,
}

impl TickScheduler {
    pub fn new(now_ms: f64) -> Self {
        Self::with_interval(now_ms, TICK_INTERVAL_MS)
    }

    pub fn with_interval(now_ms: f64, interval_ms: f64) -> Self {
        Self {
            interval_ms,
            timestamp_ms: now_ms,
            step_time_avg_ms: 0.0,
            last_step_ms: 0.0,
            steps: 0,
            stalls: 0,
        }
    }

    /// Decide whether a step is due at `now_ms`.
    ///
    /// A gap just under the interval (within the slack) already counts as due.
    /// A gap beyond the stall threshold re-baselines the reference clock to
    /// `now - interval`, so at most one step runs for the whole stall.
    pub fn poll(&mut self, now_ms: f64) -> Poll {
        let dt = now_ms - self.timestamp_ms;
        let due_at = self.interval_ms - TICK_SLACK_MS;
        if dt < due_at {
            return Poll::Wait(Duration::from_secs_f64((due_at - dt).max(0.0) / 1000.0));
        }

        if dt > TICK_STALL_MS {
            self.stalls += 1;
            log::warn!(
                "Tick stalled for {:.0} ms, re-baselining (avg step {:.2} ms)",
                dt,
                self.step_time_avg_ms
            );
            self.timestamp_ms = now_ms - self.interval_ms;
        }

        self.step_time_avg_ms += STEP_TIME_ALPHA * (self.last_step_ms - self.step_time_avg_ms);
        self.timestamp_ms += self.interval_ms;
        self.steps += 1;
        Poll::Step
    }

    /// Report how long the step just run took
    pub fn record_step(&mut self, duration_ms: f64) {
        self.last_step_ms = duration_ms;
    }

    pub fn step_time_avg_ms(&self) -> f64 {
        self.step_time_avg_ms
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn stalls(&self) -> u64 {
        self.stalls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the scheduler over `[from, to)` in 1 ms increments, returning steps taken
    fn run(scheduler: &mut TickScheduler, from: f64, to: f64) -> u64 {
        let mut steps = 0;
        let mut now = from;
        while now < to {
            while scheduler.poll(now) == Poll::Step {
                scheduler.record_step(2.0);
                steps += 1;
            }
            now += 1.0;
        }
        steps
    }

    #[test]
    fn test_steady_rate() {
        let mut scheduler = TickScheduler::new(0.0);
        let steps = run(&mut scheduler, 0.0, 1000.0);
        assert!((24..=26).contains(&steps), "expected ~25 steps, got {steps}");
        assert_eq!(scheduler.stalls(), 0);
    }

    #[test]
    fn test_waits_before_due() {
        let mut scheduler = TickScheduler::new(0.0);
        match scheduler.poll(10.0) {
            Poll::Wait(d) => assert!((d.as_secs_f64() * 1000.0 - 25.0).abs() < 1e-6),
            Poll::Step => panic!("step fired early"),
        }
        assert_eq!(scheduler.poll(35.0), Poll::Step);
    }

    #[test]
    fn test_stall_rebaselines() {
        let mut scheduler = TickScheduler::new(0.0);
        run(&mut scheduler, 0.0, 200.0);
        let before = scheduler.steps();

        // 5 second stall: nothing polled until t = 5200
        let burst = run(&mut scheduler, 5200.0, 5201.0);
        assert_eq!(burst, 1, "a stall must not replay the backlog");
        assert_eq!(scheduler.stalls(), 1);

        let after = run(&mut scheduler, 5201.0, 5400.0);
        assert!(after <= 6, "expected normal pacing after stall, got {after}");
        assert!(scheduler.steps() - before < 10);
    }

    #[test]
    fn test_small_lag_catches_up() {
        let mut scheduler = TickScheduler::new(0.0);
        // 100 ms late but below the stall threshold: catch up tick by tick
        let steps = run(&mut scheduler, 100.0, 101.0);
        assert_eq!(steps, 2);
        assert_eq!(scheduler.stalls(), 0);
    }

    #[test]
    fn test_step_time_average() {
        let mut scheduler = TickScheduler::new(0.0);
        scheduler.record_step(8.0);
        assert_eq!(scheduler.poll(40.0), Poll::Step);
        assert!((scheduler.step_time_avg_ms() - 4.0).abs() < 1e-9);
        scheduler.record_step(8.0);
        assert_eq!(scheduler.poll(80.0), Poll::Step);
        assert!((scheduler.step_time_avg_ms() - 6.0).abs() < 1e-9);
    }
}
