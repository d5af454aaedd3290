//! Explicit timer scheduler.
//!
//! Replaces engine-driven delayed calls with plain data: register a periodic
//! or one-shot timer carrying a payload, call [`Scheduler::advance`] with the
//! frame's time slice, and handle whatever payloads came due. A large slice
//! fires a periodic timer as many times as it elapsed.

use serde::{Deserialize, Serialize};

/// Intervals shorter than this are raised to it.
pub const MIN_INTERVAL: f64 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Timer<E> {
    /// Registration order, used to break ties.
    seq: u32,
    due: f64,
    /// `None` for one-shot timers.
    interval: Option<f64>,
    payload: E,
}

/// Timers keyed on simulated seconds since creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scheduler<E> {
    now: f64,
    next_seq: u32,
    timers: Vec<Timer<E>>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self {
            now: 0.0,
            next_seq: 0,
            timers: Vec::new(),
        }
    }
}

impl<E: Clone> Scheduler<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scheduler time in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Fire `payload` every `interval` seconds, first at `now + interval`.
    pub fn register_periodic(&mut self, interval: f64, payload: E) {
        let interval = if interval.is_finite() {
            interval.max(MIN_INTERVAL)
        } else {
            MIN_INTERVAL
        };
        self.push(self.now + interval, Some(interval), payload);
    }

    /// Fire `payload` once, `delay` seconds from now. A zero delay fires on
    /// the next advance.
    pub fn register_once(&mut self, delay: f64, payload: E) {
        let delay = if delay.is_finite() { delay.max(0.0) } else { 0.0 };
        self.push(self.now + delay, None, payload);
    }

    /// Advance by `dt` seconds, returning due payloads in firing order.
    /// Ties fire in registration order. Negative or non-finite slices do
    /// nothing.
    pub fn advance(&mut self, dt: f64) -> Vec<E> {
        if !dt.is_finite() || dt <= 0.0 {
            return Vec::new();
        }
        self.now += dt;

        let mut fired: Vec<(f64, u32, E)> = Vec::new();
        for timer in &mut self.timers {
            while timer.due <= self.now {
                fired.push((timer.due, timer.seq, timer.payload.clone()));
                match timer.interval {
                    Some(interval) => timer.due += interval,
                    None => {
                        timer.due = f64::INFINITY;
                        break;
                    }
                }
            }
        }
        self.timers.retain(|t| t.due.is_finite());

        fired.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        fired.into_iter().map(|(_, _, payload)| payload).collect()
    }

    fn push(&mut self, due: f64, interval: Option<f64>, payload: E) {
        self.timers.push(Timer {
            seq: self.next_seq,
            due,
            interval,
            payload,
        });
        self.next_seq += 1;
    }
}
