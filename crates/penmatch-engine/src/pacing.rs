use std::thread;
use std::time::Duration;

/// Pacing applied after each successful decision call.
///
/// Implementations block the calling worker; the evaluator calls
/// [`Pacer::pause`] exactly once per pair that reaches a decision response.
pub trait Pacer: Send + Sync {
    fn pause(&self);
}

/// Sleeps for a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPause {
    interval: Duration,
}

impl FixedPause {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Pacer for FixedPause {
    fn pause(&self) {
        if !self.interval.is_zero() {
            thread::sleep(self.interval);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoPause;

impl Pacer for NoPause {
    fn pause(&self) {}
}

/// `FixedPause` for a non-zero interval, `NoPause` otherwise.
pub fn pacer_for_millis(millis: u64) -> Box<dyn Pacer> {
    if millis == 0 {
        Box::new(NoPause)
    } else {
        Box::new(FixedPause::new(Duration::from_millis(millis)))
    }
}
