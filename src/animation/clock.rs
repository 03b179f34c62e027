/// Elapsed-time source that can be paused without losing its place.
///
/// While paused, [`PhaseClock::elapsed`] stays at the value it had when the
/// pause began. Resuming pushes the start time forward by the length of the
/// pause, so the phase carries on from where it stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseClock {
    phase_start: f64,
    paused_at: Option<f64>,
}

impl PhaseClock {
    pub fn new(now: f64) -> Self {
        Self {
            phase_start: now,
            paused_at: None,
        }
    }

    /// Seconds of running time since the clock was created.
    pub fn elapsed(&self, now: f64) -> f64 {
        self.paused_at.unwrap_or(now) - self.phase_start
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// No-op when already paused.
    pub fn pause(&mut self, now: f64) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    /// No-op when already running.
    pub fn resume(&mut self, now: f64) {
        if let Some(paused_at) = self.paused_at.take() {
            self.phase_start += now - paused_at;
        }
    }
}
