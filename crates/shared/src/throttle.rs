/// Admits at most one render per `interval_ms`. Only rendering is
/// throttled; state updates are never skipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderThrottle {
    interval_ms: f64,
    last_ms: Option<f64>,
}

impl RenderThrottle {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    /// Returns `true` (and records `now_ms`) when enough time has passed
    /// since the last admitted render. A clock that goes backwards admits.
    pub fn admit(&mut self, now_ms: f64) -> bool {
        let admitted = match self.last_ms {
            None => true,
            Some(last) => now_ms - last >= self.interval_ms || now_ms < last,
        };
        if admitted {
            self.last_ms = Some(now_ms);
        }
        admitted
    }

    /// Milliseconds until the next render would be admitted.
    pub fn remaining(&self, now_ms: f64) -> f64 {
        match self.last_ms {
            None => 0.0,
            Some(last) => (self.interval_ms - (now_ms - last)).max(0.0),
        }
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}
