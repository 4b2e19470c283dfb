//! Turns a raw fractional progress signal into 10%-bucket events so the
//! notification layer is only touched when something visible changes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Crossed into a new bucket. `bucket` is a multiple of 10 below 100,
    /// `percent` is the exact integer percent that triggered it.
    Bucket { bucket: u8, percent: u8 },
    /// Reached 100%. Emitted at most once per transfer.
    Complete,
}

#[derive(Debug, Default)]
pub struct ProgressBucketer {
    last_percent: u8,
    completed: bool,
}

impl ProgressBucketer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one fraction in `[0.0, 1.0]`. Anything that converts to a percent
    /// outside `0..=100` (or NaN) is dropped.
    pub fn observe(&mut self, fraction: f64) -> Option<ProgressEvent> {
        let percent = (fraction * 100.0).floor();
        if !(0.0..=100.0).contains(&percent) {
            return None;
        }
        let percent = percent as u8;

        if self.completed {
            return None;
        }

        if percent == 100 {
            self.completed = true;
            self.last_percent = 100;
            return Some(ProgressEvent::Complete);
        }

        let bucket = percent / 10 * 10;
        let last_bucket = self.last_percent / 10 * 10;
        if bucket > last_bucket {
            self.last_percent = percent;
            return Some(ProgressEvent::Bucket { bucket, percent });
        }
        None
    }

    /// Convenience for byte counters. A zero total gives no signal.
    pub fn observe_bytes(&mut self, written: u64, expected: u64) -> Option<ProgressEvent> {
        if expected == 0 {
            return None;
        }
        self.observe(written as f64 / expected as f64)
    }

    /// Forces the terminal event once the transfer has finished, unless it
    /// was already emitted from the byte stream.
    pub fn finish(&mut self) -> Option<ProgressEvent> {
        self.observe(1.0)
    }

    pub fn last_percent(&self) -> u8 {
        self.last_percent
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }
}

/// Lazily buckets a sequence of fractions.
pub fn bucketed<I>(fractions: I) -> impl Iterator<Item = ProgressEvent>
where
    I: IntoIterator<Item = f64>,
{
    let mut bucketer = ProgressBucketer::new();
    fractions.into_iter().filter_map(move |f| bucketer.observe(f))
}
