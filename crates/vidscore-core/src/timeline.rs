use crate::error::CoreError;

/// Interval used until the user picks one.
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// A half-open sampling range `[start_ms, end_ms)` walked every
/// `interval_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start_ms: u64,
    end_ms: u64,
    interval_ms: u64,
}

impl TimeRange {
    pub fn new(start_ms: u64, end_ms: u64, interval_ms: u64) -> Result<Self, CoreError> {
        if start_ms >= end_ms {
            return Err(CoreError::InvalidTimeRange(format!(
                "start ({start_ms}ms) must be before end ({end_ms}ms)"
            )));
        }
        if interval_ms == 0 {
            return Err(CoreError::InvalidTimeRange(
                "interval must be greater than 0".into(),
            ));
        }
        Ok(Self {
            start_ms,
            end_ms,
            interval_ms,
        })
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> u64 {
        self.end_ms
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Sample points: `start, start + interval, ...` while below `end`.
    pub fn timestamps(&self) -> impl Iterator<Item = u64> {
        let interval = self.interval_ms;
        let end = self.end_ms;
        std::iter::successors(Some(self.start_ms), move |t| t.checked_add(interval))
            .take_while(move |t| *t < end)
    }

    pub fn estimated_frame_count(&self) -> u64 {
        (self.end_ms - self.start_ms).div_ceil(self.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_start_inclusive_end_exclusive() {
        let r = TimeRange::new(0, 3000, 1000).unwrap();
        assert_eq!(r.timestamps().collect::<Vec<_>>(), vec![0, 1000, 2000]);
        assert_eq!(r.estimated_frame_count(), 3);
    }

    #[test]
    fn partial_last_step_still_sampled() {
        let r = TimeRange::new(500, 2600, 1000).unwrap();
        assert_eq!(r.timestamps().collect::<Vec<_>>(), vec![500, 1500, 2500]);
        assert_eq!(r.estimated_frame_count(), 3);
    }

    #[test]
    fn rejects_empty_or_inverted_range() {
        assert!(matches!(
            TimeRange::new(1000, 1000, 100),
            Err(CoreError::InvalidTimeRange(_))
        ));
        assert!(matches!(
            TimeRange::new(2000, 1000, 100),
            Err(CoreError::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn rejects_zero_interval() {
        assert!(matches!(
            TimeRange::new(0, 1000, 0),
            Err(CoreError::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn huge_interval_does_not_overflow() {
        let r = TimeRange::new(u64::MAX - 10, u64::MAX, u64::MAX).unwrap();
        assert_eq!(r.timestamps().count(), 1);
    }
}
