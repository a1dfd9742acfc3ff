use std::collections::VecDeque;

use thiserror::Error;

use crate::constants::MAX_SAMPLES;

/// One reading of one metric. `value` is `None` when the source did not
/// report the metric at that instant; the slot is kept so it renders as a gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: i64,
    pub value: Option<f64>,
}

impl Sample {
    pub fn new(timestamp: i64, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    #[error("sample at {timestamp} is older than the tail at {last}")]
    OutOfOrder { timestamp: i64, last: i64 },
    #[error("sample at {timestamp} duplicates the tail")]
    Duplicate { timestamp: i64 },
    #[error("sample at {timestamp} is outside the window at {now}")]
    Expired { timestamp: i64, now: i64 },
    #[error("sample at {timestamp} is ahead of now ({now})")]
    Future { timestamp: i64, now: i64 },
}

/// `now - timestamp`, saturating instead of overflowing on extreme timestamps.
pub fn age_ms(now: i64, timestamp: i64) -> i64 {
    now.saturating_sub(timestamp)
}

// Windowed history of a single metric, oldest first
#[derive(Debug, Clone)]
pub struct SeriesBuffer {
    samples: VecDeque<Sample>,
    window_ms: i64,
}

impl SeriesBuffer {
    pub fn new(window_ms: i64) -> Self {
        Self {
            samples: VecDeque::with_capacity(MAX_SAMPLES),
            window_ms,
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Replace the contents with an already downsampled history.
    ///
    /// Nothing is filtered here. The input is only checked: it must be
    /// strictly increasing and every sample must satisfy
    /// `0 <= now - timestamp < window`. On failure the buffer is left empty.
    pub fn load_bulk(&mut self, samples: Vec<Sample>, now: i64) -> Result<(), SeriesError> {
        self.samples.clear();

        let mut last: Option<i64> = None;
        for s in &samples {
            if let Some(last) = last {
                if s.timestamp < last {
                    return Err(SeriesError::OutOfOrder { timestamp: s.timestamp, last });
                }
                if s.timestamp == last {
                    return Err(SeriesError::Duplicate { timestamp: s.timestamp });
                }
            }
            if s.timestamp > now {
                return Err(SeriesError::Future { timestamp: s.timestamp, now });
            }
            if age_ms(now, s.timestamp) >= self.window_ms {
                return Err(SeriesError::Expired { timestamp: s.timestamp, now });
            }
            last = Some(s.timestamp);
        }

        self.samples.extend(samples);
        Ok(())
    }

    /// Check that `timestamp` may be appended without breaking ordering.
    pub fn check_append(&self, timestamp: i64) -> Result<(), SeriesError> {
        match self.samples.back() {
            Some(tail) if timestamp < tail.timestamp => Err(SeriesError::OutOfOrder {
                timestamp,
                last: tail.timestamp,
            }),
            Some(tail) if timestamp == tail.timestamp => Err(SeriesError::Duplicate { timestamp }),
            _ => Ok(()),
        }
    }

    /// Append a cadence-accepted sample, then evict everything aged out at `now`.
    /// An out-of-order or duplicate sample is rejected and the buffer is untouched.
    pub fn append(&mut self, sample: Sample, now: i64) -> Result<(), SeriesError> {
        self.check_append(sample.timestamp)?;
        self.samples.push_back(sample);
        self.trim(now);
        Ok(())
    }

    /// Drop the aged-out prefix. Returns how many samples were evicted.
    pub fn trim(&mut self, now: i64) -> usize {
        let mut evicted = 0;
        while let Some(oldest) = self.samples.front() {
            if age_ms(now, oldest.timestamp) < self.window_ms {
                break;
            }
            self.samples.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// `(seconds relative to now, value)` pairs, oldest first.
    pub fn projectable(&self, now: i64) -> Vec<(f64, Option<f64>)> {
        self.samples
            .iter()
            .map(|s| (-(age_ms(now, s.timestamp) as f64) / 1000.0, s.value))
            .collect()
    }
}
