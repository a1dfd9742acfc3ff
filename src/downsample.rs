/// Shared cadence gate for the plotted series.
///
/// Time is cut into buckets of `cadence_ms`; at most one sample per bucket is
/// accepted. Bucket edges are fixed multiples of the cadence, so backfilled
/// rows and live polls land on the same grid whatever their arrival jitter.
#[derive(Debug, Clone)]
pub struct Downsampler {
    cadence_ms: i64,
    last_bucket: Option<i64>,
}

impl Downsampler {
    pub fn new(cadence_ms: i64) -> Self {
        Self {
            cadence_ms: cadence_ms.max(1),
            last_bucket: None,
        }
    }

    pub fn bucket(&self, timestamp: i64) -> i64 {
        timestamp.div_euclid(self.cadence_ms)
    }

    /// Accept `timestamp` if it opens a bucket newer than the last accepted one.
    ///
    /// A timestamp from an older bucket (a late response) is rejected as well,
    /// so accepted timestamps are always strictly increasing.
    pub fn accept(&mut self, timestamp: i64) -> bool {
        let bucket = self.bucket(timestamp);
        match self.last_bucket {
            Some(last) if bucket <= last => false,
            _ => {
                self.last_bucket = Some(bucket);
                true
            }
        }
    }

    pub fn last_bucket(&self) -> Option<i64> {
        self.last_bucket
    }

    pub fn reset(&mut self) {
        self.last_bucket = None;
    }
}
