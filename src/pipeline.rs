use crate::downsample::Downsampler;
use crate::series::{Sample, SeriesBuffer, SeriesError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Seeding,
    Live,
}

/// What happened to one live reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    Appended,
    /// Same or older plotting bucket than the last accepted point.
    Gated,
    /// Backfill has not finished yet.
    NotLive,
}

/// The temperature and pH series plus the one cadence gate they share.
///
/// Both series always receive the same timestamps, so their charts stay
/// bucket-aligned.
#[derive(Debug, Clone)]
pub struct Pipeline {
    state: PipelineState,
    gate: Downsampler,
    temperature: SeriesBuffer,
    ph: SeriesBuffer,
}

impl Pipeline {
    pub fn new(window_ms: i64, cadence_ms: i64) -> Self {
        Self {
            state: PipelineState::Uninitialized,
            gate: Downsampler::new(cadence_ms),
            temperature: SeriesBuffer::new(window_ms),
            ph: SeriesBuffer::new(window_ms),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn window_ms(&self) -> i64 {
        self.temperature.window_ms()
    }

    pub fn temperature(&self) -> &SeriesBuffer {
        &self.temperature
    }

    pub fn ph(&self) -> &SeriesBuffer {
        &self.ph
    }

    pub fn gate(&self) -> &Downsampler {
        &self.gate
    }

    pub(crate) fn gate_mut(&mut self) -> &mut Downsampler {
        &mut self.gate
    }

    /// Uninitialized -> Seeding. Returns false if seeding already happened.
    pub fn begin_seeding(&mut self) -> bool {
        if self.state != PipelineState::Uninitialized {
            return false;
        }
        self.state = PipelineState::Seeding;
        self.abandon_seed();
        true
    }

    /// Bulk-load both series. Either both are loaded or both are left empty
    /// with the gate cleared.
    pub fn load_seed(
        &mut self,
        temperature: Vec<Sample>,
        ph: Vec<Sample>,
        now: i64,
    ) -> Result<(), SeriesError> {
        let loaded = self
            .temperature
            .load_bulk(temperature, now)
            .and_then(|()| self.ph.load_bulk(ph, now));
        if loaded.is_err() {
            self.abandon_seed();
        }
        loaded
    }

    pub fn abandon_seed(&mut self) {
        self.temperature.clear();
        self.ph.clear();
        self.gate.reset();
    }

    /// Seeding -> Live.
    pub fn go_live(&mut self) {
        self.state = PipelineState::Live;
    }

    /// Feed one status reading taken at `timestamp` through the gate and,
    /// when accepted, into both series. `now` drives window trimming.
    pub fn ingest(
        &mut self,
        timestamp: i64,
        temperature: Option<f64>,
        ph: Option<f64>,
        now: i64,
    ) -> Result<Ingest, SeriesError> {
        if self.state != PipelineState::Live {
            return Ok(Ingest::NotLive);
        }
        if !self.gate.accept(timestamp) {
            return Ok(Ingest::Gated);
        }

        self.temperature.check_append(timestamp)?;
        self.ph.check_append(timestamp)?;
        self.temperature.append(Sample::new(timestamp, temperature), now)?;
        self.ph.append(Sample::new(timestamp, ph), now)?;
        Ok(Ingest::Appended)
    }
}
