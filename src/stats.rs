//! Per-refill statistics over the interleaved sample region.

use std::fmt;
use std::time::Duration;

/// Number of interleaved lanes scanned for peaks: `I0, Q0, I1, Q1`.
pub const LANES: usize = 4;

/// Read-only view over the valid region of a buffer after a refill.
#[derive(Debug, Clone, Copy)]
pub struct SampleView<'a> {
    data: &'a [i16],
}

impl<'a> SampleView<'a> {
    /// Wraps the interleaved `I, Q` elements of one refill.
    pub fn new(data: &'a [i16]) -> Self {
        SampleView { data }
    }

    /// Number of complex samples, two elements each.
    pub fn sample_count(&self) -> usize {
        self.data.len() / 2
    }

    /// Peak magnitude of each lane.
    pub fn peaks(&self) -> LanePeaks {
        let mut peaks = [0i16; LANES];
        for (i, &sample) in self.data.iter().enumerate() {
            let lane = &mut peaks[i % LANES];
            *lane = (*lane).max(magnitude(sample));
        }
        LanePeaks(peaks)
    }
}

/// Absolute value of a sample.
///
/// `i16::MIN` has no positive counterpart and saturates to `i16::MAX`.
pub fn magnitude(sample: i16) -> i16 {
    sample.saturating_abs()
}

/// Peak magnitude per interleaved lane for a single refill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LanePeaks(pub [i16; LANES]);

impl LanePeaks {
    /// Largest peak across all lanes.
    pub fn max(&self) -> i16 {
        self.0.iter().copied().max().unwrap_or(0)
    }
}

/// Samples per microsecond, which equals millions of samples per second.
///
/// Returns `0.0` when no time elapsed.
pub fn throughput_msps(samples: usize, elapsed: Duration) -> f64 {
    let micros = elapsed.as_micros();
    if micros == 0 {
        return 0.0;
    }
    samples as f64 / micros as f64
}

/// Result of the overflow register check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// The DMA engine fell behind since the last acknowledge.
    Yes,
    /// No overflow since the last acknowledge.
    No,
    /// The register could not be accessed.
    Unknown,
}

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Overflow::Yes => "yes",
            Overflow::No => "no",
            Overflow::Unknown => "unknown",
        })
    }
}

/// One line of streaming telemetry.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    /// Complex samples received by the refill.
    pub samples: usize,
    /// Samples per microsecond since the previous refill.
    pub msps: f64,
    /// Peak magnitude across all lanes.
    pub max_amplitude: i16,
    /// Overflow status, `None` when the check is disabled.
    pub overflow: Option<Overflow>,
}

impl fmt::Display for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Received {} samples, {:.3} msps, max amplitude {}",
            self.samples, self.msps, self.max_amplitude
        )?;
        if let Some(overflow) = self.overflow {
            write!(f, ", overflow {overflow}")?;
        }
        Ok(())
    }
}
