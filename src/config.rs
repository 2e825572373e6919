use std::path::PathBuf;
use std::time::Duration;

/// The single configuration record threaded through the orchestrator,
/// burst detector, and duplicate clusterer.
#[derive(Debug, Clone)]
pub struct Config {
    /// Worker pool size for indexing. Must be positive.
    pub workers: usize,
    /// Location of the embedded catalogue file.
    pub catalogue_path: PathBuf,
    /// Emit per-stage timings in the statistics report.
    pub perf_stats: bool,
    /// Duplicate clustering radius (max Hamming distance), in [0, 64].
    pub analysis_hamming_threshold: u32,
    /// Maximum gap between consecutive burst photos.
    pub burst_time_window: Duration,
    /// Maximum focal-length delta (mm) between consecutive burst photos.
    pub burst_focal_tolerance: f64,
    /// Minimum photo count for a candidate run to be emitted as a burst.
    pub burst_min_size: usize,
}

impl Config {
    pub fn new(catalogue_path: impl Into<PathBuf>) -> Self {
        Config {
            workers: 4,
            catalogue_path: catalogue_path.into(),
            perf_stats: false,
            analysis_hamming_threshold: 15,
            burst_time_window: Duration::from_secs(2),
            burst_focal_tolerance: 5.0,
            burst_min_size: 3,
        }
    }

    pub fn validate(&self) -> Result<(), crate::error::PipelineError> {
        if self.workers == 0 {
            return Err(crate::error::PipelineError::Configuration(
                "workers must be positive".into(),
            ));
        }
        if self.analysis_hamming_threshold > 64 {
            return Err(crate::error::PipelineError::Configuration(
                "analysis-hamming-threshold must be in [0, 64]".into(),
            ));
        }
        if self.burst_min_size < 2 {
            return Err(crate::error::PipelineError::Configuration(
                "burst-min-size must be >= 2".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new("catalogue.db")
    }
}
