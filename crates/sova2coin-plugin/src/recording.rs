//! Interfaces to the signal reader and the BIDS writer.

use std::path::{Path, PathBuf};

use sova2coin_core::MetaTree;

use crate::types::PluginResult;

/// An opened EEG recording.
pub trait Recording {
    /// Sampling frequency in Hz.
    fn sampling_frequency(&self) -> f64;

    /// Power line frequency in Hz, if the instrument reports one.
    fn line_frequency(&self) -> Option<f64>;

    /// Number of samples per channel.
    fn n_samples(&self) -> u64;

    /// Timestamp of the last sample in seconds.
    fn duration(&self) -> f64 {
        let sfreq = self.sampling_frequency();
        match self.n_samples() {
            0 => 0.0,
            _ if sfreq <= 0.0 => 0.0,
            n => (n - 1) as f64 / sfreq,
        }
    }
}

/// Plain recording header values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecordingInfo {
    pub sampling_frequency: f64,
    pub line_frequency: Option<f64>,
    pub n_samples: u64,
}

impl RecordingInfo {
    pub fn new(sampling_frequency: f64, line_frequency: Option<f64>, n_samples: u64) -> Self {
        Self {
            sampling_frequency,
            line_frequency,
            n_samples,
        }
    }
}

impl Recording for RecordingInfo {
    fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    fn line_frequency(&self) -> Option<f64> {
        self.line_frequency
    }

    fn n_samples(&self) -> u64 {
        self.n_samples
    }
}

/// Opens signal files.
pub trait SignalReader {
    /// Open the recording stored at `path`.
    fn open(&self, path: &Path) -> PluginResult<Box<dyn Recording>>;
}

/// Everything the writer needs besides the recording itself.
#[derive(Debug, Clone, Copy)]
pub struct WriteRequest<'a> {
    /// Source file the recording was read from.
    pub source: &'a Path,
    /// BIDS entities (`subject`, `session`, `task`, ...).
    pub entities: &'a MetaTree,
    /// Complete attribute tree of the run.
    pub metadata: &'a MetaTree,
    /// Root folder of the BIDS dataset.
    pub bids_root: &'a Path,
    /// Replace existing output.
    pub overwrite: bool,
}

/// Writes recordings into a BIDS dataset.
pub trait BidsWriter {
    /// Write `recording` and return the path of the main output file.
    fn write(&self, recording: &dyn Recording, request: &WriteRequest<'_>) -> PluginResult<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_is_last_sample_timestamp() {
        let info = RecordingInfo::new(2500.0, None, 2501);
        assert_eq!(info.duration(), 1.0);
    }

    #[test]
    fn test_duration_of_empty_recording() {
        assert_eq!(RecordingInfo::new(2500.0, None, 0).duration(), 0.0);
        assert_eq!(RecordingInfo::new(0.0, None, 10).duration(), 0.0);
    }
}
