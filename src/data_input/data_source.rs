// src/data_input/data_source.rs

use std::fmt;
use std::path::PathBuf;

use crate::data_input::trial_data::{AnalogData, GaitEvents, Signal, TrialData};
use crate::data_input::trial_parser::load_trial_dir;
use crate::error::{GaitDataError, Result};

/// The narrow interface the analysis needs from a motion-capture source:
/// named per-frame signals, discrete events, and the analog channel set.
///
/// Implemented by [`TrialData`] for file-backed trials. Host applications
/// bridging a live capture session implement it on their own handle.
pub trait TrialProvider {
    fn trial_name(&self) -> &str;
    fn frame_rate(&self) -> f64;
    fn roi_offset(&self) -> i64;
    fn signal(&self, name: &str) -> Result<Signal>;
    fn events(&self) -> Result<GaitEvents>;
    fn analog(&self) -> Result<Option<AnalogData>>;
    fn signal_names(&self) -> Vec<String>;
}

impl TrialProvider for TrialData {
    fn trial_name(&self) -> &str {
        &self.name
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn roi_offset(&self) -> i64 {
        self.roi_offset
    }

    fn signal(&self, name: &str) -> Result<Signal> {
        TrialData::signal(self, name).cloned()
    }

    fn events(&self) -> Result<GaitEvents> {
        Ok(self.events.clone())
    }

    fn analog(&self) -> Result<Option<AnalogData>> {
        Ok(self.analog.clone())
    }

    fn signal_names(&self) -> Vec<String> {
        self.signals.iter().map(|s| s.name.clone()).collect()
    }
}

/// Where a trial comes from. Only [`DataSource::load`] looks at the variant.
pub enum DataSource {
    /// Directory with `kinematics.csv`, `events.csv` and optionally `analog.csv`.
    FileBacked(PathBuf),
    /// A provider owned by the host application, e.g. a live capture session.
    LiveSession(Box<dyn TrialProvider>),
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::FileBacked(path) => f.debug_tuple("FileBacked").field(path).finish(),
            DataSource::LiveSession(provider) => f
                .debug_tuple("LiveSession")
                .field(&provider.trial_name())
                .finish(),
        }
    }
}

impl DataSource {
    /// Reads the whole trial into an in-memory snapshot.
    pub fn load(&self) -> Result<TrialData> {
        match self {
            DataSource::FileBacked(dir) => {
                if !dir.is_dir() {
                    return Err(GaitDataError::InvalidParameter(format!(
                        "trial directory {} does not exist",
                        dir.display()
                    )));
                }
                load_trial_dir(dir)
            }
            DataSource::LiveSession(provider) => snapshot(provider.as_ref()),
        }
    }
}

/// Copies every signal, event and analog channel out of a provider.
pub fn snapshot(provider: &dyn TrialProvider) -> Result<TrialData> {
    let signals = provider
        .signal_names()
        .iter()
        .map(|name| provider.signal(name))
        .collect::<Result<Vec<Signal>>>()?;
    Ok(TrialData {
        name: provider.trial_name().to_string(),
        frame_rate: provider.frame_rate(),
        roi_offset: provider.roi_offset(),
        signals,
        events: provider.events()?,
        analog: provider.analog()?,
    })
}


// src/data_input/data_source.rs
