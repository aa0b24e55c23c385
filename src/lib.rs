// src/lib.rs - Library interface for internal module access

pub mod constants;
pub mod cycle_analysis;
pub mod data_analysis;
pub mod data_input;
pub mod error;
pub mod types;

pub use cycle_analysis::{AnalysisRequest, CycleAnalysis, CycleResult, EmgCycle, SideAnalysis};
pub use data_analysis::curve_stats::CurveStats;
pub use data_analysis::emg_envelope::{
    compute_envelope, is_valid_channel, resample, ChannelValidity, EmgProcessor, EnvelopeConfig, ValidityConfig,
};
pub use data_analysis::gait_cycle::{build_cycle, build_cycles, GaitCycle, ToeOffPolicy};
pub use data_analysis::normalize::{cut_analog, normalize, NormalizedCurve};
pub use data_input::data_source::{DataSource, TrialProvider};
pub use data_input::trial_data::{AnalogData, AnalogSignal, EventKind, GaitEvent, GaitEvents, Side, Signal, TrialData};
pub use error::{GaitDataError, Result};

/// Crate version as compiled.
pub fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// src/lib.rs
