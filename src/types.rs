// src/types.rs
// Type aliases for tuple-heavy signatures

use crate::data_analysis::emg_envelope::{ChannelValidity, EmgEnvelope};

/// (percent, value) pairs of a normalized curve.
pub type CurvePoints = Vec<(f64, f64)>;

/// A whole-recording EMG envelope with the channel name and validity tag it was loaded with.
pub type EmgTrack = (String, ChannelValidity, EmgEnvelope);

// src/types.rs
