// src/constants.rs

// Normalized gait-cycle grid: 0%, 1%, ..., 100%.
pub const NORMALIZED_POINTS: usize = 101;
pub const CYCLE_PERCENT_MAX: f64 = 100.0;

// Minimum number of foot strikes needed to delimit one gait cycle.
pub const MIN_STRIKES_PER_CYCLE: usize = 2;

// --- EMG linear envelope ---
pub const EMG_FILTER_ORDER: usize = 4;
pub const EMG_HIGHPASS_HZ: f64 = 5.0; // Removes motion artefact and DC drift
pub const EMG_LOWPASS_HZ: f64 = 10.0; // Linear envelope smoothing

// --- EMG validity heuristic ---
// Powerline harmonics checked for interference.
pub const POWERLINE_HARMONICS_HZ: [f64; 3] = [50.0, 100.0, 200.0];
// Width of the band-pass around each harmonic.
pub const POWERLINE_BANDWIDTH_HZ: f64 = 4.0;
// Broadband EMG reference band, placed between the first two harmonics.
pub const EMG_BASELINE_BAND_HZ: (f64, f64) = (60.0, 90.0);
pub const EMG_BAND_FILTER_ORDER: usize = 4;
// Interference-to-baseline variance ratio above which a channel is flagged disconnected.
pub const EMG_MAX_INTERFERENCE_RATIO: f64 = 50.0;

// --- Zero-phase filtering ---
// Zero-phase filtering needs more than PADDING_FACTOR * (2 * sections + 1) samples.
pub const FILTFILT_PADDING_FACTOR: usize = 3;

// --- Trial CSV layout ---
pub const KINEMATICS_FILE: &str = "kinematics.csv";
pub const EVENTS_FILE: &str = "events.csv";
pub const ANALOG_FILE: &str = "analog.csv";
pub const FRAME_COLUMN: &str = "frame";
pub const DEFAULT_FRAME_RATE_HZ: f64 = 100.0;

// src/constants.rs
