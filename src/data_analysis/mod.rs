// src/data_analysis/mod.rs

pub mod curve_stats;
pub mod emg_envelope;
pub mod fft_utils;
pub mod gait_cycle;
pub mod iir_filter;
pub mod normalize;

// src/data_analysis/mod.rs
