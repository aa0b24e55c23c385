// src/data_analysis/emg_envelope.rs

use log::{debug, warn};
use ndarray::Array1;

use crate::constants::{
    EMG_BAND_FILTER_ORDER, EMG_BASELINE_BAND_HZ, EMG_FILTER_ORDER, EMG_HIGHPASS_HZ, EMG_LOWPASS_HZ,
    EMG_MAX_INTERFERENCE_RATIO, POWERLINE_BANDWIDTH_HZ, POWERLINE_HARMONICS_HZ,
};
use crate::data_analysis::fft_utils;
use crate::data_analysis::iir_filter::ButterworthFilter;
use crate::data_input::trial_data::{AnalogData, AnalogSignal};
use crate::error::{GaitDataError, Result};

/// Corner frequencies of the linear-envelope filter cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeConfig {
    pub order: usize,
    pub highpass_hz: f64,
    pub lowpass_hz: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            order: EMG_FILTER_ORDER,
            highpass_hz: EMG_HIGHPASS_HZ,
            lowpass_hz: EMG_LOWPASS_HZ,
        }
    }
}

/// Parameters of the powerline-interference check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityConfig {
    pub harmonics_hz: Vec<f64>,
    pub harmonic_bandwidth_hz: f64,
    pub baseline_band_hz: (f64, f64),
    pub filter_order: usize,
    pub max_interference_ratio: f64,
}

impl Default for ValidityConfig {
    fn default() -> Self {
        Self {
            harmonics_hz: POWERLINE_HARMONICS_HZ.to_vec(),
            harmonic_bandwidth_hz: POWERLINE_BANDWIDTH_HZ,
            baseline_band_hz: EMG_BASELINE_BAND_HZ,
            filter_order: EMG_BAND_FILTER_ORDER,
            max_interference_ratio: EMG_MAX_INTERFERENCE_RATIO,
        }
    }
}

/// Outcome of the validity heuristic. Not an error: consumers check it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelValidity {
    Valid { ratio: f64 },
    Disconnected { ratio: f64 },
}

impl ChannelValidity {
    pub fn is_valid(&self) -> bool {
        matches!(self, ChannelValidity::Valid { .. })
    }

    /// Interference-to-baseline power density ratio that produced the verdict.
    pub fn ratio(&self) -> f64 {
        match *self {
            ChannelValidity::Valid { ratio } | ChannelValidity::Disconnected { ratio } => ratio,
        }
    }
}

/// A raw EMG channel tagged with its validity.
#[derive(Debug, Clone, PartialEq)]
pub struct EmgChannel {
    pub name: String,
    pub raw: AnalogSignal,
    pub validity: ChannelValidity,
}

impl EmgChannel {
    /// Turns a disconnected tag into an error for callers that cannot use such data.
    pub fn require_valid(&self) -> Result<&Self> {
        match self.validity {
            ChannelValidity::Valid { .. } => Ok(self),
            ChannelValidity::Disconnected { ratio } => Err(GaitDataError::EmgDisconnected {
                name: self.name.clone(),
                ratio,
            }),
        }
    }
}

/// Rectified signal and its linear envelope, both at the input rate.
#[derive(Debug, Clone, PartialEq)]
pub struct EmgEnvelope {
    pub rectified: AnalogSignal,
    pub envelope: AnalogSignal,
}

/// High-pass, rectify, low-pass with the default corner frequencies.
pub fn compute_envelope(raw: &AnalogSignal, sample_rate: f64) -> Result<(AnalogSignal, AnalogSignal)> {
    let result = compute_envelope_with(raw, sample_rate, &EnvelopeConfig::default())?;
    Ok((result.rectified, result.envelope))
}

/// The linear-envelope cascade: zero-phase Butterworth high-pass, full-wave
/// rectification, zero-phase Butterworth low-pass, always in that sequence.
pub fn compute_envelope_with(raw: &AnalogSignal, sample_rate: f64, config: &EnvelopeConfig) -> Result<EmgEnvelope> {
    let highpass = ButterworthFilter::highpass(config.order, config.highpass_hz, sample_rate)?;
    let lowpass = ButterworthFilter::lowpass(config.order, config.lowpass_hz, sample_rate)?;

    let filtered = highpass.filtfilt(&raw.values)?;
    let rectified = filtered.mapv(f64::abs);
    let envelope = lowpass.filtfilt(&rectified)?;

    debug!(
        "EMG envelope for '{}': {} samples at {} Hz, {}-{} Hz cascade",
        raw.name,
        raw.len(),
        sample_rate,
        config.highpass_hz,
        config.lowpass_hz
    );

    Ok(EmgEnvelope {
        rectified: AnalogSignal::new(raw.name.clone(), rectified, sample_rate),
        envelope: AnalogSignal::new(raw.name.clone(), envelope, sample_rate),
    })
}

/// Band-limited resampling to `num` samples; the sample rate scales accordingly.
pub fn resample(signal: &AnalogSignal, num: usize) -> Result<AnalogSignal> {
    let values = fft_utils::resample(&signal.values, num)?;
    let sample_rate = signal.sample_rate * num as f64 / signal.len() as f64;
    Ok(AnalogSignal::new(signal.name.clone(), values, sample_rate))
}

/// Resamples an analog signal to one sample per kinematic frame.
pub fn resample_to_frames(signal: &AnalogSignal, samples_per_frame: f64) -> Result<AnalogSignal> {
    if !samples_per_frame.is_finite() || samples_per_frame <= 0.0 {
        return Err(GaitDataError::InvalidParameter(format!(
            "samples per frame must be positive, got {}",
            samples_per_frame
        )));
    }
    let frames = (signal.len() as f64 / samples_per_frame).round() as usize;
    resample(signal, frames)
}

/// Variance of `values` after zero-phase band-pass.
fn band_variance(values: &Array1<f64>, low: f64, high: f64, order: usize, sample_rate: f64) -> Result<f64> {
    let filter = ButterworthFilter::bandpass(order, low, high, sample_rate)?;
    Ok(filter.filtfilt(values)?.var(0.0))
}

/// Best-effort check for disconnected electrodes.
///
/// A loose or disconnected electrode picks up mostly powerline hum, so the
/// summed variance of the band-passed mains harmonics is compared with the
/// variance of a broadband EMG band between them. Ratios above
/// `max_interference_ratio` flag the channel. Harmonic bands that do not fit
/// below Nyquist are skipped. A channel with no broadband energy at all is
/// flagged as well. Deterministic for a given input.
pub fn is_valid_channel(raw: &Array1<f64>, sample_rate: f64, config: &ValidityConfig) -> Result<ChannelValidity> {
    let nyquist = sample_rate / 2.0;
    let half_bw = config.harmonic_bandwidth_hz / 2.0;

    if raw.var(0.0) == 0.0 {
        return Ok(ChannelValidity::Disconnected { ratio: f64::INFINITY });
    }

    let mut interference = 0.0;
    for &harmonic in &config.harmonics_hz {
        if harmonic + half_bw >= nyquist {
            debug!("Skipping {} Hz harmonic: above Nyquist of {} Hz", harmonic, nyquist);
            continue;
        }
        interference += band_variance(raw, harmonic - half_bw, harmonic + half_bw, config.filter_order, sample_rate)?;
    }

    let (low, high) = config.baseline_band_hz;
    let baseline = band_variance(raw, low, high, config.filter_order, sample_rate)?;
    if baseline <= 0.0 {
        return Ok(ChannelValidity::Disconnected { ratio: f64::INFINITY });
    }

    let ratio = interference / baseline;
    if ratio > config.max_interference_ratio {
        Ok(ChannelValidity::Disconnected { ratio })
    } else {
        Ok(ChannelValidity::Valid { ratio })
    }
}

/// Loads EMG channels and derives envelopes with one configuration.
#[derive(Debug, Clone, Default)]
pub struct EmgProcessor {
    pub envelope: EnvelopeConfig,
    pub validity: ValidityConfig,
}

impl EmgProcessor {
    pub fn new(envelope: EnvelopeConfig, validity: ValidityConfig) -> Self {
        Self { envelope, validity }
    }

    /// Finds `name` in the analog set and tags it with the validity heuristic.
    ///
    /// A missing channel is an error; a disconnected one is returned tagged.
    pub fn load_channel(&self, analog: &AnalogData, name: &str) -> Result<EmgChannel> {
        let raw = analog.channel(name)?.clone();
        let validity = is_valid_channel(&raw.values, analog.sample_rate, &self.validity)?;
        if !validity.is_valid() {
            warn!(
                "EMG channel '{}' looks disconnected (interference ratio {:.1} > {:.1})",
                raw.name,
                validity.ratio(),
                self.validity.max_interference_ratio
            );
        }
        Ok(EmgChannel {
            name: name.to_string(),
            raw,
            validity,
        })
    }

    pub fn envelope(&self, channel: &EmgChannel) -> Result<EmgEnvelope> {
        compute_envelope_with(&channel.raw, channel.raw.sample_rate, &self.envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    const FS: f64 = 1000.0;

    fn tone(freq_hz: f64, amplitude: f64, n: usize) -> Array1<f64> {
        Array1::from_iter((0..n).map(|i| amplitude * (2.0 * PI * freq_hz * i as f64 / FS).sin()))
    }

    /// Deterministic broadband stand-in for EMG: a few incommensurate tones.
    fn pseudo_emg(n: usize) -> Array1<f64> {
        [23.0, 61.7, 77.3, 131.9, 173.1]
            .iter()
            .fold(Array1::zeros(n), |acc: Array1<f64>, &f| acc + tone(f, 0.3, n))
    }

    #[test]
    fn test_rectified_is_non_negative() {
        let raw = AnalogSignal::new("LGas", pseudo_emg(3000) + 2.0, FS);
        let (rectified, envelope) = compute_envelope(&raw, FS).unwrap();
        assert_eq!(rectified.len(), 3000);
        assert_eq!(envelope.len(), 3000);
        assert!(rectified.values.iter().all(|&v| v >= 0.0));
        assert_eq!(envelope.sample_rate, FS);
        assert_eq!(envelope.name, "LGas");
    }

    #[test]
    fn test_envelope_follows_activation_burst() {
        let n = 3000;
        let carrier = tone(97.0, 1.0, n);
        let gain = Array1::from_iter((0..n).map(|i| if (1000..2000).contains(&i) { 1.0 } else { 0.1 }));
        let raw = AnalogSignal::new("RTibA", carrier * gain, FS);
        let (_, envelope) = compute_envelope(&raw, FS).unwrap();

        let mean = |range: std::ops::Range<usize>| {
            let len = range.len() as f64;
            range.map(|i| envelope.values[i]).sum::<f64>() / len
        };
        let active = mean(1300..1700);
        let rest = mean(200..600);
        // Mean of a rectified unit sine is 2/pi.
        assert_abs_diff_eq!(active, 2.0 / PI, epsilon = 0.03);
        assert!(active > 5.0 * rest);
    }

    #[test]
    fn test_envelope_rejects_bad_cutoffs() {
        let raw = AnalogSignal::new("LGas", pseudo_emg(1000), FS);
        let config = EnvelopeConfig { order: 4, highpass_hz: 5.0, lowpass_hz: 600.0 };
        assert!(matches!(
            compute_envelope_with(&raw, FS, &config),
            Err(GaitDataError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_clean_emg_band_is_valid() {
        let raw = tone(70.0, 1.0, 4000);
        let validity = is_valid_channel(&raw, FS, &ValidityConfig::default()).unwrap();
        assert!(validity.is_valid(), "ratio {}", validity.ratio());
        assert!(validity.ratio() < 1.0);
    }

    #[test]
    fn test_mains_contamination_flags_channel() {
        let raw = tone(70.0, 1.0, 4000) + tone(50.0, 15.0, 4000);
        let config = ValidityConfig::default();
        let first = is_valid_channel(&raw, FS, &config).unwrap();
        let second = is_valid_channel(&raw, FS, &config).unwrap();
        assert!(!first.is_valid());
        assert!(first.ratio() > config.max_interference_ratio);
        assert_eq!(first, second);
    }

    #[test]
    fn test_moderate_hum_stays_below_threshold() {
        // Plain variance ratio of about 25: 12.5 in the 50 Hz band against 0.5 at 70 Hz.
        let raw = tone(70.0, 1.0, 4000) + tone(50.0, 5.0, 4000);
        let validity = is_valid_channel(&raw, FS, &ValidityConfig::default()).unwrap();
        assert!(validity.is_valid(), "ratio {}", validity.ratio());
        assert!(validity.ratio() > 10.0 && validity.ratio() < 50.0, "ratio {}", validity.ratio());
    }

    #[test]
    fn test_threshold_is_configurable() {
        let raw = tone(70.0, 1.0, 4000) + tone(50.0, 10.0, 4000);
        let lenient = ValidityConfig {
            max_interference_ratio: 1e6,
            ..ValidityConfig::default()
        };
        assert!(is_valid_channel(&raw, FS, &lenient).unwrap().is_valid());
    }

    #[test]
    fn test_flat_channel_is_disconnected() {
        let raw = Array1::zeros(2000);
        let validity = is_valid_channel(&raw, FS, &ValidityConfig::default()).unwrap();
        assert!(!validity.is_valid());
        assert!(validity.ratio().is_infinite());
    }

    #[test]
    fn test_resample_to_frames() {
        let raw = AnalogSignal::new("LGas", tone(2.0, 1.0, 2000), FS);
        let framed = resample_to_frames(&raw, 10.0).unwrap();
        assert_eq!(framed.len(), 200);
        assert_abs_diff_eq!(framed.sample_rate, 100.0, epsilon = 1e-9);
        assert!(resample_to_frames(&raw, 0.0).is_err());
    }

    #[test]
    fn test_processor_tags_without_zeroing() {
        let n = 4000;
        let analog = AnalogData::new(
            FS,
            100.0,
            vec![
                AnalogSignal::new("Voltage.LGas", pseudo_emg(n), FS),
                AnalogSignal::new("Voltage.RGas", tone(50.0, 5.0, n) + tone(70.0, 0.1, n), FS),
            ],
        )
        .unwrap();
        let processor = EmgProcessor::default();

        let good = processor.load_channel(&analog, "LGas").unwrap();
        assert!(good.validity.is_valid());
        assert!(good.require_valid().is_ok());

        let bad = processor.load_channel(&analog, "RGas").unwrap();
        assert!(!bad.validity.is_valid());
        assert_eq!(bad.raw.values, analog.channels[1].values);
        assert!(matches!(bad.require_valid(), Err(GaitDataError::EmgDisconnected { .. })));

        assert!(matches!(
            processor.load_channel(&analog, "LPer"),
            Err(GaitDataError::ChannelNotFound(_))
        ));
    }
}

// src/data_analysis/emg_envelope.rs
