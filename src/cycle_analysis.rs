// src/cycle_analysis.rs

use log::{debug, info};

use crate::data_analysis::curve_stats::CurveStats;
use crate::data_analysis::emg_envelope::{ChannelValidity, EmgProcessor, EnvelopeConfig, ValidityConfig};
use crate::data_analysis::gait_cycle::{build_cycle_for_side, build_cycles, GaitCycle, ToeOffPolicy};
use crate::data_analysis::normalize::{cut_analog, normalize, normalize_analog, NormalizedCurve};
use crate::data_input::data_source::TrialProvider;
use crate::data_input::trial_data::{AnalogSignal, Side, Signal};
use crate::error::{GaitDataError, Result};
use crate::types::EmgTrack;

/// What to extract from a trial for one side.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    /// Signal names, either full (`LKneeAnglesX`) or side-less (`KneeAnglesX`).
    pub signals: Vec<String>,
    pub emg_channels: Vec<String>,
    pub policy: ToeOffPolicy,
    /// Every consecutive strike pair instead of only the first cycle.
    pub all_cycles: bool,
    pub envelope: EnvelopeConfig,
    pub validity: ValidityConfig,
}

/// One EMG channel cut to one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct EmgCycle {
    pub channel: String,
    pub validity: ChannelValidity,
    pub rectified: AnalogSignal,
    pub envelope: AnalogSignal,
    pub normalized_envelope: NormalizedCurve,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleResult {
    pub cycle: GaitCycle,
    pub curves: Vec<NormalizedCurve>,
    pub emg: Vec<EmgCycle>,
}

impl CycleResult {
    pub fn curve(&self, name: &str) -> Option<&NormalizedCurve> {
        self.curves.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SideAnalysis {
    pub trial: String,
    pub side: Side,
    pub frame_rate: f64,
    pub cycles: Vec<CycleResult>,
}

impl SideAnalysis {
    /// Mean and spread of one signal across all cycles of this side.
    pub fn curve_stats(&self, name: &str) -> Result<CurveStats> {
        let curves: Vec<NormalizedCurve> = self
            .cycles
            .iter()
            .filter_map(|c| c.curve(name).cloned())
            .collect();
        CurveStats::from_curves(&curves)
    }

    /// Mean and spread of one normalized EMG envelope across all cycles.
    pub fn envelope_stats(&self, channel: &str) -> Result<CurveStats> {
        let curves: Vec<NormalizedCurve> = self
            .cycles
            .iter()
            .flat_map(|c| c.emg.iter())
            .filter(|e| e.channel == channel)
            .map(|e| e.normalized_envelope.clone())
            .collect();
        CurveStats::from_curves(&curves)
    }
}

/// Stateless driver running cycle detection, normalization and EMG
/// processing against any [`TrialProvider`].
pub struct CycleAnalysis;

impl CycleAnalysis {
    pub fn run(provider: &dyn TrialProvider, side: Side, request: &AnalysisRequest) -> Result<SideAnalysis> {
        let events = provider.events()?;
        let offset = provider.roi_offset();
        let cycles = if request.all_cycles {
            build_cycles(&events, side, offset, request.policy)?
        } else {
            vec![build_cycle_for_side(&events, side, offset, request.policy)?]
        };
        info!(
            "{} side of '{}': {} cycle(s) from {} events",
            side,
            provider.trial_name(),
            cycles.len(),
            events.len()
        );

        let signals = request
            .signals
            .iter()
            .map(|name| resolve_signal(provider, side, name))
            .collect::<Result<Vec<Signal>>>()?;

        let mut emg_tracks: Vec<EmgTrack> = Vec::with_capacity(request.emg_channels.len());
        let mut samples_per_frame = 1.0;
        if let Some(first) = request.emg_channels.first() {
            let analog = provider
                .analog()?
                .ok_or_else(|| GaitDataError::ChannelNotFound(first.clone()))?;
            samples_per_frame = analog.samples_per_frame;
            let processor = EmgProcessor::new(request.envelope.clone(), request.validity.clone());
            for name in &request.emg_channels {
                let channel = processor.load_channel(&analog, name)?;
                // Filter the whole recording so the cycle window is free of edge transients.
                let envelope = processor.envelope(&channel)?;
                emg_tracks.push((channel.name, channel.validity, envelope));
            }
        }

        let mut results = Vec::with_capacity(cycles.len());
        for cycle in cycles {
            debug!(
                "Cycle {}..{} (toe-off at {} %)",
                cycle.start,
                cycle.end,
                cycle.toe_off_percent()
            );
            let curves = signals
                .iter()
                .map(|signal| normalize(signal, &cycle))
                .collect::<Result<Vec<NormalizedCurve>>>()?;

            let mut emg = Vec::with_capacity(emg_tracks.len());
            for (name, validity, envelope) in &emg_tracks {
                let rectified = cut_analog(&envelope.rectified, &cycle, samples_per_frame)?;
                let cut = cut_analog(&envelope.envelope, &cycle, samples_per_frame)?;
                emg.push(EmgCycle {
                    channel: name.clone(),
                    validity: *validity,
                    normalized_envelope: normalize_analog(&cut)?,
                    rectified,
                    envelope: cut,
                });
            }
            results.push(CycleResult { cycle, curves, emg });
        }

        Ok(SideAnalysis {
            trial: provider.trial_name().to_string(),
            side,
            frame_rate: provider.frame_rate(),
            cycles: results,
        })
    }
}

/// `name` as given first, then with the side prefix prepended.
fn resolve_signal(provider: &dyn TrialProvider, side: Side, name: &str) -> Result<Signal> {
    match provider.signal(name) {
        Ok(signal) => Ok(signal),
        Err(GaitDataError::SignalNotFound(_)) => provider.signal(&side.channel_name(name)),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_input::trial_data::{AnalogData, EventKind, GaitEvent, GaitEvents, TrialData};
    use approx::assert_abs_diff_eq;
    use ndarray::Array1;
    use std::f64::consts::PI;

    fn event(side: Side, kind: EventKind, frame: i64) -> GaitEvent {
        GaitEvent { side, kind, frame }
    }

    fn walking_trial() -> TrialData {
        let frames = 300;
        let knee = Array1::from_iter((0..frames).map(|i| i as f64));
        let hip = Array1::from_iter((0..frames).map(|i| -(i as f64)));
        let fs = 1000.0;
        let n = frames * 10;
        let emg = Array1::from_iter((0..n).map(|i| {
            let t = i as f64 / fs;
            (2.0 * PI * 83.0 * t).sin() + 0.7 * (2.0 * PI * 73.0 * t).sin() + 0.5 * (2.0 * PI * 131.0 * t).sin()
        }));
        TrialData {
            name: "walk01".to_string(),
            frame_rate: 100.0,
            roi_offset: 100,
            signals: vec![
                Signal::new("LKneeAnglesX", knee, 100.0, 100),
                Signal::new("RHipAnglesX", hip, 100.0, 100),
            ],
            events: GaitEvents::new(vec![
                event(Side::Left, EventKind::FootStrike, 150),
                event(Side::Left, EventKind::FootOff, 190),
                event(Side::Left, EventKind::FootStrike, 220),
                event(Side::Left, EventKind::FootOff, 260),
                event(Side::Left, EventKind::FootStrike, 290),
                event(Side::Right, EventKind::FootStrike, 185),
                event(Side::Right, EventKind::FootOff, 225),
                event(Side::Right, EventKind::FootStrike, 255),
            ]),
            analog: Some(AnalogData::new(fs, 100.0, vec![AnalogSignal::new("Voltage.LGas", emg, fs)]).unwrap()),
        }
    }

    #[test]
    fn test_first_cycle_with_side_less_names() {
        let trial = walking_trial();
        let request = AnalysisRequest {
            signals: vec!["KneeAnglesX".to_string()],
            emg_channels: vec!["LGas".to_string()],
            ..Default::default()
        };
        let analysis = CycleAnalysis::run(&trial, Side::Left, &request).unwrap();
        assert_eq!(analysis.cycles.len(), 1);
        let result = &analysis.cycles[0];
        assert_eq!((result.cycle.start, result.cycle.end, result.cycle.toe_off), (50, 120, 90));

        let knee = result.curve("LKneeAnglesX").unwrap();
        assert_eq!(knee.len(), 101);
        assert_abs_diff_eq!(knee.values()[0], 50.0, epsilon = 1e-12);
        assert_abs_diff_eq!(knee.values()[100], 119.0, epsilon = 1e-12);

        let emg = &result.emg[0];
        assert_eq!(emg.channel, "LGas");
        assert!(emg.validity.is_valid());
        assert_eq!(emg.envelope.len(), 700);
        assert_eq!(emg.normalized_envelope.len(), 101);
        assert!(emg.rectified.values.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_all_cycles_and_stats() {
        let trial = walking_trial();
        let request = AnalysisRequest {
            signals: vec!["LKneeAnglesX".to_string()],
            all_cycles: true,
            ..Default::default()
        };
        let analysis = CycleAnalysis::run(&trial, Side::Left, &request).unwrap();
        assert_eq!(analysis.cycles.len(), 2);
        let stats = analysis.curve_stats("LKneeAnglesX").unwrap();
        assert_eq!(stats.count, 2);
        // Cycles 50..120 and 120..190 on a ramp: means start at 85.
        assert_abs_diff_eq!(stats.mean[0], 85.0, epsilon = 1e-9);
        assert!(matches!(analysis.curve_stats("RHipAnglesX"), Err(GaitDataError::NoCurves)));
    }

    #[test]
    fn test_right_side_uses_right_events() {
        let trial = walking_trial();
        let request = AnalysisRequest {
            signals: vec!["HipAnglesX".to_string()],
            ..Default::default()
        };
        let analysis = CycleAnalysis::run(&trial, Side::Right, &request).unwrap();
        let result = &analysis.cycles[0];
        assert_eq!((result.cycle.start, result.cycle.end), (85, 155));
        assert_abs_diff_eq!(result.curves[0].values()[0], -85.0, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_signal_and_channel() {
        let trial = walking_trial();
        let request = AnalysisRequest {
            signals: vec!["AnkleAnglesX".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            CycleAnalysis::run(&trial, Side::Left, &request),
            Err(GaitDataError::SignalNotFound(_))
        ));

        let request = AnalysisRequest {
            emg_channels: vec!["RTibA".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            CycleAnalysis::run(&trial, Side::Left, &request),
            Err(GaitDataError::ChannelNotFound(_))
        ));
    }

    #[test]
    fn test_event_errors_propagate() {
        let mut trial = walking_trial();
        trial.events = GaitEvents::new(vec![event(Side::Left, EventKind::FootStrike, 150)]);
        let request = AnalysisRequest::default();
        assert!(matches!(
            CycleAnalysis::run(&trial, Side::Left, &request),
            Err(GaitDataError::InsufficientEvents { found: 1 })
        ));
    }
}

// src/cycle_analysis.rs
