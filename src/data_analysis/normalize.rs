// src/data_analysis/normalize.rs

use ndarray::Array1;

use crate::constants::{CYCLE_PERCENT_MAX, NORMALIZED_POINTS};
use crate::data_analysis::gait_cycle::GaitCycle;
use crate::data_input::trial_data::{checked_window, AnalogSignal, Signal};
use crate::error::{GaitDataError, Result};
use crate::types::CurvePoints;

/// A signal resampled onto the 0..100 % gait-cycle grid. Always 101 samples.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCurve {
    pub name: String,
    values: Array1<f64>,
}

impl NormalizedCurve {
    fn new(name: impl Into<String>, values: Array1<f64>) -> Self {
        debug_assert_eq!(values.len(), NORMALIZED_POINTS);
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array1<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a whole percentage of the cycle.
    pub fn at_percent(&self, percent: u32) -> Option<f64> {
        self.values.get(percent as usize).copied()
    }

    /// The implicit x-axis, `[0, 1, ..., 100]`.
    pub fn axis() -> Array1<f64> {
        Array1::linspace(0.0, CYCLE_PERCENT_MAX, NORMALIZED_POINTS)
    }

    /// (percent, value) pairs for renderers.
    pub fn points(&self) -> CurvePoints {
        Self::axis().iter().copied().zip(self.values.iter().copied()).collect()
    }
}

/// Piecewise-linear interpolation of `fp` (sampled at ascending `xp`) at `x`.
///
/// Queries below `xp[0]` or above the last abscissa clamp to the end values.
/// A query that equals an abscissa returns that ordinate exactly; when
/// abscissae repeat, the leftmost matching sample is used.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len().min(fp.len());
    if n == 0 {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        // Leftmost sample equal to the last abscissa.
        let first_eq = xp[..n].partition_point(|&v| v < xp[n - 1]);
        return if x == xp[n - 1] { fp[first_eq] } else { fp[n - 1] };
    }
    // First index with xp[i] >= x; xp[0] < x < xp[n - 1] so 1 <= i <= n - 1.
    let i = xp[..n].partition_point(|&v| v < x);
    if xp[i] == x {
        return fp[i];
    }
    let (x0, x1) = (xp[i - 1], xp[i]);
    let (y0, y1) = (fp[i - 1], fp[i]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Resamples `values` onto the normalized grid. Needs at least 2 samples.
pub fn normalize_values(values: &Array1<f64>) -> Result<Array1<f64>> {
    let length = values.len();
    if length < 2 {
        return Err(GaitDataError::DegenerateCycle { length: length as i64 });
    }
    let mut xp = Array1::linspace(0.0, CYCLE_PERCENT_MAX, length).to_vec();
    // Pin the last abscissa so 100 % maps onto the final sample without rounding drift.
    xp[length - 1] = CYCLE_PERCENT_MAX;
    let fp = values.to_vec();
    Ok(NormalizedCurve::axis().mapv(|x| interp(x, &xp, &fp)))
}

/// Time-normalizes the cycle window `[cycle.start, cycle.end)` of `signal`.
///
/// The side of `signal` is not checked against `cycle.side`.
pub fn normalize(signal: &Signal, cycle: &GaitCycle) -> Result<NormalizedCurve> {
    if cycle.length() <= 1 {
        return Err(GaitDataError::DegenerateCycle { length: cycle.length() });
    }
    let window = signal.window(cycle.start, cycle.end)?;
    Ok(NormalizedCurve::new(signal.name.clone(), normalize_values(&window)?))
}

/// Time-normalizes an already cut analog window (e.g. an EMG envelope).
pub fn normalize_analog(signal: &AnalogSignal) -> Result<NormalizedCurve> {
    Ok(NormalizedCurve::new(signal.name.clone(), normalize_values(&signal.values)?))
}

/// Cuts the analog samples belonging to a cycle, keeping their native rate.
///
/// Frame boundaries are converted with `round(frame * samples_per_frame)`.
pub fn cut_analog(signal: &AnalogSignal, cycle: &GaitCycle, samples_per_frame: f64) -> Result<AnalogSignal> {
    if !samples_per_frame.is_finite() || samples_per_frame <= 0.0 {
        return Err(GaitDataError::InvalidParameter(format!(
            "samples per frame must be positive, got {}",
            samples_per_frame
        )));
    }
    if cycle.length() <= 0 {
        return Err(GaitDataError::DegenerateCycle { length: cycle.length() });
    }
    let start = (cycle.start as f64 * samples_per_frame).round() as i64;
    let end = (cycle.end as f64 * samples_per_frame).round() as i64;
    let values = checked_window(&signal.name, &signal.values, start, end)?;
    Ok(signal.with_values(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_analysis::gait_cycle::build_cycle;
    use crate::data_input::trial_data::Side;
    use approx::assert_abs_diff_eq;

    fn ramp_signal(len: usize) -> Signal {
        Signal::new("LKneeAnglesX", Array1::from_iter((0..len).map(|i| i as f64 * 0.5)), 100.0, 0)
    }

    fn cycle(start: i64, end: i64) -> GaitCycle {
        GaitCycle { side: Side::Left, start, end, toe_off: start + 1 }
    }

    #[test]
    fn test_interp_basics() {
        let xp = [0.0, 1.0, 2.0];
        let fp = [10.0, 20.0, 40.0];
        assert_eq!(interp(-1.0, &xp, &fp), 10.0);
        assert_eq!(interp(0.0, &xp, &fp), 10.0);
        assert_eq!(interp(0.5, &xp, &fp), 15.0);
        assert_eq!(interp(1.0, &xp, &fp), 20.0);
        assert_eq!(interp(1.5, &xp, &fp), 30.0);
        assert_eq!(interp(2.0, &xp, &fp), 40.0);
        assert_eq!(interp(3.0, &xp, &fp), 40.0);
        assert!(interp(1.0, &[], &[]).is_nan());
    }

    #[test]
    fn test_interp_duplicate_abscissa_uses_leftmost() {
        let xp = [0.0, 1.0, 1.0, 2.0];
        let fp = [0.0, 5.0, 7.0, 9.0];
        assert_eq!(interp(1.0, &xp, &fp), 5.0);
        let xp_end = [0.0, 2.0, 2.0];
        let fp_end = [0.0, 3.0, 4.0];
        assert_eq!(interp(2.0, &xp_end, &fp_end), 3.0);
    }

    #[test]
    fn test_grid_size_independent_of_cycle_length() {
        let signal = ramp_signal(400);
        for end in [2, 3, 37, 70, 101, 150, 399] {
            let curve = normalize(&signal, &cycle(0, end)).unwrap();
            assert_eq!(curve.len(), NORMALIZED_POINTS);
        }
    }

    #[test]
    fn test_endpoints_are_exact() {
        let signal = Signal::new(
            "RAnkleMomentX",
            Array1::from_iter((0..200).map(|i| (i as f64 * 0.173).sin() * 3.0 + 0.01 * i as f64)),
            100.0,
            0,
        );
        let c = cycle(37, 118);
        let curve = normalize(&signal, &c).unwrap();
        assert_abs_diff_eq!(curve.values()[0], signal.values[37], epsilon = 1e-12);
        assert_abs_diff_eq!(curve.values()[100], signal.values[117], epsilon = 1e-12);
    }

    #[test]
    fn test_linear_signal_stays_linear() {
        // 0.5 per frame over a 51-frame window maps to 0.25 per percent.
        let signal = ramp_signal(100);
        let curve = normalize(&signal, &cycle(10, 61)).unwrap();
        for (pct, value) in curve.values().iter().enumerate() {
            assert_abs_diff_eq!(*value, 5.0 + 0.25 * pct as f64, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_axis_is_whole_percentages() {
        let axis = NormalizedCurve::axis();
        assert_eq!(axis.len(), 101);
        for (i, x) in axis.iter().enumerate() {
            assert_abs_diff_eq!(*x, i as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_degenerate_cycle_rejected() {
        let signal = ramp_signal(10);
        assert!(matches!(
            normalize(&signal, &cycle(3, 4)),
            Err(GaitDataError::DegenerateCycle { length: 1 })
        ));
    }

    #[test]
    fn test_out_of_range_not_truncated() {
        let signal = ramp_signal(50);
        assert!(matches!(
            normalize(&signal, &cycle(20, 60)),
            Err(GaitDataError::SignalOutOfRange { len: 50, .. })
        ));
        assert!(normalize(&signal, &cycle(-5, 20)).is_err());
    }

    #[test]
    fn test_normalize_with_roi_offset() {
        // Signal covers trial frames 100..300; events are on the trial timeline.
        let signal = Signal::new("LHipAnglesX", Array1::from_iter((0..200).map(|i| i as f64)), 100.0, 100);
        let c = build_cycle(&[150, 220], &[190], signal.offset).unwrap();
        let curve = normalize(&signal, &c).unwrap();
        assert_abs_diff_eq!(curve.values()[0], 50.0, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.values()[100], 119.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cut_analog_keeps_native_rate() {
        let analog = AnalogSignal::new("Voltage.LGas", Array1::from_iter((0..2000).map(|i| i as f64)), 1000.0);
        let c = cycle(50, 120);
        let cut = cut_analog(&analog, &c, 10.0).unwrap();
        assert_eq!(cut.len(), 700);
        assert_eq!(cut.values[0], 500.0);
        assert_eq!(cut.values[699], 1199.0);
        assert_eq!(cut.sample_rate, 1000.0);
        assert_eq!(cut.name, "Voltage.LGas");
    }

    #[test]
    fn test_cut_analog_rounds_fractional_ratio() {
        let analog = AnalogSignal::new("EMG", Array1::zeros(1000), 1500.0);
        // 1500 Hz analog against 120 Hz frames: 12.5 samples per frame.
        let c = cycle(3, 11);
        let cut = cut_analog(&analog, &c, 12.5).unwrap();
        // round(37.5) = 38, round(137.5) = 138
        assert_eq!(cut.len(), 100);
    }

    #[test]
    fn test_normalize_analog_window() {
        let analog = AnalogSignal::new("LGas", Array1::from_iter((0..701).map(|i| i as f64 / 7.0)), 1000.0);
        let curve = normalize_analog(&analog).unwrap();
        assert_eq!(curve.name, "LGas");
        assert_abs_diff_eq!(curve.values()[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.values()[50], 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(curve.values()[100], 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cut_analog_rejects_bad_input() {
        let analog = AnalogSignal::new("EMG", Array1::zeros(100), 1000.0);
        assert!(cut_analog(&analog, &cycle(0, 50), 0.0).is_err());
        assert!(matches!(
            cut_analog(&analog, &cycle(0, 50), 10.0),
            Err(GaitDataError::SignalOutOfRange { .. })
        ));
    }
}

// src/data_analysis/normalize.rs
