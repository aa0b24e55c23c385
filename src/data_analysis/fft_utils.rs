// src/data_analysis/fft_utils.rs

use log::debug;
use ndarray::Array1;
use realfft::num_complex::Complex64;
use realfft::RealFftPlanner;

use crate::error::{GaitDataError, Result};

/// Number of complex bins a real FFT of length `n` produces.
pub fn rfft_len(n: usize) -> usize {
    n / 2 + 1
}

/// Computes the FFT of a real-valued signal. Returns `n / 2 + 1` bins.
pub fn fft_forward(data: &Array1<f64>) -> Result<Array1<Complex64>> {
    if data.is_empty() {
        return Ok(Array1::zeros(0));
    }
    let n = data.len();
    let mut input = data.to_vec();
    let planner = RealFftPlanner::<f64>::new().plan_fft_forward(n);
    let mut output = planner.make_output_vec();
    planner
        .process(&mut input, &mut output)
        .map_err(|e| GaitDataError::InvalidParameter(format!("forward FFT failed: {}", e)))?;
    Ok(Array1::from(output))
}

/// Inverse FFT back to `original_length_n` real samples, normalized by `1 / n`.
///
/// The imaginary parts of the DC bin and (for even lengths) the Nyquist bin
/// are discarded, as a real signal cannot carry them.
pub fn fft_inverse(data: &Array1<Complex64>, original_length_n: usize) -> Result<Array1<f64>> {
    if original_length_n == 0 {
        return Ok(Array1::zeros(0));
    }
    let expected_complex_len = rfft_len(original_length_n);
    if data.len() != expected_complex_len {
        return Err(GaitDataError::InvalidParameter(format!(
            "inverse FFT length mismatch: expected {} bins, got {}",
            expected_complex_len,
            data.len()
        )));
    }

    let mut input = data.to_vec();
    input[0].im = 0.0;
    if original_length_n % 2 == 0 {
        input[expected_complex_len - 1].im = 0.0;
    }

    let planner = RealFftPlanner::<f64>::new().plan_fft_inverse(original_length_n);
    let mut output = planner.make_output_vec();
    planner
        .process(&mut input, &mut output)
        .map_err(|e| GaitDataError::InvalidParameter(format!("inverse FFT failed: {}", e)))?;

    let scale = 1.0 / original_length_n as f64;
    let mut output_arr = Array1::from(output);
    output_arr.mapv_inplace(|x| x * scale);
    Ok(output_arr)
}

/// Band-limited resampling of a uniformly sampled signal to `num` samples.
///
/// Works in the frequency domain: the spectrum is truncated or zero-padded,
/// so content above the new Nyquist frequency is removed instead of aliased.
/// The signal is treated as periodic, so edges may show some ringing.
pub fn resample(data: &Array1<f64>, num: usize) -> Result<Array1<f64>> {
    let nx = data.len();
    if num == 0 {
        return Err(GaitDataError::InvalidParameter("resample target length must be positive".to_string()));
    }
    if nx == 0 {
        return Err(GaitDataError::InvalidParameter("cannot resample an empty signal".to_string()));
    }
    if nx == num {
        return Ok(data.to_owned());
    }

    let spectrum = fft_forward(data)?;
    let mut resampled_spectrum = Array1::<Complex64>::zeros(rfft_len(num));
    let n = nx.min(num);
    let kept_bins = n / 2 + 1;
    for i in 0..kept_bins {
        resampled_spectrum[i] = spectrum[i];
    }
    if n % 2 == 0 {
        let nyquist = n / 2;
        if num < nx {
            // The bin becomes the new Nyquist bin and must carry both halves.
            resampled_spectrum[nyquist] *= 2.0;
        } else {
            // The old Nyquist energy is split between the +/- bins of the longer spectrum.
            resampled_spectrum[nyquist] *= 0.5;
        }
    }

    let mut output = fft_inverse(&resampled_spectrum, num)?;
    let scale = num as f64 / nx as f64;
    output.mapv_inplace(|x| x * scale);
    debug!("Resampled {} -> {} samples", nx, num);
    Ok(output)
}


// src/data_analysis/fft_utils.rs
