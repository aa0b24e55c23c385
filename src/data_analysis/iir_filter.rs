// src/data_analysis/iir_filter.rs
//
// Butterworth IIR design and zero-phase filtering.
//
// Filters are designed from the analog Butterworth prototype, mapped to the
// requested band, and discretized with the bilinear transform after
// prewarping the corner frequencies. They are realized as cascaded
// second-order sections, which keeps 4th-order low-frequency filters at kHz
// sample rates numerically stable, and run through sci-rs.

use log::debug;
use ndarray::Array1;
use num_complex::Complex64;
use sci_rs::signal::filter::design::Sos;
use sci_rs::signal::filter::{sosfilt_dyn, sosfiltfilt_dyn};
use std::f64::consts::PI;

use crate::constants::FILTFILT_PADDING_FACTOR;
use crate::error::{GaitDataError, Result};

/// Band type of a designed filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterBand {
    Lowpass(f64),
    Highpass(f64),
    Bandpass(f64, f64),
}

impl FilterBand {
    pub fn name(&self) -> &'static str {
        match self {
            FilterBand::Lowpass(_) => "lowpass",
            FilterBand::Highpass(_) => "highpass",
            FilterBand::Bandpass(_, _) => "bandpass",
        }
    }
}

/// One second-order section: H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 2],
}

impl Biquad {
    pub fn new(b: [f64; 3], a: [f64; 2]) -> Self {
        Self { b, a }
    }

    /// Stability of 1 + a1 z^-1 + a2 z^-2 (poles inside the unit circle).
    pub fn is_stable(&self) -> bool {
        self.a[1].abs() < 1.0 && self.a[0].abs() < 1.0 + self.a[1]
    }

    /// The section in sci-rs form, with a fresh zero state.
    pub fn to_sos(&self) -> Sos<f64> {
        Sos::new(self.b, [1.0, self.a[0], self.a[1]])
    }

    /// Complex response at normalized angular frequency `omega` (rad/sample).
    fn response(&self, omega: f64) -> Complex64 {
        let z_inv = Complex64::from_polar(1.0, -omega);
        let z_inv2 = z_inv * z_inv;
        let num = self.b[0] + self.b[1] * z_inv + self.b[2] * z_inv2;
        let den = 1.0 + self.a[0] * z_inv + self.a[1] * z_inv2;
        num / den
    }
}

/// A Butterworth filter as a cascade of second-order sections.
#[derive(Debug, Clone, PartialEq)]
pub struct ButterworthFilter {
    sections: Vec<Biquad>,
    band: FilterBand,
    order: usize,
    sample_rate: f64,
}

impl ButterworthFilter {
    /// Designs an order-`order` Butterworth filter for `band` at `sample_rate`.
    ///
    /// Band-pass filters of order N have 2N poles (N sections), like the
    /// classic `butter(N, [low, high], 'band')` design.
    pub fn design(order: usize, band: FilterBand, sample_rate: f64) -> Result<Self> {
        if order == 0 || order > 20 {
            return Err(GaitDataError::InvalidFilter(format!("order must be 1-20, got {}", order)));
        }
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(GaitDataError::InvalidFilter(format!("sample rate must be positive, got {}", sample_rate)));
        }
        let nyquist = sample_rate / 2.0;
        let valid = |f: f64| f.is_finite() && f > 0.0 && f < nyquist;

        let prototype = butterworth_poles(order);
        let k = 2.0 * sample_rate;
        let sections: Vec<Biquad> = match band {
            FilterBand::Lowpass(cutoff) | FilterBand::Highpass(cutoff) => {
                if !valid(cutoff) {
                    return Err(GaitDataError::InvalidFilter(format!(
                        "{} cutoff {} Hz must lie in (0, {}) Hz",
                        band.name(),
                        cutoff,
                        nyquist
                    )));
                }
                let wc = prewarp(cutoff, sample_rate);
                let highpass = matches!(band, FilterBand::Highpass(_));
                prototype
                    .iter()
                    .map(|&p| match p {
                        PrototypePole::Real(re) => bilinear_1pole(re * wc, k, highpass),
                        PrototypePole::Pair(c) => bilinear_2pole(c * wc, k, highpass),
                    })
                    .collect()
            }
            FilterBand::Bandpass(low, high) => {
                if !valid(low) || !valid(high) || low >= high {
                    return Err(GaitDataError::InvalidFilter(format!(
                        "bandpass edges {}-{} Hz must satisfy 0 < low < high < {} Hz",
                        low, high, nyquist
                    )));
                }
                let wl = prewarp(low, sample_rate);
                let wh = prewarp(high, sample_rate);
                bandpass_sections(&prototype, wh - wl, (wl * wh).sqrt(), k)
            }
        };

        let filter = Self {
            sections,
            band,
            order,
            sample_rate,
        };
        debug!(
            "Designed order-{} Butterworth {} ({:?}) at {} Hz: {} sections",
            order,
            band.name(),
            band,
            sample_rate,
            filter.sections.len()
        );
        Ok(filter)
    }

    pub fn lowpass(order: usize, cutoff_hz: f64, sample_rate: f64) -> Result<Self> {
        Self::design(order, FilterBand::Lowpass(cutoff_hz), sample_rate)
    }

    pub fn highpass(order: usize, cutoff_hz: f64, sample_rate: f64) -> Result<Self> {
        Self::design(order, FilterBand::Highpass(cutoff_hz), sample_rate)
    }

    pub fn bandpass(order: usize, low_hz: f64, high_hz: f64, sample_rate: f64) -> Result<Self> {
        Self::design(order, FilterBand::Bandpass(low_hz, high_hz), sample_rate)
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    pub fn band(&self) -> FilterBand {
        self.band
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(Biquad::is_stable)
    }

    /// Magnitude response at `freq_hz`.
    pub fn magnitude_at(&self, freq_hz: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / self.sample_rate;
        self.sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.response(omega))
            .norm()
    }

    /// Edge padding of the zero-phase pass; inputs must be longer than this.
    pub fn pad_len(&self) -> usize {
        FILTFILT_PADDING_FACTOR * (2 * self.sections.len() + 1)
    }

    pub fn sos(&self) -> Vec<Sos<f64>> {
        self.sections.iter().map(Biquad::to_sos).collect()
    }

    /// Causal filtering from a zero state.
    pub fn filter(&self, data: &Array1<f64>) -> Array1<f64> {
        let mut sos = self.sos();
        Array1::from(sosfilt_dyn(data.iter(), &mut sos))
    }

    /// Zero-phase filtering: forward pass, then backward pass over the reversed output.
    ///
    /// Edges are extended by odd reflection and both passes start from the
    /// steady state matching the edge sample. The result has the same length as `data`.
    pub fn filtfilt(&self, data: &Array1<f64>) -> Result<Array1<f64>> {
        let pad = self.pad_len();
        if data.len() <= pad {
            return Err(GaitDataError::SignalTooShort { len: data.len(), min: pad });
        }
        Ok(Array1::from(sosfiltfilt_dyn(data.iter(), &self.sos())))
    }
}

/// Analog Butterworth prototype pole: a real pole or one member of a conjugate pair.
#[derive(Debug, Clone, Copy)]
enum PrototypePole {
    Real(f64),
    Pair(Complex64),
}

/// Left-half-plane poles of the unit-cutoff Butterworth prototype, one per conjugate pair.
fn butterworth_poles(order: usize) -> Vec<PrototypePole> {
    let mut poles: Vec<PrototypePole> = (0..order / 2)
        .map(|k| {
            let theta = PI * (2 * k + 1) as f64 / (2 * order) as f64;
            PrototypePole::Pair(Complex64::new(-theta.sin(), theta.cos()))
        })
        .collect();
    if order % 2 == 1 {
        poles.push(PrototypePole::Real(-1.0));
    }
    poles
}

/// Pre-warp frequency for bilinear transform.
fn prewarp(freq_hz: f64, sample_rate: f64) -> f64 {
    2.0 * sample_rate * (PI * freq_hz / sample_rate).tan()
}

/// Bilinear transform of a single real pole `p` (already scaled to the cutoff).
fn bilinear_1pole(p: f64, k: f64, highpass: bool) -> Biquad {
    let alpha = k - p;
    let beta = k + p;
    let a1 = -beta / alpha;
    if highpass {
        // H(s) = s / (s - p)
        Biquad::new([k / alpha, -k / alpha, 0.0], [a1, 0.0])
    } else {
        // H(s) = -p / (s - p)
        Biquad::new([-p / alpha, -p / alpha, 0.0], [a1, 0.0])
    }
}

/// Bilinear transform of a conjugate pole pair `p, p*` (already scaled to the cutoff).
///
/// Butterworth poles sit on a circle, so the high-pass pair wc/p has the same
/// real part and magnitude as p * wc and the denominators coincide.
fn bilinear_2pole(p: Complex64, k: f64, highpass: bool) -> Biquad {
    let p_mag_sq = p.norm_sqr();
    let k2 = k * k;
    let d = k2 - 2.0 * k * p.re + p_mag_sq;
    let a1 = 2.0 * (p_mag_sq - k2) / d;
    let a2 = (k2 + 2.0 * k * p.re + p_mag_sq) / d;
    if highpass {
        // H(s) = s^2 / (s^2 - 2 Re(p) s + |p|^2)
        Biquad::new([k2 / d, -2.0 * k2 / d, k2 / d], [a1, a2])
    } else {
        // H(s) = |p|^2 / (s^2 - 2 Re(p) s + |p|^2)
        Biquad::new([p_mag_sq / d, 2.0 * p_mag_sq / d, p_mag_sq / d], [a1, a2])
    }
}

/// Bilinear transform of H(s) = bw s / (s^2 + d1 s + d0).
fn bilinear_bandpass_section(bw: f64, d1: f64, d0: f64, k: f64) -> Biquad {
    let k2 = k * k;
    let norm = k2 + d1 * k + d0;
    let gain = bw * k / norm;
    Biquad::new(
        [gain, 0.0, -gain],
        [2.0 * (d0 - k2) / norm, (k2 - d1 * k + d0) / norm],
    )
}

/// Low-pass to band-pass transform s -> (s^2 + w0^2) / (bw s) of the prototype.
///
/// Each prototype pole p yields the roots of s^2 - p bw s + w0^2. A real
/// prototype pole gives one section directly; a conjugate pair gives two
/// sections, each pairing a band-pass pole with its own conjugate.
fn bandpass_sections(prototype: &[PrototypePole], bw: f64, w0: f64, k: f64) -> Vec<Biquad> {
    let w0_sq = w0 * w0;
    let mut sections = Vec::with_capacity(prototype.len() * 2);
    for pole in prototype {
        match *pole {
            PrototypePole::Real(p) => {
                sections.push(bilinear_bandpass_section(bw, -p * bw, w0_sq, k));
            }
            PrototypePole::Pair(p) => {
                let pb = p * bw;
                let disc = (pb * pb - 4.0 * w0_sq).sqrt();
                for root in [(pb + disc) / 2.0, (pb - disc) / 2.0] {
                    sections.push(bilinear_bandpass_section(bw, -2.0 * root.re, root.norm_sqr(), k));
                }
            }
        }
    }
    sections
}


// src/data_analysis/iir_filter.rs
