//! Signal utilities (C1): RMS, peak-to-peak, band-pass energy, Hilbert
//! envelope, and cumulative integration with DC detrend.
//!
//! The FFT-based routines are grounded on the spectral analysis patterns
//! used elsewhere in this codebase's DSP layer (planned `rustfft` FFT,
//! Parseval-theorem energy summation) but scoped down to exactly what the
//! L1 feature pipeline (C3) needs.

use num_complex::Complex;
use rustfft::FftPlanner;

/// Root-mean-square of a real sequence. `0.0` for an empty slice.
pub fn rms(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = x.iter().map(|v| v * v).sum();
    (sum_sq / x.len() as f64).sqrt()
}

/// `(max(x) - min(x)) / 2`, per spec §4.2 step 2. `0.0` for an empty slice.
pub fn peak_to_peak_half(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let mut max = f64::NEG_INFINITY;
    let mut min = f64::INFINITY;
    for &v in x {
        if v > max {
            max = v;
        }
        if v < min {
            min = v;
        }
    }
    (max - min) / 2.0
}

/// Single-sided power spectral energy of `x` integrated between `low_hz`
/// and `high_hz`, via FFT + Parseval's theorem. Returns `0.0` for fewer
/// than 2 samples or a degenerate band.
pub fn bandpass_energy(x: &[f64], fs: f64, low_hz: f64, high_hz: f64) -> f64 {
    if x.len() < 2 || fs <= 0.0 || high_hz <= low_hz {
        return 0.0;
    }
    let n = x.len();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let mut buf: Vec<Complex<f64>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
    fft.process(&mut buf);

    let bin_hz = fs / n as f64;
    let nyquist_bin = n / 2;
    let mut energy = 0.0;
    for (k, c) in buf.iter().enumerate().take(nyquist_bin + 1) {
        let freq = k as f64 * bin_hz;
        if freq < low_hz || freq > high_hz {
            continue;
        }
        // Parseval: sum(x^2) = (1/N) * sum(|X_k|^2) over ALL bins 0..N.
        // One-sided bins (k=1..nyquist-1) represent a mirrored negative
        // counterpart, so they count twice; DC and Nyquist do not.
        let mag_sq = c.norm_sqr();
        let weight = if k == 0 || k == nyquist_bin { 1.0 } else { 2.0 };
        energy += weight * mag_sq / n as f64;
    }
    if energy.is_finite() && energy > 0.0 {
        energy
    } else {
        0.0
    }
}

/// RMS of the analytic-signal envelope `|x + i*Hilbert(x)|`, computed via
/// the standard FFT construction: zero the negative-frequency half, double
/// the positive half (except DC/Nyquist), inverse-transform.
pub fn hilbert_envelope_rms(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return 0.0;
    }
    let n = x.len();
    let mut planner = FftPlanner::<f64>::new();
    let fwd = planner.plan_fft_forward(n);
    let inv = planner.plan_fft_inverse(n);

    let mut buf: Vec<Complex<f64>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
    fwd.process(&mut buf);

    let half = n / 2;
    for (k, c) in buf.iter_mut().enumerate() {
        let is_dc = k == 0;
        let is_nyquist = n % 2 == 0 && k == half;
        if is_dc || is_nyquist {
            continue;
        }
        if k < half || (n % 2 == 1 && k == half) {
            *c *= 2.0;
        } else {
            *c = Complex::new(0.0, 0.0);
        }
    }

    inv.process(&mut buf);
    let scale = 1.0 / n as f64;
    let envelope: Vec<f64> = buf.iter().map(|c| (c * scale).norm()).collect();
    rms(&envelope)
}

/// Cumulative-sum integration (`dt = 1/fs`) followed by constant detrend
/// (subtract the mean), per §4.2 step 6. Returns an empty vec for an empty
/// input.
pub fn cumulative_integrate_detrend(x: &[f64], fs: f64) -> Vec<f64> {
    if x.is_empty() || fs <= 0.0 {
        return Vec::new();
    }
    let dt = 1.0 / fs;
    let mut acc = 0.0;
    let mut integrated: Vec<f64> = Vec::with_capacity(x.len());
    for &v in x {
        acc += v * dt;
        integrated.push(acc);
    }
    let mean: f64 = integrated.iter().sum::<f64>() / integrated.len() as f64;
    integrated.iter_mut().for_each(|v| *v -= mean);
    integrated
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(n: usize, fs: f64, freq: f64, amp: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amp * (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn rms_of_empty_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn rms_of_sine_matches_amplitude_over_sqrt2() {
        let x = sine(4096, 25_600.0, 50.0, 0.02);
        let r = rms(&x);
        assert!((r - 0.02 / 2.0_f64.sqrt()).abs() < 1e-3, "rms={r}");
    }

    #[test]
    fn peak_to_peak_half_of_unit_sine_is_one() {
        let x = sine(4096, 25_600.0, 50.0, 1.0);
        let v = peak_to_peak_half(&x);
        assert!((v - 1.0).abs() < 1e-2, "got {v}");
    }

    #[test]
    fn bandpass_energy_concentrates_in_band_containing_tone() {
        let fs = 25_600.0;
        let x = sine(4096, fs, 50.0, 0.2);
        let in_band = bandpass_energy(&x, fs, 10.0, 100.0);
        let out_of_band = bandpass_energy(&x, fs, 1000.0, 5000.0);
        assert!(in_band > out_of_band, "{in_band} vs {out_of_band}");
    }

    #[test]
    fn bandpass_energy_degenerate_band_is_zero() {
        assert_eq!(bandpass_energy(&[1.0, 2.0, 3.0], 1000.0, 100.0, 100.0), 0.0);
    }

    #[test]
    fn hilbert_envelope_of_sine_is_near_constant_amplitude() {
        let x = sine(4096, 25_600.0, 50.0, 0.02);
        let env_rms = hilbert_envelope_rms(&x);
        // for a pure sinusoid the analytic-signal magnitude is ~constant at
        // the amplitude, so its rms should be close to the amplitude too.
        assert!((env_rms - 0.02).abs() < 2e-3, "env_rms={env_rms}");
    }

    #[test]
    fn cumulative_integrate_detrend_of_empty_is_empty() {
        assert!(cumulative_integrate_detrend(&[], 1000.0).is_empty());
    }

    #[test]
    fn cumulative_integrate_detrend_has_zero_mean() {
        let x = sine(4096, 25_600.0, 50.0, 0.02);
        let v = cumulative_integrate_detrend(&x, 25_600.0);
        let mean: f64 = v.iter().sum::<f64>() / v.len() as f64;
        assert!(mean.abs() < 1e-9, "mean={mean}");
    }
}
