//! FFT-based window features
//!
//! Dominant frequency metrics come from the one-sided power spectrum of a
//! zero-padded window. Autocovariance is computed through a padded circular
//! correlation so it stays `O(N log N)` for long windows.

use super::statistics::{interquartile_range, mean};
use num_complex::Complex;
use realfft::RealFftPlanner;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use wam_core::{WamError, WamResult};

/// Default upper frequency considered by dominant frequency analysis (Hz)
pub const DEFAULT_FREQUENCY_CUTOFF: f64 = 12.0;

/// Half-width of the band around the peak counted in the power ratio (Hz)
const PEAK_HALF_WIDTH: f64 = 0.5;

/// Spectrum summary of one window channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DominantFrequency {
    /// Frequency of the first spectral peak (Hz)
    pub value: f64,
    /// Normalized power at the peak
    pub magnitude: f64,
    /// Fraction of power within +/-0.5 Hz of the peak
    pub ratio: f64,
    /// `10 * log10(geometric mean / arithmetic mean)` (dB)
    pub flatness: f64,
    /// Shannon entropy (bits) normalized by `log2(bins)`
    pub entropy: f64,
}

impl DominantFrequency {
    fn undefined() -> Self {
        DominantFrequency {
            value: f64::NAN,
            magnitude: f64::NAN,
            ratio: f64::NAN,
            flatness: f64::NAN,
            entropy: f64::NAN,
        }
    }

    /// Values in column order
    pub fn values(&self) -> [f64; 5] {
        [self.value, self.magnitude, self.ratio, self.flatness, self.entropy]
    }
}

/// FFT length: smallest power of two with more bits than `n`
pub fn fft_length(n: usize) -> usize {
    1usize << (usize::BITS - n.leading_zeros())
}

/// Dominant frequency analysis restricted to `freq <= cutoff`.
///
/// Fails with `DataInsufficient` for fewer than two samples. A silent
/// window (zero total power) yields undefined values.
pub fn dominant_frequency(data: &[f64], sampling_rate: f64, cutoff: f64) -> WamResult<DominantFrequency> {
    if data.len() < 2 {
        return Err(WamError::DataInsufficient {
            operation: "dominant frequency",
            required: 2,
            actual: data.len(),
        });
    }

    let nfft = fft_length(data.len());
    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(nfft);

    let mut input = r2c.make_input_vec();
    input[..data.len()].copy_from_slice(data);
    let mut spectrum = r2c.make_output_vec();
    r2c.process(&mut input, &mut spectrum)
        .map_err(|e| WamError::configuration(format!("fft of {nfft} points failed: {e}")))?;

    let resolution = sampling_rate / nfft as f64;
    let (freqs, power): (Vec<f64>, Vec<f64>) = spectrum
        .iter()
        .take(nfft / 2)
        .enumerate()
        .map(|(k, c)| (k as f64 * resolution, c.norm_sqr()))
        .filter(|(f, _)| *f <= cutoff)
        .unzip();

    let total: f64 = power.iter().sum();
    if power.is_empty() || !(total > 0.0) || !total.is_finite() {
        return Ok(DominantFrequency::undefined());
    }
    let normalized: Vec<f64> = power.iter().map(|p| p / total).collect();
    let bins = normalized.len() as f64;

    let mut peak = 0;
    for (i, &p) in normalized.iter().enumerate() {
        if p > normalized[peak] {
            peak = i;
        }
    }
    let value = freqs[peak];
    let magnitude = normalized[peak];

    let ratio = freqs
        .iter()
        .zip(&normalized)
        .filter(|(f, _)| **f > value - PEAK_HALF_WIDTH && **f < value + PEAK_HALF_WIDTH)
        .map(|(_, p)| p)
        .sum::<f64>();

    let geometric = (normalized.iter().map(|p| p.ln()).sum::<f64>() / bins).exp();
    let arithmetic = normalized.iter().sum::<f64>() / bins;
    let flatness = 10.0 * (geometric / arithmetic).log10();

    let entropy = -normalized
        .iter()
        .filter(|&&p| p != 0.0)
        .map(|p| p * p.log2())
        .sum::<f64>()
        / bins.log2();

    Ok(DominantFrequency {
        value,
        magnitude,
        ratio,
        flatness,
        entropy,
    })
}

/// Autocorrelation with per-lag unbiased divisor `N - k`, lags `0..=max_lag`
pub fn autocorrelation(data: &[f64], max_lag: usize) -> WamResult<Vec<f64>> {
    let n = data.len();
    if n < 2 {
        return Err(WamError::DataInsufficient {
            operation: "autocorrelation",
            required: 2,
            actual: n,
        });
    }

    let m = mean(data);
    let size = (2 * n - 1).next_power_of_two();
    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    let mut buffer: Vec<Complex<f64>> = data
        .iter()
        .map(|&x| Complex::new(x - m, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(size)
        .collect();
    forward.process(&mut buffer);
    for c in buffer.iter_mut() {
        *c = Complex::new(c.norm_sqr(), 0.0);
    }
    inverse.process(&mut buffer);

    let lags = max_lag.min(n - 1);
    let autocovariance: Vec<f64> = (0..=lags)
        .map(|k| buffer[k].re / size as f64 / (n - k) as f64)
        .collect();

    let variance = autocovariance[0];
    Ok(autocovariance.iter().map(|c| c / variance).collect())
}

/// Interquartile range of the autocorrelation out to `N / 2` lags
pub fn iqr_of_autocovariance(data: &[f64]) -> WamResult<f64> {
    let acf = autocorrelation(data, data.len() / 2)?;
    Ok(interquartile_range(&acf))
}
