//! Zero-phase Butterworth band-pass filtering
//!
//! Coefficients are designed the classic way: analog Butterworth prototype,
//! low-pass to band-pass transform, bilinear transform with pre-warped
//! edges, then expansion to transfer-function form. Filtering runs forward
//! and backward over an odd-extended signal so the output has no net phase
//! shift.

use crate::processor::{ChannelStage, StageType};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use wam_core::{config_error, Axis, Band, Channel, ChannelId, ChannelSet, WamError, WamResult};

/// Samples of odd extension added at each end before filtering
pub const DEFAULT_PADLEN: usize = 10;

/// Highest accepted filter order; transfer-function form degrades beyond it
pub const MAX_ORDER: usize = 8;

/// Filter configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Pass band in Hz
    pub band: Band,
    /// Butterworth order (the band-pass has twice as many poles)
    pub order: usize,
    /// Axes to filter
    #[serde(default = "all_axes")]
    pub axes: Vec<Axis>,
}

fn all_axes() -> Vec<Axis> {
    Axis::ALL.to_vec()
}

impl FilterConfig {
    /// Create bandpass filter configuration over all three axes
    pub fn bandpass(low_cutoff: f64, high_cutoff: f64, order: usize) -> Self {
        Self {
            band: Band::new(low_cutoff, high_cutoff),
            order,
            axes: all_axes(),
        }
    }

    /// Validate order, axes and band against a sampling rate
    pub fn validate(&self, sampling_rate: f64) -> WamResult<()> {
        if self.order == 0 || self.order > MAX_ORDER {
            return Err(config_error!(
                "filter order {} outside 1..={}",
                self.order,
                MAX_ORDER
            ));
        }
        if self.axes.is_empty() {
            return Err(config_error!("band-pass {} filters no axes", self.band));
        }
        self.band.validate(sampling_rate)
    }
}

/// Transfer function coefficients, `a[0] == 1`
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCoefficients {
    /// Numerator
    pub b: Vec<f64>,
    /// Denominator
    pub a: Vec<f64>,
}

impl FilterCoefficients {
    /// Frequency response magnitude at `freq` Hz
    pub fn magnitude_at(&self, freq: f64, sampling_rate: f64) -> f64 {
        let w = 2.0 * PI * freq / sampling_rate;
        let eval = |coeffs: &[f64]| {
            coeffs
                .iter()
                .enumerate()
                .fold(Complex64::zero(), |acc, (k, &c)| {
                    acc + Complex64::from_polar(1.0, -w * k as f64) * c
                })
        };
        (eval(&self.b) / eval(&self.a)).norm()
    }
}

/// Design a digital Butterworth band-pass filter.
///
/// Critical frequencies are normalized as `2 * cutoff / fs`.
pub fn butter_bandpass(order: usize, band: Band, sampling_rate: f64) -> WamResult<FilterCoefficients> {
    FilterConfig {
        band,
        order,
        axes: all_axes(),
    }
    .validate(sampling_rate)?;

    let n = order as f64;

    // Analog low-pass prototype: poles on the left unit semicircle.
    let prototype: Vec<Complex64> = (0..order)
        .map(|k| {
            let m = -n + 1.0 + 2.0 * k as f64;
            -Complex64::from_polar(1.0, PI * m / (2.0 * n))
        })
        .collect();

    // Pre-warp both edges for the bilinear transform (normalized fs = 2).
    let warp = |cutoff: f64| 4.0 * (PI * (2.0 * cutoff / sampling_rate) / 2.0).tan();
    let low = warp(band.low);
    let high = warp(band.high);
    let bandwidth = high - low;
    let center = (low * high).sqrt();

    // Low-pass to band-pass: each prototype pole splits into two.
    let mut poles = Vec::with_capacity(2 * order);
    let mut mirrored = Vec::with_capacity(order);
    for pole in &prototype {
        let scaled = pole * (bandwidth / 2.0);
        let offset = (scaled * scaled - center * center).sqrt();
        poles.push(scaled + offset);
        mirrored.push(scaled - offset);
    }
    poles.extend(mirrored);
    let analog_gain = bandwidth.powi(order as i32);

    // Bilinear transform. The `order` analog zeros at the origin map to +1,
    // the zeros at infinity map to -1.
    let fs2 = Complex64::new(4.0, 0.0);
    let digital_poles: Vec<Complex64> = poles.iter().map(|p| (fs2 + p) / (fs2 - p)).collect();
    let mut digital_zeros = vec![Complex64::one(); order];
    digital_zeros.extend(std::iter::repeat(-Complex64::one()).take(order));

    let zero_product = fs2.powu(order as u32);
    let pole_product = poles.iter().fold(Complex64::one(), |acc, p| acc * (fs2 - p));
    let gain = analog_gain * (zero_product / pole_product).re;

    let b = poly(&digital_zeros).into_iter().map(|c| gain * c.re).collect();
    let a = poly(&digital_poles).into_iter().map(|c| c.re).collect();

    Ok(FilterCoefficients { b, a })
}

/// Monic polynomial coefficients (highest power first) with the given roots
fn poly(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coeffs = vec![Complex64::one()];
    for root in roots {
        let mut next = vec![Complex64::zero(); coeffs.len() + 1];
        for (i, c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * root;
        }
        coeffs = next;
    }
    coeffs
}

/// Initial state for step-response steady state of a direct-form II
/// transposed filter
pub fn lfilter_zi(coeffs: &FilterCoefficients) -> WamResult<Vec<f64>> {
    let (b, a) = (&coeffs.b, &coeffs.a);
    let n = b.len().max(a.len());
    if n < 2 {
        return Ok(Vec::new());
    }

    let b0 = b[0] / a[0];
    let a_at = |i: usize| a.get(i).copied().unwrap_or(0.0) / a[0];
    let b_at = |i: usize| b.get(i).copied().unwrap_or(0.0) / a[0];

    // (I - companion(a)^T) zi = b[1:] - a[1:] * b[0]
    let m = n - 1;
    let mut system = DMatrix::<f64>::identity(m, m);
    for i in 0..m {
        system[(i, 0)] += a_at(i + 1);
        if i + 1 < m {
            system[(i, i + 1)] -= 1.0;
        }
    }
    let rhs = DVector::from_iterator(m, (1..n).map(|i| b_at(i) - a_at(i) * b0));

    system
        .lu()
        .solve(&rhs)
        .map(|zi| zi.iter().copied().collect())
        .ok_or_else(|| WamError::configuration("filter has no steady state (singular system)"))
}

/// Direct-form II transposed IIR filter with initial state `zi`
pub fn lfilter(coeffs: &FilterCoefficients, input: &[f64], zi: &[f64]) -> Vec<f64> {
    let a0 = coeffs.a[0];
    let n = coeffs.b.len().max(coeffs.a.len());
    let b: Vec<f64> = (0..n)
        .map(|i| coeffs.b.get(i).copied().unwrap_or(0.0) / a0)
        .collect();
    let a: Vec<f64> = (0..n)
        .map(|i| coeffs.a.get(i).copied().unwrap_or(0.0) / a0)
        .collect();

    let mut state = zi.to_vec();
    state.resize(n.saturating_sub(1), 0.0);

    let mut output = Vec::with_capacity(input.len());
    for &x in input {
        let y = b[0] * x + state.first().copied().unwrap_or(0.0);
        for j in 0..n.saturating_sub(2) {
            state[j] = b[j + 1] * x + state[j + 1] - a[j + 1] * y;
        }
        if n >= 2 {
            state[n - 2] = b[n - 1] * x - a[n - 1] * y;
        }
        output.push(y);
    }
    output
}

/// Forward-backward filtering with odd extension of `padlen` samples.
///
/// Fails with `InsufficientData` unless the input is longer than `padlen`.
pub fn filtfilt(coeffs: &FilterCoefficients, input: &[f64], padlen: usize) -> WamResult<Vec<f64>> {
    if input.len() <= padlen {
        return Err(WamError::InsufficientData {
            required: padlen + 1,
            actual: input.len(),
            context: "zero-phase band-pass filter",
        });
    }

    let len = input.len();
    let first = input[0];
    let last = input[len - 1];

    let mut extended = Vec::with_capacity(len + 2 * padlen);
    extended.extend((1..=padlen).rev().map(|i| 2.0 * first - input[i]));
    extended.extend_from_slice(input);
    extended.extend((1..=padlen).map(|i| 2.0 * last - input[len - 1 - i]));

    let zi = lfilter_zi(coeffs)?;

    let x0 = extended[0];
    let forward_state: Vec<f64> = zi.iter().map(|z| z * x0).collect();
    let mut forward = lfilter(coeffs, &extended, &forward_state);

    forward.reverse();
    let y0 = forward[0];
    let backward_state: Vec<f64> = zi.iter().map(|z| z * y0).collect();
    let mut backward = lfilter(coeffs, &forward, &backward_state);
    backward.reverse();

    Ok(backward[padlen..padlen + len].to_vec())
}

/// Band-pass stage: appends one zero-phase filtered channel per axis
#[derive(Debug, Clone)]
pub struct BandPassFilter {
    name: String,
    config: FilterConfig,
    coefficients: FilterCoefficients,
    sampling_rate: f64,
    padlen: usize,
}

impl BandPassFilter {
    /// Design the filter for a sampling rate
    pub fn new(config: FilterConfig, sampling_rate: f64) -> WamResult<Self> {
        config.validate(sampling_rate)?;
        let coefficients = butter_bandpass(config.order, config.band, sampling_rate)?;

        Ok(BandPassFilter {
            name: format!("bandpass_{}_order{}", config.band, config.order),
            config,
            coefficients,
            sampling_rate,
            padlen: DEFAULT_PADLEN,
        })
    }

    pub fn band(&self) -> Band {
        self.config.band
    }

    pub fn coefficients(&self) -> &FilterCoefficients {
        &self.coefficients
    }

    /// Filter one column
    pub fn filter(&self, samples: &[f64]) -> WamResult<Vec<f64>> {
        filtfilt(&self.coefficients, samples, self.padlen)
    }
}

impl ChannelStage for BandPassFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: &ChannelSet) -> WamResult<ChannelSet> {
        if input.sampling_rate() != self.sampling_rate {
            return Err(config_error!(
                "{} was designed for {} Hz, stream is {} Hz",
                self.name,
                self.sampling_rate,
                input.sampling_rate()
            ));
        }

        let derived = self
            .config
            .axes
            .iter()
            .map(|&axis| {
                let filtered = self.filter(input.samples(&ChannelId::Axis(axis))?)?;
                Ok(Channel::new(ChannelId::band_passed(axis, self.config.band), filtered))
            })
            .collect::<WamResult<Vec<_>>>()?;

        input.with_channels(derived)
    }

    fn inputs(&self) -> Vec<ChannelId> {
        self.config.axes.iter().map(|&a| ChannelId::Axis(a)).collect()
    }

    fn outputs(&self) -> Vec<ChannelId> {
        self.config
            .axes
            .iter()
            .map(|&a| ChannelId::band_passed(a, self.config.band))
            .collect()
    }

    fn stage_type(&self) -> StageType {
        StageType::Filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use wam_core::Recording;

    /// Digital centre frequency: geometric mean of the pre-warped edges
    fn center_frequency(band: Band, fs: f64) -> f64 {
        let warped = |f: f64| (PI * f / fs).tan();
        fs / PI * (warped(band.low) * warped(band.high)).sqrt().atan()
    }

    #[test]
    fn test_coefficient_shape() {
        for order in 1..=4 {
            let coeffs = butter_bandpass(order, Band::new(0.25, 3.5), 128.0).unwrap();
            assert_eq!(coeffs.b.len(), 2 * order + 1);
            assert_eq!(coeffs.a.len(), 2 * order + 1);
            assert_abs_diff_eq!(coeffs.a[0], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_first_order_numerator() {
        let coeffs = butter_bandpass(1, Band::new(3.5, 7.5), 128.0).unwrap();
        assert_abs_diff_eq!(coeffs.b[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(coeffs.b[0], -coeffs.b[2], epsilon = 1e-12);
    }

    #[test]
    fn test_butterworth_response() {
        let fs = 100.0;
        for (band, order) in [
            (Band::new(0.25, 3.0), 1),
            (Band::new(3.5, 7.5), 3),
            (Band::new(0.25, 3.5), 4),
        ] {
            let coeffs = butter_bandpass(order, band, fs).unwrap();
            let f0 = center_frequency(band, fs);

            assert_abs_diff_eq!(coeffs.magnitude_at(f0, fs), 1.0, epsilon = 1e-4);
            assert_abs_diff_eq!(
                coeffs.magnitude_at(band.low, fs),
                std::f64::consts::FRAC_1_SQRT_2,
                epsilon = 1e-4
            );
            assert_abs_diff_eq!(
                coeffs.magnitude_at(band.high, fs),
                std::f64::consts::FRAC_1_SQRT_2,
                epsilon = 1e-4
            );
            assert!(coeffs.magnitude_at(0.0, fs) < 1e-6);
            assert!(coeffs.magnitude_at(fs / 2.0, fs) < 1e-6);
        }
    }

    #[test]
    fn test_invalid_design() {
        assert!(butter_bandpass(0, Band::new(0.25, 3.0), 100.0).is_err());
        assert!(butter_bandpass(MAX_ORDER + 1, Band::new(0.25, 3.0), 100.0).is_err());
        assert!(butter_bandpass(2, Band::new(3.0, 0.25), 100.0).is_err());
        assert!(butter_bandpass(2, Band::new(0.25, 60.0), 100.0).is_err());
    }

    #[test]
    fn test_lfilter_zi_is_steady_state() {
        let coeffs = butter_bandpass(2, Band::new(0.5, 4.0), 64.0).unwrap();
        let zi = lfilter_zi(&coeffs).unwrap();

        // A constant input started from the steady state stays at the
        // steady-state output, which is zero for a band-pass.
        let output = lfilter(&coeffs, &[2.0; 50], &zi.iter().map(|z| z * 2.0).collect::<Vec<_>>());
        for y in output {
            assert_abs_diff_eq!(y, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_filtfilt_preserves_length_and_removes_dc() {
        let coeffs = butter_bandpass(1, Band::new(0.25, 3.0), 100.0).unwrap();
        let output = filtfilt(&coeffs, &[9.81; 400], DEFAULT_PADLEN).unwrap();

        assert_eq!(output.len(), 400);
        for y in output {
            assert_abs_diff_eq!(y, 0.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_filtfilt_zero_phase_at_center() {
        let fs = 100.0;
        let band = Band::new(0.25, 3.0);
        let coeffs = butter_bandpass(1, band, fs).unwrap();
        let f0 = center_frequency(band, fs);

        let input: Vec<f64> = (0..6000)
            .map(|i| (2.0 * PI * f0 * i as f64 / fs).sin())
            .collect();
        let output = filtfilt(&coeffs, &input, DEFAULT_PADLEN).unwrap();

        // Away from the edges the centre tone passes unchanged, with no lag.
        for i in 2500..3500 {
            assert_abs_diff_eq!(output[i], input[i], epsilon = 0.02);
        }
    }

    #[test]
    fn test_filtfilt_short_input() {
        let coeffs = butter_bandpass(1, Band::new(0.25, 3.0), 100.0).unwrap();
        let err = filtfilt(&coeffs, &[0.0; 10], DEFAULT_PADLEN).unwrap_err();
        assert_eq!(
            err,
            WamError::InsufficientData {
                required: 11,
                actual: 10,
                context: "zero-phase band-pass filter",
            }
        );
        assert!(filtfilt(&coeffs, &[0.0; 11], DEFAULT_PADLEN).is_ok());
    }

    #[test]
    fn test_bandpass_stage_is_deterministic() {
        let n = 500;
        let x: Vec<f64> = (0..n).map(|i| (i as f64 * 0.37).sin() + 0.01 * i as f64).collect();
        let recording = Recording::from_columns(
            (0..n).map(|i| i as f64 / 50.0).collect(),
            x.clone(),
            x.iter().map(|v| v * 0.5).collect(),
            vec![1.0; n],
            50.0,
        )
        .unwrap();
        let set = recording.channel_set();

        let stage = BandPassFilter::new(FilterConfig::bandpass(0.25, 3.0, 1), 50.0).unwrap();
        let first = stage.apply(&set).unwrap();
        let second = stage.apply(&set).unwrap();

        assert_eq!(first.channel_count(), 6);
        let id = ChannelId::band_passed(Axis::X, Band::new(0.25, 3.0));
        assert_eq!(first.samples(&id).unwrap(), second.samples(&id).unwrap());
        assert_eq!(stage.outputs()[2].to_string(), "z_bp_filt_[0.25, 3.0]");
    }

    #[test]
    fn test_bandpass_stage_rejects_other_rates() {
        let recording = Recording::from_columns(
            vec![0.0; 100],
            vec![0.0; 100],
            vec![0.0; 100],
            vec![0.0; 100],
            64.0,
        )
        .unwrap();
        let stage = BandPassFilter::new(FilterConfig::bandpass(0.25, 3.0, 1), 100.0).unwrap();
        assert!(stage.apply(&recording.channel_set()).is_err());
    }
}
