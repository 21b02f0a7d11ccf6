//! Time-domain window statistics
//!
//! Every function returns `f64::NAN` when its result is undefined for the
//! given samples (empty input, zero variance, zero amplitude).

/// Arithmetic mean
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (divisor `N`)
pub fn population_std(data: &[f64]) -> f64 {
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// Standard deviation of the mean-centred signal
pub fn signal_rms(data: &[f64]) -> f64 {
    let m = mean(data);
    let centred: Vec<f64> = data.iter().map(|x| x - m).collect();
    population_std(&centred)
}

/// `max - min`, ignoring NaN samples
pub fn signal_range(data: &[f64]) -> f64 {
    let (min, max) = data
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        return f64::NAN;
    }
    max - min
}

/// Pearson correlation coefficient
pub fn correlation_coefficient(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return f64::NAN;
    }
    let (ma, mb) = (mean(a), mean(b));
    let mut sab = 0.0;
    let mut saa = 0.0;
    let mut sbb = 0.0;
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - ma, y - mb);
        sab += dx * dy;
        saa += dx * dx;
        sbb += dy * dy;
    }
    sab / (saa * sbb).sqrt()
}

/// Sign with zero as its own class; NaN stays NaN
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else if x == 0.0 {
        0.0
    } else {
        f64::NAN
    }
}

/// Fraction of consecutive samples whose centred signs differ, in `[0, 1]`
pub fn mean_cross_rate(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let m = mean(data);
    let crossings = data
        .windows(2)
        .filter(|pair| sign(pair[0] - m) != sign(pair[1] - m))
        .count();
    crossings as f64 / data.len() as f64
}

/// Fraction of samples with `min <= x < max`
pub fn range_count_percentage(data: &[f64], min: f64, max: f64) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let count = data.iter().filter(|&&x| x >= min && x < max).count();
    count as f64 / data.len() as f64
}

/// Mean squared jerk normalized by `360 * amplitude^2 / duration`
pub fn jerk_ratio(data: &[f64], sampling_rate: f64) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let dt = 1.0 / sampling_rate;
    let duration = data.len() as f64 * dt;
    let amplitude = data.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));

    let jerk_squared_sum: f64 = data
        .windows(2)
        .map(|pair| ((pair[1] - pair[0]) / dt).powi(2))
        .sum();
    let mean_squared_jerk = jerk_squared_sum * dt / (duration * 2.0);
    let scale = 360.0 * amplitude.powi(2) / duration;

    mean_squared_jerk / scale
}

/// Root mean square of the raw samples
pub fn amplitude(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    (data.iter().map(|x| x * x).sum::<f64>() / data.len() as f64).sqrt()
}

/// Percentile with linear interpolation between closest ranks, `q` in `[0, 1]`
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let position = q * (n - 1) as f64;
            let lower = position.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let fraction = position - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}

/// Interquartile range; NaN if any sample is NaN
pub fn interquartile_range(data: &[f64]) -> f64 {
    if data.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile(&sorted, 0.75) - percentile(&sorted, 0.25)
}
