//! Descriptive statistics over raw trial values.
//!
//! Shared by the reference engine (per-output summaries) and the preview
//! histogram. Conventions: population standard deviation, linearly
//! interpolated percentiles, equal-width bins over `[min, max]` with the last
//! bin closed on the right.

/// Arithmetic mean. NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Percentile `p` in [0, 100] of an ascending slice, linear interpolation
/// between closest ranks.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Median of an ascending slice (mean of the two middle values for even n).
pub fn median_sorted(sorted: &[f64]) -> f64 {
    percentile_sorted(sorted, 50.0)
}

/// Copy and sort ascending. NaNs sort last.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Equal-width histogram with `bins` bins.
///
/// Returns `(counts, edges)` with `edges.len() == counts.len() + 1`. The range
/// is `[min, max]` of the data; a zero-width range is widened to
/// `[v - 0.5, v + 0.5]`, and empty input uses `[0, 1]`. Non-finite values are
/// not counted.
pub fn histogram(values: &[f64], bins: usize) -> (Vec<u64>, Vec<f64>) {
    let bins = bins.max(1);
    let finite = values.iter().copied().filter(|v| v.is_finite());

    let (mut lo, mut hi) = finite
        .clone()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        lo = 0.0;
        hi = 1.0;
    } else if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = hi - lo;
    let mut edges: Vec<f64> = (0..=bins)
        .map(|i| lo + width * i as f64 / bins as f64)
        .collect();
    edges[bins] = hi;

    let mut counts = vec![0u64; bins];
    for v in finite {
        let mut idx = (((v - lo) / width) * bins as f64) as usize;
        idx = idx.min(bins - 1);
        // Float rounding can land one bin off near an edge.
        if v < edges[idx] && idx > 0 {
            idx -= 1;
        } else if idx + 1 < bins && v >= edges[idx + 1] {
            idx += 1;
        }
        counts[idx] += 1;
    }

    (counts, edges)
}

/// Pearson correlation of two equal-length series.
///
/// Returns 0.0 when either series has zero variance or fewer than two points,
/// where the coefficient is undefined.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mx = mean(x);
    let my = mean(y);

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }

    let denom = (vx * vy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&v), 5.0);
        assert_eq!(std_dev(&v), 2.0);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(percentile_sorted(&sorted, 100.0), 4.0);
        assert_eq!(median_sorted(&sorted), 2.5);
        assert!((percentile_sorted(&sorted, 25.0) - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_counts_every_value() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let (counts, edges) = histogram(&values, 20);
        assert_eq!(counts.len(), 20);
        assert_eq!(edges.len(), 21);
        assert_eq!(counts.iter().sum::<u64>(), 100);
        assert_eq!(edges[0], 0.0);
        assert_eq!(edges[20], 99.0);
        // max lands in the closed last bin
        assert!(counts[19] >= 1);
    }

    #[test]
    fn test_histogram_constant_input() {
        let (counts, edges) = histogram(&[3.0; 10], 4);
        assert_eq!(edges.first(), Some(&2.5));
        assert_eq!(edges.last(), Some(&3.5));
        assert_eq!(counts.iter().sum::<u64>(), 10);
    }

    #[test]
    fn test_histogram_empty_input() {
        let (counts, edges) = histogram(&[], 5);
        assert_eq!(counts, vec![0; 5]);
        assert_eq!(edges.first(), Some(&0.0));
        assert_eq!(edges.last(), Some(&1.0));
    }

    #[test]
    fn test_pearson() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        let neg = [4.0, 3.0, 2.0, 1.0];
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &neg) + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&x, &[5.0; 4]), 0.0);
    }
}
