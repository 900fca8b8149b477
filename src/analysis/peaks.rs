use serde::{Deserialize, Serialize};

use crate::data::annotations::Peak;
use crate::data::spectrum::Data1D;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeakPickingOptions {
    /// Fraction of the maximum intensity a peak must exceed (0.0–1.0)
    pub threshold_fraction: f64,
    /// Minimum index distance between accepted peaks
    pub min_distance: usize,
}

impl Default for PeakPickingOptions {
    fn default() -> Self {
        Self {
            threshold_fraction: 0.05,
            min_distance: 5,
        }
    }
}

/// Simple peak detection: find local maxima above a noise threshold.
/// Returns peaks sorted by x descending.
pub fn detect_peaks(data: &Data1D, options: &PeakPickingOptions) -> Vec<Peak> {
    let n = data.len();
    if n < 3 {
        return vec![];
    }

    let max_val = data.re[..n].iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max_val <= 0.0 {
        return vec![];
    }
    let threshold = max_val * options.threshold_fraction;

    let mut candidates: Vec<(usize, f64)> = Vec::new();
    for i in 1..n - 1 {
        let val = data.re[i];
        if val > threshold && val >= data.re[i - 1] && val >= data.re[i + 1] && val > 0.0 {
            candidates.push((i, val));
        }
    }

    // Keep strongest first, enforce minimum distance
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    let mut selected: Vec<usize> = Vec::new();
    for &(idx, _) in &candidates {
        let too_close = selected.iter().any(|&s| idx.abs_diff(s) <= options.min_distance);
        if !too_close {
            selected.push(idx);
        }
    }

    let mut peaks: Vec<Peak> = selected
        .iter()
        .map(|&i| Peak::new(data.x[i], data.re[i]))
        .collect();
    peaks.sort_by(|a, b| b.x.total_cmp(&a.x));
    peaks
}

/// Peak on the sample nearest to `x`
pub fn peak_at(data: &Data1D, x: f64) -> Option<Peak> {
    data.nearest_index(x).map(|i| Peak::new(data.x[i], data.re[i]))
}

/// Highest sample in the window `[from, to]`
pub fn max_in_window(data: &Data1D, from: f64, to: f64) -> Option<Peak> {
    data.indices_between(from, to)
        .max_by(|&a, &b| data.re[a].total_cmp(&data.re[b]))
        .map(|i| Peak::new(data.x[i], data.re[i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ft_1d;

    #[test]
    fn test_detect_two_lines() {
        let (data, _) = ft_1d(&[(2.0, 10.0), (7.0, 5.0)]);
        let peaks = detect_peaks(&data, &PeakPickingOptions::default());
        assert_eq!(peaks.len(), 2);
        assert!((peaks[0].x - 7.0).abs() < 1e-9);
        assert!((peaks[1].x - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_drops_small_lines() {
        let (data, _) = ft_1d(&[(2.0, 10.0), (7.0, 0.1)]);
        let options = PeakPickingOptions {
            threshold_fraction: 0.5,
            ..Default::default()
        };
        assert_eq!(detect_peaks(&data, &options).len(), 1);
    }

    #[test]
    fn test_window_maximum() {
        let (data, _) = ft_1d(&[(2.0, 10.0), (7.0, 5.0)]);
        let peak = max_in_window(&data, 8.0, 5.0).unwrap();
        assert!((peak.x - 7.0).abs() < 1e-9);
        assert!(max_in_window(&data, 20.0, 30.0).is_none());
    }
}
