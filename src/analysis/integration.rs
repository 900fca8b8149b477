use crate::data::spectrum::{extent, Data1D};

/// Integrate the spectrum between two x values (running sum over samples).
/// Returns the raw integral value; ratios between regions are what matter.
pub fn integrate(data: &Data1D, from: f64, to: f64) -> f64 {
    data.indices_between(from, to).map(|i| data.re[i]).sum()
}

/// Cumulative integral over `[from, to]`, one value per sample in the region
pub fn integral_curve(data: &Data1D, from: f64, to: f64) -> Vec<f64> {
    data.indices_between(from, to)
        .scan(0.0, |acc, i| {
            *acc += data.re[i];
            Some(*acc)
        })
        .collect()
}

/// Vertical extent of the cumulative curve over `[from, to]`
pub fn integral_extent(data: &Data1D, from: f64, to: f64) -> Option<[f64; 2]> {
    extent(&integral_curve(data, from, to))
}
