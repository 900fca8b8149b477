/// Multiplet grouping and automatic range detection
///
/// Peaks closer than the largest expected coupling are grouped into one
/// multiplet; each multiplet becomes a range holding a single signal.

use serde::{Deserialize, Serialize};

use super::integration::integrate;
use super::peaks::{detect_peaks, PeakPickingOptions};
use crate::data::annotations::{Coupling, Peak, Range, Signal1D, SignalKind};
use crate::data::spectrum::{Data1D, Info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangeOptions {
    pub peak_picking: PeakPickingOptions,
    /// Largest coupling constant (Hz) still joining two lines into one multiplet
    pub max_j_hz: f64,
    /// Margin added on both sides of the outermost lines, in ppm
    pub padding: f64,
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self {
            peak_picking: PeakPickingOptions::default(),
            max_j_hz: 20.0,
            padding: 0.02,
        }
    }
}

/// A detected multiplet group
#[derive(Debug, Clone, PartialEq)]
pub struct Multiplet {
    /// Intensity-weighted centre
    pub center: f64,
    /// Mean spacing between consecutive lines in Hz
    pub j_hz: f64,
    pub label: String,
    /// Lines sorted by x ascending
    pub peaks: Vec<Peak>,
}

impl std::fmt::Display for Multiplet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.j_hz > 0.0 {
            write!(f, "{:.2} ppm ({}, J={:.1} Hz)", self.center, self.label, self.j_hz)
        } else {
            write!(f, "{:.2} ppm ({})", self.center, self.label)
        }
    }
}

pub fn multiplet_label(n: usize) -> &'static str {
    match n {
        1 => "s",
        2 => "d",
        3 => "t",
        4 => "q",
        5 => "quint",
        6 => "sext",
        7 => "sept",
        _ => "m",
    }
}

fn multiplet_from(group: Vec<Peak>, observe_mhz: f64) -> Multiplet {
    let n = group.len();
    let total: f64 = group.iter().map(|p| p.y.abs()).sum();
    let center = if total > 0.0 {
        group.iter().map(|p| p.x * p.y.abs()).sum::<f64>() / total
    } else {
        group.iter().map(|p| p.x).sum::<f64>() / n.max(1) as f64
    };
    let j_hz = if n >= 2 {
        group.windows(2).map(|w| (w[1].x - w[0].x).abs() * observe_mhz).sum::<f64>()
            / (n - 1) as f64
    } else {
        0.0
    };
    Multiplet {
        center,
        j_hz,
        label: multiplet_label(n).to_string(),
        peaks: group,
    }
}

/// Group peaks into multiplets based on line spacing.
///
/// `max_j_hz`: maximum coupling constant to consider (typically ~20 Hz for ¹H).
/// `observe_mhz`: observe frequency, needed to convert ppm spacing to Hz.
/// Result sorted by centre descending.
pub fn detect_multiplets(peaks: &[Peak], max_j_hz: f64, observe_mhz: f64) -> Vec<Multiplet> {
    if peaks.is_empty() || observe_mhz <= 0.0 {
        return vec![];
    }

    let mut sorted = peaks.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x));
    let max_j_ppm = max_j_hz / observe_mhz;

    let mut groups: Vec<Vec<Peak>> = Vec::new();
    let mut current: Vec<Peak> = Vec::new();
    for peak in sorted {
        let joins = current
            .last()
            .map(|last| (peak.x - last.x).abs() <= max_j_ppm)
            .unwrap_or(true);
        if !joins {
            groups.push(std::mem::take(&mut current));
        }
        current.push(peak);
    }
    if !current.is_empty() {
        groups.push(current);
    }

    let mut multiplets: Vec<Multiplet> = groups
        .into_iter()
        .map(|g| multiplet_from(g, observe_mhz))
        .collect();
    multiplets.sort_by(|a, b| b.center.total_cmp(&a.center));
    multiplets
}

fn signal_from(multiplet: Multiplet) -> Signal1D {
    let js = if multiplet.j_hz > 0.0 {
        vec![Coupling {
            coupling: multiplet.j_hz,
            multiplicity: multiplet.label.clone(),
        }]
    } else {
        Vec::new()
    };
    Signal1D {
        id: uuid::Uuid::new_v4().to_string(),
        delta: multiplet.center,
        multiplicity: multiplet.label,
        kind: SignalKind::Signal,
        js,
        peaks: multiplet.peaks,
    }
}

fn range_from(data: &Data1D, from: f64, to: f64, signals: Vec<Signal1D>) -> Range {
    let (from, to) = (from.min(to), from.max(to));
    Range {
        id: uuid::Uuid::new_v4().to_string(),
        from,
        to,
        absolute: integrate(data, from, to),
        integration: 0.0,
        kind: SignalKind::Signal,
        signals,
    }
}

/// Automatic range picking over the whole spectrum. Ranges that would overlap
/// after padding are merged.
pub fn detect_ranges(data: &Data1D, info: &Info, options: &RangeOptions) -> Vec<Range> {
    let peaks = detect_peaks(data, &options.peak_picking);
    let mut multiplets = detect_multiplets(&peaks, options.max_j_hz, info.frequency(0));
    multiplets.sort_by(|a, b| a.center.total_cmp(&b.center));

    let mut spans: Vec<(f64, f64, Vec<Signal1D>)> = Vec::new();
    for m in multiplets {
        let lo = m.peaks.first().map(|p| p.x).unwrap_or(m.center) - options.padding;
        let hi = m.peaks.last().map(|p| p.x).unwrap_or(m.center) + options.padding;
        match spans.last_mut() {
            Some(last) if lo <= last.1 => {
                last.1 = last.1.max(hi);
                last.2.push(signal_from(m));
            }
            _ => spans.push((lo, hi, vec![signal_from(m)])),
        }
    }

    spans
        .into_iter()
        .map(|(from, to, signals)| range_from(data, from, to, signals))
        .collect()
}

/// Range over a manually selected region; the lines inside it form one signal.
/// Returns `None` for an empty region.
pub fn range_in_region(
    data: &Data1D,
    info: &Info,
    from: f64,
    to: f64,
    options: &RangeOptions,
) -> Option<Range> {
    let (lo, hi) = (from.min(to), from.max(to));
    if data.indices_between(lo, hi).next().is_none() {
        return None;
    }
    let mut peaks: Vec<Peak> = detect_peaks(data, &options.peak_picking)
        .into_iter()
        .filter(|p| p.x >= lo && p.x <= hi)
        .collect();
    peaks.sort_by(|a, b| a.x.total_cmp(&b.x));

    let multiplet = if peaks.is_empty() {
        Multiplet {
            center: (lo + hi) / 2.0,
            j_hz: 0.0,
            label: "m".into(),
            peaks,
        }
    } else {
        let mut m = multiplet_from(peaks, info.frequency(0));
        if m.j_hz > options.max_j_hz {
            m.label = "m".into();
        }
        m
    };
    Some(range_from(data, lo, hi, vec![signal_from(multiplet)]))
}
