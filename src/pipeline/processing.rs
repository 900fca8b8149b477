/// NMR processing operations
///
/// Each operation transforms spectrum samples in place. Operations are pure
/// functions of their inputs so that replaying a filter list from the same
/// pristine data always produces bit-identical output.

use std::f64::consts::PI;

use num_complex::Complex;
use rustfft::FftPlanner;

use super::filter::{FilterKind, WindowFunction};
use super::FilterError;
use crate::data::spectrum::{Data1D, Data2D, Info, Matrix};

/// Apply one filter to 1D samples
pub fn apply_1d(kind: &FilterKind, data: &mut Data1D, info: &mut Info) -> Result<(), FilterError> {
    match kind {
        FilterKind::DigitalFilter { group_delay } => digital_filter(data, info, *group_delay),
        FilterKind::Apodization(window) => apply_apodization(data, info, window),
        FilterKind::ZeroFilling { size } => zero_fill(data, info, *size),
        FilterKind::Fft => fourier_transform(data, info),
        FilterKind::PhaseCorrection { ph0, ph1 } => phase_correct(data, info, *ph0, *ph1),
        FilterKind::BaselineCorrection { zones } => baseline_correct(data, info, zones),
        FilterKind::ShiftX { shift } => {
            shift_x(data, *shift);
            Ok(())
        }
        FilterKind::Fft2D | FilterKind::Shift2DX { .. } | FilterKind::Shift2DY { .. } => {
            Err(FilterError::UnsupportedDimension {
                filter: kind.name().to_string(),
                dimension: 1,
            })
        }
    }
}

/// Apply one filter to a 2D matrix
pub fn apply_2d(kind: &FilterKind, data: &mut Data2D, info: &mut Info) -> Result<(), FilterError> {
    match kind {
        FilterKind::Fft2D => fourier_transform_2d(data, info),
        FilterKind::Shift2DX { shift } => {
            shift_2d(data, *shift, 0.0);
            Ok(())
        }
        FilterKind::Shift2DY { shift } => {
            shift_2d(data, 0.0, *shift);
            Ok(())
        }
        _ => Err(FilterError::UnsupportedDimension {
            filter: kind.name().to_string(),
            dimension: 2,
        }),
    }
}

fn require_fid(info: &Info, filter: &str) -> Result<(), FilterError> {
    if info.is_fid {
        Ok(())
    } else {
        Err(FilterError::RequiresFid {
            filter: filter.to_string(),
        })
    }
}

fn require_ft(info: &Info, filter: &str) -> Result<(), FilterError> {
    if info.is_fid {
        Err(FilterError::RequiresFrequencyDomain {
            filter: filter.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Sampling interval of the abscissa; falls back to 1/n for degenerate axes
fn dwell_time(data: &Data1D) -> f64 {
    let n = data.len();
    if n > 1 {
        let dx = (data.x[1] - data.x[0]).abs();
        if dx > 0.0 && dx.is_finite() {
            return dx;
        }
    }
    1.0 / n.max(1) as f64
}

// =========================================================================
//  Digital Filter
// =========================================================================

/// Rotate the FID left by the group delay so the echo starts at index 0
pub fn digital_filter(data: &mut Data1D, info: &Info, group_delay: f64) -> Result<(), FilterError> {
    require_fid(info, "digitalFilter")?;
    let n = data.len();
    if n == 0 {
        return Err(FilterError::EmptyData);
    }
    if !(group_delay.is_finite() && group_delay >= 0.0) {
        return Err(FilterError::InvalidParameter {
            filter: "digitalFilter".into(),
            reason: format!("group delay must be a non-negative number, got {}", group_delay),
        });
    }
    let k = (group_delay.round() as usize) % n;
    data.re.truncate(n);
    data.re.rotate_left(k);
    if let Some(im) = data.im.as_mut() {
        if im.len() >= n {
            im.truncate(n);
            im.rotate_left(k);
        }
    }
    Ok(())
}

// =========================================================================
//  Apodization / Window Functions
// =========================================================================

fn window_factor(window: &WindowFunction, i: usize, n: usize, dwell: f64) -> f64 {
    let t = i as f64 * dwell;
    match window {
        WindowFunction::Exponential { lb_hz } => (-PI * lb_hz * t).exp(),
        WindowFunction::Gaussian { gb, lb_hz } => {
            let tmax = n as f64 * dwell;
            (-PI * lb_hz * t).exp() * (-(t / (2.0 * gb * tmax)).powi(2)).exp()
        }
        WindowFunction::SineBell { power, offset, end } => {
            let frac = i as f64 / n as f64;
            let angle = PI * (offset + frac * (end - offset));
            angle.sin().powf(*power)
        }
        WindowFunction::CosineBell => {
            let frac = i as f64 / n as f64;
            (PI * frac / 2.0).cos()
        }
    }
}

/// Apply a window function to the FID data
pub fn apply_apodization(
    data: &mut Data1D,
    info: &Info,
    window: &WindowFunction,
) -> Result<(), FilterError> {
    require_fid(info, "apodization")?;
    let n = data.len();
    if n == 0 {
        return Err(FilterError::EmptyData);
    }
    if let WindowFunction::Gaussian { gb, .. } = window {
        if *gb <= 0.0 {
            return Err(FilterError::InvalidParameter {
                filter: "apodization".into(),
                reason: format!("gaussian broadening must be positive, got {}", gb),
            });
        }
    }

    let dwell = dwell_time(data);
    for i in 0..n {
        let factor = window_factor(window, i, n, dwell);
        data.re[i] *= factor;
        if let Some(im) = data.im.as_mut() {
            if i < im.len() {
                im[i] *= factor;
            }
        }
    }
    log::debug!("Applied {} to {} points", window, n);
    Ok(())
}

// =========================================================================
//  Zero Filling
// =========================================================================

/// Zero-fill the FID to the target size; sizes not above the current length
/// leave the data untouched.
pub fn zero_fill(data: &mut Data1D, info: &Info, target_size: usize) -> Result<(), FilterError> {
    require_fid(info, "zeroFilling")?;
    if target_size == 0 {
        return Err(FilterError::InvalidParameter {
            filter: "zeroFilling".into(),
            reason: "size must be positive".into(),
        });
    }
    let current = data.len();
    if target_size <= current {
        log::debug!("Zero fill to {} skipped: already {} points", target_size, current);
        return Ok(());
    }

    let dwell = dwell_time(data);
    let last = data.x.get(current.wrapping_sub(1)).copied().unwrap_or(0.0);
    data.x.truncate(current);
    data.x.extend((1..=target_size - current).map(|k| last + k as f64 * dwell));
    data.re.resize(target_size, 0.0);
    if let Some(im) = data.im.as_mut() {
        im.resize(target_size, 0.0);
    }
    Ok(())
}

/// Next power of two >= n
pub fn next_power_of_two(n: usize) -> usize {
    let mut p = 1;
    while p < n {
        p <<= 1;
    }
    p
}

// =========================================================================
//  Fourier Transform
// =========================================================================

/// Forward FFT followed by an FFT shift so 0 Hz sits in the centre
fn fft_shifted(planner: &mut FftPlanner<f64>, buffer: &mut [Complex<f64>]) {
    let fft = planner.plan_fft_forward(buffer.len());
    fft.process(buffer);
    let half = buffer.len() / 2;
    buffer.rotate_left(half);
}

/// Low and high ppm of an axis sampled with `dwell` seconds over `points` points
fn frequency_axis(dwell: f64, points: usize, frequency_mhz: f64, offset_ppm: f64) -> (f64, f64) {
    let sw_hz = 1.0 / dwell;
    let sw_ppm = sw_hz / frequency_mhz;
    let low = offset_ppm - sw_ppm / 2.0;
    let step = sw_ppm / points as f64;
    (low, low + step * (points.saturating_sub(1)) as f64)
}

/// Apply complex FFT to the FID data, converting to frequency domain
pub fn fourier_transform(data: &mut Data1D, info: &mut Info) -> Result<(), FilterError> {
    require_fid(info, "fft")?;
    let n = data.len();
    if n == 0 {
        return Err(FilterError::EmptyData);
    }
    let frequency = info.frequency(0);
    if frequency <= 0.0 {
        return Err(FilterError::InvalidParameter {
            filter: "fft".into(),
            reason: format!("observe frequency must be positive, got {}", frequency),
        });
    }

    let dwell = dwell_time(data);
    let fft_size = next_power_of_two(n);

    let im = data.im.clone().unwrap_or_default();
    let mut buffer: Vec<Complex<f64>> = (0..fft_size)
        .map(|i| {
            if i < n {
                Complex::new(data.re[i], im.get(i).copied().unwrap_or(0.0))
            } else {
                Complex::new(0.0, 0.0)
            }
        })
        .collect();

    // First-point correction removes the DC offset artefact at the spectrum edges
    buffer[0] *= 0.5;

    let mut planner = FftPlanner::new();
    fft_shifted(&mut planner, &mut buffer);

    let mut re: Vec<f64> = buffer.iter().map(|c| c.re).collect();
    let mut im: Vec<f64> = buffer.iter().map(|c| c.im).collect();

    // Predominantly negative spectra get a 180° flip so absorption points up
    let pos_sum: f64 = re.iter().filter(|&&v| v > 0.0).sum();
    let neg_sum: f64 = re.iter().filter(|&&v| v < 0.0).map(|v| v.abs()).sum();
    if neg_sum > pos_sum * 1.5 {
        re.iter_mut().for_each(|v| *v = -*v);
        im.iter_mut().for_each(|v| *v = -*v);
    }

    let (low, high) = frequency_axis(dwell, fft_size, frequency, info.offset(0));
    let step = if fft_size > 1 { (high - low) / (fft_size - 1) as f64 } else { 0.0 };
    data.x = (0..fft_size).map(|i| low + i as f64 * step).collect();
    data.re = re;
    data.im = Some(im);

    info.is_fid = false;
    info.is_ft = true;
    info.is_complex = true;
    log::debug!("FFT {} → {} points", n, fft_size);
    Ok(())
}

// =========================================================================
//  Phase Correction
// =========================================================================

/// Apply zero-order and first-order phase correction
pub fn phase_correct(
    data: &mut Data1D,
    info: &Info,
    ph0_degrees: f64,
    ph1_degrees: f64,
) -> Result<(), FilterError> {
    require_ft(info, "phaseCorrection")?;
    let n = data.len();
    if n == 0 {
        return Err(FilterError::EmptyData);
    }

    let ph0 = ph0_degrees * PI / 180.0;
    let ph1 = ph1_degrees * PI / 180.0;
    let mut im = data.im.take().unwrap_or_default();
    im.resize(n, 0.0);

    for i in 0..n {
        let frac = i as f64 / n as f64;
        let phase = ph0 + ph1 * frac;
        let (sin_p, cos_p) = phase.sin_cos();
        let re = data.re[i];
        data.re[i] = re * cos_p - im[i] * sin_p;
        im[i] = re * sin_p + im[i] * cos_p;
    }
    data.im = Some(im);
    Ok(())
}

/// Automatic phase correction: coarse then fine grid search on ph0, then ph1.
/// Returns the angles; the caller records them as a phase correction filter.
pub fn auto_phase(data: &Data1D) -> (f64, f64) {
    if data.is_empty() {
        return (0.0, 0.0);
    }

    let search = |lo: f64, hi: f64, step: f64, score: &dyn Fn(f64) -> f64| {
        let mut best = lo;
        let mut best_score = f64::NEG_INFINITY;
        let mut v = lo;
        while v <= hi {
            let s = score(v);
            if s > best_score {
                best_score = s;
                best = v;
            }
            v += step;
        }
        best
    };

    let ph0 = search(-180.0, 180.0, 5.0, &|p| evaluate_phase(data, p, 0.0));
    let ph0 = search(ph0 - 5.0, ph0 + 5.0, 0.5, &|p| evaluate_phase(data, p, 0.0));
    let ph1 = search(-180.0, 180.0, 5.0, &|p| evaluate_phase(data, ph0, p));
    let ph1 = search(ph1 - 5.0, ph1 + 5.0, 0.5, &|p| evaluate_phase(data, ph0, p));
    (ph0, ph1)
}

/// Evaluate phase quality: sum of positive real values (higher = better phased)
fn evaluate_phase(data: &Data1D, ph0_deg: f64, ph1_deg: f64) -> f64 {
    let n = data.len();
    let ph0 = ph0_deg * PI / 180.0;
    let ph1 = ph1_deg * PI / 180.0;
    let im = data.im.as_deref().unwrap_or(&[]);

    let mut score = 0.0;
    for i in 0..n {
        let frac = i as f64 / n as f64;
        let phase = ph0 + ph1 * frac;
        let im_i = im.get(i).copied().unwrap_or(0.0);
        let corrected_re = data.re[i] * phase.cos() - im_i * phase.sin();
        // Negative intensity is penalised harder than positive is rewarded
        if corrected_re > 0.0 {
            score += corrected_re;
        } else {
            score += corrected_re * 2.0;
        }
    }
    score
}

// =========================================================================
//  Baseline Correction
// =========================================================================

/// Subtract a baseline estimated from noise zones.
///
/// Each zone contributes one anchor (zone centre, mean intensity). With two
/// or more anchors the baseline is piecewise linear between them; otherwise a
/// straight line through the mean of the first and last 10% is used.
pub fn baseline_correct(
    data: &mut Data1D,
    info: &Info,
    zones: &[[f64; 2]],
) -> Result<(), FilterError> {
    require_ft(info, "baselineCorrection")?;
    let n = data.len();
    if n == 0 {
        return Err(FilterError::EmptyData);
    }

    let mut anchors: Vec<[f64; 2]> = zones
        .iter()
        .filter_map(|&[from, to]| {
            let idx: Vec<usize> = data.indices_between(from, to).collect();
            if idx.is_empty() {
                return None;
            }
            let mean = idx.iter().map(|&i| data.re[i]).sum::<f64>() / idx.len() as f64;
            Some([(from + to) / 2.0, mean])
        })
        .collect();
    anchors.sort_by(|a, b| a[0].total_cmp(&b[0]));

    if anchors.len() < 2 {
        let edge = ((n as f64 * 0.1) as usize).max(1);
        let left_mean: f64 = data.re[..edge].iter().sum::<f64>() / edge as f64;
        let right_mean: f64 = data.re[n - edge..n].iter().sum::<f64>() / edge as f64;
        for i in 0..n {
            let frac = i as f64 / n as f64;
            data.re[i] -= left_mean + (right_mean - left_mean) * frac;
        }
        return Ok(());
    }

    for i in 0..n {
        let x = data.x[i];
        data.re[i] -= interpolate(&anchors, x);
    }
    Ok(())
}

/// Piecewise-linear interpolation through sorted anchors, extrapolating
/// linearly beyond the first and last anchor
fn interpolate(anchors: &[[f64; 2]], x: f64) -> f64 {
    let line = |a: [f64; 2], b: [f64; 2]| {
        if (b[0] - a[0]).abs() > 1e-12 {
            a[1] + (x - a[0]) * (b[1] - a[1]) / (b[0] - a[0])
        } else {
            a[1]
        }
    };
    let last = anchors.len() - 1;
    if x <= anchors[0][0] {
        return line(anchors[0], anchors[1]);
    }
    if x >= anchors[last][0] {
        return line(anchors[last - 1], anchors[last]);
    }
    anchors
        .windows(2)
        .find(|w| x >= w[0][0] && x <= w[1][0])
        .map(|w| line(w[0], w[1]))
        .unwrap_or(0.0)
}

// =========================================================================
//  Shifts
// =========================================================================

pub fn shift_x(data: &mut Data1D, shift: f64) {
    data.x.iter_mut().for_each(|x| *x += shift);
}

pub fn shift_2d(data: &mut Data2D, dx: f64, dy: f64) {
    let shift = |m: &mut Matrix| {
        m.min_x += dx;
        m.max_x += dx;
        m.min_y += dy;
        m.max_y += dy;
    };
    shift(&mut data.rr);
    if let Some(ii) = data.ii.as_mut() {
        shift(ii);
    }
}

// =========================================================================
//  2D Fourier Transform
// =========================================================================

/// Transform a 2D FID along both dimensions and keep the magnitude
pub fn fourier_transform_2d(data: &mut Data2D, info: &mut Info) -> Result<(), FilterError> {
    require_fid(info, "fft2D")?;
    let rows = data.rr.rows();
    let cols = data.rr.cols();
    if rows == 0 || cols == 0 {
        return Err(FilterError::EmptyData);
    }
    if data.rr.z.iter().any(|r| r.len() != cols) {
        return Err(FilterError::MalformedMatrix("rows have different lengths".into()));
    }
    if let Some(ii) = &data.ii {
        if ii.rows() != rows || ii.z.iter().any(|r| r.len() != cols) {
            return Err(FilterError::MalformedMatrix(
                "imaginary part does not match the real part".into(),
            ));
        }
    }

    let fft_cols = next_power_of_two(cols);
    let fft_rows = next_power_of_two(rows);
    let mut planner = FftPlanner::new();

    // Direct dimension (rows)
    let mut grid: Vec<Vec<Complex<f64>>> = Vec::with_capacity(fft_rows);
    for r in 0..rows {
        let mut row: Vec<Complex<f64>> = (0..fft_cols)
            .map(|c| {
                if c < cols {
                    let im = data.ii.as_ref().map(|ii| ii.z[r][c]).unwrap_or(0.0);
                    Complex::new(data.rr.z[r][c], im)
                } else {
                    Complex::new(0.0, 0.0)
                }
            })
            .collect();
        row[0] *= 0.5;
        fft_shifted(&mut planner, &mut row);
        grid.push(row);
    }
    grid.resize(fft_rows, vec![Complex::new(0.0, 0.0); fft_cols]);

    // Indirect dimension (columns)
    let mut column = vec![Complex::new(0.0, 0.0); fft_rows];
    for c in 0..fft_cols {
        for r in 0..fft_rows {
            column[r] = grid[r][c];
        }
        fft_shifted(&mut planner, &mut column);
        for r in 0..fft_rows {
            grid[r][c] = column[r];
        }
    }

    let dwell_x = axis_dwell(data.rr.min_x, data.rr.max_x, cols);
    let dwell_y = axis_dwell(data.rr.min_y, data.rr.max_y, rows);
    let (min_x, max_x) = frequency_axis(dwell_x, fft_cols, info.frequency(0), info.offset(0));
    let (min_y, max_y) = frequency_axis(dwell_y, fft_rows, info.frequency(1), info.offset(1));

    data.rr = Matrix {
        min_x,
        max_x,
        min_y,
        max_y,
        z: grid
            .iter()
            .map(|row| row.iter().map(|c| c.norm()).collect())
            .collect(),
    };
    data.ii = None;
    info.is_fid = false;
    info.is_ft = true;
    log::debug!("2D FFT {}×{} → {}×{} (magnitude)", rows, cols, fft_rows, fft_cols);
    Ok(())
}

fn axis_dwell(min: f64, max: f64, points: usize) -> f64 {
    if points > 1 {
        let d = ((max - min) / (points - 1) as f64).abs();
        if d > 0.0 && d.is_finite() {
            return d;
        }
    }
    1.0 / points.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fid_1d, ft_1d};

    #[test]
    fn test_zero_fill_extends_time_axis() {
        let (mut data, info) = fid_1d(100, 400.0);
        zero_fill(&mut data, &info, 256).unwrap();
        assert_eq!(data.len(), 256);
        assert_eq!(data.re[200], 0.0);
        let dwell = data.x[1] - data.x[0];
        assert!((data.x[255] - data.x[254] - dwell).abs() < 1e-12);
    }

    #[test]
    fn test_zero_fill_smaller_size_is_noop() {
        let (mut data, info) = fid_1d(128, 400.0);
        let before = data.clone();
        zero_fill(&mut data, &info, 64).unwrap();
        assert_eq!(data, before);
    }

    #[test]
    fn test_fft_produces_frequency_axis_and_peak() {
        let (mut data, mut info) = fid_1d(512, 400.0);
        fourier_transform(&mut data, &mut info).unwrap();
        assert!(!info.is_fid);
        assert!(info.is_ft);
        assert_eq!(data.len(), 512);
        assert!(data.x.windows(2).all(|w| w[1] > w[0]), "ppm axis ascending");
        let (imax, _) = data
            .re
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        // fid_1d oscillates at +0.5 ppm from the carrier
        assert!((data.x[imax] - 0.5).abs() < 0.05, "peak at {}", data.x[imax]);
    }

    #[test]
    fn test_fft_rejects_frequency_domain_data() {
        let (mut data, mut info) = ft_1d(&[(1.0, 1.0)]);
        let err = fourier_transform(&mut data, &mut info).unwrap_err();
        assert!(matches!(err, FilterError::RequiresFid { .. }));
    }

    #[test]
    fn test_phase_correction_360_is_identity() {
        let (mut data, info) = ft_1d(&[(2.0, 10.0)]);
        data.im = Some(vec![0.5; data.len()]);
        let before = data.clone();
        phase_correct(&mut data, &info, 360.0, 0.0).unwrap();
        for (a, b) in data.re.iter().zip(before.re.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_auto_phase_recovers_flipped_spectrum() {
        let (mut data, info) = ft_1d(&[(2.0, 10.0)]);
        data.im = Some(vec![0.0; data.len()]);
        phase_correct(&mut data, &info, 180.0, 0.0).unwrap();
        let (ph0, _ph1) = auto_phase(&data);
        assert!((ph0.abs() - 180.0).abs() <= 5.0, "ph0 = {}", ph0);
    }

    #[test]
    fn test_baseline_correction_removes_offset() {
        let (mut data, info) = ft_1d(&[(5.0, 10.0)]);
        data.re.iter_mut().for_each(|v| *v += 3.0);
        baseline_correct(&mut data, &info, &[[0.0, 1.0], [9.0, 10.0]]).unwrap();
        let first = data.re[0];
        assert!(first.abs() < 0.1, "baseline left {}", first);
    }

    #[test]
    fn test_apodization_decays_fid() {
        let (mut data, info) = fid_1d(256, 400.0);
        let before = data.re.clone();
        apply_apodization(&mut data, &info, &WindowFunction::Exponential { lb_hz: 50.0 }).unwrap();
        assert_eq!(data.re[0], before[0]);
        assert!(data.re[200].abs() <= before[200].abs());
    }

    #[test]
    fn test_shift_x_moves_axis() {
        let (mut data, _) = ft_1d(&[(5.0, 1.0)]);
        let first = data.x[0];
        shift_x(&mut data, 0.25);
        assert!((data.x[0] - first - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_2d_filter_rejected_on_1d() {
        let (mut data, mut info) = ft_1d(&[(5.0, 1.0)]);
        let err = apply_1d(&FilterKind::Fft2D, &mut data, &mut info).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedDimension { dimension: 1, .. }));
    }
}
