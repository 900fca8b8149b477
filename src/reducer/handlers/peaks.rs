use super::active_ft_1d;
use crate::analysis::peaks::{detect_peaks, max_in_window, peak_at};
use crate::analysis::PeakPickingOptions;
use crate::data::annotations::Peak;
use crate::state::domain::is_zero_length;
use crate::state::State;

fn push_unique(state: &mut State, id: &str, peak: Peak) {
    let Some(s) = state.spectrum_mut(id).and_then(|s| s.as_1d_mut()) else {
        return;
    };
    if s.peaks.values.iter().any(|p| p.x == peak.x) {
        log::debug!("Peak at {} already exists", peak.x);
        return;
    }
    s.peaks.values.push(peak);
    s.peaks.values.sort_by(|a, b| b.x.total_cmp(&a.x));
}

/// Peak on the sample nearest to `x`
pub fn add_peak(state: &mut State, x: f64) {
    let Some(id) = active_ft_1d(state) else { return };
    let Some(peak) = state
        .spectrum(&id)
        .and_then(|s| s.as_1d())
        .and_then(|s| peak_at(&s.data, x))
    else {
        return;
    };
    push_unique(state, &id, peak);
}

/// Highest sample of a brushed window
pub fn add_peaks(state: &mut State, from: f64, to: f64) {
    if is_zero_length(from, to) {
        return;
    }
    let Some(id) = active_ft_1d(state) else { return };
    let Some(peak) = state
        .spectrum(&id)
        .and_then(|s| s.as_1d())
        .and_then(|s| max_in_window(&s.data, from, to))
    else {
        return;
    };
    push_unique(state, &id, peak);
}

/// Delete one peak, or all of them when `peak_id` is `None`
pub fn delete_peak(state: &mut State, peak_id: Option<&str>) {
    let Some(id) = active_ft_1d(state) else { return };
    let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) else {
        return;
    };
    match peak_id {
        Some(peak_id) => s.peaks.values.retain(|p| p.id != peak_id),
        None => s.peaks.values.clear(),
    }
}

pub fn auto_peak_picking(state: &mut State, options: Option<&PeakPickingOptions>) {
    let Some(id) = active_ft_1d(state) else { return };
    let options = options.cloned().unwrap_or_else(|| state.preferences.peak_picking.clone());
    let Some(peaks) = state
        .spectrum(&id)
        .and_then(|s| s.as_1d())
        .map(|s| detect_peaks(&s.data, &options))
    else {
        return;
    };
    log::info!("Picked {} peaks on {}", peaks.len(), id);
    if let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) {
        s.peaks.values = peaks;
    }
}

pub fn toggle_markers(state: &mut State) {
    for id in state.active_ids() {
        let view = state.view.peaks.entry(id).or_default();
        view.show_markers = !view.show_markers;
    }
}
