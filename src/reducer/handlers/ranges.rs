use super::integrals::resolve_sum;
use super::{active_ft_1d, update_annotations};
use crate::analysis::integration::integrate;
use crate::analysis::multiplets::{detect_ranges, range_in_region};
use crate::analysis::RangeOptions;
use crate::data::annotations::{normalize, Integrable, SignalKind, SumOptions};
use crate::reducer::action::RangesViewFlag;
use crate::state::domain::{is_zero_length, set_integrals_y_domain};
use crate::state::State;

fn renormalize(state: &mut State, id: &str) {
    let Some(s) = state.spectrum(id).and_then(|s| s.as_1d()) else {
        return;
    };
    let sum = resolve_sum(state, &s.ranges.options, s);
    if let Some(s) = state.spectrum_mut(id).and_then(|s| s.as_1d_mut()) {
        normalize(&mut s.ranges.values, sum);
    }
}

fn seed_sum(state: &mut State, id: &str) {
    let default_sum = state.preferences.integral_sum;
    if let Some(s) = state.spectrum_mut(id).and_then(|s| s.as_1d_mut()) {
        if s.ranges.values.is_empty() && s.ranges.options == SumOptions::default() {
            s.ranges.options.sum = default_sum;
        }
    }
}

/// Replace the ranges of the active spectrum with detected ones
pub fn auto_ranges_detection(state: &mut State, options: Option<&RangeOptions>) {
    let Some(id) = active_ft_1d(state) else { return };
    let options = options.cloned().unwrap_or_else(|| state.preferences.ranges.clone());
    let Some(s) = state.spectrum(&id).and_then(|s| s.as_1d()) else {
        return;
    };
    let detected = detect_ranges(&s.data, &s.info, &options);
    log::info!("Detected {} ranges on {}", detected.len(), id);

    if let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) {
        s.ranges.values.clear();
    }
    seed_sum(state, &id);
    if let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) {
        s.ranges.values = detected;
    }
    renormalize(state, &id);
    update_annotations(state);
}

pub fn add_range(state: &mut State, from: f64, to: f64) {
    if is_zero_length(from, to) {
        return;
    }
    let Some(id) = active_ft_1d(state) else { return };
    let options = state.preferences.ranges.clone();
    let Some(s) = state.spectrum(&id).and_then(|s| s.as_1d()) else {
        return;
    };
    let Some(range) = range_in_region(&s.data, &s.info, from, to, &options) else {
        log::debug!("add_range: no data in [{}, {}]", from, to);
        return;
    };
    seed_sum(state, &id);
    if let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) {
        s.ranges.values.push(range);
        s.ranges.values.sort_by(|a, b| a.from.total_cmp(&b.from));
    }
    renormalize(state, &id);
    update_annotations(state);
}

/// Move the bounds of a range; its signals are kept
pub fn resize_range(state: &mut State, range_id: &str, from: f64, to: f64) {
    if is_zero_length(from, to) {
        return;
    }
    let Some(id) = active_ft_1d(state) else { return };
    let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) else {
        return;
    };
    let absolute = integrate(&s.data, from, to);
    let Some(range) = s.ranges.values.iter_mut().find(|r| r.id == range_id) else {
        log::debug!("resize_range: unknown range {}", range_id);
        return;
    };
    range.from = from.min(to);
    range.to = from.max(to);
    range.absolute = absolute;
    renormalize(state, &id);
    update_annotations(state);
}

/// Delete one range, or all of them when `range_id` is `None`
pub fn delete_range(state: &mut State, range_id: Option<&str>) {
    let Some(id) = active_ft_1d(state) else { return };
    let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) else {
        return;
    };
    match range_id {
        Some(range_id) => s.ranges.values.retain(|r| r.id != range_id),
        None => s.ranges.values.clear(),
    }
    renormalize(state, &id);
    update_annotations(state);
}

pub fn change_sum_options(state: &mut State, options: &SumOptions) {
    let Some(id) = active_ft_1d(state) else { return };
    if let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) {
        s.ranges.options = options.clone();
    }
    renormalize(state, &id);
    update_annotations(state);
}

/// Give one range a relative value; the sum is rescaled so the other ranges
/// keep their proportions
pub fn change_relative_value(state: &mut State, range_id: &str, value: f64) {
    if !(value.is_finite() && value > 0.0) {
        return;
    }
    let Some(id) = active_ft_1d(state) else { return };
    let Some(s) = state.spectrum(&id).and_then(|s| s.as_1d()) else {
        return;
    };
    let Some(range) = s.ranges.values.iter().find(|r| r.id == range_id) else {
        return;
    };
    if range.relative() == 0.0 {
        return;
    }
    let current_sum = resolve_sum(state, &s.ranges.options, s);
    let sum = current_sum * value / range.relative();
    if let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) {
        s.ranges.options.sum = sum;
        s.ranges.options.sum_auto = false;
        s.ranges.options.is_sum_constant = false;
        normalize(&mut s.ranges.values, sum);
    }
    update_annotations(state);
}

pub fn change_signal_value(state: &mut State, range_id: &str, signal_id: &str, delta: f64) {
    let Some(id) = active_ft_1d(state) else { return };
    let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) else {
        return;
    };
    let signal = s
        .ranges
        .values
        .iter_mut()
        .filter(|r| r.id == range_id)
        .flat_map(|r| r.signals.iter_mut())
        .find(|g| g.id == signal_id);
    match signal {
        Some(signal) => signal.delta = delta,
        None => {
            log::debug!("change_signal_value: unknown signal {}/{}", range_id, signal_id);
            return;
        }
    }
    update_annotations(state);
}

/// Reclassify a range and its signals; only `signal` ranges count in the sum
pub fn change_kind(state: &mut State, range_id: &str, kind: SignalKind) {
    let Some(id) = active_ft_1d(state) else { return };
    let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) else {
        return;
    };
    let Some(range) = s.ranges.values.iter_mut().find(|r| r.id == range_id) else {
        return;
    };
    range.kind = kind;
    for signal in range.signals.iter_mut() {
        signal.kind = kind;
    }
    renormalize(state, &id);
    update_annotations(state);
}

pub fn toggle_view_property(state: &mut State, flag: RangesViewFlag) {
    for id in state.active_ids() {
        let view = state.view.ranges.entry(id).or_default();
        match flag {
            RangesViewFlag::ShowIntegrals => view.show_integrals = !view.show_integrals,
            RangesViewFlag::ShowMultiplicityTrees => {
                view.show_multiplicity_trees = !view.show_multiplicity_trees
            }
        }
    }
    set_integrals_y_domain(state);
}
