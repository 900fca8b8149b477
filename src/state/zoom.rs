/// Zoom gestures and the per-tab zoom history
///
/// Vertical zoom is stored as a cumulative scale per spectrum and applied to
/// the spectrum's origin y range around a pivot: zero when the range spans
/// it, otherwise the end of the range nearest to zero.

use serde::{Deserialize, Serialize};

use super::domain::{clamp_to, is_zero_length, refresh_global_y};
use super::{HistoryItem, State};

/// Vertical scale restored by a full zoom-out
pub const DEFAULT_ZOOM_OUT_SCALE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZoomDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoomOutKind {
    Horizontal,
    Vertical,
    StepHorizontal,
    Both,
}

/// Scale `domain` around its pivot; a scale above 1 magnifies.
pub fn rescale(domain: [f64; 2], scale: f64) -> [f64; 2] {
    if !(scale.is_finite() && scale > 0.0) {
        return domain;
    }
    let [lo, hi] = domain;
    let pivot = if lo <= 0.0 && hi >= 0.0 {
        0.0
    } else if lo.abs() < hi.abs() {
        lo
    } else {
        hi
    };
    [pivot + (lo - pivot) / scale, pivot + (hi - pivot) / scale]
}

pub fn push_history(state: &mut State, tab: &str, item: HistoryItem) {
    state.view.zoom.history.entry(tab.to_string()).or_default().push(item);
}

pub fn pop_history(state: &mut State, tab: &str) -> Option<HistoryItem> {
    state.view.zoom.history.get_mut(tab).and_then(|h| h.pop())
}

pub fn clear_history(state: &mut State, tab: &str) {
    state.view.zoom.history.remove(tab);
}

/// Spectra a vertical zoom acts on: the given one, else the single active
/// spectrum, else every 1D spectrum of the tab (traces included in 2D tabs).
fn zoom_targets(state: &State, spectrum_id: Option<&str>) -> Vec<String> {
    if let Some(id) = spectrum_id {
        return state.spectrum(id).map(|_| vec![id.to_string()]).unwrap_or_default();
    }
    if let Some(active) = state.active_spectrum() {
        if state.spectrum(&active.id).map(|s| s.is_1d()).unwrap_or(false) {
            return vec![active.id.clone()];
        }
    }
    state
        .domain
        .origin_domain
        .y_domains
        .keys()
        .filter(|id| state.spectrum(id).map(|s| s.is_1d()).unwrap_or(false))
        .cloned()
        .collect()
}

fn apply_scale(state: &mut State, ids: &[String], scale: impl Fn(f64) -> f64) {
    for id in ids {
        let Some(origin) = state.domain.origin_domain.y_domains.get(id).copied() else {
            continue;
        };
        let current = state.view.zoom.vertical_scales.get(id).copied().unwrap_or(1.0);
        let next = scale(current);
        state.view.zoom.vertical_scales.insert(id.clone(), next);
        state.domain.y_domains.insert(id.clone(), rescale(origin, next));
    }
    if !state.is_2d_tab() {
        refresh_global_y(state);
    }
}

/// Set an absolute vertical scale
pub fn set_zoom(state: &mut State, scale: f64, spectrum_id: Option<&str>) {
    if !(scale.is_finite() && scale > 0.0) {
        log::debug!("set_zoom: ignoring scale {}", scale);
        return;
    }
    let ids = zoom_targets(state, spectrum_id);
    apply_scale(state, &ids, |_| scale);
}

/// Multiply the current vertical scale by the wheel step
pub fn wheel_zoom(state: &mut State, direction: ZoomDirection, spectrum_id: Option<&str>) {
    let step = state.preferences.wheel_zoom_step;
    if !(step.is_finite() && step > 0.0) {
        return;
    }
    let ids = zoom_targets(state, spectrum_id);
    apply_scale(state, &ids, |current| match direction {
        ZoomDirection::In => current * step,
        ZoomDirection::Out => current / step,
    });
}

fn ordered(a: f64, b: f64) -> [f64; 2] {
    [a.min(b), a.max(b)]
}

fn intersect(a: [f64; 2], b: [f64; 2]) -> Option<[f64; 2]> {
    let lo = a[0].max(b[0]);
    let hi = a[1].min(b[1]);
    (lo < hi).then_some([lo, hi])
}

/// Zoom to a brushed region. Zero-length brushes and brushes outside the
/// origin domain are ignored. The domain before the zoom is pushed on the
/// tab's history.
pub fn brush_end(state: &mut State, start_x: f64, end_x: f64, y: Option<(f64, f64)>) {
    let Some(tab) = state.active_tab().map(str::to_string) else {
        return;
    };
    if is_zero_length(start_x, end_x) {
        log::debug!("brush_end: zero-length selection ignored");
        return;
    }
    let Some(x) = intersect(ordered(start_x, end_x), state.domain.origin_domain.x_domain) else {
        log::debug!("brush_end: selection outside the spectrum");
        return;
    };
    let new_y = if state.is_2d_tab() {
        y.filter(|(a, b)| !is_zero_length(*a, *b))
            .and_then(|(a, b)| intersect(ordered(a, b), state.domain.origin_domain.y_domain))
    } else {
        None
    };

    let item = HistoryItem {
        x_domain: state.domain.x_domain,
        y_domain: state.domain.y_domain,
    };
    push_history(state, &tab, item);
    state.domain.x_domain = x;
    if let Some(y) = new_y {
        state.domain.y_domain = y;
    }
}

/// Set the x range directly; it is clamped to the origin domain
pub fn set_x_domain(state: &mut State, domain: [f64; 2]) {
    let domain = ordered(domain[0], domain[1]);
    state.domain.x_domain = clamp_to(domain, state.domain.origin_domain.x_domain);
}

fn reset_vertical(state: &mut State) {
    if state.is_2d_tab() {
        state.domain.y_domain = state.domain.origin_domain.y_domain;
    }
    let ids: Vec<String> = state
        .domain
        .origin_domain
        .y_domains
        .keys()
        .filter(|id| state.spectrum(id).map(|s| s.is_1d()).unwrap_or(false))
        .cloned()
        .collect();
    apply_scale(state, &ids, |_| DEFAULT_ZOOM_OUT_SCALE);
}

pub fn full_zoom_out(state: &mut State, kind: ZoomOutKind) {
    let Some(tab) = state.active_tab().map(str::to_string) else {
        return;
    };
    let origin_x = state.domain.origin_domain.x_domain;
    match kind {
        ZoomOutKind::Horizontal => {
            state.domain.x_domain = origin_x;
            clear_history(state, &tab);
        }
        ZoomOutKind::Vertical => reset_vertical(state),
        ZoomOutKind::StepHorizontal => match pop_history(state, &tab) {
            Some(item) => {
                state.domain.x_domain = clamp_to(item.x_domain, origin_x);
                if state.is_2d_tab() {
                    state.domain.y_domain =
                        clamp_to(item.y_domain, state.domain.origin_domain.y_domain);
                }
            }
            None => {
                state.domain.x_domain = origin_x;
                reset_vertical(state);
            }
        },
        ZoomOutKind::Both => {
            state.domain.x_domain = origin_x;
            reset_vertical(state);
            clear_history(state, &tab);
        }
    }
}
